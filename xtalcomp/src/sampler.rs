//! Turns temperature sensor readings into a pending compensation value.


use crate::calibration::Calibration;
use crate::shared::PendingCompensation;
use crate::table::CompensationTable;


/// Where the compensation table's index 0 lies on the calibrated temperature scale.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SamplerConfig {
    /// Calibrated temperature (kelvin) that maps to table index 0.
    pub reference_offset: i32,
}
impl SamplerConfig {
    /// 25 °C as produced by the AVR temperature sensor calibration.
    pub const AVR_KELVIN: Self = Self::new(297);

    /// 25 °C rounded to whole kelvin.
    pub const KELVIN: Self = Self::new(298);

    pub const fn new(reference_offset: i32) -> Self {
        Self { reference_offset }
    }
}


/// Handles the "conversion complete" event of the temperature sensor.
#[derive(Clone, Debug)]
pub struct TemperatureSampler {
    calibration: Calibration,
    config: SamplerConfig,
    table: CompensationTable,
    last_temperature: Option<i32>,
    samples: u32,
    clamp_events: u32,
}
impl TemperatureSampler {
    pub const fn new(calibration: Calibration, config: SamplerConfig, table: CompensationTable) -> Self {
        Self {
            calibration,
            config,
            table,
            last_temperature: None,
            samples: 0,
            clamp_events: 0,
        }
    }

    /// Converts a raw reading and stores the matching fine error into `pending`, replacing any
    /// value that has not been consumed yet.
    ///
    /// Temperatures beyond either end of the table use the last table entry. Returns the stored
    /// value.
    pub fn on_sample_ready(&mut self, raw: u16, pending: &PendingCompensation) -> u16 {
        let temperature = self.calibration.to_kelvin(raw);
        let deviation = temperature - self.config.reference_offset;

        let (compensation, clamped) = self.table.lookup_clamped(deviation);
        if clamped {
            self.clamp_events = self.clamp_events.wrapping_add(1);
            warn!("temperature {} K outside drift table, clamped", temperature);
        }

        pending.set(compensation);
        self.last_temperature = Some(temperature);
        self.samples = self.samples.wrapping_add(1);
        compensation
    }

    /// The temperature of the most recent sample, if any sample has completed yet.
    pub fn last_temperature(&self) -> Option<i32> {
        self.last_temperature
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// How many samples fell outside the table and were clamped.
    pub fn clamp_events(&self) -> u32 {
        self.clamp_events
    }
}
