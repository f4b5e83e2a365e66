//! Sampler and integrator owned together, for callers that dispatch both events from one place.


use crate::calibration::Calibration;
use crate::error::CompensationError;
use crate::integrator::{Correction, ErrorIntegrator, RtcConfig, TickHardware};
use crate::sampler::{SamplerConfig, TemperatureSampler};
use crate::shared::PendingCompensation;
use crate::table::DriftModel;


/// Counters describing what the control loop has done so far.
///
/// Reading them has no effect on the loop.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Diagnostics {
    pub samples: u32,
    pub clamp_events: u32,
    pub ticks: u32,
    pub corrected_cycles: u32,
    pub faults: u32,
}


/// The complete compensation loop.
pub struct Compensator {
    sampler: TemperatureSampler,
    integrator: ErrorIntegrator,
    pending: PendingCompensation,
}
impl Compensator {
    pub fn new(
        model: DriftModel,
        rtc: RtcConfig,
        sampler_config: SamplerConfig,
        calibration: Calibration,
    ) -> Result<Self, CompensationError> {
        let integrator = ErrorIntegrator::new(model, rtc)?;
        debug!(
            "drift model: {} entries, max {} per interval, {} per cycle",
            model.table().len(),
            model.static_fine_error() + model.table().max_entry(),
            model.max_error_per_cycle(),
        );
        Ok(Self {
            sampler: TemperatureSampler::new(calibration, sampler_config, *model.table()),
            integrator,
            pending: PendingCompensation::new(),
        })
    }

    /// Handles a completed temperature conversion.
    pub fn on_sample_ready(&mut self, raw: u16) -> u16 {
        self.sampler.on_sample_ready(raw, &self.pending)
    }

    /// Handles an elapsed interval.
    pub fn on_tick<H: TickHardware>(&mut self, hardware: &mut H) -> Result<Correction, CompensationError> {
        self.integrator.on_tick(&self.pending, hardware)
    }

    /// The compensation the next tick will apply.
    pub fn pending_compensation(&self) -> u16 {
        self.pending.get()
    }

    pub fn accumulated_error(&self) -> u16 {
        self.integrator.accumulated_error()
    }

    /// The period to program before the first tick.
    pub fn initial_period(&self) -> u16 {
        self.integrator.initial_period()
    }

    pub fn sampler(&self) -> &TemperatureSampler {
        &self.sampler
    }

    pub fn integrator(&self) -> &ErrorIntegrator {
        &self.integrator
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            samples: self.sampler.samples(),
            clamp_events: self.sampler.clamp_events(),
            ticks: self.integrator.ticks(),
            corrected_cycles: self.integrator.corrected_cycles(),
            faults: self.integrator.faults(),
        }
    }
}
