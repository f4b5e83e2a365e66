//! The tick-driven control loop: accumulates fine error and shortens the RTC period by whole
//! crystal cycles whenever more than one cycle's worth has built up.
//!
//! Error that is smaller than one cycle cannot be compensated in the current interval; it is kept
//! in the accumulator and carried over into the next one.


use crate::error::CompensationError;
use crate::shared::PendingCompensation;
use crate::table::DriftModel;


/// The hardware the tick handler drives.
pub trait TickHardware {
    /// Starts a new temperature conversion.
    fn start_conversion(&mut self);

    /// Writes the RTC period register. The counter counts `period + 1` crystal cycles per interval.
    fn set_period(&mut self, period: u16);

    /// Acknowledges the tick so that the next one is delivered.
    fn clear_tick_flag(&mut self);
}


/// Configuration of the RTC interval.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RtcConfig {
    /// Crystal cycles in one uncorrected interval.
    pub ticks_per_interval: u32,

    /// Whole cycles removed from every interval independent of temperature, e.g. as measured in
    /// production. Negative values lengthen the interval.
    pub static_cycle_correction: i16,
}
impl RtcConfig {
    /// One second of a 32.768 kHz crystal without static correction.
    pub const ONE_SECOND: Self = Self::new(32_768, 0);

    pub const fn new(ticks_per_interval: u32, static_cycle_correction: i16) -> Self {
        Self { ticks_per_interval, static_cycle_correction }
    }

    /// The period register value for an uncorrected interval.
    pub const fn nominal_period(&self) -> i64 {
        self.ticks_per_interval as i64 - 1
    }
}


/// What a single tick did to the period register.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Correction {
    /// Whole cycles removed on top of the static correction.
    pub cycles: u16,

    /// The value written to the period register.
    pub period: u16,
}


/// Handles the "interval elapsed" event of the RTC.
#[derive(Clone, Debug)]
pub struct ErrorIntegrator {
    model: DriftModel,
    rtc: RtcConfig,
    accumulated_error: u16,
    ticks: u32,
    corrected_cycles: u32,
    faults: u32,
}
impl ErrorIntegrator {
    /// Creates an integrator with an empty accumulator.
    ///
    /// Fails if the period register could leave its 16-bit range for any number of cycles the
    /// model can ask for.
    pub const fn new(model: DriftModel, rtc: RtcConfig) -> Result<Self, CompensationError> {
        let base = rtc.nominal_period() - rtc.static_cycle_correction as i64;
        let shortest = base - model.max_cycles_per_interval() as i64;
        if shortest < 0 || base > u16::MAX as i64 {
            return Err(CompensationError::PeriodOutOfRange);
        }
        Ok(Self {
            model,
            rtc,
            accumulated_error: 0,
            ticks: 0,
            corrected_cycles: 0,
            faults: 0,
        })
    }

    /// The period to program before the first tick: nominal length minus the static correction.
    pub fn initial_period(&self) -> u16 {
        // range checked in new()
        (self.rtc.nominal_period() - i64::from(self.rtc.static_cycle_correction)) as u16
    }

    /// Runs one iteration of the control loop.
    ///
    /// Starts the next temperature conversion, folds the static error and the pending
    /// compensation (measured during the previous interval) into the accumulator, programs the
    /// shortened period and acknowledges the tick.
    ///
    /// If the correction cannot be computed, the conversion is still started and the tick still
    /// acknowledged. The accumulator is left untouched and the period register falls back to
    /// [`initial_period`](ErrorIntegrator::initial_period), so no cycle removed by the previous
    /// interval is removed again.
    pub fn on_tick<H: TickHardware>(
        &mut self,
        pending: &PendingCompensation,
        hardware: &mut H,
    ) -> Result<Correction, CompensationError> {
        hardware.start_conversion();

        let result = self.correct(pending.get());
        match result {
            Ok(correction) => {
                hardware.set_period(correction.period);
                if correction.cycles > 0 {
                    trace!("removing {} cycle(s), period {}", correction.cycles, correction.period);
                }
            },
            Err(e) => {
                hardware.set_period(self.initial_period());
                self.faults = self.faults.wrapping_add(1);
                error!("correction skipped: {}", e);
            },
        }

        hardware.clear_tick_flag();
        self.ticks = self.ticks.wrapping_add(1);
        result
    }

    /// Accumulates one interval's error and derives the period; commits only on success.
    fn correct(&mut self, compensation: u16) -> Result<Correction, CompensationError> {
        let max_entry = self.model.table().max_entry();
        if compensation > max_entry {
            return Err(CompensationError::CompensationOutOfModel { value: compensation, max: max_entry });
        }

        let cycle_error = self.model.max_error_per_cycle();
        let mut accumulated = self.accumulated_error
            .checked_add(self.model.static_fine_error())
            .and_then(|a| a.checked_add(compensation))
            .ok_or(CompensationError::AccumulatorOverflow)?;

        let mut cycles: u16 = 0;
        while accumulated > cycle_error {
            cycles += 1;
            accumulated -= cycle_error;
        }

        let period = self.rtc.nominal_period()
            - i64::from(self.rtc.static_cycle_correction)
            - i64::from(cycles);
        let period = u16::try_from(period)
            .map_err(|_| CompensationError::PeriodOutOfRange)?;

        self.accumulated_error = accumulated;
        self.corrected_cycles = self.corrected_cycles.wrapping_add(u32::from(cycles));
        Ok(Correction { cycles, period })
    }

    /// The error carried over into the next interval; never more than one cycle's worth.
    pub fn accumulated_error(&self) -> u16 {
        self.accumulated_error
    }

    pub fn model(&self) -> &DriftModel {
        &self.model
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Total whole cycles removed beyond the static correction.
    pub fn corrected_cycles(&self) -> u32 {
        self.corrected_cycles
    }

    /// Ticks on which no correction could be applied.
    pub fn faults(&self) -> u32 {
        self.faults
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Registers {
        conversions: u32,
        period: Option<u16>,
        flag_clears: u32,
    }
    impl TickHardware for Registers {
        fn start_conversion(&mut self) { self.conversions += 1; }
        fn set_period(&mut self, period: u16) { self.period = Some(period); }
        fn clear_tick_flag(&mut self) { self.flag_clears += 1; }
    }

    #[test]
    fn carries_remainder_between_ticks() {
        let mut integrator = ErrorIntegrator::new(DriftModel::FINE, RtcConfig::ONE_SECOND).unwrap();
        let pending = PendingCompensation::new();
        let mut regs = Registers::default();

        let mut errors = [0u16; 4];
        let mut cycles = [0u16; 4];
        for i in 0..4 {
            let correction = integrator.on_tick(&pending, &mut regs).unwrap();
            errors[i] = integrator.accumulated_error();
            cycles[i] = correction.cycles;
        }
        assert_eq!(errors, [960, 1920, 2880, 788]);
        assert_eq!(cycles, [0, 0, 0, 1]);
        assert_eq!(regs.period, Some(32_766));
        assert_eq!(regs.conversions, 4);
        assert_eq!(regs.flag_clears, 4);
    }

    #[test]
    fn exactly_one_cycle_is_kept_not_removed() {
        // static error equal to a full cycle: 3052 is not > 3052
        let model = DriftModel::new(DriftModel::FINE.table().entries(), 3052, 3052).unwrap();
        let mut integrator = ErrorIntegrator::new(model, RtcConfig::ONE_SECOND).unwrap();
        let pending = PendingCompensation::new();
        let mut regs = Registers::default();

        assert_eq!(integrator.on_tick(&pending, &mut regs).unwrap().cycles, 0);
        assert_eq!(integrator.accumulated_error(), 3052);
        assert_eq!(integrator.on_tick(&pending, &mut regs).unwrap().cycles, 1);
        assert_eq!(integrator.accumulated_error(), 3052);
    }

    #[test]
    fn static_cycle_correction_shifts_period() {
        let integrator = ErrorIntegrator::new(DriftModel::FINE, RtcConfig::new(32_768, 2)).unwrap();
        assert_eq!(integrator.initial_period(), 32_765);
        let integrator = ErrorIntegrator::new(DriftModel::FINE, RtcConfig::new(32_768, -2)).unwrap();
        assert_eq!(integrator.initial_period(), 32_769);
    }

    #[test]
    fn rejects_periods_outside_register() {
        assert_eq!(
            ErrorIntegrator::new(DriftModel::FINE, RtcConfig::new(65_537, 0)).map(|_| ()),
            Err(CompensationError::PeriodOutOfRange),
        );
        assert_eq!(
            ErrorIntegrator::new(DriftModel::FINE, RtcConfig::new(1, 0)).map(|_| ()),
            Err(CompensationError::PeriodOutOfRange),
        );
    }

    #[test]
    fn out_of_model_compensation_is_a_fault_not_a_correction() {
        let mut integrator = ErrorIntegrator::new(DriftModel::FINE, RtcConfig::ONE_SECOND).unwrap();
        let pending = PendingCompensation::new();
        let mut regs = Registers::default();

        // the fourth tick removes a cycle
        for _ in 0..4 {
            integrator.on_tick(&pending, &mut regs).unwrap();
        }
        assert_eq!(regs.period, Some(32_766));
        assert_eq!(integrator.accumulated_error(), 788);

        pending.set(5000);
        assert_eq!(
            integrator.on_tick(&pending, &mut regs),
            Err(CompensationError::CompensationOutOfModel { value: 5000, max: 1311 }),
        );
        // back to the uncorrected period, the removed cycle is not removed twice
        assert_eq!(regs.period, Some(32_767));
        assert_eq!(regs.period, Some(integrator.initial_period()));
        assert_eq!(regs.conversions, 5);
        assert_eq!(regs.flag_clears, 5);
        assert_eq!(integrator.accumulated_error(), 788);
        assert_eq!(integrator.corrected_cycles(), 1);
        assert_eq!(integrator.faults(), 1);
        assert_eq!(integrator.ticks(), 5);

        pending.set(0);
        assert!(integrator.on_tick(&pending, &mut regs).is_ok());
        assert_eq!(integrator.accumulated_error(), 788 + 960);
    }

    #[test]
    fn fault_restores_static_period() {
        let rtc = RtcConfig::new(32_768, 2);
        let mut integrator = ErrorIntegrator::new(DriftModel::FINE, rtc).unwrap();
        let pending = PendingCompensation::new();
        let mut regs = Registers::default();

        pending.set(1311);
        integrator.on_tick(&pending, &mut regs).unwrap();
        integrator.on_tick(&pending, &mut regs).unwrap();
        assert_eq!(regs.period, Some(32_764));

        pending.set(u16::MAX);
        assert!(integrator.on_tick(&pending, &mut regs).is_err());
        assert_eq!(regs.period, Some(32_765));
    }
}
