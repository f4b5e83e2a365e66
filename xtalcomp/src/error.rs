//! Errors raised while validating a drift model or running the control loop.


use core::fmt;


/// An error that may occur while compensating the RTC.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CompensationError {
    /// The compensation table contains no entries.
    EmptyTable,

    /// The compensation table decreases at `index` (compared to the entry before it).
    NonMonotonicTable { index: usize },

    /// The error of one crystal clock period has been configured as zero.
    ZeroCycleError,

    /// The accumulated error would not fit into its 16-bit storage.
    AccumulatorOverflow,

    /// A pending compensation value larger than any table entry has been observed.
    CompensationOutOfModel { value: u16, max: u16 },

    /// The corrected period does not fit into the 16-bit period register.
    PeriodOutOfRange,

    /// Both calibration points have the same ADC reading or the same temperature.
    DegenerateCalibration,
}
impl fmt::Display for CompensationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTable
                => write!(f, "compensation table is empty"),
            Self::NonMonotonicTable { index }
                => write!(f, "compensation table decreases at index {}", index),
            Self::ZeroCycleError
                => write!(f, "error per crystal cycle is zero"),
            Self::AccumulatorOverflow
                => write!(f, "accumulated error overflows 16 bits"),
            Self::CompensationOutOfModel { value, max }
                => write!(f, "pending compensation {} exceeds model maximum {}", value, max),
            Self::PeriodOutOfRange
                => write!(f, "corrected period does not fit the period register"),
            Self::DegenerateCalibration
                => write!(f, "calibration points do not define a slope"),
        }
    }
}
