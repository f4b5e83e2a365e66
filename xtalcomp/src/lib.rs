//! Temperature compensation of a 32.768 kHz real-time clock crystal.
//!
//! Tuning-fork crystals slow down as they move away from their turnover temperature. This crate
//! measures the temperature once per interval, looks up the resulting fine timing error in a drift
//! table, accumulates it together with a static error term and shortens the RTC period by one
//! crystal cycle whenever a full cycle's worth of error has built up. Sub-cycle remainders are
//! carried over, never dropped.
//!
//! Two events drive the loop, both typically interrupt handlers:
//!
//! * [`TemperatureSampler::on_sample_ready`] when a temperature conversion completes, and
//! * [`ErrorIntegrator::on_tick`] once per interval, which also starts the next conversion.
//!
//! They communicate only through a [`PendingCompensation`] cell, so a compensation measured during
//! one interval is applied in the next. [`Compensator`] bundles everything for callers that
//! dispatch both events themselves.
#![cfg_attr(not(test), no_std)]


mod fmt;

pub mod calibration;
pub mod compensator;
pub mod error;
pub mod integrator;
pub mod sampler;
pub mod shared;
pub mod table;


pub use crate::calibration::{Calibration, CalibrationPoint};
pub use crate::compensator::{Compensator, Diagnostics};
pub use crate::error::CompensationError;
pub use crate::integrator::{Correction, ErrorIntegrator, RtcConfig, TickHardware};
pub use crate::sampler::{SamplerConfig, TemperatureSampler};
pub use crate::shared::{PendingCompensation, SingleAccess, SyncVolatileCell};
pub use crate::table::{CompensationTable, DriftModel};
