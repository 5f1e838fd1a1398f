//! Thermal regulation algorithms for thermozone.
//!
//! Two stateful per-zone components live here:
//! - [`DutyCycleRegulator`]: proportional regulation over internal and
//!   external temperature error, with optional derivative anticipation,
//!   producing a fractional duty cycle in [0, 1].
//! - [`AutoShutdownDetector`]: accumulated-error hysteresis deciding whether
//!   the whole zone should be fully shut down or restarted.
//!
//! Both are pure computation over caller-supplied inputs: no I/O, no clocks
//! of their own, one evaluation per tick.

pub mod autostop;
pub mod error;
pub mod regulator;

pub use autostop::{AutoShutdownDetector, ShutdownLevel, TEMP_HYSTERESIS};
pub use error::{ControlError, ControlResult};
pub use regulator::{AnticipationMode, DutyCycleRegulator, DutyCycleResult, RegulatorConfig};
