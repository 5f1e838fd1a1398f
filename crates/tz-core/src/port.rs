//! Actuator port traits.
//!
//! The core never talks to hardware directly: the host injects one port per
//! physical actuator. A port call may fail (a network switch, a radio valve);
//! the scheduler logs the failure and keeps dispatching, so one broken
//! actuator never leaves the rest of the zone in an ambiguous state.

use thiserror::Error;

/// Failure reported by an actuator port.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PortError {
    #[error("Actuator command failed: {what}")]
    CommandFailed { what: String },

    #[error("Actuator unavailable: {what}")]
    Unavailable { what: &'static str },
}

/// On/off actuator (relay, smart switch, heater contactor).
pub trait SwitchPort {
    fn turn_on(&mut self) -> Result<(), PortError>;
    fn turn_off(&mut self) -> Result<(), PortError>;
    /// Last known physical state.
    fn is_active(&self) -> bool;
}

/// Proportional valve actuator driven by an opening percentage.
pub trait ValvePort {
    fn set_opening_percent(&mut self, percent: u8) -> Result<(), PortError>;
}
