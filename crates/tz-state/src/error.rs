//! Error types for state reconciliation and zone composition.

use thiserror::Error;

/// Result type for state operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur when assembling a zone.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StateError {
    /// Invalid argument provided at construction time.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Invalid regulation configuration.
    #[error(transparent)]
    Control(#[from] tz_control::ControlError),

    /// Invalid cycling configuration.
    #[error(transparent)]
    Cycle(#[from] tz_cycling::CycleError),
}
