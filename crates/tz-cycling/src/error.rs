//! Error types for actuator cycling.

use thiserror::Error;

/// Result type for cycling operations.
pub type CycleResult<T> = Result<T, CycleError>;

/// Errors that can occur when configuring the cycle engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CycleError {
    /// Invalid argument provided at construction time.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}
