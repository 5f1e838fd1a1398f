//! Error types for regulation algorithms.

use thiserror::Error;

/// Result type for regulation operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors that can occur when configuring a regulation component.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid argument provided at construction time.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}
