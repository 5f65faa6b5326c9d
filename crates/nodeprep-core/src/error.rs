//! Core domain errors.

use thiserror::Error;

/// Core domain errors for nodeprep.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Unknown crypto category name.
    #[error("unknown crypto category: {0}")]
    UnknownCategory(String),

    /// Unknown node role name.
    #[error("unknown node role: {0}")]
    UnknownRole(String),

    /// Invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
