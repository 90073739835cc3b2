//! Error types for constraint-graph preprocessing

use thiserror::Error;

/// Errors surfaced by the preprocessing driver and the pointer registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrepError {
    /// Registering or referencing a pointer variable failed
    #[error("Registration error: {0}")]
    Registration(String),

    /// The pointer universe outgrew the configured capacity
    #[error("Capacity error: {0}")]
    Capacity(String),

    /// A driver operation was called out of round order
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),
}

impl PrepError {
    pub fn registration(msg: impl Into<String>) -> Self {
        PrepError::Registration(msg.into())
    }

    pub fn capacity(msg: impl Into<String>) -> Self {
        PrepError::Capacity(msg.into())
    }

    pub fn lifecycle(msg: impl Into<String>) -> Self {
        PrepError::Lifecycle(msg.into())
    }
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, PrepError>;
