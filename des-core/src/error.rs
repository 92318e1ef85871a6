//! Error types for the simulation engine

use thiserror::Error;

/// Top-level error type for engine operations
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Event error: {0}")]
    Event(#[from] EventError),

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

/// Errors related to scheduled tasks and their results
#[derive(Debug, Error)]
pub enum EventError {
    #[error("No result recorded for {0}")]
    ResultNotFound(String),

    #[error("Task result type mismatch: expected {expected}")]
    TypeMismatch { expected: String },
}
