//! Error types for resource construction

use thiserror::Error;

/// Errors raised while building resources from configuration.
///
/// Runtime contention never produces these: modelled failures are
/// [`crate::SimFailure`]s and usage errors panic.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Invalid resource configuration: `{field}` must not be empty")]
    EmptyIdentifier { field: &'static str },

    #[error("Invalid resource configuration: {0}")]
    InvalidConfiguration(String),
}
