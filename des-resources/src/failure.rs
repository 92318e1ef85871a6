//! Modelled failures.
//!
//! A [`SimFailure`] is an expected outcome of the simulated system, not a
//! fault of the simulator. It travels through the simulation's own failure
//! path: returned from `acquire` for an immediate timeout, or delivered to
//! the waiting process when a timeout fires.

use des_core::SimTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::ResourceId;
use crate::process::ProcessId;

/// Opaque failure-type token handed out by a [`FailureCatalog`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FailureType {
    pub id: String,
    pub name: String,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Source of failure types, typically backed by the failure statistics of
/// the model. The resource layer raises whatever token it gets back and
/// never interprets it.
pub trait FailureCatalog {
    fn resource_timeout_failure_type(&self, context_id: &str, resource_id: &str) -> FailureType;
}

/// Catalog that derives one failure type per resource instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFailureCatalog;

impl FailureCatalog for DefaultFailureCatalog {
    fn resource_timeout_failure_type(&self, context_id: &str, resource_id: &str) -> FailureType {
        FailureType {
            id: format!("resource-timeout:{resource_id}:{context_id}"),
            name: format!("Resource timeout of {resource_id} in {context_id}"),
        }
    }
}

/// A resource acquisition that timed out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{failure_type}: {process} gave up waiting for {resource} at {time}")]
pub struct SimFailure {
    pub failure_type: FailureType,
    pub resource: ResourceId,
    pub process: ProcessId,
    pub time: SimTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_default_catalog_is_per_instance() {
        let catalog = DefaultFailureCatalog;
        let a = catalog.resource_timeout_failure_type("ctx-1", "pool");
        let b = catalog.resource_timeout_failure_type("ctx-2", "pool");
        assert_ne!(a, b);
        assert_eq!(a, catalog.resource_timeout_failure_type("ctx-1", "pool"));
    }

    #[test]
    fn test_failure_message_names_resource() {
        let failure = SimFailure {
            failure_type: DefaultFailureCatalog.resource_timeout_failure_type("ctx", "pool"),
            resource: ResourceId::new("pool", "ctx"),
            process: ProcessId(Uuid::nil()),
            time: SimTime::from_millis(5),
        };
        let message = failure.to_string();
        assert!(message.contains("pool:ctx"));
        assert!(message.contains("5.000ms"));
    }
}
