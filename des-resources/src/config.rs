//! Resource configuration as supplied by the model.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ResourceError;

/// Globally unique identity of a passive resource instance: the resource
/// definition plus the structural context it was instantiated in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId {
    pub resource: String,
    pub context: String,
}

impl ResourceId {
    pub fn new(resource: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            context: context.into(),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.context)
    }
}

/// Static description of one passive resource instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassiveResourceConfig {
    /// Total units; also the initial number of available units.
    pub capacity: u64,
    /// Id of the resource definition in the model.
    pub resource_id: String,
    /// Human readable name of the resource definition.
    pub resource_name: String,
    /// Id of the structural (assembly) context owning this instance.
    pub context_id: String,
}

impl PassiveResourceConfig {
    pub fn new(
        capacity: u64,
        resource_id: impl Into<String>,
        resource_name: impl Into<String>,
        context_id: impl Into<String>,
    ) -> Self {
        Self {
            capacity,
            resource_id: resource_id.into(),
            resource_name: resource_name.into(),
            context_id: context_id.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ResourceError> {
        if self.resource_id.trim().is_empty() {
            return Err(ResourceError::EmptyIdentifier { field: "resource_id" });
        }
        if self.context_id.trim().is_empty() {
            return Err(ResourceError::EmptyIdentifier { field: "context_id" });
        }
        if self.resource_id.contains(':') || self.context_id.contains(':') {
            return Err(ResourceError::InvalidConfiguration(format!(
                "identifiers may not contain ':' (got `{}` in `{}`)",
                self.resource_id, self.context_id
            )));
        }
        Ok(())
    }

    pub fn id(&self) -> ResourceId {
        ResourceId::new(&self.resource_id, &self.context_id)
    }
}
