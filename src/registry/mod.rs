//! Resource registry.
//!
//! The registry maps resource type strings to [`ResourceDescriptor`]s. It is
//! assembled once at startup through [`ResourceRegistryBuilder`] and is
//! read-only afterwards; clones share the same map.
//!
//! # Example
//!
//! ```rust
//! use jsonapi_atomic::data_layer::InMemoryDataLayerFactory;
//! use jsonapi_atomic::registry::{ResourceDescriptor, ResourceRegistry};
//! use jsonapi_atomic::schema::Schema;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let factory = Arc::new(InMemoryDataLayerFactory::default());
//! let registry = ResourceRegistry::builder()
//!     .register(ResourceDescriptor::new(Schema::new("post"), factory.clone()))?
//!     .register(ResourceDescriptor::new(Schema::new("user"), factory))?
//!     .build();
//!
//! assert!(registry.resolve("post").is_ok());
//! assert!(registry.resolve("comment").is_err());
//! # Ok(())
//! # }
//! ```

mod descriptor;

pub use descriptor::ResourceDescriptor;

use crate::error::{AtomicError, AtomicResult, BuildError, BuildResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Read-only lookup from resource type to descriptor.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    descriptors: Arc<HashMap<String, Arc<ResourceDescriptor>>>,
}

impl ResourceRegistry {
    pub fn builder() -> ResourceRegistryBuilder {
        ResourceRegistryBuilder::default()
    }

    /// Look up the descriptor for `resource_type`.
    pub fn resolve(&self, resource_type: &str) -> AtomicResult<Arc<ResourceDescriptor>> {
        self.descriptors
            .get(resource_type)
            .cloned()
            .ok_or_else(|| AtomicError::unknown_resource_type(resource_type))
    }

    pub fn contains(&self, resource_type: &str) -> bool {
        self.descriptors.contains_key(resource_type)
    }

    /// Registered resource types, sorted.
    pub fn resource_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.descriptors.keys().map(|s| s.as_str()).collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Collects descriptors before the registry is frozen.
#[derive(Debug, Default)]
pub struct ResourceRegistryBuilder {
    descriptors: HashMap<String, Arc<ResourceDescriptor>>,
}

impl ResourceRegistryBuilder {
    /// Register a resource type. Each type may be registered once.
    pub fn register(mut self, descriptor: ResourceDescriptor) -> BuildResult<Self> {
        let resource_type = descriptor.resource_type().to_string();
        if resource_type.is_empty() {
            return Err(BuildError::InvalidConfiguration {
                message: "resource type cannot be empty".to_string(),
            });
        }
        if self.descriptors.contains_key(&resource_type) {
            return Err(BuildError::DuplicateResourceType { resource_type });
        }
        self.descriptors.insert(resource_type, Arc::new(descriptor));
        Ok(self)
    }

    pub fn build(self) -> ResourceRegistry {
        ResourceRegistry {
            descriptors: Arc::new(self.descriptors),
        }
    }
}
