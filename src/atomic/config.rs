//! Configuration and builder for the atomic operations engine.

use super::AtomicOperations;
use crate::error::{AtomicError, AtomicResult, BuildError, BuildResult};
use crate::registry::ResourceRegistry;
use serde::{Deserialize, Serialize};

/// Engine configuration.
///
/// Deserializable from JSON; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtomicOperationsConfig {
    /// Route the HTTP surface mounts on. Defaults to "/operations".
    pub url_path: String,

    /// Upper bound on operations per batch. Unbounded when `None`.
    pub max_operations: Option<usize>,

    /// Accept batches with no operations instead of rejecting them.
    pub allow_empty_batch: bool,
}

impl Default for AtomicOperationsConfig {
    fn default() -> Self {
        Self {
            url_path: "/operations".to_string(),
            max_operations: None,
            allow_empty_batch: false,
        }
    }
}

impl AtomicOperationsConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> BuildResult<()> {
        if !self.url_path.starts_with('/') {
            return Err(BuildError::InvalidConfiguration {
                message: format!("url_path must start with '/', got '{}'", self.url_path),
            });
        }

        if self.max_operations == Some(0) {
            return Err(BuildError::InvalidConfiguration {
                message: "max_operations must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Reject batches whose size is outside the configured bounds.
    pub fn check_batch_size(&self, count: usize) -> AtomicResult<()> {
        if count == 0 && !self.allow_empty_batch {
            return Err(AtomicError::malformed("batch contains no operations"));
        }

        if let Some(max) = self.max_operations {
            if count > max {
                return Err(AtomicError::malformed(format!(
                    "batch contains {} operations, the limit is {}",
                    count, max
                )));
            }
        }

        Ok(())
    }
}

/// Builder for [`AtomicOperations`].
///
/// # Examples
///
/// ```rust
/// use jsonapi_atomic::atomic::AtomicOperationsBuilder;
/// use jsonapi_atomic::registry::ResourceRegistry;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let operations = AtomicOperationsBuilder::new(ResourceRegistry::default())
///     .with_url_path("/api/operations")
///     .with_max_operations(100)
///     .build()?;
///
/// assert_eq!(operations.config().url_path, "/api/operations");
/// # Ok(())
/// # }
/// ```
pub struct AtomicOperationsBuilder {
    registry: ResourceRegistry,
    config: AtomicOperationsConfig,
}

impl AtomicOperationsBuilder {
    pub fn new(registry: ResourceRegistry) -> Self {
        Self {
            registry,
            config: AtomicOperationsConfig::default(),
        }
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: AtomicOperationsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_url_path(mut self, url_path: impl Into<String>) -> Self {
        self.config.url_path = url_path.into();
        self
    }

    pub fn with_max_operations(mut self, max_operations: usize) -> Self {
        self.config.max_operations = Some(max_operations);
        self
    }

    pub fn allow_empty_batch(mut self, allow: bool) -> Self {
        self.config.allow_empty_batch = allow;
        self
    }

    /// Validate the configuration and build the engine.
    pub fn build(self) -> BuildResult<AtomicOperations> {
        self.config.validate()?;
        Ok(AtomicOperations::from_parts(self.registry, self.config))
    }
}
