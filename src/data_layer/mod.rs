//! Data layer abstraction.
//!
//! A data layer is a storage backend handle opened for one operation of a batch.
//! Besides plain CRUD it exposes a small atomic protocol:
//!
//! * [`DataLayer::atomic_start`] is called exactly once per handle, with the
//!   handle that began before it (if any). A backend may join the previous
//!   handle's [`AtomicScope`] or open its own scope and remember the previous
//!   one as its parent.
//! * [`DataLayer::atomic_end`] is called exactly once per batch, on the last
//!   handle that began, and must commit or roll back every scope reachable
//!   from it.
//! * A backend that shares nothing may no-op both calls and return `None`
//!   from [`DataLayer::atomic_scope`]. Such a handle is passed over when a
//!   later handle picks its predecessor, and if it is the last handle the
//!   caller finishes the nearest earlier scope after ending it.
//!
//! Handles are created through a [`DataLayerFactory`] from the keyword
//! arguments produced by dependency resolution.
//!
//! # Example
//!
//! ```rust
//! use jsonapi_atomic::data_layer::{DataLayer, DataLayerArgs, DataLayerFactory, InMemoryDataLayerFactory};
//! use jsonapi_atomic::resource::ResourceObject;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let factory = InMemoryDataLayerFactory::default();
//! let mut handle = factory.open("post", &DataLayerArgs::new()).await?;
//!
//! handle.atomic_start(None).await?;
//! let post = handle
//!     .create_object(ResourceObject::new("post").with_attribute("title", json!("t")))
//!     .await?;
//! handle.atomic_end(true).await?;
//!
//! assert_eq!(post.get_id(), Some("1"));
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod in_memory;

pub use errors::{StorageError, StorageResult};
pub use in_memory::{AtomicSession, InMemoryDataLayer, InMemoryDataLayerFactory, InMemoryStorage};

use crate::resource::ResourceObject;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::any::Any;
use std::sync::Arc;

/// Keyword arguments a data layer handle is constructed with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataLayerArgs(Map<String, Value>);

impl DataLayerArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one argument, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(name.into(), value)
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Get a string argument.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// Merge `other` into `self`; keys in `other` win.
    pub fn merge(&mut self, other: DataLayerArgs) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for DataLayerArgs {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Composite key for resource storage: `tenant / type / id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey {
    tenant_id: String,
    resource_type: String,
    resource_id: String,
}

impl StorageKey {
    /// Create a new storage key.
    pub fn new(
        tenant_id: impl Into<String>,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.tenant_id, self.resource_type, self.resource_id
        )
    }
}

/// A unit of pending work that commits or rolls back as a whole.
///
/// Scopes form a chain through [`parent`](AtomicScope::parent); committing or
/// rolling back a scope carries the decision to every ancestor.
#[async_trait]
pub trait AtomicScope: Send + Sync {
    /// Make pending work durable, ancestors first.
    async fn commit(&self) -> StorageResult<()>;

    /// Discard pending work here and in every ancestor.
    async fn rollback(&self) -> StorageResult<()>;

    /// The scope this one was chained after.
    fn parent(&self) -> Option<&dyn AtomicScope> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

/// A storage backend handle.
#[async_trait]
pub trait DataLayer: Send + Sync {
    /// Short backend name for log output.
    fn name(&self) -> &str;

    /// Persist a new resource and return it with its id assigned.
    async fn create_object(&mut self, resource: ResourceObject) -> StorageResult<ResourceObject>;

    /// Read one resource. Pending writes of the handle's scope are visible.
    async fn get_object(
        &self,
        resource_type: &str,
        id: &str,
    ) -> StorageResult<Option<ResourceObject>>;

    /// Replace a stored resource. The resource must carry its id.
    async fn update_object(&mut self, resource: ResourceObject) -> StorageResult<ResourceObject>;

    /// Delete a stored resource.
    async fn delete_object(&mut self, resource_type: &str, id: &str) -> StorageResult<()>;

    /// Enter atomic mode, chained after `previous`: the nearest earlier
    /// handle exposing a scope, or the one right before when none does.
    async fn atomic_start(&mut self, previous: Option<&dyn DataLayer>) -> StorageResult<()>;

    /// Leave atomic mode, committing on `success` and rolling back otherwise.
    async fn atomic_end(&mut self, success: bool) -> StorageResult<()>;

    /// The scope a following handle should chain after, or `None` when the
    /// handle takes no part in the shared transaction.
    fn atomic_scope(&self) -> Option<Arc<dyn AtomicScope>>;
}

/// Opens data layer handles for a resource type.
#[async_trait]
pub trait DataLayerFactory: Send + Sync {
    async fn open(
        &self,
        resource_type: &str,
        args: &DataLayerArgs,
    ) -> StorageResult<Box<dyn DataLayer>>;
}
