//! Atomic Operations engine for JSON:API style resource servers.
//!
//! Executes a batch of add/update/remove operations, possibly spanning several
//! resource types and storage backends, as one all-or-nothing unit. Each
//! operation gets its own data layer handle; the handles are chained in
//! submission order and the whole chain commits or rolls back through a single
//! `end` on the last handle.
//!
//! # Core Components
//!
//! - [`AtomicOperations`] - Entry point executing batches
//! - [`ResourceRegistry`] - Resource types and their descriptors
//! - [`DataLayer`] - Trait for implementing storage backends
//! - [`ResourceHandler`] - Per-resource create/update/delete hooks
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use jsonapi_atomic::{AtomicOperations, RequestContext, ResourceDescriptor, ResourceRegistry};
//! use jsonapi_atomic::data_layer::InMemoryDataLayerFactory;
//! use jsonapi_atomic::schema::{AttributeDefinition, AttributeType, Schema};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = ResourceRegistry::builder()
//!     .register(ResourceDescriptor::new(
//!         Schema::new("post")
//!             .with_attribute(AttributeDefinition::new("title", AttributeType::String)),
//!         Arc::new(InMemoryDataLayerFactory::default()),
//!     ))?
//!     .build();
//!
//! let operations = AtomicOperations::builder(registry).build()?;
//! let response = operations
//!     .handle_document(
//!         json!({"atomic:operations": [
//!             {"op": "add", "data": {"type": "post", "attributes": {"title": "hello"}}}
//!         ]}),
//!         RequestContext::with_generated_id(),
//!     )
//!     .await?;
//! println!("{}", response.to_json()?);
//! # Ok(())
//! # }
//! ```

pub mod atomic;
pub mod data_layer;
pub mod dependencies;
pub mod error;
pub mod handlers;
/// HTTP surface built on axum.
///
/// This module is only available when the `http` feature is enabled.
#[cfg(feature = "http")]
pub mod http;
pub mod operation;
pub mod registry;
pub mod resource;
pub mod schema;

// Re-export commonly used types for convenience
pub use atomic::{AtomicOperations, AtomicOperationsBuilder, AtomicOperationsConfig, AtomicResponse};
pub use data_layer::{DataLayer, DataLayerArgs, DataLayerFactory, StorageError};
pub use dependencies::{DependencyHandler, HttpMethod, MethodConfig, MethodDependencies};
pub use error::{AtomicError, AtomicResult, BuildError, ValidationError};
pub use handlers::{ResourceHandler, StandardResourceHandler};
pub use operation::{Action, AtomicOperationRequest, Operation, OperationData};
pub use registry::{ResourceDescriptor, ResourceRegistry};
pub use resource::{RequestContext, ResourceIdentifier, ResourceObject};
pub use schema::Schema;
