//! Atomic batch execution.
//!
//! [`AtomicOperations`] is the entry point. A batch runs in two phases:
//!
//! 1. **Resolution** (no side effects): every operation's resource type is
//!    resolved against the registry. An unknown type fails the batch before
//!    any data layer handle exists.
//! 2. **Execution**, strictly in submission order: for each operation the
//!    dependencies are bound, a handle is opened and begun after the previous
//!    one, and the operation is executed against it.
//!
//! On success the chain is ended once with `success = true`. On any failure
//! the chain is ended once with `success = false` before the error is
//! returned, and no partial results are surfaced.
//!
//! Execution happens on a spawned task. If the caller stops polling, the
//! batch notices at its next suspension point and rolls back.
//!
//! # Example
//!
//! ```rust
//! use jsonapi_atomic::atomic::AtomicOperations;
//! use jsonapi_atomic::data_layer::InMemoryDataLayerFactory;
//! use jsonapi_atomic::registry::{ResourceDescriptor, ResourceRegistry};
//! use jsonapi_atomic::resource::RequestContext;
//! use jsonapi_atomic::schema::{AttributeDefinition, AttributeType, Schema};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = Schema::new("post")
//!     .with_attribute(AttributeDefinition::new("title", AttributeType::String).required())
//!     .with_attribute(AttributeDefinition::new("body", AttributeType::String));
//! let registry = ResourceRegistry::builder()
//!     .register(ResourceDescriptor::new(schema, Arc::new(InMemoryDataLayerFactory::default())))?
//!     .build();
//! let operations = AtomicOperations::new(registry);
//!
//! let response = operations
//!     .handle_document(
//!         json!({"atomic:operations": [
//!             {"op": "add", "data": {"type": "post", "attributes": {"title": "t", "body": "b"}}},
//!             {"op": "remove", "data": {"type": "post", "id": "1"}}
//!         ]}),
//!         RequestContext::with_generated_id(),
//!     )
//!     .await?;
//!
//! assert_eq!(response.len(), 2);
//! assert!(response.results[1].data.is_none());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod coordinator;
pub mod executor;
pub mod results;

pub use config::{AtomicOperationsBuilder, AtomicOperationsConfig};
pub use coordinator::{DataLayerCoordinator, TransactionChain};
pub use executor::{OperationExecutor, PreparedOperation};
pub use results::{AtomicResponse, ResultAggregator, ResultEntry};

use crate::dependencies::DependencyBinder;
use crate::error::{AtomicError, AtomicResult};
use crate::operation::AtomicOperationRequest;
use crate::registry::ResourceRegistry;
use crate::resource::RequestContext;
use log::{debug, info, warn};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// The atomic operations engine.
///
/// Cheap to clone; clones share the registry and configuration. Distinct
/// batches share nothing mutable and may run concurrently.
#[derive(Debug, Clone)]
pub struct AtomicOperations {
    registry: ResourceRegistry,
    config: Arc<AtomicOperationsConfig>,
}

impl AtomicOperations {
    /// Create an engine with the default configuration.
    pub fn new(registry: ResourceRegistry) -> Self {
        Self::from_parts(registry, AtomicOperationsConfig::default())
    }

    pub fn builder(registry: ResourceRegistry) -> AtomicOperationsBuilder {
        AtomicOperationsBuilder::new(registry)
    }

    pub(crate) fn from_parts(registry: ResourceRegistry, config: AtomicOperationsConfig) -> Self {
        Self {
            registry,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &AtomicOperationsConfig {
        &self.config
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Parse and execute a request document.
    pub async fn handle_document(
        &self,
        document: Value,
        context: RequestContext,
    ) -> AtomicResult<AtomicResponse> {
        let request = AtomicOperationRequest::from_value(document)?;
        self.execute(request, context).await
    }

    /// Execute a parsed batch as one all-or-nothing unit.
    pub async fn execute(
        &self,
        request: AtomicOperationRequest,
        context: RequestContext,
    ) -> AtomicResult<AtomicResponse> {
        self.config.check_batch_size(request.len())?;
        let prepared = self.resolve_all(request)?;

        info!(
            "Executing atomic batch of {} operation(s) [{}]",
            prepared.len(),
            context.request_id
        );

        let cancelled = Arc::new(AtomicBool::new(false));
        let mut guard = CancelOnDrop::new(cancelled.clone());
        let task = tokio::spawn(run_batch(prepared, context, cancelled));

        let result = match task.await {
            Ok(result) => result,
            Err(e) => Err(AtomicError::internal(format!("batch task failed: {}", e))),
        };
        guard.disarm();
        result
    }

    fn resolve_all(&self, request: AtomicOperationRequest) -> AtomicResult<Vec<PreparedOperation>> {
        request
            .operations
            .into_iter()
            .enumerate()
            .map(|(index, operation)| {
                let descriptor = self.registry.resolve(&operation.resource_type)?;
                Ok(PreparedOperation {
                    index,
                    operation,
                    descriptor,
                })
            })
            .collect()
    }
}

/// Flags the batch as cancelled when the caller's future is dropped.
struct CancelOnDrop {
    flag: Arc<AtomicBool>,
    armed: bool,
}

impl CancelOnDrop {
    fn new(flag: Arc<AtomicBool>) -> Self {
        Self { flag, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if self.armed {
            debug!("Caller dropped atomic batch; requesting rollback");
            self.flag.store(true, Ordering::SeqCst);
        }
    }
}

fn check_cancelled(cancelled: &AtomicBool) -> AtomicResult<()> {
    if cancelled.load(Ordering::SeqCst) {
        return Err(AtomicError::Cancelled);
    }
    Ok(())
}

async fn run_batch(
    prepared: Vec<PreparedOperation>,
    context: RequestContext,
    cancelled: Arc<AtomicBool>,
) -> AtomicResult<AtomicResponse> {
    let mut coordinator = DataLayerCoordinator::new(context.request_id.clone());
    let mut results = ResultAggregator::with_capacity(prepared.len());

    for operation in prepared {
        match run_operation(&mut coordinator, operation, &context, &cancelled).await {
            Ok(entry) => results.push(entry),
            Err(error) => return Err(abort(&mut coordinator, error, &context).await),
        }
    }

    if let Err(error) = check_cancelled(&cancelled) {
        return Err(abort(&mut coordinator, error, &context).await);
    }

    coordinator.end(true).await?;
    info!(
        "Atomic batch committed with {} result(s) [{}]",
        results.len(),
        context.request_id
    );
    Ok(results.finish())
}

async fn run_operation(
    coordinator: &mut DataLayerCoordinator,
    prepared: PreparedOperation,
    context: &RequestContext,
    cancelled: &AtomicBool,
) -> AtomicResult<ResultEntry> {
    let args = DependencyBinder::bind(&prepared.operation, &prepared.descriptor, context).await?;
    check_cancelled(cancelled)?;

    let handle = coordinator.open(&prepared.descriptor, &args).await?;
    check_cancelled(cancelled)?;

    let position = coordinator.begin(handle).await?;
    check_cancelled(cancelled)?;

    let layer = coordinator.handle_mut(position)?;
    let entry = OperationExecutor::execute(prepared, layer, context).await?;
    check_cancelled(cancelled)?;

    Ok(entry)
}

/// Close the chain with a rollback and hand back the original error.
async fn abort(
    coordinator: &mut DataLayerCoordinator,
    error: AtomicError,
    context: &RequestContext,
) -> AtomicError {
    warn!(
        "Atomic batch failed after {} handle(s): {} [{}]",
        coordinator.opened(),
        error,
        context.request_id
    );

    if coordinator.opened() > 0 {
        if let Err(end_error) = coordinator.end(false).await {
            warn!(
                "Rollback of atomic batch failed: {} [{}]",
                end_error, context.request_id
            );
        }
    }
    error
}
