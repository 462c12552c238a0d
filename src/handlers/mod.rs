//! Per-resource write handlers.
//!
//! A [`ResourceHandler`] performs the actual create, update or delete call of
//! one operation against the data layer handle the operation owns. Handlers
//! receive payloads that already passed schema validation.

use crate::data_layer::{DataLayer, StorageError};
use crate::error::{AtomicError, AtomicResult};
use crate::resource::{RequestContext, ResourceObject, ResourcePatch};
use async_trait::async_trait;
use log::{debug, trace};

/// Create, update and delete logic for one resource type.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Persist a new resource and return its stored representation.
    async fn create(
        &self,
        layer: &mut dyn DataLayer,
        resource: ResourceObject,
        context: &RequestContext,
    ) -> AtomicResult<ResourceObject>;

    /// Apply `patch` to an existing resource and return the result.
    async fn update(
        &self,
        layer: &mut dyn DataLayer,
        resource_type: &str,
        id: &str,
        patch: ResourcePatch,
        context: &RequestContext,
    ) -> AtomicResult<ResourceObject>;

    /// Delete an existing resource.
    async fn delete(
        &self,
        layer: &mut dyn DataLayer,
        resource_type: &str,
        id: &str,
        context: &RequestContext,
    ) -> AtomicResult<()>;
}

/// Handler that maps each action straight onto data layer calls.
///
/// Updates read the stored resource, merge the patch and write the merged
/// resource back.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardResourceHandler;

impl StandardResourceHandler {
    pub fn new() -> Self {
        Self
    }
}

/// Lift a data layer error, keeping not-found distinguishable.
pub fn map_storage_error(error: StorageError) -> AtomicError {
    match error {
        StorageError::ResourceNotFound {
            resource_type, id, ..
        } => AtomicError::resource_not_found(resource_type, id),
        other => AtomicError::Storage(other),
    }
}

#[async_trait]
impl ResourceHandler for StandardResourceHandler {
    async fn create(
        &self,
        layer: &mut dyn DataLayer,
        resource: ResourceObject,
        context: &RequestContext,
    ) -> AtomicResult<ResourceObject> {
        trace!(
            "Create {} via {} [{}]",
            resource.resource_type,
            layer.name(),
            context.request_id
        );
        let created = layer.create_object(resource).await.map_err(map_storage_error)?;
        debug!(
            "Created {} with ID {:?} [{}]",
            created.resource_type, created.id, context.request_id
        );
        Ok(created)
    }

    async fn update(
        &self,
        layer: &mut dyn DataLayer,
        resource_type: &str,
        id: &str,
        patch: ResourcePatch,
        context: &RequestContext,
    ) -> AtomicResult<ResourceObject> {
        let mut resource = layer
            .get_object(resource_type, id)
            .await
            .map_err(map_storage_error)?
            .ok_or_else(|| AtomicError::resource_not_found(resource_type, id))?;

        patch.apply_to(&mut resource)?;

        let updated = layer.update_object(resource).await.map_err(map_storage_error)?;
        debug!(
            "Updated {} with ID {} [{}]",
            resource_type, id, context.request_id
        );
        Ok(updated)
    }

    async fn delete(
        &self,
        layer: &mut dyn DataLayer,
        resource_type: &str,
        id: &str,
        context: &RequestContext,
    ) -> AtomicResult<()> {
        layer
            .delete_object(resource_type, id)
            .await
            .map_err(map_storage_error)?;
        debug!(
            "Deleted {} with ID {} [{}]",
            resource_type, id, context.request_id
        );
        Ok(())
    }
}
