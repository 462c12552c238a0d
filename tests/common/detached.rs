//! A backend with no transaction support.
//!
//! Handles write straight through to their storage, accept `atomic_start`
//! and `atomic_end` as no-ops and expose no scope.

use async_trait::async_trait;
use jsonapi_atomic::data_layer::{
    AtomicScope, DataLayer, DataLayerArgs, DataLayerFactory, InMemoryDataLayerFactory,
    InMemoryStorage, StorageResult,
};
use jsonapi_atomic::resource::ResourceObject;
use std::sync::Arc;

pub struct DetachedFactory {
    inner: InMemoryDataLayerFactory,
}

impl DetachedFactory {
    pub fn new(storage: InMemoryStorage) -> Self {
        Self {
            inner: InMemoryDataLayerFactory::new(storage),
        }
    }
}

#[async_trait]
impl DataLayerFactory for DetachedFactory {
    async fn open(
        &self,
        resource_type: &str,
        args: &DataLayerArgs,
    ) -> StorageResult<Box<dyn DataLayer>> {
        let inner = self.inner.open(resource_type, args).await?;
        Ok(Box::new(DetachedDataLayer { inner }))
    }
}

pub struct DetachedDataLayer {
    inner: Box<dyn DataLayer>,
}

#[async_trait]
impl DataLayer for DetachedDataLayer {
    fn name(&self) -> &str {
        "detached"
    }

    async fn create_object(&mut self, resource: ResourceObject) -> StorageResult<ResourceObject> {
        self.inner.create_object(resource).await
    }

    async fn get_object(
        &self,
        resource_type: &str,
        id: &str,
    ) -> StorageResult<Option<ResourceObject>> {
        self.inner.get_object(resource_type, id).await
    }

    async fn update_object(&mut self, resource: ResourceObject) -> StorageResult<ResourceObject> {
        self.inner.update_object(resource).await
    }

    async fn delete_object(&mut self, resource_type: &str, id: &str) -> StorageResult<()> {
        self.inner.delete_object(resource_type, id).await
    }

    async fn atomic_start(&mut self, _previous: Option<&dyn DataLayer>) -> StorageResult<()> {
        Ok(())
    }

    async fn atomic_end(&mut self, _success: bool) -> StorageResult<()> {
        Ok(())
    }

    fn atomic_scope(&self) -> Option<Arc<dyn AtomicScope>> {
        None
    }
}
