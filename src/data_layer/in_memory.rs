//! In-memory data layer.
//!
//! [`InMemoryStorage`] is a thread-safe map of committed resources. Handles
//! opened on it write straight through until they enter atomic mode; after
//! that every write is staged in an [`AtomicSession`] and only reaches the
//! storage on commit.
//!
//! # Session chaining
//!
//! * A handle that begins after a handle on the *same* storage joins that
//!   handle's session, so several handles share one unit of work.
//! * A handle that begins after a handle on another backend opens its own
//!   session and keeps the previous scope as its parent. Commit and rollback
//!   travel up the parent chain, ancestors committing first.
//! * Reads walk the chain, so a later session sees writes staged by an earlier
//!   session on the same storage.
//!
//! Ids are assigned per tenant and type from a counter starting at `1`.

use super::{
    AtomicScope, DataLayer, DataLayerArgs, DataLayerFactory, StorageError, StorageKey,
    StorageResult,
};
use crate::resource::ResourceObject;
use async_trait::async_trait;
use log::{debug, trace};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Tenant used when a handle is opened without a `tenant_id` argument.
pub const DEFAULT_TENANT: &str = "default";

type PendingWrites = HashMap<StorageKey, Option<ResourceObject>>;

/// Thread-safe in-memory resource storage.
///
/// Clones share the same underlying maps.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    data: Arc<RwLock<HashMap<StorageKey, ResourceObject>>>,
    // (tenant_id, resource_type) -> last issued id
    sequences: Arc<Mutex<HashMap<(String, String), u64>>>,
}

impl InMemoryStorage {
    /// Create a new empty in-memory storage instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `other` is a handle to the same underlying storage.
    pub fn same_store(&self, other: &InMemoryStorage) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    pub async fn get(&self, key: &StorageKey) -> Option<ResourceObject> {
        self.data.read().await.get(key).cloned()
    }

    pub async fn contains(&self, key: &StorageKey) -> bool {
        self.data.read().await.contains_key(key)
    }

    pub async fn put(&self, key: StorageKey, resource: ResourceObject) {
        self.data.write().await.insert(key, resource);
    }

    pub async fn remove(&self, key: &StorageKey) -> bool {
        self.data.write().await.remove(key).is_some()
    }

    /// All committed resources of one type, ordered by id.
    pub async fn list(&self, tenant_id: &str, resource_type: &str) -> Vec<ResourceObject> {
        let data_guard = self.data.read().await;
        let mut resources: Vec<(&StorageKey, &ResourceObject)> = data_guard
            .iter()
            .filter(|(key, _)| key.tenant_id() == tenant_id && key.resource_type() == resource_type)
            .collect();
        resources.sort_by(|(a, _), (b, _)| {
            (a.resource_id().len(), a.resource_id()).cmp(&(b.resource_id().len(), b.resource_id()))
        });
        resources.into_iter().map(|(_, r)| r.clone()).collect()
    }

    /// Copy of all committed resources.
    pub async fn snapshot(&self) -> HashMap<StorageKey, ResourceObject> {
        self.data.read().await.clone()
    }

    /// Total number of committed resources.
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }

    /// Clear all data and id counters.
    pub async fn clear(&self) {
        self.data.write().await.clear();
        self.sequences.lock().await.clear();
    }

    async fn next_id(&self, tenant_id: &str, resource_type: &str) -> u64 {
        let mut sequences = self.sequences.lock().await;
        let counter = sequences
            .entry((tenant_id.to_string(), resource_type.to_string()))
            .or_insert(0);
        *counter += 1;
        *counter
    }

    async fn apply(&self, pending: PendingWrites) {
        let mut data_guard = self.data.write().await;
        for (key, value) in pending {
            match value {
                Some(resource) => {
                    data_guard.insert(key, resource);
                }
                None => {
                    data_guard.remove(&key);
                }
            }
        }
    }
}

/// Lifecycle of an [`AtomicSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Open,
    Committed,
    RolledBack,
}

/// Staged writes against one [`InMemoryStorage`].
pub struct AtomicSession {
    storage: InMemoryStorage,
    pending: Mutex<PendingWrites>,
    parent: Option<Arc<dyn AtomicScope>>,
    state: Mutex<SessionState>,
}

impl AtomicSession {
    pub fn new(storage: InMemoryStorage, parent: Option<Arc<dyn AtomicScope>>) -> Self {
        Self {
            storage,
            pending: Mutex::new(HashMap::new()),
            parent,
            state: Mutex::new(SessionState::Open),
        }
    }

    /// Staged state of `key` in this session or an ancestor on the same
    /// storage. `Some(None)` means a staged delete.
    async fn lookup(&self, key: &StorageKey) -> Option<Option<ResourceObject>> {
        let mut scope: Option<&dyn AtomicScope> = Some(self);
        while let Some(current) = scope {
            if let Some(session) = current.as_any().downcast_ref::<AtomicSession>() {
                if session.storage.same_store(&self.storage) {
                    if let Some(entry) = session.pending.lock().await.get(key) {
                        return Some(entry.clone());
                    }
                }
            }
            scope = current.parent();
        }
        None
    }

    async fn stage(&self, key: StorageKey, value: Option<ResourceObject>) {
        trace!("Staging write for {} (delete: {})", key, value.is_none());
        self.pending.lock().await.insert(key, value);
    }

    async fn transition(&self, next: SessionState) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        if *state != SessionState::Open {
            return Err(StorageError::transaction_state(format!(
                "atomic session already finished ({:?})",
                *state
            )));
        }
        *state = next;
        Ok(())
    }
}

#[async_trait]
impl AtomicScope for AtomicSession {
    async fn commit(&self) -> StorageResult<()> {
        self.transition(SessionState::Committed).await?;

        if let Some(parent) = &self.parent {
            if let Err(e) = parent.commit().await {
                self.pending.lock().await.clear();
                *self.state.lock().await = SessionState::RolledBack;
                return Err(e);
            }
        }

        let pending = std::mem::take(&mut *self.pending.lock().await);
        debug!("Committing {} staged write(s)", pending.len());
        self.storage.apply(pending).await;
        Ok(())
    }

    async fn rollback(&self) -> StorageResult<()> {
        self.transition(SessionState::RolledBack).await?;

        let discarded = {
            let mut pending = self.pending.lock().await;
            let count = pending.len();
            pending.clear();
            count
        };
        debug!("Rolled back {} staged write(s)", discarded);

        if let Some(parent) = &self.parent {
            parent.rollback().await?;
        }
        Ok(())
    }

    fn parent(&self) -> Option<&dyn AtomicScope> {
        self.parent.as_deref()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Data layer handle over an [`InMemoryStorage`].
pub struct InMemoryDataLayer {
    storage: InMemoryStorage,
    tenant_id: String,
    session: Option<Arc<dyn AtomicScope>>,
}

impl InMemoryDataLayer {
    pub fn new(storage: InMemoryStorage, tenant_id: impl Into<String>) -> Self {
        Self {
            storage,
            tenant_id: tenant_id.into(),
            session: None,
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Whether the handle is in atomic mode.
    pub fn in_session(&self) -> bool {
        self.session.is_some()
    }

    fn session(&self) -> Option<&AtomicSession> {
        self.session
            .as_deref()
            .and_then(|scope| scope.as_any().downcast_ref::<AtomicSession>())
    }

    fn key(&self, resource_type: &str, id: &str) -> StorageKey {
        StorageKey::new(&self.tenant_id, resource_type, id)
    }

    async fn read(&self, key: &StorageKey) -> Option<ResourceObject> {
        if let Some(session) = self.session() {
            if let Some(staged) = session.lookup(key).await {
                return staged;
            }
        }
        self.storage.get(key).await
    }

    async fn exists(&self, key: &StorageKey) -> bool {
        self.read(key).await.is_some()
    }

    async fn write(&self, key: StorageKey, value: Option<ResourceObject>) {
        match self.session() {
            Some(session) => session.stage(key, value).await,
            None => match value {
                Some(resource) => self.storage.put(key, resource).await,
                None => {
                    self.storage.remove(&key).await;
                }
            },
        }
    }

    fn not_found(&self, resource_type: &str, id: &str) -> StorageError {
        StorageError::resource_not_found(&self.tenant_id, resource_type, id)
    }
}

#[async_trait]
impl DataLayer for InMemoryDataLayer {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn create_object(&mut self, mut resource: ResourceObject) -> StorageResult<ResourceObject> {
        let resource_type = resource.resource_type.clone();

        let id = match resource.id.take() {
            Some(id) => {
                if self.exists(&self.key(&resource_type, &id)).await {
                    return Err(StorageError::conflict(&self.tenant_id, &resource_type, &id));
                }
                id
            }
            None => loop {
                let candidate = self
                    .storage
                    .next_id(&self.tenant_id, &resource_type)
                    .await
                    .to_string();
                if !self.exists(&self.key(&resource_type, &candidate)).await {
                    break candidate;
                }
            },
        };

        resource.id = Some(id.clone());
        resource.lid = None;
        trace!("Creating {}/{}", resource_type, id);
        self.write(self.key(&resource_type, &id), Some(resource.clone()))
            .await;
        Ok(resource)
    }

    async fn get_object(
        &self,
        resource_type: &str,
        id: &str,
    ) -> StorageResult<Option<ResourceObject>> {
        Ok(self.read(&self.key(resource_type, id)).await)
    }

    async fn update_object(&mut self, resource: ResourceObject) -> StorageResult<ResourceObject> {
        let id = resource
            .id
            .clone()
            .ok_or_else(|| StorageError::invalid_data("resource to update has no id"))?;
        let key = self.key(&resource.resource_type, &id);
        if !self.exists(&key).await {
            return Err(self.not_found(&resource.resource_type, &id));
        }

        trace!("Updating {}", key);
        self.write(key, Some(resource.clone())).await;
        Ok(resource)
    }

    async fn delete_object(&mut self, resource_type: &str, id: &str) -> StorageResult<()> {
        let key = self.key(resource_type, id);
        if !self.exists(&key).await {
            return Err(self.not_found(resource_type, id));
        }

        trace!("Deleting {}", key);
        self.write(key, None).await;
        Ok(())
    }

    async fn atomic_start(&mut self, previous: Option<&dyn DataLayer>) -> StorageResult<()> {
        if self.session.is_some() {
            return Err(StorageError::transaction_state(
                "atomic session already started on this handle",
            ));
        }

        let previous_scope = previous.and_then(|handle| handle.atomic_scope());
        let joinable = previous_scope
            .as_deref()
            .and_then(|scope| scope.as_any().downcast_ref::<AtomicSession>())
            .is_some_and(|session| session.storage.same_store(&self.storage));

        self.session = if joinable {
            debug!("Joining previous in-memory session");
            previous_scope
        } else {
            debug!(
                "Opening in-memory session (chained: {})",
                previous_scope.is_some()
            );
            Some(Arc::new(AtomicSession::new(
                self.storage.clone(),
                previous_scope,
            )))
        };
        Ok(())
    }

    async fn atomic_end(&mut self, success: bool) -> StorageResult<()> {
        let session = self.session.take().ok_or_else(|| {
            StorageError::transaction_state("atomic end without a started session")
        })?;

        if success {
            session.commit().await
        } else {
            session.rollback().await
        }
    }

    fn atomic_scope(&self) -> Option<Arc<dyn AtomicScope>> {
        self.session.clone()
    }
}

/// Opens [`InMemoryDataLayer`] handles over one shared storage.
///
/// Recognized arguments: `tenant_id` (string, defaults to `"default"`).
#[derive(Clone, Default)]
pub struct InMemoryDataLayerFactory {
    storage: InMemoryStorage,
}

impl InMemoryDataLayerFactory {
    pub fn new(storage: InMemoryStorage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &InMemoryStorage {
        &self.storage
    }
}

#[async_trait]
impl DataLayerFactory for InMemoryDataLayerFactory {
    async fn open(
        &self,
        resource_type: &str,
        args: &DataLayerArgs,
    ) -> StorageResult<Box<dyn DataLayer>> {
        let tenant_id = args.get_str("tenant_id").unwrap_or(DEFAULT_TENANT);
        trace!("Opening in-memory handle for '{}' (tenant {})", resource_type, tenant_id);
        Ok(Box::new(InMemoryDataLayer::new(
            self.storage.clone(),
            tenant_id,
        )))
    }
}
