//! A data layer that records every call it receives.
//!
//! [`RecordingFactory`] wraps an [`InMemoryDataLayerFactory`] and names each
//! handle it opens `{label}#{n}`. Every open, begin, end and write lands in a
//! shared [`EventLog`], so tests can assert the exact shape of a batch's
//! transaction chain. Opening, beginning and committing can be made to fail
//! on demand.

use async_trait::async_trait;
use jsonapi_atomic::data_layer::{
    AtomicScope, DataLayer, DataLayerArgs, DataLayerFactory, InMemoryDataLayerFactory,
    InMemoryStorage, StorageError, StorageResult,
};
use jsonapi_atomic::resource::ResourceObject;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Open { handle: String },
    Begin { handle: String, previous: Option<String> },
    End { handle: String, success: bool },
    Create { handle: String, resource_type: String },
    Update { handle: String, resource_type: String, id: String },
    Delete { handle: String, resource_type: String, id: String },
}

/// Shared, ordered record of data layer calls.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<Event>>>,
    ended: Arc<Notify>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, event: Event) {
        let is_end = matches!(event, Event::End { .. });
        self.events.lock().unwrap().push(event);
        if is_end {
            self.ended.notify_one();
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().unwrap().is_empty()
    }

    pub fn opens(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Open { handle } => Some(handle),
                _ => None,
            })
            .collect()
    }

    pub fn begins(&self) -> Vec<(String, Option<String>)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Begin { handle, previous } => Some((handle, previous)),
                _ => None,
            })
            .collect()
    }

    pub fn ends(&self) -> Vec<(String, bool)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::End { handle, success } => Some((handle, success)),
                _ => None,
            })
            .collect()
    }

    /// Resolves once an `end` has been recorded.
    pub async fn wait_for_end(&self) {
        self.ended.notified().await;
    }
}

/// Holds the first write of a batch until the test releases it.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

pub struct RecordingFactory {
    label: String,
    inner: InMemoryDataLayerFactory,
    log: EventLog,
    opened: AtomicUsize,
    gate: Mutex<Option<Arc<Gate>>>,
    failing_open: Option<usize>,
    failing_begin: Option<usize>,
    failing_commit: bool,
}

impl RecordingFactory {
    pub fn new(label: &str, storage: InMemoryStorage, log: EventLog) -> Self {
        Self {
            label: label.to_string(),
            inner: InMemoryDataLayerFactory::new(storage),
            log,
            opened: AtomicUsize::new(0),
            gate: Mutex::new(None),
            failing_open: None,
            failing_begin: None,
            failing_commit: false,
        }
    }

    /// Make the `n`th open (1-based) fail.
    pub fn with_failing_open(mut self, n: usize) -> Self {
        self.failing_open = Some(n);
        self
    }

    /// Make `atomic_start` fail on the `n`th handle (1-based).
    pub fn with_failing_begin(mut self, n: usize) -> Self {
        self.failing_begin = Some(n);
        self
    }

    /// Make `atomic_end(true)` roll back and fail on every handle.
    pub fn with_failing_commit(mut self) -> Self {
        self.failing_commit = true;
        self
    }

    /// Pause the first handle opened from now on inside its first create.
    pub fn with_gate(self, gate: Arc<Gate>) -> Self {
        *self.gate.lock().unwrap() = Some(gate);
        self
    }
}

#[async_trait]
impl DataLayerFactory for RecordingFactory {
    async fn open(
        &self,
        resource_type: &str,
        args: &DataLayerArgs,
    ) -> StorageResult<Box<dyn DataLayer>> {
        let n = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_open == Some(n) {
            return Err(StorageError::unavailable(format!("{} refused open #{}", self.label, n)));
        }
        let inner = self.inner.open(resource_type, args).await?;
        let name = format!("{}#{}", self.label, n);
        self.log.record(Event::Open {
            handle: name.clone(),
        });

        Ok(Box::new(RecordingDataLayer {
            name,
            inner,
            log: self.log.clone(),
            gate: self.gate.lock().unwrap().take(),
            failing_begin: self.failing_begin == Some(n),
            failing_commit: self.failing_commit,
        }))
    }
}

pub struct RecordingDataLayer {
    name: String,
    inner: Box<dyn DataLayer>,
    log: EventLog,
    gate: Option<Arc<Gate>>,
    failing_begin: bool,
    failing_commit: bool,
}

#[async_trait]
impl DataLayer for RecordingDataLayer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create_object(&mut self, resource: ResourceObject) -> StorageResult<ResourceObject> {
        if let Some(gate) = self.gate.take() {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        self.log.record(Event::Create {
            handle: self.name.clone(),
            resource_type: resource.resource_type.clone(),
        });
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
        self.log.record(Event::Update {
            handle: self.name.clone(),
            resource_type: resource.resource_type.clone(),
            id: resource.id.clone().unwrap_or_default(),
        });
        self.inner.update_object(resource).await
    }

    async fn delete_object(&mut self, resource_type: &str, id: &str) -> StorageResult<()> {
        self.log.record(Event::Delete {
            handle: self.name.clone(),
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        });
        self.inner.delete_object(resource_type, id).await
    }

    async fn atomic_start(&mut self, previous: Option<&dyn DataLayer>) -> StorageResult<()> {
        self.log.record(Event::Begin {
            handle: self.name.clone(),
            previous: previous.map(|p| p.name().to_string()),
        });
        if self.failing_begin {
            return Err(StorageError::unavailable(format!("{} refused begin", self.name)));
        }
        self.inner.atomic_start(previous).await
    }

    async fn atomic_end(&mut self, success: bool) -> StorageResult<()> {
        let result = if success && self.failing_commit {
            self.inner
                .atomic_end(false)
                .await
                .and(Err(StorageError::unavailable(format!("{} refused commit", self.name))))
        } else {
            self.inner.atomic_end(success).await
        };
        self.log.record(Event::End {
            handle: self.name.clone(),
            success,
        });
        result
    }

    fn atomic_scope(&self) -> Option<Arc<dyn AtomicScope>> {
        self.inner.atomic_scope()
    }
}
