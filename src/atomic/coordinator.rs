//! Data layer coordination for one batch.
//!
//! The [`TransactionChain`] owns every handle that has begun, in submission
//! order. A handle's predecessor is the element before it, so links never
//! point back at their successors. The chain enforces one `begin` per handle
//! and one `end` per batch.
//!
//! Handles that expose no [`AtomicScope`] take no part in the shared
//! transaction. They are skipped when picking the handle a newcomer chains
//! after, and when such a handle is last the chain finishes the nearest
//! earlier scope itself.

use crate::data_layer::{AtomicScope, DataLayer, DataLayerArgs};
use crate::error::{AtomicError, AtomicResult};
use crate::handlers::map_storage_error;
use crate::registry::ResourceDescriptor;
use log::{debug, warn};
use std::sync::Arc;

/// Ordered handles of one batch's logical transaction.
pub struct TransactionChain {
    handles: Vec<Box<dyn DataLayer>>,
    ended: bool,
    request_id: String,
}

impl TransactionChain {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            handles: Vec::new(),
            ended: false,
            request_id: request_id.into(),
        }
    }

    /// Start `handle` after the current last handle and take ownership of it.
    /// Returns the handle's position in the chain.
    pub async fn begin(&mut self, mut handle: Box<dyn DataLayer>) -> AtomicResult<usize> {
        if self.ended {
            return Err(AtomicError::internal("transaction chain already ended"));
        }

        let position = self.handles.len();
        let previous = self
            .handles
            .iter()
            .rev()
            .find(|handle| handle.atomic_scope().is_some())
            .or_else(|| self.handles.last())
            .map(|handle| &**handle);
        debug!(
            "Begin handle #{} ({}) after {} [{}]",
            position,
            handle.name(),
            previous.map_or("none", |p| p.name()),
            self.request_id
        );

        handle
            .atomic_start(previous)
            .await
            .map_err(map_storage_error)?;
        self.handles.push(handle);
        Ok(position)
    }

    pub fn handle_mut(&mut self, position: usize) -> Option<&mut (dyn DataLayer + 'static)> {
        self.handles.get_mut(position).map(|handle| handle.as_mut())
    }

    /// End the transaction on the last handle. Callable once.
    pub async fn end(&mut self, success: bool) -> AtomicResult<()> {
        if self.ended {
            return Err(AtomicError::internal("transaction chain already ended"));
        }
        self.ended = true;

        let position = self.handles.len().saturating_sub(1);
        let inherited = self.inherited_scope();
        let Some(last) = self.handles.last_mut() else {
            return Ok(());
        };

        debug!(
            "End on handle #{} ({}) success={} [{}]",
            position,
            last.name(),
            success,
            self.request_id
        );
        let ended = last.atomic_end(success).await.map_err(map_storage_error);

        match inherited {
            Some(scope) if success && ended.is_ok() => {
                debug!(
                    "Committing scope left open by handle #{} [{}]",
                    position, self.request_id
                );
                scope.commit().await.map_err(map_storage_error)
            }
            Some(scope) if !success => {
                debug!(
                    "Rolling back scope left open by handle #{} [{}]",
                    position, self.request_id
                );
                let rolled_back = scope.rollback().await.map_err(map_storage_error);
                ended.and(rolled_back)
            }
            _ => ended,
        }
    }

    /// Nearest earlier scope when the last handle exposes none of its own.
    fn inherited_scope(&self) -> Option<Arc<dyn AtomicScope>> {
        let (last, earlier) = self.handles.split_last()?;
        if last.atomic_scope().is_some() {
            return None;
        }
        earlier.iter().rev().find_map(|handle| handle.atomic_scope())
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl Drop for TransactionChain {
    fn drop(&mut self) {
        if !self.ended && !self.handles.is_empty() {
            warn!(
                "Transaction chain dropped with {} handle(s) and no end [{}]",
                self.handles.len(),
                self.request_id
            );
        }
    }
}

/// Opens handles and drives them through the transaction chain.
pub struct DataLayerCoordinator {
    chain: TransactionChain,
}

impl DataLayerCoordinator {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            chain: TransactionChain::new(request_id),
        }
    }

    /// Construct a handle for `descriptor` from bound arguments.
    pub async fn open(
        &self,
        descriptor: &ResourceDescriptor,
        args: &DataLayerArgs,
    ) -> AtomicResult<Box<dyn DataLayer>> {
        descriptor
            .data_layer()
            .open(descriptor.resource_type(), args)
            .await
            .map_err(map_storage_error)
    }

    pub async fn begin(&mut self, handle: Box<dyn DataLayer>) -> AtomicResult<usize> {
        self.chain.begin(handle).await
    }

    pub fn handle_mut(&mut self, position: usize) -> AtomicResult<&mut (dyn DataLayer + 'static)> {
        self.chain
            .handle_mut(position)
            .ok_or_else(|| AtomicError::internal(format!("no handle at position {}", position)))
    }

    pub async fn end(&mut self, success: bool) -> AtomicResult<()> {
        self.chain.end(success).await
    }

    /// Number of handles that have begun.
    pub fn opened(&self) -> usize {
        self.chain.len()
    }

    pub fn is_ended(&self) -> bool {
        self.chain.is_ended()
    }
}
