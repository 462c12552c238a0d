//! Batch results.

use crate::resource::ResourceObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of one operation: the resulting representation, or `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub data: Option<ResourceObject>,
}

impl ResultEntry {
    pub fn data(resource: ResourceObject) -> Self {
        Self {
            data: Some(resource),
        }
    }

    pub fn empty() -> Self {
        Self { data: None }
    }
}

/// Response document of a successful batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomicResponse {
    #[serde(rename = "atomic:results")]
    pub results: Vec<ResultEntry>,
}

impl AtomicResponse {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// Collects one entry per completed operation, in submission order.
///
/// A failed batch drops the aggregator; nothing collected is surfaced.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    entries: Vec<ResultEntry>,
}

impl ResultAggregator {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, entry: ResultEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn finish(self) -> AtomicResponse {
        AtomicResponse {
            results: self.entries,
        }
    }
}
