//! Operation model for atomic batches.
//!
//! A batch is an ordered list of [`Operation`]s. Each operation has a closed
//! [`Action`], the resource type it dispatches to, an optional `ref` target and
//! a payload whose shape is fixed by the action and relationship cardinality.
//!
//! # Examples
//!
//! ```rust
//! use jsonapi_atomic::operation::{Action, AtomicOperationRequest};
//! use serde_json::json;
//!
//! let request = AtomicOperationRequest::from_value(json!({
//!     "atomic:operations": [
//!         {"op": "add", "data": {"type": "post", "attributes": {"title": "t", "body": "b"}}},
//!         {"op": "remove", "ref": {"type": "post", "id": "1"}}
//!     ]
//! }))
//! .unwrap();
//!
//! assert_eq!(request.operations[0].action, Action::Add);
//! assert_eq!(request.operations[1].resource_id(), Some("1"));
//! ```

mod builders;
mod parse;

pub use parse::AtomicOperationRequest;

use crate::resource::{ResourceIdentifier, ResourceObject};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three mutation kinds an operation can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Add,
    Update,
    Remove,
}

impl Action {
    /// Parse the wire form. Returns `None` for anything outside the closed set.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "add" => Some(Action::Add),
            "update" => Some(Action::Update),
            "remove" => Some(Action::Remove),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Add => "add",
            Action::Update => "update",
            Action::Remove => "remove",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `ref` member of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
}

impl ResourceRef {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: Some(id.into()),
            lid: None,
            relationship: None,
        }
    }

    /// Point at one relationship of the referenced resource.
    pub fn with_relationship(mut self, relationship: impl Into<String>) -> Self {
        self.relationship = Some(relationship.into());
        self
    }
}

/// Payload of one operation.
///
/// Which variant is valid depends on the action and on whether the operation
/// targets a relationship; the parser only produces valid combinations.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationData {
    /// Full resource representation (add, update)
    Resource(ResourceObject),
    /// Single reference: the resource to remove, or to-one linkage to set
    ToOne(Option<ResourceIdentifier>),
    /// Reference list for to-many relationship update/remove
    ToMany(Vec<ResourceIdentifier>),
    /// Remove by `ref` identity only
    Empty,
}

/// One requested mutation in a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub action: Action,
    /// Dispatch key used to resolve the resource descriptor
    pub resource_type: String,
    pub target: Option<ResourceRef>,
    pub data: OperationData,
}

impl Operation {
    /// Relationship name when the operation targets a relationship.
    pub fn relationship(&self) -> Option<&str> {
        self.target
            .as_ref()
            .and_then(|target| target.relationship.as_deref())
    }

    /// Identity of the resource the operation acts on, if known.
    pub fn resource_id(&self) -> Option<&str> {
        let target_id = self.target.as_ref().and_then(|t| t.id.as_deref());
        if self.relationship().is_some() {
            return target_id;
        }
        match &self.data {
            OperationData::Resource(resource) => resource.id.as_deref().or(target_id),
            OperationData::ToOne(Some(identifier)) => Some(identifier.id.as_str()),
            _ => target_id,
        }
    }
}
