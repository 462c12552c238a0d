//! Resource documents and request context.
//!
//! # Key Types
//!
//! - [`ResourceObject`] - A full resource representation
//! - [`ResourceIdentifier`] - A `{type, id}` reference
//! - [`ResourcePatch`] - Partial update applied by update handlers
//! - [`RequestContext`] - Per-request inputs for dependency resolution

pub mod context;
pub mod document;

pub use context::RequestContext;
pub use document::{
    Relationship, RelationshipChange, RelationshipData, ResourceIdentifier, ResourceObject,
    ResourcePatch,
};
