//! Payload schemas and their validation.
//!
//! # Key Types
//!
//! - [`Schema`] - Attributes and relationships a resource type accepts
//! - [`AttributeDefinition`] - Individual attribute specifications and constraints
//! - [`RelationshipDefinition`] - Related type and cardinality of one relationship
//!
//! # Examples
//!
//! ```rust
//! use jsonapi_atomic::resource::ResourceObject;
//! use jsonapi_atomic::schema::{AttributeDefinition, AttributeType, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::new("post")
//!     .with_attribute(AttributeDefinition::new("title", AttributeType::String).required());
//!
//! let payload = ResourceObject::new("post").with_attribute("title", json!("Hello"));
//! assert!(schema.validate_create(&payload).is_ok());
//! ```

pub mod types;
pub mod validation;

pub use types::{AttributeDefinition, AttributeType, Mutability, RelationshipDefinition, Schema};
pub use validation::ValidationMode;
