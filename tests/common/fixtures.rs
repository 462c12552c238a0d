//! Resource schemas and engine builders shared by the integration tests.
//!
//! The schemas model a small blog: users write posts, posts collect comments.

use jsonapi_atomic::data_layer::{DataLayerFactory, InMemoryDataLayerFactory, InMemoryStorage};
use jsonapi_atomic::schema::{AttributeDefinition, AttributeType, RelationshipDefinition, Schema};
use jsonapi_atomic::{AtomicOperations, ResourceDescriptor, ResourceRegistry};
use serde_json::{Value, json};
use std::sync::Arc;

pub fn user_schema() -> Schema {
    Schema::new("user")
        .with_description("Blog author")
        .with_attribute(AttributeDefinition::new("name", AttributeType::String).required())
        .with_attribute(AttributeDefinition::new("age", AttributeType::Integer))
        .with_attribute(AttributeDefinition::new("email", AttributeType::String))
        .with_relationship(RelationshipDefinition::to_many("posts", "post"))
}

pub fn post_schema() -> Schema {
    Schema::new("post")
        .with_attribute(AttributeDefinition::new("title", AttributeType::String).required())
        .with_attribute(AttributeDefinition::new("body", AttributeType::String).required())
        .with_relationship(RelationshipDefinition::to_one("user", "user"))
        .with_relationship(RelationshipDefinition::to_many("comments", "post_comment"))
}

pub fn comment_schema() -> Schema {
    Schema::new("post_comment")
        .with_attribute(AttributeDefinition::new("text", AttributeType::String))
        .with_relationship(RelationshipDefinition::to_one("post", "post"))
        .with_relationship(RelationshipDefinition::to_one("author", "user"))
}

/// Registry with every blog type served by one factory.
pub fn registry_with(factory: Arc<dyn DataLayerFactory>) -> ResourceRegistry {
    ResourceRegistry::builder()
        .register(ResourceDescriptor::new(user_schema(), factory.clone()))
        .unwrap()
        .register(ResourceDescriptor::new(post_schema(), factory.clone()))
        .unwrap()
        .register(ResourceDescriptor::new(comment_schema(), factory))
        .unwrap()
        .build()
}

/// Engine over in-memory storage, returning the storage for inspection.
pub fn in_memory_engine() -> (AtomicOperations, InMemoryStorage) {
    let storage = InMemoryStorage::new();
    let factory = Arc::new(InMemoryDataLayerFactory::new(storage.clone()));
    (AtomicOperations::new(registry_with(factory)), storage)
}

pub fn add_post(title: &str) -> Value {
    json!({
        "op": "add",
        "data": {"type": "post", "attributes": {"title": title, "body": "b"}}
    })
}

pub fn add_user(name: &str) -> Value {
    json!({
        "op": "add",
        "data": {"type": "user", "attributes": {"name": name}}
    })
}

pub fn batch(operations: Vec<Value>) -> Value {
    json!({ "atomic:operations": operations })
}
