//! Basic Atomic Batch Example
//!
//! This example registers three resource types over in-memory storage and
//! runs two batches: one that commits and one that fails halfway and leaves
//! storage untouched.
//!
//! Run with `RUST_LOG=debug` to see the transaction chain being built.

use jsonapi_atomic::data_layer::{InMemoryDataLayerFactory, InMemoryStorage};
use jsonapi_atomic::schema::{AttributeDefinition, AttributeType, RelationshipDefinition, Schema};
use jsonapi_atomic::{AtomicOperations, RequestContext, ResourceDescriptor, ResourceRegistry};
use serde_json::json;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("🚀 Starting Atomic Batch Example");

    let storage = InMemoryStorage::new();
    let factory = Arc::new(InMemoryDataLayerFactory::new(storage.clone()));

    let user = Schema::new("user")
        .with_attribute(AttributeDefinition::new("name", AttributeType::String).required())
        .with_attribute(AttributeDefinition::new("age", AttributeType::Integer))
        .with_relationship(RelationshipDefinition::to_many("posts", "post"));
    let post = Schema::new("post")
        .with_attribute(AttributeDefinition::new("title", AttributeType::String).required())
        .with_attribute(AttributeDefinition::new("body", AttributeType::String).required())
        .with_relationship(RelationshipDefinition::to_one("user", "user"))
        .with_relationship(RelationshipDefinition::to_many("comments", "post_comment"));
    let comment = Schema::new("post_comment")
        .with_attribute(AttributeDefinition::new("text", AttributeType::String))
        .with_relationship(RelationshipDefinition::to_one("post", "post"))
        .with_relationship(RelationshipDefinition::to_one("author", "user"));

    let registry = ResourceRegistry::builder()
        .register(ResourceDescriptor::new(user, factory.clone()))?
        .register(ResourceDescriptor::new(post, factory.clone()))?
        .register(ResourceDescriptor::new(comment, factory))?
        .build();
    let operations = AtomicOperations::builder(registry)
        .with_max_operations(50)
        .build()?;

    println!("✅ Registered resource types: {:?}", operations.registry().resource_types());

    println!("\n📝 Running a batch that commits...");
    let response = operations
        .handle_document(
            json!({"atomic:operations": [
                {"op": "add", "data": {"type": "user", "attributes": {"name": "Ada", "age": 36}}},
                {"op": "add", "data": {
                    "type": "post",
                    "attributes": {"title": "t", "body": "b"},
                    "relationships": {"user": {"data": {"type": "user", "id": "1"}}}
                }},
                {"op": "add", "data": {
                    "type": "post_comment",
                    "attributes": {"text": "first!"},
                    "relationships": {"post": {"data": {"type": "post", "id": "1"}}}
                }},
                {"op": "update",
                 "ref": {"type": "post", "id": "1", "relationship": "comments"},
                 "data": [{"type": "post_comment", "id": "1"}]}
            ]}),
            RequestContext::new("demo-commit"),
        )
        .await?;
    println!("{}", serde_json::to_string_pretty(&response.to_json()?)?);
    println!("✅ Storage now holds {} resource(s)", storage.len().await);

    println!("\n📝 Running a batch that fails on its second operation...");
    let result = operations
        .handle_document(
            json!({"atomic:operations": [
                {"op": "remove", "data": {"type": "post", "id": "1"}},
                {"op": "update", "data": {"type": "user", "id": "1", "attributes": {"age": "old"}}}
            ]}),
            RequestContext::new("demo-rollback"),
        )
        .await;
    match result {
        Ok(_) => println!("❌ Expected the batch to fail"),
        Err(e) => {
            println!("✅ Batch rejected: {}", e);
            println!("{}", serde_json::to_string_pretty(&e.to_error_document())?);
        }
    }
    println!("✅ Storage still holds {} resource(s)", storage.len().await);

    Ok(())
}
