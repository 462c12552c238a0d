//! Result shape and ordering.

use crate::common::fixtures::{add_post, add_user, batch, in_memory_engine};
use crate::common::init_logging;
use jsonapi_atomic::data_layer::StorageKey;
use jsonapi_atomic::resource::{RelationshipData, ResourceIdentifier};
use jsonapi_atomic::{AtomicOperationRequest, RequestContext, ResourceObject};
use proptest::prelude::*;
use serde_json::json;

#[tokio::test]
async fn test_add_then_remove_against_empty_store() {
    init_logging();
    let (operations, storage) = in_memory_engine();

    let response = operations
        .handle_document(
            json!({"atomic:operations": [
                {"op": "add", "data": {"type": "post", "attributes": {"title": "t", "body": "b"}}},
                {"op": "remove", "data": {"type": "post", "id": "1"}}
            ]}),
            RequestContext::new("example"),
        )
        .await
        .unwrap();

    assert_eq!(
        response.to_json().unwrap(),
        json!({"atomic:results": [
            {"data": {"type": "post", "id": "1", "attributes": {"title": "t", "body": "b"}}},
            {"data": null}
        ]})
    );
    assert!(storage.is_empty().await);
}

#[tokio::test]
async fn test_add_update_remove_on_three_types() {
    let (operations, storage) = in_memory_engine();
    storage
        .put(
            StorageKey::new("default", "post", "7"),
            ResourceObject::new("post")
                .with_id("7")
                .with_attribute("title", json!("old"))
                .with_attribute("body", json!("b")),
        )
        .await;
    storage
        .put(
            StorageKey::new("default", "post_comment", "3"),
            ResourceObject::new("post_comment")
                .with_id("3")
                .with_attribute("text", json!("spam")),
        )
        .await;

    let response = operations
        .handle_document(
            batch(vec![
                add_user("Ada"),
                json!({"op": "update", "data": {"type": "post", "id": "7", "attributes": {"title": "new"}}}),
                json!({"op": "remove", "ref": {"type": "post_comment", "id": "3"}}),
            ]),
            RequestContext::new("three-types"),
        )
        .await
        .unwrap();

    assert_eq!(response.len(), 3);
    let user = response.results[0].data.as_ref().unwrap();
    assert_eq!(user.resource_type, "user");
    assert_eq!(user.get_attribute("name"), Some(&json!("Ada")));

    let post = response.results[1].data.as_ref().unwrap();
    assert_eq!(post.get_attribute("title"), Some(&json!("new")));
    assert_eq!(post.get_attribute("body"), Some(&json!("b")));

    assert!(response.results[2].data.is_none());
    assert!(
        !storage
            .contains(&StorageKey::new("default", "post_comment", "3"))
            .await
    );
}

#[tokio::test]
async fn test_relationship_replace_changes_only_that_relationship() {
    let (operations, storage) = in_memory_engine();
    storage
        .put(
            StorageKey::new("default", "post", "1"),
            ResourceObject::new("post")
                .with_id("1")
                .with_attribute("title", json!("t"))
                .with_attribute("body", json!("b"))
                .with_relationship(
                    "user",
                    RelationshipData::ToOne(Some(ResourceIdentifier::new("user", "1"))),
                ),
        )
        .await;

    let response = operations
        .handle_document(
            batch(vec![json!({
                "op": "update",
                "ref": {"type": "post", "id": "1", "relationship": "comments"},
                "data": [{"type": "post_comment", "id": "5"}, {"type": "post_comment", "id": "6"}]
            })]),
            RequestContext::new("rel"),
        )
        .await
        .unwrap();

    let post = response.results[0].data.as_ref().unwrap();
    assert_eq!(post.get_attribute("title"), Some(&json!("t")));
    assert_eq!(
        post.relationships["user"].data,
        RelationshipData::ToOne(Some(ResourceIdentifier::new("user", "1")))
    );
    assert_eq!(post.relationships["comments"].data.identifiers().len(), 2);

    let stored = storage
        .get(&StorageKey::new("default", "post", "1"))
        .await
        .unwrap();
    assert_eq!(&stored, post);
}

#[tokio::test]
async fn test_remove_relationship_members() {
    let (operations, storage) = in_memory_engine();
    storage
        .put(
            StorageKey::new("default", "post", "1"),
            ResourceObject::new("post")
                .with_id("1")
                .with_attribute("title", json!("t"))
                .with_attribute("body", json!("b"))
                .with_relationship(
                    "comments",
                    RelationshipData::ToMany(vec![
                        ResourceIdentifier::new("post_comment", "5"),
                        ResourceIdentifier::new("post_comment", "6"),
                    ]),
                ),
        )
        .await;

    let response = operations
        .handle_document(
            batch(vec![json!({
                "op": "remove",
                "ref": {"type": "post", "id": "1", "relationship": "comments"},
                "data": [{"type": "post_comment", "id": "5"}]
            })]),
            RequestContext::new("members"),
        )
        .await
        .unwrap();

    assert!(response.results[0].data.is_none());
    let stored = storage
        .get(&StorageKey::new("default", "post", "1"))
        .await
        .unwrap();
    assert_eq!(
        stored.relationships["comments"].data,
        RelationshipData::ToMany(vec![ResourceIdentifier::new("post_comment", "6")])
    );
}

#[tokio::test]
async fn test_operations_alias_and_integer_ids() {
    let (operations, _storage) = in_memory_engine();

    let response = operations
        .handle_document(
            json!({"operations": [
                add_post("t"),
                {"op": "update", "data": {"type": "post", "id": 1, "attributes": {"body": "c"}}}
            ]}),
            RequestContext::new("alias"),
        )
        .await
        .unwrap();

    assert_eq!(response.len(), 2);
    let updated = response.results[1].data.as_ref().unwrap();
    assert_eq!(updated.get_id(), Some("1"));
    assert_eq!(updated.get_attribute("body"), Some(&json!("c")));
}

#[tokio::test]
async fn test_later_operation_sees_earlier_write() {
    let (operations, _storage) = in_memory_engine();

    let response = operations
        .handle_document(
            batch(vec![
                add_user("Ada"),
                add_post("t"),
                json!({
                    "op": "update",
                    "ref": {"type": "user", "id": "1", "relationship": "posts"},
                    "data": [{"type": "post", "id": "1"}]
                }),
            ]),
            RequestContext::new("visibility"),
        )
        .await
        .unwrap();

    let user = response.results[2].data.as_ref().unwrap();
    assert_eq!(user.get_attribute("name"), Some(&json!("Ada")));
    assert_eq!(
        user.relationships["posts"].data,
        RelationshipData::ToMany(vec![ResourceIdentifier::new("post", "1")])
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_one_result_per_operation_in_order(titles in prop::collection::vec("[a-z]{1,12}", 1..20)) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (operations, storage) = in_memory_engine();
        let request = AtomicOperationRequest::from_value(batch(
            titles.iter().map(|title| add_post(title)).collect(),
        ))
        .unwrap();

        let response = runtime
            .block_on(operations.execute(request, RequestContext::new("prop")))
            .unwrap();

        prop_assert_eq!(response.len(), titles.len());
        for (entry, title) in response.results.iter().zip(&titles) {
            let data = entry.data.as_ref().unwrap();
            prop_assert_eq!(data.get_attribute("title"), Some(&json!(title)));
        }
        prop_assert_eq!(runtime.block_on(storage.len()), titles.len());
    }
}
