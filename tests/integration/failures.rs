//! Error paths. A failed batch surfaces one error and leaves every backend
//! exactly as it was before the batch.

use crate::common::fixtures::{add_post, add_user, batch, post_schema, registry_with, user_schema};
use crate::common::init_logging;
use crate::common::recording::{EventLog, RecordingFactory};
use jsonapi_atomic::data_layer::{DataLayerArgs, InMemoryStorage, StorageKey};
use jsonapi_atomic::dependencies::{DependencyError, MethodConfig, MethodDependencies};
use jsonapi_atomic::error::ValidationError;
use jsonapi_atomic::{
    Action, AtomicError, AtomicOperations, RequestContext, ResourceDescriptor, ResourceObject,
    ResourceRegistry, StorageError,
};
use serde_json::json;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

fn recording_engine() -> (AtomicOperations, EventLog, InMemoryStorage) {
    let log = EventLog::new();
    let storage = InMemoryStorage::new();
    let factory = Arc::new(RecordingFactory::new("mem", storage.clone(), log.clone()));
    (AtomicOperations::new(registry_with(factory)), log, storage)
}

async fn seed(storage: &InMemoryStorage) {
    storage
        .put(
            StorageKey::new("default", "post", "42"),
            ResourceObject::new("post")
                .with_id("42")
                .with_attribute("title", json!("keep"))
                .with_attribute("body", json!("me")),
        )
        .await;
}

#[tokio::test]
async fn test_failure_at_third_operation_rolls_back_everything() {
    init_logging();
    let (operations, log, storage) = recording_engine();
    seed(&storage).await;
    let before = storage.snapshot().await;

    let result = operations
        .handle_document(
            batch(vec![
                add_post("a"),
                json!({"op": "update", "data": {"type": "post", "id": "42", "attributes": {"title": "changed"}}}),
                json!({"op": "add", "data": {"type": "user", "attributes": {"age": 3}}}),
                add_user("never"),
            ]),
            RequestContext::new("fail-3"),
        )
        .await;

    assert!(matches!(
        result,
        Err(AtomicError::Validation(ValidationError::MissingRequiredAttribute { ref attribute }))
            if attribute == "name"
    ));
    assert_eq!(log.opens(), vec!["mem#1", "mem#2", "mem#3"]);
    assert_eq!(log.begins().len(), 3);
    assert_eq!(log.ends(), vec![("mem#3".to_string(), false)]);
    assert_eq!(storage.snapshot().await, before);
}

#[tokio::test]
async fn test_failure_across_backends_leaves_both_untouched() {
    let log = EventLog::new();
    let posts = InMemoryStorage::new();
    let people = InMemoryStorage::new();
    seed(&posts).await;
    let before = posts.snapshot().await;

    let registry = ResourceRegistry::builder()
        .register(ResourceDescriptor::new(
            post_schema(),
            Arc::new(RecordingFactory::new("posts", posts.clone(), log.clone())),
        ))
        .unwrap()
        .register(ResourceDescriptor::new(
            user_schema(),
            Arc::new(RecordingFactory::new("people", people.clone(), log.clone())),
        ))
        .unwrap()
        .build();
    let operations = AtomicOperations::new(registry);

    let result = operations
        .handle_document(
            batch(vec![
                add_user("Ada"),
                json!({"op": "remove", "data": {"type": "post", "id": "42"}}),
                json!({"op": "remove", "data": {"type": "post", "id": "404"}}),
            ]),
            RequestContext::new("mixed-fail"),
        )
        .await;

    let error = result.unwrap_err();
    assert!(matches!(error, AtomicError::ResourceNotFound { ref id, .. } if id == "404"));
    assert_eq!(error.status_code(), 404);
    assert_eq!(log.ends(), vec![("posts#2".to_string(), false)]);
    assert_eq!(posts.snapshot().await, before);
    assert!(people.is_empty().await);
}

#[tokio::test]
async fn test_invalid_action_opens_no_handle() {
    let (operations, log, _storage) = recording_engine();

    let result = operations
        .handle_document(
            batch(vec![
                add_post("a"),
                json!({"op": "upsert", "data": {"type": "post", "attributes": {}}}),
            ]),
            RequestContext::new("invalid-action"),
        )
        .await;

    let error = result.unwrap_err();
    assert!(matches!(
        error,
        AtomicError::InvalidAction { index: 1, ref action } if action == "upsert"
    ));
    assert_eq!(
        error.to_error_document()["errors"][0]["source"]["pointer"],
        "/atomic:operations/1"
    );
    assert!(log.is_empty());
}

#[tokio::test]
async fn test_unknown_resource_type_opens_no_handle() {
    let (operations, log, _storage) = recording_engine();

    let result = operations
        .handle_document(
            batch(vec![
                add_post("a"),
                json!({"op": "add", "data": {"type": "computer", "attributes": {}}}),
            ]),
            RequestContext::new("unknown-type"),
        )
        .await;

    assert!(matches!(
        result,
        Err(AtomicError::UnknownResourceType { ref resource_type }) if resource_type == "computer"
    ));
    assert!(log.is_empty());
}

#[tokio::test]
async fn test_dependency_failure_opens_no_handle_for_its_operation() {
    let log = EventLog::new();
    let storage = InMemoryStorage::new();
    let factory = Arc::new(RecordingFactory::new("mem", storage.clone(), log.clone()));
    let guarded = MethodDependencies::new().with_all(MethodConfig::from_fn(|context| {
        match context.header("authorization") {
            Some(token) if token == "Bearer ok" => {
                Ok(DataLayerArgs::new().with("tenant_id", json!("acme")))
            }
            _ => Err(DependencyError::forbidden("user writes need a token")),
        }
    }));

    let registry = ResourceRegistry::builder()
        .register(ResourceDescriptor::new(post_schema(), factory.clone()))
        .unwrap()
        .register(ResourceDescriptor::new(user_schema(), factory).with_dependencies(guarded))
        .unwrap()
        .build();
    let operations = AtomicOperations::new(registry);

    let result = operations
        .handle_document(
            batch(vec![add_post("a"), add_user("Ada")]),
            RequestContext::new("deps"),
        )
        .await;

    let error = result.unwrap_err();
    assert_eq!(error.status_code(), 403);
    assert_eq!(error.error_code(), "DEPENDENCY_ERROR");
    assert_eq!(log.opens(), vec!["mem#1"]);
    assert_eq!(log.ends(), vec![("mem#1".to_string(), false)]);
    assert!(storage.is_empty().await);

    // With credentials the same batch commits and the user lands in its tenant
    operations
        .handle_document(
            batch(vec![add_post("a"), add_user("Ada")]),
            RequestContext::new("deps-ok").with_header("Authorization", "Bearer ok"),
        )
        .await
        .unwrap();
    assert!(storage.contains(&StorageKey::new("acme", "user", "1")).await);
    assert!(storage.contains(&StorageKey::new("default", "post", "1")).await);
}

#[tokio::test]
async fn test_unsupported_action_rolls_back() {
    let log = EventLog::new();
    let storage = InMemoryStorage::new();
    let factory = Arc::new(RecordingFactory::new("mem", storage.clone(), log.clone()));
    let registry = ResourceRegistry::builder()
        .register(ResourceDescriptor::new(post_schema(), factory.clone()))
        .unwrap()
        .register(
            ResourceDescriptor::new(user_schema(), factory)
                .with_operations([Action::Add, Action::Update]),
        )
        .unwrap()
        .build();
    let operations = AtomicOperations::new(registry);

    let result = operations
        .handle_document(
            batch(vec![
                add_post("a"),
                json!({"op": "remove", "data": {"type": "user", "id": "1"}}),
            ]),
            RequestContext::new("unsupported"),
        )
        .await;

    let error = result.unwrap_err();
    assert!(matches!(
        error,
        AtomicError::UnsupportedOperation { action: Action::Remove, .. }
    ));
    assert_eq!(error.status_code(), 405);
    assert_eq!(log.ends(), vec![("mem#2".to_string(), false)]);
    assert!(storage.is_empty().await);
}

#[tokio::test]
async fn test_client_id_conflict_is_409() {
    let log = EventLog::new();
    let storage = InMemoryStorage::new();
    seed(&storage).await;
    let factory = Arc::new(RecordingFactory::new("mem", storage.clone(), log.clone()));
    let registry = ResourceRegistry::builder()
        .register(ResourceDescriptor::new(post_schema().allow_client_id(), factory))
        .unwrap()
        .build();
    let operations = AtomicOperations::new(registry);

    let result = operations
        .handle_document(
            batch(vec![json!({
                "op": "add",
                "data": {"type": "post", "id": "42", "attributes": {"title": "dup", "body": "b"}}
            })]),
            RequestContext::new("conflict"),
        )
        .await;

    let error = assert_err!(result);
    assert_eq!(error.status_code(), 409);
    assert_eq!(log.ends(), vec![("mem#1".to_string(), false)]);
}

#[tokio::test]
async fn test_batch_size_limits() {
    let log = EventLog::new();
    let factory = Arc::new(RecordingFactory::new("mem", InMemoryStorage::new(), log.clone()));
    let limited = AtomicOperations::builder(registry_with(factory.clone()))
        .with_max_operations(2)
        .build()
        .unwrap();

    let result = limited
        .handle_document(
            batch(vec![add_post("a"), add_post("b"), add_post("c")]),
            RequestContext::new("too-many"),
        )
        .await;
    assert!(matches!(result, Err(AtomicError::MalformedBatch { index: None, .. })));
    assert!(log.is_empty());

    let permissive = AtomicOperations::builder(registry_with(factory))
        .allow_empty_batch(true)
        .build()
        .unwrap();
    let response = assert_ok!(
        permissive
            .handle_document(batch(vec![]), RequestContext::new("empty"))
            .await
    );
    assert!(response.is_empty());
    assert!(log.is_empty());
}

fn engine_over(factory: RecordingFactory) -> AtomicOperations {
    AtomicOperations::new(registry_with(Arc::new(factory)))
}

#[tokio::test]
async fn test_failed_open_ends_on_previous_handle() {
    let log = EventLog::new();
    let storage = InMemoryStorage::new();
    seed(&storage).await;
    let before = storage.snapshot().await;
    let operations = engine_over(
        RecordingFactory::new("mem", storage.clone(), log.clone()).with_failing_open(3),
    );

    let error = operations
        .handle_document(
            batch(vec![add_post("a"), add_post("b"), add_post("c")]),
            RequestContext::new("open-fails"),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        AtomicError::Storage(StorageError::Unavailable { .. })
    ));
    assert_eq!(error.status_code(), 500);
    assert_eq!(log.opens(), vec!["mem#1", "mem#2"]);
    assert_eq!(log.ends(), vec![("mem#2".to_string(), false)]);
    assert_eq!(storage.snapshot().await, before);
}

#[tokio::test]
async fn test_failed_begin_ends_on_previous_handle() {
    let log = EventLog::new();
    let storage = InMemoryStorage::new();
    seed(&storage).await;
    let before = storage.snapshot().await;
    let operations = engine_over(
        RecordingFactory::new("mem", storage.clone(), log.clone()).with_failing_begin(2),
    );

    let error = operations
        .handle_document(
            batch(vec![add_post("a"), add_user("b"), add_post("c")]),
            RequestContext::new("begin-fails"),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        AtomicError::Storage(StorageError::Unavailable { .. })
    ));
    assert_eq!(log.opens(), vec!["mem#1", "mem#2"]);
    assert_eq!(log.begins().len(), 2);
    assert_eq!(log.ends(), vec![("mem#1".to_string(), false)]);
    assert_eq!(storage.snapshot().await, before);
}

#[tokio::test]
async fn test_failed_commit_surfaces_without_second_end() {
    let log = EventLog::new();
    let storage = InMemoryStorage::new();
    seed(&storage).await;
    let before = storage.snapshot().await;
    let operations = engine_over(
        RecordingFactory::new("mem", storage.clone(), log.clone()).with_failing_commit(),
    );

    let error = operations
        .handle_document(
            batch(vec![add_post("a"), add_user("b")]),
            RequestContext::new("commit-fails"),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        AtomicError::Storage(StorageError::Unavailable { .. })
    ));
    assert_eq!(log.ends(), vec![("mem#2".to_string(), true)]);
    assert_eq!(storage.snapshot().await, before);
}
