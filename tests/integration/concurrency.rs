//! Concurrent batches and caller cancellation.

use crate::common::fixtures::{add_post, batch, in_memory_engine, registry_with};
use crate::common::init_logging;
use crate::common::recording::{EventLog, Gate, RecordingFactory};
use jsonapi_atomic::data_layer::InMemoryStorage;
use jsonapi_atomic::{AtomicError, AtomicOperations, RequestContext};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_batches_are_independent() {
    init_logging();
    let (operations, storage) = in_memory_engine();

    let (first, second) = futures::join!(
        operations.handle_document(
            batch(vec![add_post("a1"), add_post("a2")]),
            RequestContext::new("batch-a"),
        ),
        operations.handle_document(
            batch(vec![add_post("b1"), add_post("b2")]),
            RequestContext::new("batch-b"),
        ),
    );
    let first = first.unwrap();
    let second = second.unwrap();

    let ids: HashSet<_> = first
        .results
        .iter()
        .chain(&second.results)
        .filter_map(|entry| entry.data.as_ref().and_then(|d| d.id.clone()))
        .collect();
    assert_eq!(ids.len(), 4);
    assert_eq!(storage.len().await, 4);
}

#[tokio::test]
async fn test_failed_batch_does_not_disturb_concurrent_one() {
    let (operations, storage) = in_memory_engine();

    let (good, bad) = futures::join!(
        operations.handle_document(
            batch(vec![add_post("kept")]),
            RequestContext::new("good"),
        ),
        operations.handle_document(
            batch(vec![
                add_post("dropped"),
                json!({"op": "add", "data": {"type": "post", "attributes": {"title": 5, "body": "b"}}}),
            ]),
            RequestContext::new("bad"),
        ),
    );

    assert_eq!(good.unwrap().len(), 1);
    assert!(matches!(bad, Err(AtomicError::Validation(_))));

    let stored = storage.list("default", "post").await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].get_attribute("title"), Some(&json!("kept")));
}

#[tokio::test]
async fn test_dropped_caller_rolls_back_once() {
    init_logging();
    let log = EventLog::new();
    let storage = InMemoryStorage::new();
    let gate = Arc::new(Gate::default());
    let factory = Arc::new(
        RecordingFactory::new("mem", storage.clone(), log.clone()).with_gate(gate.clone()),
    );
    let operations = AtomicOperations::new(registry_with(factory));

    let caller = tokio::spawn(async move {
        operations
            .handle_document(
                batch(vec![add_post("a"), add_post("b")]),
                RequestContext::new("cancel"),
            )
            .await
    });

    gate.entered.notified().await;
    caller.abort();
    assert!(caller.await.unwrap_err().is_cancelled());
    gate.release.notify_one();

    timeout(Duration::from_secs(5), log.wait_for_end())
        .await
        .expect("batch task never ended the chain");

    assert_eq!(log.opens(), vec!["mem#1"]);
    assert_eq!(log.ends(), vec![("mem#1".to_string(), false)]);
    assert!(storage.is_empty().await);
}
