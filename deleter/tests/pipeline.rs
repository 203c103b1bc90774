#![cfg(feature = "test-utils")]

use std::sync::Arc;
use std::time::Duration;

use deleter::error::ErrorKind;
use deleter::pipeline::DeletionPipeline;
use deleter::store::memory::MemoryDeletionStore;
use deleter::test_utils::store::ObservableStore;
use deleter::types::UserId;
use deleter_config::shared::{BatchConfig, PipelineConfig};
use deleter_telemetry::tracing::init_test_tracing;
use rand::random;
use tokio::time::timeout;

const USER: UserId = UserId(1);

fn test_config(max_workers: u16, max_size: usize, max_fill_ms: u64) -> Arc<PipelineConfig> {
    Arc::new(PipelineConfig {
        max_workers,
        batch: BatchConfig {
            max_size,
            max_fill_ms,
        },
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn full_batch_is_flushed_by_size_before_the_timer() {
    init_test_tracing();

    let memory = MemoryDeletionStore::new();
    memory.insert_ownership(USER, "a").await;
    memory.insert_ownership(USER, "b").await;
    memory.insert_ownership(USER, "c").await;

    let store = ObservableStore::wrap(memory.clone());
    let mut pipeline = DeletionPipeline::new(random(), test_config(2, 3, 1_000), store.clone());
    pipeline.start().unwrap();

    let notify = store.notify_on_batches(1).await;
    assert!(pipeline.enqueue(USER, "a").await);
    assert!(pipeline.enqueue(USER, "b").await);
    assert!(pipeline.enqueue(USER, "c").await);

    // Well under the 1s fill deadline, so this flush must be size-driven.
    timeout(Duration::from_millis(500), notify.notified())
        .await
        .unwrap();

    let batches = store.batches().await;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 3);
    assert!(memory.is_empty().await);

    pipeline.shutdown_and_wait().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn partial_batch_is_flushed_by_the_timer() {
    init_test_tracing();

    let memory = MemoryDeletionStore::new();
    memory.insert_ownership(USER, "a").await;
    memory.insert_ownership(USER, "b").await;

    let store = ObservableStore::wrap(memory.clone());
    let mut pipeline = DeletionPipeline::new(random(), test_config(2, 10, 200), store.clone());
    pipeline.start().unwrap();

    let notify = store.notify_on_batches(1).await;
    assert!(pipeline.enqueue(USER, "a").await);
    assert!(pipeline.enqueue(USER, "b").await);

    // Before the fill deadline the partial batch must still be held back.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(store.batches().await.is_empty());

    timeout(Duration::from_millis(400), notify.notified())
        .await
        .unwrap();

    let batches = store.batches().await;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);
    assert!(memory.is_empty().await);

    pipeline.shutdown_and_wait().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn enqueue_many_accepts_all_codes_and_fills_a_batch() {
    init_test_tracing();

    let memory = MemoryDeletionStore::new();
    memory.insert_ownership(USER, "a").await;
    memory.insert_ownership(USER, "b").await;
    memory.insert_ownership(USER, "c").await;

    let store = ObservableStore::wrap(memory.clone());
    let mut pipeline = DeletionPipeline::new(random(), test_config(2, 3, 1_000), store.clone());
    pipeline.start().unwrap();

    let notify = store.notify_on_batches(1).await;
    assert_eq!(pipeline.enqueue_many(USER, ["a", "b", "c"]).await, 3);

    timeout(Duration::from_millis(500), notify.notified())
        .await
        .unwrap();

    let batches = store.batches().await;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 3);
    assert!(memory.is_empty().await);

    pipeline.shutdown_and_wait().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn store_failure_is_reported_and_the_pipeline_continues() {
    init_test_tracing();

    let memory = MemoryDeletionStore::new();
    memory.insert_ownership(USER, "a").await;
    memory.insert_ownership(USER, "b").await;

    let store = ObservableStore::wrap(memory.clone());
    let mut pipeline = DeletionPipeline::new(random(), test_config(2, 1, 1_000), store.clone());
    pipeline.start().unwrap();

    store.fail_next(1).await;

    let notify = store.notify_on_batches(2).await;
    assert!(pipeline.enqueue(USER, "a").await);
    assert!(pipeline.enqueue(USER, "b").await);

    timeout(Duration::from_secs(1), notify.notified())
        .await
        .unwrap();

    assert_eq!(store.failures().await, 1);
    // One link survives the injected failure, the other was removed by the
    // batch that went through.
    assert_eq!(memory.len().await, 1);

    pipeline.shutdown_and_wait().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn at_most_max_workers_store_calls_are_in_flight() {
    init_test_tracing();

    let store = ObservableStore::wrap(MemoryDeletionStore::new());
    let mut pipeline = DeletionPipeline::new(random(), test_config(2, 1, 1_000), store.clone());
    pipeline.start().unwrap();

    store.set_delay(Duration::from_millis(50)).await;

    let notify = store.notify_on_batches(6).await;
    for index in 0..6 {
        assert!(pipeline.enqueue(USER, format!("code-{index}")).await);
    }

    timeout(Duration::from_secs(2), notify.notified())
        .await
        .unwrap();

    assert!(store.max_in_flight().await <= 2);
    assert_eq!(store.batches().await.len(), 6);

    pipeline.shutdown_and_wait().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_is_idempotent() {
    init_test_tracing();

    let store = ObservableStore::wrap(MemoryDeletionStore::new());
    let mut pipeline = DeletionPipeline::new(random(), test_config(2, 10, 1_000), store);
    pipeline.start().unwrap();

    pipeline.shutdown();
    pipeline.shutdown();

    pipeline.shutdown_and_wait().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn enqueue_then_immediate_shutdown_does_not_hang() {
    init_test_tracing();

    let store = ObservableStore::wrap(MemoryDeletionStore::new());
    // A fill deadline far beyond the test timeout, so a timer flush cannot
    // mask a hang.
    let mut pipeline = DeletionPipeline::new(random(), test_config(2, 10, 60_000), store.clone());
    pipeline.start().unwrap();

    assert!(pipeline.enqueue(USER, "a").await);
    pipeline.shutdown();

    timeout(Duration::from_secs(1), pipeline.wait())
        .await
        .unwrap()
        .unwrap();

    // The partial batch may be discarded or may have squeezed through before
    // the signal was observed; either way the pipeline stops promptly.
    assert!(store.batches().await.len() <= 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn wait_without_shutdown_drains_pending_requests() {
    init_test_tracing();

    let memory = MemoryDeletionStore::new();
    memory.insert_ownership(USER, "a").await;
    memory.insert_ownership(USER, "b").await;

    let store = ObservableStore::wrap(memory.clone());
    let mut pipeline = DeletionPipeline::new(random(), test_config(2, 10, 60_000), store.clone());
    pipeline.start().unwrap();

    assert!(pipeline.enqueue(USER, "a").await);
    assert!(pipeline.enqueue(USER, "b").await);

    // No shutdown: dropping the request sender closes the stream and the
    // final partial batch is flushed rather than discarded.
    timeout(Duration::from_secs(1), pipeline.wait())
        .await
        .unwrap()
        .unwrap();

    let batches = store.batches().await;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);
    assert!(memory.is_empty().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn starting_twice_is_an_error() {
    init_test_tracing();

    let store = ObservableStore::wrap(MemoryDeletionStore::new());
    let mut pipeline = DeletionPipeline::new(random(), test_config(2, 10, 1_000), store);

    pipeline.start().unwrap();
    let err = pipeline.start().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    pipeline.shutdown_and_wait().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn enqueue_after_shutdown_is_rejected() {
    init_test_tracing();

    let store = ObservableStore::wrap(MemoryDeletionStore::new());
    let mut pipeline = DeletionPipeline::new(random(), test_config(2, 10, 1_000), store);
    pipeline.start().unwrap();

    pipeline.shutdown();
    assert!(!pipeline.enqueue(USER, "a").await);
    assert_eq!(pipeline.enqueue_many(USER, ["a", "b", "c"]).await, 0);

    pipeline.shutdown_and_wait().await.unwrap();
}

#[derive(Debug, Clone)]
struct PanickingStore;

impl deleter::store::DeletionStore for PanickingStore {
    fn name() -> &'static str {
        "panicking"
    }

    async fn delete_ownership(
        &self,
        _batch: &[deleter::types::DeletionRequest],
    ) -> deleter::error::DeleterResult<u64> {
        panic!("store blew up");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn worker_panic_is_surfaced_by_wait() {
    init_test_tracing();

    let mut pipeline = DeletionPipeline::new(random(), test_config(1, 1, 1_000), PanickingStore);
    pipeline.start().unwrap();

    assert!(pipeline.enqueue(USER, "a").await);

    let err = timeout(Duration::from_secs(1), pipeline.wait())
        .await
        .unwrap()
        .unwrap_err();
    assert_eq!(err.kinds(), vec![ErrorKind::DeleteWorkerPanic]);
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_configuration_is_rejected_at_start() {
    init_test_tracing();

    let store = ObservableStore::wrap(MemoryDeletionStore::new());
    let mut pipeline = DeletionPipeline::new(random(), test_config(0, 10, 1_000), store);

    let err = pipeline.start().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigError);
}
