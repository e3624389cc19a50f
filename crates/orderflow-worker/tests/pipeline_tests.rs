//! End-to-end tests for the order ingestion pipeline
//!
//! These tests validate the full workflow:
//! - File detection feeding the transfer queue
//! - Sequential processing of queued paths
//! - Exactly-once recording per distinct file content
//! - Invalid-order classification (corrupted, validation, retry exhaustion)
//! - Cooperative shutdown

use orderflow_worker::model::InvalidOrder;
use orderflow_worker::pipeline::{self, RetryPolicy, REASON_FILE_LOCKED};
use orderflow_worker::storage::OrderStore;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const VALID_ORDER: &str = r#"{
    "OrderId": 101,
    "CustomerName": "Ada Lovelace",
    "OrderDate": "2024-06-01T12:00:00Z",
    "TotalAmount": 1500.0
}"#;

/// Retry policy small enough for tests that exercise exhaustion
fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 2,
        delay: Duration::from_millis(10),
    }
}

async fn fresh_store() -> OrderStore {
    OrderStore::connect("sqlite::memory:")
        .await
        .expect("in-memory store")
}

fn spawn_worker(
    store: OrderStore,
    policy: RetryPolicy,
) -> (UnboundedSender<PathBuf>, CancellationToken, JoinHandle<()>) {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(pipeline::run(rx, store, policy, shutdown.clone()));
    (tx, shutdown, handle)
}

/// Poll until `check` passes or the timeout elapses
async fn wait_until<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if check().await {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within timeout"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

fn write_order_file(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("write order file");
    path
}

#[tokio::test]
async fn test_valid_order_persisted_with_ledger_entry() {
    let dir = tempfile::tempdir().unwrap();
    let store = fresh_store().await;
    let (tx, shutdown, handle) = spawn_worker(store.clone(), fast_retry());

    tx.send(write_order_file(&dir, "order.json", VALID_ORDER))
        .unwrap();

    let probe = store.clone();
    wait_until(|| {
        let store = probe.clone();
        async move { store.valid_orders().await.unwrap().len() == 1 }
    })
    .await;

    let orders = store.valid_orders().await.unwrap();
    assert_eq!(orders[0].order_id, 101);
    assert_eq!(orders[0].customer_name, "Ada Lovelace");
    assert!(orders[0].is_high_value);

    let hash = orderflow_common::fingerprint::sha256_hex(VALID_ORDER.as_bytes());
    assert!(store.fingerprint_seen(&hash).await.unwrap());

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_duplicate_content_recorded_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = fresh_store().await;
    let (tx, shutdown, handle) = spawn_worker(store.clone(), fast_retry());

    // Same bytes under two different names, plus a distinct order
    let distinct = VALID_ORDER.replace("101", "202");
    tx.send(write_order_file(&dir, "a.json", VALID_ORDER)).unwrap();
    tx.send(write_order_file(&dir, "b.json", VALID_ORDER)).unwrap();
    tx.send(write_order_file(&dir, "c.json", &distinct)).unwrap();

    let probe = store.clone();
    wait_until(|| {
        let store = probe.clone();
        async move { store.valid_orders().await.unwrap().len() == 2 }
    })
    .await;

    // Give the worker a beat: the duplicate must stay a no-op
    tokio::time::sleep(Duration::from_millis(100)).await;
    let orders = store.valid_orders().await.unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].order_id, 101);
    assert_eq!(orders[1].order_id, 202);
    assert!(store.invalid_orders().await.unwrap().is_empty());

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_invalid_files_classified_and_reprocessable() {
    let dir = tempfile::tempdir().unwrap();
    let store = fresh_store().await;
    let (tx, shutdown, handle) = spawn_worker(store.clone(), fast_retry());

    let corrupted = "{ not json at all";
    let no_name = r#"{"OrderId": 5, "CustomerName": " ", "OrderDate": "2024-06-01T12:00:00Z", "TotalAmount": 10.0}"#;
    let negative = r#"{"OrderId": 6, "CustomerName": "Bob", "OrderDate": "2024-06-01T12:00:00Z", "TotalAmount": -5}"#;

    tx.send(write_order_file(&dir, "bad1.json", corrupted)).unwrap();
    tx.send(write_order_file(&dir, "bad2.json", no_name)).unwrap();
    tx.send(write_order_file(&dir, "bad3.json", negative)).unwrap();
    // Invalid files are never fingerprinted: resubmitting the same corrupted
    // content is reprocessed, not skipped as a duplicate
    tx.send(write_order_file(&dir, "bad4.json", corrupted)).unwrap();

    let probe = store.clone();
    wait_until(|| {
        let store = probe.clone();
        async move { store.invalid_orders().await.unwrap().len() == 4 }
    })
    .await;

    let invalid = store.invalid_orders().await.unwrap();
    assert_eq!(
        invalid[0],
        InvalidOrder {
            raw_json: corrupted.to_string(),
            reason: "Corrupted JSON".to_string(),
        }
    );
    assert_eq!(invalid[1].reason, "CustomerName missing");
    assert_eq!(invalid[2].reason, "TotalAmount < 0");
    assert_eq!(invalid[3].reason, "Corrupted JSON");
    assert!(store.valid_orders().await.unwrap().is_empty());

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_non_utf8_content_classified_as_corrupted() {
    let dir = tempfile::tempdir().unwrap();
    let store = fresh_store().await;
    let (tx, shutdown, handle) = spawn_worker(store.clone(), fast_retry());

    // Readable bytes that are not valid UTF-8: a parse failure, not a lock
    let bytes = [0xff, 0xfe, b'{', b'}'];
    let path = dir.path().join("bad-bytes.json");
    std::fs::write(&path, bytes).unwrap();
    tx.send(path).unwrap();

    let probe = store.clone();
    wait_until(|| {
        let store = probe.clone();
        async move { store.invalid_orders().await.unwrap().len() == 1 }
    })
    .await;

    let invalid = store.invalid_orders().await.unwrap();
    assert_eq!(invalid[0].reason, "Corrupted JSON");
    assert_eq!(
        invalid[0].raw_json,
        String::from_utf8_lossy(&bytes).into_owned()
    );
    assert!(store.valid_orders().await.unwrap().is_empty());

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_unreadable_file_becomes_file_locked_record() {
    let store = fresh_store().await;
    let (tx, shutdown, handle) = spawn_worker(store.clone(), fast_retry());

    // A path that never becomes readable exhausts the retry budget
    tx.send(PathBuf::from("/nonexistent/orders/ghost.json"))
        .unwrap();

    let probe = store.clone();
    wait_until(|| {
        let store = probe.clone();
        async move { store.invalid_orders().await.unwrap().len() == 1 }
    })
    .await;

    let invalid = store.invalid_orders().await.unwrap();
    assert_eq!(invalid[0].reason, REASON_FILE_LOCKED);
    assert_eq!(invalid[0].raw_json, "");

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_file_readable_within_retry_budget_is_processed() {
    let dir = tempfile::tempdir().unwrap();
    let store = fresh_store().await;
    let policy = RetryPolicy {
        max_attempts: 10,
        delay: Duration::from_millis(20),
    };
    let (tx, shutdown, handle) = spawn_worker(store.clone(), policy);

    // Enqueue the path before the file exists, then create it while the
    // worker is inside its retry loop
    let path = dir.path().join("late.json");
    tx.send(path.clone()).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    std::fs::write(&path, VALID_ORDER).unwrap();

    let probe = store.clone();
    wait_until(|| {
        let store = probe.clone();
        async move { store.valid_orders().await.unwrap().len() == 1 }
    })
    .await;

    assert!(store.invalid_orders().await.unwrap().is_empty());

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_one_bad_file_does_not_halt_the_queue() {
    let dir = tempfile::tempdir().unwrap();
    let store = fresh_store().await;
    let (tx, shutdown, handle) = spawn_worker(store.clone(), fast_retry());

    tx.send(PathBuf::from("/nonexistent/orders/stuck.json"))
        .unwrap();
    tx.send(write_order_file(&dir, "after.json", VALID_ORDER))
        .unwrap();

    let probe = store.clone();
    wait_until(|| {
        let store = probe.clone();
        async move {
            store.valid_orders().await.unwrap().len() == 1
                && store.invalid_orders().await.unwrap().len() == 1
        }
    })
    .await;

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_watcher_feeds_pipeline_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let store = fresh_store().await;

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let _guard = orderflow_worker::watcher::watch(dir.path(), tx).expect("establish watch");

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(pipeline::run(
        rx,
        store.clone(),
        fast_retry(),
        shutdown.clone(),
    ));

    // Created after the watch is established, so it arrives as an event
    write_order_file(&dir, "dropped.json", VALID_ORDER);
    // Non-matching files must be ignored by the event source
    std::fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

    let probe = store.clone();
    wait_until(|| {
        let store = probe.clone();
        async move { store.valid_orders().await.unwrap().len() == 1 }
    })
    .await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(store.valid_orders().await.unwrap().len(), 1);
    assert!(store.invalid_orders().await.unwrap().is_empty());

    shutdown.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_shutdown_stops_idle_worker_promptly() {
    let store = fresh_store().await;
    let (_tx, shutdown, handle) = spawn_worker(store, fast_retry());

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("worker should stop promptly")
        .unwrap();
}
