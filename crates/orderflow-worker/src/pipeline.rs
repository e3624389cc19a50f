//! The ingestion pipeline worker
//!
//! A single long-lived consumer loop. For each path dequeued from the
//! transfer queue it runs, in order: retrying read, fingerprint, dedupe
//! check, parse, validate, persist. Exactly one file is in flight at a time,
//! which makes the check-then-insert sequence against the fingerprint ledger
//! race-free: the worker is the sole writer.
//!
//! Every per-file failure is converted into a terminal classification at the
//! worker boundary so one bad file never halts processing of the rest. That
//! includes retry exhaustion: a file that stays unreadable past the retry
//! budget is recorded as an invalid order with reason "File locked" instead
//! of escaping the loop.

use crate::error::Result;
use crate::model::{IncomingOrder, InvalidOrder, ValidOrder};
use crate::storage::OrderStore;
use orderflow_common::fingerprint;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Rejection reason: the file stayed unreadable past the retry budget
pub const REASON_FILE_LOCKED: &str = "File locked";
/// Rejection reason: the content is not a well-formed order document
pub const REASON_CORRUPTED_JSON: &str = "Corrupted JSON";
/// Rejection reason: `CustomerName` is empty or whitespace-only
pub const REASON_CUSTOMER_NAME_MISSING: &str = "CustomerName missing";
/// Rejection reason: `TotalAmount` is negative
pub const REASON_NEGATIVE_AMOUNT: &str = "TotalAmount < 0";

/// Retry budget for reading a file that is still being written or locked
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total read attempts before the file is classified as locked
    pub max_attempts: u32,
    /// Delay between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_millis(500),
        }
    }
}

/// Terminal classification of one processed path
#[derive(Debug)]
pub enum Outcome {
    /// Accepted and persisted together with its ledger entry
    Valid(ValidOrder),
    /// Rejected and persisted with the violated rule
    Invalid(InvalidOrder),
    /// Fingerprint already in the ledger; no record written
    Duplicate,
}

enum ReadAttempt {
    Content(Vec<u8>),
    Locked,
    Cancelled,
}

/// Run the consumer loop until the queue closes or shutdown is requested.
///
/// Shutdown is cooperative: the token is observed between dequeues and during
/// the retry delay, so an in-flight item either finishes or is abandoned
/// without a record, and nothing already enqueued is discarded — it simply
/// remains unconsumed.
pub async fn run(
    mut rx: UnboundedReceiver<PathBuf>,
    store: OrderStore,
    policy: RetryPolicy,
    shutdown: CancellationToken,
) {
    loop {
        let path = tokio::select! {
            _ = shutdown.cancelled() => break,
            msg = rx.recv() => match msg {
                Some(path) => path,
                None => break,
            },
        };

        match process_path(&store, &path, &policy, &shutdown).await {
            Ok(Some(_)) => {},
            // Shutdown observed during the retry delay
            Ok(None) => break,
            // Storage failures are reportable, never swallowed; the loop
            // still moves on to the next queued path
            Err(e) => {
                error!(error = %e, path = %path.display(), "Failed to record outcome for file");
            },
        }
    }
    info!("Pipeline worker stopped");
}

/// Process one path end to end. Returns `None` only when shutdown interrupted
/// the retry delay before the file could be read.
pub async fn process_path(
    store: &OrderStore,
    path: &Path,
    policy: &RetryPolicy,
    shutdown: &CancellationToken,
) -> Result<Option<Outcome>> {
    let bytes = match read_with_retry(path, policy, shutdown).await {
        ReadAttempt::Content(bytes) => bytes,
        ReadAttempt::Cancelled => return Ok(None),
        ReadAttempt::Locked => {
            // The content was never readable, so there are no bytes to keep
            let invalid = InvalidOrder {
                raw_json: String::new(),
                reason: REASON_FILE_LOCKED.to_string(),
            };
            store.record_invalid(&invalid).await?;
            warn!(path = %path.display(), reason = REASON_FILE_LOCKED, "Invalid order saved");
            return Ok(Some(Outcome::Invalid(invalid)));
        },
    };

    let hash = fingerprint::sha256_hex(&bytes);
    if store.fingerprint_seen(&hash).await? {
        info!(path = %path.display(), hash = %hash, "Duplicate file skipped");
        return Ok(Some(Outcome::Duplicate));
    }

    // Content that is not valid UTF-8 cannot be an order document. That is a
    // parse failure, not a read failure: the read itself succeeded.
    let raw = match String::from_utf8(bytes) {
        Ok(raw) => raw,
        Err(e) => {
            let invalid = InvalidOrder {
                raw_json: String::from_utf8_lossy(e.as_bytes()).into_owned(),
                reason: REASON_CORRUPTED_JSON.to_string(),
            };
            store.record_invalid(&invalid).await?;
            warn!(path = %path.display(), reason = REASON_CORRUPTED_JSON, "Invalid order saved");
            return Ok(Some(Outcome::Invalid(invalid)));
        },
    };

    match evaluate(&raw) {
        Ok(order) => {
            store.record_valid(&order, &hash).await?;
            info!(order_id = order.order_id, hash = %hash, "Order saved");
            Ok(Some(Outcome::Valid(order)))
        },
        Err(invalid) => {
            store.record_invalid(&invalid).await?;
            warn!(path = %path.display(), reason = %invalid.reason, "Invalid order saved");
            Ok(Some(Outcome::Invalid(invalid)))
        },
    }
}

/// Parse and validate raw file content. Pure: no I/O, no storage.
pub fn evaluate(raw: &str) -> std::result::Result<ValidOrder, InvalidOrder> {
    let order: IncomingOrder = match serde_json::from_str(raw) {
        Ok(order) => order,
        Err(_) => {
            return Err(InvalidOrder {
                raw_json: raw.to_string(),
                reason: REASON_CORRUPTED_JSON.to_string(),
            })
        },
    };

    if let Some(reason) = validate(&order) {
        return Err(InvalidOrder {
            raw_json: raw.to_string(),
            reason: reason.to_string(),
        });
    }

    Ok(ValidOrder::from(order))
}

fn validate(order: &IncomingOrder) -> Option<&'static str> {
    if order.customer_name.trim().is_empty() {
        return Some(REASON_CUSTOMER_NAME_MISSING);
    }
    if order.total_amount < 0.0 {
        return Some(REASON_NEGATIVE_AMOUNT);
    }
    None
}

async fn read_with_retry(
    path: &Path,
    policy: &RetryPolicy,
    shutdown: &CancellationToken,
) -> ReadAttempt {
    for attempt in 1..=policy.max_attempts {
        match tokio::fs::read(path).await {
            Ok(content) => return ReadAttempt::Content(content),
            Err(e) if attempt < policy.max_attempts => {
                warn!(
                    path = %path.display(),
                    attempt,
                    error = %e,
                    "Failed to read file; retrying after delay"
                );
                tokio::select! {
                    _ = shutdown.cancelled() => return ReadAttempt::Cancelled,
                    _ = tokio::time::sleep(policy.delay) => {},
                }
            },
            Err(e) => {
                warn!(
                    path = %path.display(),
                    attempts = policy.max_attempts,
                    error = %e,
                    "Retry budget exhausted"
                );
            },
        }
    }
    ReadAttempt::Locked
}
