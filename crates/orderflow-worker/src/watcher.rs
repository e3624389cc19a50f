//! Event source: filesystem watch on the incoming-orders directory
//!
//! Observes a single directory (non-recursive) for newly created `*.json`
//! files and forwards each matching path into the transfer queue. The notify
//! callback runs on a watcher-owned thread, so it is restricted to filtering
//! and one non-blocking send; all I/O happens in the pipeline worker.

use crate::Result;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info};

/// Guard for an active directory watch. Dropping it stops the watch, so the
/// caller must keep it alive for the lifetime of the pipeline.
pub struct OrderWatcher {
    _watcher: RecommendedWatcher,
}

/// Start watching `dir` for created `.json` files, forwarding each path into
/// `tx`. Failure to establish the watch is fatal to the pipeline and is
/// returned to the caller rather than retried.
pub fn watch(dir: &Path, tx: UnboundedSender<PathBuf>) -> Result<OrderWatcher> {
    let mut watcher = RecommendedWatcher::new(
        move |res: std::result::Result<Event, notify::Error>| match res {
            Ok(event) => {
                if !matches!(event.kind, EventKind::Create(_)) {
                    return;
                }
                for path in event.paths {
                    if !is_order_file(&path) {
                        continue;
                    }
                    info!(path = %path.display(), "New order file detected");
                    if tx.send(path).is_err() {
                        // Receiver gone: the pipeline is shutting down
                        error!("Transfer queue closed; dropping file event");
                    }
                }
            },
            Err(e) => error!(error = %e, "Filesystem watch error"),
        },
        notify::Config::default(),
    )?;

    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    info!(dir = %dir.display(), "Watching for incoming order files");

    Ok(OrderWatcher { _watcher: watcher })
}

fn is_order_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
