//! Orderflow Worker Library
//!
//! Ingestion pipeline for order files dropped into a watched directory:
//!
//! 1. The [`watcher`] observes the directory for new `*.json` files and
//!    forwards each path into an unbounded channel.
//! 2. The [`pipeline`] worker consumes paths one at a time and runs each file
//!    through read (with retry), fingerprint, dedupe-check, parse, validate,
//!    and persist.
//! 3. The [`storage`] adapter records every terminal outcome: a `ValidOrder`
//!    plus its fingerprint (atomically), or an `InvalidOrder` with the
//!    rejection reason.
//!
//! Each distinct file content is recorded exactly once, even under duplicate
//! delivery and transient file locks.

pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod storage;
pub mod watcher;

pub use error::{Result, WorkerError};
