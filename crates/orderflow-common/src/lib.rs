//! Orderflow Common Library
//!
//! Shared utilities for the Orderflow workspace:
//!
//! - **Fingerprinting**: content hashing used as the deduplication key
//! - **Logging**: centralized tracing subscriber setup

pub mod fingerprint;
pub mod logging;
