//! Content fingerprinting for duplicate detection
//!
//! A fingerprint is the SHA-256 hash of a file's raw bytes, hex-encoded. Two
//! deliveries of byte-identical content always produce the same fingerprint,
//! which the worker uses as the unique key in its processed-files ledger.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 fingerprint of raw content, as lowercase hex
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
