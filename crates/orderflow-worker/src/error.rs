//! Error types for the Orderflow worker

use thiserror::Error;

/// Result type alias for worker operations
pub type Result<T> = std::result::Result<T, WorkerError>;

/// Error type for the ingestion pipeline and its collaborators
#[derive(Error, Debug)]
pub enum WorkerError {
    /// File system operation failed
    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),

    /// Database operation failed
    #[error("Database error: {0}. Check the database path and permissions.")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// The fingerprint ledger rejected a duplicate entry on commit. The
    /// pre-check should make this unreachable while a single worker owns the
    /// store; seeing it means the single-writer invariant was broken.
    #[error("Fingerprint '{0}' is already recorded in the ledger")]
    FingerprintConflict(String),

    /// Establishing the filesystem watch failed; fatal to the pipeline
    #[error("Failed to establish filesystem watch: {0}")]
    Watch(#[from] notify::Error),
}
