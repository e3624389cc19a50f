//! Configuration for the Orderflow worker
//!
//! Defaults can be overridden from the environment; the CLI flags in `main`
//! take precedence over both.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default directory watched for incoming order files.
pub const DEFAULT_WATCH_DIR: &str = "IncomingOrders";

/// Default SQLite database URL.
pub const DEFAULT_DATABASE_URL: &str = "sqlite:orders.db";

/// Worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Directory watched for new order files (non-recursive)
    pub watch_dir: PathBuf,

    /// Database connection URL
    pub database_url: String,
}

impl WorkerConfig {
    /// Create the watch directory if it does not exist yet
    pub fn ensure_watch_dir(&self) -> crate::Result<()> {
        std::fs::create_dir_all(&self.watch_dir)?;
        Ok(())
    }

    /// Create a config with default values
    pub fn new() -> Self {
        Self {
            watch_dir: PathBuf::from(DEFAULT_WATCH_DIR),
            database_url: DEFAULT_DATABASE_URL.to_string(),
        }
    }

    /// Load config from environment variables
    ///
    /// - `ORDERFLOW_WATCH_DIR`: directory to watch
    /// - `ORDERFLOW_DATABASE_URL`: SQLite database URL
    pub fn from_env() -> Self {
        let mut config = Self::new();

        if let Ok(dir) = std::env::var("ORDERFLOW_WATCH_DIR") {
            config.watch_dir = PathBuf::from(dir);
        }

        if let Ok(url) = std::env::var("ORDERFLOW_DATABASE_URL") {
            config.database_url = url;
        }

        config
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::new()
    }
}
