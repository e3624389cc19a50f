//! Orderflow Worker - order file ingestion service

use anyhow::Result;
use clap::Parser;
use orderflow_common::logging::{init_logging, LogConfig, LogLevel};
use orderflow_worker::config::WorkerConfig;
use orderflow_worker::pipeline::{self, RetryPolicy};
use orderflow_worker::storage::OrderStore;
use orderflow_worker::watcher;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "orderflow-worker")]
#[command(author, version, about = "Watches a directory for order files and ingests them")]
struct Cli {
    /// Directory to watch for incoming order files
    #[arg(long)]
    watch_dir: Option<PathBuf>,

    /// Database URL (e.g. sqlite:orders.db)
    #[arg(long)]
    database_url: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env()?;
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    }
    init_logging(&log_config)?;

    // CLI flags take precedence over environment variables
    let mut config = WorkerConfig::from_env();
    if let Some(dir) = cli.watch_dir {
        config.watch_dir = dir;
    }
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }

    config.ensure_watch_dir()?;
    let store = OrderStore::connect(&config.database_url).await?;

    let (tx, rx) = mpsc::unbounded_channel();

    // Watch establishment failure is fatal: propagate instead of retrying
    let _watch_guard = watcher::watch(&config.watch_dir, tx)?;

    let shutdown = CancellationToken::new();
    let worker = tokio::spawn(pipeline::run(
        rx,
        store,
        RetryPolicy::default(),
        shutdown.clone(),
    ));

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    shutdown.cancel();
    worker.await?;

    Ok(())
}
