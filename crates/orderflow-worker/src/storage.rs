//! Storage adapter for order outcomes
//!
//! SQLite via sqlx, with the schema embedded as migrations. The pool is
//! capped at a single connection: the pipeline worker is the only writer, and
//! the cap turns that invariant into a construction-time property instead of
//! a runtime convention.
//!
//! The dedupe ledger's unique index is the authoritative duplicate guard. The
//! worker pre-checks it to skip needless parsing, but a uniqueness violation
//! surfacing on commit is still mapped to a distinct, reportable error.

use crate::error::{Result, WorkerError};
use crate::model::{InvalidOrder, ValidOrder};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;

/// Append-only store for valid orders, invalid orders, and the
/// processed-fingerprints ledger
#[derive(Debug, Clone)]
pub struct OrderStore {
    pool: SqlitePool,
}

impl OrderStore {
    /// Connect to the database at `url` (e.g. `sqlite:orders.db`), creating
    /// the file if missing, and run migrations
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // Single connection: the pipeline worker is the sole writer
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Check whether a fingerprint is already present in the ledger
    pub async fn fingerprint_seen(&self, hash: &str) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) as count FROM processed_fingerprints WHERE hash = ?1
            "#,
        )
        .bind(hash)
        .fetch_one(&self.pool)
        .await?;

        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    /// Persist an accepted order together with its fingerprint ledger entry.
    /// Both inserts commit in one transaction or neither does, so a ledger
    /// entry can never exist without its valid order.
    pub async fn record_valid(&self, order: &ValidOrder, hash: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO valid_orders (order_id, customer_name, order_date, total_amount, is_high_value)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(order.order_id)
        .bind(&order.customer_name)
        .bind(order.order_date)
        .bind(order.total_amount)
        .bind(order.is_high_value)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO processed_fingerprints (hash) VALUES (?1)
            "#,
        )
        .bind(hash)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, hash))?;

        tx.commit().await?;
        Ok(())
    }

    /// Persist a rejected file. No ledger entry is written, so resubmitting
    /// the same invalid content is reprocessed every time.
    pub async fn record_invalid(&self, invalid: &InvalidOrder) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO invalid_orders (raw_json, reason) VALUES (?1, ?2)
            "#,
        )
        .bind(&invalid.raw_json)
        .bind(&invalid.reason)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All persisted valid orders, in insertion order
    pub async fn valid_orders(&self) -> Result<Vec<ValidOrder>> {
        let orders = sqlx::query_as::<_, ValidOrder>(
            r#"
            SELECT order_id, customer_name, order_date, total_amount, is_high_value
            FROM valid_orders ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// All persisted invalid orders, in insertion order
    pub async fn invalid_orders(&self) -> Result<Vec<InvalidOrder>> {
        let invalid = sqlx::query_as::<_, InvalidOrder>(
            r#"
            SELECT raw_json, reason FROM invalid_orders ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(invalid)
    }
}

fn map_unique_violation(e: sqlx::Error, hash: &str) -> WorkerError {
    if e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
    {
        return WorkerError::FingerprintConflict(hash.to_string());
    }
    WorkerError::Database(e)
}
