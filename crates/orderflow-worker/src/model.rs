//! Domain types for order ingestion
//!
//! The wire format is a JSON object with PascalCase member names, so the
//! transient [`IncomingOrder`] carries serde renames. The persisted types map
//! directly onto their append-only tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An order as decoded from an incoming file. Transient: exists only during
/// parsing and validation, never persisted directly.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IncomingOrder {
    pub order_id: i64,
    pub customer_name: String,
    pub order_date: DateTime<Utc>,
    pub total_amount: f64,
}

/// An accepted order, persisted append-only to `valid_orders`
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ValidOrder {
    pub order_id: i64,
    pub customer_name: String,
    pub order_date: DateTime<Utc>,
    pub total_amount: f64,
    pub is_high_value: bool,
}

impl From<IncomingOrder> for ValidOrder {
    fn from(order: IncomingOrder) -> Self {
        Self {
            order_id: order.order_id,
            customer_name: order.customer_name,
            order_date: order.order_date,
            // Strictly greater-than: exactly 1000 is not high value
            is_high_value: order.total_amount > 1000.0,
            total_amount: order.total_amount,
        }
    }
}

/// A rejected file, persisted append-only to `invalid_orders`
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct InvalidOrder {
    /// Verbatim file content; empty if the file could never be read
    pub raw_json: String,
    /// Short classification naming the violated rule
    pub reason: String,
}
