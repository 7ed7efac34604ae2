use chrono::{DateTime, Utc};
use sqlx::AnyPool;

use crate::errors::AppError;

// ============================================================================
// Schema
// ============================================================================
//
// Portable DDL understood by both PostgreSQL and SQLite. Ids are UUID v7
// strings, timestamps are epoch milliseconds.
//
// ============================================================================

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS customers (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        credit BIGINT NOT NULL CHECK (credit >= 0),
        created_at BIGINT NOT NULL,
        updated_at BIGINT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS orders (
        id TEXT PRIMARY KEY,
        customer_id TEXT NOT NULL REFERENCES customers(id),
        order_total BIGINT NOT NULL,
        created_at BIGINT NOT NULL,
        canceled_at BIGINT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_orders_customer_id ON orders (customer_id)",
];

/// Create tables and indexes if they do not exist yet
pub async fn migrate(pool: &AnyPool) -> Result<(), AppError> {
    for statement in SCHEMA.iter().copied() {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::debug!(statements = SCHEMA.len(), "Schema ready");
    Ok(())
}

/// Decode a stored epoch-millisecond timestamp
pub fn from_millis(millis: i64) -> Result<DateTime<Utc>, AppError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| AppError::data_integrity(format!("timestamp out of range: {millis}")))
}
