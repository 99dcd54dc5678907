//! libSQL backend for the Database trait.
//!
//! Embedded SQLite-compatible storage with two modes: a local file for
//! normal runs and in-memory for tests.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase};
use uuid::Uuid;

use crate::db::{Database, libsql_migrations};
use crate::error::DatabaseError;

/// libSQL database backend.
///
/// Stores the `Database` handle in an `Arc` and opens a fresh connection
/// per operation, which is cheap for the embedded engine.
pub struct LibSqlBackend {
    db: Arc<LibSqlDatabase>,
}

impl LibSqlBackend {
    /// Create a new local embedded database.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Connection(format!("Failed to create database directory: {}", e))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Connection(format!("Failed to open libSQL database: {}", e))
            })?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Create a new in-memory database (for testing).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Connection(format!("Failed to create in-memory database: {}", e))
            })?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Create a new connection to the database.
    ///
    /// Sets `PRAGMA busy_timeout = 5000` on every connection so concurrent
    /// writers wait up to 5 seconds instead of failing instantly with
    /// "database is locked".
    pub(crate) async fn connect(&self) -> Result<Connection, DatabaseError> {
        let conn = self.db.connect().map_err(|e| {
            DatabaseError::Connection(format!("Failed to create connection: {}", e))
        })?;
        conn.query("PRAGMA busy_timeout = 5000", ())
            .await
            .map_err(|e| DatabaseError::Connection(format!("Failed to set busy_timeout: {}", e)))?;
        Ok(conn)
    }
}

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        let conn = self.connect().await?;
        libsql_migrations::run(&conn).await
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        let conn = self.connect().await?;
        conn.query("SELECT 1", ())
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;
        Ok(())
    }
}

// ==================== Helper functions ====================

/// Parse an ISO-8601 timestamp string from SQLite into DateTime<Utc>.
///
/// Accepts RFC 3339 (the canonical write format) plus the naive
/// `datetime()` output forms SQLite itself produces.
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(ndt.and_utc());
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(ndt.and_utc());
    }
    Err(format!("unparseable timestamp: {:?}", s))
}

/// Format a DateTime<Utc> for SQLite storage (RFC 3339 with millisecond precision).
pub(crate) fn fmt_ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Extract a text column from a libsql Row, returning empty string for NULL.
pub(crate) fn get_text(row: &libsql::Row, idx: i32) -> String {
    row.get::<String>(idx).unwrap_or_default()
}

/// Extract an optional text column.
/// Returns None for SQL NULL, preserves empty strings as Some("").
pub(crate) fn get_opt_text(row: &libsql::Row, idx: i32) -> Option<String> {
    row.get::<String>(idx).ok()
}

/// Convert an `Option<&str>` to a `libsql::Value` (Text or Null).
/// Use this instead of `.unwrap_or("")` to preserve NULL semantics.
pub(crate) fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Extract a bool from an integer column, defaulting to false.
pub(crate) fn get_bool(row: &libsql::Row, idx: i32) -> bool {
    row.get::<i64>(idx).unwrap_or(0) != 0
}

/// Parse a UUID from a text column.
pub(crate) fn get_uuid(row: &libsql::Row, idx: i32) -> Result<Uuid, DatabaseError> {
    let raw = get_text(row, idx);
    raw.parse()
        .map_err(|_| DatabaseError::Serialization(format!("invalid UUID in column {idx}: {raw}")))
}

/// Parse a timestamp from a text column.
///
/// If the column is NULL or the value cannot be parsed, logs a warning and
/// returns the Unix epoch so the error is detectable rather than silently
/// replaced by the current time.
pub(crate) fn get_ts(row: &libsql::Row, idx: i32) -> DateTime<Utc> {
    match row.get::<String>(idx) {
        Ok(s) => match parse_timestamp(&s) {
            Ok(dt) => dt,
            Err(e) => {
                tracing::warn!("Timestamp parse failure at column {}: {}", idx, e);
                DateTime::UNIX_EPOCH
            }
        },
        Err(_) => {
            tracing::warn!("NULL timestamp at column {}", idx);
            DateTime::UNIX_EPOCH
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_timestamp_rfc3339() {
        let dt = parse_timestamp("2024-01-15T10:30:00.123Z").unwrap();
        assert_eq!(fmt_ts(&dt), "2024-01-15T10:30:00.123Z");
    }

    #[test]
    fn parse_timestamp_naive_forms() {
        assert!(parse_timestamp("2024-01-15 10:30:00.123").is_ok());
        assert!(parse_timestamp("2024-01-15 10:30:00").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }
}
