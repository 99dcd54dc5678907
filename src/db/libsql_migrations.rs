//! Schema migrations for the libSQL backend.
//!
//! Statements are idempotent (`CREATE ... IF NOT EXISTS`) and run on
//! every startup, so a fresh file and an existing one take the same path.

use libsql::Connection;

use crate::error::DatabaseError;

const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS tasks (
        id          TEXT PRIMARY KEY,
        user_id     TEXT NOT NULL,
        title       TEXT NOT NULL,
        description TEXT,
        completed   INTEGER NOT NULL DEFAULT 0,
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_tasks_user_created
        ON tasks (user_id, created_at DESC)",
    "CREATE TABLE IF NOT EXISTS conversations (
        id         TEXT PRIMARY KEY,
        user_id    TEXT NOT NULL,
        title      TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_conversations_user_updated
        ON conversations (user_id, updated_at DESC)",
    "CREATE TABLE IF NOT EXISTS messages (
        id              TEXT PRIMARY KEY,
        conversation_id TEXT NOT NULL,
        role            TEXT NOT NULL,
        content         TEXT NOT NULL,
        created_at      TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_messages_conversation_created
        ON messages (conversation_id, created_at)",
];

/// Apply the schema to a connection.
pub(crate) async fn run(conn: &Connection) -> Result<(), DatabaseError> {
    // WAL keeps readers unblocked during writes. On :memory: databases
    // the pragma is a no-op, so the result is ignored either way.
    let _ = conn.query("PRAGMA journal_mode = WAL", ()).await;

    for statement in MIGRATIONS {
        conn.execute(statement, ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("{}: {}", statement_head(statement), e)))?;
    }
    Ok(())
}

/// First few words of a statement, for error context.
fn statement_head(statement: &str) -> String {
    statement.split_whitespace().take(6).collect::<Vec<_>>().join(" ")
}
