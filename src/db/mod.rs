//! Database abstraction layer.
//!
//! Provides a backend-agnostic [`Database`] trait that unifies all
//! persistence operations. The embedded libSQL backend is the only
//! implementation; `Store` stays a thin wrapper over `Arc<dyn Database>`
//! so another backend can slot in behind the same trait.

pub mod libsql_backend;
pub mod libsql_migrations;

mod libsql;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::error::DatabaseError;
use crate::history::{
    Conversation, ConversationSummary, MessageRecord, Task, TaskFilter, TaskPatch,
};

/// Create the configured backend, run migrations, and return it.
pub async fn connect_from_config(
    config: &DatabaseConfig,
) -> Result<Arc<dyn Database>, DatabaseError> {
    let backend = if config.is_memory() {
        libsql_backend::LibSqlBackend::new_memory().await?
    } else {
        libsql_backend::LibSqlBackend::new_local(std::path::Path::new(&config.path)).await?
    };
    backend.run_migrations().await?;
    Ok(Arc::new(backend))
}

/// Task persistence. Every operation takes the owning `user_id` and
/// must never return or touch another user's rows.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a fully constructed task.
    async fn insert_task(&self, task: &Task) -> Result<(), DatabaseError>;

    /// Fetch a task owned by `user_id`.
    async fn get_task(&self, id: Uuid, user_id: &str) -> Result<Option<Task>, DatabaseError>;

    /// List tasks for a user, newest first.
    async fn list_tasks(
        &self,
        user_id: &str,
        filter: TaskFilter,
    ) -> Result<Vec<Task>, DatabaseError>;

    /// Apply a patch. Returns the updated task, or `None` when the user
    /// owns no task with this id.
    async fn update_task(
        &self,
        id: Uuid,
        user_id: &str,
        patch: &TaskPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Task>, DatabaseError>;

    /// Flip the completion flag. Same ownership semantics as `update_task`.
    async fn set_task_completed(
        &self,
        id: Uuid,
        user_id: &str,
        completed: bool,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Task>, DatabaseError>;

    /// Delete a task owned by `user_id`. Returns `true` when a row went away.
    async fn delete_task(&self, id: Uuid, user_id: &str) -> Result<bool, DatabaseError>;
}

/// Conversation and message persistence.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn insert_conversation(&self, conversation: &Conversation)
    -> Result<(), DatabaseError>;

    async fn get_conversation(
        &self,
        id: Uuid,
        user_id: &str,
    ) -> Result<Option<Conversation>, DatabaseError>;

    /// List a user's conversations, most recently active first.
    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>, DatabaseError>;

    /// List conversations with their message counts, most recently
    /// active first.
    async fn list_conversation_summaries(
        &self,
        user_id: &str,
    ) -> Result<Vec<ConversationSummary>, DatabaseError>;

    /// Delete a conversation and its messages. Returns `true` when a
    /// row went away.
    async fn delete_conversation(&self, id: Uuid, user_id: &str) -> Result<bool, DatabaseError>;

    /// Insert a message and bump the conversation's `updated_at`.
    async fn insert_message(&self, message: &MessageRecord) -> Result<(), DatabaseError>;

    /// Load the most recent `limit` messages, returned oldest first.
    async fn list_messages(
        &self,
        conversation_id: Uuid,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, DatabaseError>;

    /// Cursor-based page of messages strictly older than `before`,
    /// oldest first, plus whether more remain.
    async fn list_messages_paginated(
        &self,
        conversation_id: Uuid,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<(Vec<MessageRecord>, bool), DatabaseError>;
}

/// Backend-agnostic database trait.
#[async_trait]
pub trait Database: TaskStore + ConversationStore {
    /// Run schema migrations for this backend.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    /// Cheap connectivity probe for the health endpoint.
    async fn health_check(&self) -> Result<(), DatabaseError>;
}
