//! Domain records for tasks and conversations, plus the [`Store`]
//! wrapper that owns record construction on top of a [`Database`]
//! backend.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::Database;
use crate::error::DatabaseError;

/// Longest accepted task title after trimming.
pub const MAX_TITLE_LEN: usize = 200;
/// Longest accepted task description.
pub const MAX_DESCRIPTION_LEN: usize = 1000;
/// Longest accepted user identifier.
pub const MAX_USER_ID_LEN: usize = 255;

/// A single todo item. Every task belongs to exactly one user and is
/// never visible to any other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Completion filter for task listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl TaskFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskFilter::All => "all",
            TaskFilter::Pending => "pending",
            TaskFilter::Completed => "completed",
        }
    }
}

impl FromStr for TaskFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(TaskFilter::All),
            "pending" => Ok(TaskFilter::Pending),
            "completed" => Ok(TaskFilter::Completed),
            other => Err(ValidationError::UnknownFilter(other.to_string())),
        }
    }
}

/// Fields that may change on an existing task. `None` leaves the field
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

/// A chat thread owned by a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A conversation listing entry with its message count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub title: Option<String>,
    pub message_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Who authored a stored chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl FromStr for MessageRole {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(DatabaseError::Serialization(format!(
                "unknown message role: {other}"
            ))),
        }
    }
}

/// One persisted message within a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Input rejected before it reaches storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("title must be at most {MAX_TITLE_LEN} characters")]
    TitleTooLong,
    #[error("description must be at most {MAX_DESCRIPTION_LEN} characters")]
    DescriptionTooLong,
    #[error("user id must be between 1 and {MAX_USER_ID_LEN} characters")]
    InvalidUserId,
    #[error("unknown status filter: {0} (expected all, pending or completed)")]
    UnknownFilter(String),
}

/// Trim and bounds-check a task title.
pub fn validate_title(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(ValidationError::TitleTooLong);
    }
    Ok(trimmed.to_string())
}

/// Bounds-check an optional task description.
pub fn validate_description(raw: Option<&str>) -> Result<Option<String>, ValidationError> {
    match raw {
        None => Ok(None),
        Some(d) => {
            if d.chars().count() > MAX_DESCRIPTION_LEN {
                return Err(ValidationError::DescriptionTooLong);
            }
            Ok(Some(d.to_string()))
        }
    }
}

/// Bounds-check a user identifier.
pub fn validate_user_id(raw: &str) -> Result<&str, ValidationError> {
    if raw.is_empty() || raw.chars().count() > MAX_USER_ID_LEN {
        return Err(ValidationError::InvalidUserId);
    }
    Ok(raw)
}

/// Owns record construction (ids, timestamps) and delegates persistence
/// to the configured backend.
#[derive(Clone)]
pub struct Store {
    db: Arc<dyn Database>,
}

impl Store {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Arc<dyn Database> {
        &self.db
    }

    pub async fn create_task(
        &self,
        user_id: &str,
        title: String,
        description: Option<String>,
    ) -> Result<Task, DatabaseError> {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            title,
            description,
            completed: false,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_task(&task).await?;
        Ok(task)
    }

    pub async fn get_task(&self, id: Uuid, user_id: &str) -> Result<Option<Task>, DatabaseError> {
        self.db.get_task(id, user_id).await
    }

    pub async fn list_tasks(
        &self,
        user_id: &str,
        filter: TaskFilter,
    ) -> Result<Vec<Task>, DatabaseError> {
        self.db.list_tasks(user_id, filter).await
    }

    /// Apply a patch to a task the user owns. Returns `None` when no
    /// such task exists for this user.
    pub async fn update_task(
        &self,
        id: Uuid,
        user_id: &str,
        patch: TaskPatch,
    ) -> Result<Option<Task>, DatabaseError> {
        self.db.update_task(id, user_id, &patch, Utc::now()).await
    }

    pub async fn set_task_completed(
        &self,
        id: Uuid,
        user_id: &str,
        completed: bool,
    ) -> Result<Option<Task>, DatabaseError> {
        self.db
            .set_task_completed(id, user_id, completed, Utc::now())
            .await
    }

    /// Returns `true` when a task was actually deleted.
    pub async fn delete_task(&self, id: Uuid, user_id: &str) -> Result<bool, DatabaseError> {
        self.db.delete_task(id, user_id).await
    }

    pub async fn create_conversation(
        &self,
        user_id: &str,
        title: Option<String>,
    ) -> Result<Conversation, DatabaseError> {
        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            title,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_conversation(&conversation).await?;
        Ok(conversation)
    }

    pub async fn get_conversation(
        &self,
        id: Uuid,
        user_id: &str,
    ) -> Result<Option<Conversation>, DatabaseError> {
        self.db.get_conversation(id, user_id).await
    }

    pub async fn list_conversations(
        &self,
        user_id: &str,
    ) -> Result<Vec<Conversation>, DatabaseError> {
        self.db.list_conversations(user_id).await
    }

    pub async fn list_conversation_summaries(
        &self,
        user_id: &str,
    ) -> Result<Vec<ConversationSummary>, DatabaseError> {
        self.db.list_conversation_summaries(user_id).await
    }

    pub async fn delete_conversation(
        &self,
        id: Uuid,
        user_id: &str,
    ) -> Result<bool, DatabaseError> {
        self.db.delete_conversation(id, user_id).await
    }

    /// Append a message and bump the conversation's `updated_at`.
    pub async fn append_message(
        &self,
        conversation_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<MessageRecord, DatabaseError> {
        let message = MessageRecord {
            id: Uuid::new_v4(),
            conversation_id,
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.db.insert_message(&message).await?;
        Ok(message)
    }

    pub async fn list_messages(
        &self,
        conversation_id: Uuid,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, DatabaseError> {
        self.db.list_messages(conversation_id, limit).await
    }

    pub async fn list_messages_paginated(
        &self,
        conversation_id: Uuid,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<(Vec<MessageRecord>, bool), DatabaseError> {
        self.db
            .list_messages_paginated(conversation_id, before, limit)
            .await
    }
}

/// Derive a short conversation title from the first user message.
pub fn title_preview(content: &str) -> String {
    const PREVIEW_LEN: usize = 100;
    let trimmed = content.trim();
    if trimmed.chars().count() <= PREVIEW_LEN {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(PREVIEW_LEN).collect();
        format!("{}…", cut.trim_end())
    }
}
