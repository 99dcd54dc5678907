//! Conversation-related ConversationStore implementation for LibSqlBackend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::params;
use uuid::Uuid;

use super::{LibSqlBackend, fmt_ts, get_opt_text, get_text, get_ts, get_uuid, opt_text};
use crate::db::ConversationStore;
use crate::error::DatabaseError;
use crate::history::{Conversation, ConversationSummary, MessageRecord};

fn row_to_conversation(row: &libsql::Row) -> Result<Conversation, DatabaseError> {
    Ok(Conversation {
        id: get_uuid(row, 0)?,
        user_id: get_text(row, 1),
        title: get_opt_text(row, 2),
        created_at: get_ts(row, 3),
        updated_at: get_ts(row, 4),
    })
}

#[async_trait]
impl ConversationStore for LibSqlBackend {
    async fn insert_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<(), DatabaseError> {
        let conn = self.connect().await?;
        conn.execute(
            "INSERT INTO conversations (id, user_id, title, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                conversation.id.to_string(),
                conversation.user_id.as_str(),
                opt_text(conversation.title.as_deref()),
                fmt_ts(&conversation.created_at),
                fmt_ts(&conversation.updated_at),
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(e.to_string()))?;
        Ok(())
    }

    async fn get_conversation(
        &self,
        id: Uuid,
        user_id: &str,
    ) -> Result<Option<Conversation>, DatabaseError> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query(
                "SELECT id, user_id, title, created_at, updated_at
                 FROM conversations WHERE id = ?1 AND user_id = ?2",
                params![id.to_string(), user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            Some(row) => Ok(Some(row_to_conversation(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>, DatabaseError> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query(
                "SELECT id, user_id, title, created_at, updated_at
                 FROM conversations WHERE user_id = ?1
                 ORDER BY updated_at DESC",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

        let mut conversations = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            conversations.push(row_to_conversation(&row)?);
        }
        Ok(conversations)
    }

    async fn list_conversation_summaries(
        &self,
        user_id: &str,
    ) -> Result<Vec<ConversationSummary>, DatabaseError> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query(
                r#"
                SELECT
                    c.id,
                    c.title,
                    (SELECT COUNT(*) FROM messages m WHERE m.conversation_id = c.id) AS message_count,
                    c.created_at,
                    c.updated_at
                FROM conversations c
                WHERE c.user_id = ?1
                ORDER BY c.updated_at DESC
                "#,
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

        let mut summaries = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            summaries.push(ConversationSummary {
                id: get_uuid(&row, 0)?,
                title: get_opt_text(&row, 1),
                message_count: row.get::<i64>(2).unwrap_or(0),
                created_at: get_ts(&row, 3),
                updated_at: get_ts(&row, 4),
            });
        }
        Ok(summaries)
    }

    async fn delete_conversation(&self, id: Uuid, user_id: &str) -> Result<bool, DatabaseError> {
        let conn = self.connect().await?;
        let affected = conn
            .execute(
                "DELETE FROM conversations WHERE id = ?1 AND user_id = ?2",
                params![id.to_string(), user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;
        if affected == 0 {
            return Ok(false);
        }
        // Messages are removed explicitly since the schema does not rely
        // on foreign key enforcement being enabled per connection.
        conn.execute(
            "DELETE FROM messages WHERE conversation_id = ?1",
            params![id.to_string()],
        )
        .await
        .map_err(|e| DatabaseError::Query(e.to_string()))?;
        Ok(true)
    }

    async fn insert_message(&self, message: &MessageRecord) -> Result<(), DatabaseError> {
        let conn = self.connect().await?;
        conn.execute(
            "INSERT INTO messages (id, conversation_id, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.id.to_string(),
                message.conversation_id.to_string(),
                message.role.as_str(),
                message.content.as_str(),
                fmt_ts(&message.created_at),
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(e.to_string()))?;

        conn.execute(
            "UPDATE conversations SET updated_at = ?2 WHERE id = ?1",
            params![message.conversation_id.to_string(), fmt_ts(&Utc::now())],
        )
        .await
        .map_err(|e| DatabaseError::Query(e.to_string()))?;
        Ok(())
    }

    async fn list_messages(
        &self,
        conversation_id: Uuid,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, DatabaseError> {
        let conn = self.connect().await?;
        // Take the newest `limit` rows, then flip to chronological order.
        let mut rows = conn
            .query(
                "SELECT id, conversation_id, role, content, created_at
                 FROM messages WHERE conversation_id = ?1
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2",
                params![conversation_id.to_string(), limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

        let mut messages = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            messages.push(MessageRecord {
                id: get_uuid(&row, 0)?,
                conversation_id: get_uuid(&row, 1)?,
                role: get_text(&row, 2).parse()?,
                content: get_text(&row, 3),
                created_at: get_ts(&row, 4),
            });
        }
        messages.reverse();
        Ok(messages)
    }

    async fn list_messages_paginated(
        &self,
        conversation_id: Uuid,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<(Vec<MessageRecord>, bool), DatabaseError> {
        let conn = self.connect().await?;
        // One extra row tells us whether another page exists.
        let fetch_limit = limit + 1;
        let cid = conversation_id.to_string();

        let mut rows = if let Some(before_ts) = before {
            conn.query(
                "SELECT id, conversation_id, role, content, created_at
                 FROM messages
                 WHERE conversation_id = ?1 AND created_at < ?2
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?3",
                params![cid, fmt_ts(&before_ts), fetch_limit],
            )
            .await
        } else {
            conn.query(
                "SELECT id, conversation_id, role, content, created_at
                 FROM messages
                 WHERE conversation_id = ?1
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2",
                params![cid, fetch_limit],
            )
            .await
        }
        .map_err(|e| DatabaseError::Query(e.to_string()))?;

        let mut all = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            all.push(MessageRecord {
                id: get_uuid(&row, 0)?,
                conversation_id: get_uuid(&row, 1)?,
                role: get_text(&row, 2).parse()?,
                content: get_text(&row, 3),
                created_at: get_ts(&row, 4),
            });
        }

        let has_more = all.len() as i64 > limit;
        all.truncate(limit as usize);
        all.reverse(); // oldest first
        Ok((all, has_more))
    }
}
