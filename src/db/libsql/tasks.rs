//! Task-related TaskStore implementation for LibSqlBackend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::params;
use uuid::Uuid;

use super::{LibSqlBackend, fmt_ts, get_bool, get_opt_text, get_text, get_ts, get_uuid, opt_text};
use crate::db::TaskStore;
use crate::error::DatabaseError;
use crate::history::{Task, TaskFilter, TaskPatch};

const TASK_COLUMNS: &str = "id, user_id, title, description, completed, created_at, updated_at";

fn row_to_task(row: &libsql::Row) -> Result<Task, DatabaseError> {
    Ok(Task {
        id: get_uuid(row, 0)?,
        user_id: get_text(row, 1),
        title: get_text(row, 2),
        description: get_opt_text(row, 3),
        completed: get_bool(row, 4),
        created_at: get_ts(row, 5),
        updated_at: get_ts(row, 6),
    })
}

#[async_trait]
impl TaskStore for LibSqlBackend {
    async fn insert_task(&self, task: &Task) -> Result<(), DatabaseError> {
        let conn = self.connect().await?;
        conn.execute(
            "INSERT INTO tasks (id, user_id, title, description, completed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                task.id.to_string(),
                task.user_id.as_str(),
                task.title.as_str(),
                opt_text(task.description.as_deref()),
                task.completed as i64,
                fmt_ts(&task.created_at),
                fmt_ts(&task.updated_at),
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(e.to_string()))?;
        Ok(())
    }

    async fn get_task(&self, id: Uuid, user_id: &str) -> Result<Option<Task>, DatabaseError> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND user_id = ?2"),
                params![id.to_string(), user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            Some(row) => Ok(Some(row_to_task(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_tasks(
        &self,
        user_id: &str,
        filter: TaskFilter,
    ) -> Result<Vec<Task>, DatabaseError> {
        let conn = self.connect().await?;
        let completed_clause = match filter {
            TaskFilter::All => "",
            TaskFilter::Pending => " AND completed = 0",
            TaskFilter::Completed => " AND completed = 1",
        };
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {TASK_COLUMNS} FROM tasks
                     WHERE user_id = ?1{completed_clause}
                     ORDER BY created_at DESC"
                ),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

        let mut tasks = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?
        {
            tasks.push(row_to_task(&row)?);
        }
        Ok(tasks)
    }

    async fn update_task(
        &self,
        id: Uuid,
        user_id: &str,
        patch: &TaskPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Task>, DatabaseError> {
        let conn = self.connect().await?;
        // COALESCE keeps the stored value for fields the patch omits.
        let affected = conn
            .execute(
                "UPDATE tasks
                 SET title = COALESCE(?3, title),
                     description = COALESCE(?4, description),
                     updated_at = ?5
                 WHERE id = ?1 AND user_id = ?2",
                params![
                    id.to_string(),
                    user_id,
                    opt_text(patch.title.as_deref()),
                    opt_text(patch.description.as_deref()),
                    fmt_ts(&updated_at),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

        if affected == 0 {
            return Ok(None);
        }
        self.get_task(id, user_id).await
    }

    async fn set_task_completed(
        &self,
        id: Uuid,
        user_id: &str,
        completed: bool,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Task>, DatabaseError> {
        let conn = self.connect().await?;
        let affected = conn
            .execute(
                "UPDATE tasks SET completed = ?3, updated_at = ?4
                 WHERE id = ?1 AND user_id = ?2",
                params![
                    id.to_string(),
                    user_id,
                    completed as i64,
                    fmt_ts(&updated_at),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

        if affected == 0 {
            return Ok(None);
        }
        self.get_task(id, user_id).await
    }

    async fn delete_task(&self, id: Uuid, user_id: &str) -> Result<bool, DatabaseError> {
        let conn = self.connect().await?;
        let affected = conn
            .execute(
                "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
                params![id.to_string(), user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;
        Ok(affected > 0)
    }
}
