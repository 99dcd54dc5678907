//! The task tools the model can call.
//!
//! Every tool resolves rows through the authenticated user in
//! [`ToolContext`], so the model cannot name a different owner. Domain
//! outcomes (not found, rejected input) are reported in-band as
//! `{"status": "error", ...}` envelopes so the model can recover;
//! only malformed parameters and storage failures surface as errors.

use std::time::Instant;

use async_trait::async_trait;
use uuid::Uuid;

use crate::history::{
    Store, TaskFilter, TaskPatch, validate_description, validate_title,
};
use crate::tools::tool::{Tool, ToolContext, ToolError, ToolOutput, opt_str, require_str};

fn ok(data: serde_json::Value) -> serde_json::Value {
    serde_json::json!({ "status": "success", "data": data })
}

fn err(message: impl Into<String>) -> serde_json::Value {
    serde_json::json!({ "status": "error", "error": message.into() })
}

fn parse_task_id(raw: &str) -> Result<Uuid, serde_json::Value> {
    raw.parse()
        .map_err(|_| err(format!("invalid task id: {raw}")))
}

fn task_json(task: &crate::history::Task) -> serde_json::Value {
    serde_json::json!({
        "id": task.id,
        "title": task.title,
        "description": task.description,
        "completed": task.completed,
        "created_at": task.created_at,
        "updated_at": task.updated_at,
    })
}

/// Create a new task for the calling user.
pub struct AddTaskTool {
    store: Store,
}

impl AddTaskTool {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for AddTaskTool {
    fn name(&self) -> &str {
        "add_task"
    }

    fn description(&self) -> &str {
        "Add a new task to the user's todo list. Requires a title; an optional description adds detail."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": "Short title of the task (1-200 characters)"
                },
                "description": {
                    "type": "string",
                    "description": "Optional longer description (up to 1000 characters)"
                }
            },
            "required": ["title"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let started = Instant::now();
        let title = require_str(&params, "title")?;
        let description = opt_str(&params, "description")?;

        let title = match validate_title(title) {
            Ok(t) => t,
            Err(e) => return Ok(ToolOutput::success(err(e.to_string()), started.elapsed())),
        };
        let description = match validate_description(description) {
            Ok(d) => d,
            Err(e) => return Ok(ToolOutput::success(err(e.to_string()), started.elapsed())),
        };

        let task = self
            .store
            .create_task(&ctx.user_id, title, description)
            .await?;
        Ok(ToolOutput::success(ok(task_json(&task)), started.elapsed()))
    }
}

/// List the calling user's tasks, optionally filtered by status.
pub struct ListTasksTool {
    store: Store,
}

impl ListTasksTool {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListTasksTool {
    fn name(&self) -> &str {
        "list_tasks"
    }

    fn description(&self) -> &str {
        "List the user's tasks with their ids, titles and completion state. \
         Use this to find a task's id before completing, updating or deleting it."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "status": {
                    "type": "string",
                    "enum": ["all", "pending", "completed"],
                    "description": "Which tasks to include (default: all)"
                }
            },
            "required": []
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let started = Instant::now();
        let filter = match opt_str(&params, "status")? {
            Some(raw) => match raw.parse::<TaskFilter>() {
                Ok(f) => f,
                Err(e) => {
                    return Ok(ToolOutput::success(err(e.to_string()), started.elapsed()));
                }
            },
            None => TaskFilter::All,
        };

        let tasks = self.store.list_tasks(&ctx.user_id, filter).await?;
        let data = serde_json::json!({
            "tasks": tasks.iter().map(task_json).collect::<Vec<_>>(),
            "count": tasks.len(),
        });
        Ok(ToolOutput::success(ok(data), started.elapsed()))
    }
}

/// Mark a task done.
pub struct CompleteTaskTool {
    store: Store,
}

impl CompleteTaskTool {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CompleteTaskTool {
    fn name(&self) -> &str {
        "complete_task"
    }

    fn description(&self) -> &str {
        "Mark one of the user's tasks as completed, identified by its id."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": "string",
                    "description": "Id of the task to complete"
                }
            },
            "required": ["task_id"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let started = Instant::now();
        let raw = require_str(&params, "task_id")?;
        let id = match parse_task_id(raw) {
            Ok(id) => id,
            Err(envelope) => return Ok(ToolOutput::success(envelope, started.elapsed())),
        };

        match self.store.set_task_completed(id, &ctx.user_id, true).await? {
            Some(task) => Ok(ToolOutput::success(ok(task_json(&task)), started.elapsed())),
            None => Ok(ToolOutput::success(
                err(format!("task not found: {id}")),
                started.elapsed(),
            )),
        }
    }
}

/// Change a task's title or description.
pub struct UpdateTaskTool {
    store: Store,
}

impl UpdateTaskTool {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdateTaskTool {
    fn name(&self) -> &str {
        "update_task"
    }

    fn description(&self) -> &str {
        "Update a task's title and/or description, identified by its id. \
         Only the provided fields change."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": "string",
                    "description": "Id of the task to update"
                },
                "title": {
                    "type": "string",
                    "description": "New title (1-200 characters)"
                },
                "description": {
                    "type": "string",
                    "description": "New description (up to 1000 characters)"
                }
            },
            "required": ["task_id"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let started = Instant::now();
        let raw = require_str(&params, "task_id")?;
        let id = match parse_task_id(raw) {
            Ok(id) => id,
            Err(envelope) => return Ok(ToolOutput::success(envelope, started.elapsed())),
        };

        let title = match opt_str(&params, "title")? {
            Some(t) => match validate_title(t) {
                Ok(t) => Some(t),
                Err(e) => {
                    return Ok(ToolOutput::success(err(e.to_string()), started.elapsed()));
                }
            },
            None => None,
        };
        let description = match validate_description(opt_str(&params, "description")?) {
            Ok(d) => d,
            Err(e) => return Ok(ToolOutput::success(err(e.to_string()), started.elapsed())),
        };

        let patch = TaskPatch { title, description };
        if patch.is_empty() {
            return Ok(ToolOutput::success(
                err("nothing to update: provide a title or description"),
                started.elapsed(),
            ));
        }

        match self.store.update_task(id, &ctx.user_id, patch).await? {
            Some(task) => Ok(ToolOutput::success(ok(task_json(&task)), started.elapsed())),
            None => Ok(ToolOutput::success(
                err(format!("task not found: {id}")),
                started.elapsed(),
            )),
        }
    }
}

/// Remove a task permanently.
pub struct DeleteTaskTool {
    store: Store,
}

impl DeleteTaskTool {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DeleteTaskTool {
    fn name(&self) -> &str {
        "delete_task"
    }

    fn description(&self) -> &str {
        "Delete one of the user's tasks permanently, identified by its id."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": "string",
                    "description": "Id of the task to delete"
                }
            },
            "required": ["task_id"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let started = Instant::now();
        let raw = require_str(&params, "task_id")?;
        let id = match parse_task_id(raw) {
            Ok(id) => id,
            Err(envelope) => return Ok(ToolOutput::success(envelope, started.elapsed())),
        };

        if self.store.delete_task(id, &ctx.user_id).await? {
            let data = serde_json::json!({ "deleted": true, "task_id": id });
            Ok(ToolOutput::success(ok(data), started.elapsed()))
        } else {
            Ok(ToolOutput::success(
                err(format!("task not found: {id}")),
                started.elapsed(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::db::connect_from_config;
    use crate::config::DatabaseConfig;

    async fn memory_store() -> Store {
        let db = connect_from_config(&DatabaseConfig {
            path: ":memory:".to_string(),
        })
        .await
        .unwrap();
        Store::new(db)
    }

    fn ctx(user: &str) -> ToolContext {
        ToolContext::new(user)
    }

    #[tokio::test]
    async fn add_then_list() {
        let store = memory_store().await;
        let add = AddTaskTool::new(store.clone());
        let list = ListTasksTool::new(store);

        let out = add
            .execute(
                serde_json::json!({"title": "  buy milk ", "description": "2 liters"}),
                &ctx("alice"),
            )
            .await
            .unwrap();
        assert_eq!(out.result["status"], "success");
        assert_eq!(out.result["data"]["title"], "buy milk");

        let out = list
            .execute(serde_json::json!({}), &ctx("alice"))
            .await
            .unwrap();
        assert_eq!(out.result["data"]["count"], 1);
    }

    #[tokio::test]
    async fn list_respects_status_filter() {
        let store = memory_store().await;
        let add = AddTaskTool::new(store.clone());
        let complete = CompleteTaskTool::new(store.clone());
        let list = ListTasksTool::new(store);

        let out = add
            .execute(serde_json::json!({"title": "a"}), &ctx("alice"))
            .await
            .unwrap();
        let id = out.result["data"]["id"].as_str().unwrap().to_string();
        add.execute(serde_json::json!({"title": "b"}), &ctx("alice"))
            .await
            .unwrap();

        complete
            .execute(serde_json::json!({"task_id": id}), &ctx("alice"))
            .await
            .unwrap();

        let out = list
            .execute(serde_json::json!({"status": "pending"}), &ctx("alice"))
            .await
            .unwrap();
        assert_eq!(out.result["data"]["count"], 1);
        assert_eq!(out.result["data"]["tasks"][0]["title"], "b");

        let out = list
            .execute(serde_json::json!({"status": "nonsense"}), &ctx("alice"))
            .await
            .unwrap();
        assert_eq!(out.result["status"], "error");
    }

    #[tokio::test]
    async fn tools_never_cross_users() {
        let store = memory_store().await;
        let add = AddTaskTool::new(store.clone());
        let complete = CompleteTaskTool::new(store.clone());
        let delete = DeleteTaskTool::new(store.clone());
        let list = ListTasksTool::new(store);

        let out = add
            .execute(serde_json::json!({"title": "alice's task"}), &ctx("alice"))
            .await
            .unwrap();
        let id = out.result["data"]["id"].as_str().unwrap().to_string();

        // Bob sees nothing and cannot touch Alice's task even with its id.
        let out = list
            .execute(serde_json::json!({}), &ctx("bob"))
            .await
            .unwrap();
        assert_eq!(out.result["data"]["count"], 0);

        let out = complete
            .execute(serde_json::json!({"task_id": id}), &ctx("bob"))
            .await
            .unwrap();
        assert_eq!(out.result["status"], "error");

        let out = delete
            .execute(serde_json::json!({"task_id": id}), &ctx("bob"))
            .await
            .unwrap();
        assert_eq!(out.result["status"], "error");
    }

    #[tokio::test]
    async fn update_changes_only_given_fields() {
        let store = memory_store().await;
        let add = AddTaskTool::new(store.clone());
        let update = UpdateTaskTool::new(store);

        let out = add
            .execute(
                serde_json::json!({"title": "orig", "description": "keep me"}),
                &ctx("alice"),
            )
            .await
            .unwrap();
        let id = out.result["data"]["id"].as_str().unwrap().to_string();

        let out = update
            .execute(
                serde_json::json!({"task_id": id, "title": "renamed"}),
                &ctx("alice"),
            )
            .await
            .unwrap();
        assert_eq!(out.result["data"]["title"], "renamed");
        assert_eq!(out.result["data"]["description"], "keep me");

        let out = update
            .execute(serde_json::json!({"task_id": id}), &ctx("alice"))
            .await
            .unwrap();
        assert_eq!(out.result["status"], "error");
    }

    #[tokio::test]
    async fn invalid_and_oversized_input_rejected_in_band() {
        let store = memory_store().await;
        let add = AddTaskTool::new(store.clone());
        let complete = CompleteTaskTool::new(store);

        let out = add
            .execute(serde_json::json!({"title": "   "}), &ctx("alice"))
            .await
            .unwrap();
        assert_eq!(out.result["status"], "error");

        let long = "x".repeat(201);
        let out = add
            .execute(serde_json::json!({"title": long}), &ctx("alice"))
            .await
            .unwrap();
        assert_eq!(out.result["status"], "error");

        let out = complete
            .execute(serde_json::json!({"task_id": "not-a-uuid"}), &ctx("alice"))
            .await
            .unwrap();
        assert_eq!(out.result["status"], "error");
        assert!(
            out.result["error"]
                .as_str()
                .unwrap()
                .contains("invalid task id")
        );
    }

    #[tokio::test]
    async fn missing_required_param_is_a_tool_error() {
        let store = memory_store().await;
        let add = AddTaskTool::new(store);
        let err = add
            .execute(serde_json::json!({}), &ctx("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameters(_)));
    }

    #[tokio::test]
    async fn all_schemas_validate() {
        use crate::tools::tool::validate_tool_schema;

        let store = memory_store().await;
        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(AddTaskTool::new(store.clone())),
            Arc::new(ListTasksTool::new(store.clone())),
            Arc::new(CompleteTaskTool::new(store.clone())),
            Arc::new(UpdateTaskTool::new(store.clone())),
            Arc::new(DeleteTaskTool::new(store)),
        ];
        for tool in tools {
            let errors = validate_tool_schema(&tool.parameters_schema(), tool.name());
            assert!(errors.is_empty(), "{}: {errors:?}", tool.name());
        }
    }
}
