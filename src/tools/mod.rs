//! Tools the agent can call, and the registry that holds them.

pub mod registry;
pub mod task_tools;
pub mod tool;

use std::sync::Arc;

use crate::history::Store;

pub use registry::ToolRegistry;
pub use tool::{Tool, ToolContext, ToolError, ToolOutput, ToolSchema};

/// Build the registry with the standard task tools.
pub fn build_registry(store: &Store) -> Result<ToolRegistry, String> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(task_tools::AddTaskTool::new(store.clone())))?;
    registry.register(Arc::new(task_tools::ListTasksTool::new(store.clone())))?;
    registry.register(Arc::new(task_tools::CompleteTaskTool::new(store.clone())))?;
    registry.register(Arc::new(task_tools::UpdateTaskTool::new(store.clone())))?;
    registry.register(Arc::new(task_tools::DeleteTaskTool::new(store.clone())))?;
    Ok(registry)
}
