//! Tool registry: the set of tools offered to the model.

use std::collections::HashMap;
use std::sync::Arc;

use crate::llm::ToolDef;
use crate::tools::tool::{Tool, ToolSchema, validate_tool_schema};

/// Immutable-after-construction collection of tools, keyed by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, validating its parameter schema. A structurally
    /// broken schema or a duplicate name is a programming error, caught
    /// at startup rather than on first use.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), String> {
        let name = tool.name().to_string();
        let errors = validate_tool_schema(&tool.parameters_schema(), &name);
        if !errors.is_empty() {
            return Err(format!("invalid schema for tool '{name}': {errors:?}"));
        }
        if self.tools.contains_key(&name) {
            return Err(format!("duplicate tool name: '{name}'"));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn count(&self) -> usize {
        self.tools.len()
    }

    /// Tool names, sorted for stable logging.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    /// Provider-neutral definitions for the completion request.
    pub fn definitions(&self) -> Vec<ToolDef> {
        let mut defs: Vec<ToolDef> = self
            .tools
            .values()
            .map(|t| ToolDef {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;

    use crate::tools::tool::{ToolContext, ToolError, ToolOutput};

    struct DummyTool;

    #[async_trait]
    impl Tool for DummyTool {
        fn name(&self) -> &str {
            "dummy"
        }

        fn description(&self) -> &str {
            "Does nothing."
        }

        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            })
        }

        async fn execute(
            &self,
            _params: serde_json::Value,
            _ctx: &ToolContext,
        ) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::success(
                serde_json::json!(null),
                Duration::from_millis(1),
            ))
        }
    }

    struct BrokenSchemaTool;

    #[async_trait]
    impl Tool for BrokenSchemaTool {
        fn name(&self) -> &str {
            "broken"
        }

        fn description(&self) -> &str {
            "Schema is missing its type."
        }

        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({ "properties": {} })
        }

        async fn execute(
            &self,
            _params: serde_json::Value,
            _ctx: &ToolContext,
        ) -> Result<ToolOutput, ToolError> {
            unreachable!("never registered")
        }
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(DummyTool)).unwrap();
        assert_eq!(registry.count(), 1);
        assert!(registry.get("dummy").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(DummyTool)).unwrap();
        let err = registry.register(Arc::new(DummyTool)).unwrap_err();
        assert!(err.contains("duplicate"));
    }

    #[test]
    fn broken_schema_rejected() {
        let mut registry = ToolRegistry::new();
        let err = registry.register(Arc::new(BrokenSchemaTool)).unwrap_err();
        assert!(err.contains("invalid schema"));
    }
}
