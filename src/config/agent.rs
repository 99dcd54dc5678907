use crate::error::ConfigError;

use super::helpers::parse_optional_env;

/// Tuning knobs for the tool-calling loop.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Upper bound on tool-call rounds in a single chat turn.
    pub max_tool_iterations: usize,
    /// How many prior messages of a conversation are replayed as context.
    pub history_limit: usize,
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            max_tool_iterations: parse_optional_env("AGENT_MAX_TOOL_ITERATIONS", 8)?,
            history_limit: parse_optional_env("AGENT_HISTORY_LIMIT", 50)?,
        })
    }
}
