use crate::error::ConfigError;

use super::helpers::optional_env;

/// Database settings. The service runs on an embedded libSQL file by
/// default; `:memory:` is accepted for ephemeral runs.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the libSQL database file, or `:memory:`.
    pub path: String,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = optional_env("DATABASE_PATH")?.unwrap_or_else(|| "taskpilot.db".to_string());
        Ok(Self { path })
    }

    pub fn is_memory(&self) -> bool {
        self.path == ":memory:"
    }
}
