//! Configuration loaded from environment variables, with `.env` support
//! handled by the binary entry point.

mod agent;
mod database;
mod helpers;
mod http;
mod llm;

pub use agent::AgentConfig;
pub use database::DatabaseConfig;
pub use http::{AuthConfig, HttpConfig, RateLimitConfig};
pub use llm::LlmConfig;

use crate::error::ConfigError;

/// Fully resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub llm: LlmConfig,
    pub agent: AgentConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database: DatabaseConfig::from_env()?,
            http: HttpConfig::from_env()?,
            auth: AuthConfig::from_env()?,
            rate_limit: RateLimitConfig::from_env()?,
            llm: LlmConfig::from_env()?,
            agent: AgentConfig::from_env()?,
        })
    }
}
