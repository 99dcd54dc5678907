//! Error types for all taskpilot components.

use thiserror::Error;

/// Top-level error unifying the per-domain errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Agent(#[from] AgentError),
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key} ({hint})")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// LLM provider errors.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request failed ({provider}): {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("LLM authentication failed ({provider})")]
    AuthFailed { provider: String },

    #[error("Rate limited by {provider}")]
    RateLimited {
        provider: String,
        retry_after: Option<std::time::Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Chat agent errors.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Conversation {0} not found")]
    ConversationNotFound(uuid::Uuid),

    #[error("Exceeded maximum tool iterations ({0})")]
    TooManyIterations(usize),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}
