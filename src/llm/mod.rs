//! LLM provider abstraction and the OpenAI-compatible transport.

pub mod openai_chat;
pub mod provider;

mod retry;

use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::LlmError;

pub use provider::{
    ChatMessage, FinishReason, LlmProvider, Role, ToolCall, ToolCompletionRequest,
    ToolCompletionResponse, ToolDef,
};

/// Build the configured provider.
pub fn create_llm_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let provider = openai_chat::OpenAiChatProvider::new(config.clone())?;
    Ok(Arc::new(provider))
}
