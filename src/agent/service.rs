//! Chat orchestration over conversations, the model, and the tools.

use std::sync::Arc;

use uuid::Uuid;

use crate::agent::dispatcher::{Dispatcher, ToolCallRecord};
use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::history::{MessageRole, Store, title_preview};
use crate::llm::{ChatMessage, LlmProvider};
use crate::tools::{ToolContext, ToolRegistry};

const SYSTEM_PROMPT: &str = "\
You are a helpful todo-list assistant. You manage the user's tasks \
through the provided tools: add_task, list_tasks, complete_task, \
update_task and delete_task.

Guidelines:
- When the user refers to a task by its title, call list_tasks first to \
resolve the matching task id before completing, updating or deleting it.
- Never invent task ids. If no task matches, say so.
- Confirm what you did in plain language after a change.
- Ask for clarification when a request is ambiguous (for example, when \
several tasks match).";

/// One finished chat turn.
#[derive(Debug)]
pub struct AgentReply {
    pub conversation_id: Uuid,
    pub content: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub model: String,
}

/// Ties a chat turn together: conversation lookup, history replay,
/// the tool-calling loop, and persistence of both sides of the exchange.
#[derive(Clone)]
pub struct ChatService {
    store: Store,
    dispatcher: Arc<Dispatcher>,
    model: String,
    history_limit: usize,
}

impl ChatService {
    pub fn new(
        store: Store,
        llm: Arc<dyn LlmProvider>,
        registry: Arc<ToolRegistry>,
        config: &AgentConfig,
    ) -> Self {
        let model = llm.model_name().to_string();
        let dispatcher = Arc::new(Dispatcher::new(llm, registry, config.max_tool_iterations));
        Self {
            store,
            dispatcher,
            model,
            history_limit: config.history_limit,
        }
    }

    /// Handle one user message.
    ///
    /// With a `conversation_id` the turn continues that thread (it must
    /// belong to the user); without one a new conversation is created,
    /// titled after the message. The user message is persisted before
    /// the model runs, so a failed completion still leaves the question
    /// in the thread.
    pub async fn send_message(
        &self,
        user_id: &str,
        conversation_id: Option<Uuid>,
        message: &str,
    ) -> Result<AgentReply, AgentError> {
        let conversation = match conversation_id {
            Some(id) => self
                .store
                .get_conversation(id, user_id)
                .await?
                .ok_or(AgentError::ConversationNotFound(id))?,
            None => {
                self.store
                    .create_conversation(user_id, Some(title_preview(message)))
                    .await?
            }
        };

        let history = self
            .store
            .list_messages(conversation.id, self.history_limit)
            .await?;

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(SYSTEM_PROMPT));
        for record in &history {
            messages.push(match record.role {
                MessageRole::User => ChatMessage::user(record.content.clone()),
                MessageRole::Assistant => ChatMessage::assistant(record.content.clone()),
            });
        }
        messages.push(ChatMessage::user(message));

        self.store
            .append_message(conversation.id, MessageRole::User, message)
            .await?;

        let ctx = ToolContext::new(user_id);
        let outcome = self.dispatcher.run(messages, &ctx).await?;

        tracing::info!(
            conversation_id = %conversation.id,
            tool_calls = outcome.tool_calls.len(),
            input_tokens = outcome.input_tokens,
            output_tokens = outcome.output_tokens,
            "Chat turn finished"
        );

        self.store
            .append_message(conversation.id, MessageRole::Assistant, &outcome.content)
            .await?;

        Ok(AgentReply {
            conversation_id: conversation.id,
            content: outcome.content,
            tool_calls: outcome.tool_calls,
            model: self.model.clone(),
        })
    }
}
