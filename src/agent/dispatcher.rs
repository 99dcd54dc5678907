//! The tool-calling loop.
//!
//! Sends the conversation to the model, executes any tool calls it
//! requests, feeds results back, and repeats until the model answers in
//! text or the iteration limit forces it to.

use std::sync::Arc;

use crate::error::AgentError;
use crate::llm::{ChatMessage, LlmProvider, ToolCompletionRequest};
use crate::tools::{ToolContext, ToolRegistry};

/// One executed tool call, kept for the API response.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub arguments: serde_json::Value,
    pub result: serde_json::Value,
}

/// Final result of a chat turn.
#[derive(Debug)]
pub struct AgentOutcome {
    pub content: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

pub struct Dispatcher {
    llm: Arc<dyn LlmProvider>,
    registry: Arc<ToolRegistry>,
    max_tool_iterations: usize,
}

impl Dispatcher {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        registry: Arc<ToolRegistry>,
        max_tool_iterations: usize,
    ) -> Self {
        Self {
            llm,
            registry,
            max_tool_iterations,
        }
    }

    /// Run the loop until the model produces a text answer.
    ///
    /// The penultimate iteration injects a system nudge telling the
    /// model to wrap up; the final iteration drops the tools entirely so
    /// a text response is guaranteed instead of a hard error.
    pub async fn run(
        &self,
        mut messages: Vec<ChatMessage>,
        ctx: &ToolContext,
    ) -> Result<AgentOutcome, AgentError> {
        let force_text_at = self.max_tool_iterations;
        let nudge_at = self.max_tool_iterations.saturating_sub(1);

        let mut records = Vec::new();
        let mut input_tokens = 0u32;
        let mut output_tokens = 0u32;

        let mut iteration = 0;
        loop {
            iteration += 1;
            // Safety net one past the forced-text iteration; unreachable
            // unless a provider returns tool calls with no tools offered.
            if iteration > self.max_tool_iterations + 1 {
                return Err(AgentError::TooManyIterations(self.max_tool_iterations));
            }

            if iteration == nudge_at {
                messages.push(ChatMessage::system(
                    "You are approaching the tool call limit. \
                     Provide your best final answer on the next response \
                     using the information you have gathered so far. \
                     Do not call any more tools.",
                ));
            }

            let force_text = iteration >= force_text_at;
            if force_text {
                tracing::info!(iteration, "Forcing text-only response (iteration limit reached)");
            }

            let tools = if force_text {
                Vec::new()
            } else {
                self.registry.definitions()
            };

            let response = self
                .llm
                .complete_with_tools(ToolCompletionRequest {
                    messages: messages.clone(),
                    tools,
                    temperature: None,
                    max_tokens: None,
                })
                .await?;

            input_tokens = input_tokens.saturating_add(response.input_tokens);
            output_tokens = output_tokens.saturating_add(response.output_tokens);

            if response.tool_calls.is_empty() {
                return Ok(AgentOutcome {
                    content: response.content.unwrap_or_default(),
                    tool_calls: records,
                    input_tokens,
                    output_tokens,
                });
            }

            messages.push(ChatMessage::assistant_with_tool_calls(
                response.content,
                response.tool_calls.clone(),
            ));

            for call in response.tool_calls {
                let result = self.execute_call(&call.name, call.arguments.clone(), ctx).await;
                tracing::debug!(tool = %call.name, status = %result["status"], "Tool call finished");

                messages.push(ChatMessage::tool_result(
                    call.id,
                    call.name.clone(),
                    result.to_string(),
                ));
                records.push(ToolCallRecord {
                    name: call.name,
                    arguments: call.arguments,
                    result,
                });
            }
        }
    }

    /// Execute one tool call, converting every failure into an in-band
    /// error envelope the model can read.
    async fn execute_call(
        &self,
        name: &str,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> serde_json::Value {
        let Some(tool) = self.registry.get(name) else {
            tracing::warn!(tool = %name, "Model requested unknown tool");
            return serde_json::json!({
                "status": "error",
                "error": format!("unknown tool: {name}"),
            });
        };

        match tool.execute(arguments, ctx).await {
            Ok(output) => output.result,
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "Tool execution failed");
                serde_json::json!({
                    "status": "error",
                    "error": e.to_string(),
                })
            }
        }
    }
}
