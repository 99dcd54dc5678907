//! The conversational agent: tool-calling loop and chat orchestration.

pub mod dispatcher;
pub mod service;

pub use dispatcher::{AgentOutcome, Dispatcher, ToolCallRecord};
pub use service::{AgentReply, ChatService};
