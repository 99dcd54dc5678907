//! taskpilot - todo-list service with a conversational AI layer.
//!
//! Users manage tasks either through the REST API or by chatting with an
//! LLM agent that calls ownership-checked task tools. The crate is split
//! along those seams:
//!
//! - [`db`]: backend-agnostic persistence (`Database` trait + libSQL backend)
//! - [`history`]: row types and the `Store` wrapper handlers work against
//! - [`tools`]: the `Tool` trait, registry, and the five task tools
//! - [`llm`]: the `LlmProvider` trait and the OpenAI-compatible chat client
//! - [`agent`]: the stateless chat orchestration (load history, run the
//!   tool-calling loop, persist the exchange)
//! - [`server`]: axum routes, JWT auth, chat session tokens, rate limiting
//! - [`config`]: environment-driven configuration

pub mod agent;
pub mod config;
pub mod db;
pub mod error;
pub mod history;
pub mod llm;
pub mod server;
pub mod tools;

pub use config::Config;
pub use error::Error;
