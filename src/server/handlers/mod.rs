//! HTTP handlers, one module per domain.

pub mod chat;
pub mod conversations;
pub mod health;
pub mod tasks;
