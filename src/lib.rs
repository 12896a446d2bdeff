//! Webhook Router — filters messaging webhooks and relays manual
//! self-chat messages to an n8n workflow.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod server;
