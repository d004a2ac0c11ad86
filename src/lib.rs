//! Atende Gateway - WhatsApp AI assistant relay for salon management platforms
//!
//! This library provides the webhook relay between a WhatsApp messaging
//! provider and an LLM-backed virtual assistant:
//! - Tenant resolution from the inbound instance credential
//! - Append-only conversation log with bounded history
//! - Audio transcription via speech-to-text
//! - Reply generation via chat completions
//! - Outbound delivery through the provider send API
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Messaging Provider                      │
//! │     webhook POST  │  send text  │  media fetch      │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                Atende Gateway                        │
//! │   Dispatcher │ Tenants │ Conversations │ Assistant  │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 LLM Provider                         │
//! │       chat completions  │  speech-to-text           │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod assistant;
pub mod config;
pub mod db;
pub mod error;
pub mod provider;

pub use config::Config;
pub use db::{DbConn, DbPool};
pub use error::{Error, Result};
