//! Towkay: chat-driven property preference bot core.
//!
//! Users walk through a conversational form to build a preference record,
//! persist it to a remote preference store, and schedule a recurring scraper
//! run that reports new listings back into the chat.
//!
//! # Architecture
//!
//! The engine sits between a chat transport and two external services:
//!
//! ```text
//! transport → Bot engine ⇄ preference store (HTTP)
//!                 │
//!            JobRegistry → TaskInvoker (scraper endpoint) → transport
//! ```
//!
//! - **catalog/form**: the ordered, partially-conditional field sequence and
//!   its validation
//! - **flow**: create/update/delete conversation state machines, pure and
//!   per-chat
//! - **scheduler**: at most one recurring job per chat, cancel-and-replace
//! - **invoker**: one long, non-retried call per firing
//!
//! The transport itself is out of scope: adapters feed
//! [`chat::InboundMessage`]s in and drain [`chat::OutboundMessage`]s out.

pub mod bot;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod error;
pub mod flow;
pub mod form;
pub mod invoker;
pub mod record;
pub mod scheduler;
pub mod store;

pub use bot::Bot;
pub use config::BotConfig;
pub use error::{BotError, Result};
pub use record::{FieldValue, PreferenceRecord};
