//! Transport boundary types.
//!
//! The engine does not speak to any chat platform directly. A transport
//! adapter feeds it [`InboundMessage`]s and drains [`OutboundMessage`]s from
//! the channel handed out at engine construction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Chat identity. Uniqueness key for conversations and scheduled jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User identity. Key under which preference records are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inbound chat event consumed by the engine.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub chat: ChatId,
    pub user: UserId,
    pub body: InboundBody,
}

/// The payload of an inbound event.
#[derive(Debug, Clone)]
pub enum InboundBody {
    /// A slash command, without the leading `/` (e.g. `create`).
    Command(String),
    /// Free-form text typed by the user.
    Text(String),
    /// A selection from an option keyboard presented earlier.
    Selection(String),
}

/// Outbound message produced by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chat: ChatId,
    pub text: String,
    /// Option keyboard to present alongside the text. Empty = plain message.
    pub options: Vec<String>,
    /// Ask the transport to solicit a free-form reply to this message.
    pub force_reply: bool,
}

impl OutboundMessage {
    /// Plain text message with no keyboard.
    pub fn text(chat: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat,
            text: text.into(),
            options: Vec::new(),
            force_reply: false,
        }
    }
}
