//! Conversation state machines for create, update, and delete.
//!
//! Flows are pure input→step functions: they never touch the network. The
//! engine performs the store reads before a flow is constructed and the
//! store writes when a flow emits a commit, so each machine can be driven
//! step by step in tests.

mod create;
mod delete;
mod update;

pub use create::{CreateFlow, CreateStep};
pub use delete::{DeleteFlow, DeleteStep};
pub use update::{UpdateFlow, UpdateStep};

use crate::form::Prompt;

/// Text used to end any aborted conversation.
pub const ABORT_TEXT: &str = "Ending current operation...";

/// One message a flow wants sent to its chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowReply {
    pub text: String,
    /// Option keyboard; empty for plain or free-form messages.
    pub options: Vec<String>,
    /// Solicit a free-form reply (used for fields without a choice set).
    pub force_reply: bool,
}

impl FlowReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            options: Vec::new(),
            force_reply: false,
        }
    }

    pub fn with_options(text: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            text: text.into(),
            options,
            force_reply: false,
        }
    }

    /// A yes/no confirmation keyboard.
    pub fn confirm(text: impl Into<String>) -> Self {
        Self::with_options(text, vec!["Yes".to_owned(), "No".to_owned()])
    }
}

impl From<Prompt> for FlowReply {
    fn from(prompt: Prompt) -> Self {
        let force_reply = prompt.options.is_empty();
        Self {
            text: prompt.text,
            options: prompt.options,
            force_reply,
        }
    }
}
