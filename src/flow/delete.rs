//! Delete flow: a single confirmation gate before the store delete.

use crate::flow::FlowReply;

/// Result of feeding the confirmation answer to the delete flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStep {
    /// User confirmed; the engine should issue the delete.
    Confirmed,
    /// User declined; nothing is deleted.
    Aborted,
}

/// Conversational state machine for `/delete`.
#[derive(Debug)]
pub struct DeleteFlow {
    decided: bool,
}

impl DeleteFlow {
    /// Start the flow. The engine shows the record before this gate.
    pub fn begin() -> (Self, FlowReply) {
        let reply = FlowReply::confirm("Are you sure you want to delete these preferences?");
        (Self { decided: false }, reply)
    }

    /// Feed the confirmation answer.
    pub fn handle(&mut self, input: &str) -> DeleteStep {
        if self.decided || input == "No" {
            self.decided = true;
            return DeleteStep::Aborted;
        }
        self.decided = true;
        DeleteStep::Confirmed
    }
}
