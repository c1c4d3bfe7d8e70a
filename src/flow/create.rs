//! Create flow: collect a brand-new preference record field by field.
//!
//! ```text
//! CheckExisting → ConfirmNew → Collecting → Committing → Done
//! ```
//!
//! `CheckExisting` and `Committing` are the engine's store calls; this
//! machine owns the two interactive states in between. A user with an
//! existing record never reaches construction — the engine blocks the
//! conversation before it starts.

use crate::catalog::Catalog;
use crate::chat::UserId;
use crate::flow::FlowReply;
use crate::form::{FormCursor, StepOutcome};
use crate::record::PreferenceRecord;

/// Result of feeding one input to the create flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateStep {
    /// Conversation continues; send these replies.
    Ask(Vec<FlowReply>),
    /// Form complete; the engine should create this record.
    Commit(PreferenceRecord),
    /// User declined or cancelled; nothing to write.
    Aborted,
}

#[derive(Debug)]
enum CreateState {
    ConfirmNew,
    Collecting(FormCursor),
    Done,
}

/// Conversational state machine for `/create`.
#[derive(Debug)]
pub struct CreateFlow {
    catalog: Catalog,
    user: UserId,
    state: CreateState,
}

impl CreateFlow {
    /// Start the flow. Returns the machine and the opening yes/no gate.
    pub fn begin(user: UserId) -> (Self, FlowReply) {
        let flow = Self {
            catalog: Catalog,
            user,
            state: CreateState::ConfirmNew,
        };
        let reply = FlowReply::confirm(
            "No existing preference, would you like to create a new preference?",
        );
        (flow, reply)
    }

    /// Feed one user input (selection or free text) to the machine.
    pub fn handle(&mut self, input: &str) -> CreateStep {
        match &mut self.state {
            CreateState::ConfirmNew => {
                if input == "No" {
                    self.state = CreateState::Done;
                    return CreateStep::Aborted;
                }
                let cursor = FormCursor::new(PreferenceRecord::new(self.user));
                let prompt = cursor.prompt(&self.catalog);
                self.state = CreateState::Collecting(cursor);
                match prompt {
                    Some(prompt) => CreateStep::Ask(vec![prompt.into()]),
                    // Empty catalog cannot happen with the built-in field set.
                    None => {
                        self.state = CreateState::Done;
                        CreateStep::Commit(PreferenceRecord::new(self.user))
                    }
                }
            }
            CreateState::Collecting(cursor) => match cursor.answer(&self.catalog, input) {
                StepOutcome::Continue(prompt) => CreateStep::Ask(vec![prompt.into()]),
                StepOutcome::Rejected { reason, prompt } => CreateStep::Ask(vec![
                    FlowReply::text(reason.message()),
                    prompt.into(),
                ]),
                StepOutcome::Complete(record) => {
                    self.state = CreateState::Done;
                    CreateStep::Commit(record)
                }
            },
            CreateState::Done => CreateStep::Aborted,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn walk(flow: &mut CreateFlow, inputs: &[&str]) -> CreateStep {
        let mut last = None;
        for input in inputs {
            last = Some(flow.handle(input));
        }
        last.expect("at least one input")
    }

    #[test]
    fn begin_opens_with_yes_no_gate() {
        let (_, reply) = CreateFlow::begin(UserId(42));
        assert_eq!(reply.options, vec!["Yes", "No"]);
    }

    #[test]
    fn declining_the_gate_aborts_without_commit() {
        let (mut flow, _) = CreateFlow::begin(UserId(42));
        assert_eq!(flow.handle("No"), CreateStep::Aborted);
    }

    #[test]
    fn accepting_the_gate_asks_the_first_field() {
        let (mut flow, _) = CreateFlow::begin(UserId(42));
        let CreateStep::Ask(replies) = flow.handle("Yes") else {
            panic!("expected prompt");
        };
        assert_eq!(replies.len(), 1);
        assert!(replies[0].text.contains("property type"));
        assert_eq!(replies[0].options, vec!["HDB", "Condominium", "Landed"]);
    }

    #[test]
    fn full_walk_commits_a_complete_record() {
        let (mut flow, _) = CreateFlow::begin(UserId(42));
        let step = walk(
            &mut flow,
            &["Yes", "HDB", "4 ROOM", "075 Tanjong Pagar", "300000", "550000", "6"],
        );
        let CreateStep::Commit(record) = step else {
            panic!("expected commit, got {step:?}");
        };
        assert!(record.covers(&Catalog));
        assert_eq!(record.user_id(), UserId(42));
        assert_eq!(record.get_text("district"), "075");
        assert_eq!(record.get_int("job_frequency_hours"), Some(6));
    }

    #[test]
    fn invalid_numeric_re_asks_with_error_annotation() {
        let (mut flow, _) = CreateFlow::begin(UserId(42));
        walk(&mut flow, &["Yes", "HDB", "4 ROOM", "075"]);

        let CreateStep::Ask(replies) = flow.handle("abc") else {
            panic!("expected re-prompt");
        };
        assert_eq!(replies.len(), 2);
        assert!(replies[0].text.contains("please type a number"));
        assert!(replies[1].text.contains("min price"));
        assert!(replies[1].force_reply);

        // Valid retry lands in the same field and the walk still completes.
        let step = walk(&mut flow, &["300000", "550000", "6"]);
        assert!(matches!(step, CreateStep::Commit(_)));
    }
}
