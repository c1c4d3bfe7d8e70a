//! Update flow: revise arbitrary fields of an existing record.
//!
//! ```text
//! FetchExisting → ConfirmUpdate → ChoosingField ⇄ CollectingOne → Committing → Done
//! ```
//!
//! The working record is seeded from the stored record, so it covers every
//! catalog field from the first step and no partial record can ever be
//! submitted. `FetchExisting` and `Committing` are the engine's store calls.

use crate::catalog::{Catalog, FieldSpec, ValidationOutcome};
use crate::flow::FlowReply;
use crate::form::field_prompt;
use crate::record::PreferenceRecord;

/// Sentinel menu entry that commits the pending edits.
pub const SUBMIT: &str = "Submit";
/// Sentinel menu entry that discards the pending edits.
pub const CANCEL: &str = "Cancel";

/// Result of feeding one input to the update flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStep {
    /// Conversation continues; send these replies.
    Ask(Vec<FlowReply>),
    /// User submitted; the engine should update with this record.
    Commit(PreferenceRecord),
    /// User declined or cancelled; pending edits are discarded.
    Aborted,
}

#[derive(Debug)]
enum UpdateState {
    ConfirmUpdate,
    ChoosingField,
    CollectingOne(FieldSpec),
    Done,
}

/// Conversational state machine for `/update`.
#[derive(Debug)]
pub struct UpdateFlow {
    catalog: Catalog,
    working: PreferenceRecord,
    state: UpdateState,
}

impl UpdateFlow {
    /// Start the flow from the user's stored record.
    pub fn begin(existing: PreferenceRecord) -> (Self, FlowReply) {
        let flow = Self {
            catalog: Catalog,
            working: existing,
            state: UpdateState::ConfirmUpdate,
        };
        let reply = FlowReply::confirm("Would you like to update your preferences?");
        (flow, reply)
    }

    /// Feed one user input (selection or free text) to the machine.
    pub fn handle(&mut self, input: &str) -> UpdateStep {
        match &self.state {
            UpdateState::ConfirmUpdate => {
                if input == "No" {
                    self.state = UpdateState::Done;
                    return UpdateStep::Aborted;
                }
                self.state = UpdateState::ChoosingField;
                UpdateStep::Ask(vec![self.menu()])
            }
            UpdateState::ChoosingField => self.handle_menu_choice(input),
            UpdateState::CollectingOne(spec) => {
                let spec = *spec;
                match self.catalog.validate(&spec, input) {
                    ValidationOutcome::Rejected(reason) => UpdateStep::Ask(vec![
                        FlowReply::text(reason.message()),
                        field_prompt(&self.catalog, &spec, &self.working).into(),
                    ]),
                    ValidationOutcome::Accepted(value) => {
                        self.working.set(spec.name, value);
                        self.state = UpdateState::ChoosingField;
                        UpdateStep::Ask(vec![self.menu()])
                    }
                }
            }
            UpdateState::Done => UpdateStep::Aborted,
        }
    }

    fn handle_menu_choice(&mut self, input: &str) -> UpdateStep {
        if input == CANCEL {
            self.state = UpdateState::Done;
            return UpdateStep::Aborted;
        }
        if input == SUBMIT {
            self.state = UpdateState::Done;
            let mut record = self.working.clone();
            // Defensive re-coercion of every numeric field, touched or not.
            record.normalize_numeric_fields(&self.catalog);
            return UpdateStep::Commit(record);
        }

        let chosen = self
            .catalog
            .fields_in_order()
            .iter()
            .find(|spec| spec.label() == input || spec.name == input)
            .copied();
        match chosen {
            Some(spec) => {
                self.state = UpdateState::CollectingOne(spec);
                UpdateStep::Ask(vec![field_prompt(&self.catalog, &spec, &self.working).into()])
            }
            None => UpdateStep::Ask(vec![self.menu()]),
        }
    }

    /// The field menu: current record plus every field and the two sentinels.
    fn menu(&self) -> FlowReply {
        let mut text = String::from("Current preference:\n\n");
        text.push_str(&self.working.render(&self.catalog));
        text.push_str("\nWhich category would you like to update?\n");
        text.push_str("(Select Submit to submit your updates or Cancel to exit)");

        let mut options: Vec<String> = self
            .catalog
            .fields_in_order()
            .iter()
            .map(FieldSpec::label)
            .collect();
        options.push(SUBMIT.to_owned());
        options.push(CANCEL.to_owned());
        FlowReply::with_options(text, options)
    }
}
