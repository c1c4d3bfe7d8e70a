//! Form cursor: the per-conversation position tracker for field collection.

use crate::catalog::{Catalog, FieldSpec, RejectReason, ValidationOutcome};
use crate::record::PreferenceRecord;

/// A question to put to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Name of the field being asked.
    pub field: &'static str,
    /// Prompt text, including any numbered option list.
    pub text: String,
    /// Option keyboard. Empty means free-form input is expected.
    pub options: Vec<String>,
}

/// Build the prompt for one field against the record collected so far.
///
/// Dependent fields resolve their choice set here, so the option list can
/// differ per user based on an earlier answer.
pub fn field_prompt(catalog: &Catalog, spec: &FieldSpec, partial: &PreferenceRecord) -> Prompt {
    let choices = catalog.choices_for(spec, partial);
    let mut text = format!(
        "Choose - {}\nType /cancel to stop current operation\n",
        spec.label()
    );
    for (i, choice) in choices.iter().enumerate() {
        text.push_str(&format!("\n{}. {choice}", i + 1));
    }
    Prompt {
        field: spec.name,
        text,
        options: choices.iter().map(|c| (*c).to_owned()).collect(),
    }
}

/// Result of feeding one answer to the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Answer stored; ask the next field.
    Continue(Prompt),
    /// Every field collected; the finished record.
    Complete(PreferenceRecord),
    /// Answer rejected; cursor unmoved, re-ask the same field.
    Rejected { reason: RejectReason, prompt: Prompt },
}

/// Mutable "where am I in this form" state for one conversation.
///
/// Invariant: `index <= catalog len`, and every field below `index` holds a
/// validated value in `record`.
#[derive(Debug, Clone)]
pub struct FormCursor {
    index: usize,
    record: PreferenceRecord,
}

impl FormCursor {
    /// Cursor at the first field, accumulating into the given record.
    pub fn new(record: PreferenceRecord) -> Self {
        Self { index: 0, record }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn record(&self) -> &PreferenceRecord {
        &self.record
    }

    /// Prompt for the field currently awaiting an answer.
    ///
    /// Callers issue this directly on conversation entry; `answer` produces
    /// every subsequent prompt. Returns `None` once the form is complete.
    pub fn prompt(&self, catalog: &Catalog) -> Option<Prompt> {
        let spec = catalog.fields_in_order().get(self.index)?;
        Some(field_prompt(catalog, spec, &self.record))
    }

    /// Validate and store one answer, advancing on success.
    ///
    /// Once every field is collected, further answers are ignored and the
    /// finished record is returned again.
    pub fn answer(&mut self, catalog: &Catalog, raw: &str) -> StepOutcome {
        let fields = catalog.fields_in_order();
        let Some(spec) = fields.get(self.index) else {
            return StepOutcome::Complete(self.record.clone());
        };

        match catalog.validate(spec, raw) {
            ValidationOutcome::Rejected(reason) => StepOutcome::Rejected {
                reason,
                prompt: field_prompt(catalog, spec, &self.record),
            },
            ValidationOutcome::Accepted(value) => {
                self.record.set(spec.name, value);
                self.index += 1;
                match fields.get(self.index) {
                    None => StepOutcome::Complete(self.record.clone()),
                    Some(next) => {
                        StepOutcome::Continue(field_prompt(catalog, next, &self.record))
                    }
                }
            }
        }
    }
}
