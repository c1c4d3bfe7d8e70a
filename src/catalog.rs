//! Option catalog and field validator.
//!
//! The catalog is the declarative description of every preference field:
//! its name, input class, and where its choice set comes from. Dependent
//! choice sets are resolved against the partially-built record, so two users
//! can see different option lists for the same field.

use crate::record::{FieldValue, PreferenceRecord};

/// Input class of a preference field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free-form positive integer input.
    Numeric,
    /// Fixed choice set.
    Choice,
    /// Choice set keyed by another field's already-collected value.
    DependentChoice,
    /// Free text reduced to its first whitespace-delimited token.
    Derived,
}

/// Immutable description of one preference field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Display label: the field name with underscores spelled as spaces.
    pub fn label(&self) -> String {
        self.name.replace('_', " ")
    }
}

/// Why a raw input was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NotANumber,
    NonPositive,
    Empty,
}

impl RejectReason {
    /// User-facing retry instruction.
    pub fn message(self) -> &'static str {
        match self {
            Self::NotANumber => "Invalid input added, please type a number...",
            Self::NonPositive => "Invalid input added, please type a positive number...",
            Self::Empty => "Empty input, please try again...",
        }
    }
}

/// Result of validating one raw input against a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Accepted(FieldValue),
    Rejected(RejectReason),
}

const FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "property_type",
        kind: FieldKind::Choice,
    },
    FieldSpec {
        name: "property_type_code",
        kind: FieldKind::DependentChoice,
    },
    FieldSpec {
        name: "district",
        kind: FieldKind::Derived,
    },
    FieldSpec {
        name: "min_price",
        kind: FieldKind::Numeric,
    },
    FieldSpec {
        name: "max_price",
        kind: FieldKind::Numeric,
    },
    FieldSpec {
        name: "job_frequency_hours",
        kind: FieldKind::Numeric,
    },
];

const PROPERTY_TYPES: &[&str] = &["HDB", "Condominium", "Landed"];

const HDB_CODES: &[&str] = &["2 ROOM", "3 ROOM", "4 ROOM", "5 ROOM", "EXECUTIVE"];
const CONDO_CODES: &[&str] = &["Condominium", "Apartment", "Walk-up", "Cluster House"];
const LANDED_CODES: &[&str] = &[
    "Terraced House",
    "Semi-Detached House",
    "Detached House",
    "Shophouse",
];

/// The field catalog. One instance describes every form the bot collects.
#[derive(Debug, Clone, Copy, Default)]
pub struct Catalog;

impl Catalog {
    /// All fields in collection/display order.
    pub fn fields_in_order(&self) -> &'static [FieldSpec] {
        FIELDS
    }

    /// Looks up a field spec by name.
    pub fn field(&self, name: &str) -> Option<FieldSpec> {
        FIELDS.iter().find(|spec| spec.name == name).copied()
    }

    /// Choice set for a field, resolved against the partial record.
    ///
    /// An empty slice means the field takes free-form input, not that the
    /// field has no valid values. Callers switch from an option keyboard to
    /// an open prompt on empty.
    pub fn choices_for(&self, field: &FieldSpec, partial: &PreferenceRecord) -> &'static [&'static str] {
        match (field.kind, field.name) {
            (FieldKind::Choice, "property_type") => PROPERTY_TYPES,
            (FieldKind::DependentChoice, "property_type_code") => {
                match partial.get_text("property_type").as_str() {
                    "HDB" => HDB_CODES,
                    "Condominium" => CONDO_CODES,
                    "Landed" => LANDED_CODES,
                    _ => &[],
                }
            }
            _ => &[],
        }
    }

    /// Validate raw user input against a field.
    ///
    /// Numeric fields require a positive integer. Derived fields are reduced
    /// to their first whitespace token; that reduction is a normalization,
    /// not a failure path.
    pub fn validate(&self, field: &FieldSpec, raw: &str) -> ValidationOutcome {
        let trimmed = raw.trim();
        match field.kind {
            FieldKind::Numeric => match trimmed.parse::<i64>() {
                Ok(n) if n > 0 => ValidationOutcome::Accepted(FieldValue::Int(n)),
                Ok(_) => ValidationOutcome::Rejected(RejectReason::NonPositive),
                Err(_) if trimmed.is_empty() => ValidationOutcome::Rejected(RejectReason::Empty),
                Err(_) => ValidationOutcome::Rejected(RejectReason::NotANumber),
            },
            FieldKind::Derived => match trimmed.split_whitespace().next() {
                Some(token) => ValidationOutcome::Accepted(FieldValue::Text(token.to_owned())),
                None => ValidationOutcome::Rejected(RejectReason::Empty),
            },
            FieldKind::Choice | FieldKind::DependentChoice => {
                if trimmed.is_empty() {
                    ValidationOutcome::Rejected(RejectReason::Empty)
                } else {
                    ValidationOutcome::Accepted(FieldValue::Text(trimmed.to_owned()))
                }
            }
        }
    }
}
