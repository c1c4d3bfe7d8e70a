//! The preference record: the structured form data for one user.

use crate::catalog::{Catalog, FieldKind};
use crate::chat::UserId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single field value: integer for numeric fields, string otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Text(String),
}

impl FieldValue {
    /// Returns the integer value, parsing text if it happens to hold digits.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One user's preference record.
///
/// The wire shape is a flat JSON object: `user_id` plus one key per catalog
/// field, matching what the preference store persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceRecord {
    pub user_id: i64,
    #[serde(flatten)]
    fields: BTreeMap<String, FieldValue>,
}

impl PreferenceRecord {
    /// Empty record owned by the given user.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id: user_id.0,
            fields: BTreeMap::new(),
        }
    }

    pub fn user_id(&self) -> UserId {
        UserId(self.user_id)
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Field value rendered as a string, empty when unset.
    pub fn get_text(&self, field: &str) -> String {
        self.fields
            .get(field)
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    pub fn get_int(&self, field: &str) -> Option<i64> {
        self.fields.get(field).and_then(FieldValue::as_int)
    }

    pub fn set(&mut self, field: impl Into<String>, value: FieldValue) {
        self.fields.insert(field.into(), value);
    }

    /// Number of fields with a value.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// True when every catalog field has a value.
    pub fn covers(&self, catalog: &Catalog) -> bool {
        catalog
            .fields_in_order()
            .iter()
            .all(|spec| self.fields.contains_key(spec.name))
    }

    /// Coerce every numeric-typed field back to integer form.
    ///
    /// The update flow runs this before every commit, whether or not the
    /// numeric fields were touched in the session.
    pub fn normalize_numeric_fields(&mut self, catalog: &Catalog) {
        for spec in catalog.fields_in_order() {
            if spec.kind != FieldKind::Numeric {
                continue;
            }
            if let Some(n) = self.fields.get(spec.name).and_then(FieldValue::as_int) {
                self.fields.insert(spec.name.to_owned(), FieldValue::Int(n));
            }
        }
    }

    /// Human-readable rendering, one line per catalog field in display order.
    pub fn render(&self, catalog: &Catalog) -> String {
        let mut out = String::new();
        for spec in catalog.fields_in_order() {
            out.push_str(&format!("{}: {}\n", spec.label(), self.get_text(spec.name)));
        }
        out
    }
}
