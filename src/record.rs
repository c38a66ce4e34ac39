//! Record representation
//!
//! A record is an opaque mapping from field name to [`FieldValue`]. The
//! engine imposes no identity field: structural equality on content is the
//! only identity notion, so two records with the same fields are
//! indistinguishable (and a delete matching one tombstones all of them).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::value::FieldValue;

/// A stored record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a JSON object
    pub fn from_json(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Get a field value
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Set a field value
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over field names
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Copy of this record containing only the named fields
    ///
    /// Fields the record does not have are omitted, not defaulted.
    pub fn project(&self, fields: &[String]) -> Record {
        Record {
            fields: self
                .fields
                .iter()
                .filter(|(name, _)| fields.iter().any(|f| f == *name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        }
    }
}
