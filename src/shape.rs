//! Result shaping: sort and projection
//!
//! Applied to already-matched records in a fixed order: sort first, then
//! projection, so comparators always see full records.

use std::cmp::Ordering;

use crate::record::Record;
use crate::value::FieldValue;

/// Sort direction for one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// One sort key: field name plus direction
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: String,
    pub order: SortOrder,
}

/// Options applied to `find` results
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Priority chain of sort keys, applied in order
    pub sort: Vec<SortKey>,
    /// Field subset for the returned shape; `None` returns whole records
    pub projection: Option<Vec<String>>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sort key (keys apply in the order they are added)
    pub fn sort_by(mut self, field: &str, order: SortOrder) -> Self {
        self.sort.push(SortKey {
            field: field.to_string(),
            order,
        });
        self
    }

    /// Project results down to the given fields
    pub fn project(mut self, fields: &[&str]) -> Self {
        self.projection = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }
}

/// Sort then project matched records
pub fn shape(mut records: Vec<Record>, options: &FindOptions) -> Vec<Record> {
    if !options.sort.is_empty() {
        records.sort_by(|a, b| compare_records(a, b, &options.sort));
    }
    if let Some(ref fields) = options.projection {
        records = records.iter().map(|r| r.project(fields)).collect();
    }
    records
}

/// The first non-equal key in the chain decides; a full tie keeps input
/// order (`sort_by` is stable)
fn compare_records(a: &Record, b: &Record, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ordering = compare_values(a.get(&key.field), b.get(&key.field));
        let ordering = match key.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Typed comparator: strings lexicographic, numbers numeric; arrays,
/// mismatched kinds, and missing values compare equal
fn compare_values(a: Option<&FieldValue>, b: Option<&FieldValue>) -> Ordering {
    match (a, b) {
        (Some(FieldValue::Str(a)), Some(FieldValue::Str(b))) => a.cmp(b),
        (Some(FieldValue::Num(a)), Some(FieldValue::Num(b))) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        _ => Ordering::Equal,
    }
}
