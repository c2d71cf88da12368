#![forbid(unsafe_code)]

use cl_record::{FieldCatalog, Record, path_segments};
use cl_types::{FieldValue, Scalar, case_fold};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("predicate references unknown field: {field}")]
    UnknownField { field: String },
}

/// Multi-select state for one filter dimension (vendor, BOM, tag,
/// cost-type, item). Never empty: clearing the last concrete value snaps
/// back to `All`, since an empty selection is indistinguishable from
/// "select nothing" and the views treat that as a bug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum Selection {
    All,
    Values(Vec<Scalar>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SelectionValue {
    All,
    Value(Scalar),
}

impl Selection {
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Self::All)
    }

    /// True when the field value (any element, for list fields) is among
    /// the selected values.
    #[must_use]
    pub fn allows(&self, value: &FieldValue) -> bool {
        match self {
            Self::All => true,
            Self::Values(allowed) => value
                .scalars()
                .iter()
                .any(|scalar| allowed.iter().any(|choice| choice.semantic_eq(scalar))),
        }
    }

    /// Total transition function for the toggle-pill interaction. Toggling
    /// `All` resets to unrestricted; toggling a concrete value drops the
    /// sentinel, then adds or removes the value. Concrete values keep
    /// click order.
    #[must_use]
    pub fn toggle(&self, value: &SelectionValue) -> Self {
        match value {
            SelectionValue::All => Self::All,
            SelectionValue::Value(scalar) => {
                let mut values = match self {
                    Self::All => Vec::new(),
                    Self::Values(values) => values.clone(),
                };
                if let Some(pos) = values.iter().position(|v| v.semantic_eq(scalar)) {
                    values.remove(pos);
                } else {
                    values.push(scalar.clone());
                }
                if values.is_empty() {
                    Self::All
                } else {
                    Self::Values(values)
                }
            }
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::All
    }
}

/// One filter condition over one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Value (or any list element) must be allowed by the selection.
    Membership { field: String, selection: Selection },
    /// Numeric value in `[min, max]` inclusive; missing reads as 0.
    Range { field: String, min: f64, max: f64 },
    /// Case-folded substring over the value or any list element.
    Substring { field: String, query: String },
    /// BOM-style path whose leading segments equal the prefix's.
    PathPrefix { field: String, prefix: String },
}

impl Predicate {
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Membership { field, .. }
            | Self::Range { field, .. }
            | Self::Substring { field, .. }
            | Self::PathPrefix { field, .. } => field,
        }
    }

    /// A predicate naming a field no record carries is a bug in the
    /// calling view, not sparse data: fail fast instead of matching
    /// nothing silently.
    pub fn validate(&self, catalog: &FieldCatalog) -> Result<(), FilterError> {
        if catalog.contains(self.field()) {
            Ok(())
        } else {
            Err(FilterError::UnknownField {
                field: self.field().to_owned(),
            })
        }
    }

    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::Membership { field, selection } => match record.get(field) {
                Some(value) => selection.allows(value),
                None => selection.is_unrestricted(),
            },
            Self::Range { field, min, max } => {
                let in_range = |v: f64| *min <= v && v <= *max;
                let scalars = record.get(field).map(FieldValue::scalars).unwrap_or_default();
                if scalars.is_empty() {
                    in_range(0.0)
                } else {
                    scalars.iter().map(Scalar::numeric_or_zero).any(in_range)
                }
            }
            Self::Substring { field, query } => {
                let needle = case_fold(query);
                let scalars = record.get(field).map(FieldValue::scalars).unwrap_or_default();
                if scalars.is_empty() {
                    needle.is_empty()
                } else {
                    scalars
                        .iter()
                        .any(|scalar| case_fold(&scalar.to_string()).contains(needle.as_str()))
                }
            }
            Self::PathPrefix { field, prefix } => {
                let want = folded_segments(prefix);
                if want.is_empty() {
                    return true;
                }
                record.get(field).is_some_and(|value| {
                    value.scalars().iter().any(|scalar| {
                        let have = folded_segments(&scalar.to_string());
                        have.len() >= want.len() && have[..want.len()] == want[..]
                    })
                })
            }
        }
    }
}

/// Keep the subsequence of records matching every predicate, input order
/// preserved. Predicates are checked left to right and short-circuit per
/// record. Linear scan by design: predicate sets change every interaction
/// and working sets are reporting-scale, so no index is maintained.
pub fn filter_records(
    records: &[Record],
    predicates: &[Predicate],
) -> Result<Vec<Record>, FilterError> {
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let catalog = FieldCatalog::from_records(records);
    for predicate in predicates {
        predicate.validate(&catalog)?;
    }

    Ok(records
        .iter()
        .filter(|record| predicates.iter().all(|predicate| predicate.matches(record)))
        .cloned()
        .collect())
}

fn folded_segments(path: &str) -> Vec<String> {
    path_segments(path)
        .iter()
        .map(|segment| case_fold(segment))
        .collect()
}
