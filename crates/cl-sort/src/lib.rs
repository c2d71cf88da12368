#![forbid(unsafe_code)]

use std::cmp::Ordering;

use cl_record::{FieldCatalog, Record};
use cl_types::{DType, FieldValue, Scalar, case_fold, infer_dtype};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    #[must_use]
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    #[must_use]
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SortError {
    #[error("sort references unknown field: {field}")]
    UnknownField { field: String },
}

/// Precomputed comparison key. One per record, built before the sort, so
/// the comparator never re-derives values mid-sort.
#[derive(Debug, Clone)]
enum SortKey {
    Number(f64),
    Text(String),
}

impl SortKey {
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
        }
    }
}

/// Sort a record set by one field, returning a new vector.
///
/// The column's dtype is inferred once: numeric columns compare through the
/// numeric defaulting rule (missing reads as 0), everything else compares
/// as case-folded text (missing reads as ""). Case-folded code-point order
/// is deterministic across hosts, which the dashboards need for
/// reproducible tables; list fields sort by their first element. Equal
/// keys keep input order.
pub fn sort_records(records: &[Record], spec: &SortSpec) -> Result<Vec<Record>, SortError> {
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let catalog = FieldCatalog::from_records(records);
    if !catalog.contains(&spec.field) {
        return Err(SortError::UnknownField {
            field: spec.field.clone(),
        });
    }

    let dtype = infer_dtype(
        records
            .iter()
            .filter_map(|record| record.get(&spec.field))
            .flat_map(FieldValue::scalars),
    );
    let numeric = !matches!(dtype, DType::Utf8);

    let mut decorated: Vec<(SortKey, usize)> = records
        .iter()
        .enumerate()
        .map(|(idx, record)| (sort_key(record, &spec.field, numeric), idx))
        .collect();

    decorated.sort_by(|(left_key, left_idx), (right_key, right_idx)| {
        directed(left_key.compare(right_key), spec.direction).then(left_idx.cmp(right_idx))
    });

    Ok(decorated
        .into_iter()
        .map(|(_, idx)| records[idx].clone())
        .collect())
}

/// Sort by a derived numeric key, e.g. percent-of-total computed from two
/// stored fields. The key function runs once per record, never inside the
/// comparator.
pub fn sort_records_with<F>(records: &[Record], direction: SortDirection, key: F) -> Vec<Record>
where
    F: Fn(&Record) -> f64,
{
    let mut decorated: Vec<(f64, usize)> = records
        .iter()
        .enumerate()
        .map(|(idx, record)| (key(record), idx))
        .collect();

    decorated.sort_by(|(left_key, left_idx), (right_key, right_idx)| {
        directed(left_key.total_cmp(right_key), direction).then(left_idx.cmp(right_idx))
    });

    decorated
        .into_iter()
        .map(|(_, idx)| records[idx].clone())
        .collect()
}

fn directed(ord: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => ord,
        SortDirection::Descending => ord.reverse(),
    }
}

fn sort_key(record: &Record, field: &str, numeric: bool) -> SortKey {
    let scalar = record.scalar_or_null(field);
    if numeric {
        SortKey::Number(scalar.numeric_or_zero())
    } else {
        SortKey::Text(match &scalar {
            Scalar::Null => String::new(),
            other => case_fold(&other.to_string()),
        })
    }
}
