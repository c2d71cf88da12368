#![forbid(unsafe_code)]

use std::collections::{BTreeMap, HashMap};

use cl_record::{FieldCatalog, Record, path_segments};
use cl_sort::SortDirection;
use cl_types::{FieldValue, Scalar};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateOp {
    Sum,
    Avg,
    Max,
}

impl AggregateOp {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Max => "max",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSpec {
    pub field: String,
    pub op: AggregateOp,
}

impl AggregateSpec {
    #[must_use]
    pub fn sum(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op: AggregateOp::Sum,
        }
    }

    #[must_use]
    pub fn avg(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op: AggregateOp::Avg,
        }
    }

    #[must_use]
    pub fn max(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op: AggregateOp::Max,
        }
    }

    /// Aggregate label as it appears on summaries, e.g. `sum_cost`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}_{}", self.op.as_str(), self.field)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub key: Scalar,
    pub count: usize,
    pub aggregates: BTreeMap<String, f64>,
}

impl GroupSummary {
    #[must_use]
    pub fn aggregate(&self, label: &str) -> Option<f64> {
        self.aggregates.get(label).copied()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GroupError {
    #[error("group-by references unknown field: {field}")]
    UnknownKeyField { field: String },
    #[error("aggregate references unknown field: {field}")]
    UnknownAggregateField { field: String },
    #[error("no aggregate named {label} on group summaries")]
    UnknownAggregate { label: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupOptions {
    /// Drop records whose key is missing instead of collecting them under
    /// the Null key. Off by default so scalar-key group counts stay
    /// conserved over sparse data.
    pub drop_missing_keys: bool,
}

/// Partition records by `key_field` and compute the requested aggregates
/// per group, in first-seen key order.
///
/// Array-valued keys fan out: a record contributes once to every distinct
/// group named by its elements, so the sum of group counts can exceed the
/// record count. That breaks the usual partition invariant and is the
/// intended semantics for tag/category dimensions.
pub fn group_records(
    records: &[Record],
    key_field: &str,
    aggregates: &[AggregateSpec],
    options: GroupOptions,
) -> Result<Vec<GroupSummary>, GroupError> {
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let catalog = FieldCatalog::from_records(records);
    if !catalog.contains(key_field) {
        return Err(GroupError::UnknownKeyField {
            field: key_field.to_owned(),
        });
    }
    validate_aggregates(&catalog, aggregates)?;

    Ok(group_with(records, aggregates, options, |record| {
        key_scalars(record, key_field)
    }))
}

/// Group by a BOM path truncated to `level + 1` segments, re-joined with
/// `" > "`. Records with shallower paths group under their own full path.
pub fn group_by_path_level(
    records: &[Record],
    key_field: &str,
    level: usize,
    aggregates: &[AggregateSpec],
    options: GroupOptions,
) -> Result<Vec<GroupSummary>, GroupError> {
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let catalog = FieldCatalog::from_records(records);
    if !catalog.contains(key_field) {
        return Err(GroupError::UnknownKeyField {
            field: key_field.to_owned(),
        });
    }
    validate_aggregates(&catalog, aggregates)?;

    Ok(group_with(records, aggregates, options, |record| {
        let scalar = record.scalar_or_null(key_field);
        let segments = path_segments(&scalar.to_string());
        if segments.is_empty() {
            vec![Scalar::Null]
        } else {
            let depth = segments.len().min(level + 1);
            vec![Scalar::Utf8(segments[..depth].join(" > "))]
        }
    }))
}

/// Re-order summaries by a named aggregate. Stable: ties keep first-seen
/// order. A label carried by no summary is a configuration error.
pub fn sort_by_aggregate(
    summaries: &[GroupSummary],
    label: &str,
    direction: SortDirection,
) -> Result<Vec<GroupSummary>, GroupError> {
    if summaries.is_empty() {
        return Ok(Vec::new());
    }
    require_label(summaries, label)?;

    let mut decorated: Vec<(f64, usize)> = summaries
        .iter()
        .enumerate()
        .map(|(idx, summary)| (summary.aggregate(label).unwrap_or(0.0), idx))
        .collect();

    decorated.sort_by(|(left, left_idx), (right, right_idx)| {
        let ord = left.total_cmp(right);
        match direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
        .then(left_idx.cmp(right_idx))
    });

    Ok(decorated
        .into_iter()
        .map(|(_, idx)| summaries[idx].clone())
        .collect())
}

/// The `n` largest groups by a named aggregate, for top-N chart slices.
pub fn top_n(
    summaries: &[GroupSummary],
    label: &str,
    n: usize,
) -> Result<Vec<GroupSummary>, GroupError> {
    let mut sorted = sort_by_aggregate(summaries, label, SortDirection::Descending)?;
    sorted.truncate(n);
    Ok(sorted)
}

/// Each group's fraction of the aggregate's total, aligned with the input
/// summaries. All zeros when the total is 0, never NaN.
pub fn shares(summaries: &[GroupSummary], label: &str) -> Result<Vec<f64>, GroupError> {
    if summaries.is_empty() {
        return Ok(Vec::new());
    }
    require_label(summaries, label)?;

    let values: Vec<f64> = summaries
        .iter()
        .map(|summary| summary.aggregate(label).unwrap_or(0.0))
        .collect();
    let total: f64 = values.iter().sum();
    if total == 0.0 {
        return Ok(vec![0.0; values.len()]);
    }
    Ok(values.into_iter().map(|value| value / total).collect())
}

fn validate_aggregates(
    catalog: &FieldCatalog,
    aggregates: &[AggregateSpec],
) -> Result<(), GroupError> {
    for spec in aggregates {
        if !catalog.contains(&spec.field) {
            return Err(GroupError::UnknownAggregateField {
                field: spec.field.clone(),
            });
        }
    }
    Ok(())
}

fn require_label(summaries: &[GroupSummary], label: &str) -> Result<(), GroupError> {
    if summaries
        .iter()
        .any(|summary| summary.aggregates.contains_key(label))
    {
        Ok(())
    } else {
        Err(GroupError::UnknownAggregate {
            label: label.to_owned(),
        })
    }
}

/// Hashable group key. Floats hash by bit pattern with NaN normalized so
/// every NaN lands in one group.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum GroupKey {
    Null,
    Bool(bool),
    Int64(i64),
    FloatBits(u64),
    Utf8(String),
}

impl GroupKey {
    fn from_scalar(key: &Scalar) -> Self {
        match key {
            Scalar::Null => Self::Null,
            Scalar::Bool(v) => Self::Bool(*v),
            Scalar::Int64(v) => Self::Int64(*v),
            Scalar::Float64(v) => Self::FloatBits(if v.is_nan() {
                f64::NAN.to_bits()
            } else {
                v.to_bits()
            }),
            Scalar::Utf8(v) => Self::Utf8(v.clone()),
        }
    }
}

struct GroupAcc {
    key: Scalar,
    count: usize,
    sums: Vec<f64>,
    numeric_counts: Vec<usize>,
    maxes: Vec<f64>,
}

impl GroupAcc {
    fn new(key: Scalar, width: usize) -> Self {
        Self {
            key,
            count: 0,
            sums: vec![0.0; width],
            numeric_counts: vec![0; width],
            maxes: vec![f64::NEG_INFINITY; width],
        }
    }
}

/// Key scalars one record contributes to: the scalar itself, every
/// distinct element for list fields, or Null when the field is missing.
fn key_scalars(record: &Record, field: &str) -> Vec<Scalar> {
    match record.get(field) {
        None => vec![Scalar::Null],
        Some(FieldValue::Scalar(value)) => vec![value.clone()],
        Some(FieldValue::List(values)) => {
            if values.is_empty() {
                return vec![Scalar::Null];
            }
            let mut seen = Vec::<GroupKey>::new();
            let mut keys = Vec::new();
            for value in values {
                let group_key = GroupKey::from_scalar(value);
                if !seen.contains(&group_key) {
                    seen.push(group_key);
                    keys.push(value.clone());
                }
            }
            keys
        }
    }
}

fn group_with<F>(
    records: &[Record],
    aggregates: &[AggregateSpec],
    options: GroupOptions,
    key_fn: F,
) -> Vec<GroupSummary>
where
    F: Fn(&Record) -> Vec<Scalar>,
{
    let mut slots = HashMap::<GroupKey, usize>::new();
    let mut accs = Vec::<GroupAcc>::new();

    for record in records {
        for key in key_fn(record) {
            if options.drop_missing_keys && key.is_missing() {
                continue;
            }

            let next = accs.len();
            let slot = *slots.entry(GroupKey::from_scalar(&key)).or_insert(next);
            if slot == next {
                accs.push(GroupAcc::new(key, aggregates.len()));
            }

            let acc = &mut accs[slot];
            acc.count += 1;
            for (i, spec) in aggregates.iter().enumerate() {
                if let Ok(value) = record.scalar_or_null(&spec.field).to_f64() {
                    acc.sums[i] += value;
                    acc.numeric_counts[i] += 1;
                    acc.maxes[i] = acc.maxes[i].max(value);
                }
            }
        }
    }

    accs.into_iter()
        .map(|acc| {
            let mut out = BTreeMap::new();
            for (i, spec) in aggregates.iter().enumerate() {
                let n = acc.numeric_counts[i];
                let value = match spec.op {
                    AggregateOp::Sum => acc.sums[i],
                    AggregateOp::Avg => {
                        if n == 0 {
                            0.0
                        } else {
                            acc.sums[i] / n as f64
                        }
                    }
                    AggregateOp::Max => {
                        if n == 0 {
                            0.0
                        } else {
                            acc.maxes[i]
                        }
                    }
                };
                out.insert(spec.label(), value);
            }
            GroupSummary {
                key: acc.key,
                count: acc.count,
                aggregates: out,
            }
        })
        .collect()
}
