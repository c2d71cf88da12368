#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use unicode_casefold::UnicodeCaseFold;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DType {
    Null,
    Bool,
    Int64,
    Float64,
    Utf8,
}

/// One cell of input data. Untagged so REST payload cells deserialize
/// directly: JSON `null`/`true`/`3`/`3.5`/`"x"` map onto the variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    Utf8(String),
}

impl Scalar {
    #[must_use]
    pub fn dtype(&self) -> DType {
        match self {
            Self::Null => DType::Null,
            Self::Bool(_) => DType::Bool,
            Self::Int64(_) => DType::Int64,
            Self::Float64(_) => DType::Float64,
            Self::Utf8(_) => DType::Utf8,
        }
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Float64(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Equality across the Int64/Float64 seam and for NaN pairs. Untagged
    /// JSON parses `3` and `3.0` to different variants; selections built
    /// from one payload must still match records built from the other.
    #[must_use]
    pub fn semantic_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Float64(a), Self::Float64(b)) => (a.is_nan() && b.is_nan()) || (a == b),
            (Self::Int64(a), Self::Float64(b)) | (Self::Float64(b), Self::Int64(a)) => {
                *b == *a as f64
            }
            _ => self == other,
        }
    }

    pub fn to_f64(&self) -> Result<f64, TypeError> {
        match self {
            Self::Bool(v) => Ok(if *v { 1.0 } else { 0.0 }),
            Self::Int64(v) => Ok(*v as f64),
            Self::Float64(v) if v.is_nan() => Err(TypeError::ValueIsMissing),
            Self::Float64(v) => Ok(*v),
            Self::Null => Err(TypeError::ValueIsMissing),
            Self::Utf8(v) => Err(TypeError::NonNumericValue {
                value: v.clone(),
                dtype: DType::Utf8,
            }),
        }
    }

    /// Numeric view with the documented defaulting rule: missing and
    /// non-numeric values read as 0.
    #[must_use]
    pub fn numeric_or_zero(&self) -> f64 {
        self.to_f64().unwrap_or(0.0)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) if v.is_nan() => Ok(()),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Utf8(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float64(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Utf8(value.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Utf8(value)
    }
}

/// A record field: one scalar, or a list of scalars for array-valued
/// fields such as tags. Untagged so JSON arrays map onto the list form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
}

impl FieldValue {
    /// Uniform list view: a scalar reads as a one-element slice.
    #[must_use]
    pub fn scalars(&self) -> &[Scalar] {
        match self {
            Self::Scalar(value) => std::slice::from_ref(value),
            Self::List(values) => values,
        }
    }

    #[must_use]
    pub fn first(&self) -> Option<&Scalar> {
        self.scalars().first()
    }

    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Scalar(value) => value.is_missing(),
            Self::List(values) => values.is_empty(),
        }
    }
}

impl From<Scalar> for FieldValue {
    fn from(value: Scalar) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<Scalar>> for FieldValue {
    fn from(values: Vec<Scalar>) -> Self {
        Self::List(values)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeError {
    #[error("value {value:?} has non-numeric dtype {dtype:?}")]
    NonNumericValue { value: String, dtype: DType },
    #[error("value is missing")]
    ValueIsMissing,
}

/// Widen two dtypes. Total: mixed text/numeric columns widen to Utf8
/// instead of erroring, since sparse dashboard payloads must not crash a
/// sort or a group key decision.
#[must_use]
pub fn widen_dtype(left: DType, right: DType) -> DType {
    use DType::{Bool, Float64, Int64, Null, Utf8};

    match (left, right) {
        (Null, other) | (other, Null) => other,
        (Utf8, _) | (_, Utf8) => Utf8,
        (Float64, _) | (_, Float64) => Float64,
        (Int64, _) | (_, Int64) => Int64,
        (Bool, Bool) => Bool,
    }
}

pub fn infer_dtype<'a>(values: impl IntoIterator<Item = &'a Scalar>) -> DType {
    let mut current = DType::Null;
    for value in values {
        current = widen_dtype(current, value.dtype());
    }
    current
}

/// Unicode case fold, the normalization used for every case-insensitive
/// comparison in the engine (substring search, path prefixes, text sort).
#[must_use]
pub fn case_fold(input: &str) -> String {
    input.chars().case_fold().collect()
}
