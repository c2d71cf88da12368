#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use cl_types::{FieldValue, Scalar};
use serde::{Deserialize, Serialize};

/// One row of tabular input: a costed line item, a vendor rollup row, an
/// additional-cost entry. Records are opaque field maps; the engine never
/// mutates one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let fields = pairs
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        Self { fields }
    }

    /// Builder-style field insert, mainly for tests and fixtures.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// First scalar of the field, `Scalar::Null` when the field is absent
    /// or empty. The defaulting entry point for sort keys and aggregates.
    #[must_use]
    pub fn scalar_or_null(&self, field: &str) -> Scalar {
        self.get(field)
            .and_then(FieldValue::first)
            .cloned()
            .unwrap_or(Scalar::Null)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Union of field names across a record set. Predicates, sort fields,
/// group keys and aggregate fields are validated against this before a
/// query runs; a name missing from every record is a configuration error
/// in the calling view, not sparse data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldCatalog {
    names: BTreeSet<String>,
}

impl FieldCatalog {
    #[must_use]
    pub fn from_records(records: &[Record]) -> Self {
        let names = records
            .iter()
            .flat_map(Record::field_names)
            .map(str::to_owned)
            .collect();
        Self { names }
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.names.contains(field)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Split a BOM-style path into trimmed segments. Source data carries both
/// arrow-delimited ("Chassis > Frame > Bracket") and slash-delimited
/// ("Chassis/Frame/Bracket") paths.
#[must_use]
pub fn path_segments(path: &str) -> Vec<String> {
    path.split(['>', '/'])
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use cl_types::{FieldValue, Scalar};

    use super::{FieldCatalog, Record, path_segments};

    #[test]
    fn record_deserializes_from_payload_object() {
        let record: Record = serde_json::from_str(
            r#"{"item_code": "X1-100", "vendor": "Acme", "tags": ["freight", "testing"], "total_amount": 129.5}"#,
        )
        .expect("record parses");

        assert_eq!(record.scalar_or_null("vendor"), Scalar::from("Acme"));
        assert_eq!(
            record.get("tags"),
            Some(&FieldValue::List(vec![
                Scalar::from("freight"),
                Scalar::from("testing")
            ]))
        );
        assert_eq!(record.scalar_or_null("total_amount"), Scalar::Float64(129.5));
        assert_eq!(record.scalar_or_null("missing"), Scalar::Null);
    }

    #[test]
    fn catalog_is_the_union_over_sparse_records() {
        let records = vec![
            Record::from_pairs([("vendor", Scalar::from("Acme"))]),
            Record::from_pairs([("cost", Scalar::Int64(10))]),
        ];
        let catalog = FieldCatalog::from_records(&records);

        assert!(catalog.contains("vendor"));
        assert!(catalog.contains("cost"));
        assert!(!catalog.contains("bom_path"));
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn path_segments_accept_both_delimiters() {
        assert_eq!(
            path_segments("Chassis > Frame > Bracket"),
            vec!["Chassis", "Frame", "Bracket"]
        );
        assert_eq!(path_segments("Chassis/Frame"), vec!["Chassis", "Frame"]);
        assert_eq!(path_segments("  "), Vec::<String>::new());
    }
}
