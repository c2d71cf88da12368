#![forbid(unsafe_code)]

use cl_record::{FieldCatalog, Record};
use cl_types::{FieldValue, Scalar};
use csv::{ReaderBuilder, WriterBuilder};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("csv input has no headers")]
    MissingHeaders,
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Parse a JSON array of objects (the shape the dashboard endpoints
/// return) into records. Cell typing falls out of the untagged
/// `Scalar`/`FieldValue` model.
pub fn records_from_json_str(input: &str) -> Result<Vec<Record>, IoError> {
    Ok(serde_json::from_str(input)?)
}

/// Parse headered CSV into records. Cells try i64, then f64, then bool,
/// and fall back to text; empty cells become Null so sparse exports keep
/// their columns.
pub fn records_from_csv_str(input: &str) -> Result<Vec<Record>, IoError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes());

    let headers = reader.headers().cloned()?;
    if headers.is_empty() {
        return Err(IoError::MissingHeaders);
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let record = Record::from_pairs(headers.iter().enumerate().map(|(idx, header)| {
            (
                header.to_owned(),
                FieldValue::Scalar(parse_scalar(row.get(idx).unwrap_or_default())),
            )
        }));
        records.push(record);
    }

    Ok(records)
}

/// Render records as CSV for table downloads. Columns are the catalog's
/// field names in sorted order; missing cells render empty; list cells
/// join their elements with `|`.
pub fn records_to_csv_string(records: &[Record]) -> Result<String, IoError> {
    let catalog = FieldCatalog::from_records(records);
    let headers: Vec<&str> = catalog.names().collect();

    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(&headers)?;

    for record in records {
        let row: Vec<String> = headers
            .iter()
            .map(|header| {
                record
                    .get(header)
                    .map_or_else(String::new, field_to_csv)
            })
            .collect();
        writer.write_record(&row)?;
    }

    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

fn parse_scalar(field: &str) -> Scalar {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Scalar::Null;
    }

    if let Ok(value) = trimmed.parse::<i64>() {
        return Scalar::Int64(value);
    }
    if let Ok(value) = trimmed.parse::<f64>() {
        return Scalar::Float64(value);
    }
    if let Ok(value) = trimmed.parse::<bool>() {
        return Scalar::Bool(value);
    }

    Scalar::Utf8(trimmed.to_owned())
}

fn field_to_csv(value: &FieldValue) -> String {
    match value {
        FieldValue::Scalar(scalar) => scalar.to_string(),
        FieldValue::List(values) => values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("|"),
    }
}
