//! CSV text -> `RawRecord`s, and header-synonym detection.

use std::collections::BTreeMap;

use crate::config::ColumnMapping;
use crate::error::MatchError;
use crate::model::{Dataset, Field, FieldMapping, RawRecord};

/// Header synonyms, compared after `header_key` folding.
const SYNONYMS: &[(Field, &[&str])] = &[
    (Field::FirstName, &["firstname", "first", "fname", "givenname"]),
    (Field::LastName, &["lastname", "last", "lname", "surname", "familyname"]),
    (
        Field::FullName,
        &["fullname", "name", "customername", "clientname", "contactname"],
    ),
    (
        Field::Address1,
        &["address1", "address", "addr1", "streetaddress", "street", "addressline1"],
    ),
    (Field::Address2, &["address2", "addr2", "addressline2"]),
    (Field::City, &["city", "town", "municipality", "locality"]),
    (Field::State, &["state", "st", "province", "region"]),
    (Field::Zip, &["zip", "zip5", "zipcode", "postalcode", "postcode"]),
    (Field::FullAddress, &["fulladdress", "mailingaddress"]),
];

/// Lower-case, letters and digits only: `"Address Line 1"` -> `"addressline1"`.
pub fn header_key(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn field_for_header(header: &str) -> Option<Field> {
    let key = header_key(header);
    SYNONYMS
        .iter()
        .find(|(_, names)| names.contains(&key.as_str()))
        .map(|(field, _)| *field)
}

/// Parse CSV text with a header row. Short rows are padded with empty values;
/// blank rows are skipped, so each record carries its source line.
pub fn load_csv_records(csv_data: &str) -> Result<(Vec<String>, Vec<RawRecord>), MatchError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| MatchError::Csv(e.to_string()))?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.trim().to_string()
        })
        .collect();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| MatchError::Csv(e.to_string()))?;
        if row.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        let mut record = RawRecord::new();
        for (i, header) in headers.iter().enumerate() {
            record.push(header.clone(), row.get(i).unwrap_or(""));
        }
        if let Some(pos) = row.position() {
            record = record.with_line(pos.line());
        }
        records.push(record);
    }

    Ok((headers, records))
}

/// Map headers to fields by synonym. Two headers for one field is an error.
pub fn detect_mapping(headers: &[String], dataset: &str) -> Result<FieldMapping, MatchError> {
    let mut found: BTreeMap<Field, Vec<String>> = BTreeMap::new();
    for header in headers {
        if let Some(field) = field_for_header(header) {
            found.entry(field).or_default().push(header.clone());
        }
    }

    let mut mapping = FieldMapping::new();
    for (field, columns) in found {
        if columns.len() > 1 {
            return Err(MatchError::AmbiguousHeader {
                dataset: dataset.to_string(),
                field,
                columns,
            });
        }
        if let Some(column) = columns.into_iter().next() {
            mapping.insert(field, column);
        }
    }
    Ok(mapping)
}

/// Explicit columns when configured (every named column must exist),
/// otherwise synonym detection.
pub fn resolve_mapping(
    headers: &[String],
    dataset: &str,
    explicit: Option<&ColumnMapping>,
) -> Result<FieldMapping, MatchError> {
    let Some(explicit) = explicit else {
        return detect_mapping(headers, dataset);
    };
    let mapping = explicit.to_field_mapping();
    for (field, column) in mapping.iter() {
        if !headers.iter().any(|h| h == column) {
            return Err(MatchError::ConfigValidation(format!(
                "{dataset}.columns: column '{column}' for {field} not found in headers"
            )));
        }
    }
    Ok(mapping)
}

/// Load one CSV into a `Dataset` with its resolved mapping.
pub fn load_dataset(
    csv_data: &str,
    dataset: &str,
    explicit: Option<&ColumnMapping>,
) -> Result<(Vec<String>, Dataset), MatchError> {
    let (headers, records) = load_csv_records(csv_data)?;
    let mapping = resolve_mapping(&headers, dataset, explicit)?;
    Ok((headers, Dataset::new(mapping, records)))
}
