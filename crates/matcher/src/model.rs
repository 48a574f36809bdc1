use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One source row: column name -> raw text, in the order the columns were read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    fields: Vec<(String, String)>,
    line: Option<u64>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            line: None,
        }
    }

    /// Tag the record with its 1-based line in the source file (header is 1).
    pub fn with_line(mut self, line: u64) -> Self {
        self.line = Some(line);
        self
    }

    pub fn line(&self) -> Option<u64> {
        self.line
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.fields.push((column.into(), value.into()));
    }

    /// Raw value of `column`. First occurrence wins on duplicate headers.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Canonical fields the normalizer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    FirstName,
    LastName,
    FullName,
    Address1,
    Address2,
    City,
    State,
    Zip,
    FullAddress,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::FirstName,
        Field::LastName,
        Field::FullName,
        Field::Address1,
        Field::Address2,
        Field::City,
        Field::State,
        Field::Zip,
        Field::FullAddress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstName => "FirstName",
            Self::LastName => "LastName",
            Self::FullName => "FullName",
            Self::Address1 => "Address1",
            Self::Address2 => "Address2",
            Self::City => "City",
            Self::State => "State",
            Self::Zip => "Zip",
            Self::FullAddress => "FullAddress",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which source column holds each canonical field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldMapping {
    columns: BTreeMap<Field, String>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: Field, column: impl Into<String>) -> Self {
        self.insert(field, column);
        self
    }

    pub fn insert(&mut self, field: Field, column: impl Into<String>) {
        self.columns.insert(field, column.into());
    }

    pub fn column(&self, field: Field) -> Option<&str> {
        self.columns.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.columns.contains_key(&field)
    }

    /// Mapped value for `field`, `None` when unmapped or blank.
    pub fn value<'r>(&self, record: &'r RawRecord, field: Field) -> Option<&'r str> {
        let column = self.columns.get(&field)?;
        record
            .get(column)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.columns.iter().map(|(f, c)| (*f, c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A row collection plus its declared field mapping.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub mapping: FieldMapping,
    pub records: Vec<RawRecord>,
}

impl Dataset {
    pub fn new(mapping: FieldMapping, records: Vec<RawRecord>) -> Self {
        Self { mapping, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Pre-loaded input (small) and master (large) datasets.
#[derive(Debug, Clone, Default)]
pub struct MatchInput {
    pub input: Dataset,
    pub master: Dataset,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Canonical, comparable keys derived from one `RawRecord`.
///
/// Text keys are space-joined lower-case tokens; an empty string means the
/// source had nothing usable for that component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct NormalizedRecord {
    pub full_name_key: String,
    pub last_name_key: String,
    pub first_name_key: String,
    pub name_suffix: Option<String>,
    pub house_number: Option<u32>,
    pub street_key: String,
    pub unit_key: Option<String>,
    pub city_key: String,
    pub state_key: String,
    pub zip_key: String,
    pub full_address_key: String,
}

impl NormalizedRecord {
    pub fn full_name_tokens(&self) -> Vec<&str> {
        self.full_name_key.split_whitespace().collect()
    }

    pub fn street_tokens(&self) -> Vec<&str> {
        self.street_key.split_whitespace().collect()
    }

    pub fn has_full_name(&self) -> bool {
        !self.first_name_key.is_empty() && !self.last_name_key.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Match types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    FullName,
    LastNameAddress,
    FullAddress,
}

/// Which block family a match type draws candidates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Surname,
    Address,
}

impl MatchType {
    pub const ALL: [MatchType; 3] = [
        MatchType::FullName,
        MatchType::LastNameAddress,
        MatchType::FullAddress,
    ];

    /// Human label, also used as the output table name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::FullName => "Full Name",
            Self::LastNameAddress => "Last Name + Address",
            Self::FullAddress => "Full Address",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullName => "full_name",
            Self::LastNameAddress => "last_name_address",
            Self::FullAddress => "full_address",
        }
    }

    pub fn block_kind(&self) -> BlockKind {
        match self {
            Self::FullName => BlockKind::Surname,
            Self::LastNameAddress | Self::FullAddress => BlockKind::Address,
        }
    }

    /// First required field `mapping` cannot supply, if any.
    ///
    /// A `FullName` column stands in for first + last name, a `FullAddress`
    /// column for the address line.
    pub fn missing_field(&self, mapping: &FieldMapping) -> Option<Field> {
        let has_surname = mapping.contains(Field::LastName) || mapping.contains(Field::FullName);
        let has_address =
            mapping.contains(Field::Address1) || mapping.contains(Field::FullAddress);
        match self {
            Self::FullName => {
                if mapping.contains(Field::FullName) {
                    None
                } else if !mapping.contains(Field::FirstName) {
                    Some(Field::FirstName)
                } else if !mapping.contains(Field::LastName) {
                    Some(Field::LastName)
                } else {
                    None
                }
            }
            Self::LastNameAddress => {
                if !has_surname {
                    Some(Field::LastName)
                } else if !has_address {
                    Some(Field::Address1)
                } else {
                    None
                }
            }
            Self::FullAddress => (!has_address).then_some(Field::Address1),
        }
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Scoring + selection
// ---------------------------------------------------------------------------

/// One candidate after scoring for a single match type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoredCandidate {
    pub master_row: usize,
    pub score: u8,
    /// |input house number - candidate house number| when both are known.
    pub house_distance: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunnerUp {
    pub master_row: usize,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub input_row: usize,
    pub match_type: MatchType,
    pub master_row: Option<usize>,
    pub score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runner_up: Option<RunnerUp>,
}

impl MatchResult {
    pub fn accepted(
        input_row: usize,
        match_type: MatchType,
        winner: &ScoredCandidate,
        runner_up: Option<RunnerUp>,
    ) -> Self {
        Self {
            input_row,
            match_type,
            master_row: Some(winner.master_row),
            score: Some(winner.score),
            runner_up,
        }
    }

    pub fn rejected(input_row: usize, match_type: MatchType) -> Self {
        Self {
            input_row,
            match_type,
            master_row: None,
            score: None,
            runner_up: None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.master_row.is_some()
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MatchTable {
    pub match_type: MatchType,
    pub label: String,
    pub accepted: usize,
    pub rejected: usize,
    pub results: Vec<MatchResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeSummary {
    pub match_type: MatchType,
    pub accepted: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedMatchType {
    pub match_type: MatchType,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub input_rows: usize,
    pub master_rows: usize,
    pub types: Vec<TypeSummary>,
    pub skipped: Vec<SkippedMatchType>,
    /// Input rows accepted by no match type.
    pub unmatched: usize,
}

impl RunSummary {
    pub fn accepted(&self, match_type: MatchType) -> usize {
        self.types
            .iter()
            .find(|t| t.match_type == match_type)
            .map(|t| t.accepted)
            .unwrap_or(0)
    }

    pub fn total_accepted(&self) -> usize {
        self.types.iter().map(|t| t.accepted).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchOutput {
    pub meta: MatchMeta,
    pub summary: RunSummary,
    pub tables: Vec<MatchTable>,
    /// Input row indices accepted by no match type, ascending.
    pub unmatched: Vec<usize>,
}

impl MatchOutput {
    pub fn table(&self, match_type: MatchType) -> Option<&MatchTable> {
        self.tables.iter().find(|t| t.match_type == match_type)
    }
}
