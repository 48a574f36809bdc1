use serde::Deserialize;

use crate::error::MatchError;
use crate::model::{Field, FieldMapping, MatchType};
use crate::vocab::VocabularyConfig;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MatchConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub input: DatasetConfig,
    #[serde(default)]
    pub master: DatasetConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub blocking: BlockingConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub vocabulary: VocabularyConfig,
}

fn default_name() -> String {
    "rowmatch".into()
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            input: DatasetConfig::default(),
            master: DatasetConfig::default(),
            scoring: ScoringConfig::default(),
            blocking: BlockingConfig::default(),
            run: RunConfig::default(),
            vocabulary: VocabularyConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatasetConfig {
    /// CSV path, relative to the job file.
    #[serde(default)]
    pub file: Option<String>,
    /// Explicit mapping. When absent, columns are detected from headers.
    #[serde(default)]
    pub columns: Option<ColumnMapping>,
    /// Extra source columns copied to the output (e.g. `Opens`).
    #[serde(default)]
    pub passthrough: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColumnMapping {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub full_address: Option<String>,
}

impl ColumnMapping {
    pub fn to_field_mapping(&self) -> FieldMapping {
        let mut mapping = FieldMapping::new();
        let pairs = [
            (Field::FirstName, &self.first_name),
            (Field::LastName, &self.last_name),
            (Field::FullName, &self.full_name),
            (Field::Address1, &self.address1),
            (Field::Address2, &self.address2),
            (Field::City, &self.city),
            (Field::State, &self.state),
            (Field::Zip, &self.zip),
            (Field::FullAddress, &self.full_address),
        ];
        for (field, column) in pairs {
            if let Some(column) = column {
                mapping.insert(field, column.clone());
            }
        }
        mapping
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub thresholds: Thresholds,
    /// Minimum surname edit similarity for Last Name + Address.
    #[serde(default = "default_surname_floor")]
    pub surname_floor: u8,
    /// City similarity below this counts as a different city (0).
    #[serde(default = "default_city_floor")]
    pub city_floor: u8,
    #[serde(default)]
    pub one_sided_unit: OneSidedUnit,
    #[serde(default)]
    pub weights: Weights,
}

fn default_surname_floor() -> u8 {
    85
}

fn default_city_floor() -> u8 {
    80
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            surname_floor: default_surname_floor(),
            city_floor: default_city_floor(),
            one_sided_unit: OneSidedUnit::default(),
            weights: Weights::default(),
        }
    }
}

impl ScoringConfig {
    pub fn threshold(&self, match_type: MatchType) -> u8 {
        match match_type {
            MatchType::FullName => self.thresholds.full_name,
            MatchType::LastNameAddress => self.thresholds.last_name_address,
            MatchType::FullAddress => self.thresholds.full_address,
        }
    }

    /// Unit credit when only one side carries a unit. Full Name never reads it.
    pub fn one_sided_unit(&self, match_type: MatchType) -> u8 {
        match match_type {
            MatchType::FullName => 0,
            MatchType::LastNameAddress => self.one_sided_unit.last_name_address,
            MatchType::FullAddress => self.one_sided_unit.full_address,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub full_name: u8,
    pub last_name_address: u8,
    pub full_address: u8,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            full_name: 85,
            last_name_address: 85,
            full_address: 90,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OneSidedUnit {
    pub last_name_address: u8,
    pub full_address: u8,
}

impl Default for OneSidedUnit {
    fn default() -> Self {
        Self {
            last_name_address: 100,
            full_address: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Weights {
    #[serde(default)]
    pub last_name_address: LastNameAddressWeights,
    #[serde(default)]
    pub full_address: FullAddressWeights,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LastNameAddressWeights {
    pub surname: f64,
    pub house_number: f64,
    pub street: f64,
    pub unit: f64,
}

impl Default for LastNameAddressWeights {
    fn default() -> Self {
        Self {
            surname: 0.30,
            house_number: 0.30,
            street: 0.30,
            unit: 0.10,
        }
    }
}

impl LastNameAddressWeights {
    fn all(&self) -> [(&'static str, f64); 4] {
        [
            ("surname", self.surname),
            ("house_number", self.house_number),
            ("street", self.street),
            ("unit", self.unit),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FullAddressWeights {
    pub house_number: f64,
    pub street: f64,
    pub unit: f64,
    pub city: f64,
    pub state: f64,
    pub zip: f64,
}

impl Default for FullAddressWeights {
    fn default() -> Self {
        Self {
            house_number: 0.30,
            street: 0.25,
            unit: 0.15,
            city: 0.12,
            state: 0.05,
            zip: 0.13,
        }
    }
}

impl FullAddressWeights {
    fn all(&self) -> [(&'static str, f64); 6] {
        [
            ("house_number", self.house_number),
            ("street", self.street),
            ("unit", self.unit),
            ("city", self.city),
            ("state", self.state),
            ("zip", self.zip),
        ]
    }
}

// ---------------------------------------------------------------------------
// Blocking + Run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BlockingConfig {
    /// Characters of the surname used by the relaxed surname block.
    pub surname_prefix_len: usize,
    /// Cap on candidates per lookup; the lowest row ids are kept.
    pub max_candidates: usize,
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            surname_prefix_len: 4,
            max_candidates: 512,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Worker threads; 0 means one per CPU.
    pub workers: usize,
    /// Report the second-ranked candidate on accepted rows.
    pub runner_up: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            runner_up: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl MatchConfig {
    pub fn from_toml(input: &str) -> Result<Self, MatchError> {
        let config: MatchConfig =
            toml::from_str(input).map_err(|e| MatchError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        let s = &self.scoring;
        let percentages = [
            ("thresholds.full_name", s.thresholds.full_name),
            ("thresholds.last_name_address", s.thresholds.last_name_address),
            ("thresholds.full_address", s.thresholds.full_address),
            ("surname_floor", s.surname_floor),
            ("city_floor", s.city_floor),
            ("one_sided_unit.last_name_address", s.one_sided_unit.last_name_address),
            ("one_sided_unit.full_address", s.one_sided_unit.full_address),
        ];
        for (key, value) in percentages {
            if value > 100 {
                return Err(MatchError::ConfigValidation(format!(
                    "scoring.{key} must be between 0 and 100, got {value}"
                )));
            }
        }

        check_weights("last_name_address", &s.weights.last_name_address.all())?;
        check_weights("full_address", &s.weights.full_address.all())?;

        if self.blocking.surname_prefix_len == 0 {
            return Err(MatchError::ConfigValidation(
                "blocking.surname_prefix_len must be at least 1".into(),
            ));
        }
        if self.blocking.max_candidates == 0 {
            return Err(MatchError::ConfigValidation(
                "blocking.max_candidates must be at least 1".into(),
            ));
        }

        for (dataset, cfg) in [("input", &self.input), ("master", &self.master)] {
            if cfg.passthrough.iter().any(|c| c.trim().is_empty()) {
                return Err(MatchError::ConfigValidation(format!(
                    "{dataset}.passthrough contains an empty column name"
                )));
            }
        }

        Ok(())
    }
}

fn check_weights(match_type: &str, weights: &[(&str, f64)]) -> Result<(), MatchError> {
    for (component, w) in weights {
        if !w.is_finite() || *w < 0.0 {
            return Err(MatchError::ConfigValidation(format!(
                "scoring.weights.{match_type}.{component} must be a non-negative number, got {w}"
            )));
        }
    }
    let total: f64 = weights.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return Err(MatchError::ConfigValidation(format!(
            "scoring.weights.{match_type} must have a positive sum"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_JOB: &str = r#"
name = "Mailing list vs CRM"

[input]
file = "input.csv"

[input.columns]
first_name = "First"
last_name  = "Last"
address1   = "Street"
city       = "Town"
zip        = "Zip"

[master]
file = "master.csv"
passthrough = ["Opens"]

[scoring]
surname_floor = 80

[scoring.thresholds]
full_address = 92

[scoring.weights.full_address]
zip = 0.20

[blocking]
max_candidates = 64

[run]
workers = 2
runner_up = false

[vocabulary.street_suffixes]
terr = "terrace"
"#;

    #[test]
    fn parse_full_job() {
        let config = MatchConfig::from_toml(FULL_JOB).unwrap();
        assert_eq!(config.name, "Mailing list vs CRM");
        assert_eq!(config.input.file.as_deref(), Some("input.csv"));
        let mapping = config.input.columns.as_ref().unwrap().to_field_mapping();
        assert_eq!(mapping.column(Field::City), Some("Town"));
        assert_eq!(mapping.column(Field::State), None);
        assert!(config.master.columns.is_none());
        assert_eq!(config.master.passthrough, vec!["Opens"]);
        assert_eq!(config.scoring.surname_floor, 80);
        assert_eq!(config.scoring.threshold(MatchType::FullAddress), 92);
        assert_eq!(config.scoring.threshold(MatchType::FullName), 85);
        assert_eq!(config.scoring.weights.full_address.zip, 0.20);
        assert_eq!(config.scoring.weights.full_address.house_number, 0.30);
        assert_eq!(config.blocking.max_candidates, 64);
        assert_eq!(config.blocking.surname_prefix_len, 4);
        assert_eq!(config.run.workers, 2);
        assert!(!config.run.runner_up);
        assert_eq!(config.vocabulary.street_suffixes.get("terr").map(String::as_str), Some("terrace"));
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = MatchConfig::from_toml("").unwrap();
        assert_eq!(config.name, "rowmatch");
        assert_eq!(config.scoring.threshold(MatchType::LastNameAddress), 85);
        assert_eq!(config.scoring.surname_floor, 85);
        assert_eq!(config.scoring.one_sided_unit(MatchType::LastNameAddress), 100);
        assert_eq!(config.scoring.one_sided_unit(MatchType::FullAddress), 0);
        assert!(config.run.runner_up);
        assert_eq!(config.run.workers, 0);
    }

    #[test]
    fn reject_threshold_above_100() {
        let err = MatchConfig::from_toml("[scoring.thresholds]\nfull_name = 101\n").unwrap_err();
        assert!(matches!(err, MatchError::ConfigValidation(ref m) if m.contains("full_name")));
    }

    #[test]
    fn reject_negative_weight() {
        let err =
            MatchConfig::from_toml("[scoring.weights.last_name_address]\nunit = -0.1\n").unwrap_err();
        assert!(matches!(err, MatchError::ConfigValidation(ref m) if m.contains("unit")));
    }

    #[test]
    fn reject_zero_weight_sum() {
        let input = r#"
[scoring.weights.last_name_address]
surname = 0.0
house_number = 0.0
street = 0.0
unit = 0.0
"#;
        let err = MatchConfig::from_toml(input).unwrap_err();
        assert!(matches!(err, MatchError::ConfigValidation(ref m) if m.contains("positive sum")));
    }

    #[test]
    fn reject_zero_blocking_limits() {
        assert!(MatchConfig::from_toml("[blocking]\nsurname_prefix_len = 0\n").is_err());
        assert!(MatchConfig::from_toml("[blocking]\nmax_candidates = 0\n").is_err());
    }

    #[test]
    fn reject_wrong_type() {
        let err = MatchConfig::from_toml("[run]\nworkers = \"four\"\n").unwrap_err();
        assert!(matches!(err, MatchError::ConfigParse(_)));
    }
}
