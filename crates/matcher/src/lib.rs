//! `rowmatch-matcher` — Fuzzy name/address matching engine.
//!
//! Pure engine crate: receives pre-loaded input and master records, returns one
//! result table per match type. No CLI or file IO dependencies.

pub mod aggregate;
pub mod blocking;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod normalize;
pub mod scorer;
pub mod select;
pub mod similarity;
pub mod source;
pub mod vocab;

pub use config::MatchConfig;
pub use engine::{run, run_with_cancel, CancelToken};
pub use error::MatchError;
pub use model::{Dataset, MatchInput, MatchOutput, MatchResult, MatchTable, MatchType, RawRecord};
pub use normalize::Normalizer;
pub use vocab::Vocabulary;
