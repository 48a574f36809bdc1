//! CLI Exit Code Registry
//!
//! Single source of truth for `rowmatch` exit codes. Scripts branch on these,
//! so treat them as part of the shell contract.
//!
//! # Exit Codes
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Success (rejected rows are not a failure)                |
//! | 1    | General error (unspecified)                              |
//! | 2    | Usage error (bad args, unreadable job file)              |
//! | 3    | Invalid job config                                       |
//! | 4    | Required field missing for every match type, or a header |
//! |      | maps ambiguously                                         |
//! | 5    | Runtime error (CSV read/parse, output write, worker pool)|
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant below
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Map it in `CliError::from(MatchError)` or the command that raises it

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - every runnable match type produced a complete table.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code. Raised for broken engine
/// invariants.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, job file missing or unreadable.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Matching (3-5)
// =============================================================================

/// Job config failed to parse or validate (thresholds, weights, unknown
/// passthrough column, explicit column not in the CSV header).
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// No match type can run because a required field is unmapped, or two
/// headers map to the same field.
pub const EXIT_MISSING_FIELD: u8 = 4;

/// Runtime failure: CSV could not be read or parsed, output could not be
/// written, worker pool could not start.
pub const EXIT_RUNTIME: u8 = 5;
