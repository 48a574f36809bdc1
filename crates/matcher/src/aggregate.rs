use crate::error::MatchError;
use crate::model::{MatchResult, MatchTable, MatchType, RunSummary, SkippedMatchType, TypeSummary};

/// Collects results into one slot per (match type, input row), so tables come
/// out in input order no matter which worker finished first.
#[derive(Debug)]
pub struct ResultAggregator {
    input_rows: usize,
    tables: Vec<(MatchType, Vec<Option<MatchResult>>)>,
}

impl ResultAggregator {
    pub fn new(match_types: &[MatchType], input_rows: usize) -> Self {
        Self {
            input_rows,
            tables: match_types
                .iter()
                .map(|mt| (*mt, vec![None; input_rows]))
                .collect(),
        }
    }

    pub fn place(&mut self, result: MatchResult) -> Result<(), MatchError> {
        let input_rows = self.input_rows;
        let (_, slots) = self
            .tables
            .iter_mut()
            .find(|(mt, _)| *mt == result.match_type)
            .ok_or_else(|| {
                MatchError::Internal(format!("no table for match type {}", result.match_type))
            })?;
        let slot = slots.get_mut(result.input_row).ok_or_else(|| {
            MatchError::Internal(format!(
                "input row {} out of range ({input_rows} rows)",
                result.input_row
            ))
        })?;
        if slot.is_some() {
            return Err(MatchError::Internal(format!(
                "input row {}: duplicate {} result",
                result.input_row, result.match_type
            )));
        }
        *slot = Some(result);
        Ok(())
    }

    /// One table per match type. A slot left empty is an internal error.
    pub fn finish(self) -> Result<Vec<MatchTable>, MatchError> {
        self.tables
            .into_iter()
            .map(|(match_type, slots)| {
                let results = slots
                    .into_iter()
                    .enumerate()
                    .map(|(row, slot)| {
                        slot.ok_or_else(|| {
                            MatchError::Internal(format!(
                                "input row {row}: missing {match_type} result"
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let accepted = results.iter().filter(|r| r.is_accepted()).count();
                Ok(MatchTable {
                    match_type,
                    label: match_type.label().to_string(),
                    accepted,
                    rejected: results.len() - accepted,
                    results,
                })
            })
            .collect()
    }
}

/// Input rows that no table accepted, ascending.
pub fn unmatched_rows(tables: &[MatchTable], input_rows: usize) -> Vec<usize> {
    let mut matched = vec![false; input_rows];
    for result in tables.iter().flat_map(|t| &t.results) {
        if result.is_accepted() {
            if let Some(slot) = matched.get_mut(result.input_row) {
                *slot = true;
            }
        }
    }
    matched
        .iter()
        .enumerate()
        .filter(|(_, m)| !**m)
        .map(|(row, _)| row)
        .collect()
}

/// Accepted/rejected counts per table plus the types that could not run.
pub fn compute_summary(
    tables: &[MatchTable],
    input_rows: usize,
    master_rows: usize,
    skipped: Vec<SkippedMatchType>,
) -> RunSummary {
    RunSummary {
        input_rows,
        master_rows,
        types: tables
            .iter()
            .map(|t| TypeSummary {
                match_type: t.match_type,
                accepted: t.accepted,
                rejected: t.rejected,
            })
            .collect(),
        skipped,
        unmatched: unmatched_rows(tables, input_rows).len(),
    }
}
