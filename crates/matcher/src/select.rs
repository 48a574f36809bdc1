use std::cmp::Ordering;

use crate::blocking::CandidateSet;
use crate::error::MatchError;
use crate::model::{MatchResult, MatchType, NormalizedRecord, RunnerUp, ScoredCandidate};
use crate::scorer::Scorer;

/// Per (input row, match type) selection state.
///
/// `Unscored -> Scored -> Accepted | Rejected`. Only the terminal states turn
/// into a `MatchResult`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Unscored,
    Scored(Vec<ScoredCandidate>),
    Accepted {
        winner: ScoredCandidate,
        runner_up: Option<ScoredCandidate>,
    },
    Rejected,
}

/// Score desc, then smaller house distance (known before unknown), then
/// lower master row id.
pub fn rank_order(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| match (a.house_distance, b.house_distance) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.master_row.cmp(&b.master_row))
}

fn house_distance(a: Option<u32>, b: Option<u32>) -> Option<u64> {
    Some(u64::from(a?.abs_diff(b?)))
}

impl Selection {
    /// Scores every candidate and ranks them.
    pub fn score(
        self,
        input: &NormalizedRecord,
        candidates: &CandidateSet<'_>,
        scorer: &Scorer<'_>,
        match_type: MatchType,
    ) -> Self {
        if self != Selection::Unscored {
            return self;
        }
        let mut scored: Vec<ScoredCandidate> = candidates
            .candidates
            .iter()
            .map(|(row, master)| ScoredCandidate {
                master_row: *row,
                score: scorer.score(input, master, match_type),
                house_distance: house_distance(input.house_number, master.house_number),
            })
            .collect();
        scored.sort_by(rank_order);
        Selection::Scored(scored)
    }

    /// Accept the top candidate when it reaches `threshold`.
    pub fn decide(self, threshold: u8) -> Self {
        match self {
            Selection::Scored(ranked) => {
                let mut ranked = ranked.into_iter();
                match ranked.next() {
                    Some(winner) if winner.score >= threshold => Selection::Accepted {
                        winner,
                        runner_up: ranked.next(),
                    },
                    _ => Selection::Rejected,
                }
            }
            other => other,
        }
    }

    pub fn into_result(
        self,
        input_row: usize,
        match_type: MatchType,
        with_runner_up: bool,
    ) -> Result<MatchResult, MatchError> {
        match self {
            Selection::Accepted { winner, runner_up } => {
                let runner_up = runner_up.filter(|_| with_runner_up).map(|r| RunnerUp {
                    master_row: r.master_row,
                    score: r.score,
                });
                Ok(MatchResult::accepted(input_row, match_type, &winner, runner_up))
            }
            Selection::Rejected => Ok(MatchResult::rejected(input_row, match_type)),
            Selection::Unscored | Selection::Scored(_) => Err(MatchError::Internal(format!(
                "input row {input_row}: {match_type} selection finished without a decision"
            ))),
        }
    }
}
