use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, trace, warn};
use rayon::prelude::*;

use crate::aggregate::{compute_summary, unmatched_rows, ResultAggregator};
use crate::blocking::BlockingIndex;
use crate::config::MatchConfig;
use crate::error::MatchError;
use crate::model::{
    FieldMapping, MatchInput, MatchMeta, MatchOutput, MatchResult, MatchTable, MatchType,
    NormalizedRecord, SkippedMatchType,
};
use crate::normalize::Normalizer;
use crate::scorer::Scorer;
use crate::select::Selection;
use crate::vocab::Vocabulary;

/// Shared cancellation flag, checked before each input row.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Run every runnable match type over `input`.
pub fn run(config: &MatchConfig, input: &MatchInput) -> Result<MatchOutput, MatchError> {
    run_with_cancel(config, input, &CancelToken::new())
}

/// `run`, stopping with `MatchError::Cancelled` once `cancel` is set. Nothing
/// computed before the cancellation is returned.
pub fn run_with_cancel(
    config: &MatchConfig,
    input: &MatchInput,
    cancel: &CancelToken,
) -> Result<MatchOutput, MatchError> {
    info!(
        "run '{}': {} input rows against {} master rows",
        config.name,
        input.input.len(),
        input.master.len()
    );

    let (runnable, skipped) = plan_match_types(&input.input.mapping, &input.master.mapping)?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.run.workers)
        .build()
        .map_err(|e| MatchError::WorkerPool(e.to_string()))?;

    let normalizer = Normalizer::new(Vocabulary::with_overrides(&config.vocabulary));
    let tables = pool.install(|| match_all(config, input, &normalizer, &runnable, cancel))?;

    let summary = compute_summary(&tables, input.input.len(), input.master.len(), skipped);
    let unmatched = unmatched_rows(&tables, input.input.len());
    for t in &summary.types {
        info!(
            "{}: {} accepted, {} rejected",
            t.match_type.label(),
            t.accepted,
            t.rejected
        );
    }
    info!("{} input rows matched under no type", summary.unmatched);

    Ok(MatchOutput {
        meta: MatchMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        tables,
        unmatched,
    })
}

/// Split match types into runnable and skipped. Fails with the first
/// missing-field error when nothing can run.
pub fn plan_match_types(
    input: &FieldMapping,
    master: &FieldMapping,
) -> Result<(Vec<MatchType>, Vec<SkippedMatchType>), MatchError> {
    let mut runnable = Vec::new();
    let mut skipped = Vec::new();
    let mut first_error = None;

    for match_type in MatchType::ALL {
        let missing = [("input", input), ("master", master)]
            .into_iter()
            .find_map(|(dataset, mapping)| {
                match_type
                    .missing_field(mapping)
                    .map(|field| MatchError::MissingField {
                        dataset: dataset.to_string(),
                        match_type,
                        field,
                    })
            });
        match missing {
            None => runnable.push(match_type),
            Some(err) => {
                warn!("skipping {} matching: {err}", match_type.label());
                skipped.push(SkippedMatchType {
                    match_type,
                    reason: err.to_string(),
                });
                first_error.get_or_insert(err);
            }
        }
    }

    match (runnable.is_empty(), first_error) {
        (true, Some(err)) => Err(err),
        _ => Ok((runnable, skipped)),
    }
}

fn match_all(
    config: &MatchConfig,
    input: &MatchInput,
    normalizer: &Normalizer,
    runnable: &[MatchType],
    cancel: &CancelToken,
) -> Result<Vec<MatchTable>, MatchError> {
    let master: Vec<NormalizedRecord> = input
        .master
        .records
        .par_iter()
        .map(|raw| normalizer.normalize(raw, &input.master.mapping))
        .collect();
    let index = BlockingIndex::build(&master, &config.blocking);
    debug!("blocking index: {} blocks over {} master rows", index.block_count(), master.len());

    let scorer = Scorer::new(&config.scoring);

    let rows: Vec<Option<Vec<MatchResult>>> = input
        .input
        .records
        .par_iter()
        .enumerate()
        .map(|(row, raw)| {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            let record = normalizer.normalize(raw, &input.input.mapping);
            runnable
                .iter()
                .map(|&mt| match_row(config, &index, &scorer, row, &record, mt))
                .collect::<Result<Vec<_>, _>>()
                .map(Some)
        })
        .collect::<Result<_, MatchError>>()?;

    if cancel.is_cancelled() || rows.iter().any(Option::is_none) {
        info!("run '{}' cancelled", config.name);
        return Err(MatchError::Cancelled);
    }

    let mut aggregator = ResultAggregator::new(runnable, input.input.len());
    for result in rows.into_iter().flatten().flatten() {
        aggregator.place(result)?;
    }
    aggregator.finish()
}

fn match_row(
    config: &MatchConfig,
    index: &BlockingIndex<'_>,
    scorer: &Scorer<'_>,
    row: usize,
    record: &NormalizedRecord,
    match_type: MatchType,
) -> Result<MatchResult, MatchError> {
    let candidates = index.candidates_for(record, match_type);
    trace!(
        "input row {row}: {match_type} {} candidates from {:?}{}",
        candidates.len(),
        candidates.key,
        if candidates.relaxed { " (relaxed)" } else { "" }
    );
    Selection::Unscored
        .score(record, &candidates, scorer, match_type)
        .decide(config.scoring.threshold(match_type))
        .into_result(row, match_type, config.run.runner_up)
}
