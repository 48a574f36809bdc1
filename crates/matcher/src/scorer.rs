use crate::config::ScoringConfig;
use crate::model::{MatchType, NormalizedRecord};
use crate::similarity::{
    edit_similarity, exact_similarity, gated_edit_similarity, house_number_similarity,
    token_set_similarity, unit_similarity,
};

/// Scores one (input, candidate) pair for a match type, 0..=100.
#[derive(Debug, Clone, Copy)]
pub struct Scorer<'c> {
    scoring: &'c ScoringConfig,
}

impl<'c> Scorer<'c> {
    pub fn new(scoring: &'c ScoringConfig) -> Self {
        Self { scoring }
    }

    pub fn score(
        &self,
        input: &NormalizedRecord,
        candidate: &NormalizedRecord,
        match_type: MatchType,
    ) -> u8 {
        match match_type {
            MatchType::FullName => full_name(input, candidate),
            MatchType::LastNameAddress => self.last_name_address(input, candidate),
            MatchType::FullAddress => self.full_address(input, candidate),
        }
    }

    fn last_name_address(&self, input: &NormalizedRecord, candidate: &NormalizedRecord) -> u8 {
        let surname = edit_similarity(&input.last_name_key, &candidate.last_name_key);
        if surname < f64::from(self.scoring.surname_floor) {
            return 0;
        }
        let w = &self.scoring.weights.last_name_address;
        combine(&[
            (w.surname, surname),
            (
                w.house_number,
                house_number_similarity(input.house_number, candidate.house_number),
            ),
            (w.street, street_similarity(input, candidate)),
            (
                w.unit,
                unit_similarity(
                    input.unit_key.as_deref(),
                    candidate.unit_key.as_deref(),
                    self.scoring.one_sided_unit(MatchType::LastNameAddress),
                ),
            ),
        ])
    }

    fn full_address(&self, input: &NormalizedRecord, candidate: &NormalizedRecord) -> u8 {
        let w = &self.scoring.weights.full_address;
        let mut components = vec![
            (
                w.house_number,
                house_number_similarity(input.house_number, candidate.house_number),
            ),
            (w.street, street_similarity(input, candidate)),
            (
                w.unit,
                unit_similarity(
                    input.unit_key.as_deref(),
                    candidate.unit_key.as_deref(),
                    self.scoring.one_sided_unit(MatchType::FullAddress),
                ),
            ),
        ];
        // Locality parts empty on both sides carry no evidence either way.
        if either(&input.city_key, &candidate.city_key) {
            components.push((
                w.city,
                gated_edit_similarity(&input.city_key, &candidate.city_key, self.scoring.city_floor),
            ));
        }
        if either(&input.state_key, &candidate.state_key) {
            components.push((w.state, exact_similarity(&input.state_key, &candidate.state_key)));
        }
        if either(&input.zip_key, &candidate.zip_key) {
            components.push((w.zip, exact_similarity(&input.zip_key, &candidate.zip_key)));
        }
        combine(&components)
    }
}

fn full_name(input: &NormalizedRecord, candidate: &NormalizedRecord) -> u8 {
    if !input.has_full_name() || !candidate.has_full_name() {
        return 0;
    }
    let sim = token_set_similarity(&input.full_name_tokens(), &candidate.full_name_tokens());
    round_score(sim)
}

fn street_similarity(input: &NormalizedRecord, candidate: &NormalizedRecord) -> f64 {
    token_set_similarity(&input.street_tokens(), &candidate.street_tokens())
}

fn either(a: &str, b: &str) -> bool {
    !a.is_empty() || !b.is_empty()
}

/// Weighted mean of (weight, similarity) pairs, rounded half away from zero.
pub fn combine(components: &[(f64, f64)]) -> u8 {
    let total: f64 = components.iter().map(|(w, _)| w).sum();
    if total <= 0.0 {
        return 0;
    }
    let sum: f64 = components.iter().map(|(w, s)| w * s).sum();
    round_score(sum / total)
}

fn round_score(value: f64) -> u8 {
    // f64::round rounds half away from zero.
    value.round().clamp(0.0, 100.0) as u8
}
