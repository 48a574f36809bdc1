//! Primitive similarity measures, each on a 0.0..=100.0 scale.
//!
//! Scores stay fractional here; rounding to an integer happens once, when a
//! match type combines its components.

use strsim::normalized_levenshtein;

/// Character-level Levenshtein similarity. Empty on either side scores 0.
pub fn edit_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    100.0 * normalized_levenshtein(a, b)
}

/// `edit_similarity`, but anything below `floor` counts as a mismatch.
pub fn gated_edit_similarity(a: &str, b: &str, floor: u8) -> f64 {
    let sim = edit_similarity(a, b);
    if sim < f64::from(floor) {
        0.0
    } else {
        sim
    }
}

const UNPAIRED_PENALTY: f64 = 5.0;
const UNPAIRED_INITIAL_PENALTY: f64 = 2.0;

/// Order-independent token set similarity.
///
/// Tokens are deduplicated, then paired one-to-one greedily by highest
/// `edit_similarity` (ties go to the lower index on the left, then the
/// right). The paired scores are averaged weighted by the longer token's
/// length; every unpaired token costs 5 points (2 for a single-letter
/// initial).
pub fn token_set_similarity(a: &[&str], b: &[&str]) -> f64 {
    let a = dedup(a);
    let b = dedup(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut pairs: Vec<(f64, usize, usize)> = Vec::with_capacity(a.len() * b.len());
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            pairs.push((edit_similarity(x, y), i, j));
        }
    }
    pairs.sort_by(|p, q| {
        q.0.total_cmp(&p.0)
            .then_with(|| p.1.cmp(&q.1))
            .then_with(|| p.2.cmp(&q.2))
    });

    let mut used_a = vec![false; a.len()];
    let mut used_b = vec![false; b.len()];
    let mut weighted = 0.0;
    let mut weight = 0.0;
    for (sim, i, j) in pairs {
        if used_a[i] || used_b[j] {
            continue;
        }
        used_a[i] = true;
        used_b[j] = true;
        let len = a[i].chars().count().max(b[j].chars().count()) as f64;
        weighted += sim * len;
        weight += len;
    }

    let penalty: f64 = unpaired(&a, &used_a) + unpaired(&b, &used_b);
    let mean = if weight > 0.0 { weighted / weight } else { 0.0 };
    (mean - penalty).clamp(0.0, 100.0)
}

fn dedup<'s>(tokens: &[&'s str]) -> Vec<&'s str> {
    let mut out: Vec<&'s str> = Vec::with_capacity(tokens.len());
    for t in tokens {
        if !t.is_empty() && !out.contains(t) {
            out.push(*t);
        }
    }
    out
}

fn unpaired(tokens: &[&str], used: &[bool]) -> f64 {
    tokens
        .iter()
        .zip(used)
        .filter(|(_, used)| !**used)
        .map(|(t, _)| {
            if t.chars().count() == 1 {
                UNPAIRED_INITIAL_PENALTY
            } else {
                UNPAIRED_PENALTY
            }
        })
        .sum()
}

/// 100 when equal, 60 for a single adjacent digit transposition
/// (`123`/`132`), otherwise 0. Unknown on either side scores 0.
pub fn house_number_similarity(a: Option<u32>, b: Option<u32>) -> f64 {
    let (Some(a), Some(b)) = (a, b) else {
        return 0.0;
    };
    if a == b {
        return 100.0;
    }
    if is_adjacent_transposition(&a.to_string(), &b.to_string()) {
        60.0
    } else {
        0.0
    }
}

fn is_adjacent_transposition(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let diffs: Vec<usize> = (0..a.len()).filter(|&i| a[i] != b[i]).collect();
    matches!(diffs.as_slice(), [i, j] if *j == i + 1 && a[*i] == b[*j] && a[*j] == b[*i])
}

/// Both absent or equal: 100. Different: 0. One side only: `one_sided`.
pub fn unit_similarity(a: Option<&str>, b: Option<&str>, one_sided: u8) -> f64 {
    match (a, b) {
        (None, None) => 100.0,
        (Some(x), Some(y)) if x == y => 100.0,
        (Some(_), Some(_)) => 0.0,
        _ => f64::from(one_sided),
    }
}

/// Equal non-empty values score 100, anything else 0.
pub fn exact_similarity(a: &str, b: &str) -> f64 {
    if !a.is_empty() && a == b {
        100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(actual: f64, expected: f64) -> bool {
        (actual - expected).abs() < 0.01
    }

    #[test]
    fn edit_similarity_bounds() {
        assert_eq!(edit_similarity("smith", "smith"), 100.0);
        assert_eq!(edit_similarity("", "smith"), 0.0);
        assert_eq!(edit_similarity("", ""), 0.0);
        assert!(close(edit_similarity("johnsen", "johnson"), 100.0 * 6.0 / 7.0));
    }

    #[test]
    fn gated_similarity_drops_distant_values() {
        assert_eq!(gated_edit_similarity("hartford", "stamford", 80), 0.0);
        assert!(gated_edit_similarity("springfeild", "springfield", 80) > 80.0);
    }

    #[test]
    fn token_set_is_order_independent() {
        let a = token_set_similarity(&["smith", "john"], &["john", "smith"]);
        assert_eq!(a, 100.0);
    }

    #[test]
    fn token_set_weights_by_length() {
        // robert/robert = 100 (len 6), johnsen/johnson = 85.71 (len 7)
        let s = token_set_similarity(&["johnsen", "robert"], &["johnson", "robert"]);
        assert!(close(s, (600.0 + 600.0) / 13.0), "{s}");
    }

    #[test]
    fn token_set_penalizes_unpaired() {
        assert_eq!(token_set_similarity(&["smith", "john", "q"], &["smith", "john"]), 98.0);
        assert_eq!(
            token_set_similarity(&["smith", "john", "quincy"], &["smith", "john"]),
            95.0
        );
        assert_eq!(token_set_similarity(&[], &["smith"]), 0.0);
    }

    #[test]
    fn token_set_dedups() {
        assert_eq!(
            token_set_similarity(&["lee", "lee", "ann"], &["lee", "ann"]),
            100.0
        );
    }

    #[test]
    fn house_number_rules() {
        assert_eq!(house_number_similarity(Some(123), Some(123)), 100.0);
        assert_eq!(house_number_similarity(Some(123), Some(132)), 60.0);
        assert_eq!(house_number_similarity(Some(123), Some(124)), 0.0);
        assert_eq!(house_number_similarity(Some(123), Some(321)), 0.0);
        assert_eq!(house_number_similarity(Some(12), Some(123)), 0.0);
        assert_eq!(house_number_similarity(None, Some(123)), 0.0);
        assert_eq!(house_number_similarity(None, None), 0.0);
    }

    #[test]
    fn unit_rules() {
        assert_eq!(unit_similarity(None, None, 0), 100.0);
        assert_eq!(unit_similarity(Some("unit 5"), Some("unit 5"), 0), 100.0);
        assert_eq!(unit_similarity(Some("unit 5"), Some("unit 6"), 100), 0.0);
        assert_eq!(unit_similarity(Some("unit 5"), None, 100), 100.0);
        assert_eq!(unit_similarity(None, Some("unit 5"), 0), 0.0);
    }

    #[test]
    fn exact_rules() {
        assert_eq!(exact_similarity("06355", "06355"), 100.0);
        assert_eq!(exact_similarity("06355", "06356"), 0.0);
        assert_eq!(exact_similarity("", ""), 0.0);
    }
}
