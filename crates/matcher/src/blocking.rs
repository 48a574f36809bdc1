use std::collections::HashMap;

use log::debug;

use crate::config::BlockingConfig;
use crate::model::{BlockKind, MatchType, NormalizedRecord};

/// Cheap signature shared by records that are worth comparing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockKey {
    Surname(String),
    SurnamePrefix(String),
    HouseStreet(u32, String),
    House(u32),
}

/// Master rows to score for one input record.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet<'a> {
    /// Key whose bucket produced the candidates, `None` when no key applied.
    pub key: Option<BlockKey>,
    pub relaxed: bool,
    pub truncated: bool,
    /// (master row id, normalized master record), ascending by row id.
    pub candidates: Vec<(usize, &'a NormalizedRecord)>,
}

impl<'a> CandidateSet<'a> {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn row_ids(&self) -> Vec<usize> {
        self.candidates.iter().map(|(row, _)| *row).collect()
    }
}

/// Block key -> ascending master row ids. Built once, read-only afterwards.
#[derive(Debug)]
pub struct BlockingIndex<'a> {
    master: &'a [NormalizedRecord],
    blocks: HashMap<BlockKey, Vec<usize>>,
    prefix_len: usize,
    max_candidates: usize,
}

fn surname_prefix(surname: &str, len: usize) -> String {
    surname.chars().take(len).collect()
}

/// Single words of a multi-word surname (`"smith jones"` -> `smith`, `jones`).
/// Initials are skipped.
fn surname_parts(surname: &str) -> Vec<&str> {
    let parts: Vec<&str> = surname.split(' ').collect();
    if parts.len() < 2 {
        return Vec::new();
    }
    let mut out: Vec<&str> = Vec::with_capacity(parts.len());
    for part in parts {
        if part.chars().count() > 1 && part != surname && !out.contains(&part) {
            out.push(part);
        }
    }
    out
}

fn same(a: &str, b: &str) -> bool {
    !a.is_empty() && a == b
}

/// How close a master record is to the input on cheap keys, 0 closest. Only
/// used to choose which rows survive the candidate cap.
fn closeness(input: &NormalizedRecord, master: &NormalizedRecord, match_type: MatchType) -> u8 {
    match match_type {
        MatchType::FullName => {
            if same(&input.full_name_key, &master.full_name_key) {
                0
            } else if same(&input.first_name_key, &master.first_name_key) {
                1
            } else if input.first_name_key.chars().next().is_some()
                && input.first_name_key.chars().next() == master.first_name_key.chars().next()
            {
                2
            } else {
                3
            }
        }
        MatchType::LastNameAddress => {
            let surname = same(&input.last_name_key, &master.last_name_key);
            if surname && same(&input.full_address_key, &master.full_address_key) {
                0
            } else if surname && same(&input.street_key, &master.street_key) {
                1
            } else if surname || same(&input.street_key, &master.street_key) {
                2
            } else {
                3
            }
        }
        MatchType::FullAddress => {
            if same(&input.full_address_key, &master.full_address_key) {
                0
            } else if same(&input.zip_key, &master.zip_key) {
                1
            } else if same(&input.city_key, &master.city_key) {
                2
            } else {
                3
            }
        }
    }
}

impl<'a> BlockingIndex<'a> {
    pub fn build(master: &'a [NormalizedRecord], config: &BlockingConfig) -> Self {
        let mut blocks: HashMap<BlockKey, Vec<usize>> = HashMap::new();
        for (row, rec) in master.iter().enumerate() {
            if !rec.last_name_key.is_empty() {
                blocks
                    .entry(BlockKey::Surname(rec.last_name_key.clone()))
                    .or_default()
                    .push(row);
                for part in surname_parts(&rec.last_name_key) {
                    blocks
                        .entry(BlockKey::Surname(part.to_string()))
                        .or_default()
                        .push(row);
                }
                blocks
                    .entry(BlockKey::SurnamePrefix(surname_prefix(
                        &rec.last_name_key,
                        config.surname_prefix_len,
                    )))
                    .or_default()
                    .push(row);
            }
            if let Some(house) = rec.house_number {
                blocks
                    .entry(BlockKey::HouseStreet(house, rec.street_key.clone()))
                    .or_default()
                    .push(row);
                blocks.entry(BlockKey::House(house)).or_default().push(row);
            }
        }
        Self {
            master,
            blocks,
            prefix_len: config.surname_prefix_len,
            max_candidates: config.max_candidates,
        }
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Row ids stored under `key`, ascending.
    pub fn bucket(&self, key: &BlockKey) -> &[usize] {
        self.blocks.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ascending union of the full-surname bucket and the buckets of each
    /// surname word.
    fn surname_rows(&self, surname: &str) -> Vec<usize> {
        let mut rows = self.bucket(&BlockKey::Surname(surname.to_string())).to_vec();
        for part in surname_parts(surname) {
            rows.extend_from_slice(self.bucket(&BlockKey::Surname(part.to_string())));
        }
        rows.sort_unstable();
        rows.dedup();
        rows
    }

    /// Exact key first, one relaxation step if its bucket is empty. An
    /// oversized bucket keeps the rows closest to `record` (full key matches
    /// first), then the lowest row ids.
    pub fn candidates_for(&self, record: &NormalizedRecord, match_type: MatchType) -> CandidateSet<'a> {
        let (exact_key, exact_rows, relaxed) = match match_type.block_kind() {
            BlockKind::Surname => {
                if record.last_name_key.is_empty() {
                    return CandidateSet::default();
                }
                (
                    BlockKey::Surname(record.last_name_key.clone()),
                    self.surname_rows(&record.last_name_key),
                    BlockKey::SurnamePrefix(surname_prefix(&record.last_name_key, self.prefix_len)),
                )
            }
            BlockKind::Address => {
                let Some(house) = record.house_number else {
                    return CandidateSet::default();
                };
                let exact = BlockKey::HouseStreet(house, record.street_key.clone());
                let rows = self.bucket(&exact).to_vec();
                (exact, rows, BlockKey::House(house))
            }
        };

        let (key, mut rows, was_relaxed) = if exact_rows.is_empty() {
            let rows = self.bucket(&relaxed).to_vec();
            (relaxed, rows, true)
        } else {
            (exact_key, exact_rows, false)
        };

        let truncated = rows.len() > self.max_candidates;
        if truncated {
            debug!(
                "{match_type}: block {key:?} holds {} rows, keeping the closest {}",
                rows.len(),
                self.max_candidates
            );
            rows = self.narrow(record, match_type, &rows);
        }

        let master = self.master;
        let candidates = rows
            .iter()
            .filter_map(|&row| master.get(row).map(|rec| (row, rec)))
            .collect();

        CandidateSet {
            key: Some(key),
            relaxed: was_relaxed,
            truncated,
            candidates,
        }
    }

    fn narrow(&self, record: &NormalizedRecord, match_type: MatchType, rows: &[usize]) -> Vec<usize> {
        let mut ranked: Vec<(u8, usize)> = rows
            .iter()
            .filter_map(|&row| {
                self.master
                    .get(row)
                    .map(|m| (closeness(record, m, match_type), row))
            })
            .collect();
        ranked.sort_unstable();
        ranked.truncate(self.max_candidates);
        let mut kept: Vec<usize> = ranked.into_iter().map(|(_, row)| row).collect();
        kept.sort_unstable();
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(last: &str, house: Option<u32>, street: &str) -> NormalizedRecord {
        NormalizedRecord {
            last_name_key: last.into(),
            first_name_key: "x".into(),
            full_name_key: format!("{last} x"),
            house_number: house,
            street_key: street.into(),
            ..Default::default()
        }
    }

    fn master() -> Vec<NormalizedRecord> {
        vec![
            rec("johnson", Some(742), "evergreen terrace"),
            rec("johnsen", Some(742), "evergreen terr"),
            rec("smith", Some(10), "main street"),
            rec("johnson", None, ""),
            rec("", Some(742), "evergreen terrace"),
        ]
    }

    #[test]
    fn exact_surname_block() {
        let m = master();
        let index = BlockingIndex::build(&m, &BlockingConfig::default());
        let set = index.candidates_for(&rec("johnson", None, ""), MatchType::FullName);
        assert_eq!(set.row_ids(), vec![0, 3]);
        assert!(!set.relaxed);
        assert_eq!(set.key, Some(BlockKey::Surname("johnson".into())));
    }

    #[test]
    fn surname_relaxes_to_prefix() {
        let m = master();
        let index = BlockingIndex::build(&m, &BlockingConfig::default());
        let set = index.candidates_for(&rec("johnsten", None, ""), MatchType::FullName);
        assert!(set.relaxed);
        assert_eq!(set.key, Some(BlockKey::SurnamePrefix("john".into())));
        assert_eq!(set.row_ids(), vec![0, 1, 3]);
    }

    #[test]
    fn address_relaxes_to_house_number() {
        let m = master();
        let index = BlockingIndex::build(&m, &BlockingConfig::default());

        let exact = index.candidates_for(
            &rec("x", Some(742), "evergreen terrace"),
            MatchType::FullAddress,
        );
        assert!(!exact.relaxed);
        assert_eq!(exact.row_ids(), vec![0, 4]);

        let relaxed = index.candidates_for(
            &rec("x", Some(742), "evergren terrace"),
            MatchType::LastNameAddress,
        );
        assert!(relaxed.relaxed);
        assert_eq!(relaxed.row_ids(), vec![0, 1, 4]);
    }

    #[test]
    fn missing_key_components_give_empty_set() {
        let m = master();
        let index = BlockingIndex::build(&m, &BlockingConfig::default());
        assert!(index.candidates_for(&rec("", Some(1), "a"), MatchType::FullName).is_empty());
        assert!(index
            .candidates_for(&rec("smith", None, "main street"), MatchType::FullAddress)
            .key
            .is_none());
    }

    #[test]
    fn no_second_relaxation() {
        let m = master();
        let index = BlockingIndex::build(&m, &BlockingConfig::default());
        let set = index.candidates_for(&rec("x", Some(9999), "nowhere"), MatchType::FullAddress);
        assert!(set.is_empty());
        assert!(set.relaxed);
    }

    #[test]
    fn candidates_are_capped_to_lowest_rows() {
        let m: Vec<NormalizedRecord> = (0..10).map(|_| rec("lee", Some(1), "elm street")).collect();
        let config = BlockingConfig {
            max_candidates: 3,
            ..Default::default()
        };
        let index = BlockingIndex::build(&m, &config);
        let set = index.candidates_for(&rec("lee", None, ""), MatchType::FullName);
        assert!(set.truncated);
        assert_eq!(set.row_ids(), vec![0, 1, 2]);
    }

    #[test]
    fn oversized_bucket_keeps_full_key_match() {
        let mut m: Vec<NormalizedRecord> = (0..10).map(|_| rec("lee", Some(1), "elm street")).collect();
        m.push(NormalizedRecord {
            first_name_key: "ann".into(),
            full_name_key: "lee ann".into(),
            full_address_key: "5 oak street".into(),
            ..rec("lee", Some(1), "elm street")
        });
        let config = BlockingConfig {
            max_candidates: 3,
            ..Default::default()
        };
        let index = BlockingIndex::build(&m, &config);

        let query = NormalizedRecord {
            first_name_key: "ann".into(),
            full_name_key: "lee ann".into(),
            full_address_key: "5 oak street".into(),
            ..rec("lee", Some(1), "elm street")
        };
        for mt in MatchType::ALL {
            let set = index.candidates_for(&query, mt);
            assert!(set.truncated, "{mt}");
            assert_eq!(set.len(), 3, "{mt}");
            assert_eq!(set.row_ids(), vec![0, 1, 10], "{mt}");
        }
    }

    #[test]
    fn multi_word_surnames_block_on_each_word() {
        let m = vec![
            rec("smith jones", None, ""),
            rec("jones", None, ""),
            rec("de la cruz", None, ""),
            rec("smithers", None, ""),
        ];
        let index = BlockingIndex::build(&m, &BlockingConfig::default());

        let single = index.candidates_for(&rec("jones", None, ""), MatchType::FullName);
        assert!(!single.relaxed);
        assert_eq!(single.row_ids(), vec![0, 1]);

        let double = index.candidates_for(&rec("smith jones", None, ""), MatchType::FullName);
        assert!(!double.relaxed);
        assert_eq!(double.row_ids(), vec![0, 1]);

        let cruz = index.candidates_for(&rec("cruz", None, ""), MatchType::FullName);
        assert_eq!(cruz.row_ids(), vec![2]);
    }

    #[test]
    fn empty_master_is_valid() {
        let m: Vec<NormalizedRecord> = Vec::new();
        let index = BlockingIndex::build(&m, &BlockingConfig::default());
        assert_eq!(index.block_count(), 0);
        for mt in MatchType::ALL {
            assert!(index.candidates_for(&rec("smith", Some(1), "a"), mt).is_empty());
        }
    }
}
