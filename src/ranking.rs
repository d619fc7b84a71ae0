// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ranked store of every positive-score result seen in a round
//!
//! Members live in an ordered set, so a snapshot is a plain in-order walk:
//! nothing is popped and nothing needs to be pushed back afterwards.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::address::{Address, SearchResult};

/// Store entry; `seq` keeps otherwise identical results apart
#[derive(Debug, Clone)]
struct Ranked {
    result: SearchResult,
    seq: u64,
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        // Highest score first. Ties fall back to content, never to arrival
        // order, so concurrent sources cannot reorder equal results.
        other
            .result
            .score
            .total_cmp(&self.result.score)
            .then_with(|| self.result.text.cmp(&other.result.text))
            .then_with(|| self.result.address.cmp(&other.result.address))
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

#[derive(Debug, Default)]
pub struct RankingStore {
    members: BTreeSet<Ranked>,
    next_seq: u64,
    last_snapshot_len: Option<usize>,
}

impl RankingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scored result; non-positive scores are dropped
    ///
    /// Returns whether the result was kept.
    pub fn insert(&mut self, result: SearchResult) -> bool {
        if !(result.score > 0.0) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.members.insert(Ranked { result, seq })
    }

    pub(crate) fn len(&self) -> usize {
        self.members.len()
    }

    /// True until the first snapshot, and afterwards whenever membership
    /// changed since the last one
    pub fn has_changes(&self) -> bool {
        self.last_snapshot_len != Some(self.members.len())
    }

    /// Best `limit` results, highest score first
    ///
    /// Exact duplicates (same text and address) appear once. At most
    /// `per_group_cap` results share a file; results without an address are
    /// never capped. A cap of zero disables grouping limits.
    pub fn snapshot(&mut self, limit: usize, per_group_cap: usize) -> Vec<SearchResult> {
        let mut top: Vec<SearchResult> = Vec::with_capacity(limit.min(self.members.len()));
        let mut seen: HashSet<(&str, Option<&Address>)> = HashSet::new();
        let mut per_file: HashMap<&str, usize> = HashMap::new();

        for ranked in &self.members {
            if top.len() >= limit {
                break;
            }
            let result = &ranked.result;
            if !seen.insert((result.text.as_str(), result.address.as_ref())) {
                continue;
            }
            if let Some(file) = result.group() {
                let count = per_file.entry(file).or_insert(0);
                if per_group_cap > 0 && *count >= per_group_cap {
                    continue;
                }
                *count += 1;
            }
            top.push(result.clone());
        }

        self.last_snapshot_len = Some(self.members.len());
        top
    }

    pub fn into_results(self) -> Vec<SearchResult> {
        self.members.into_iter().map(|ranked| ranked.result).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Candidate;

    fn at(text: &str, file: &str, line: u32, score: f64) -> SearchResult {
        Candidate::at(text, Address::line(file, line)).scored(score)
    }

    fn plain(text: &str, score: f64) -> SearchResult {
        Candidate::text(text).scored(score)
    }

    fn texts(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.text.as_str()).collect()
    }

    #[test]
    fn non_positive_scores_are_ignored() {
        let mut store = RankingStore::new();
        assert!(!store.insert(plain("zero", 0.0)));
        assert!(!store.insert(plain("neg", -1.0)));
        assert!(!store.insert(plain("none", f64::NEG_INFINITY)));
        assert!(!store.insert(plain("nan", f64::NAN)));
        assert!(store.insert(plain("pos", 0.1)));
        assert!(store.insert(plain("exact", f64::INFINITY)));
        assert_eq!(store.len(), 2);
        assert_eq!(texts(&store.snapshot(10, 5)), vec!["exact", "pos"]);
    }

    #[test]
    fn snapshot_is_ordered_and_limited() {
        let mut store = RankingStore::new();
        for (i, name) in ["a", "b", "c", "d"].iter().enumerate() {
            store.insert(plain(name, i as f64 + 1.0));
        }
        assert_eq!(texts(&store.snapshot(2, 5)), vec!["d", "c"]);
    }

    #[test]
    fn snapshot_is_non_destructive() {
        let mut store = RankingStore::new();
        let inserted = [3.0, 1.0, 2.0, 2.0, 5.0];
        for (i, score) in inserted.iter().enumerate() {
            store.insert(at("dup", "a.go", (i % 2) as u32, *score));
            let _ = store.snapshot(1, 1);
        }
        store.insert(plain("late", 4.0));
        let _ = store.snapshot(2, 1);
        let _ = store.snapshot(0, 0);

        let mut scores: Vec<f64> = store.into_results().iter().map(|r| r.score).collect();
        scores.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(scores, vec![1.0, 2.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn exact_duplicates_count_once() {
        let mut store = RankingStore::new();
        store.insert(at("fn main", "main.rs", 1, 2.0));
        store.insert(at("fn main", "main.rs", 1, 2.0));
        store.insert(at("fn main", "main.rs", 1, 1.9999999));
        store.insert(plain("other", 1.0));

        let top = store.snapshot(2, 5);
        assert_eq!(texts(&top), vec!["fn main", "other"]);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn same_text_at_different_lines_is_not_a_duplicate() {
        let mut store = RankingStore::new();
        store.insert(at("x", "f.rs", 1, 2.0));
        store.insert(at("x", "f.rs", 2, 2.0));
        assert_eq!(store.snapshot(10, 5).len(), 2);
    }

    #[test]
    fn per_group_cap_keeps_highest_scores() {
        let mut store = RankingStore::new();
        for score in 1..=10 {
            store.insert(at(&format!("hit {score}"), "a.go", score, score as f64));
        }
        let top = store.snapshot(20, 5);
        let scores: Vec<f64> = top.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![10.0, 9.0, 8.0, 7.0, 6.0]);
        assert_eq!(store.len(), 10);
    }

    #[test]
    fn capped_file_does_not_starve_others() {
        let mut store = RankingStore::new();
        for score in 1..=10 {
            store.insert(at("hit", "big.go", score, 10.0 + score as f64));
        }
        store.insert(at("hit", "small.go", 1, 1.0));
        store.insert(plain("window", 0.5));
        store.insert(plain("window two", 0.4));

        let top = store.snapshot(5, 2);
        let groups: Vec<Option<&str>> = top.iter().map(|r| r.group()).collect();
        assert_eq!(
            groups,
            vec![Some("big.go"), Some("big.go"), Some("small.go"), None, None]
        );
    }

    #[test]
    fn ties_do_not_depend_on_insertion_order() {
        let items = [plain("beta", 1.0), plain("alpha", 1.0), at("alpha", "z", 1, 1.0)];

        let mut forward = RankingStore::new();
        for item in items.iter().cloned() {
            forward.insert(item);
        }
        let mut backward = RankingStore::new();
        for item in items.iter().rev().cloned() {
            backward.insert(item);
        }

        let a = forward.snapshot(10, 5);
        let b = backward.snapshot(10, 5);
        assert_eq!(texts(&a), texts(&b));
        assert_eq!(texts(&a), vec!["alpha", "alpha", "beta"]);
        assert!(a[0].address.is_none());
    }

    #[test]
    fn change_tracking_follows_snapshots() {
        let mut store = RankingStore::new();
        assert!(store.has_changes(), "first snapshot is always due");
        let _ = store.snapshot(20, 5);
        assert!(!store.has_changes());

        store.insert(plain("x", 1.0));
        assert!(store.has_changes());
        let _ = store.snapshot(20, 5);
        assert!(!store.has_changes());

        store.insert(plain("ignored", -1.0));
        assert!(!store.has_changes());
    }
}
