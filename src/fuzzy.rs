// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fuzzy scoring in the style of fzy
//!
//! A query matches a candidate when its characters appear in order,
//! ignoring case. Among all such alignments the best one is scored:
//! matches right after a path separator, word separator, camel-case hump
//! or dot earn a bonus, consecutive matches earn more, and every skipped
//! character costs a small gap penalty.
//!
//! Two score rows are kept per query character: `d[j]` is the best score
//! of an alignment whose current query character lands exactly on `j`,
//! `m[j]` is the best score of any alignment up to `j`.

/// Real-valued score; the infinities are the "no match" and "exact" sentinels.
pub type Score = f64;

pub const SCORE_MAX: Score = f64::INFINITY;
pub const SCORE_MIN: Score = f64::NEG_INFINITY;

const SCORE_GAP_LEADING: Score = -0.005;
const SCORE_GAP_TRAILING: Score = -0.005;
const SCORE_GAP_INNER: Score = -0.01;
const SCORE_MATCH_CONSECUTIVE: Score = 1.0;
const SCORE_MATCH_SLASH: Score = 0.9;
const SCORE_MATCH_WORD: Score = 0.8;
const SCORE_MATCH_CAPITAL: Score = 0.7;
const SCORE_MATCH_DOT: Score = 0.6;

fn bonus_at(curr: char, prev: char) -> Score {
    if !curr.is_alphanumeric() {
        return 0.0;
    }
    match prev {
        '/' => SCORE_MATCH_SLASH,
        '-' | '_' | ' ' => SCORE_MATCH_WORD,
        '.' => SCORE_MATCH_DOT,
        _ if curr.is_uppercase() && prev.is_lowercase() => SCORE_MATCH_CAPITAL,
        _ => 0.0,
    }
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

struct Matcher {
    needle: Vec<char>,
    haystack: Vec<char>,
    bonus: Vec<Score>,
}

impl Matcher {
    /// `None` when the needle is empty or longer than the haystack
    fn new(needle: &str, haystack: &str) -> Option<Self> {
        let needle: Vec<char> = needle.chars().map(fold).collect();
        let chars: Vec<char> = haystack.chars().collect();
        if needle.is_empty() || needle.len() > chars.len() {
            return None;
        }

        // The character before the first one counts as a path separator
        let mut prev = '/';
        let bonus = chars
            .iter()
            .map(|&c| {
                let bonus = bonus_at(c, prev);
                prev = c;
                bonus
            })
            .collect();

        Some(Self {
            needle,
            haystack: chars.into_iter().map(fold).collect(),
            bonus,
        })
    }

    fn is_exact_length(&self) -> bool {
        self.needle.len() == self.haystack.len()
    }

    fn match_row(
        &self,
        i: usize,
        curr_d: &mut [Score],
        curr_m: &mut [Score],
        last_d: &[Score],
        last_m: &[Score],
    ) {
        let nc = self.needle[i];
        let gap = if i == self.needle.len() - 1 {
            SCORE_GAP_TRAILING
        } else {
            SCORE_GAP_INNER
        };

        let mut prev_score = SCORE_MIN;
        for (j, &hc) in self.haystack.iter().enumerate() {
            if nc == hc {
                let score = if i == 0 {
                    (j as Score) * SCORE_GAP_LEADING + self.bonus[j]
                } else if j > 0 {
                    // A consecutive match does not stack with the position bonus
                    (last_m[j - 1] + self.bonus[j]).max(last_d[j - 1] + SCORE_MATCH_CONSECUTIVE)
                } else {
                    SCORE_MIN
                };
                curr_d[j] = score;
                prev_score = score.max(prev_score + gap);
            } else {
                curr_d[j] = SCORE_MIN;
                prev_score += gap;
            }
            curr_m[j] = prev_score;
        }
    }
}

/// Case-insensitive subsequence test used to pre-filter candidates
pub fn has_match(query: &str, candidate: &str) -> bool {
    let mut haystack = candidate.chars().map(fold);
    query
        .chars()
        .map(fold)
        .all(|needle| haystack.any(|c| c == needle))
}

/// Score `candidate` against `query`
///
/// Assumes the candidate already passed [`has_match`]; equal lengths are
/// therefore treated as an exact match.
pub fn score(query: &str, candidate: &str) -> Score {
    let Some(matcher) = Matcher::new(query, candidate) else {
        return SCORE_MIN;
    };
    if matcher.is_exact_length() {
        return SCORE_MAX;
    }

    let n = matcher.haystack.len();
    let mut last_d = vec![SCORE_MIN; n];
    let mut last_m = vec![SCORE_MIN; n];
    let mut curr_d = vec![SCORE_MIN; n];
    let mut curr_m = vec![SCORE_MIN; n];

    for i in 0..matcher.needle.len() {
        matcher.match_row(i, &mut curr_d, &mut curr_m, &last_d, &last_m);
        std::mem::swap(&mut curr_d, &mut last_d);
        std::mem::swap(&mut curr_m, &mut last_m);
    }

    last_m[n - 1]
}

/// Score a raw candidate, applying the subsequence pre-filter first
pub fn score_candidate(query: &str, candidate: &str) -> Score {
    if !has_match(query, candidate) {
        return SCORE_MIN;
    }
    score(query, candidate)
}

/// Score plus the candidate character index aligned to each query character
///
/// Returns `None` when there is no alignment at all.
pub fn match_positions(query: &str, candidate: &str) -> Option<(Score, Vec<usize>)> {
    let matcher = Matcher::new(query, candidate)?;
    let needle_len = matcher.needle.len();
    if matcher.is_exact_length() {
        return Some((SCORE_MAX, (0..needle_len).collect()));
    }

    let n = matcher.haystack.len();
    let mut d = vec![vec![SCORE_MIN; n]; needle_len];
    let mut m = vec![vec![SCORE_MIN; n]; needle_len];
    let empty: &[Score] = &[];
    for i in 0..needle_len {
        let (done_d, rest_d) = d.split_at_mut(i);
        let (done_m, rest_m) = m.split_at_mut(i);
        let last_d = done_d.last().map_or(empty, |row| row.as_slice());
        let last_m = done_m.last().map_or(empty, |row| row.as_slice());
        matcher.match_row(i, &mut rest_d[0], &mut rest_m[0], last_d, last_m);
    }

    let final_score = m[needle_len - 1][n - 1];
    if final_score == SCORE_MIN {
        return None;
    }

    // Walk back from the last cell. Several paths can share the optimal
    // score; the latest position in the candidate wins.
    let mut positions = vec![0; needle_len];
    let mut match_required = false;
    let mut j = n;
    for i in (0..needle_len).rev() {
        while j > 0 {
            j -= 1;
            if d[i][j] != SCORE_MIN && (match_required || d[i][j] == m[i][j]) {
                // Reached through the consecutive branch: the previous
                // query character must sit right before this one.
                match_required =
                    i != 0 && j != 0 && m[i][j] == d[i - 1][j - 1] + SCORE_MATCH_CONSECUTIVE;
                positions[i] = j;
                break;
            }
        }
    }

    Some((final_score, positions))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_or_longer_query_never_matches() {
        assert_eq!(score("", "anything"), SCORE_MIN);
        assert_eq!(score("abcd", "abc"), SCORE_MIN);
        assert_eq!(score_candidate("abcd", "abc"), SCORE_MIN);
        assert!(match_positions("abcd", "abc").is_none());
    }

    #[test]
    fn equal_length_is_exact_match() {
        assert_eq!(score("FooBar", "foobar"), SCORE_MAX);
        assert_eq!(score_candidate("foobar", "FOOBAR"), SCORE_MAX);
        assert!(score("fb", "foobar") < SCORE_MAX);
    }

    #[test]
    fn non_subsequence_is_filtered_before_scoring() {
        assert!(!has_match("fb", "baz"));
        assert_eq!(score_candidate("fb", "baz"), SCORE_MIN);
        // Same length but different letters must not become an exact match
        assert_eq!(score_candidate("ab", "ba"), SCORE_MIN);
    }

    #[test]
    fn simple_match_is_positive() {
        let s = score("fb", "foobar");
        assert!(s > 0.0, "score was {s}");
        assert!((s - 0.87).abs() < 1e-9, "score was {s}");
    }

    #[test]
    fn consecutive_beats_gapped() {
        assert!(score("ab", "abxx") > score("ab", "axbx"));
    }

    #[test]
    fn boundaries_earn_bonuses() {
        assert!(score("fb", "foo_bar") > score("fb", "foobar"));
        assert!(score("fb", "foo/bar") > score("fb", "foo_bar"));
        assert!(score("fb", "fooBar") > score("fb", "foobar"));
        assert!(score("fb", "foo.bar") > score("fb", "foobar"));
    }

    #[test]
    fn shorter_gaps_are_preferred() {
        assert!(score("ab", "a-bcdefgh") > score("ab", "acdefgh-b"));
    }

    #[test]
    fn scoring_is_repeatable() {
        let first = match_positions("mod", "src/model/mod.rs");
        let second = match_positions("mod", "src/model/mod.rs");
        assert_eq!(first, second);
        assert_eq!(score("mod", "src/model/mod.rs"), score("mod", "src/model/mod.rs"));
    }

    #[test]
    fn positions_follow_best_alignment() {
        let (s, positions) = match_positions("fb", "foobar").expect("match");
        assert_eq!(positions, vec![0, 3]);
        assert_eq!(s, score("fb", "foobar"));

        let (_, positions) = match_positions("ab", "xab").expect("match");
        assert_eq!(positions, vec![1, 2]);

        let (_, positions) = match_positions("mod", "src/mod.rs").expect("match");
        assert_eq!(positions, vec![4, 5, 6]);
    }

    #[test]
    fn positions_for_exact_match_cover_whole_candidate() {
        let (s, positions) = match_positions("abc", "ABC").expect("match");
        assert_eq!(s, SCORE_MAX);
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn positions_are_char_indices() {
        let (_, positions) = match_positions("éb", "xébz").expect("match");
        assert_eq!(positions, vec![1, 2]);
    }
}
