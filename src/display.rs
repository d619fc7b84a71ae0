// SPDX-License-Identifier: MIT OR Apache-2.0

//! Frames handed to the display and the line layout behind them
//!
//! Results that point at a line of a file are grouped under a header
//! naming the file, in the order each file first appears in the ranking.
//! Inside a group results are listed by line number. Everything else is
//! rendered as a standalone line.

use serde::Serialize;
use std::collections::HashMap;

use crate::address::SearchResult;
use crate::address_index::AddressIndex;
use crate::errors::RenderError;
use crate::query::Edit;

/// One complete rendering of the search window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    /// Query line without its newline
    pub query: String,
    pub lines: Vec<String>,
    /// Selection to restore, clamped to the query line
    pub selection: (usize, usize),
}

impl Frame {
    /// The text the display should contain after this frame
    pub fn body(&self) -> String {
        let mut body = String::with_capacity(
            self.query.len() + 1 + self.lines.iter().map(|l| l.len() + 1).sum::<usize>(),
        );
        body.push_str(&self.query);
        body.push('\n');
        for line in &self.lines {
            body.push_str(line);
            body.push('\n');
        }
        body
    }
}

/// The host surface results are published to
pub trait Display: Send + Sync {
    /// Current selection as byte offsets into the display body
    fn selection(&self) -> (usize, usize);

    fn publish(&self, frame: &Frame) -> Result<(), RenderError>;

    /// Called for every edit the display reports, before it is applied
    /// to the query line
    fn edited(&self, _edit: &Edit) {}
}

/// Rendered lines plus the index that maps offsets back to results
#[derive(Debug, Default)]
pub struct Layout {
    pub lines: Vec<String>,
    pub index: AddressIndex,
}

enum Entry<'a> {
    Group {
        file: &'a str,
        members: Vec<(usize, &'a SearchResult)>,
    },
    Single(&'a SearchResult),
}

/// Numeric ordering key for a line number kept as text
fn line_key(result: &SearchResult) -> Option<(usize, &str)> {
    let line = result.address.as_ref()?.from_line.as_deref()?;
    let digits = line.trim_start_matches('0');
    Some((digits.len(), digits))
}

fn result_line(result: &SearchResult) -> String {
    let text = result.text.replace('\n', " ");
    match result.address.as_ref().and_then(|address| address.from_line.as_deref()) {
        Some(line) => format!("{:<5} {}", line, text),
        None => text,
    }
}

/// Lay out ranked results below a query line of `query_len` bytes
/// (newline included)
pub fn layout(query_len: usize, results: &[SearchResult]) -> Layout {
    let mut entries: Vec<Entry<'_>> = Vec::new();
    let mut group_slots: HashMap<&str, usize> = HashMap::new();

    for (rank, result) in results.iter().enumerate() {
        let grouped = result
            .address
            .as_ref()
            .filter(|address| address.from_line.is_some())
            .and_then(|_| result.group());
        let Some(file) = grouped else {
            entries.push(Entry::Single(result));
            continue;
        };
        match group_slots.get(file) {
            Some(&slot) => {
                if let Entry::Group { members, .. } = &mut entries[slot] {
                    members.push((rank, result));
                }
            }
            None => {
                group_slots.insert(file, entries.len());
                entries.push(Entry::Group {
                    file,
                    members: vec![(rank, result)],
                });
            }
        }
    }

    let mut layout = Layout::default();
    let mut offset = query_len;
    let mut push_line = |layout: &mut Layout, line: String, result: Option<&SearchResult>| {
        let end = offset + line.len() + 1;
        if let Some(result) = result {
            layout.index.push(offset..end, result.clone());
        }
        layout.lines.push(line);
        offset = end;
    };

    for entry in entries {
        match entry {
            Entry::Single(result) => push_line(&mut layout, result_line(result), Some(result)),
            Entry::Group { file, mut members } => {
                members.sort_by(|(rank_a, a), (rank_b, b)| {
                    line_key(a)
                        .cmp(&line_key(b))
                        .then_with(|| rank_a.cmp(rank_b))
                });
                push_line(&mut layout, file.to_string(), None);
                for (_, result) in members {
                    push_line(&mut layout, result_line(result), Some(result));
                }
            }
        }
    }

    layout
}

/// Clamp a selection to the query text so a rewrite never moves it into
/// the results
pub fn clamp_selection(selection: (usize, usize), query_text_len: usize) -> (usize, usize) {
    let (q0, q1) = selection;
    (q0.min(query_text_len), q1.min(query_text_len))
}

/// Move a selection the way the display's own text moves under `edit`
///
/// Offsets at or after an insertion point shift right by the inserted
/// length. Offsets inside a deleted range collapse to its start and later
/// ones shift left.
pub fn shift_selection(selection: (usize, usize), edit: &Edit) -> (usize, usize) {
    let shift = |offset: usize| match edit {
        Edit::Insert { q0, text } if offset >= *q0 => offset + text.len(),
        Edit::Insert { .. } => offset,
        Edit::Delete { q0, q1 } if *q1 <= *q0 => offset,
        Edit::Delete { q0, .. } if offset <= *q0 => offset,
        Edit::Delete { q0, q1 } if offset < *q1 => *q0,
        Edit::Delete { q0, q1 } => offset - (q1 - q0),
    };
    (shift(selection.0), shift(selection.1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{Address, Candidate};

    fn hit(text: &str, file: &str, line: u32, score: f64) -> SearchResult {
        Candidate::at(text, Address::line(file, line)).scored(score)
    }

    #[test]
    fn groups_by_file_in_rank_order_sorted_by_line() {
        let results = vec![
            hit("late in b", "b.go", 40, 9.0),
            hit("early in a", "a.go", 3, 8.0),
            Candidate::text("+Errors").scored(7.0),
            hit("early in b", "b.go", 2, 6.0),
        ];
        let layout = layout(4, &results);
        assert_eq!(
            layout.lines,
            vec![
                "b.go",
                "2     early in b",
                "40    late in b",
                "a.go",
                "3     early in a",
                "+Errors",
            ]
        );
        let shown: Vec<&str> = layout.index.results().iter().map(|r| r.text.as_str()).collect();
        assert_eq!(shown, vec!["early in b", "late in b", "early in a", "+Errors"]);
    }

    #[test]
    fn file_only_addresses_render_standalone() {
        let results = vec![Candidate::at("src/main.rs", Address::file("/w/src/main.rs")).scored(1.0)];
        let layout = layout(3, &results);
        assert_eq!(layout.lines, vec!["src/main.rs"]);
        assert_eq!(
            layout.index.resolve(3).and_then(|r| r.address.as_ref()).map(|a| a.file.as_str()),
            Some("/w/src/main.rs")
        );
    }

    #[test]
    fn index_skips_headers_and_query_line() {
        let results = vec![hit("fn alpha", "a.rs", 1, 2.0), hit("fn beta", "a.rs", 9, 1.0)];
        // "> al\n" is 5 bytes, then "a.rs\n" header (5..10)
        let layout = layout(5, &results);
        let frame = Frame {
            query: "> al".to_string(),
            lines: layout.lines.clone(),
            selection: (0, 0),
        };
        let body = frame.body();
        assert_eq!(body, "> al\na.rs\n1     fn alpha\n9     fn beta\n");

        assert!(layout.index.resolve(2).is_none());
        assert!(layout.index.resolve(7).is_none());
        let first_line = body.find("1     fn alpha").expect("line") as i64;
        assert_eq!(layout.index.resolve(first_line).map(|r| r.text.as_str()), Some("fn alpha"));
        let second_line = body.find("9     fn beta").expect("line") as i64;
        assert_eq!(
            layout.index.resolve(second_line + 3).map(|r| r.text.as_str()),
            Some("fn beta")
        );
        assert!(layout.index.resolve(body.len() as i64).is_none());
    }

    #[test]
    fn group_members_sort_by_numeric_line() {
        let results = vec![
            hit("ten", "a.c", 10, 3.0),
            Candidate::at("huge", Address::line("a.c", "99999999999")).scored(2.0),
            hit("nine", "a.c", 9, 1.0),
        ];
        let layout = layout(3, &results);
        assert_eq!(
            layout.lines,
            vec!["a.c", "9     nine", "10    ten", "99999999999 huge"]
        );
    }

    #[test]
    fn selection_follows_edits() {
        let insert = Edit::Insert {
            q0: 2,
            text: "mn+f".to_string(),
        };
        assert_eq!(shift_selection((2, 2), &insert), (6, 6));
        assert_eq!(shift_selection((0, 1), &insert), (0, 1));
        assert_eq!(shift_selection((1, 3), &insert), (1, 7));

        let delete = Edit::Delete { q0: 3, q1: 5 };
        assert_eq!(shift_selection((6, 6), &delete), (4, 4));
        assert_eq!(shift_selection((4, 4), &delete), (3, 3));
        assert_eq!(shift_selection((2, 7), &delete), (2, 5));
        assert_eq!(shift_selection((3, 3), &Edit::Delete { q0: 3, q1: 3 }), (3, 3));
    }

    #[test]
    fn selection_is_clamped_to_query_text() {
        assert_eq!(clamp_selection((3, 50), 6), (3, 6));
        assert_eq!(clamp_selection((90, 95), 6), (6, 6));
    }
}
