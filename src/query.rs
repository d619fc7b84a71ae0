// SPDX-License-Identifier: MIT OR Apache-2.0

//! The editable query line and its `+flags` suffix
//!
//! The query line is the first line of the display: a prompt, the query
//! text, an optional `+` followed by one letter per source, and a newline.

use serde::Serialize;
use std::fmt;

use crate::errors::FlagError;

pub const DEFAULT_PROMPT: &str = "> ";
pub const DEFAULT_FLAGS: &str = "sw";

/// Closed set of result producers selectable from the query line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Symbols known to the language servers
    Symbols,
    /// Open windows by name
    Windows,
    /// File contents, recursively
    Grep,
    /// File names, recursively
    Files,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Symbols,
        SourceKind::Windows,
        SourceKind::Grep,
        SourceKind::Files,
    ];

    pub fn code(self) -> char {
        match self {
            SourceKind::Symbols => 's',
            SourceKind::Windows => 'w',
            SourceKind::Grep => 'g',
            SourceKind::Files => 'f',
        }
    }

    pub fn from_code(code: char) -> Result<Self, FlagError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.code() == code)
            .ok_or(FlagError::Unknown(code))
    }

    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Symbols => "symbols",
            SourceKind::Windows => "windows",
            SourceKind::Grep => "grep",
            SourceKind::Files => "files",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Decode a flag string into sources, keeping first-seen order
///
/// Unknown letters are returned separately so the caller can report them;
/// the recognized sources still run.
pub fn parse_flags(flags: &str) -> (Vec<SourceKind>, Vec<FlagError>) {
    let mut kinds = Vec::new();
    let mut unknown = Vec::new();
    for code in flags.chars().filter(|c| !c.is_whitespace()) {
        match SourceKind::from_code(code) {
            Ok(kind) if !kinds.contains(&kind) => kinds.push(kind),
            Ok(_) => {}
            Err(err) => unknown.push(err),
        }
    }
    (kinds, unknown)
}

/// Query text and source selection decoded once per round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    pub text: String,
    pub sources: Vec<SourceKind>,
    pub unknown_flags: Vec<FlagError>,
}

/// An edit reported by the display, in byte offsets of its buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Insert { q0: usize, text: String },
    Delete { q0: usize, q1: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// The query line changed
    Applied,
    /// The edit was outside the query line or did not change it
    Ignored,
}

#[derive(Debug, Clone)]
pub struct QueryBuffer {
    prompt: String,
    line: String,
}

impl QueryBuffer {
    pub fn new(prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        let line = format!("{}\n", prompt);
        Self { prompt, line }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// The full query line as it sits in the display
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Whether a buffer offset lands on the query line
    ///
    /// While the newline is present the line ends before it; once the
    /// user deleted it, the end of the line is still part of the query.
    pub fn contains(&self, offset: usize) -> bool {
        offset < self.line.len() || (offset == self.line.len() && !self.line.ends_with('\n'))
    }

    pub fn apply(&mut self, edit: &Edit) -> EditOutcome {
        match edit {
            Edit::Insert { q0, text } => {
                let q0 = *q0;
                if text.is_empty() || !self.contains(q0) || !self.line.is_char_boundary(q0) {
                    return EditOutcome::Ignored;
                }
                self.line.insert_str(q0, text);
                EditOutcome::Applied
            }
            Edit::Delete { q0, q1 } => {
                let q0 = *q0;
                if !self.contains(q0) {
                    return EditOutcome::Ignored;
                }
                // A deletion may run past the query line; only its head counts
                let q1 = (*q1).min(self.line.len());
                if q1 <= q0
                    || !self.line.is_char_boundary(q0)
                    || !self.line.is_char_boundary(q1)
                {
                    return EditOutcome::Ignored;
                }
                self.line.replace_range(q0..q1, "");
                EditOutcome::Applied
            }
        }
    }

    /// Restore the trailing newline before the line is rendered again
    pub fn ensure_newline(&mut self) {
        if !self.line.ends_with('\n') {
            self.line.push('\n');
        }
    }

    /// Split the line into query text and sources
    ///
    /// Without a `+` suffix `default_flags` applies.
    pub fn parse(&self, default_flags: &str) -> ParsedQuery {
        let body = self
            .line
            .strip_prefix(self.prompt.as_str())
            .unwrap_or(&self.line)
            .trim();
        let (text, flags) = match body.split_once('+') {
            Some((text, flags)) => (text.trim_end(), flags),
            None => (body, default_flags),
        };
        let (sources, unknown_flags) = parse_flags(flags);
        ParsedQuery {
            text: text.to_string(),
            sources,
            unknown_flags,
        }
    }
}

impl Default for QueryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPT)
    }
}
