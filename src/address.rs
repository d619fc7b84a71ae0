// SPDX-License-Identifier: MIT OR Apache-2.0

//! Result locations and the candidates that carry them

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

use crate::fuzzy::Score;

/// A file location, rendered as `file[:line[.col][,line[.col]]]`
///
/// Line and column numbers keep the digits a source printed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Address {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_column: Option<String>,
}

impl Address {
    pub fn file(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            from_line: None,
            from_column: None,
            to_line: None,
            to_column: None,
        }
    }

    pub fn line(file: impl Into<String>, line: impl ToString) -> Self {
        Self {
            from_line: Some(line.to_string()),
            ..Self::file(file)
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file)?;
        let Some(from_line) = &self.from_line else {
            return Ok(());
        };
        write!(f, ":{}", from_line)?;
        if let Some(column) = &self.from_column {
            write!(f, ".{}", column)?;
        }
        if let Some(to_line) = &self.to_line {
            write!(f, ",{}", to_line)?;
            if let Some(column) = &self.to_column {
                write!(f, ".{}", column)?;
            }
        }
        Ok(())
    }
}

/// An unscored entry produced by a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub text: String,
    pub address: Option<Address>,
}

impl Candidate {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            address: None,
        }
    }

    pub fn at(text: impl Into<String>, address: Address) -> Self {
        Self {
            text: text.into(),
            address: Some(address),
        }
    }

    pub fn scored(self, score: Score) -> SearchResult {
        SearchResult {
            text: self.text,
            address: self.address,
            score,
        }
    }
}

/// A scored candidate
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    pub score: Score,
}

impl SearchResult {
    /// Group key used for per-file capping
    pub fn group(&self) -> Option<&str> {
        self.address
            .as_ref()
            .map(|address| address.file.as_str())
            .filter(|file| !file.is_empty())
    }
}

// file:L.C,L.C: text  (symbol ranges)
static RANGE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?):([0-9]+)\.([0-9]+)[:,]([0-9]+)\.([0-9]+)[: ](.*)$").expect("valid regex")
});
// file:L:C:text  (rg --line-number --column)
static COLUMN_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?):([0-9]+)[:,]([0-9]+)[: ](.*)$").expect("valid regex"));
// file:L:text
static NUMBERED_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?):([0-9]+)[: ](.*)$").expect("valid regex"));

/// Parse one line of external tool output into a candidate
///
/// Lines with no recognizable location prefix become text-only candidates.
pub fn parse_output_line(line: &str) -> Candidate {
    if let Some(caps) = RANGE_LINE.captures(line) {
        let address = Address {
            file: caps[1].to_string(),
            from_line: Some(caps[2].to_string()),
            from_column: Some(caps[3].to_string()),
            to_line: Some(caps[4].to_string()),
            to_column: Some(caps[5].to_string()),
        };
        return Candidate::at(caps[6].trim_start(), address);
    }
    if let Some(caps) = COLUMN_LINE.captures(line) {
        let address = Address {
            from_column: Some(caps[3].to_string()),
            ..Address::line(&caps[1], &caps[2])
        };
        return Candidate::at(caps[4].trim_start(), address);
    }
    if let Some(caps) = NUMBERED_LINE.captures(line) {
        let address = Address::line(&caps[1], &caps[2]);
        return Candidate::at(caps[3].trim_start(), address);
    }
    Candidate::text(line)
}
