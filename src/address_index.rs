// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maps offsets in the rendered buffer back to the results shown there

use std::ops::Range;

use crate::address::SearchResult;

/// Sorted, non-overlapping line ranges parallel to the rendered results
#[derive(Debug, Clone, Default)]
pub struct AddressIndex {
    ranges: Vec<Range<usize>>,
    results: Vec<SearchResult>,
}

impl AddressIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the range of the next rendered result line
    ///
    /// Ranges must arrive in ascending order without overlap; a range that
    /// would break that order or is empty is dropped.
    pub fn push(&mut self, range: Range<usize>, result: SearchResult) {
        if range.is_empty() {
            return;
        }
        if let Some(last) = self.ranges.last() {
            if range.start < last.end {
                return;
            }
        }
        self.ranges.push(range);
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    /// Result whose line contains `offset`
    ///
    /// Offsets before the first line, in a gap (such as a group header) or
    /// past the end resolve to nothing, as do text-only results.
    pub fn resolve(&self, offset: i64) -> Option<&SearchResult> {
        let offset = usize::try_from(offset).ok()?;
        let idx = self.ranges.partition_point(|range| range.start <= offset);
        let idx = idx.checked_sub(1)?;
        if !self.ranges[idx].contains(&offset) {
            return None;
        }
        let result = &self.results[idx];
        result.address.as_ref()?;
        Some(result)
    }
}
