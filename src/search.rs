use std::ops::Range;

use nucleo_matcher::pattern::{AtomKind, CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Config, Matcher, Utf32Str};

/// One label that matched a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHit {
    /// Position of the label in the order it was indexed.
    pub position: usize,
    pub score: u32,
    /// Half-open character ranges of the label that matched, ascending and
    /// non-overlapping. For highlighting only.
    pub spans: Vec<Range<usize>>,
}

/// Fuzzy index over a fixed list of labels.
///
/// Every whitespace-separated word of a query must match. Matching ignores
/// case and folds accents.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    labels: Vec<String>,
}

impl SearchIndex {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Hits in indexed order. A blank query places no constraint and
    /// returns every label without spans; callers that want the unfiltered
    /// list should not query at all.
    pub fn search(&self, text: &str) -> Vec<IndexHit> {
        if text.trim().is_empty() {
            return (0..self.labels.len())
                .map(|position| IndexHit {
                    position,
                    score: 0,
                    spans: Vec::new(),
                })
                .collect();
        }

        let pattern = Pattern::new(
            text,
            CaseMatching::Ignore,
            Normalization::Smart,
            AtomKind::Fuzzy,
        );
        let mut matcher = Matcher::new(Config::DEFAULT);
        let mut haystack_buf = Vec::new();
        let mut indices = Vec::new();

        let mut hits = Vec::new();
        for (position, label) in self.labels.iter().enumerate() {
            indices.clear();
            let haystack = Utf32Str::new(label, &mut haystack_buf);
            if let Some(score) = pattern.indices(haystack, &mut matcher, &mut indices) {
                hits.push(IndexHit {
                    position,
                    score,
                    spans: coalesce(&mut indices),
                });
            }
        }
        hits
    }
}

/// Turn matched character indices into contiguous half-open ranges.
fn coalesce(indices: &mut Vec<u32>) -> Vec<Range<usize>> {
    indices.sort_unstable();
    indices.dedup();

    let mut spans: Vec<Range<usize>> = Vec::new();
    for &idx in indices.iter() {
        let idx = idx as usize;
        match spans.last_mut() {
            Some(last) if last.end == idx => last.end = idx + 1,
            _ => spans.push(idx..idx + 1),
        }
    }
    spans
}
