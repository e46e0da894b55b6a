//! Span normalization
//!
//! The span annotations in the data use half-open `[start, end)` indices.
//! Supervision wants inclusive spans, plus every size-1 span over the
//! question tokens.

use crate::error::{ReaderError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An inclusive `[start, end]` span over the tokenized question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Fix a list of half-open spans to be inclusive and add all size-1 spans.
///
/// Output order is sorted by (start, end) so downstream serialization is
/// reproducible. A span that is empty or reaches past the token count is a
/// hard error rather than a silent degenerate annotation.
pub fn fix_spans_coverage(spans: &[(usize, usize)], source_length: usize) -> Result<Vec<Span>> {
    let mut fixed: BTreeSet<Span> = BTreeSet::new();
    // subtract 1 from the end indices to make them inclusive
    for &(start, end) in spans {
        if end <= start || end > source_length {
            return Err(ReaderError::InvalidSpan {
                start,
                end,
                source_length,
            });
        }
        fixed.insert(Span::new(start, end - 1));
    }
    // add all size 1 spans
    for i in 0..source_length {
        fixed.insert(Span::new(i, i));
    }
    Ok(fixed.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_become_inclusive_and_unigrams_are_added() {
        let spans = fix_spans_coverage(&[(0, 2)], 3).unwrap();
        assert_eq!(
            spans,
            vec![
                Span::new(0, 0),
                Span::new(0, 1),
                Span::new(1, 1),
                Span::new(2, 2),
            ]
        );
    }

    #[test]
    fn duplicates_collapse() {
        let spans = fix_spans_coverage(&[(0, 1), (0, 1), (1, 3)], 3).unwrap();
        assert_eq!(
            spans,
            vec![Span::new(0, 0), Span::new(1, 1), Span::new(1, 2), Span::new(2, 2)]
        );
    }

    #[test]
    fn no_input_spans_yields_all_unigrams() {
        let spans = fix_spans_coverage(&[], 4).unwrap();
        assert_eq!(spans.len(), 4);
        for (i, span) in spans.iter().enumerate() {
            assert_eq!(*span, Span::new(i, i));
        }
    }

    #[test]
    fn zero_length_source_yields_nothing() {
        assert!(fix_spans_coverage(&[], 0).unwrap().is_empty());
    }

    #[test]
    fn empty_span_is_rejected() {
        let err = fix_spans_coverage(&[(2, 2)], 5).unwrap_err();
        assert!(matches!(err, ReaderError::InvalidSpan { start: 2, end: 2, .. }));
    }

    #[test]
    fn out_of_bounds_span_is_rejected() {
        assert!(fix_spans_coverage(&[(0, 6)], 5).is_err());
    }
}
