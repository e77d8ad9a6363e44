//! Spans and phrase pairs
//!
//! A phrase pair is a pair of contiguous half-open spans, one per side of a
//! sentence pair. It is consistent with an alignment when no alignment link
//! leaves the pair: every word aligned from inside one span lands inside the
//! other span.

use serde::{Deserialize, Serialize};

use crate::Alignment;

/// Half-open index range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{})", self.start, self.end)
    }
}

/// Source and target spans that bound a phrase pair or a rule's right-hand side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhrasePair {
    pub source_start: usize,
    pub source_end: usize,
    pub target_start: usize,
    pub target_end: usize,
}

impl PhrasePair {
    pub fn new(
        source_start: usize,
        source_end: usize,
        target_start: usize,
        target_end: usize,
    ) -> Self {
        Self {
            source_start,
            source_end,
            target_start,
            target_end,
        }
    }

    pub fn source_span(&self) -> Span {
        Span::new(self.source_start, self.source_end)
    }

    pub fn target_span(&self) -> Span {
        Span::new(self.target_start, self.target_end)
    }

    pub fn source_len(&self) -> usize {
        self.source_span().len()
    }

    pub fn target_len(&self) -> usize {
        self.target_span().len()
    }

    /// Check that no link from inside either span points outside the other.
    pub fn consistent_with(&self, alignment: &Alignment) -> bool {
        let target = self.target_span();
        for i in self.source_start..self.source_end {
            if alignment.source_links(i).iter().any(|&j| !target.contains(j)) {
                return false;
            }
        }

        let source = self.source_span();
        for j in self.target_start..self.target_end {
            if alignment.target_links(j).iter().any(|&i| !source.contains(i)) {
                return false;
            }
        }
        true
    }

    /// The minimal consistent phrase pair whose source side is `[start, end)`.
    ///
    /// Returns `None` when no source word in the range is aligned, or when the
    /// covering target span contains a word aligned outside the source range.
    pub fn from_source(alignment: &Alignment, start: usize, end: usize) -> Option<Self> {
        let mut target: Option<Span> = None;
        for i in start..end {
            let links = alignment.source_links(i);
            let (Some(&min), Some(&max)) = (links.first(), links.last()) else {
                continue;
            };
            target = Some(match target {
                Some(span) => Span::new(span.start.min(min), span.end.max(max + 1)),
                None => Span::new(min, max + 1),
            });
        }

        let target = target?;
        let source = Span::new(start, end);
        for j in target.start..target.end {
            if alignment.target_links(j).iter().any(|&k| !source.contains(k)) {
                return None;
            }
        }
        Some(Self::new(start, end, target.start, target.end))
    }

    /// Every phrase pair with source side `[start, end)`.
    ///
    /// The first element is the minimal pair. With `allow_loose` the target
    /// side is additionally grown left and right across unaligned target words,
    /// stopping at aligned words and at the sentence edges.
    pub fn all_from_source(
        alignment: &Alignment,
        start: usize,
        end: usize,
        allow_loose: bool,
        target_len: usize,
    ) -> Vec<Self> {
        let Some(minimal) = Self::from_source(alignment, start, end) else {
            return Vec::new();
        };
        let mut result = vec![minimal];
        if !allow_loose {
            return result;
        }

        let mut loose_start = minimal.target_start;
        while loose_start > 0 && !alignment.target_is_aligned(loose_start - 1) {
            loose_start -= 1;
        }
        let mut loose_end = minimal.target_end;
        while loose_end < target_len && !alignment.target_is_aligned(loose_end) {
            loose_end += 1;
        }

        for i in loose_start..minimal.target_start {
            result.push(Self::new(start, end, i, minimal.target_end));
        }
        if loose_end == minimal.target_end {
            return result;
        }

        let mut widened = Vec::with_capacity(result.len() * (loose_end - minimal.target_end));
        for pair in &result {
            for j in minimal.target_end + 1..=loose_end {
                widened.push(Self::new(pair.source_start, pair.source_end, pair.target_start, j));
            }
        }
        result.extend(widened);
        result
    }
}

impl std::fmt::Display for PhrasePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.source_span(), self.target_span())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_basics() {
        let span = Span::new(2, 5);
        assert_eq!(span.len(), 3);
        assert!(span.contains(2));
        assert!(!span.contains(5));
        assert!(Span::new(3, 3).is_empty());
        assert_eq!(span.to_string(), "[2,5)");
    }

    #[test]
    fn test_consistent_with() {
        let alignment = Alignment::parse("0-1 1-0 2-2", false);

        assert!(PhrasePair::new(0, 2, 0, 2).consistent_with(&alignment));
        assert!(PhrasePair::new(2, 3, 2, 3).consistent_with(&alignment));
        // source word 0 points at target 1, outside [0,1)
        assert!(!PhrasePair::new(0, 1, 0, 1).consistent_with(&alignment));
        // target word 2 points back at source 2, outside [0,2)
        assert!(!PhrasePair::new(0, 2, 0, 3).consistent_with(&alignment));
    }

    #[test]
    fn test_from_source_minimal_pair() {
        let alignment = Alignment::parse("0-1 1-0 2-2", false);

        assert_eq!(
            PhrasePair::from_source(&alignment, 0, 2),
            Some(PhrasePair::new(0, 2, 0, 2))
        );
        assert_eq!(
            PhrasePair::from_source(&alignment, 0, 1),
            Some(PhrasePair::new(0, 1, 1, 2))
        );

        // target 0 is also aligned to source 1, outside the range
        let alignment = Alignment::parse("0-0 1-0", false);
        assert_eq!(PhrasePair::from_source(&alignment, 0, 1), None);
    }

    #[test]
    fn test_from_source_unaligned_range() {
        let alignment = Alignment::parse("0-0 2-2", false);
        assert_eq!(PhrasePair::from_source(&alignment, 1, 2), None);
        assert_eq!(
            PhrasePair::from_source(&alignment, 1, 3),
            Some(PhrasePair::new(1, 3, 2, 3))
        );
    }

    #[test]
    fn test_all_from_source_strict() {
        let alignment = Alignment::parse("0-0 2-2", false);
        let pairs = PhrasePair::all_from_source(&alignment, 0, 1, false, 3);
        assert_eq!(pairs, vec![PhrasePair::new(0, 1, 0, 1)]);
    }

    #[test]
    fn test_all_from_source_loose() {
        let alignment = Alignment::parse("0-0 2-2", false);

        let pairs = PhrasePair::all_from_source(&alignment, 0, 1, true, 3);
        assert_eq!(
            pairs,
            vec![PhrasePair::new(0, 1, 0, 1), PhrasePair::new(0, 1, 0, 2)]
        );

        let pairs = PhrasePair::all_from_source(&alignment, 2, 3, true, 3);
        assert_eq!(
            pairs,
            vec![PhrasePair::new(2, 3, 2, 3), PhrasePair::new(2, 3, 1, 3)]
        );
    }

    #[test]
    fn test_all_from_source_loose_both_sides() {
        // target words 0 and 2 are unaligned around the anchor at 1
        let alignment = Alignment::parse("0-1", false);
        let pairs = PhrasePair::all_from_source(&alignment, 0, 1, true, 3);

        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs[0], PhrasePair::new(0, 1, 1, 2));
        assert!(pairs.contains(&PhrasePair::new(0, 1, 0, 2)));
        assert!(pairs.contains(&PhrasePair::new(0, 1, 1, 3)));
        assert!(pairs.contains(&PhrasePair::new(0, 1, 0, 3)));
        assert!(pairs.iter().all(|pp| pp.consistent_with(&alignment)));
    }
}
