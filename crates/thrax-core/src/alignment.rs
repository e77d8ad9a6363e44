//! Word-level alignments
//!
//! Alignments are read in Berkeley aligner format: whitespace-separated
//! `i-j` tokens, where `i` indexes the source sentence and `j` the target
//! sentence. The index is kept in both directions as sorted link lists, so
//! storage grows with the number of points rather than with the largest
//! index a token names.

use tracing::warn;

/// Bidirectional word-alignment index for one sentence pair
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alignment {
    /// Source-to-target links, sorted by source index
    f2e: Links,
    /// Target-to-source links, sorted by target index
    e2f: Links,
}

/// Sorted `(key, value)` pairs stored as parallel columns, so the values for
/// one key form a contiguous ascending slice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Links {
    keys: Vec<usize>,
    values: Vec<usize>,
}

impl Links {
    fn from_sorted(pairs: &[(usize, usize)]) -> Self {
        let (keys, values) = pairs.iter().copied().unzip();
        Self { keys, values }
    }

    fn get(&self, key: usize) -> &[usize] {
        let lo = self.keys.partition_point(|&k| k < key);
        let hi = lo + self.keys[lo..].partition_point(|&k| k == key);
        &self.values[lo..hi]
    }

    fn max_key(&self) -> Option<usize> {
        self.keys.last().copied()
    }
}

impl Alignment {
    /// Parse an alignment string. Malformed tokens are logged and skipped.
    ///
    /// With `reversed`, every `i-j` token is read as `j-i`. Indices are not
    /// checked here; use [`Alignment::consistent`] against the sentence
    /// lengths before indexing sentences with them.
    pub fn parse(s: &str, reversed: bool) -> Self {
        let mut points: Vec<(usize, usize)> = Vec::new();
        for token in s.split_whitespace() {
            match parse_point(token) {
                Some((i, j)) if reversed => points.push((j, i)),
                Some(point) => points.push(point),
                None => warn!("Malformed alignment point '{}' (skipping)", token),
            }
        }
        Self::from_points(points)
    }

    /// Build from `(source, target)` index pairs.
    pub fn from_points(mut points: Vec<(usize, usize)>) -> Self {
        points.sort_unstable();
        points.dedup();
        let f2e = Links::from_sorted(&points);

        let mut reversed: Vec<(usize, usize)> = points.iter().map(|&(i, j)| (j, i)).collect();
        reversed.sort_unstable();
        let e2f = Links::from_sorted(&reversed);

        Self { f2e, e2f }
    }

    /// True iff no alignment points were parsed
    pub fn is_empty(&self) -> bool {
        self.f2e.keys.is_empty()
    }

    /// Number of alignment points
    pub fn len(&self) -> usize {
        self.f2e.keys.len()
    }

    pub fn source_is_aligned(&self, i: usize) -> bool {
        !self.source_links(i).is_empty()
    }

    pub fn target_is_aligned(&self, j: usize) -> bool {
        !self.target_links(j).is_empty()
    }

    /// Target indices aligned to source word `i` (empty if unaligned or out of range)
    pub fn source_links(&self, i: usize) -> &[usize] {
        self.f2e.get(i)
    }

    /// Source indices aligned to target word `j` (empty if unaligned or out of range)
    pub fn target_links(&self, j: usize) -> &[usize] {
        self.e2f.get(j)
    }

    /// Check that every referenced index is inside sentences of the given lengths.
    pub fn consistent(&self, source_len: usize, target_len: usize) -> bool {
        self.f2e.max_key().map_or(true, |i| i < source_len)
            && self.e2f.max_key().map_or(true, |j| j < target_len)
    }

    /// Iterate over `(source, target)` points in ascending order
    pub fn points(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.f2e.keys.iter().copied().zip(self.f2e.values.iter().copied())
    }
}

impl std::fmt::Display for Alignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (i, j) in self.points() {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{}-{}", i, j)?;
            first = false;
        }
        Ok(())
    }
}

fn parse_point(token: &str) -> Option<(usize, usize)> {
    let (i, j) = token.split_once('-')?;
    Some((i.parse().ok()?, j.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_berkeley_format() {
        let alignment = Alignment::parse("0-0 1-2 1-1 3-2", false);

        assert_eq!(alignment.len(), 4);
        assert_eq!(alignment.source_links(1), &[1, 2]);
        assert_eq!(alignment.target_links(2), &[1, 3]);
        assert!(alignment.source_is_aligned(3));
        assert!(!alignment.source_is_aligned(2));
        assert!(!alignment.source_is_aligned(17));
        assert!(!alignment.target_is_aligned(5));
    }

    #[test]
    fn test_parse_reversed() {
        let alignment = Alignment::parse("0-1 2-0", true);

        assert_eq!(alignment.source_links(1), &[0]);
        assert_eq!(alignment.source_links(0), &[2]);
        assert_eq!(alignment.target_links(2), &[0]);
    }

    #[test]
    fn test_malformed_tokens_skipped() {
        let alignment = Alignment::parse("0-0 garbage 1- -2 x-y 1-1", false);
        assert_eq!(alignment.len(), 2);
        assert_eq!(alignment.to_string(), "0-0 1-1");
    }

    #[test]
    fn test_empty_alignment() {
        assert!(Alignment::parse("", false).is_empty());
        assert!(Alignment::parse("   ", false).is_empty());
        assert!(Alignment::parse("nonsense", false).is_empty());
        assert!(!Alignment::parse("0-0", false).is_empty());
    }

    #[test]
    fn test_consistent_bounds() {
        let alignment = Alignment::parse("0-5", false);
        assert!(!alignment.consistent(2, 2));
        assert!(alignment.consistent(1, 6));

        let alignment = Alignment::parse("3-0", false);
        assert!(!alignment.consistent(3, 1));
        assert!(alignment.consistent(4, 1));
    }

    #[test]
    fn test_duplicate_points_collapse() {
        let alignment = Alignment::parse("1-1 0-0 1-1", false);
        assert_eq!(alignment.len(), 2);
        assert_eq!(alignment.to_string(), "0-0 1-1");
    }

    #[test]
    fn test_huge_indices_do_not_allocate_tables() {
        let alignment = Alignment::parse("0-18446744073709551615", false);
        assert_eq!(alignment.len(), 1);
        assert_eq!(alignment.source_links(0), &[usize::MAX]);
        assert_eq!(alignment.target_links(usize::MAX), &[0]);
        assert!(!alignment.consistent(2, 2));

        let alignment = Alignment::parse("0-4000000000", false);
        assert_eq!(alignment.target_links(4_000_000_000), &[0]);
        assert!(!alignment.consistent(2, 2));
        assert!(alignment.consistent(1, 4_000_000_001));
    }

    #[test]
    fn test_links_for_repeated_keys() {
        let alignment = Alignment::parse("2-0 0-3 2-4 2-1 5-5", false);
        assert_eq!(alignment.source_links(2), &[0, 1, 4]);
        assert_eq!(alignment.source_links(1), &[] as &[usize]);
        assert_eq!(alignment.source_links(6), &[] as &[usize]);
        assert_eq!(alignment.to_string(), "0-3 2-0 2-1 2-4 5-5");
    }
}
