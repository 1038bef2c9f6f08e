//! Render-only kind markers.
//!
//! Transient attributes tag UTF-16 ranges with a [`TokenKind`] without
//! touching the buffer's content. They are what renderers consult at
//! paint time, and what styling clears and rewrites for the visible range.

use spectra_syntax::TokenKind;
use std::ops::Range;

/// Sorted, non-overlapping `(range, kind)` markers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransientAttributes {
    spans: Vec<(Range<usize>, TokenKind)>,
}

impl TransientAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes markers over `range`. A marker straddling an edge is
    /// trimmed, and one covering the whole range is split in two.
    pub fn clear(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }

        let first = self.spans.partition_point(|(r, _)| r.end <= range.start);
        let last = self.spans.partition_point(|(r, _)| r.start < range.end);
        if first >= last {
            return;
        }

        let mut kept = Vec::with_capacity(2);
        let (head, head_kind) = self.spans[first].clone();
        if head.start < range.start {
            kept.push((head.start..range.start, head_kind));
        }
        let (tail, tail_kind) = self.spans[last - 1].clone();
        if tail.end > range.end {
            kept.push((range.end..tail.end, tail_kind));
        }
        self.spans.splice(first..last, kept);
    }

    /// Tags `range` with `kind`, replacing whatever was there.
    pub fn mark(&mut self, range: Range<usize>, kind: TokenKind) {
        if range.is_empty() {
            return;
        }
        self.clear(range.clone());
        let at = self.spans.partition_point(|(r, _)| r.end <= range.start);
        self.spans.insert(at, (range, kind));
    }

    /// Kind of the marker covering `offset`.
    pub fn kind_at(&self, offset: usize) -> Option<TokenKind> {
        let idx = self.spans.partition_point(|(r, _)| r.end <= offset);
        self.spans
            .get(idx)
            .filter(|(r, _)| r.start <= offset)
            .map(|(_, kind)| *kind)
    }

    /// Markers intersecting `range`, clipped to it.
    pub fn spans_in(&self, range: Range<usize>) -> impl Iterator<Item = (Range<usize>, TokenKind)> + '_ {
        let Range { start, end } = range;
        let first = self.spans.partition_point(|(r, _)| r.end <= start);
        self.spans[first..]
            .iter()
            .take_while(move |(r, _)| r.start < end)
            .map(move |(r, kind)| (r.start.max(start)..r.end.min(end), *kind))
    }

    pub fn spans(&self) -> &[(Range<usize>, TokenKind)] {
        &self.spans
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mark_and_lookup() {
        let mut attrs = TransientAttributes::new();
        attrs.mark(0..4, TokenKind::Keyword);
        attrs.mark(10..12, TokenKind::Number);

        assert_eq!(attrs.kind_at(0), Some(TokenKind::Keyword));
        assert_eq!(attrs.kind_at(3), Some(TokenKind::Keyword));
        assert_eq!(attrs.kind_at(4), None);
        assert_eq!(attrs.kind_at(11), Some(TokenKind::Number));
        assert_eq!(attrs.kind_at(12), None);
    }

    #[test]
    fn test_clear_trims_and_splits() {
        let mut attrs = TransientAttributes::new();
        attrs.mark(0..10, TokenKind::Comment);
        attrs.mark(20..30, TokenKind::String);

        attrs.clear(5..25);
        assert_eq!(
            attrs.spans(),
            &[(0..5, TokenKind::Comment), (25..30, TokenKind::String)]
        );

        attrs.clear(26..28);
        assert_eq!(
            attrs.spans(),
            &[
                (0..5, TokenKind::Comment),
                (25..26, TokenKind::String),
                (28..30, TokenKind::String),
            ]
        );
    }

    #[test]
    fn test_mark_overwrites() {
        let mut attrs = TransientAttributes::new();
        attrs.mark(0..10, TokenKind::Comment);
        attrs.mark(3..5, TokenKind::Keyword);
        assert_eq!(
            attrs.spans(),
            &[
                (0..3, TokenKind::Comment),
                (3..5, TokenKind::Keyword),
                (5..10, TokenKind::Comment),
            ]
        );
    }

    #[test]
    fn test_spans_in_clips() {
        let mut attrs = TransientAttributes::new();
        attrs.mark(0..10, TokenKind::Comment);
        attrs.mark(12..14, TokenKind::Number);
        attrs.mark(20..30, TokenKind::String);

        let spans: Vec<_> = attrs.spans_in(5..22).collect();
        assert_eq!(
            spans,
            vec![
                (5..10, TokenKind::Comment),
                (12..14, TokenKind::Number),
                (20..22, TokenKind::String),
            ]
        );
        assert_eq!(attrs.spans_in(14..20).count(), 0);
    }

    fn kind_strategy() -> impl Strategy<Value = TokenKind> {
        prop::sample::select(TokenKind::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_markers_stay_sorted_and_match_last_write(
            ops in prop::collection::vec((0usize..60, 0usize..20, kind_strategy(), any::<bool>()), 0..40)
        ) {
            let mut attrs = TransientAttributes::new();
            let mut model: Vec<Option<TokenKind>> = vec![None; 80];

            for (start, len, kind, is_clear) in ops {
                let range = start..start + len;
                if is_clear {
                    attrs.clear(range.clone());
                    for slot in &mut model[range] {
                        *slot = None;
                    }
                } else {
                    attrs.mark(range.clone(), kind);
                    for slot in &mut model[range] {
                        *slot = Some(kind);
                    }
                }
            }

            for pair in attrs.spans().windows(2) {
                prop_assert!(pair[0].0.end <= pair[1].0.start);
            }
            for (range, _) in attrs.spans() {
                prop_assert!(range.start < range.end);
            }
            for (offset, expected) in model.iter().enumerate() {
                prop_assert_eq!(attrs.kind_at(offset), *expected);
            }
        }
    }
}
