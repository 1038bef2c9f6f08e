//! Pattern tables and the composite matcher built from them.
//!
//! ## How the composite works
//!
//! A table `[(k1, p1), (k2, p2), ...]` compiles into a single expression
//!
//! ```text
//! (?P<__entry0>p1)|(?P<__entry1>p2)|...
//! ```
//!
//! The `regex` crate scans leftmost-first, so:
//! - the match with the lowest start offset wins
//! - at equal start offsets the earlier table entry wins
//! - scanning resumes after the consumed span, so matches never overlap
//!
//! Each entry owns a named group, and the matcher resolves those names to
//! group indices once at build time. Patterns may contain their own
//! capturing groups without shifting which entry a match is reported for.

use regex::{CaptureLocations, Regex};
use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::{SyntaxError, SyntaxResult, TokenKind};

/// One `(kind, pattern)` row of a pattern table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternEntry {
    pub kind: TokenKind,
    pub pattern: String,
}

impl PatternEntry {
    pub fn new(kind: TokenKind, pattern: impl Into<String>) -> Self {
        Self {
            kind,
            pattern: pattern.into(),
        }
    }
}

/// An ordered list of patterns. Order breaks ties between entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternTable {
    entries: Vec<PatternEntry>,
}

impl PatternTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry (builder style).
    pub fn with(mut self, kind: TokenKind, pattern: impl Into<String>) -> Self {
        self.push(kind, pattern);
        self
    }

    pub fn push(&mut self, kind: TokenKind, pattern: impl Into<String>) {
        self.entries.push(PatternEntry::new(kind, pattern));
    }

    pub fn entries(&self) -> &[PatternEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compiles the table into a [`CompositeMatcher`].
    pub fn compile(&self) -> SyntaxResult<CompositeMatcher> {
        CompositeMatcher::new(self)
    }
}

/// A compiled pattern table.
#[derive(Debug, Clone)]
pub struct CompositeMatcher {
    regex: Regex,
    /// (capture group index, kind) per table entry, in table order
    slots: Vec<(usize, TokenKind)>,
}

impl CompositeMatcher {
    pub fn new(table: &PatternTable) -> SyntaxResult<Self> {
        if table.is_empty() {
            return Err(SyntaxError::EmptyPatternTable);
        }

        // Compile entries one by one first so a bad pattern is reported
        // against its own kind instead of the whole alternation.
        for entry in table.entries() {
            Regex::new(&entry.pattern).map_err(|source| SyntaxError::InvalidPattern {
                kind: entry.kind,
                source,
            })?;
        }

        let composite = table
            .entries()
            .iter()
            .enumerate()
            .map(|(idx, entry)| format!("(?P<{}>{})", group_name(idx), entry.pattern))
            .collect::<Vec<_>>()
            .join("|");
        let regex = Regex::new(&composite)?;

        let slots = table
            .entries()
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                let name = group_name(idx);
                regex
                    .capture_names()
                    .position(|candidate| candidate == Some(name.as_str()))
                    .map(|group| (group, entry.kind))
                    .ok_or_else(|| {
                        SyntaxError::InvalidPatternTable(format!(
                            "group for entry {idx} missing from composite"
                        ))
                    })
            })
            .collect::<SyntaxResult<Vec<_>>>()?;

        Ok(Self { regex, slots })
    }

    /// Returns the composite expression source.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Iterates over classified matches inside `range` (byte offsets).
    ///
    /// `range` must lie on char boundaries of `text`. Text outside the
    /// range is invisible to the scan: `\z` matches at `range.end`.
    pub fn matches<'m, 't>(&'m self, text: &'t str, range: Range<usize>) -> Matches<'m, 't> {
        let end = range.end.min(text.len());
        Matches {
            matcher: self,
            haystack: &text[..end],
            at: range.start.min(end),
            locations: self.regex.capture_locations(),
        }
    }

    fn classify(&self, locations: &CaptureLocations) -> Option<(TokenKind, Range<usize>)> {
        self.slots.iter().find_map(|&(group, kind)| {
            locations
                .get(group)
                .map(|(start, end)| (kind, start..end))
        })
    }
}

fn group_name(idx: usize) -> String {
    format!("__entry{idx}")
}

/// Iterator returned by [`CompositeMatcher::matches`].
pub struct Matches<'m, 't> {
    matcher: &'m CompositeMatcher,
    haystack: &'t str,
    at: usize,
    locations: CaptureLocations,
}

impl Iterator for Matches<'_, '_> {
    type Item = (TokenKind, Range<usize>);

    fn next(&mut self) -> Option<Self::Item> {
        while self.at <= self.haystack.len() {
            let whole = self
                .matcher
                .regex
                .captures_read_at(&mut self.locations, self.haystack, self.at)?;

            if whole.start() == whole.end() {
                // Zero-width matches carry no token; step past one char.
                self.at = self.haystack[whole.end()..]
                    .chars()
                    .next()
                    .map_or(self.haystack.len() + 1, |c| whole.end() + c.len_utf8());
                continue;
            }

            self.at = whole.end();
            if let Some(found) = self.matcher.classify(&self.locations) {
                return Some(found);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(table: &PatternTable, text: &str) -> Vec<(TokenKind, Range<usize>)> {
        table.compile().unwrap().matches(text, 0..text.len()).collect()
    }

    #[test]
    fn test_empty_table_fails_to_compile() {
        assert!(matches!(
            PatternTable::new().compile(),
            Err(SyntaxError::EmptyPatternTable)
        ));
    }

    #[test]
    fn test_invalid_entry_names_its_kind() {
        let table = PatternTable::new()
            .with(TokenKind::Comment, "//.*")
            .with(TokenKind::Number, "(\\d+");
        match table.compile() {
            Err(SyntaxError::InvalidPattern { kind, .. }) => assert_eq!(kind, TokenKind::Number),
            other => panic!("expected invalid pattern error, got {other:?}"),
        }
    }

    #[test]
    fn test_earlier_entry_wins_ties() {
        let table = PatternTable::new()
            .with(TokenKind::Call, r"\w+ *\(")
            .with(TokenKind::Keyword, r"\bif\b");
        assert_eq!(collect(&table, "if (x)"), vec![(TokenKind::Call, 0..4)]);

        let swapped = PatternTable::new()
            .with(TokenKind::Keyword, r"\bif\b")
            .with(TokenKind::Call, r"\w+ *\(");
        assert_eq!(
            collect(&swapped, "if (x)"),
            vec![(TokenKind::Keyword, 0..2)]
        );
    }

    #[test]
    fn test_leftmost_match_wins_over_table_order() {
        let table = PatternTable::new()
            .with(TokenKind::Comment, "//.*")
            .with(TokenKind::String, "\"[^\"\\n]*\"");
        assert_eq!(
            collect(&table, "\"http://x\""),
            vec![(TokenKind::String, 0..10)]
        );
    }

    #[test]
    fn test_inner_groups_do_not_shift_kinds() {
        let table = PatternTable::new()
            .with(TokenKind::Number, r"(0x)?(\d+)")
            .with(TokenKind::Keyword, r"\b(let|var)\b");
        assert_eq!(
            collect(&table, "let 0x10"),
            vec![(TokenKind::Keyword, 0..3), (TokenKind::Number, 4..8)]
        );
    }

    #[test]
    fn test_zero_width_matches_are_skipped() {
        let table = PatternTable::new().with(TokenKind::Number, r"\d*");
        assert_eq!(
            collect(&table, "a1b22"),
            vec![(TokenKind::Number, 1..2), (TokenKind::Number, 3..5)]
        );
    }

    #[test]
    fn test_range_limits_the_scan() {
        let table = PatternTable::new().with(TokenKind::Comment, r"/\*(?s:.)*?(?:\*/|\z)");
        let matcher = table.compile().unwrap();
        let text = "/* open comment that closes later */";
        let found: Vec<_> = matcher.matches(text, 0..7).collect();
        assert_eq!(found, vec![(TokenKind::Comment, 0..7)]);
    }

    #[test]
    fn test_table_deserializes_from_toml_style_rows() {
        #[derive(Deserialize)]
        struct Holder {
            patterns: PatternTable,
        }
        let holder: Holder = serde_json::from_str(
            r#"{"patterns": [{"kind": "comment", "pattern": "//.*"}, {"kind": "DIGIT", "pattern": "\\d+"}]}"#,
        )
        .unwrap();
        assert_eq!(holder.patterns.len(), 2);
        assert_eq!(holder.patterns.entries()[1].kind, TokenKind::Number);
    }
}
