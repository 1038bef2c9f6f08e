//! Token kinds and classified spans.
//!
//! ## Learning: Closed Enums at the Boundary
//!
//! Kinds arrive as strings in two places only: pattern tables loaded from
//! config and records emitted by an external analyzer. Both go through
//! [`TokenKind::from_tag`] once, so everything downstream matches on an
//! enum instead of comparing strings. Tags that do not parse become
//! [`TokenKind::Unknown`] rather than being dropped.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Lexical category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum TokenKind {
    Comment,
    DocComment,
    CommentMark,
    CommentUrl,
    String,
    Character,
    StringInterpolation,
    Number,
    Identifier,
    Keyword,
    TypeIdentifier,
    /// Identifier in call position, e.g. `println(` or `foo (`
    Call,
    Attribute,
    BuildConfig,
    Parameter,
    Argument,
    Placeholder,
    ObjectLiteral,
    /// A tag that did not parse into any known kind
    Unknown,
}

impl TokenKind {
    /// All kinds, in declaration order.
    pub const ALL: [TokenKind; 19] = [
        TokenKind::Comment,
        TokenKind::DocComment,
        TokenKind::CommentMark,
        TokenKind::CommentUrl,
        TokenKind::String,
        TokenKind::Character,
        TokenKind::StringInterpolation,
        TokenKind::Number,
        TokenKind::Identifier,
        TokenKind::Keyword,
        TokenKind::TypeIdentifier,
        TokenKind::Call,
        TokenKind::Attribute,
        TokenKind::BuildConfig,
        TokenKind::Parameter,
        TokenKind::Argument,
        TokenKind::Placeholder,
        TokenKind::ObjectLiteral,
        TokenKind::Unknown,
    ];

    /// Returns the canonical tag for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Comment => "comment",
            TokenKind::DocComment => "doc-comment",
            TokenKind::CommentMark => "comment-mark",
            TokenKind::CommentUrl => "comment-url",
            TokenKind::String => "string",
            TokenKind::Character => "character",
            TokenKind::StringInterpolation => "string-interpolation",
            TokenKind::Number => "number",
            TokenKind::Identifier => "identifier",
            TokenKind::Keyword => "keyword",
            TokenKind::TypeIdentifier => "type-identifier",
            TokenKind::Call => "call",
            TokenKind::Attribute => "attribute",
            TokenKind::BuildConfig => "build-config",
            TokenKind::Parameter => "parameter",
            TokenKind::Argument => "argument",
            TokenKind::Placeholder => "placeholder",
            TokenKind::ObjectLiteral => "object-literal",
            TokenKind::Unknown => "unknown",
        }
    }

    /// Parses a kind tag, returning `None` for unrecognized tags.
    ///
    /// Accepts the canonical tags, SourceKit-style tags
    /// (`source.lang.swift.syntaxtype.keyword`), and the upper-case group
    /// names used by classic pattern tables (`RESERVED_WORDS`, `DIGIT`).
    pub fn parse_tag(tag: &str) -> Option<TokenKind> {
        let short = tag
            .rsplit_once("syntaxtype.")
            .map_or(tag, |(_, rest)| rest)
            .to_ascii_lowercase()
            .replace('_', "-");

        let kind = match short.as_str() {
            "comment" => TokenKind::Comment,
            "doccomment" | "doc-comment" | "doccomment.field" => TokenKind::DocComment,
            "comment.mark" | "comment-mark" => TokenKind::CommentMark,
            "comment.url" | "comment-url" => TokenKind::CommentUrl,
            "string" | "quotes" | "slashy-quotes" => TokenKind::String,
            "character" | "char" | "single-quotes" | "singles-quotes" => TokenKind::Character,
            "string-interpolation-anchor" | "string-interpolation" => {
                TokenKind::StringInterpolation
            }
            "number" | "digit" => TokenKind::Number,
            "identifier" => TokenKind::Identifier,
            "keyword" | "reserved-words" => TokenKind::Keyword,
            "typeidentifier" | "type-identifier" => TokenKind::TypeIdentifier,
            "call" | "operation" => TokenKind::Call,
            "attribute" | "attribute.builtin" | "attribute.id" => TokenKind::Attribute,
            "buildconfig.id" | "buildconfig.keyword" | "build-config" => TokenKind::BuildConfig,
            "parameter" => TokenKind::Parameter,
            "argument" => TokenKind::Argument,
            "placeholder" => TokenKind::Placeholder,
            "objectliteral" | "object-literal" => TokenKind::ObjectLiteral,
            "unknown" => TokenKind::Unknown,
            _ => return None,
        };
        Some(kind)
    }

    /// Parses a kind tag, falling back to [`TokenKind::Unknown`].
    pub fn from_tag(tag: &str) -> TokenKind {
        Self::parse_tag(tag).unwrap_or_else(|| {
            tracing::warn!(tag, "unrecognized token kind tag");
            TokenKind::Unknown
        })
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for TokenKind {
    fn from(tag: String) -> Self {
        TokenKind::from_tag(&tag)
    }
}

impl From<TokenKind> for &'static str {
    fn from(kind: TokenKind) -> Self {
        kind.as_str()
    }
}

/// A classified span of source text.
///
/// `range` is half-open and measured in UTF-16 code units of the text
/// snapshot the token was computed from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub kind: TokenKind,
    pub range: Range<usize>,
}

impl Token {
    pub fn new(kind: TokenKind, range: Range<usize>) -> Self {
        Self { kind, range }
    }

    /// Builds a token from an `(offset, length)` pair.
    pub fn at(kind: TokenKind, offset: usize, length: usize) -> Self {
        Self::new(kind, offset..offset + length)
    }

    pub fn len(&self) -> usize {
        self.range.end.saturating_sub(self.range.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if this token shares at least one position with `range`.
    pub fn intersects(&self, range: &Range<usize>) -> bool {
        self.range.start < range.end && range.start < self.range.end
    }

    /// Returns the part of this token that lies inside `range`.
    pub fn clipped_to(&self, range: &Range<usize>) -> Option<Token> {
        if !self.intersects(range) {
            return None;
        }
        let start = self.range.start.max(range.start);
        let end = self.range.end.min(range.end);
        Some(Token::new(self.kind, start..end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_tags_round_trip() {
        for kind in TokenKind::ALL {
            assert_eq!(TokenKind::parse_tag(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_sourcekit_tags() {
        assert_eq!(
            TokenKind::from_tag("source.lang.swift.syntaxtype.keyword"),
            TokenKind::Keyword
        );
        assert_eq!(
            TokenKind::from_tag("source.lang.swift.syntaxtype.typeidentifier"),
            TokenKind::TypeIdentifier
        );
        assert_eq!(
            TokenKind::from_tag("source.lang.swift.syntaxtype.string_interpolation_anchor"),
            TokenKind::StringInterpolation
        );
        assert_eq!(
            TokenKind::from_tag("source.lang.swift.syntaxtype.attribute.builtin"),
            TokenKind::Attribute
        );
    }

    #[test]
    fn test_pattern_group_names() {
        assert_eq!(TokenKind::from_tag("RESERVED_WORDS"), TokenKind::Keyword);
        assert_eq!(TokenKind::from_tag("DIGIT"), TokenKind::Number);
        assert_eq!(TokenKind::from_tag("SINGLE_QUOTES"), TokenKind::Character);
        assert_eq!(TokenKind::from_tag("OPERATION"), TokenKind::Call);
    }

    #[test]
    fn test_unknown_tag_falls_back() {
        assert_eq!(TokenKind::parse_tag("sparkles"), None);
        assert_eq!(TokenKind::from_tag("sparkles"), TokenKind::Unknown);
    }

    #[test]
    fn test_clipping() {
        let token = Token::at(TokenKind::Comment, 5, 10);
        assert_eq!(token.range, 5..15);
        assert_eq!(
            token.clipped_to(&(0..8)),
            Some(Token::new(TokenKind::Comment, 5..8))
        );
        assert_eq!(
            token.clipped_to(&(12..40)),
            Some(Token::new(TokenKind::Comment, 12..15))
        );
        assert_eq!(token.clipped_to(&(15..20)), None);
        assert_eq!(token.clipped_to(&(0..5)), None);
    }
}
