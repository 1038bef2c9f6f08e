//! The tokenizer seam and its pattern-table implementation.

use std::ops::Range;

use crate::languages::builtin_table;
use crate::offsets::{Utf16Mapper, byte_offset, utf16_len};
use crate::{CompositeMatcher, PatternTable, SyntaxError, SyntaxResult, Token};

/// Converts a text snapshot into classified tokens.
///
/// Implementations are pure with respect to their input: the same text
/// must always produce the same token sequence. An `Err` means "no result
/// this pass", which callers treat differently from an empty `Ok`.
pub trait Tokenizer: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Tokenizes the whole snapshot. Token ranges are UTF-16 offsets.
    fn tokenize(&self, text: &str) -> SyntaxResult<Vec<Token>>;

    /// Whether a pass may block (process I/O) and must stay off the
    /// thread that owns the view.
    fn runs_off_thread(&self) -> bool {
        false
    }
}

/// Tokenizer driven by an ordered [`PatternTable`].
#[derive(Debug, Clone)]
pub struct RegexTokenizer {
    name: String,
    table: PatternTable,
    matcher: Result<CompositeMatcher, String>,
}

impl RegexTokenizer {
    /// Compiles `table`, failing if any pattern is malformed.
    pub fn new(name: impl Into<String>, table: PatternTable) -> SyntaxResult<Self> {
        let matcher = table.compile()?;
        Ok(Self {
            name: name.into(),
            table,
            matcher: Ok(matcher),
        })
    }

    /// Builds a tokenizer even if `table` does not compile.
    ///
    /// Every pass of a tokenizer with a broken table reports
    /// [`SyntaxError::InvalidPatternTable`], which leaves existing
    /// highlighting in place.
    pub fn lenient(name: impl Into<String>, table: PatternTable) -> Self {
        let name = name.into();
        let matcher = table.compile().map_err(|err| {
            tracing::warn!(tokenizer = %name, error = %err, "pattern table failed to compile");
            err.to_string()
        });
        Self {
            name,
            table,
            matcher,
        }
    }

    /// Uses the builtin table for `language`.
    pub fn for_language(language: &str) -> SyntaxResult<Self> {
        let table = builtin_table(language)
            .ok_or_else(|| SyntaxError::UnknownLanguage(language.to_string()))?;
        Self::new(language, table)
    }

    pub fn table(&self) -> &PatternTable {
        &self.table
    }

    /// Tokenizes only the UTF-16 range `range` of `text`.
    ///
    /// The range is clamped to the text. Matches cannot extend past its
    /// end, so a block comment opened inside the range but closed after it
    /// is reported up to `range.end`.
    pub fn tokenize_range(&self, text: &str, range: Range<usize>) -> SyntaxResult<Vec<Token>> {
        let matcher = self
            .matcher
            .as_ref()
            .map_err(|msg| SyntaxError::InvalidPatternTable(msg.clone()))?;

        let len = utf16_len(text);
        let end = range.end.min(len);
        let start = range.start.min(end);
        let bytes = byte_offset(text, start)..byte_offset(text, end);

        let mut mapper = Utf16Mapper::new(text);
        let tokens = matcher
            .matches(text, bytes)
            .map(|(kind, span)| {
                let start = mapper.utf16_at(span.start);
                let end = mapper.utf16_at(span.end);
                Token::new(kind, start..end)
            })
            .collect();
        Ok(tokens)
    }
}

impl Tokenizer for RegexTokenizer {
    fn name(&self) -> &str {
        &self.name
    }

    fn tokenize(&self, text: &str) -> SyntaxResult<Vec<Token>> {
        self.tokenize_range(text, 0..usize::MAX)
    }
}
