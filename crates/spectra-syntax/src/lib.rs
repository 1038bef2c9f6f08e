//! # Spectra Syntax
//!
//! Tokenizers that turn a text snapshot into classified, UTF-16 ranged
//! tokens.
//!
//! ## Three interchangeable adapters
//!
//! Everything that produces tokens implements [`Tokenizer`]:
//! - [`RegexTokenizer`]: an ordered pattern table compiled into one
//!   composite expression (builtin tables for groovy, java, swift and c)
//! - [`ExternalAnalyzer`]: runs a helper process and parses its JSON
//! - [`TreeSitterTokenizer`]: classifies the nodes of a tree-sitter parse
//!
//! The highlighting controller only ever sees `Vec<Token>`, so swapping
//! adapters never touches the styling code.
//!
//! ## Learning: Trait Objects
//!
//! `Box<dyn Tokenizer>` lets the caller pick an adapter at runtime. The
//! `Send + Sync` supertraits make the boxed value movable into a blocking
//! worker thread.

mod analyzer;
mod languages;
mod offsets;
mod pattern;
mod structural;
mod token;
mod tokenizer;

pub use analyzer::{AnalyzerCommand, AnalyzerInput, ExternalAnalyzer, parse_records};
pub use languages::{REGEX_LANGUAGES, builtin_table, detect_language, keyword_pattern};
pub use offsets::{Utf16Mapper, byte_offset, utf16_len};
pub use pattern::{CompositeMatcher, Matches, PatternEntry, PatternTable};
pub use structural::{STRUCTURAL_LANGUAGES, TreeSitterTokenizer};
pub use token::{Token, TokenKind};
pub use tokenizer::{RegexTokenizer, Tokenizer};

use std::io;
use std::time::Duration;

/// Result type for tokenizer operations.
pub type SyntaxResult<T> = Result<T, SyntaxError>;

/// Errors that can occur while building or running a tokenizer.
#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("Pattern table is empty")]
    EmptyPatternTable,

    #[error("Invalid pattern for {kind}: {source}")]
    InvalidPattern {
        kind: TokenKind,
        #[source]
        source: regex::Error,
    },

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Pattern table unusable: {0}")]
    InvalidPatternTable(String),

    #[error("Parser error")]
    ParseError,

    #[error("Failed to start analyzer {program}: {source}")]
    AnalyzerSpawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Analyzer exited with status {status:?}: {stderr}")]
    AnalyzerExit { status: Option<i32>, stderr: String },

    #[error("Analyzer did not finish within {0:?}")]
    AnalyzerTimeout(Duration),

    #[error("Malformed analyzer output: {0}")]
    MalformedOutput(#[from] serde_json::Error),

    #[error("Tokenizer worker failed: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapters_share_the_trait() {
        let adapters: Vec<Box<dyn Tokenizer>> = vec![
            Box::new(RegexTokenizer::for_language("java").unwrap()),
            Box::new(TreeSitterTokenizer::new("rust").unwrap()),
        ];
        for adapter in &adapters {
            let tokens = adapter.tokenize("// note\n").unwrap();
            assert_eq!(tokens[0].kind, TokenKind::Comment);
            assert!(!adapter.runs_off_thread());
        }
    }
}
