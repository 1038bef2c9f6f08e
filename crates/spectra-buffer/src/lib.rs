//! # Spectra Buffer
//!
//! Rope-backed text buffer that speaks two offset dialects.
//!
//! ## Key Concepts
//!
//! ### Characters vs. UTF-16 code units
//! - Editing APIs take Unicode scalar (`char`) indices, like the rope itself
//! - Highlighting APIs take UTF-16 code unit offsets, because token ranges
//!   and viewport ranges are expressed in that unit
//! - `char_to_utf16` / `utf16_to_char` convert between the two in O(log n)
//!
//! ### Snapshots
//! - `text()` returns the whole buffer as a `Cow<str>`; tokenizers always
//!   work on such a snapshot, never on the live rope

mod buffer;

pub use buffer::TextBuffer;

/// Result type for buffer operations
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer operations
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error("Line {0} is out of bounds")]
    LineOutOfBounds(usize),

    #[error("Invalid character index: {0}")]
    InvalidCharIndex(usize),

    #[error("Invalid UTF-16 offset: {0}")]
    InvalidUtf16Offset(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
