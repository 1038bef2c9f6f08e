//! Core text buffer implementation using rope data structure.
//!
//! ## Why Rope?
//!
//! Highlighting re-reads the buffer after every committed edit, so the
//! buffer must make both edits and offset conversions cheap:
//! - **Edits**: O(log n) insertions/deletions
//! - **Offset conversion**: the rope tracks UTF-16 code unit counts per
//!   chunk, so char ↔ UTF-16 conversion is O(log n) as well
//! - **Line lookup**: line starts are indexed the same way
//!
//! ## Learning: Two Index Spaces
//!
//! ```rust,ignore
//! let mut buffer = TextBuffer::from("a😀b");
//! assert_eq!(buffer.len_chars(), 3);  // 'a', '😀', 'b'
//! assert_eq!(buffer.len_utf16(), 4);  // the emoji is a surrogate pair
//! buffer.insert_utf16(3, "!")?;       // after the emoji
//! ```

use ropey::Rope;
use std::borrow::Cow;
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::{BufferError, BufferResult};

/// A text buffer backed by a rope data structure.
///
/// # Thread Safety
///
/// `TextBuffer` is `Send + Sync`, but mutation requires `&mut self`.
/// Share it behind a lock and hand tokenizers an owned snapshot.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    /// The rope holding our text content
    rope: Rope,

    /// Whether the buffer has been edited since it was loaded
    modified: bool,

    /// Associated file path (if any)
    file_path: Option<PathBuf>,
}

impl TextBuffer {
    /// Creates a new empty buffer.
    ///
    /// # Example
    /// ```
    /// use spectra_buffer::TextBuffer;
    ///
    /// let buffer = TextBuffer::new();
    /// assert!(buffer.is_empty());
    /// ```
    pub fn new() -> Self {
        Self {
            rope: Rope::new(),
            modified: false,
            file_path: None,
        }
    }

    /// Loads a buffer from a file.
    pub fn from_file(path: impl AsRef<Path>) -> BufferResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        Ok(Self {
            rope: Rope::from_str(&content),
            modified: false,
            file_path: Some(path.to_path_buf()),
        })
    }

    // ==================== Text Access ====================

    /// Returns the entire text content as a `Cow<str>`.
    ///
    /// Small buffers that fit in one rope chunk are borrowed; anything
    /// larger is assembled into an owned `String`.
    #[inline]
    pub fn text(&self) -> Cow<'_, str> {
        self.rope.slice(..).into()
    }

    /// Returns the text covered by a UTF-16 range.
    pub fn slice_utf16(&self, range: Range<usize>) -> BufferResult<Cow<'_, str>> {
        let chars = self.utf16_range_to_chars(range)?;
        Ok(self.rope.slice(chars).into())
    }

    // ==================== Measurements ====================

    /// Returns true if the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Returns the number of Unicode scalar values in the buffer.
    #[inline]
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Returns the length of the buffer in UTF-16 code units.
    #[inline]
    pub fn len_utf16(&self) -> usize {
        self.rope.len_utf16_cu()
    }

    /// Returns the number of lines in the buffer.
    ///
    /// An empty buffer has 1 line. A buffer ending with `\n` counts
    /// the empty line after it.
    #[inline]
    pub fn len_lines(&self) -> usize {
        self.rope.len_lines()
    }

    // ==================== Mutations ====================

    /// Inserts text at a character index.
    pub fn insert(&mut self, char_idx: usize, text: &str) -> BufferResult<()> {
        if char_idx > self.len_chars() {
            return Err(BufferError::InvalidCharIndex(char_idx));
        }

        self.rope.insert(char_idx, text);
        self.modified = true;
        Ok(())
    }

    /// Deletes text in a character range, returning what was removed.
    pub fn delete(&mut self, range: Range<usize>) -> BufferResult<String> {
        if range.start > range.end {
            return Err(BufferError::InvalidCharIndex(range.start));
        }
        if range.end > self.len_chars() {
            return Err(BufferError::InvalidCharIndex(range.end));
        }

        let deleted: String = self.rope.slice(range.clone()).into();
        self.rope.remove(range);
        self.modified = true;
        Ok(deleted)
    }

    /// Replaces text in a character range with new text.
    pub fn replace(&mut self, range: Range<usize>, text: &str) -> BufferResult<String> {
        let deleted = self.delete(range.clone())?;
        self.insert(range.start, text)?;
        Ok(deleted)
    }

    /// Inserts text at a UTF-16 offset.
    pub fn insert_utf16(&mut self, offset: usize, text: &str) -> BufferResult<()> {
        let char_idx = self.utf16_to_char(offset)?;
        self.insert(char_idx, text)
    }

    /// Deletes text in a UTF-16 range.
    pub fn delete_utf16(&mut self, range: Range<usize>) -> BufferResult<String> {
        let chars = self.utf16_range_to_chars(range)?;
        self.delete(chars)
    }

    /// Replaces text in a UTF-16 range.
    pub fn replace_utf16(&mut self, range: Range<usize>, text: &str) -> BufferResult<String> {
        let chars = self.utf16_range_to_chars(range)?;
        self.replace(chars, text)
    }

    // ==================== Offset Conversion ====================

    /// Converts a character index to a UTF-16 offset.
    pub fn char_to_utf16(&self, char_idx: usize) -> BufferResult<usize> {
        if char_idx > self.len_chars() {
            return Err(BufferError::InvalidCharIndex(char_idx));
        }
        Ok(self.rope.char_to_utf16_cu(char_idx))
    }

    /// Converts a UTF-16 offset to a character index.
    ///
    /// An offset that falls between the two halves of a surrogate pair
    /// resolves to the character containing it.
    pub fn utf16_to_char(&self, offset: usize) -> BufferResult<usize> {
        if offset > self.len_utf16() {
            return Err(BufferError::InvalidUtf16Offset(offset));
        }
        Ok(self.rope.utf16_cu_to_char(offset))
    }

    /// Returns the line containing a UTF-16 offset.
    ///
    /// Offsets past the end resolve to the last line.
    pub fn line_of_utf16(&self, offset: usize) -> usize {
        let offset = offset.min(self.len_utf16());
        self.rope.char_to_line(self.rope.utf16_cu_to_char(offset))
    }

    /// Returns the UTF-16 offset where a line starts.
    ///
    /// `line == len_lines()` is accepted and yields the buffer length, so
    /// `line_start_utf16(n + 1)` is always the exclusive end of line `n`.
    pub fn line_start_utf16(&self, line: usize) -> BufferResult<usize> {
        let lines = self.len_lines();
        if line > lines {
            return Err(BufferError::LineOutOfBounds(line));
        }
        if line == lines {
            return Ok(self.len_utf16());
        }
        Ok(self.rope.char_to_utf16_cu(self.rope.line_to_char(line)))
    }

    fn utf16_range_to_chars(&self, range: Range<usize>) -> BufferResult<Range<usize>> {
        if range.start > range.end {
            return Err(BufferError::InvalidUtf16Offset(range.start));
        }
        let start = self.utf16_to_char(range.start)?;
        let end = self.utf16_to_char(range.end)?;
        Ok(start..end)
    }

    // ==================== State Queries ====================

    /// Returns true if the buffer has been edited since it was loaded.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Returns the associated file path, if any.
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for TextBuffer {
    fn from(s: &str) -> Self {
        Self {
            rope: Rope::from_str(s),
            modified: false,
            file_path: None,
        }
    }
}

impl From<String> for TextBuffer {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;

    #[test]
    fn test_utf16_lengths_count_surrogate_pairs() {
        let buffer = TextBuffer::from("a😀b");
        assert_eq!(buffer.len_chars(), 3);
        assert_eq!(buffer.len_utf16(), 4);
        assert_eq!(buffer.char_to_utf16(2).unwrap(), 3);
        assert_eq!(buffer.utf16_to_char(3).unwrap(), 2);
    }

    #[test]
    fn test_utf16_offset_inside_surrogate_pair_rounds_down() {
        let buffer = TextBuffer::from("a😀b");
        assert_eq!(buffer.utf16_to_char(2).unwrap(), 1);
    }

    #[test]
    fn test_utf16_edits() {
        let mut buffer = TextBuffer::from("a😀b");
        buffer.insert_utf16(3, "!").unwrap();
        assert_eq!(buffer.text(), "a😀!b");

        let removed = buffer.delete_utf16(1..3).unwrap();
        assert_eq!(removed, "😀");
        assert_eq!(buffer.text(), "a!b");

        buffer.replace_utf16(0..1, "xyz").unwrap();
        assert_eq!(buffer.text(), "xyz!b");
    }

    #[test]
    fn test_slice_utf16() {
        let buffer = TextBuffer::from("// hello\nlet x = 42");
        assert_eq!(buffer.slice_utf16(17..19).unwrap(), "42");
        assert!(buffer.slice_utf16(17..40).is_err());
    }

    #[test]
    fn test_line_lookup() {
        let buffer = TextBuffer::from("one\ntwo\nthree");
        assert_eq!(buffer.len_lines(), 3);
        assert_eq!(buffer.line_start_utf16(0).unwrap(), 0);
        assert_eq!(buffer.line_start_utf16(1).unwrap(), 4);
        assert_eq!(buffer.line_start_utf16(2).unwrap(), 8);
        assert_eq!(buffer.line_start_utf16(3).unwrap(), 13);
        assert!(buffer.line_start_utf16(4).is_err());

        assert_eq!(buffer.line_of_utf16(0), 0);
        assert_eq!(buffer.line_of_utf16(3), 0);
        assert_eq!(buffer.line_of_utf16(4), 1);
        assert_eq!(buffer.line_of_utf16(100), 2);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "def x = 1").unwrap();

        let buffer = TextBuffer::from_file(file.path()).unwrap();
        assert_eq!(buffer.text(), "def x = 1");
        assert_eq!(buffer.file_path(), Some(file.path()));
        assert!(!buffer.is_modified());
    }

    proptest! {
        #[test]
        fn prop_utf16_length_matches_std(text in "\\PC{0,64}") {
            let buffer = TextBuffer::from(text.as_str());
            prop_assert_eq!(buffer.len_utf16(), text.encode_utf16().count());
        }
    }
}
