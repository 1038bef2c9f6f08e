//! UTF-8 byte offsets ↔ UTF-16 code unit offsets.
//!
//! Matchers and parsers report byte offsets into a `&str`; tokens are
//! measured in UTF-16 code units. Converting each offset from scratch
//! would make a full pass quadratic, so conversions made in ascending
//! order go through [`Utf16Mapper`], which only walks forward.

/// Returns the length of `text` in UTF-16 code units.
pub fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

/// Returns the byte offset of the character at UTF-16 offset `utf16`.
///
/// An offset between the halves of a surrogate pair rounds down to the
/// start of that character. Offsets past the end clamp to `text.len()`.
pub fn byte_offset(text: &str, utf16: usize) -> usize {
    let mut units = 0;
    for (idx, c) in text.char_indices() {
        let next = units + c.len_utf16();
        if next > utf16 {
            return idx;
        }
        units = next;
    }
    text.len()
}

/// Forward-only byte → UTF-16 converter.
#[derive(Debug, Clone)]
pub struct Utf16Mapper<'a> {
    text: &'a str,
    byte: usize,
    utf16: usize,
}

impl<'a> Utf16Mapper<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            byte: 0,
            utf16: 0,
        }
    }

    /// Converts a byte offset (on a char boundary) to a UTF-16 offset.
    ///
    /// Amortized O(1) when called with non-decreasing offsets; a query
    /// behind the previous one restarts from the beginning of the text.
    pub fn utf16_at(&mut self, byte: usize) -> usize {
        let byte = byte.min(self.text.len());
        if byte < self.byte {
            self.byte = 0;
            self.utf16 = 0;
        }
        self.utf16 += utf16_len(&self.text[self.byte..byte]);
        self.byte = byte;
        self.utf16
    }
}
