//! Documents: a buffer, its language, and the events it publishes.
//!
//! ## Learning: Newtypes and shared ownership
//!
//! `DocumentId` wraps a `Uuid` so an id can never be confused with any
//! other number or string.
//!
//! The buffer sits behind `Arc<RwLock<_>>`: the document is the only
//! writer, while highlight sessions and layout services hold a read-only
//! [`BufferSource`] and take a snapshot when they need one.

use serde::{Deserialize, Serialize};
use spectra_buffer::TextBuffer;
use std::ops::Range;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::event::{EditorEvent, EventBus};
use crate::{Config, CoreResult};

/// Unique identifier for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Creates a new unique document ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read-only handle to a document's buffer.
#[derive(Clone)]
pub struct BufferSource {
    buffer: Arc<RwLock<TextBuffer>>,
}

impl BufferSource {
    fn read(&self) -> RwLockReadGuard<'_, TextBuffer> {
        // A writer that panicked mid-edit leaves a consistent rope behind
        self.buffer.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` against the buffer under the read lock.
    pub fn with<R>(&self, f: impl FnOnce(&TextBuffer) -> R) -> R {
        f(&self.read())
    }

    /// Takes a full-text snapshot.
    pub fn text(&self) -> String {
        self.read().text().into_owned()
    }

    pub fn len_utf16(&self) -> usize {
        self.read().len_utf16()
    }

    pub fn len_lines(&self) -> usize {
        self.read().len_lines()
    }
}

/// A buffer being highlighted.
pub struct Document {
    /// Unique identifier
    id: DocumentId,

    /// The shared text buffer
    buffer: Arc<RwLock<TextBuffer>>,

    /// Display name
    name: String,

    /// Language used to pick a tokenizer
    language: String,

    /// Change notifications
    events: EventBus,
}

impl Document {
    /// Creates a document holding `text`.
    pub fn new(text: &str, language: impl Into<String>) -> Self {
        Self::with_buffer(TextBuffer::from(text), "Untitled".to_string(), language.into())
    }

    /// Opens a document from a file, detecting its language.
    pub fn from_file(path: impl AsRef<Path>, config: &Config) -> CoreResult<Self> {
        let path = path.as_ref();
        let buffer = TextBuffer::from_file(path)?;

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("Unknown")
            .to_string();
        let language = config.detect_language(&name);

        Ok(Self::with_buffer(buffer, name, language))
    }

    fn with_buffer(buffer: TextBuffer, name: String, language: String) -> Self {
        Self {
            id: DocumentId::new(),
            buffer: Arc::new(RwLock::new(buffer)),
            name,
            language,
            events: EventBus::new(),
        }
    }

    /// Overrides the detected language.
    pub fn set_language(&mut self, language: impl Into<String>) {
        self.language = language.into();
    }

    // ==================== Getters ====================

    /// Returns the document ID.
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Returns the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Returns a read-only handle to the buffer.
    pub fn source(&self) -> BufferSource {
        BufferSource {
            buffer: Arc::clone(&self.buffer),
        }
    }

    /// Returns all text.
    pub fn text(&self) -> String {
        self.source().text()
    }

    pub fn is_modified(&self) -> bool {
        self.source().with(TextBuffer::is_modified)
    }

    /// Subscribes to this document's events.
    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.events.subscribe()
    }

    // ==================== Text Editing ====================

    /// Inserts text at a character index.
    pub fn insert(&mut self, char_idx: usize, text: &str) -> CoreResult<()> {
        self.edit(|buffer| buffer.insert(char_idx, text))?;
        Ok(())
    }

    /// Deletes a character range.
    pub fn delete(&mut self, range: Range<usize>) -> CoreResult<String> {
        Ok(self.edit(|buffer| buffer.delete(range))?)
    }

    /// Replaces a character range.
    pub fn replace(&mut self, range: Range<usize>, text: &str) -> CoreResult<String> {
        Ok(self.edit(|buffer| buffer.replace(range, text))?)
    }

    /// Inserts text at a UTF-16 offset.
    pub fn insert_utf16(&mut self, offset: usize, text: &str) -> CoreResult<()> {
        self.edit(|buffer| buffer.insert_utf16(offset, text))?;
        Ok(())
    }

    /// Deletes a UTF-16 range.
    pub fn delete_utf16(&mut self, range: Range<usize>) -> CoreResult<String> {
        Ok(self.edit(|buffer| buffer.delete_utf16(range))?)
    }

    /// Replaces a UTF-16 range.
    pub fn replace_utf16(&mut self, range: Range<usize>, text: &str) -> CoreResult<String> {
        Ok(self.edit(|buffer| buffer.replace_utf16(range, text))?)
    }

    /// Applies an edit and, once the write lock is released, announces it.
    /// Failed edits leave the buffer untouched and emit nothing.
    fn edit<T, E>(&mut self, f: impl FnOnce(&mut TextBuffer) -> Result<T, E>) -> Result<T, E> {
        let result = {
            let mut buffer = self.write();
            f(&mut buffer)
        };
        if result.is_ok() {
            self.events.emit(EditorEvent::BufferChanged(self.id));
        }
        result
    }

    fn write(&self) -> RwLockWriteGuard<'_, TextBuffer> {
        self.buffer.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Closes the document, ending every session highlighting it.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Document {
    fn drop(&mut self) {
        tracing::debug!(document = %self.id, "closing document");
        self.events.emit(EditorEvent::BufferClosed(self.id));
    }
}
