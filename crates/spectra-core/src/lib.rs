//! # Spectra Core
//!
//! Highlighting state and the machinery that keeps it in sync with edits.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────┐  BufferChanged   ┌──────────────────────────────────┐
//! │   Document   │ ───────────────▶ │         HighlightSession         │
//! │ (TextBuffer) │  (EventBus)      │  ┌────────────────────────────┐  │
//! └──────┬───────┘                  │  │    HighlightController     │  │
//!        │ snapshot                 │  │  Tokenizer ─▶ TokenStore   │  │
//!        └────────────────────────▶ │  │  TransientAttributes       │  │
//!                                   │  └────────────────────────────┘  │
//! ┌──────────────┐  bounds (watch)  │                                  │
//! │  ScrollView  │ ───────────────▶ │  visible range ─▶ StyleSnapshot  │
//! └──────────────┘                  └───────────────┬──────────────────┘
//!                                                   │ (watch)
//!                                        ┌──────────┴──────────┐
//!                                        │ StyleView per renderer │
//!                                        └─────────────────────┘
//! ```
//!
//! ## Learning: Module Organization
//!
//! Each concern lives in its own file; `pub use` flattens the public API
//! so callers write `spectra_core::HighlightController` instead of
//! `spectra_core::controller::HighlightController`.

pub mod attributes;
pub mod config;
pub mod controller;
pub mod document;
pub mod event;
pub mod factory;
pub mod session;
pub mod store;
pub mod theme;
pub mod viewport;

pub use attributes::TransientAttributes;
pub use config::{AnalyzerConfig, Config, ConfigError, HighlightConfig, LanguageConfig};
pub use controller::{HighlightController, HighlightState, PassOutcome, PassTicket};
pub use document::{BufferSource, Document, DocumentId};
pub use event::{EditorEvent, EventBus};
pub use factory::tokenizer_for;
pub use session::{HighlightSession, SessionOptions, StyleSnapshot, StyleView, StyledSpan};
pub use store::TokenStore;
pub use theme::{Color, Theme};
pub use viewport::{BufferLayout, Rect, ScrollView, TextLayout, Viewport, compute_visible_range};

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Buffer error: {0}")]
    Buffer(#[from] spectra_buffer::BufferError),

    #[error("Syntax error: {0}")]
    Syntax(#[from] spectra_syntax::SyntaxError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Unknown theme: {0}")]
    UnknownTheme(String),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Theme parse error: {0}")]
    ThemeParse(#[from] toml::de::Error),

    #[error("Highlight session stopped")]
    SessionClosed,
}
