//! The highlight controller: when to retokenize, and what to style.
//!
//! ## State machine
//!
//! ```text
//!            on_buffer_changed            begin_pass
//!   Idle ───────────────────▶ Scheduled ─────────────▶ Tokenizing
//!    ▲                            ▲                        │
//!    │   complete_pass            │ complete_pass          │
//!    │   (no edit meanwhile)      │ (edited meanwhile)     │
//!    └────────────────────────────┴────────────────────────┘
//! ```
//!
//! A change while `Tokenizing` does not interrupt the pass. It is
//! remembered, and completing the pass goes to `Scheduled` instead of
//! `Idle`, so a fresh pass follows right after.
//!
//! ## Learning: Errors that stop here
//!
//! Tokenizers return `SyntaxResult`, but nothing above the controller
//! ever sees those errors. `complete_pass` logs them and reports
//! [`PassOutcome::Failed`]; the store and the screen keep the last good
//! highlighting.

use spectra_syntax::{SyntaxResult, Token, TokenKind, Tokenizer};
use std::ops::Range;
use std::sync::Arc;

use crate::attributes::TransientAttributes;
use crate::store::TokenStore;
use crate::theme::{Color, Theme};

/// Where the controller is in its tokenize cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightState {
    Idle,
    Scheduled,
    Tokenizing,
}

/// Identifies one tokenization pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PassTicket {
    generation: u64,
}

impl PassTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What happened to a completed pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// The store now holds this pass's tokens
    Applied { tokens: usize },
    /// The tokenizer produced no result; the store is unchanged
    Failed,
    /// A newer pass was already applied; the result was discarded
    Stale,
}

/// Owns the token set and the transient attributes derived from it.
pub struct HighlightController {
    tokenizer: Arc<dyn Tokenizer>,
    theme: Arc<Theme>,
    store: TokenStore,
    attributes: TransientAttributes,
    state: HighlightState,
    /// Generation handed to the most recent `begin_pass`
    latest: u64,
    /// An edit arrived while the latest pass was running
    rerun: bool,
}

impl HighlightController {
    pub fn new(tokenizer: Arc<dyn Tokenizer>, theme: Arc<Theme>) -> Self {
        Self {
            tokenizer,
            theme,
            store: TokenStore::new(),
            attributes: TransientAttributes::new(),
            state: HighlightState::Idle,
            latest: 0,
            rerun: false,
        }
    }

    // ==================== Scheduling ====================

    pub fn state(&self) -> HighlightState {
        self.state
    }

    /// Records a committed edit.
    ///
    /// Returns true if the caller must schedule a pass. While a pass is
    /// already scheduled the edit folds into it; while one is running the
    /// edit queues exactly one follow-up pass.
    pub fn on_buffer_changed(&mut self) -> bool {
        match self.state {
            HighlightState::Idle => {
                self.state = HighlightState::Scheduled;
                true
            }
            HighlightState::Scheduled => false,
            HighlightState::Tokenizing => {
                self.rerun = true;
                false
            }
        }
    }

    /// Starts a pass. The caller snapshots the text after this call.
    pub fn begin_pass(&mut self) -> PassTicket {
        self.latest += 1;
        self.rerun = false;
        self.state = HighlightState::Tokenizing;
        PassTicket {
            generation: self.latest,
        }
    }

    /// Finishes a pass with the tokenizer's result.
    pub fn complete_pass(
        &mut self,
        ticket: PassTicket,
        result: SyntaxResult<Vec<Token>>,
    ) -> PassOutcome {
        let outcome = match result {
            Err(err) => {
                tracing::warn!(
                    tokenizer = self.tokenizer.name(),
                    generation = ticket.generation,
                    error = %err,
                    "tokenization failed, keeping previous highlighting"
                );
                PassOutcome::Failed
            }
            Ok(tokens) => {
                let count = tokens.len();
                if self.store.replace(ticket.generation, tokens) {
                    tracing::debug!(generation = ticket.generation, tokens = count, "pass applied");
                    PassOutcome::Applied { tokens: count }
                } else {
                    tracing::debug!(
                        generation = ticket.generation,
                        applied = self.store.generation(),
                        "stale pass discarded"
                    );
                    PassOutcome::Stale
                }
            }
        };

        // Older passes finishing late do not move the state machine
        if ticket.generation == self.latest {
            self.state = if std::mem::take(&mut self.rerun) {
                HighlightState::Scheduled
            } else {
                HighlightState::Idle
            };
        }
        outcome
    }

    /// Runs a full pass synchronously against `text`.
    pub fn retokenize(&mut self, text: &str) -> PassOutcome {
        let ticket = self.begin_pass();
        let result = self.tokenizer.tokenize(text);
        self.complete_pass(ticket, result)
    }

    // ==================== Styling ====================

    /// Rewrites the transient attributes over `visible` from the store.
    ///
    /// Markers outside `visible` are left alone; tokens are clipped so no
    /// marker is ever written outside it. Returns the number written.
    pub fn apply_styling(&mut self, visible: Range<usize>) -> usize {
        self.attributes.clear(visible.clone());
        let mut marked = 0;
        for token in self.store.tokens_in(visible.clone()) {
            if let Some(clipped) = token.clipped_to(&visible) {
                self.attributes.mark(clipped.range, clipped.kind);
                marked += 1;
            }
        }
        marked
    }

    /// Pure kind-to-color lookup.
    pub fn style_for_kind(&self, kind: TokenKind) -> Color {
        self.theme.style_for_kind(kind)
    }

    /// Color to paint at `offset`, if a marker covers it.
    pub fn style_at(&self, offset: usize) -> Option<Color> {
        self.attributes
            .kind_at(offset)
            .map(|kind| self.style_for_kind(kind))
    }

    // ==================== Accessors ====================

    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }

    pub fn theme(&self) -> &Arc<Theme> {
        &self.theme
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn tokens(&self) -> &[Token] {
        self.store.tokens()
    }

    pub fn attributes(&self) -> &TransientAttributes {
        &self.attributes
    }
}
