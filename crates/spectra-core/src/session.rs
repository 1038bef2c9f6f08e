//! Async driver that keeps a document highlighted.
//!
//! ## Learning: One owner, many readers
//!
//! The session task is the only code that touches its
//! [`HighlightController`]. Everything else talks to it through channels:
//!
//! - edits arrive on the document's `broadcast` bus
//! - viewport bounds arrive on a `watch` channel
//! - styled snapshots leave on another `watch` channel, which any number
//!   of renderers read through a [`StyleView`]
//!
//! Tokenizers that block on process I/O run under `spawn_blocking`. Their
//! result comes back to the session task before the store is touched, and
//! the task keeps listening for edits and scrolls while it waits.
//!
//! ## Coalescing
//!
//! After the first edit of a burst the task yields once (or sleeps for
//! the configured settle time), then drains every queued event before
//! snapshotting the text. A burst of keystrokes therefore costs one pass.

use spectra_syntax::{SyntaxError, TokenKind};
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::controller::{HighlightController, HighlightState, PassOutcome};
use crate::document::{BufferSource, Document, DocumentId};
use crate::event::EditorEvent;
use crate::theme::Color;
use crate::viewport::{Rect, TextLayout, compute_visible_range};
use crate::{Config, CoreError, CoreResult};

/// Scheduling knobs for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Wait after an edit before tokenizing (zero = next idle tick)
    pub settle: Duration,
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            settle: config.highlight.settle(),
        }
    }
}

/// A visible range tagged with its kind and resolved color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    pub range: Range<usize>,
    pub kind: TokenKind,
    pub color: Color,
}

/// Styling for the visible range, as published to renderers.
#[derive(Debug, Clone)]
pub struct StyleSnapshot {
    /// Bumped on every publish; 0 means nothing styled yet
    pub revision: u64,
    /// Generation of the token pass the spans come from
    pub generation: u64,
    /// Range the spans were computed for
    pub visible: Range<usize>,
    /// Sorted, non-overlapping spans inside `visible`
    pub spans: Arc<[StyledSpan]>,
    /// Color for unstyled text
    pub default_color: Color,
}

impl StyleSnapshot {
    fn empty(default_color: Color) -> Self {
        Self {
            revision: 0,
            generation: 0,
            visible: 0..0,
            spans: Arc::from(Vec::new()),
            default_color,
        }
    }

    /// True once spans from a token pass have been published. Restyles
    /// that happen before the first pass lands do not count.
    pub fn is_styled(&self) -> bool {
        self.generation > 0
    }

    pub fn span_at(&self, offset: usize) -> Option<&StyledSpan> {
        let idx = self.spans.partition_point(|s| s.range.end <= offset);
        self.spans.get(idx).filter(|s| s.range.start <= offset)
    }

    pub fn kind_at(&self, offset: usize) -> Option<TokenKind> {
        self.span_at(offset).map(|s| s.kind)
    }

    /// Color to paint the glyph at `offset`.
    pub fn color_at(&self, offset: usize) -> Color {
        self.span_at(offset).map_or(self.default_color, |s| s.color)
    }
}

/// A renderer's handle on a session's styling.
#[derive(Clone)]
pub struct StyleView {
    styles: watch::Receiver<StyleSnapshot>,
}

impl StyleView {
    /// Clones the latest snapshot.
    pub fn snapshot(&self) -> StyleSnapshot {
        self.styles.borrow().clone()
    }

    pub fn color_at(&self, offset: usize) -> Color {
        self.styles.borrow().color_at(offset)
    }

    pub fn kind_at(&self, offset: usize) -> Option<TokenKind> {
        self.styles.borrow().kind_at(offset)
    }

    /// Waits for the next publish.
    pub async fn changed(&mut self) -> CoreResult<StyleSnapshot> {
        self.styles
            .changed()
            .await
            .map_err(|_| CoreError::SessionClosed)?;
        Ok(self.styles.borrow_and_update().clone())
    }

    /// Waits until a snapshot satisfies `pred`, checking the current one
    /// first.
    pub async fn wait_for(
        &mut self,
        pred: impl FnMut(&StyleSnapshot) -> bool,
    ) -> CoreResult<StyleSnapshot> {
        let snapshot = self
            .styles
            .wait_for(pred)
            .await
            .map_err(|_| CoreError::SessionClosed)?;
        Ok(snapshot.clone())
    }
}

/// A running highlight task for one document.
///
/// The task ends when the document closes, or when this handle and every
/// [`StyleView`] cloned from it have been dropped.
pub struct HighlightSession {
    document: DocumentId,
    styles: watch::Receiver<StyleSnapshot>,
    task: JoinHandle<HighlightController>,
}

impl HighlightSession {
    /// Starts highlighting `document`. Must be called inside a tokio
    /// runtime. The first pass is scheduled immediately.
    pub fn spawn(
        document: &Document,
        controller: HighlightController,
        viewport: watch::Receiver<Rect>,
        layout: Arc<dyn TextLayout>,
        options: SessionOptions,
    ) -> Self {
        let (styles_tx, styles) =
            watch::channel(StyleSnapshot::empty(controller.theme().default_color()));

        let driver = SessionDriver {
            document: document.id(),
            controller,
            source: document.source(),
            // Subscribe before returning so no edit after spawn is missed
            events: document.subscribe(),
            viewport,
            viewport_open: true,
            layout,
            styles: styles_tx,
            settle: options.settle,
            revision: 0,
        };

        Self {
            document: document.id(),
            styles,
            task: tokio::spawn(driver.run()),
        }
    }

    pub fn document(&self) -> DocumentId {
        self.document
    }

    /// A new renderer handle.
    pub fn view(&self) -> StyleView {
        StyleView {
            styles: self.styles.clone(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the session to end (the document closed) and returns its
    /// controller.
    pub async fn join(self) -> CoreResult<HighlightController> {
        self.task.await.map_err(|err| {
            tracing::warn!(document = %self.document, error = %err, "highlight session panicked");
            CoreError::SessionClosed
        })
    }
}

/// What an incoming event means to the session.
enum Signal {
    Changed,
    Closed,
    Ignored,
}

struct SessionDriver {
    document: DocumentId,
    controller: HighlightController,
    source: BufferSource,
    events: broadcast::Receiver<EditorEvent>,
    viewport: watch::Receiver<Rect>,
    viewport_open: bool,
    layout: Arc<dyn TextLayout>,
    styles: watch::Sender<StyleSnapshot>,
    settle: Duration,
    revision: u64,
}

impl SessionDriver {
    async fn run(mut self) -> HighlightController {
        tracing::info!(
            document = %self.document,
            tokenizer = self.controller.tokenizer().name(),
            "highlight session started"
        );

        self.controller.on_buffer_changed();
        let mut open = self.drive_passes().await;

        while open {
            open = tokio::select! {
                event = self.events.recv() => match self.signal(event) {
                    Signal::Changed => {
                        if self.controller.on_buffer_changed() {
                            self.settle_and_drive().await
                        } else {
                            true
                        }
                    }
                    Signal::Closed => false,
                    Signal::Ignored => true,
                },
                changed = self.viewport.changed(), if self.viewport_open => {
                    self.on_viewport(changed);
                    true
                }
                _ = self.styles.closed() => {
                    tracing::debug!(document = %self.document, "no renderers left");
                    false
                }
            };
        }

        tracing::debug!(document = %self.document, "highlight session stopped");
        self.controller
    }

    fn signal(&self, event: Result<EditorEvent, RecvError>) -> Signal {
        match event {
            Ok(EditorEvent::BufferChanged(id)) if id == self.document => Signal::Changed,
            Ok(EditorEvent::BufferClosed(id)) if id == self.document => Signal::Closed,
            Ok(_) => Signal::Ignored,
            Err(RecvError::Lagged(missed)) => {
                // Missed events may have been edits
                tracing::debug!(document = %self.document, missed, "event receiver lagged");
                Signal::Changed
            }
            Err(RecvError::Closed) => Signal::Closed,
        }
    }

    async fn settle_and_drive(&mut self) -> bool {
        if self.styles.is_closed() {
            return false;
        }
        if self.settle.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.settle).await;
        }
        self.drain_events() && self.drive_passes().await
    }

    /// Folds already-queued events into the scheduled pass. Returns false
    /// if the document closed.
    fn drain_events(&mut self) -> bool {
        loop {
            let event = match self.events.try_recv() {
                Ok(event) => Ok(event),
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Lagged(missed)) => Err(RecvError::Lagged(missed)),
                Err(TryRecvError::Closed) => Err(RecvError::Closed),
            };
            match self.signal(event) {
                Signal::Changed => {
                    self.controller.on_buffer_changed();
                }
                Signal::Closed => return false,
                Signal::Ignored => {}
            }
        }
    }

    /// Runs passes until no edit is pending. Returns false if the session
    /// ended while a pass was in flight.
    async fn drive_passes(&mut self) -> bool {
        while self.controller.state() == HighlightState::Scheduled {
            if !self.run_pass().await {
                return false;
            }
        }
        true
    }

    async fn run_pass(&mut self) -> bool {
        let ticket = self.controller.begin_pass();
        let text = self.source.text();
        let tokenizer = Arc::clone(self.controller.tokenizer());

        let result = if tokenizer.runs_off_thread() {
            let mut work = tokio::task::spawn_blocking(move || tokenizer.tokenize(&text));
            loop {
                tokio::select! {
                    joined = &mut work => {
                        break joined.unwrap_or_else(|err| Err(SyntaxError::Worker(err.to_string())));
                    }
                    event = self.events.recv() => match self.signal(event) {
                        Signal::Changed => {
                            self.controller.on_buffer_changed();
                        }
                        // The worker runs to completion; its result is dropped
                        Signal::Closed => return false,
                        Signal::Ignored => {}
                    },
                    changed = self.viewport.changed(), if self.viewport_open => {
                        self.on_viewport(changed);
                    }
                    _ = self.styles.closed() => return false,
                }
            }
        } else {
            tokenizer.tokenize(&text)
        };

        if let PassOutcome::Applied { .. } = self.controller.complete_pass(ticket, result) {
            self.restyle();
        }
        true
    }

    fn on_viewport(&mut self, changed: Result<(), watch::error::RecvError>) {
        match changed {
            Ok(()) => self.restyle(),
            Err(_) => {
                // View is gone; keep styling against its last bounds
                tracing::debug!(document = %self.document, "viewport closed");
                self.viewport_open = false;
            }
        }
    }

    /// Reapplies the store to the visible range and publishes the result.
    fn restyle(&mut self) {
        let visible = compute_visible_range(&self.viewport, self.layout.as_ref());
        self.controller.apply_styling(visible.clone());

        let theme = self.controller.theme();
        let spans: Arc<[StyledSpan]> = self
            .controller
            .attributes()
            .spans_in(visible.clone())
            .map(|(range, kind)| StyledSpan {
                range,
                kind,
                color: theme.style_for_kind(kind),
            })
            .collect();

        self.revision += 1;
        tracing::trace!(
            document = %self.document,
            revision = self.revision,
            spans = spans.len(),
            "styles published"
        );
        self.styles.send_replace(StyleSnapshot {
            revision: self.revision,
            generation: self.controller.store().generation(),
            visible,
            spans,
            default_color: theme.default_color(),
        });
    }
}
