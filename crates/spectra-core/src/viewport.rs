//! Viewport bounds and the layout service that maps them to text.
//!
//! The visible range is never stored. [`compute_visible_range`] asks the
//! viewport for its current bounds and the layout for the characters under
//! them every time, so it always reflects the live scroll position.

use std::ops::Range;
use tokio::sync::watch;

use crate::document::BufferSource;

/// A rectangle in view coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Something that knows which part of the document is on screen.
pub trait Viewport {
    /// Current scroll bounds.
    fn bounds(&self) -> Rect;
}

impl Viewport for Rect {
    fn bounds(&self) -> Rect {
        *self
    }
}

impl Viewport for watch::Receiver<Rect> {
    fn bounds(&self) -> Rect {
        *self.borrow()
    }
}

/// Maps between view geometry and UTF-16 text ranges.
pub trait TextLayout: Send + Sync {
    /// Characters laid out inside `rect`.
    fn char_range_for_rect(&self, rect: Rect) -> Range<usize>;

    /// One rectangle per line fragment of `range`.
    fn rects_for_range(&self, range: Range<usize>) -> Vec<Rect>;
}

/// Returns the UTF-16 range currently on screen.
pub fn compute_visible_range(viewport: &dyn Viewport, layout: &dyn TextLayout) -> Range<usize> {
    layout.char_range_for_rect(viewport.bounds())
}

/// Fixed-metrics layout: every line has the same height and every UTF-16
/// unit the same advance. Lines never wrap.
#[derive(Clone)]
pub struct BufferLayout {
    source: BufferSource,
    line_height: f32,
    advance: f32,
}

impl BufferLayout {
    pub fn new(source: BufferSource, line_height: f32) -> Self {
        Self {
            source,
            line_height: line_height.max(1.0),
            advance: 8.0,
        }
    }

    pub fn with_advance(mut self, advance: f32) -> Self {
        self.advance = advance.max(0.0);
        self
    }

    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    /// Lines intersecting the vertical span of `rect`, end exclusive.
    pub fn lines_for_rect(&self, rect: Rect) -> Range<usize> {
        let lines = self.source.len_lines();
        let first = (rect.y.max(0.0) / self.line_height).floor() as usize;
        let last = (rect.bottom().max(0.0) / self.line_height).ceil() as usize;
        first.min(lines)..last.min(lines).max(first.min(lines))
    }
}

impl TextLayout for BufferLayout {
    fn char_range_for_rect(&self, rect: Rect) -> Range<usize> {
        let lines = self.lines_for_rect(rect);
        self.source.with(|buffer| {
            let start = buffer.line_start_utf16(lines.start).unwrap_or(0);
            let end = buffer
                .line_start_utf16(lines.end)
                .unwrap_or_else(|_| buffer.len_utf16());
            start..end.max(start)
        })
    }

    fn rects_for_range(&self, range: Range<usize>) -> Vec<Rect> {
        self.source.with(|buffer| {
            let end = range.end.min(buffer.len_utf16());
            if range.start >= end {
                return Vec::new();
            }

            let first = buffer.line_of_utf16(range.start);
            let last = buffer.line_of_utf16(end.saturating_sub(1));
            (first..=last)
                .filter_map(|line| {
                    let line_start = buffer.line_start_utf16(line).ok()?;
                    let line_end = buffer.line_start_utf16(line + 1).ok()?;
                    let from = range.start.max(line_start);
                    let to = end.min(line_end);
                    Some(Rect::new(
                        (from - line_start) as f32 * self.advance,
                        line as f32 * self.line_height,
                        (to - from) as f32 * self.advance,
                        self.line_height,
                    ))
                })
                .collect()
        })
    }
}

/// A scrollable view whose bounds are published over a `watch` channel.
///
/// Highlight sessions hold the receiving side and restyle whenever the
/// bounds change.
pub struct ScrollView {
    bounds: watch::Sender<Rect>,
}

impl ScrollView {
    pub fn new(bounds: Rect) -> Self {
        let (bounds, _) = watch::channel(bounds);
        Self { bounds }
    }

    /// Receiver that observes every bounds change.
    pub fn subscribe(&self) -> watch::Receiver<Rect> {
        self.bounds.subscribe()
    }

    pub fn set_bounds(&self, bounds: Rect) {
        self.bounds.send_if_modified(|current| {
            let changed = *current != bounds;
            *current = bounds;
            changed
        });
    }

    /// Scrolls so that `y` is the top edge.
    pub fn scroll_to(&self, y: f32) {
        let mut bounds = self.bounds();
        bounds.y = y.max(0.0);
        self.set_bounds(bounds);
    }

    pub fn resize(&self, width: f32, height: f32) {
        let mut bounds = self.bounds();
        bounds.width = width;
        bounds.height = height;
        self.set_bounds(bounds);
    }
}

impl Viewport for ScrollView {
    fn bounds(&self) -> Rect {
        *self.bounds.borrow()
    }
}
