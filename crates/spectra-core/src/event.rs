//! Buffer notifications.
//!
//! ## Learning: Observer Pattern in Rust
//!
//! A document does not hold references to whoever highlights it. It owns a
//! `tokio::sync::broadcast` sender and hands out receivers:
//! - Events are values, not callbacks
//! - Dropping a receiver unsubscribes; there is nothing to deregister
//! - A slow subscriber lags instead of blocking the editor

use crate::document::DocumentId;
use tokio::sync::broadcast;

/// Events a document publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorEvent {
    /// An edit was committed to the buffer
    BufferChanged(DocumentId),
    /// The buffer was closed; subscribers should tear down
    BufferClosed(DocumentId),
}

impl EditorEvent {
    pub fn document(&self) -> DocumentId {
        match self {
            EditorEvent::BufferChanged(id) | EditorEvent::BufferClosed(id) => *id,
        }
    }
}

/// Event bus for broadcasting buffer events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EditorEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    pub fn new() -> Self {
        // Capacity of 256 events in the buffer
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    /// Emits an event to all subscribers.
    pub fn emit(&self, event: EditorEvent) {
        // No receivers is fine: nothing is highlighting this buffer
        let _ = self.sender.send(event);
    }

    /// Subscribes to events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let id = DocumentId::new();

        bus.emit(EditorEvent::BufferChanged(id));

        let event = rx.recv().await.unwrap();
        assert_eq!(event, EditorEvent::BufferChanged(id));
        assert_eq!(event.document(), id);
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit(EditorEvent::BufferClosed(DocumentId::new()));

        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }

    #[test]
    fn test_emit_without_subscribers() {
        EventBus::new().emit(EditorEvent::BufferChanged(DocumentId::new()));
    }
}
