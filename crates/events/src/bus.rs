//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish side of the real-time pipeline. The CRUD
//! layer publishes a [`DomainEvent`] after its database write commits;
//! the realtime router subscribes and fans the event out to WebSocket
//! connections. Publishing is fire-and-forget: delivery problems never
//! propagate back to the caller.

use tokio::sync::broadcast;

use crate::event::DomainEvent;

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`DomainEvent`]. Designed to be
/// shared via `Arc<EventBus>` across the application.
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: DomainEvent) {
        // Ignore the SendError — it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::enrollment(
            7,
            42,
            serde_json::json!({"course_title": "Rust 101"}),
        ));

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.course_id, 42);
        assert_eq!(received.user_id, 7);
        assert!(matches!(received.kind, EventKind::Enrollment { .. }));
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(DomainEvent::typing(1, 2, true));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");

        assert_eq!(e1.course_id, 2);
        assert_eq!(e2.course_id, 2);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        // No subscribers — this must not panic.
        bus.publish(DomainEvent::progress(1, 2, 50.0));
    }

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::progress(1, 9, 10.0));
        bus.publish(DomainEvent::progress(1, 9, 20.0));
        bus.publish(DomainEvent::progress(1, 9, 30.0));

        for expected in [10.0f32, 20.0, 30.0] {
            let event = rx.recv().await.expect("should receive");
            match event.kind {
                EventKind::Progress { percent } => assert_eq!(percent, expected),
                other => panic!("Expected Progress, got {other:?}"),
            }
        }
    }
}
