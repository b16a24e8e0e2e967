//! Domain event publishing and fan-out.
//!
//! [`EventPublisher`] is the inbound API the CRUD layer calls after a
//! database write commits; [`RealtimeRouter`] consumes the event bus and
//! pushes wire frames to the affected WebSocket connections.

pub mod publisher;
pub mod router;

pub use publisher::EventPublisher;
pub use router::RealtimeRouter;
