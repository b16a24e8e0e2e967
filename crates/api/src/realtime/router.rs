//! Event-to-frame routing engine.
//!
//! [`RealtimeRouter`] subscribes to the event bus and fans each
//! [`DomainEvent`] out to the affected WebSocket connections: the
//! acting user's own connections receive the personal frame variant,
//! the course room's other members receive the broadcast variant.
//!
//! A single router task consumes the bus in publish order and pushes
//! frames onto per-connection channels, so frames to the same socket
//! arrive in publish order. Delivery is best-effort and at-most-once
//! per connection per event; there is no persistence or retry.

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::ws::Message;
use coursehub_core::types::ConnectionId;
use coursehub_events::event::EventKind;
use coursehub_events::wire::{EnrollmentData, ModuleData, ProgressData, ServerFrame, TypingData};
use coursehub_events::DomainEvent;
use tokio::sync::broadcast;

use crate::ws::WsManager;

/// Routes domain events to live WebSocket connections.
pub struct RealtimeRouter {
    ws_manager: Arc<WsManager>,
}

impl RealtimeRouter {
    /// Create a new router over the given connection manager.
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Run the main routing loop.
    ///
    /// Subscribes to the event bus via `receiver` and processes each event.
    /// The loop exits when the channel is closed (i.e. the
    /// [`EventBus`](coursehub_events::EventBus) is dropped).
    pub async fn run(self, mut receiver: broadcast::Receiver<DomainEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.route_event(&event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Realtime router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, realtime router shutting down");
                    break;
                }
            }
        }
    }

    /// Fan a single event out to its audience.
    async fn route_event(&self, event: &DomainEvent) {
        match &event.kind {
            EventKind::Enrollment { payload } => {
                let data = EnrollmentData {
                    course_id: event.course_id,
                    user_id: event.user_id,
                    payload: payload.clone(),
                    timestamp: event.timestamp,
                };
                self.deliver_split(
                    event,
                    ServerFrame::EnrollmentSuccess(data.clone()),
                    ServerFrame::UserEnrolled(data),
                )
                .await;
            }
            EventKind::Progress { percent } => {
                let frame = ServerFrame::ProgressUpdated(ProgressData {
                    course_id: event.course_id,
                    user_id: event.user_id,
                    percent: *percent,
                    timestamp: event.timestamp,
                });
                // Single variant: room members and the actor's own
                // connections, once per connection.
                let mut targets = self.ws_manager.members_of(event.course_id).await;
                targets.extend(self.ws_manager.connections_for(event.user_id).await);
                self.send_frame(&targets, &frame).await;
            }
            EventKind::ModuleCompletion { module_id, payload } => {
                let data = ModuleData {
                    course_id: event.course_id,
                    user_id: event.user_id,
                    module_id: *module_id,
                    payload: payload.clone(),
                    timestamp: event.timestamp,
                };
                self.deliver_split(
                    event,
                    ServerFrame::ModuleCompleted(data.clone()),
                    ServerFrame::UserModuleCompleted(data),
                )
                .await;
            }
            EventKind::Typing { active } => {
                let data = TypingData {
                    course_id: event.course_id,
                    user_id: event.user_id,
                    timestamp: event.timestamp,
                };
                let frame = if *active {
                    ServerFrame::UserTyping(data)
                } else {
                    ServerFrame::UserStoppedTyping(data)
                };
                // Typing indicators only go to the room's other members;
                // nobody needs their own echo.
                let actor = self.ws_manager.connections_for(event.user_id).await;
                let targets: HashSet<ConnectionId> = self
                    .ws_manager
                    .members_of(event.course_id)
                    .await
                    .difference(&actor)
                    .cloned()
                    .collect();
                self.send_frame(&targets, &frame).await;
            }
        }
    }

    /// Deliver a personal frame to the actor's connections and a room
    /// frame to the course room's remaining members.
    ///
    /// The actor's connections are excluded from the room variant so each
    /// connection receives exactly one frame per publish, whether or not
    /// the actor has joined the room.
    async fn deliver_split(&self, event: &DomainEvent, personal: ServerFrame, room: ServerFrame) {
        let actor = self.ws_manager.connections_for(event.user_id).await;
        let members = self.ws_manager.members_of(event.course_id).await;
        let others: HashSet<ConnectionId> = members.difference(&actor).cloned().collect();

        self.send_frame(&actor, &personal).await;
        self.send_frame(&others, &room).await;
    }

    /// Encode a frame and push it to each target connection.
    ///
    /// Encoding and send failures are logged and swallowed; a delivery
    /// problem must never propagate back to the publishing operation.
    async fn send_frame(&self, targets: &HashSet<ConnectionId>, frame: &ServerFrame) {
        if targets.is_empty() {
            return;
        }
        match serde_json::to_string(frame) {
            Ok(text) => {
                let sent = self
                    .ws_manager
                    .send_to_connections(targets, Message::Text(text.into()))
                    .await;
                tracing::trace!(channel = frame.channel(), sent, "Delivered frame");
            }
            Err(e) => {
                tracing::error!(
                    channel = frame.channel(),
                    error = %e,
                    "Failed to encode server frame",
                );
            }
        }
    }
}
