use std::sync::Arc;

use coursehub_events::EventBus;

use crate::config::ServerConfig;
use crate::realtime::EventPublisher;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (JWT secret, timeouts).
    pub config: Arc<ServerConfig>,
    /// WebSocket connection and room manager.
    pub ws_manager: Arc<WsManager>,
    /// Centralized event bus for publishing domain events.
    pub event_bus: Arc<EventBus>,
    /// Domain-level publish API handed to the CRUD layer.
    pub publisher: Arc<EventPublisher>,
}
