//! WebSocket infrastructure for real-time communication.
//!
//! Provides connection registration, room membership, heartbeat
//! monitoring, and the HTTP upgrade handler used by Axum routes.

mod handler;
mod heartbeat;
pub mod manager;
pub mod rooms;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
pub use rooms::RoomManager;
