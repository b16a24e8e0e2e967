//! Coursehub real-time client library.
//!
//! Provides the browser-equivalent side of the real-time subsystem:
//!
//! - [`HubClient`] / [`SocketSession`] — one physical WebSocket
//!   connection with automatic, bounded reconnection and room
//!   re-subscription after every reconnect.
//! - [`NotificationCenter`] — dedup-gated, bounded notification list.
//! - [`ProgressProjector`] — merges progress events into locally held
//!   course-completion state.
//!
//! The session is an explicit object owned by the application context,
//! with a lifecycle tied to login/logout: call
//! [`SocketSession::connect`] after login and
//! [`SocketSession::disconnect`] on logout or unmount.

pub mod client;
pub mod notifications;
pub mod progress;
pub mod reconnect;
pub mod session;

pub use client::{ClientError, HubClient};
pub use notifications::{NotificationCenter, NotificationKind, NotificationRecord};
pub use progress::{CourseProgress, ProgressProjector};
pub use reconnect::ReconnectConfig;
pub use session::{ConnectionState, SocketSession};
