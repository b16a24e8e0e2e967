use std::collections::{HashMap, HashSet};

use axum::body::Bytes;
use axum::extract::ws::Message;
use chrono::Utc;
use coursehub_core::types::{ConnectionId, CourseId, Timestamp, UserId};
use tokio::sync::{mpsc, RwLock};

use crate::ws::rooms::RoomManager;

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Metadata for a single WebSocket connection.
///
/// The handshake layer validates the bearer token before the connection
/// is registered, so every connection arrives with an authenticated user.
pub struct WsConnection {
    /// Authenticated owner of this connection.
    pub user_id: UserId,
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
    /// Liveness timestamp, refreshed on every Pong.
    pub last_seen: Timestamp,
}

/// Registry state guarded by a single lock.
///
/// The room index lives behind the same lock as the connection map so an
/// unregister purges room membership atomically -- no window where a dead
/// connection is still a room member.
#[derive(Default)]
struct Inner {
    connections: HashMap<ConnectionId, WsConnection>,
    by_user: HashMap<UserId, HashSet<ConnectionId>>,
    rooms: RoomManager,
}

/// Manages all active WebSocket connections and their room memberships.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application. A user may hold any number of
/// connections (multi-tab); each connection belongs to exactly one user.
pub struct WsManager {
    inner: RwLock<Inner>,
}

impl WsManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Register a new connection for an authenticated user.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink. Re-registering an existing
    /// connection id replaces the previous entry and resets its room
    /// memberships.
    pub async fn register(
        &self,
        conn_id: ConnectionId,
        user_id: UserId,
    ) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let now = Utc::now();
        let conn = WsConnection {
            user_id,
            sender: tx,
            connected_at: now,
            last_seen: now,
        };

        let mut inner = self.inner.write().await;
        if let Some(old) = inner.connections.insert(conn_id.clone(), conn) {
            inner.rooms.purge_connection(&conn_id);
            Self::drop_user_index(&mut inner, old.user_id, &conn_id);
        }
        inner.by_user.entry(user_id).or_default().insert(conn_id);
        rx
    }

    /// Remove a connection and purge it from every room it joined.
    ///
    /// When the user's last connection goes away the user index entry is
    /// dropped too -- the user is then fully offline.
    pub async fn unregister(&self, conn_id: &str) {
        let mut inner = self.inner.write().await;
        if let Some(conn) = inner.connections.remove(conn_id) {
            inner.rooms.purge_connection(conn_id);
            Self::drop_user_index(&mut inner, conn.user_id, conn_id);
        }
    }

    /// Find all connection ids belonging to a given user.
    /// Used to push personal (non-room) events.
    pub async fn connections_for(&self, user_id: UserId) -> HashSet<ConnectionId> {
        self.inner
            .read()
            .await
            .by_user
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Subscribe a connection to a course room. Idempotent.
    ///
    /// Returns `false` if the connection is not registered (a frame raced
    /// with its own disconnect).
    pub async fn join(&self, conn_id: &str, course_id: CourseId) -> bool {
        let mut inner = self.inner.write().await;
        if !inner.connections.contains_key(conn_id) {
            return false;
        }
        inner.rooms.join(conn_id, course_id);
        true
    }

    /// Unsubscribe a connection from a course room. No-op if absent.
    pub async fn leave(&self, conn_id: &str, course_id: CourseId) {
        self.inner.write().await.rooms.leave(conn_id, course_id);
    }

    /// All member connections of a course room.
    pub async fn members_of(&self, course_id: CourseId) -> HashSet<ConnectionId> {
        self.inner.read().await.rooms.members_of(course_id)
    }

    /// Refresh a connection's liveness timestamp (called on Pong).
    pub async fn touch(&self, conn_id: &str) {
        if let Some(conn) = self.inner.write().await.connections.get_mut(conn_id) {
            conn.last_seen = Utc::now();
        }
    }

    /// Drop connections that have not been seen for longer than `max_idle`.
    ///
    /// Pruned connections are purged from rooms and the user index exactly
    /// like an explicit unregister. Returns the number pruned.
    pub async fn prune_stale(&self, max_idle: chrono::Duration) -> usize {
        let cutoff = Utc::now() - max_idle;
        let mut inner = self.inner.write().await;

        let stale: Vec<ConnectionId> = inner
            .connections
            .iter()
            .filter(|(_, conn)| conn.last_seen < cutoff)
            .map(|(id, _)| id.clone())
            .collect();

        for conn_id in &stale {
            if let Some(conn) = inner.connections.remove(conn_id) {
                inner.rooms.purge_connection(conn_id);
                Self::drop_user_index(&mut inner, conn.user_id, conn_id);
            }
        }
        stale.len()
    }

    /// Send a message to each listed connection, at most once per id.
    ///
    /// Connections whose send channels are closed are silently skipped
    /// (they will be cleaned up on their next receive loop iteration).
    /// Returns the number of connections the message was sent to.
    pub async fn send_to_connections(
        &self,
        targets: &HashSet<ConnectionId>,
        message: Message,
    ) -> usize {
        let inner = self.inner.read().await;
        let mut count = 0;
        for conn_id in targets {
            if let Some(conn) = inner.connections.get(conn_id) {
                if conn.sender.send(message.clone()).is_ok() {
                    count += 1;
                }
            }
        }
        count
    }

    /// Send a message to all connections belonging to a specific user.
    ///
    /// Returns the number of connections the message was sent to.
    pub async fn send_to_user(&self, user_id: UserId, message: Message) -> usize {
        let inner = self.inner.read().await;
        let Some(conn_ids) = inner.by_user.get(&user_id) else {
            return 0;
        };
        let mut count = 0;
        for conn_id in conn_ids {
            if let Some(conn) = inner.connections.get(conn_id) {
                if conn.sender.send(message.clone()).is_ok() {
                    count += 1;
                }
            }
        }
        count
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    /// Number of live (non-empty) rooms.
    pub async fn room_count(&self) -> usize {
        self.inner.read().await.rooms.room_count()
    }

    /// Send a Ping frame to every connected client.
    ///
    /// Used by the heartbeat task to keep connections alive and detect
    /// stale ones.
    pub async fn ping_all(&self) {
        let inner = self.inner.read().await;
        for conn in inner.connections.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }

    /// Send a Close frame to every connection, then clear the registry.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops accepting new connections.
    pub async fn shutdown_all(&self) {
        let mut inner = self.inner.write().await;
        let count = inner.connections.len();
        for conn in inner.connections.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        let conn_ids: Vec<ConnectionId> = inner.connections.keys().cloned().collect();
        for conn_id in conn_ids {
            inner.rooms.purge_connection(&conn_id);
        }
        inner.connections.clear();
        inner.by_user.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Remove `conn_id` from the user's index entry, dropping the entry
    /// when it becomes empty.
    fn drop_user_index(inner: &mut Inner, user_id: UserId, conn_id: &str) {
        if let Some(conns) = inner.by_user.get_mut(&user_id) {
            conns.remove(conn_id);
            if conns.is_empty() {
                inner.by_user.remove(&user_id);
            }
        }
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}
