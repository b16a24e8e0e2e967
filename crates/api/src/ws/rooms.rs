//! Per-course broadcast room membership.
//!
//! Rooms are a derived index, not a persisted entity: a room springs into
//! existence when its first connection joins and disappears when its last
//! member leaves. The manager keeps bidirectional mappings (room → members
//! and connection → rooms) so both broadcast resolution and disconnect
//! cleanup are O(1) lookups.
//!
//! This is a plain synchronous structure; it is locked together with the
//! connection registry so the disconnect-purge invariant cannot race.

use std::collections::{HashMap, HashSet};

use coursehub_core::types::{ConnectionId, CourseId};

/// Membership index of connections in per-course rooms.
#[derive(Debug, Default)]
pub struct RoomManager {
    /// Course id → member connection ids.
    members: HashMap<CourseId, HashSet<ConnectionId>>,
    /// Connection id → joined course ids (for disconnect cleanup).
    rooms_by_connection: HashMap<ConnectionId, HashSet<CourseId>>,
}

impl RoomManager {
    /// Create a new, empty room index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a course room. Idempotent: joining a room the
    /// connection is already in changes nothing.
    pub fn join(&mut self, conn_id: &str, course_id: CourseId) {
        self.members
            .entry(course_id)
            .or_default()
            .insert(conn_id.to_string());
        self.rooms_by_connection
            .entry(conn_id.to_string())
            .or_default()
            .insert(course_id);
    }

    /// Remove a connection from a course room. No-op if the connection is
    /// not a member. An emptied room is dropped entirely.
    pub fn leave(&mut self, conn_id: &str, course_id: CourseId) {
        if let Some(members) = self.members.get_mut(&course_id) {
            members.remove(conn_id);
            if members.is_empty() {
                self.members.remove(&course_id);
            }
        }
        if let Some(rooms) = self.rooms_by_connection.get_mut(conn_id) {
            rooms.remove(&course_id);
            if rooms.is_empty() {
                self.rooms_by_connection.remove(conn_id);
            }
        }
    }

    /// All member connections of a course room. Empty for unknown rooms.
    pub fn members_of(&self, course_id: CourseId) -> HashSet<ConnectionId> {
        self.members.get(&course_id).cloned().unwrap_or_default()
    }

    /// All rooms a connection has joined.
    pub fn rooms_of(&self, conn_id: &str) -> HashSet<CourseId> {
        self.rooms_by_connection
            .get(conn_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether a connection is a member of a course room.
    pub fn is_member(&self, conn_id: &str, course_id: CourseId) -> bool {
        self.members
            .get(&course_id)
            .is_some_and(|members| members.contains(conn_id))
    }

    /// Remove a connection from every room it belongs to.
    ///
    /// Called by the connection registry on unregister. Returns the number
    /// of rooms the connection was removed from.
    pub fn purge_connection(&mut self, conn_id: &str) -> usize {
        let Some(rooms) = self.rooms_by_connection.remove(conn_id) else {
            return 0;
        };
        let purged = rooms.len();
        for course_id in rooms {
            if let Some(members) = self.members.get_mut(&course_id) {
                members.remove(conn_id);
                if members.is_empty() {
                    self.members.remove(&course_id);
                }
            }
        }
        purged
    }

    /// Number of live (non-empty) rooms.
    pub fn room_count(&self) -> usize {
        self.members.len()
    }
}
