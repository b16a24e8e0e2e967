//! Well-known wire channel name constants.
//!
//! These must match the `channel` tag on every frame exchanged over the
//! WebSocket, and are referenced by the realtime router, the upgrade
//! handler, and the client session.

// ---- client -> server ----

/// Subscribe the connection to a course room.
pub const JOIN_COURSE: &str = "join:course";

/// Unsubscribe the connection from a course room.
pub const LEAVE_COURSE: &str = "leave:course";

/// Report lesson progress from the client.
pub const PROGRESS_UPDATE: &str = "progress:update";

/// The user started typing in a course discussion.
pub const TYPING_START: &str = "typing:start";

/// The user stopped typing.
pub const TYPING_STOP: &str = "typing:stop";

// ---- server -> client ----

/// Personal confirmation that the acting user's enrollment succeeded.
pub const ENROLLMENT_SUCCESS: &str = "enrollment:success";

/// Broadcast to a course room: another user enrolled.
pub const USER_ENROLLED: &str = "user:enrolled";

/// Progress change for a course, fanned out to the room and the actor.
pub const PROGRESS_UPDATED: &str = "progress:updated";

/// Personal confirmation that the acting user completed a module.
pub const MODULE_COMPLETED: &str = "module:completed";

/// Broadcast to a course room: another user completed a module.
pub const USER_MODULE_COMPLETED: &str = "user:module_completed";

/// Broadcast to a course room: another user is typing.
pub const USER_TYPING: &str = "user:typing";

/// Broadcast to a course room: another user stopped typing.
pub const USER_STOPPED_TYPING: &str = "user:stopped_typing";
