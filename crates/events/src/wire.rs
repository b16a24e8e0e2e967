//! WebSocket wire frame types shared by server and client.
//!
//! Every frame is JSON with the shape `{"channel": "<name>", "data": {...}}`,
//! deserialized via the internally-tagged `channel` field. The channel
//! names are the constants in [`coursehub_core::channels`].

use coursehub_core::channels;
use coursehub_core::types::{CourseId, ModuleId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Frames sent by the browser client to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "channel", content = "data")]
pub enum ClientFrame {
    /// Subscribe this connection to a course room.
    #[serde(rename = "join:course")]
    JoinCourse(CourseRef),

    /// Unsubscribe this connection from a course room.
    #[serde(rename = "leave:course")]
    LeaveCourse(CourseRef),

    /// Report a lesson progress change.
    #[serde(rename = "progress:update")]
    ProgressUpdate(ProgressReport),

    /// The user started typing in the course discussion.
    #[serde(rename = "typing:start")]
    TypingStart(CourseRef),

    /// The user stopped typing.
    #[serde(rename = "typing:stop")]
    TypingStop(CourseRef),
}

impl ClientFrame {
    /// The frame's wire channel name.
    pub fn channel(&self) -> &'static str {
        match self {
            ClientFrame::JoinCourse(_) => channels::JOIN_COURSE,
            ClientFrame::LeaveCourse(_) => channels::LEAVE_COURSE,
            ClientFrame::ProgressUpdate(_) => channels::PROGRESS_UPDATE,
            ClientFrame::TypingStart(_) => channels::TYPING_START,
            ClientFrame::TypingStop(_) => channels::TYPING_STOP,
        }
    }
}

/// Frames pushed by the server to browser clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "channel", content = "data")]
pub enum ServerFrame {
    /// Personal confirmation: the receiving user's enrollment succeeded.
    #[serde(rename = "enrollment:success")]
    EnrollmentSuccess(EnrollmentData),

    /// Room broadcast: another user enrolled in the course.
    #[serde(rename = "user:enrolled")]
    UserEnrolled(EnrollmentData),

    /// A user's completion percentage changed.
    #[serde(rename = "progress:updated")]
    ProgressUpdated(ProgressData),

    /// Personal confirmation: the receiving user completed a module.
    #[serde(rename = "module:completed")]
    ModuleCompleted(ModuleData),

    /// Room broadcast: another user completed a module.
    #[serde(rename = "user:module_completed")]
    UserModuleCompleted(ModuleData),

    /// Room broadcast: another user is typing.
    #[serde(rename = "user:typing")]
    UserTyping(TypingData),

    /// Room broadcast: another user stopped typing.
    #[serde(rename = "user:stopped_typing")]
    UserStoppedTyping(TypingData),
}

impl ServerFrame {
    /// The frame's wire channel name.
    pub fn channel(&self) -> &'static str {
        match self {
            ServerFrame::EnrollmentSuccess(_) => channels::ENROLLMENT_SUCCESS,
            ServerFrame::UserEnrolled(_) => channels::USER_ENROLLED,
            ServerFrame::ProgressUpdated(_) => channels::PROGRESS_UPDATED,
            ServerFrame::ModuleCompleted(_) => channels::MODULE_COMPLETED,
            ServerFrame::UserModuleCompleted(_) => channels::USER_MODULE_COMPLETED,
            ServerFrame::UserTyping(_) => channels::USER_TYPING,
            ServerFrame::UserStoppedTyping(_) => channels::USER_STOPPED_TYPING,
        }
    }

    /// The course this frame refers to.
    pub fn course_id(&self) -> CourseId {
        match self {
            ServerFrame::EnrollmentSuccess(d) | ServerFrame::UserEnrolled(d) => d.course_id,
            ServerFrame::ProgressUpdated(d) => d.course_id,
            ServerFrame::ModuleCompleted(d) | ServerFrame::UserModuleCompleted(d) => d.course_id,
            ServerFrame::UserTyping(d) | ServerFrame::UserStoppedTyping(d) => d.course_id,
        }
    }
}

/// Payload naming a course, used by join/leave/typing frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRef {
    pub course_id: CourseId,
}

/// Client-reported progress change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressReport {
    pub course_id: CourseId,
    /// Completion percentage (0.0 - 100.0).
    pub percent: f32,
}

/// Payload for enrollment frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentData {
    pub course_id: CourseId,
    pub user_id: UserId,
    /// Display data (course title, user name) supplied by the CRUD layer.
    pub payload: serde_json::Value,
    pub timestamp: Timestamp,
}

/// Payload for progress frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressData {
    pub course_id: CourseId,
    pub user_id: UserId,
    pub percent: f32,
    pub timestamp: Timestamp,
}

/// Payload for module-completion frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleData {
    pub course_id: CourseId,
    pub user_id: UserId,
    pub module_id: ModuleId,
    pub payload: serde_json::Value,
    pub timestamp: Timestamp,
}

/// Payload for typing indicator frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingData {
    pub course_id: CourseId,
    pub user_id: UserId,
    pub timestamp: Timestamp,
}

/// Parse a client frame from a WebSocket text message.
///
/// Returns `Err` for malformed JSON or unknown `channel` values.
/// Callers should log unknown channels and continue.
pub fn parse_client_frame(text: &str) -> Result<ClientFrame, serde_json::Error> {
    serde_json::from_str(text)
}

/// Parse a server frame from a WebSocket text message.
pub fn parse_server_frame(text: &str) -> Result<ServerFrame, serde_json::Error> {
    serde_json::from_str(text)
}
