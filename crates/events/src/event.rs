//! The canonical domain event envelope.
//!
//! Events are transient: constructed by the publisher, fanned out once,
//! never stored. Missed state is recovered by the client through an
//! authoritative re-fetch, not replay.

use chrono::Utc;
use coursehub_core::types::{CourseId, ModuleId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// A domain event describing something that happened in a course.
///
/// `user_id` is the acting user (the one who enrolled, made progress,
/// completed a module, or is typing). The timestamp is stamped at
/// construction time on the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub course_id: CourseId,
    pub user_id: UserId,
    pub timestamp: Timestamp,
    pub kind: EventKind,
}

/// The event-specific variant data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EventKind {
    /// The user enrolled in the course.
    #[serde(rename = "enrollment")]
    Enrollment {
        /// Free-form JSON carrying course/user display data.
        payload: serde_json::Value,
    },

    /// The user's completion percentage for the course changed.
    #[serde(rename = "progress")]
    Progress {
        /// Completion percentage (0.0 - 100.0).
        percent: f32,
    },

    /// The user completed a module of the course.
    #[serde(rename = "module_completion")]
    ModuleCompletion {
        module_id: ModuleId,
        payload: serde_json::Value,
    },

    /// The user started or stopped typing in the course discussion.
    #[serde(rename = "typing")]
    Typing { active: bool },
}

impl DomainEvent {
    /// An enrollment event for `user_id` in `course_id`.
    pub fn enrollment(user_id: UserId, course_id: CourseId, payload: serde_json::Value) -> Self {
        Self {
            course_id,
            user_id,
            timestamp: Utc::now(),
            kind: EventKind::Enrollment { payload },
        }
    }

    /// A progress event carrying the new completion percentage.
    pub fn progress(user_id: UserId, course_id: CourseId, percent: f32) -> Self {
        Self {
            course_id,
            user_id,
            timestamp: Utc::now(),
            kind: EventKind::Progress { percent },
        }
    }

    /// A module-completion event.
    pub fn module_completion(
        user_id: UserId,
        course_id: CourseId,
        module_id: ModuleId,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            course_id,
            user_id,
            timestamp: Utc::now(),
            kind: EventKind::ModuleCompletion { module_id, payload },
        }
    }

    /// A typing indicator event. `active` is true for typing:start.
    pub fn typing(user_id: UserId, course_id: CourseId, active: bool) -> Self {
        Self {
            course_id,
            user_id,
            timestamp: Utc::now(),
            kind: EventKind::Typing { active },
        }
    }
}
