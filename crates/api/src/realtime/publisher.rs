//! Inbound domain-event API for the CRUD/auth layer.
//!
//! Each operation stamps a [`DomainEvent`] and publishes it on the event
//! bus. Publishing is fire-and-forget relative to the triggering write:
//! a bus with no subscribers drops the event silently and delivery
//! problems downstream never reach the caller. Real-time notification is
//! a best-effort enhancement, not a correctness-critical path.

use std::sync::Arc;

use coursehub_core::types::{CourseId, ModuleId, UserId};
use coursehub_events::{DomainEvent, EventBus};

/// Domain-level publish API, one operation per event variant.
pub struct EventPublisher {
    bus: Arc<EventBus>,
}

impl EventPublisher {
    /// Create a publisher over the given bus.
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }

    /// Announce that `user_id` enrolled in `course_id`.
    ///
    /// `payload` carries display data (course title, user name) the
    /// client renders without a re-fetch.
    pub fn publish_enrollment(
        &self,
        user_id: UserId,
        course_id: CourseId,
        payload: serde_json::Value,
    ) {
        tracing::debug!(user_id, course_id, "Publishing enrollment event");
        self.bus
            .publish(DomainEvent::enrollment(user_id, course_id, payload));
    }

    /// Announce a completion-percentage change for `user_id` in `course_id`.
    pub fn publish_progress_update(&self, user_id: UserId, course_id: CourseId, percent: f32) {
        tracing::debug!(user_id, course_id, percent, "Publishing progress event");
        self.bus
            .publish(DomainEvent::progress(user_id, course_id, percent));
    }

    /// Announce that `user_id` completed `module_id` of `course_id`.
    pub fn publish_module_completion(
        &self,
        user_id: UserId,
        course_id: CourseId,
        module_id: ModuleId,
        payload: serde_json::Value,
    ) {
        tracing::debug!(user_id, course_id, module_id, "Publishing module completion event");
        self.bus.publish(DomainEvent::module_completion(
            user_id, course_id, module_id, payload,
        ));
    }

    /// Announce a typing indicator change. `active` is true for
    /// typing:start, false for typing:stop.
    pub fn publish_typing(&self, user_id: UserId, course_id: CourseId, active: bool) {
        self.bus
            .publish(DomainEvent::typing(user_id, course_id, active));
    }
}
