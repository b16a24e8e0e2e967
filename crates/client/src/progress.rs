//! Client-side projection of course completion state.
//!
//! [`ProgressProjector`] merges incoming progress frames into the
//! locally displayed per-course percentages without a full re-fetch.
//! It never creates courses on its own: the authoritative course list
//! comes from the CRUD layer via [`ProgressProjector::hydrate`], and the
//! projector only applies deltas on top of it.

use std::collections::HashMap;

use coursehub_core::types::{CourseId, ModuleId, UserId};
use coursehub_events::wire::ServerFrame;

/// Completion state for one tracked course.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseProgress {
    /// Completion percentage (0.0 - 100.0).
    pub percent: f32,
    /// The most recently completed module, if any.
    pub last_module: Option<ModuleId>,
}

impl CourseProgress {
    /// Progress at a given percentage with no module history.
    pub fn at(percent: f32) -> Self {
        Self {
            percent,
            last_module: None,
        }
    }
}

/// Reducer that folds progress frames into per-course completion state.
///
/// The projector belongs to one user: room broadcasts carry classmates'
/// progress too, and those must not touch the local display state.
#[derive(Debug)]
pub struct ProgressProjector {
    user_id: UserId,
    courses: HashMap<CourseId, CourseProgress>,
}

impl ProgressProjector {
    /// Create a projector for the given local user with no tracked
    /// courses. Call [`hydrate`](Self::hydrate) before applying frames.
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id,
            courses: HashMap::new(),
        }
    }

    /// Replace all tracked state with an authoritative snapshot.
    ///
    /// This is the only path that may lower a percentage: the snapshot
    /// comes from a CRUD re-fetch and wins over anything projected so
    /// far.
    pub fn hydrate(&mut self, entries: impl IntoIterator<Item = (CourseId, CourseProgress)>) {
        self.courses = entries.into_iter().collect();
    }

    /// Apply one inbound frame. Returns whether tracked state changed.
    ///
    /// Progress percentages are monotonic here: a stale or reordered
    /// frame with a lower percentage is ignored. Frames for unknown
    /// courses or other users are ignored.
    pub fn apply(&mut self, frame: &ServerFrame) -> bool {
        match frame {
            ServerFrame::ProgressUpdated(d) => {
                if d.user_id != self.user_id {
                    return false;
                }
                let Some(progress) = self.courses.get_mut(&d.course_id) else {
                    return false;
                };
                if d.percent > progress.percent {
                    progress.percent = d.percent;
                    true
                } else {
                    false
                }
            }
            ServerFrame::ModuleCompleted(d) => {
                if d.user_id != self.user_id {
                    return false;
                }
                let Some(progress) = self.courses.get_mut(&d.course_id) else {
                    return false;
                };
                if progress.last_module != Some(d.module_id) {
                    progress.last_module = Some(d.module_id);
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    /// Current percentage for a tracked course.
    pub fn percent(&self, course_id: CourseId) -> Option<f32> {
        self.courses.get(&course_id).map(|p| p.percent)
    }

    /// Most recently completed module for a tracked course.
    pub fn last_module(&self, course_id: CourseId) -> Option<ModuleId> {
        self.courses.get(&course_id).and_then(|p| p.last_module)
    }

    /// Ids of all tracked courses.
    pub fn tracked_courses(&self) -> Vec<CourseId> {
        self.courses.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use coursehub_events::wire::{ModuleData, ProgressData};

    fn progress_frame(course_id: i64, user_id: i64, percent: f32) -> ServerFrame {
        ServerFrame::ProgressUpdated(ProgressData {
            course_id,
            user_id,
            percent,
            timestamp: Utc::now(),
        })
    }

    fn module_frame(course_id: i64, user_id: i64, module_id: i64) -> ServerFrame {
        ServerFrame::ModuleCompleted(ModuleData {
            course_id,
            user_id,
            module_id,
            payload: serde_json::json!({}),
            timestamp: Utc::now(),
        })
    }

    fn hydrated() -> ProgressProjector {
        let mut projector = ProgressProjector::for_user(7);
        projector.hydrate([(1, CourseProgress::at(25.0)), (2, CourseProgress::at(80.0))]);
        projector
    }

    #[test]
    fn applies_progress_to_tracked_course() {
        let mut projector = hydrated();

        assert!(projector.apply(&progress_frame(1, 7, 37.5)));
        assert_eq!(projector.percent(1), Some(37.5));
    }

    #[test]
    fn ignores_unknown_course() {
        let mut projector = hydrated();

        assert!(!projector.apply(&progress_frame(99, 7, 50.0)));
        assert_eq!(projector.percent(99), None);
        assert_eq!(projector.tracked_courses().len(), 2);
    }

    #[test]
    fn ignores_other_users_progress() {
        let mut projector = hydrated();

        assert!(!projector.apply(&progress_frame(1, 8, 90.0)));
        assert_eq!(projector.percent(1), Some(25.0));
    }

    #[test]
    fn percentage_never_decreases_from_events() {
        let mut projector = hydrated();

        assert!(projector.apply(&progress_frame(1, 7, 50.0)));
        // A stale, reordered frame must not lower the display.
        assert!(!projector.apply(&progress_frame(1, 7, 30.0)));
        assert_eq!(projector.percent(1), Some(50.0));
    }

    #[test]
    fn hydrate_may_lower_percentage() {
        let mut projector = hydrated();

        projector.apply(&progress_frame(1, 7, 75.0));
        // Authoritative re-fetch wins even when lower.
        projector.hydrate([(1, CourseProgress::at(60.0))]);
        assert_eq!(projector.percent(1), Some(60.0));
    }

    #[test]
    fn module_completion_updates_last_module() {
        let mut projector = hydrated();

        assert!(projector.apply(&module_frame(1, 7, 301)));
        assert_eq!(projector.last_module(1), Some(301));

        // Same module again: no change.
        assert!(!projector.apply(&module_frame(1, 7, 301)));
    }

    #[test]
    fn classmate_module_completion_is_ignored() {
        let mut projector = hydrated();

        assert!(!projector.apply(&module_frame(1, 8, 301)));
        assert_eq!(projector.last_module(1), None);
    }
}
