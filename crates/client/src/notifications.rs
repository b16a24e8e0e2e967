//! Notification deduplication and the bounded notification list.
//!
//! Redundant server events (a reconnect-triggered replay upstream, the
//! same enrollment arriving on two channels) must not render twice.
//! [`NotificationCenter`] gates rendering with two independent guards:
//!
//! 1. an expiring dedup-key set -- each event maps to a stable key
//!    (`enrollment-{course}-{user}`, `module-{course}-{module}`, ...);
//!    a key seen within its window suppresses the event;
//! 2. a `(title, message)` scan over the unexpired notification list --
//!    an identical render within a short window is skipped even when
//!    the keys differ.
//!
//! The list holds at most the 5 most recent records; inserting a 6th
//! evicts the oldest regardless of read state. Records auto-dismiss
//! after a per-kind display timeout or via [`NotificationCenter::dismiss`].
//!
//! All expiry bookkeeping uses `tokio::time::Instant`, swept lazily on
//! access -- no background timer task.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use coursehub_core::types::Timestamp;
use coursehub_events::wire::ServerFrame;
use tokio::time::Instant;

/// Maximum number of notifications kept for rendering.
pub const MAX_NOTIFICATIONS: usize = 5;

/// Dedup window for enrollment events.
const ENROLLMENT_DEDUP_WINDOW: Duration = Duration::from_secs(5);
/// Dedup window for progress and module-completion events.
const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_secs(3);
/// Window for the second, render-level `(title, message)` guard.
const RENDER_GUARD_WINDOW: Duration = Duration::from_secs(3);
/// Display timeout for enrollment notifications.
const ENROLLMENT_DISPLAY_TIMEOUT: Duration = Duration::from_secs(5);
/// Display timeout for everything else.
const DEFAULT_DISPLAY_TIMEOUT: Duration = Duration::from_secs(4);

/// Notification categories, one per renderable event family.
///
/// Typing indicators never become notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Enrollment,
    Progress,
    ModuleCompletion,
}

impl NotificationKind {
    fn dedup_window(self) -> Duration {
        match self {
            NotificationKind::Enrollment => ENROLLMENT_DEDUP_WINDOW,
            NotificationKind::Progress | NotificationKind::ModuleCompletion => {
                DEFAULT_DEDUP_WINDOW
            }
        }
    }

    fn display_timeout(self) -> Duration {
        match self {
            NotificationKind::Enrollment => ENROLLMENT_DISPLAY_TIMEOUT,
            NotificationKind::Progress | NotificationKind::ModuleCompletion => {
                DEFAULT_DISPLAY_TIMEOUT
            }
        }
    }
}

/// One renderable notification.
#[derive(Debug, Clone)]
pub struct NotificationRecord {
    /// Monotonically increasing id, unique within this center.
    pub id: u64,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// Server-side event timestamp.
    pub timestamp: Timestamp,
    created_at: Instant,
    expires_at: Instant,
}

/// Dedup filter plus bounded notification list.
pub struct NotificationCenter {
    next_id: u64,
    /// Dedup key -> suppression expiry.
    recently_shown: HashMap<String, Instant>,
    notifications: VecDeque<NotificationRecord>,
}

impl NotificationCenter {
    /// Create an empty center.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            recently_shown: HashMap::new(),
            notifications: VecDeque::new(),
        }
    }

    /// Offer an inbound frame for rendering.
    ///
    /// Returns the id of the created record, or `None` when the frame is
    /// not renderable (typing) or was suppressed by either guard.
    pub fn offer(&mut self, frame: &ServerFrame) -> Option<u64> {
        let (kind, key, title, message, timestamp) = describe(frame)?;
        let now = Instant::now();

        self.sweep(now);

        // Guard 1: dedup key seen within its window.
        if self.recently_shown.contains_key(&key) {
            tracing::debug!(key = %key, "Notification suppressed (dedup key)");
            return None;
        }
        self.recently_shown.insert(key, now + kind.dedup_window());

        // Guard 2: identical render within the guard window, regardless
        // of key. Catches duplicates the key cannot, e.g. replays with
        // differing course ids but identical display text.
        let duplicate_render = self.notifications.iter().any(|n| {
            n.title == title
                && n.message == message
                && now.duration_since(n.created_at) < RENDER_GUARD_WINDOW
        });
        if duplicate_render {
            tracing::debug!(title = %title, "Notification suppressed (duplicate render)");
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;

        if self.notifications.len() >= MAX_NOTIFICATIONS {
            // Evict the oldest, read or not.
            self.notifications.pop_front();
        }
        self.notifications.push_back(NotificationRecord {
            id,
            kind,
            title,
            message,
            timestamp,
            created_at: now,
            expires_at: now + kind.display_timeout(),
        });

        Some(id)
    }

    /// The notifications currently eligible for rendering, oldest first.
    pub fn active(&mut self) -> Vec<&NotificationRecord> {
        self.sweep(Instant::now());
        self.notifications.iter().collect()
    }

    /// Manually dismiss a notification. Returns whether it was present.
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.notifications.len();
        self.notifications.retain(|n| n.id != id);
        self.notifications.len() != before
    }

    /// Drop expired dedup keys and timed-out notifications.
    fn sweep(&mut self, now: Instant) {
        self.recently_shown.retain(|_, expiry| *expiry > now);
        self.notifications.retain(|n| n.expires_at > now);
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive (kind, dedup key, title, message, timestamp) for a frame.
///
/// Returns `None` for frames that never render (typing indicators).
/// Display text prefers the payload's `course_title` / `module_title` /
/// `user_name` fields and falls back to raw ids.
fn describe(
    frame: &ServerFrame,
) -> Option<(NotificationKind, String, String, String, Timestamp)> {
    match frame {
        ServerFrame::EnrollmentSuccess(d) => Some((
            NotificationKind::Enrollment,
            format!("enrollment-{}-{}", d.course_id, d.user_id),
            "Enrollment confirmed".to_string(),
            format!(
                "You are now enrolled in {}",
                str_field(&d.payload, "course_title")
                    .unwrap_or_else(|| format!("course {}", d.course_id)),
            ),
            d.timestamp,
        )),
        ServerFrame::UserEnrolled(d) => Some((
            NotificationKind::Enrollment,
            format!("enrollment-{}-{}", d.course_id, d.user_id),
            "New classmate".to_string(),
            format!(
                "{} enrolled in {}",
                str_field(&d.payload, "user_name").unwrap_or_else(|| "A classmate".to_string()),
                str_field(&d.payload, "course_title")
                    .unwrap_or_else(|| format!("course {}", d.course_id)),
            ),
            d.timestamp,
        )),
        ServerFrame::ProgressUpdated(d) => Some((
            NotificationKind::Progress,
            format!("progress-{}-{}", d.course_id, d.user_id),
            "Progress updated".to_string(),
            format!("Course {} is now at {:.0}%", d.course_id, d.percent),
            d.timestamp,
        )),
        ServerFrame::ModuleCompleted(d) => Some((
            NotificationKind::ModuleCompletion,
            format!("module-{}-{}", d.course_id, d.module_id),
            "Module completed".to_string(),
            format!(
                "You completed {}",
                str_field(&d.payload, "module_title")
                    .unwrap_or_else(|| format!("module {}", d.module_id)),
            ),
            d.timestamp,
        )),
        ServerFrame::UserModuleCompleted(d) => Some((
            NotificationKind::ModuleCompletion,
            format!("module-{}-{}", d.course_id, d.module_id),
            "Classmate progress".to_string(),
            format!(
                "{} completed {}",
                str_field(&d.payload, "user_name").unwrap_or_else(|| "A classmate".to_string()),
                str_field(&d.payload, "module_title")
                    .unwrap_or_else(|| format!("module {}", d.module_id)),
            ),
            d.timestamp,
        )),
        ServerFrame::UserTyping(_) | ServerFrame::UserStoppedTyping(_) => None,
    }
}

/// Extract an owned string field from a JSON payload.
fn str_field(payload: &serde_json::Value, field: &str) -> Option<String> {
    payload.get(field)?.as_str().map(str::to_string)
}
