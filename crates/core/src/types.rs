/// Users, courses, and modules are keyed by BIGSERIAL ids in the
/// platform database.
pub type UserId = i64;

/// Course ids double as room ids on the real-time side.
pub type CourseId = i64;

/// Module ids are unique within the platform, not per course.
pub type ModuleId = i64;

/// One live WebSocket connection (UUID v4 string, minted at upgrade time).
pub type ConnectionId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
