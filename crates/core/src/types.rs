/// Task identifiers are hyphenated UUID v4 strings.
pub type TaskId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a fresh random task identifier.
pub fn new_task_id() -> TaskId {
    uuid::Uuid::new_v4().to_string()
}

/// Whether `id` has the shape of an identifier produced by [`new_task_id`].
///
/// Identifiers become file names in the results directory, so anything else
/// is rejected before it gets near the filesystem.
pub fn is_task_id(id: &str) -> bool {
    uuid::Uuid::try_parse(id).is_ok()
}
