/// Directory entries are keyed by their `entryUUID`.
pub type DirUuid = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
