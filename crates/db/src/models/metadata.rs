//! Notifier key/value state.

/// Metadata key holding the RFC 3339 time of the last key-mismatch event.
pub const LAST_KEY_MISMATCH: &str = "last_key_mismatch_alert";
