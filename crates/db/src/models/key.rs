//! SSH key rows.

use dirnotify_core::types::DirUuid;
use serde::Serialize;
use sqlx::FromRow;

/// Full row from the `keys` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct SshKey {
    pub uuid: DirUuid,
    pub fingerprint: String,
    pub name: String,
    pub comment: String,
}
