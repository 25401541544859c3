//! Row-store seam used by the [`Notifier`](crate::Notifier).
//!
//! [`DirectoryStore`] is the narrow set of reads (and one write) the
//! notification handlers need. [`PgDirectoryStore`] implements it over the
//! `dirnotify-db` repositories.

use std::future::Future;

use dirnotify_core::types::{DirUuid, Timestamp};
use dirnotify_db::models::key::SshKey;
use dirnotify_db::models::metadata::LAST_KEY_MISMATCH;
use dirnotify_db::models::user::{DirectoryUser, UserContact};
use dirnotify_db::repositories::{KeyRepo, MetadataRepo, UserRepo};
use dirnotify_db::DbPool;

/// Error type for row-store lookups.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Lookups the notification handlers perform against the directory mirror.
pub trait DirectoryStore: Send + Sync {
    /// Full user row, or `None` if no such user exists.
    fn find_user(
        &self,
        uuid: DirUuid,
    ) -> impl Future<Output = Result<Option<DirectoryUser>, StoreError>> + Send;

    /// Login and email only.
    fn find_contact(
        &self,
        uuid: DirUuid,
    ) -> impl Future<Output = Result<Option<UserContact>, StoreError>> + Send;

    fn list_keys(&self, uuid: DirUuid)
        -> impl Future<Output = Result<Vec<SshKey>, StoreError>> + Send;

    /// Every account other than `excluding` holding a key with `fingerprint`.
    fn find_other_key_holders(
        &self,
        fingerprint: &str,
        excluding: DirUuid,
    ) -> impl Future<Output = Result<Vec<DirUuid>, StoreError>> + Send;

    /// Persisted time of the last key-mismatch event.
    fn last_mismatch_alert(
        &self,
    ) -> impl Future<Output = Result<Option<Timestamp>, StoreError>> + Send;

    fn record_mismatch_alert(
        &self,
        at: Timestamp,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// [`DirectoryStore`] backed by the Postgres mirror tables.
#[derive(Clone)]
pub struct PgDirectoryStore {
    pool: DbPool,
}

impl PgDirectoryStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl DirectoryStore for PgDirectoryStore {
    async fn find_user(&self, uuid: DirUuid) -> Result<Option<DirectoryUser>, StoreError> {
        Ok(UserRepo::find_by_uuid(&self.pool, uuid).await?)
    }

    async fn find_contact(&self, uuid: DirUuid) -> Result<Option<UserContact>, StoreError> {
        Ok(UserRepo::find_contact(&self.pool, uuid).await?)
    }

    async fn list_keys(&self, uuid: DirUuid) -> Result<Vec<SshKey>, StoreError> {
        Ok(KeyRepo::list_for_user(&self.pool, uuid).await?)
    }

    async fn find_other_key_holders(
        &self,
        fingerprint: &str,
        excluding: DirUuid,
    ) -> Result<Vec<DirUuid>, StoreError> {
        Ok(KeyRepo::find_other_holders(&self.pool, fingerprint, excluding).await?)
    }

    async fn last_mismatch_alert(&self) -> Result<Option<Timestamp>, StoreError> {
        let raw = MetadataRepo::get(&self.pool, LAST_KEY_MISMATCH).await?;
        Ok(raw.and_then(|value| parse_stored_timestamp(&value)))
    }

    async fn record_mismatch_alert(&self, at: Timestamp) -> Result<(), StoreError> {
        MetadataRepo::upsert(&self.pool, LAST_KEY_MISMATCH, &at.to_rfc3339()).await?;
        Ok(())
    }
}

/// Parse a persisted RFC 3339 timestamp. Garbage is logged and ignored.
fn parse_stored_timestamp(value: &str) -> Option<Timestamp> {
    match chrono::DateTime::parse_from_rfc3339(value) {
        Ok(ts) => Some(ts.with_timezone(&chrono::Utc)),
        Err(e) => {
            tracing::warn!(
                key = LAST_KEY_MISMATCH,
                value,
                error = %e,
                "Ignoring unparsable stored timestamp"
            );
            None
        }
    }
}
