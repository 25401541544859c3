//! Repository for the `keys` table.

use dirnotify_core::types::DirUuid;
use sqlx::PgPool;

use crate::models::key::SshKey;

const COLUMNS: &str = "uuid, fingerprint, name, comment";

/// Read access to registered SSH keys.
pub struct KeyRepo;

impl KeyRepo {
    /// All keys registered to a user, ordered by name.
    pub async fn list_for_user(pool: &PgPool, uuid: DirUuid) -> Result<Vec<SshKey>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM keys WHERE uuid = $1 ORDER BY name, fingerprint");
        sqlx::query_as::<_, SshKey>(&query)
            .bind(uuid)
            .fetch_all(pool)
            .await
    }

    /// UUIDs of every other account holding a key with this fingerprint.
    pub async fn find_other_holders(
        pool: &PgPool,
        fingerprint: &str,
        excluding: DirUuid,
    ) -> Result<Vec<DirUuid>, sqlx::Error> {
        sqlx::query_scalar::<_, DirUuid>(
            "SELECT DISTINCT uuid FROM keys WHERE fingerprint = $1 AND uuid <> $2 ORDER BY uuid",
        )
        .bind(fingerprint)
        .bind(excluding)
        .fetch_all(pool)
        .await
    }
}
