//! Repository for the `users` table.

use dirnotify_core::types::DirUuid;
use sqlx::PgPool;

use crate::models::user::{DirectoryUser, UserContact};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "uuid, login, email, status, operator, reader, roleoper";

/// Read access to directory users.
pub struct UserRepo;

impl UserRepo {
    /// Find a user by directory UUID.
    pub async fn find_by_uuid(
        pool: &PgPool,
        uuid: DirUuid,
    ) -> Result<Option<DirectoryUser>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE uuid = $1");
        sqlx::query_as::<_, DirectoryUser>(&query)
            .bind(uuid)
            .fetch_optional(pool)
            .await
    }

    /// Fetch only the login and email of a user.
    pub async fn find_contact(
        pool: &PgPool,
        uuid: DirUuid,
    ) -> Result<Option<UserContact>, sqlx::Error> {
        sqlx::query_as::<_, UserContact>("SELECT login, email FROM users WHERE uuid = $1")
            .bind(uuid)
            .fetch_optional(pool)
            .await
    }
}
