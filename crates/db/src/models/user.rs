//! Directory user rows.

use dirnotify_core::policy;
use dirnotify_core::privileges::Privileges;
use dirnotify_core::types::DirUuid;
use serde::Serialize;
use sqlx::FromRow;

/// Full row from the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct DirectoryUser {
    pub uuid: DirUuid,
    pub login: String,
    pub email: String,
    pub status: String,
    pub operator: bool,
    pub reader: bool,
    pub roleoper: bool,
}

impl DirectoryUser {
    pub fn is_active(&self) -> bool {
        policy::is_active(&self.status)
    }

    pub fn privileges(&self) -> Privileges {
        Privileges {
            operator: self.operator,
            reader: self.reader,
            role_operator: self.roleoper,
        }
    }
}

/// Login and address of a user, as shown in cross-account key reports.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct UserContact {
    pub login: String,
    pub email: String,
}
