//! Directory change events.
//!
//! A [`DirectoryEvent`] is an immutable description of one change observed
//! by the directory watcher. Events arrive as JSON objects tagged by `kind`:
//!
//! ```json
//! {"kind": "password-changed", "when": "2024-05-01T10:00:00Z",
//!  "uuid": "5f0c...", "email": "jane@example.com"}
//! ```

use serde::{Deserialize, Serialize};

use crate::privileges::Privilege;
use crate::types::{DirUuid, Timestamp};

/// Public key details as reported by the watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMaterial {
    pub fingerprint: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub comment: String,
}

/// One observed directory change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DirectoryEvent {
    /// The key stored in the directory does not match the locally known one.
    KeyMismatch {
        when: Timestamp,
        uuid: DirUuid,
        login: String,
        fingerprint: String,
    },
    LoginChanged {
        when: Timestamp,
        uuid: DirUuid,
        old_login: String,
        new_login: String,
    },
    PasswordChanged {
        when: Timestamp,
        uuid: DirUuid,
        email: String,
    },
    EmailChanged {
        when: Timestamp,
        uuid: DirUuid,
        old_email: String,
        new_email: String,
    },
    UserDeleted {
        when: Timestamp,
        uuid: DirUuid,
        login: String,
    },
    KeyAdded {
        when: Timestamp,
        uuid: DirUuid,
        key: KeyMaterial,
    },
    KeyDeleted {
        when: Timestamp,
        uuid: DirUuid,
        key: KeyMaterial,
    },
    /// The user joined the operator, reader or role-operator group.
    PrivilegeGranted {
        when: Timestamp,
        uuid: DirUuid,
        privilege: Privilege,
    },
    /// The user left the operator, reader or role-operator group.
    PrivilegeRevoked {
        when: Timestamp,
        uuid: DirUuid,
        privilege: Privilege,
    },
    /// A member whose DN could not be resolved to a user was added to a group.
    UnrecognizedMemberAdded {
        when: Timestamp,
        group: String,
        dn: String,
        error: String,
    },
    UnrecognizedMemberRemoved {
        when: Timestamp,
        group: String,
        dn: String,
        error: String,
    },
}

/// Flat enumeration of every event kind, one per notification policy row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    KeyMismatch,
    LoginChanged,
    PasswordChanged,
    EmailChanged,
    UserDeleted,
    KeyAdded,
    KeyDeleted,
    OperatorAdded,
    OperatorRemoved,
    ReaderAdded,
    ReaderRemoved,
    RoleOperatorAdded,
    RoleOperatorRemoved,
    UnrecognizedMemberAdded,
    UnrecognizedMemberRemoved,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::KeyMismatch => "key-mismatch",
            Self::LoginChanged => "login-changed",
            Self::PasswordChanged => "password-changed",
            Self::EmailChanged => "email-changed",
            Self::UserDeleted => "user-deleted",
            Self::KeyAdded => "key-added",
            Self::KeyDeleted => "key-deleted",
            Self::OperatorAdded => "operator-added",
            Self::OperatorRemoved => "operator-removed",
            Self::ReaderAdded => "reader-added",
            Self::ReaderRemoved => "reader-removed",
            Self::RoleOperatorAdded => "role-operator-added",
            Self::RoleOperatorRemoved => "role-operator-removed",
            Self::UnrecognizedMemberAdded => "unrecognized-member-added",
            Self::UnrecognizedMemberRemoved => "unrecognized-member-removed",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DirectoryEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::KeyMismatch { .. } => EventKind::KeyMismatch,
            Self::LoginChanged { .. } => EventKind::LoginChanged,
            Self::PasswordChanged { .. } => EventKind::PasswordChanged,
            Self::EmailChanged { .. } => EventKind::EmailChanged,
            Self::UserDeleted { .. } => EventKind::UserDeleted,
            Self::KeyAdded { .. } => EventKind::KeyAdded,
            Self::KeyDeleted { .. } => EventKind::KeyDeleted,
            Self::PrivilegeGranted { privilege, .. } => match privilege {
                Privilege::Operator => EventKind::OperatorAdded,
                Privilege::Reader => EventKind::ReaderAdded,
                Privilege::RoleOperator => EventKind::RoleOperatorAdded,
            },
            Self::PrivilegeRevoked { privilege, .. } => match privilege {
                Privilege::Operator => EventKind::OperatorRemoved,
                Privilege::Reader => EventKind::ReaderRemoved,
                Privilege::RoleOperator => EventKind::RoleOperatorRemoved,
            },
            Self::UnrecognizedMemberAdded { .. } => EventKind::UnrecognizedMemberAdded,
            Self::UnrecognizedMemberRemoved { .. } => EventKind::UnrecognizedMemberRemoved,
        }
    }

    /// When the watcher observed the change.
    pub fn when(&self) -> Timestamp {
        match self {
            Self::KeyMismatch { when, .. }
            | Self::LoginChanged { when, .. }
            | Self::PasswordChanged { when, .. }
            | Self::EmailChanged { when, .. }
            | Self::UserDeleted { when, .. }
            | Self::KeyAdded { when, .. }
            | Self::KeyDeleted { when, .. }
            | Self::PrivilegeGranted { when, .. }
            | Self::PrivilegeRevoked { when, .. }
            | Self::UnrecognizedMemberAdded { when, .. }
            | Self::UnrecognizedMemberRemoved { when, .. } => *when,
        }
    }

    /// The affected user, if the event concerns a known directory entry.
    pub fn subject_uuid(&self) -> Option<DirUuid> {
        match self {
            Self::KeyMismatch { uuid, .. }
            | Self::LoginChanged { uuid, .. }
            | Self::PasswordChanged { uuid, .. }
            | Self::EmailChanged { uuid, .. }
            | Self::UserDeleted { uuid, .. }
            | Self::KeyAdded { uuid, .. }
            | Self::KeyDeleted { uuid, .. }
            | Self::PrivilegeGranted { uuid, .. }
            | Self::PrivilegeRevoked { uuid, .. } => Some(*uuid),
            Self::UnrecognizedMemberAdded { .. } | Self::UnrecognizedMemberRemoved { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parses_tagged_password_change() {
        let json = r#"{
            "kind": "password-changed",
            "when": "2024-05-01T10:00:00Z",
            "uuid": "3f2504e0-4f89-11d3-9a0c-0305e82c3301",
            "email": "jane@example.com"
        }"#;
        let event: DirectoryEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind(), EventKind::PasswordChanged);
        assert_matches!(event, DirectoryEvent::PasswordChanged { ref email, .. } if email == "jane@example.com");
        assert_eq!(event.when().to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn privilege_events_map_to_specific_kinds() {
        let uuid = DirUuid::nil();
        let when = chrono::Utc::now();
        let granted = DirectoryEvent::PrivilegeGranted {
            when,
            uuid,
            privilege: Privilege::RoleOperator,
        };
        let revoked = DirectoryEvent::PrivilegeRevoked {
            when,
            uuid,
            privilege: Privilege::Reader,
        };
        assert_eq!(granted.kind(), EventKind::RoleOperatorAdded);
        assert_eq!(granted.kind().as_str(), "role-operator-added");
        assert_eq!(revoked.kind(), EventKind::ReaderRemoved);
    }

    #[test]
    fn key_material_comment_is_optional() {
        let json = r#"{
            "kind": "key-added",
            "when": "2024-05-01T10:00:00Z",
            "uuid": "3f2504e0-4f89-11d3-9a0c-0305e82c3301",
            "key": {"fingerprint": "SHA256:abc"}
        }"#;
        let event: DirectoryEvent = serde_json::from_str(json).unwrap();
        assert_matches!(event, DirectoryEvent::KeyAdded { ref key, .. } if key.comment.is_empty());
    }

    #[test]
    fn group_events_have_no_subject() {
        let event = DirectoryEvent::UnrecognizedMemberAdded {
            when: chrono::Utc::now(),
            group: "operators".into(),
            dn: "cn=ghost,ou=people".into(),
            error: "no such entry".into(),
        };
        assert!(event.subject_uuid().is_none());
        assert_eq!(event.kind().to_string(), "unrecognized-member-added");
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let json = r#"{"kind": "coffee-brewed", "when": "2024-05-01T10:00:00Z"}"#;
        assert!(serde_json::from_str::<DirectoryEvent>(json).is_err());
    }
}
