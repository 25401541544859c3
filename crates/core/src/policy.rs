//! Recipient policy for directory notifications.
//!
//! Pure predicates. The caller fetches the subject user's row and passes in
//! the relevant facts.

use crate::config::NotifierConfig;
use crate::privileges::Privileges;
use crate::types::DirUuid;

/// Directory status value of an enabled account.
pub const STATUS_ACTIVE: &str = "active";

/// True when the account status means "enabled".
pub fn is_active(status: &str) -> bool {
    status == STATUS_ACTIVE
}

/// An empty whitelist places no restriction on direct user mail.
pub fn is_whitelisted(whitelist: &[DirUuid], uuid: &DirUuid) -> bool {
    whitelist.is_empty() || whitelist.contains(uuid)
}

/// Whether a user-facing notification may be sent to this user.
///
/// Disabled accounts and users outside a non-empty whitelist never receive
/// direct mail. Operator-facing variants do not consult this.
pub fn may_notify_user(config: &NotifierConfig, uuid: &DirUuid, status: &str) -> bool {
    is_whitelisted(&config.whitelist, uuid) && is_active(status)
}

/// Whether the operator-facing variant of a notification should be sent.
pub fn needs_operator_copy(privileges: &Privileges) -> bool {
    privileges.any()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn config(whitelist: Vec<DirUuid>) -> NotifierConfig {
        NotifierConfig {
            deployment_name: "Test".into(),
            company_name: "Test Co".into(),
            from_address: "noreply@example.com".into(),
            operator_addresses: vec!["ops@example.com".into()],
            operator_subject_prefix: "[oper] ".into(),
            user_subject_prefix: "[user] ".into(),
            whitelist,
            initial_sync: false,
            templates_dir: PathBuf::from("templates"),
        }
    }

    #[test]
    fn empty_whitelist_allows_everyone() {
        let uuid = DirUuid::new_v4();
        assert!(is_whitelisted(&[], &uuid));
        assert!(may_notify_user(&config(vec![]), &uuid, STATUS_ACTIVE));
    }

    #[test]
    fn whitelist_restricts_to_members() {
        let member = DirUuid::new_v4();
        let outsider = DirUuid::new_v4();
        let cfg = config(vec![member]);
        assert!(may_notify_user(&cfg, &member, STATUS_ACTIVE));
        assert!(!may_notify_user(&cfg, &outsider, STATUS_ACTIVE));
    }

    #[test]
    fn disabled_users_are_never_notified_directly() {
        let member = DirUuid::new_v4();
        assert!(!may_notify_user(&config(vec![]), &member, "disabled"));
        assert!(!may_notify_user(&config(vec![member]), &member, "locked"));
    }

    #[test]
    fn operator_copy_requires_a_privilege() {
        assert!(!needs_operator_copy(&Privileges::default()));
        assert!(needs_operator_copy(&Privileges {
            reader: true,
            ..Default::default()
        }));
    }
}
