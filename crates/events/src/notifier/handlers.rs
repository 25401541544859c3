//! Per-event notification policy.

use dirnotify_core::event::{EventKind, KeyMaterial};
use dirnotify_core::policy;
use dirnotify_core::privileges::Privilege;
use dirnotify_core::types::{DirUuid, Timestamp};
use dirnotify_db::models::user::DirectoryUser;
use tera::Context;

use super::{display_time, Notifier, NotifyError};
use crate::delivery::email::MailTransport;
use crate::store::DirectoryStore;

/// Variables common to every user-related template.
pub(super) fn user_context(user: &DirectoryUser, when: Timestamp) -> Context {
    let mut ctx = Context::new();
    ctx.insert("uuid", &user.uuid);
    ctx.insert("login", &user.login);
    ctx.insert("email", &user.email);
    ctx.insert("privileges", &user.privileges().labels());
    ctx.insert("when", &display_time(when));
    ctx
}

impl<S: DirectoryStore, M: MailTransport> Notifier<S, M> {
    pub(super) fn may_notify_user(&self, user: &DirectoryUser) -> bool {
        let allowed = policy::may_notify_user(&self.config, &user.uuid, &user.status);
        if !allowed {
            tracing::debug!(
                uuid = %user.uuid,
                status = %user.status,
                "User not eligible for direct mail"
            );
        }
        allowed
    }

    /// Alert operators about a key mismatch, at most once per window.
    ///
    /// The last-mismatch timestamp is advanced in memory and in the store on
    /// every event, including suppressed ones.
    pub(super) async fn key_mismatch(
        &self,
        when: Timestamp,
        uuid: DirUuid,
        login: &str,
        fingerprint: &str,
    ) -> Result<(), NotifyError> {
        let (state, alert) = {
            let mut throttle = self.mismatch.lock().await;
            if throttle.needs_load() {
                let stored = self.store.last_mismatch_alert().await?;
                throttle.seed(stored);
            }
            let outcome = throttle.observe(when);
            let latest = throttle.last_seen().unwrap_or(when);
            if let Err(e) = self.store.record_mismatch_alert(latest).await {
                tracing::error!(error = %e, "Failed to persist key-mismatch timestamp");
            }
            outcome
        };

        if !alert {
            tracing::info!(%uuid, login, state = ?state, "Key-mismatch alert suppressed");
            return Ok(());
        }

        let mut ctx = Context::new();
        ctx.insert("uuid", &uuid);
        ctx.insert("login", login);
        ctx.insert("fingerprint", fingerprint);
        ctx.insert("when", &display_time(when));
        let body = self.templates.render("oper-key-mismatch", &ctx)?;
        self.mailer
            .send_to_operators("SSH key mismatch detected", body)
            .await;
        Ok(())
    }

    pub(super) async fn login_changed(
        &self,
        when: Timestamp,
        uuid: DirUuid,
        old_login: &str,
        new_login: &str,
    ) -> Result<(), NotifyError> {
        let Some(user) = self.subject(uuid, EventKind::LoginChanged).await? else {
            return Ok(());
        };
        if !user.is_active() {
            tracing::debug!(%uuid, "Login change on disabled account, not reported");
            return Ok(());
        }

        let mut ctx = user_context(&user, when);
        ctx.insert("old_login", old_login);
        ctx.insert("new_login", new_login);
        let body = self.templates.render("oper-login-changed", &ctx)?;
        self.mailer
            .send_to_operators(&format!("Login changed: {old_login} -> {new_login}"), body)
            .await;
        Ok(())
    }

    pub(super) async fn password_changed(
        &self,
        when: Timestamp,
        uuid: DirUuid,
        email: &str,
    ) -> Result<(), NotifyError> {
        let Some(user) = self.subject(uuid, EventKind::PasswordChanged).await? else {
            return Ok(());
        };
        let ctx = user_context(&user, when);

        if self.may_notify_user(&user) {
            let body = self.templates.render("pw-changed", &ctx)?;
            self.mailer
                .send_to_user(&[email.to_string()], "Your password has been changed", body)
                .await;
        }

        if policy::needs_operator_copy(&user.privileges()) {
            let body = self.templates.render("oper-pw-changed", &ctx)?;
            self.mailer
                .send_to_operators(
                    &format!("Password changed for privileged user {}", user.login),
                    body,
                )
                .await;
        }
        Ok(())
    }

    /// Notify both the old and the new address.
    pub(super) async fn email_changed(
        &self,
        when: Timestamp,
        uuid: DirUuid,
        old_email: &str,
        new_email: &str,
    ) -> Result<(), NotifyError> {
        let Some(user) = self.subject(uuid, EventKind::EmailChanged).await? else {
            return Ok(());
        };
        let mut ctx = user_context(&user, when);
        ctx.insert("old_email", old_email);
        ctx.insert("new_email", new_email);

        if self.may_notify_user(&user) {
            let mut recipients: Vec<String> = Vec::with_capacity(2);
            for addr in [old_email, new_email] {
                if !addr.is_empty() && !recipients.iter().any(|r| r == addr) {
                    recipients.push(addr.to_string());
                }
            }
            let body = self.templates.render("email-changed", &ctx)?;
            self.mailer
                .send_to_user(&recipients, "Your email address has been changed", body)
                .await;
        }

        if policy::needs_operator_copy(&user.privileges()) {
            let body = self.templates.render("oper-email-changed", &ctx)?;
            self.mailer
                .send_to_operators(
                    &format!("Email changed for privileged user {}", user.login),
                    body,
                )
                .await;
        }
        Ok(())
    }

    pub(super) async fn user_deleted(
        &self,
        when: Timestamp,
        uuid: DirUuid,
        login: &str,
    ) -> Result<(), NotifyError> {
        let Some(user) = self.subject(uuid, EventKind::UserDeleted).await? else {
            return Ok(());
        };
        if !policy::needs_operator_copy(&user.privileges()) {
            return Ok(());
        }

        let mut ctx = user_context(&user, when);
        ctx.insert("login", login);
        let body = self.templates.render("oper-user-deleted", &ctx)?;
        self.mailer
            .send_to_operators(&format!("Privileged user {login} deleted"), body)
            .await;
        Ok(())
    }

    pub(super) async fn key_deleted(
        &self,
        when: Timestamp,
        uuid: DirUuid,
        key: &KeyMaterial,
    ) -> Result<(), NotifyError> {
        let Some(user) = self.subject(uuid, EventKind::KeyDeleted).await? else {
            return Ok(());
        };
        let mut ctx = user_context(&user, when);
        ctx.insert("key", key);

        if self.may_notify_user(&user) {
            let body = self.templates.render("key-deleted", &ctx)?;
            self.mailer
                .send_to_user(
                    &[user.email.clone()],
                    "An SSH key has been removed from your account",
                    body,
                )
                .await;
        }

        if policy::needs_operator_copy(&user.privileges()) {
            let body = self.templates.render("oper-key-deleted", &ctx)?;
            self.mailer
                .send_to_operators(
                    &format!("SSH key removed from privileged user {}", user.login),
                    body,
                )
                .await;
        }
        Ok(())
    }

    /// Always alert operators, listing the user's current keys.
    pub(super) async fn privilege_granted(
        &self,
        when: Timestamp,
        uuid: DirUuid,
        privilege: Privilege,
    ) -> Result<(), NotifyError> {
        let kind = match privilege {
            Privilege::Operator => EventKind::OperatorAdded,
            Privilege::Reader => EventKind::ReaderAdded,
            Privilege::RoleOperator => EventKind::RoleOperatorAdded,
        };
        let Some(user) = self.subject(uuid, kind).await? else {
            return Ok(());
        };
        let keys = self.store.list_keys(uuid).await?;

        let mut ctx = user_context(&user, when);
        ctx.insert("privilege", privilege.label());
        ctx.insert("keys", &keys);
        let body = self.templates.render("oper-privilege-granted", &ctx)?;
        self.mailer
            .send_to_operators(&format!("{} granted {privilege} rights", user.login), body)
            .await;
        Ok(())
    }

    pub(super) async fn privilege_revoked(
        &self,
        when: Timestamp,
        uuid: DirUuid,
        privilege: Privilege,
    ) -> Result<(), NotifyError> {
        let kind = match privilege {
            Privilege::Operator => EventKind::OperatorRemoved,
            Privilege::Reader => EventKind::ReaderRemoved,
            Privilege::RoleOperator => EventKind::RoleOperatorRemoved,
        };
        let Some(user) = self.subject(uuid, kind).await? else {
            return Ok(());
        };

        let mut ctx = user_context(&user, when);
        ctx.insert("privilege", privilege.label());
        let body = self.templates.render("oper-privilege-revoked", &ctx)?;
        self.mailer
            .send_to_operators(&format!("{} lost {privilege} rights", user.login), body)
            .await;
        Ok(())
    }

    /// Report a group member that does not resolve to a known user. No lookup.
    pub(super) async fn unrecognized_member(
        &self,
        when: Timestamp,
        action: &str,
        group: &str,
        dn: &str,
        error: &str,
    ) -> Result<(), NotifyError> {
        let mut ctx = Context::new();
        ctx.insert("action", action);
        ctx.insert("group", group);
        ctx.insert("dn", dn);
        ctx.insert("error", error);
        ctx.insert("when", &display_time(when));
        let body = self.templates.render("oper-unrecognized-member", &ctx)?;
        self.mailer
            .send_to_operators(
                &format!("Unrecognized member {action} in group {group}"),
                body,
            )
            .await;
        Ok(())
    }
}
