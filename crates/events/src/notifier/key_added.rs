//! Key-added pipeline.
//!
//! The only handler with dependent lookups: subject user, then the other
//! accounts holding the same fingerprint, then each of those accounts'
//! contact details, one at a time. Any failing stage, including a holder
//! with no user row, aborts the whole notification. Both bodies are rendered
//! before anything is sent, so a partial result never reaches a mailbox.

use dirnotify_core::event::{EventKind, KeyMaterial};
use dirnotify_core::policy;
use dirnotify_core::types::{DirUuid, Timestamp};
use dirnotify_db::models::user::UserContact;

use super::handlers::user_context;
use super::{Notifier, NotifyError};
use crate::delivery::email::MailTransport;
use crate::store::DirectoryStore;

impl<S: DirectoryStore, M: MailTransport> Notifier<S, M> {
    pub(super) async fn key_added(
        &self,
        when: Timestamp,
        uuid: DirUuid,
        key: &KeyMaterial,
    ) -> Result<(), NotifyError> {
        let Some(user) = self.subject(uuid, EventKind::KeyAdded).await? else {
            return Ok(());
        };

        let others = self.other_key_holders(&key.fingerprint, uuid).await?;
        if !others.is_empty() {
            tracing::warn!(
                %uuid,
                fingerprint = %key.fingerprint,
                shared_with = others.len(),
                "SSH key registered under multiple accounts"
            );
        }

        let mut ctx = user_context(&user, when);
        ctx.insert("key", key);
        ctx.insert("others", &others);

        let user_body = if self.may_notify_user(&user) {
            Some(self.templates.render("key-added", &ctx)?)
        } else {
            None
        };
        let oper_body = if policy::needs_operator_copy(&user.privileges()) {
            Some(self.templates.render("oper-key-added", &ctx)?)
        } else {
            None
        };

        if let Some(body) = user_body {
            self.mailer
                .send_to_user(
                    &[user.email.clone()],
                    "A new SSH key has been added to your account",
                    body,
                )
                .await;
        }
        if let Some(body) = oper_body {
            self.mailer
                .send_to_operators(
                    &format!("SSH key added for privileged user {}", user.login),
                    body,
                )
                .await;
        }
        Ok(())
    }

    /// Contact details of every other account holding `fingerprint`, sorted
    /// so the rendered list does not depend on lookup order.
    async fn other_key_holders(
        &self,
        fingerprint: &str,
        uuid: DirUuid,
    ) -> Result<Vec<UserContact>, NotifyError> {
        let holders = self.store.find_other_key_holders(fingerprint, uuid).await?;

        let mut contacts = Vec::with_capacity(holders.len());
        for holder in holders {
            let contact = self.store.find_contact(holder).await?.ok_or_else(|| {
                NotifyError::MissingKeyHolder {
                    uuid: holder,
                    fingerprint: fingerprint.to_string(),
                }
            })?;
            contacts.push(contact);
        }

        contacts.sort_by(|a, b| a.login.cmp(&b.login).then_with(|| a.email.cmp(&b.email)));
        Ok(contacts)
    }
}
