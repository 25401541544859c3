//! Mail dispatch helpers.
//!
//! [`Dispatcher`] decides recipients and subject prefixes for the two mail
//! audiences (operators and end users) and hands the composed message to a
//! [`MailTransport`]. Sending is best-effort: transport failures are logged
//! and reported as [`Delivery::Failed`], never propagated.

pub mod email;

use std::sync::Arc;

use dirnotify_core::config::NotifierConfig;

use self::email::{MailTransport, OutgoingMail};

/// Outcome of a dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Nothing was sent (initial sync, or no recipients).
    Skipped,
    Failed,
}

/// Routes rendered bodies to operators or users through a transport.
pub struct Dispatcher<M> {
    config: Arc<NotifierConfig>,
    transport: M,
}

impl<M: MailTransport> Dispatcher<M> {
    pub fn new(config: Arc<NotifierConfig>, transport: M) -> Self {
        Self { config, transport }
    }

    /// Mail the static operator list.
    pub async fn send_to_operators(&self, subject: &str, body: String) -> Delivery {
        let subject = format!("{}{subject}", self.config.operator_subject_prefix);
        self.send(self.config.operator_addresses.clone(), subject, body)
            .await
    }

    /// Mail one or more end-user addresses.
    pub async fn send_to_user(&self, recipients: &[String], subject: &str, body: String) -> Delivery {
        let subject = format!("{}{subject}", self.config.user_subject_prefix);
        self.send(recipients.to_vec(), subject, body).await
    }

    async fn send(&self, to: Vec<String>, subject: String, text: String) -> Delivery {
        if self.config.initial_sync {
            tracing::debug!(subject = %subject, "Initial sync in progress, mail suppressed");
            return Delivery::Skipped;
        }
        if to.is_empty() {
            tracing::warn!(subject = %subject, "No recipients, mail not sent");
            return Delivery::Skipped;
        }

        let mail = OutgoingMail {
            from: self.config.from_address.clone(),
            to,
            subject,
            text,
        };

        match self.transport.send(&mail).await {
            Ok(()) => {
                tracing::info!(to = ?mail.to, subject = %mail.subject, "Notification mail sent");
                Delivery::Sent
            }
            Err(e) => {
                tracing::error!(
                    to = ?mail.to,
                    subject = %mail.subject,
                    error = %e,
                    "Failed to send notification mail"
                );
                Delivery::Failed
            }
        }
    }
}
