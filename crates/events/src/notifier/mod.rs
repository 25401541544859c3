//! Event-to-mail notification engine.
//!
//! [`Notifier`] receives [`DirectoryEvent`]s, looks up the affected user in
//! the [`DirectoryStore`], applies the recipient policy and sends the
//! rendered mail through a [`Dispatcher`]. Every failure mode drops the one
//! notification and is logged; nothing is reported back to the caller.

mod handlers;
mod key_added;

use std::sync::Arc;

use dirnotify_core::config::NotifierConfig;
use dirnotify_core::event::{DirectoryEvent, EventKind};
use dirnotify_core::suppression::MismatchThrottle;
use dirnotify_core::types::{DirUuid, Timestamp};
use dirnotify_db::models::user::DirectoryUser;
use tokio::sync::{broadcast, Mutex};
use tokio_util::task::TaskTracker;

use crate::delivery::email::MailTransport;
use crate::delivery::Dispatcher;
use crate::store::{DirectoryStore, StoreError};
use crate::templates::{TemplateError, TemplateRenderer};

/// Why a handler gave up on a notification.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Lookup failed: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Key holder {uuid} sharing {fingerprint} has no user row")]
    MissingKeyHolder { uuid: DirUuid, fingerprint: String },
}

/// Routes directory events to operator and user mail.
pub struct Notifier<S, M> {
    config: Arc<NotifierConfig>,
    store: S,
    mailer: Dispatcher<M>,
    templates: TemplateRenderer,
    mismatch: Mutex<MismatchThrottle>,
    tasks: TaskTracker,
}

impl<S: DirectoryStore, M: MailTransport> Notifier<S, M> {
    pub fn new(config: NotifierConfig, store: S, transport: M) -> Self {
        let config = Arc::new(config);
        let templates = TemplateRenderer::new(
            config.templates_dir.clone(),
            &config.deployment_name,
            &config.company_name,
        );
        Self {
            mailer: Dispatcher::new(Arc::clone(&config), transport),
            config,
            store,
            templates,
            mismatch: Mutex::new(MismatchThrottle::new()),
            tasks: TaskTracker::new(),
        }
    }

    pub fn templates(&self) -> &TemplateRenderer {
        &self.templates
    }

    /// Process one event to completion.
    ///
    /// Lookup and template failures are logged here, once, and the
    /// notification is dropped.
    pub async fn handle(&self, event: &DirectoryEvent) {
        let kind = event.kind();
        tracing::debug!(kind = %kind, uuid = ?event.subject_uuid(), "Handling directory event");

        if let Err(e) = self.route(event).await {
            tracing::error!(
                kind = %kind,
                uuid = ?event.subject_uuid(),
                error = %e,
                "Notification dropped"
            );
        }
    }

    async fn route(&self, event: &DirectoryEvent) -> Result<(), NotifyError> {
        match event {
            DirectoryEvent::KeyMismatch {
                when,
                uuid,
                login,
                fingerprint,
            } => self.key_mismatch(*when, *uuid, login, fingerprint).await,
            DirectoryEvent::LoginChanged {
                when,
                uuid,
                old_login,
                new_login,
            } => self.login_changed(*when, *uuid, old_login, new_login).await,
            DirectoryEvent::PasswordChanged { when, uuid, email } => {
                self.password_changed(*when, *uuid, email).await
            }
            DirectoryEvent::EmailChanged {
                when,
                uuid,
                old_email,
                new_email,
            } => self.email_changed(*when, *uuid, old_email, new_email).await,
            DirectoryEvent::UserDeleted { when, uuid, login } => {
                self.user_deleted(*when, *uuid, login).await
            }
            DirectoryEvent::KeyAdded { when, uuid, key } => self.key_added(*when, *uuid, key).await,
            DirectoryEvent::KeyDeleted { when, uuid, key } => {
                self.key_deleted(*when, *uuid, key).await
            }
            DirectoryEvent::PrivilegeGranted {
                when,
                uuid,
                privilege,
            } => self.privilege_granted(*when, *uuid, *privilege).await,
            DirectoryEvent::PrivilegeRevoked {
                when,
                uuid,
                privilege,
            } => self.privilege_revoked(*when, *uuid, *privilege).await,
            DirectoryEvent::UnrecognizedMemberAdded {
                when,
                group,
                dn,
                error,
            } => self.unrecognized_member(*when, "added", group, dn, error).await,
            DirectoryEvent::UnrecognizedMemberRemoved {
                when,
                group,
                dn,
                error,
            } => self.unrecognized_member(*when, "removed", group, dn, error).await,
        }
    }

    /// Fetch the subject user. A missing row is logged and yields `None`.
    async fn subject(
        &self,
        uuid: DirUuid,
        kind: EventKind,
    ) -> Result<Option<DirectoryUser>, NotifyError> {
        let user = self.store.find_user(uuid).await?;
        if user.is_none() {
            tracing::error!(%uuid, kind = %kind, "User not found in store, notification dropped");
        }
        Ok(user)
    }
}

impl<S, M> Notifier<S, M>
where
    S: DirectoryStore + 'static,
    M: MailTransport + 'static,
{
    /// Schedule `event` on the runtime and return immediately.
    pub fn dispatch(self: &Arc<Self>, event: DirectoryEvent) {
        let this = Arc::clone(self);
        self.tasks.spawn(async move { this.handle(&event).await });
    }

    /// Consume events from the bus until it closes, then wait for in-flight
    /// handlers to finish.
    pub async fn run(self: Arc<Self>, mut receiver: broadcast::Receiver<DirectoryEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.dispatch(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notifier lagged, some events were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notifier draining");
                    break;
                }
            }
        }

        self.tasks.close();
        self.tasks.wait().await;
        tracing::info!("Notifier stopped");
    }
}

/// Format an event time for mail bodies.
fn display_time(when: Timestamp) -> String {
    when.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
