//! Directory change notifications.
//!
//! This crate turns [`DirectoryEvent`]s reported by the directory watcher
//! into mail:
//!
//! - [`Notifier`] — per-event policy, lookups and composition.
//! - [`DirectoryStore`] — row-store seam, backed by Postgres in
//!   [`PgDirectoryStore`].
//! - [`delivery`] — mail transport seam, SMTP transport and the
//!   operator/user dispatch helpers.
//! - [`TemplateRenderer`] — lazily cached Tera templates.
//! - [`EventBus`] — in-process broadcast hub feeding [`Notifier::run`].

pub mod bus;
pub mod delivery;
pub mod notifier;
pub mod store;
pub mod templates;

pub use bus::EventBus;
pub use delivery::email::{EmailError, MailTransport, OutgoingMail, SmtpConfig, SmtpMailer};
pub use delivery::{Delivery, Dispatcher};
pub use dirnotify_core::event::DirectoryEvent;
pub use notifier::{Notifier, NotifyError};
pub use store::{DirectoryStore, PgDirectoryStore, StoreError};
pub use templates::{TemplateError, TemplateRenderer};
