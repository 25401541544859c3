//! Shared fixtures: an in-memory [`DirectoryStore`] and a recording
//! [`MailTransport`].

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;
use dirnotify_core::config::NotifierConfig;
use dirnotify_core::types::{DirUuid, Timestamp};
use dirnotify_db::models::key::SshKey;
use dirnotify_db::models::user::{DirectoryUser, UserContact};
use dirnotify_events::{
    DirectoryStore, EmailError, MailTransport, Notifier, OutgoingMail, StoreError,
};

pub const OPERATORS: &str = "ops@example.com";

pub fn at(day: u32, hour: u32, minute: u32) -> Timestamp {
    Utc.with_ymd_and_hms(2024, 5, day, hour, minute, 0).unwrap()
}

pub fn templates_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("templates")
}

pub fn config() -> NotifierConfig {
    NotifierConfig {
        deployment_name: "Acme Directory".into(),
        company_name: "Acme".into(),
        from_address: "noreply@example.com".into(),
        operator_addresses: vec![OPERATORS.into()],
        operator_subject_prefix: "[oper] ".into(),
        user_subject_prefix: "[user] ".into(),
        whitelist: vec![],
        initial_sync: false,
        templates_dir: templates_dir(),
    }
}

pub fn user(login: &str, active: bool, operator: bool) -> DirectoryUser {
    DirectoryUser {
        uuid: DirUuid::new_v4(),
        login: login.into(),
        email: format!("{login}@example.com"),
        status: if active { "active" } else { "disabled" }.into(),
        operator,
        reader: false,
        roleoper: false,
    }
}

pub fn key(uuid: DirUuid, fingerprint: &str, name: &str) -> SshKey {
    SshKey {
        uuid,
        fingerprint: fingerprint.into(),
        name: name.into(),
        comment: String::new(),
    }
}

// ---------------------------------------------------------------------------
// ErrorCounter
// ---------------------------------------------------------------------------

/// Counts ERROR-level events emitted on the current thread while installed.
#[derive(Clone, Default)]
pub struct ErrorCounter {
    count: Arc<AtomicUsize>,
}

impl ErrorCounter {
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::registry().with(self.clone());
        tracing::subscriber::set_default(subscriber)
    }

    /// Errors seen since the last call.
    pub fn take(&self) -> usize {
        self.count.swap(0, Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for ErrorCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }
}

// ---------------------------------------------------------------------------
// FakeStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct StoreState {
    pub users: HashMap<DirUuid, DirectoryUser>,
    pub keys: Vec<SshKey>,
    pub last_mismatch: Option<Timestamp>,
    pub mismatch_writes: Vec<Timestamp>,
    pub reverse_holders: bool,
    pub fail_users: bool,
    pub fail_contacts: bool,
    pub fail_holders: bool,
}

/// In-memory store. Clones share state so tests can inspect it after
/// handing a copy to the [`Notifier`].
#[derive(Clone, Default)]
pub struct FakeStore {
    pub state: Arc<Mutex<StoreState>>,
    pub lookups: Arc<AtomicUsize>,
}

impl FakeStore {
    pub fn with_users(users: &[&DirectoryUser]) -> Self {
        let store = Self::default();
        {
            let mut state = store.state.lock().unwrap();
            for u in users {
                state.users.insert(u.uuid, (*u).clone());
            }
        }
        store
    }

    pub fn add_key(&self, key: SshKey) {
        self.state.lock().unwrap().keys.push(key);
    }

    pub fn update(&self, f: impl FnOnce(&mut StoreState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn mismatch_writes(&self) -> Vec<Timestamp> {
        self.state.lock().unwrap().mismatch_writes.clone()
    }

    fn unavailable() -> StoreError {
        StoreError::Database(sqlx::Error::PoolTimedOut)
    }
}

impl DirectoryStore for FakeStore {
    async fn find_user(&self, uuid: DirUuid) -> Result<Option<DirectoryUser>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if state.fail_users {
            return Err(Self::unavailable());
        }
        Ok(state.users.get(&uuid).cloned())
    }

    async fn find_contact(&self, uuid: DirUuid) -> Result<Option<UserContact>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if state.fail_contacts {
            return Err(Self::unavailable());
        }
        Ok(state.users.get(&uuid).map(|u| UserContact {
            login: u.login.clone(),
            email: u.email.clone(),
        }))
    }

    async fn list_keys(&self, uuid: DirUuid) -> Result<Vec<SshKey>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        Ok(state.keys.iter().filter(|k| k.uuid == uuid).cloned().collect())
    }

    async fn find_other_key_holders(
        &self,
        fingerprint: &str,
        excluding: DirUuid,
    ) -> Result<Vec<DirUuid>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if state.fail_holders {
            return Err(Self::unavailable());
        }
        let mut holders: Vec<DirUuid> = state
            .keys
            .iter()
            .filter(|k| k.fingerprint == fingerprint && k.uuid != excluding)
            .map(|k| k.uuid)
            .collect();
        if state.reverse_holders {
            holders.reverse();
        }
        Ok(holders)
    }

    async fn last_mismatch_alert(&self) -> Result<Option<Timestamp>, StoreError> {
        Ok(self.state.lock().unwrap().last_mismatch)
    }

    async fn record_mismatch_alert(&self, at: Timestamp) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.last_mismatch = Some(at);
        state.mismatch_writes.push(at);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingTransport
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct RecordingTransport {
    pub sent: Arc<Mutex<Vec<OutgoingMail>>>,
    pub fail: Arc<AtomicBool>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn to_operators(&self) -> Vec<OutgoingMail> {
        self.sent()
            .into_iter()
            .filter(|m| m.to == [OPERATORS])
            .collect()
    }

    pub fn to_users(&self) -> Vec<OutgoingMail> {
        self.sent()
            .into_iter()
            .filter(|m| m.to != [OPERATORS])
            .collect()
    }
}

impl MailTransport for RecordingTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), EmailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmailError::Build("relay rejected message".into()));
        }
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

pub fn notifier(
    config: NotifierConfig,
    store: &FakeStore,
    transport: &RecordingTransport,
) -> Notifier<FakeStore, RecordingTransport> {
    Notifier::new(config, store.clone(), transport.clone())
}
