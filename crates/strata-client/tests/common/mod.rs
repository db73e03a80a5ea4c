//! Common test utilities for store integration testing
//!
//! This module provides shared test infrastructure including:
//! - Recording collaborators (persistence, locale loader, notifier)
//! - A session whose flags can be flipped mid-test
//! - A seeded store wired to all of the above

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::json;
use strata_client::{
    DispatchOutcome, LocaleLoader, NotificationKind, Notifier, SessionContext, SettingChange,
    SettingRecord, SettingsPersistence, SettingsStore, StoreConfig,
};

/// Install a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Ordered log of collaborator calls, shared by all recorders of one store
#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<String>>,
}

impl EventLog {
    pub fn push(&self, event: String) {
        self.events.lock().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

/// Persistence collaborator that records every batch
pub struct RecordingPersistence {
    events: Arc<EventLog>,
    batches: Mutex<Vec<Vec<SettingChange>>>,
    failure: Mutex<Option<String>>,
}

impl RecordingPersistence {
    pub fn new(events: Arc<EventLog>) -> Self {
        Self {
            events,
            batches: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        }
    }

    /// Reject every following batch with `reason`.
    pub fn fail_with(&self, reason: &str) {
        *self.failure.lock() = Some(reason.to_string());
    }

    pub fn batches(&self) -> Vec<Vec<SettingChange>> {
        self.batches.lock().clone()
    }

    pub fn batch_ids(&self, index: usize) -> Vec<String> {
        self.batches.lock()[index].iter().map(|c| c.id.clone()).collect()
    }
}

#[async_trait::async_trait]
impl SettingsPersistence for RecordingPersistence {
    async fn submit_changes(&self, batch: &[SettingChange]) -> anyhow::Result<()> {
        self.events.push("submit".to_string());
        self.batches.lock().push(batch.to_vec());
        match self.failure.lock().clone() {
            Some(reason) => Err(anyhow::anyhow!(reason)),
            None => Ok(()),
        }
    }
}

/// Locale loader that records requested tags
pub struct RecordingLocaleLoader {
    events: Arc<EventLog>,
    tags: Mutex<Vec<String>>,
}

impl RecordingLocaleLoader {
    pub fn new(events: Arc<EventLog>) -> Self {
        Self {
            events,
            tags: Mutex::new(Vec::new()),
        }
    }

    pub fn tags(&self) -> Vec<String> {
        self.tags.lock().clone()
    }
}

#[async_trait::async_trait]
impl LocaleLoader for RecordingLocaleLoader {
    async fn load_language(&self, tag: &str) -> anyhow::Result<()> {
        self.events.push(format!("load_language:{}", tag));
        self.tags.lock().push(tag.to_string());
        Ok(())
    }
}

/// Notifier that records every outcome
pub struct RecordingNotifier {
    events: Arc<EventLog>,
    outcomes: Mutex<Vec<(NotificationKind, DispatchOutcome)>>,
}

impl RecordingNotifier {
    pub fn new(events: Arc<EventLog>) -> Self {
        Self {
            events,
            outcomes: Mutex::new(Vec::new()),
        }
    }

    pub fn outcomes(&self) -> Vec<(NotificationKind, DispatchOutcome)> {
        self.outcomes.lock().clone()
    }

    pub fn count(&self, kind: NotificationKind) -> usize {
        self.outcomes.lock().iter().filter(|(k, _)| *k == kind).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NotificationKind, payload: &DispatchOutcome) {
        self.events.push(format!("notify:{}", kind));
        self.outcomes.lock().push((kind, payload.clone()));
    }
}

/// Session whose flags tests can change after the store is built
pub struct TestSession {
    authorized: AtomicBool,
    loading: AtomicBool,
    language: Mutex<Option<String>>,
}

impl Default for TestSession {
    fn default() -> Self {
        Self {
            authorized: AtomicBool::new(true),
            loading: AtomicBool::new(false),
            language: Mutex::new(None),
        }
    }
}

impl TestSession {
    pub fn set_authorized(&self, authorized: bool) {
        self.authorized.store(authorized, Ordering::SeqCst);
    }

    pub fn set_loading(&self, loading: bool) {
        self.loading.store(loading, Ordering::SeqCst);
    }

    pub fn set_language(&self, language: &str) {
        *self.language.lock() = Some(language.to_string());
    }
}

impl SessionContext for TestSession {
    fn is_authorized(&self) -> bool {
        self.authorized.load(Ordering::SeqCst)
    }

    fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    fn user_language(&self) -> Option<String> {
        self.language.lock().clone()
    }
}

/// Seed records used across the integration tests
///
/// `Site_Url` is persisted with a value that already differs from its
/// package default.
pub fn seed_records() -> Vec<SettingRecord> {
    vec![
        SettingRecord::group("Accounts"),
        SettingRecord::new("Accounts_AllowDelete", "Accounts", None, json!(false)),
        SettingRecord::new("Accounts_EmailVerification", "Accounts", Some("Registration"), json!(true)),
        SettingRecord::new("Accounts_Default_Role", "Accounts", Some("Registration"), json!("user")),
        SettingRecord::new("Accounts_AvatarSize", "Accounts", Some("Avatar"), json!(200))
            .with_editor(json!({"type": "int", "min": 16})),
        SettingRecord::group("General"),
        SettingRecord::new("Language", "General", None, json!("en")),
        SettingRecord::new("Site_Name", "General", None, json!("Strata")),
        SettingRecord::new("Site_Url", "General", None, json!("http://localhost:3000"))
            .with_value(json!("https://chat.example")),
        SettingRecord::new("Iframe_Enabled", "General", Some("Iframe"), json!(false)),
        SettingRecord::group("Message"),
        SettingRecord::new("Message_MaxAllowedSize", "Message", None, json!(5000)),
    ]
}

/// A seeded store plus handles to its recording collaborators
pub struct TestStore {
    pub store: Arc<SettingsStore>,
    pub events: Arc<EventLog>,
    pub persistence: Arc<RecordingPersistence>,
    pub locale_loader: Arc<RecordingLocaleLoader>,
    pub notifier: Arc<RecordingNotifier>,
    pub session: Arc<TestSession>,
}

impl TestStore {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        init_tracing();

        let events = Arc::new(EventLog::default());
        let persistence = Arc::new(RecordingPersistence::new(events.clone()));
        let locale_loader = Arc::new(RecordingLocaleLoader::new(events.clone()));
        let notifier = Arc::new(RecordingNotifier::new(events.clone()));
        let session = Arc::new(TestSession::default());

        let store = SettingsStore::builder(persistence.clone())
            .with_config(config)
            .with_session(session.clone())
            .with_notifier(notifier.clone())
            .with_locale_loader(locale_loader.clone())
            .with_records(seed_records())
            .build()
            .unwrap();

        Self {
            store,
            events,
            persistence,
            locale_loader,
            notifier,
            session,
        }
    }
}
