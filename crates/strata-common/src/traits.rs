//! Collaborator traits for dependency injection
//!
//! The settings store owns no transport, session or presentation logic. These
//! traits abstract the collaborators it consumes so that callers can plug in
//! concrete implementations (and tests can plug in recorders).

use tracing::{info, warn};

use crate::model::{DispatchOutcome, NotificationKind, SettingChange, SettingRecord};

/// Persistence collaborator
///
/// Submits one batch of accepted changes as a single logical unit.
/// Implementations must tolerate at-least-once submission of the same batch;
/// the store never retries on its own.
#[async_trait::async_trait]
pub trait SettingsPersistence: Send + Sync {
    /// Submit the batch, returning an error with the failure reason if the
    /// backing store rejected it.
    async fn submit_changes(&self, batch: &[SettingChange]) -> anyhow::Result<()>;
}

/// Locale-reload collaborator
#[async_trait::async_trait]
pub trait LocaleLoader: Send + Sync {
    /// Load the interface language identified by `tag`.
    async fn load_language(&self, tag: &str) -> anyhow::Result<()>;
}

/// Notification collaborator
///
/// Receives a classified outcome; wording it for the user is up to the
/// implementation.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NotificationKind, payload: &DispatchOutcome);
}

/// Authorization/session collaborator
///
/// Read-only inputs; the store never mutates session state.
pub trait SessionContext: Send + Sync {
    /// Whether the active user may edit settings
    fn is_authorized(&self) -> bool;

    /// Whether the session is still being established
    fn is_loading(&self) -> bool;

    /// Language preference of the active user, if any
    fn user_language(&self) -> Option<String>;
}

/// Relevance predicate
///
/// Computes the `disabled` flag of a setting (feature flags, dependent
/// settings, permissions). The store only stores and folds the result.
pub trait RelevancePredicate: Send + Sync {
    fn is_disabled(&self, record: &SettingRecord) -> bool;
}

impl<F> RelevancePredicate for F
where
    F: Fn(&SettingRecord) -> bool + Send + Sync,
{
    fn is_disabled(&self, record: &SettingRecord) -> bool {
        (self)(record)
    }
}

/// Relevance predicate that never disables a setting
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysEnabled;

impl RelevancePredicate for AlwaysEnabled {
    fn is_disabled(&self, _record: &SettingRecord) -> bool {
        false
    }
}

/// Locale loader that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLocaleLoader;

#[async_trait::async_trait]
impl LocaleLoader for NoopLocaleLoader {
    async fn load_language(&self, _tag: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Notifier that only writes the outcome to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, kind: NotificationKind, payload: &DispatchOutcome) {
        match kind {
            NotificationKind::Success => info!(
                batch_id = %payload.batch_id,
                count = payload.ids.len(),
                "Settings saved"
            ),
            NotificationKind::Error => warn!(
                batch_id = %payload.batch_id,
                code = payload.code.code,
                reason = payload.reason.as_deref().unwrap_or_default(),
                "Settings not saved"
            ),
        }
    }
}

/// Fixed session values
#[derive(Debug, Clone)]
pub struct StaticSession {
    pub authorized: bool,
    pub loading: bool,
    pub language: Option<String>,
}

impl Default for StaticSession {
    fn default() -> Self {
        Self {
            authorized: true,
            loading: false,
            language: None,
        }
    }
}

impl StaticSession {
    /// Set the active user's language preference
    pub fn with_language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }
}

impl SessionContext for StaticSession {
    fn is_authorized(&self) -> bool {
        self.authorized
    }

    fn is_loading(&self) -> bool {
        self.loading
    }

    fn user_language(&self) -> Option<String> {
        self.language.clone()
    }
}
