//! Dispatch coordination
//!
//! Submits a batch of changes to the persistence collaborator as one logical
//! unit, echoes an accepted batch into the persisted layer, triggers the
//! locale reload when the language setting was part of the batch, and reports
//! exactly one classified outcome per dispatch.

use std::sync::Arc;

use strata_common::{
    DispatchOutcome, LocaleLoader, Notifier, SessionContext, SettingChange, SettingsPersistence,
    error as codes,
};
use tracing::{error, info, warn};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::metrics::Timer;
use crate::settings::SettingsStore;

const DISPATCH_OPERATION: &str = "dispatch";

/// Coordinates persistence, side effects and reporting of one batch.
pub struct DispatchCoordinator {
    persistence: Arc<dyn SettingsPersistence>,
    locale_loader: Arc<dyn LocaleLoader>,
    notifier: Arc<dyn Notifier>,
    session: Arc<dyn SessionContext>,
    language_setting_id: String,
    default_language: String,
}

impl DispatchCoordinator {
    pub fn new(
        persistence: Arc<dyn SettingsPersistence>,
        locale_loader: Arc<dyn LocaleLoader>,
        notifier: Arc<dyn Notifier>,
        session: Arc<dyn SessionContext>,
        config: &StoreConfig,
    ) -> Self {
        Self {
            persistence,
            locale_loader,
            notifier,
            session,
            language_setting_id: config.language_setting_id.clone(),
            default_language: config.default_language.clone(),
        }
    }

    /// Dispatch `changes` on behalf of `store`.
    ///
    /// An empty batch succeeds without contacting any collaborator. A refused
    /// or failed batch leaves the overlay untouched, so its settings stay
    /// dirty.
    pub async fn dispatch(
        &self,
        store: &SettingsStore,
        changes: Vec<SettingChange>,
    ) -> Result<DispatchOutcome> {
        let batch_id = uuid::Uuid::new_v4().to_string();
        let ids: Vec<String> = changes.iter().map(|c| c.id.clone()).collect();

        if changes.is_empty() {
            return Ok(DispatchOutcome::success(&batch_id, ids));
        }

        if self.session.is_loading() {
            warn!("Refusing settings dispatch while session is loading: batch_id={}", batch_id);
            self.report(DispatchOutcome::failure(
                &batch_id,
                ids,
                codes::SESSION_LOADING,
                codes::SESSION_LOADING.message,
            ));
            return Err(StoreError::NotReady);
        }

        if !self.session.is_authorized() {
            warn!("Refusing unauthorized settings dispatch: batch_id={}", batch_id);
            self.report(DispatchOutcome::failure(
                &batch_id,
                ids,
                codes::ACCESS_DENIED,
                codes::ACCESS_DENIED.message,
            ));
            return Err(StoreError::Unauthorized);
        }

        let timer = Timer::start(store.metrics(), DISPATCH_OPERATION);
        match self.persistence.submit_changes(&changes).await {
            Ok(()) => {
                timer.success();
                store.apply_accepted(&changes);

                if let Some(change) = changes.iter().find(|c| c.id == self.language_setting_id) {
                    let tag = self.language_tag(&change.value);
                    if let Err(e) = self.locale_loader.load_language(&tag).await {
                        warn!("Failed to reload language: tag={}, error={}", tag, e);
                    }
                }

                info!(
                    "Settings dispatched: batch_id={}, count={}",
                    batch_id,
                    ids.len()
                );
                let outcome = DispatchOutcome::success(&batch_id, ids);
                self.report(outcome.clone());
                Ok(outcome)
            }
            Err(e) => {
                timer.failure("rejected");
                let reason = e.to_string();
                error!(
                    "Settings dispatch failed: batch_id={}, error={}",
                    batch_id, reason
                );
                self.report(DispatchOutcome::failure(
                    &batch_id,
                    ids,
                    codes::DISPATCH_REJECTED,
                    &reason,
                ));
                Err(StoreError::DispatchFailed { batch_id, reason })
            }
        }
    }

    /// Language to load after the language setting was saved.
    ///
    /// The active user's own preference wins, then the saved value, then the
    /// configured default.
    fn language_tag(&self, dispatched: &serde_json::Value) -> String {
        self.session
            .user_language()
            .filter(|tag| !tag.is_empty())
            .or_else(|| {
                dispatched
                    .as_str()
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| self.default_language.clone())
    }

    fn report(&self, outcome: DispatchOutcome) {
        self.notifier.notify(outcome.kind(), &outcome);
    }
}
