//! Action facades over the settings store
//!
//! - `SettingActions`: debounced `update` and `reset` of one setting
//! - `SectionActions`: immediate reset of a section to package defaults
//! - `GroupActions`: `save` and `cancel` of a group's pending edits

use std::sync::Arc;

use strata_common::DispatchOutcome;
use tracing::debug;

use crate::debounce::Debounced;
use crate::error::Result;
use crate::model::{SectionKey, SettingPatch, ValuePatch};
use crate::settings::SettingsStore;

/// Result of a group save.
#[derive(Clone, Debug, PartialEq)]
pub enum SaveReport {
    /// No member had pending edits; nothing was dispatched or reported.
    NothingToSave,
    Saved(DispatchOutcome),
}

impl SaveReport {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveReport::Saved(_))
    }
}

/// Debounced edit actions for one setting.
///
/// Each instance owns its own timer, so bursts on different settings never
/// coalesce with each other. Dropping the instance discards any pending
/// edit.
pub struct SettingActions {
    store: Arc<SettingsStore>,
    id: String,
    debounce: Debounced,
}

impl SettingActions {
    pub fn new(store: Arc<SettingsStore>, id: &str) -> Self {
        let debounce = Debounced::new(id, store.config().debounce());
        Self {
            store,
            id: id.to_string(),
            debounce,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Merge `patch` into the overlay once the debounce window elapses.
    ///
    /// Only the patch of the last call in a burst is applied.
    pub fn update(&self, patch: ValuePatch) {
        let store = self.store.clone();
        let patch = SettingPatch::from_value_patch(&self.id, patch);
        self.debounce.schedule(move || {
            store.dispatch_to_editable_settings(vec![patch]);
        });
    }

    /// Revert value and editor to the package defaults once the debounce
    /// window elapses.
    pub fn reset(&self) {
        let store = self.store.clone();
        let id = self.id.clone();
        self.debounce.schedule(move || {
            let Some(record) = store.record(&id) else {
                debug!("Reset skipped for removed setting: id={}", id);
                return;
            };
            store.dispatch_to_editable_settings(vec![
                SettingPatch::new(&id)
                    .with_value(record.package_value)
                    .with_editor(record.package_editor),
            ]);
        });
    }

    pub fn has_pending(&self) -> bool {
        self.debounce.is_pending()
    }

    /// Discard the pending edit, if any.
    pub fn cancel_pending(&self) -> bool {
        self.debounce.cancel()
    }
}

/// Bulk reset of one section.
pub struct SectionActions {
    store: Arc<SettingsStore>,
    key: SectionKey,
}

impl SectionActions {
    pub fn new(store: Arc<SettingsStore>, group_id: &str, section: Option<&str>) -> Self {
        Self {
            store,
            key: SectionKey::new(group_id, section),
        }
    }

    /// Patch every enabled member to its package defaults, immediately.
    ///
    /// Disabled members are left untouched. Returns the number of members
    /// whose overlay entry changed.
    pub fn reset(&self) -> usize {
        let Some(section) = self
            .store
            .get_section(&self.key.group_id, Some(&self.key.section))
        else {
            return 0;
        };

        let patches: Vec<SettingPatch> = section
            .editable_settings
            .into_iter()
            .filter(|s| !s.disabled)
            .map(|s| {
                SettingPatch::new(&s.id)
                    .with_value(s.package_value)
                    .with_editor(s.package_editor)
            })
            .collect();

        self.store.dispatch_to_editable_settings(patches)
    }
}

/// Save and cancel of one group's pending edits.
pub struct GroupActions {
    store: Arc<SettingsStore>,
    group_id: String,
}

impl GroupActions {
    pub fn new(store: Arc<SettingsStore>, group_id: &str) -> Self {
        Self {
            store,
            group_id: group_id.to_string(),
        }
    }

    /// Persist every changed member of the group.
    ///
    /// The batch is taken from the overlay at call time; edits made while the
    /// dispatch is in flight are not included and stay pending.
    pub async fn save(&self) -> Result<SaveReport> {
        let changes: Vec<_> = match self.store.get_group(&self.group_id) {
            Some(group) => group.changed_settings().map(|s| s.to_change()).collect(),
            None => Vec::new(),
        };

        if changes.is_empty() {
            debug!("Nothing to save: group={}", self.group_id);
            return Ok(SaveReport::NothingToSave);
        }

        let outcome = self.store.dispatch(changes).await?;
        Ok(SaveReport::Saved(outcome))
    }

    /// Revert every changed member to its persisted value without
    /// persisting anything. Returns the number of members reverted.
    pub fn cancel(&self) -> usize {
        let Some(group) = self.store.get_group(&self.group_id) else {
            return 0;
        };

        let patches: Vec<SettingPatch> = group
            .changed_settings()
            .filter_map(|s| match self.store.record(&s.id) {
                Some(record) => Some(
                    SettingPatch::new(&s.id)
                        .with_value(record.value)
                        .with_editor(record.editor)
                        .with_changed(false),
                ),
                None => {
                    debug!("Cancel skipped for removed setting: id={}", s.id);
                    None
                }
            })
            .collect();

        self.store.dispatch_to_editable_settings(patches)
    }
}
