//! Editable overlay over the persisted setting records
//!
//! Each entry shadows one persisted record by id and holds the working
//! `value`/`editor` plus the `disabled` and `changed` flags. Entries are
//! created lazily: a setting that was never patched is read straight from
//! its persisted record.

use std::collections::HashMap;

use serde_json::Value;
use strata_common::{RelevancePredicate, SettingRecord};

use crate::model::{EditableSetting, SettingPatch};

/// Whether a working value/editor pair differs from the persisted one.
///
/// Comparison is structural: two independently built but equal JSON payloads
/// count as unchanged.
pub fn differs_from_persisted(value: &Value, editor: &Value, record: &SettingRecord) -> bool {
    *value != record.value || *editor != record.editor
}

/// Overlay state of a single setting.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayEntry {
    pub value: Value,
    pub editor: Value,
    pub disabled: bool,
    pub changed: bool,
}

impl OverlayEntry {
    /// Seed an entry from the persisted record.
    pub fn seed(record: &SettingRecord, disabled: bool) -> Self {
        Self {
            value: record.value.clone(),
            editor: record.editor.clone(),
            disabled,
            changed: false,
        }
    }

    /// Merge a patch into this entry.
    ///
    /// `changed` is taken from the patch when supplied, otherwise recomputed
    /// against the persisted record. Returns `true` if the entry actually
    /// changed.
    pub fn merge(&mut self, patch: &SettingPatch, record: &SettingRecord, disabled: bool) -> bool {
        let before = self.clone();

        if let Some(value) = &patch.value {
            self.value = value.clone();
        }
        if let Some(editor) = &patch.editor {
            self.editor = editor.clone();
        }
        self.disabled = disabled;
        self.changed = patch
            .changed
            .unwrap_or_else(|| differs_from_persisted(&self.value, &self.editor, record));

        *self != before
    }

    /// Recompute `changed` and `disabled` after the persisted record moved.
    /// Returns `true` if either flag flipped.
    pub fn resync(&mut self, record: &SettingRecord, disabled: bool) -> bool {
        let changed = differs_from_persisted(&self.value, &self.editor, record);
        let flipped = changed != self.changed || disabled != self.disabled;
        self.changed = changed;
        self.disabled = disabled;
        flipped
    }

    /// Combine with the persisted record into the editable view.
    pub fn to_editable(&self, record: &SettingRecord) -> EditableSetting {
        EditableSetting {
            value: self.value.clone(),
            editor: self.editor.clone(),
            disabled: self.disabled,
            changed: self.changed,
            ..EditableSetting::from_record(record, self.disabled)
        }
    }
}

/// Keyed set of overlay entries.
#[derive(Debug, Default)]
pub struct EditableOverlay {
    entries: HashMap<String, OverlayEntry>,
}

impl EditableOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Editable view of `record`: the overlay entry when one exists,
    /// otherwise a view synthesized from the record with `changed = false`.
    pub fn get(&self, record: &SettingRecord, relevance: &dyn RelevancePredicate) -> EditableSetting {
        match self.entries.get(&record.id) {
            Some(entry) => entry.to_editable(record),
            None => EditableSetting::from_record(record, relevance.is_disabled(record)),
        }
    }

    /// Merge `patch` into the entry for `record`, creating it on first write.
    /// Returns `true` if the overlay changed.
    pub fn apply(
        &mut self,
        patch: &SettingPatch,
        record: &SettingRecord,
        relevance: &dyn RelevancePredicate,
    ) -> bool {
        let disabled = relevance.is_disabled(record);
        // A fresh seed matches the synthesized view, so only the merge counts.
        self.entries
            .entry(record.id.clone())
            .or_insert_with(|| OverlayEntry::seed(record, disabled))
            .merge(patch, record, disabled)
    }

    /// Re-run the dirty check for `record` after the persisted layer changed.
    /// Returns `true` if the entry's flags flipped.
    pub fn resync(&mut self, record: &SettingRecord, relevance: &dyn RelevancePredicate) -> bool {
        match self.entries.get_mut(&record.id) {
            Some(entry) => entry.resync(record, relevance.is_disabled(record)),
            None => false,
        }
    }

    /// Drop the entry for `id`.
    pub fn remove(&mut self, id: &str) -> Option<OverlayEntry> {
        self.entries.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Ids of all materialized entries.
    pub fn ids(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
