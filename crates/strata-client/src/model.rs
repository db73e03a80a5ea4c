//! Client model types
//!
//! This module defines the editable view of a setting and the aggregate
//! descriptors handed to observers.

use serde::Serialize;
use serde_json::Value;
use strata_common::{SettingChange, SettingKind, SettingRecord, section_or_unnamed};

/// Working copy of one setting
///
/// Carries the persisted record's identity and package defaults, plus the
/// overlay's current `value`/`editor` and the `disabled`/`changed` flags.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditableSetting {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SettingKind,
    pub group_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub value: Value,
    pub editor: Value,
    pub package_value: Value,
    pub package_editor: Value,
    pub disabled: bool,
    pub changed: bool,
}

impl EditableSetting {
    /// Seed an editable setting directly from the persisted record.
    pub fn from_record(record: &SettingRecord, disabled: bool) -> Self {
        Self {
            id: record.id.clone(),
            kind: record.kind,
            group_id: record.group_id.clone(),
            section: record.section.clone(),
            value: record.value.clone(),
            editor: record.editor.clone(),
            package_value: record.package_value.clone(),
            package_editor: record.package_editor.clone(),
            disabled,
            changed: false,
        }
    }

    /// Section this setting is aggregated under (`""` when it has none).
    pub fn section_name(&self) -> &str {
        section_or_unnamed(self.section.as_deref())
    }

    /// Whether the current value/editor differ from the package defaults.
    pub fn differs_from_package(&self) -> bool {
        self.value != self.package_value || self.editor != self.package_editor
    }

    /// Project to the unit submitted to the persistence collaborator.
    pub fn to_change(&self) -> SettingChange {
        SettingChange {
            id: self.id.clone(),
            value: self.value.clone(),
            editor: self.editor.clone(),
        }
    }
}

/// Partial update of one overlay entry
///
/// Fields left as `None` keep their current overlay value. When `changed` is
/// `None` it is recomputed against the persisted record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SettingPatch {
    pub id: String,
    pub value: Option<Value>,
    pub editor: Option<Value>,
    pub changed: Option<bool>,
}

impl SettingPatch {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_editor(mut self, editor: Value) -> Self {
        self.editor = Some(editor);
        self
    }

    pub fn with_changed(mut self, changed: bool) -> Self {
        self.changed = Some(changed);
        self
    }

    /// Build a patch for `id` from a value/editor patch.
    pub fn from_value_patch(id: &str, patch: ValuePatch) -> Self {
        Self {
            id: id.to_string(),
            value: patch.value,
            editor: patch.editor,
            changed: None,
        }
    }
}

/// Value/editor patch accepted by the per-setting `update` action
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValuePatch {
    pub value: Option<Value>,
    pub editor: Option<Value>,
}

impl ValuePatch {
    pub fn value(value: Value) -> Self {
        Self {
            value: Some(value),
            editor: None,
        }
    }

    pub fn editor(editor: Value) -> Self {
        Self {
            value: None,
            editor: Some(editor),
        }
    }

    pub fn with_editor(mut self, editor: Value) -> Self {
        self.editor = Some(editor);
        self
    }
}

/// Key of a section subscription
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionKey {
    pub group_id: String,
    pub section: String,
}

impl SectionKey {
    pub fn new(group_id: &str, section: Option<&str>) -> Self {
        Self {
            group_id: group_id.to_string(),
            section: section_or_unnamed(section).to_string(),
        }
    }
}

impl std::fmt::Display for SectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.group_id, self.section)
    }
}

/// Aggregate view of a group
///
/// `group` is the group header setting; `changed` folds the member settings
/// only and never includes the header's own flag.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDescriptor {
    pub group: EditableSetting,
    pub editable_settings: Vec<EditableSetting>,
    pub sections: Vec<String>,
    pub changed: bool,
}

impl GroupDescriptor {
    pub fn id(&self) -> &str {
        &self.group.id
    }

    /// Member settings with pending edits.
    pub fn changed_settings(&self) -> impl Iterator<Item = &EditableSetting> {
        self.editable_settings.iter().filter(|s| s.changed)
    }
}

/// Aggregate view of one section of a group
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionDescriptor {
    pub group_id: String,
    pub name: String,
    pub settings: Vec<String>,
    pub editable_settings: Vec<EditableSetting>,
    pub changed: bool,
    pub can_reset: bool,
}
