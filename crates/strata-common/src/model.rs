//! Persisted setting model
//!
//! This module defines the canonical setting record as written by the sync
//! collaborator, and the unit of change submitted to the persistence
//! collaborator.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{self, ErrorCode};

/// Kind of a persisted record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SettingKind {
    /// Group header carrying group-level metadata
    Group,
    #[default]
    Value,
}

impl SettingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SettingKind::Group => "group",
            SettingKind::Value => "value",
        }
    }
}

impl std::fmt::Display for SettingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical, last-persisted setting
///
/// `package_value` and `package_editor` are the factory defaults. They are
/// fixed the first time a record id is seen by a store and never change
/// afterwards.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingRecord {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: SettingKind,
    /// Owning group; a group header names itself
    pub group_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub editor: Value,
    #[serde(default)]
    pub package_value: Value,
    #[serde(default)]
    pub package_editor: Value,
}

impl SettingRecord {
    /// Create a value setting whose current value equals its package default.
    pub fn new(id: &str, group_id: &str, section: Option<&str>, value: Value) -> Self {
        Self {
            id: id.to_string(),
            kind: SettingKind::Value,
            group_id: group_id.to_string(),
            section: section.map(str::to_string),
            package_value: value.clone(),
            value,
            editor: Value::Null,
            package_editor: Value::Null,
        }
    }

    /// Create a group header record.
    pub fn group(id: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: SettingKind::Group,
            group_id: id.to_string(),
            ..Default::default()
        }
    }

    /// Set the current value, keeping the package default.
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = value;
        self
    }

    /// Set the editor payload for both current and package editor.
    pub fn with_editor(mut self, editor: Value) -> Self {
        self.package_editor = editor.clone();
        self.editor = editor;
        self
    }

    pub fn is_group(&self) -> bool {
        self.kind == SettingKind::Group
    }
}

/// One accepted change, as submitted to the persistence collaborator
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingChange {
    pub id: String,
    pub value: Value,
    pub editor: Value,
}

/// Kind of outcome reported to the notification collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    Success,
    Error,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::Success => write!(f, "success"),
            NotificationKind::Error => write!(f, "error"),
        }
    }
}

/// Classified result of one dispatch, handed to the notification collaborator
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOutcome {
    /// Correlation id of the batch
    pub batch_id: String,
    /// Setting ids that were part of the batch
    pub ids: Vec<String>,
    pub code: ErrorCode<'static>,
    /// Failure reason as reported by the collaborator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl DispatchOutcome {
    pub fn success(batch_id: &str, ids: Vec<String>) -> Self {
        Self {
            batch_id: batch_id.to_string(),
            ids,
            code: error::SUCCESS,
            reason: None,
        }
    }

    pub fn failure(batch_id: &str, ids: Vec<String>, code: ErrorCode<'static>, reason: &str) -> Self {
        Self {
            batch_id: batch_id.to_string(),
            ids,
            code,
            reason: Some(reason.to_string()),
        }
    }

    /// Notification kind matching this outcome.
    pub fn kind(&self) -> NotificationKind {
        if self.code.is_success() {
            NotificationKind::Success
        } else {
            NotificationKind::Error
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_record_defaults_to_package_value() {
        let record = SettingRecord::new("Site_Name", "General", None, json!("Strata"));
        assert_eq!(record.value, record.package_value);
        assert_eq!(record.kind, SettingKind::Value);
        assert!(!record.is_group());

        let edited = record.with_value(json!("Other"));
        assert_eq!(edited.value, json!("Other"));
        assert_eq!(edited.package_value, json!("Strata"));
    }

    #[test]
    fn test_group_record_names_itself() {
        let group = SettingRecord::group("General");
        assert!(group.is_group());
        assert_eq!(group.group_id, "General");
        assert!(group.section.is_none());
    }

    #[test]
    fn test_record_deserialize_camel_case() {
        let record: SettingRecord = serde_json::from_value(json!({
            "id": "Accounts_AllowEmailChange",
            "groupId": "Accounts",
            "section": "Profile",
            "value": true,
            "packageValue": false
        }))
        .unwrap();

        assert_eq!(record.kind, SettingKind::Value);
        assert_eq!(record.section.as_deref(), Some("Profile"));
        assert_eq!(record.value, json!(true));
        assert_eq!(record.package_value, json!(false));
        assert_eq!(record.editor, Value::Null);
    }

    #[test]
    fn test_dispatch_outcome_kind() {
        let ok = DispatchOutcome::success("b1", vec!["a".to_string()]);
        assert_eq!(ok.kind(), NotificationKind::Success);
        assert!(ok.reason.is_none());

        let failed = DispatchOutcome::failure("b2", vec![], error::DISPATCH_REJECTED, "timeout");
        assert_eq!(failed.kind(), NotificationKind::Error);
        assert_eq!(failed.reason.as_deref(), Some("timeout"));

        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["batchId"], "b2");
        assert_eq!(value["code"]["code"], 20020);
    }

    #[test]
    fn test_group_kind_serializes_as_type() {
        let value = serde_json::to_value(SettingRecord::group("Accounts")).unwrap();
        assert_eq!(value["type"], "group");
        assert!(value.get("section").is_none());
    }
}
