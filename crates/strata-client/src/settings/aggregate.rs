//! Group and section aggregation
//!
//! Pure folds over a read-only snapshot of the persisted records, the
//! overlay and the membership index. For a fixed snapshot the output depends
//! only on that snapshot and the member order recorded in the index.

use std::collections::HashMap;

use strata_common::{RelevancePredicate, SettingKind, SettingRecord, section_or_unnamed};

use super::cache::EditableOverlay;
use super::index::MembershipIndex;
use crate::model::{EditableSetting, GroupDescriptor, SectionDescriptor};

/// Borrowed view over everything the aggregator reads.
pub struct SettingsSnapshot<'a> {
    pub records: &'a HashMap<String, SettingRecord>,
    pub overlay: &'a EditableOverlay,
    pub index: &'a MembershipIndex,
    pub relevance: &'a dyn RelevancePredicate,
}

impl SettingsSnapshot<'_> {
    /// Editable view of `id`, or `None` when no persisted record backs it.
    pub fn editable(&self, id: &str) -> Option<EditableSetting> {
        self.records
            .get(id)
            .map(|record| self.overlay.get(record, self.relevance))
    }

    fn members(&self, group_id: &str) -> impl Iterator<Item = EditableSetting> + '_ {
        self.index
            .group_members(group_id)
            .iter()
            .filter_map(|id| self.editable(id))
    }
}

/// Whether any setting has pending edits.
pub fn fold_changed<'a>(settings: impl IntoIterator<Item = &'a EditableSetting>) -> bool {
    settings.into_iter().any(|s| s.changed)
}

/// Whether any enabled setting differs from its package default.
pub fn fold_can_reset<'a>(settings: impl IntoIterator<Item = &'a EditableSetting>) -> bool {
    settings
        .into_iter()
        .any(|s| !s.disabled && s.differs_from_package())
}

/// Section names in first-appearance order, without duplicates.
pub fn collect_sections<'a>(settings: impl IntoIterator<Item = &'a EditableSetting>) -> Vec<String> {
    let mut sections: Vec<String> = Vec::new();
    for setting in settings {
        let name = setting.section_name();
        if !sections.iter().any(|s| s == name) {
            sections.push(name.to_string());
        }
    }
    sections
}

/// Build the descriptor of `group_id`.
///
/// Absent when the id has no persisted record or names a plain setting.
pub fn build_group(snapshot: &SettingsSnapshot<'_>, group_id: &str) -> Option<GroupDescriptor> {
    let group = snapshot
        .editable(group_id)
        .filter(|g| g.kind == SettingKind::Group)?;
    let editable_settings: Vec<EditableSetting> = snapshot.members(group_id).collect();

    Some(GroupDescriptor {
        sections: collect_sections(&editable_settings),
        changed: fold_changed(&editable_settings),
        group,
        editable_settings,
    })
}

/// Build the descriptor of one section of `group_id`.
///
/// `section` of `None` or `""` selects the group's section-less settings.
/// Absent only when the group itself is absent; a section without members
/// yields an empty descriptor.
pub fn build_section(
    snapshot: &SettingsSnapshot<'_>,
    group_id: &str,
    section: Option<&str>,
) -> Option<SectionDescriptor> {
    snapshot
        .editable(group_id)
        .filter(|g| g.kind == SettingKind::Group)?;

    let name = section_or_unnamed(section);
    let editable_settings: Vec<EditableSetting> = snapshot
        .members(group_id)
        .filter(|s| s.section_name() == name)
        .collect();

    Some(SectionDescriptor {
        group_id: group_id.to_string(),
        name: name.to_string(),
        settings: editable_settings.iter().map(|s| s.id.clone()).collect(),
        changed: fold_changed(&editable_settings),
        can_reset: fold_can_reset(&editable_settings),
        editable_settings,
    })
}
