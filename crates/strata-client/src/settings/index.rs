//! Membership hierarchy and reverse index
//!
//! Tracks, for every known setting id, the group and section it belongs to,
//! and for every group the ordered list of its member settings. A write to
//! one setting fans out to exactly the keys returned by
//! [`MembershipIndex::affected_keys`], so notification and cache
//! invalidation never rescan the whole collection.

use std::collections::{HashMap, HashSet};

use strata_common::{SettingRecord, section_or_unnamed};

use crate::model::SectionKey;

/// Where a setting sits in the hierarchy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    pub group_id: String,
    pub section: String,
    pub is_group: bool,
}

impl Placement {
    fn of(record: &SettingRecord) -> Self {
        Self {
            group_id: record.group_id.clone(),
            section: section_or_unnamed(record.section.as_deref()).to_string(),
            is_group: record.is_group(),
        }
    }
}

/// Ordered, deduplicated set of subscription keys touched by a write.
///
/// The `Vec`s keep first-touch order for delivery; the sets back membership
/// checks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AffectedKeys {
    pub settings: Vec<String>,
    pub groups: Vec<String>,
    pub sections: Vec<SectionKey>,
    seen_settings: HashSet<String>,
    seen_groups: HashSet<String>,
    seen_sections: HashSet<SectionKey>,
}

impl AffectedKeys {
    fn push_setting(&mut self, id: &str) {
        if self.seen_settings.insert(id.to_string()) {
            self.settings.push(id.to_string());
        }
    }

    fn push_group(&mut self, group_id: &str) {
        if self.seen_groups.insert(group_id.to_string()) {
            self.groups.push(group_id.to_string());
        }
    }

    fn push_section(&mut self, key: SectionKey) {
        if self.seen_sections.insert(key.clone()) {
            self.sections.push(key);
        }
    }

    /// Whether `id` was touched as a setting key.
    pub fn touches_setting(&self, id: &str) -> bool {
        self.seen_settings.contains(id)
    }

    pub fn add_group(&mut self, group_id: &str) {
        self.push_group(group_id);
    }

    pub fn add_section(&mut self, key: SectionKey) {
        self.push_section(key);
    }

    /// Add the keys derived from one setting placement.
    pub fn add(&mut self, id: &str, placement: &Placement) {
        self.push_setting(id);
        if placement.is_group {
            self.push_group(id);
        } else {
            self.push_group(&placement.group_id);
            self.push_section(SectionKey::new(&placement.group_id, Some(&placement.section)));
        }
    }

    /// Add a bare setting id with no known placement.
    pub fn add_setting(&mut self, id: &str) {
        self.push_setting(id);
    }

    pub fn extend(&mut self, other: AffectedKeys) {
        for id in other.settings {
            self.push_setting(&id);
        }
        for group_id in other.groups {
            self.push_group(&group_id);
        }
        for key in other.sections {
            self.push_section(key);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty() && self.groups.is_empty() && self.sections.is_empty()
    }
}

/// Reverse index from setting id to its group/section.
#[derive(Debug, Default)]
pub struct MembershipIndex {
    placements: HashMap<String, Placement>,
    /// group id -> member setting ids in insertion order (headers excluded)
    members: HashMap<String, Vec<String>>,
}

impl MembershipIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `record`, returning the keys of its old and new placement.
    pub fn insert(&mut self, record: &SettingRecord) -> AffectedKeys {
        let placement = Placement::of(record);
        let mut affected = AffectedKeys::default();

        match self.placements.get(&record.id).cloned() {
            Some(previous) if previous == placement => {}
            Some(_) => {
                affected.extend(self.remove(&record.id));
                self.place(&record.id, placement.clone());
            }
            None => self.place(&record.id, placement.clone()),
        }

        affected.add(&record.id, &placement);
        affected
    }

    fn place(&mut self, id: &str, placement: Placement) {
        if !placement.is_group {
            self.members
                .entry(placement.group_id.clone())
                .or_default()
                .push(id.to_string());
        }
        self.placements.insert(id.to_string(), placement);
    }

    /// Drop `id` from the index, returning the keys it was reachable from.
    pub fn remove(&mut self, id: &str) -> AffectedKeys {
        let mut affected = AffectedKeys::default();
        affected.add_setting(id);

        if let Some(placement) = self.placements.remove(id) {
            if !placement.is_group
                && let Some(members) = self.members.get_mut(&placement.group_id)
            {
                members.retain(|member| member != id);
            }
            affected.add(id, &placement);
        }
        affected
    }

    pub fn placement(&self, id: &str) -> Option<&Placement> {
        self.placements.get(id)
    }

    /// Keys a write to `id` must notify.
    pub fn affected_keys(&self, id: &str) -> AffectedKeys {
        let mut affected = AffectedKeys::default();
        match self.placements.get(id) {
            Some(placement) => affected.add(id, placement),
            None => affected.add_setting(id),
        }
        affected
    }

    /// Member settings of `group_id`, in hierarchy order.
    pub fn group_members(&self, group_id: &str) -> &[String] {
        self.members
            .get(group_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
