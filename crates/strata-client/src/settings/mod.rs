//! Reactive settings store
//!
//! Provides `SettingsStore`, the single handle that owns the persisted record
//! layer, the editable overlay, the memoized group/section aggregates and the
//! subscription hubs. Every facade receives the store explicitly.

pub mod aggregate;
pub mod cache;
pub mod hub;
pub mod index;
pub mod listener;

use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use strata_common::{
    AlwaysEnabled, DispatchOutcome, LocaleLoader, LogNotifier, NoopLocaleLoader, Notifier,
    RelevancePredicate, SessionContext, SettingChange, SettingRecord, SettingsPersistence,
    StaticSession,
};
use tracing::{debug, info};

use crate::actions::{GroupActions, SectionActions, SettingActions};
use crate::config::StoreConfig;
use crate::dispatch::DispatchCoordinator;
use crate::error::Result;
use crate::metrics::StoreMetrics;
use crate::model::{EditableSetting, GroupDescriptor, SectionDescriptor, SectionKey, SettingPatch};

use self::aggregate::{SettingsSnapshot, build_group, build_section};
use self::cache::EditableOverlay;
use self::hub::{Delivery, SubscriptionHub};
use self::index::{AffectedKeys, MembershipIndex};
use self::listener::{SettingsListener, Subscription};

/// Notification captured during a write, delivered once the state lock is
/// released.
enum Notification {
    Setting(Delivery<String, EditableSetting>),
    Group(Delivery<String, GroupDescriptor>),
    Section(Delivery<SectionKey, SectionDescriptor>),
}

impl Notification {
    fn deliver(self) -> (&'static str, usize) {
        match self {
            Notification::Setting(delivery) => (delivery.kind(), delivery.deliver()),
            Notification::Group(delivery) => (delivery.kind(), delivery.deliver()),
            Notification::Section(delivery) => (delivery.kind(), delivery.deliver()),
        }
    }
}

#[derive(Default)]
struct StoreState {
    records: HashMap<String, SettingRecord>,
    overlay: EditableOverlay,
    index: MembershipIndex,
    groups: HashMap<String, GroupDescriptor>,
    sections: HashMap<SectionKey, SectionDescriptor>,
}

impl StoreState {
    fn snapshot<'a>(&'a self, relevance: &'a dyn RelevancePredicate) -> SettingsSnapshot<'a> {
        SettingsSnapshot {
            records: &self.records,
            overlay: &self.overlay,
            index: &self.index,
            relevance,
        }
    }

    fn setting(&self, relevance: &dyn RelevancePredicate, id: &str) -> Option<EditableSetting> {
        self.snapshot(relevance).editable(id)
    }

    fn group(&mut self, relevance: &dyn RelevancePredicate, group_id: &str) -> Option<GroupDescriptor> {
        if let Some(cached) = self.groups.get(group_id) {
            return Some(cached.clone());
        }
        let built = build_group(&self.snapshot(relevance), group_id)?;
        self.groups.insert(group_id.to_string(), built.clone());
        Some(built)
    }

    fn section(
        &mut self,
        relevance: &dyn RelevancePredicate,
        key: &SectionKey,
    ) -> Option<SectionDescriptor> {
        if let Some(cached) = self.sections.get(key) {
            return Some(cached.clone());
        }
        let built = build_section(&self.snapshot(relevance), &key.group_id, Some(&key.section))?;
        self.sections.insert(key.clone(), built.clone());
        Some(built)
    }

    /// Drop memoized aggregates reachable from `affected`.
    fn invalidate(&mut self, affected: &AffectedKeys) {
        for group_id in &affected.groups {
            self.groups.remove(group_id);
            // A touched header decides whether any section of its group exists
            if affected.touches_setting(group_id) {
                self.sections.retain(|key, _| &key.group_id != group_id);
            }
        }
        for key in &affected.sections {
            self.sections.remove(key);
        }
    }

    /// Write `record` into the persisted layer.
    ///
    /// Package defaults of an already known id are kept. Overlay `changed`
    /// is recomputed against the new persisted value.
    fn upsert(&mut self, mut record: SettingRecord, relevance: &dyn RelevancePredicate) -> AffectedKeys {
        if let Some(existing) = self.records.get(&record.id) {
            record.package_value = existing.package_value.clone();
            record.package_editor = existing.package_editor.clone();
            if *existing == record {
                return AffectedKeys::default();
            }
        }

        let affected = self.index.insert(&record);
        self.overlay.resync(&record, relevance);
        self.records.insert(record.id.clone(), record);
        affected
    }

    fn remove(&mut self, id: &str) -> (Option<SettingRecord>, AffectedKeys) {
        let removed = self.records.remove(id);
        if removed.is_none() {
            return (None, AffectedKeys::default());
        }
        self.overlay.remove(id);
        (removed, self.index.remove(id))
    }
}

/// Client-side reactive settings store.
pub struct SettingsStore {
    state: Mutex<StoreState>,
    /// Serializes write+notify cycles; the flag marks an active delivery loop
    write_lock: ReentrantMutex<Cell<bool>>,
    outbox: Mutex<VecDeque<Notification>>,
    setting_hub: SubscriptionHub<String, EditableSetting>,
    group_hub: SubscriptionHub<String, GroupDescriptor>,
    section_hub: SubscriptionHub<SectionKey, SectionDescriptor>,
    relevance: Arc<dyn RelevancePredicate>,
    coordinator: DispatchCoordinator,
    config: StoreConfig,
    metrics: Arc<StoreMetrics>,
}

impl SettingsStore {
    /// Start building a store around the given persistence collaborator.
    pub fn builder(persistence: Arc<dyn SettingsPersistence>) -> SettingsStoreBuilder {
        SettingsStoreBuilder::new(persistence)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn metrics(&self) -> &StoreMetrics {
        &self.metrics
    }

    // ============== Reads ==============

    /// Editable view of a setting, or `None` when no persisted record exists.
    pub fn get(&self, id: &str) -> Option<EditableSetting> {
        self.state.lock().setting(self.relevance.as_ref(), id)
    }

    /// Aggregate view of a group.
    pub fn get_group(&self, group_id: &str) -> Option<GroupDescriptor> {
        self.state.lock().group(self.relevance.as_ref(), group_id)
    }

    /// Aggregate view of one section of a group.
    ///
    /// `None` or `""` addresses the group's section-less settings.
    pub fn get_section(&self, group_id: &str, section: Option<&str>) -> Option<SectionDescriptor> {
        let key = SectionKey::new(group_id, section);
        self.state.lock().section(self.relevance.as_ref(), &key)
    }

    /// Last persisted record of a setting.
    pub fn record(&self, id: &str) -> Option<SettingRecord> {
        self.state.lock().records.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state.lock().records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().records.is_empty()
    }

    // ============== Subscriptions ==============

    /// Watch the editable view of one setting.
    pub fn subscribe_setting(
        &self,
        id: &str,
        listener: Arc<dyn SettingsListener<EditableSetting>>,
    ) -> Subscription {
        let _write = self.write_lock.lock();
        let current = self.get(id);
        self.setting_hub.subscribe(id.to_string(), current, listener)
    }

    /// Watch the aggregate of one group.
    pub fn subscribe_group(
        &self,
        group_id: &str,
        listener: Arc<dyn SettingsListener<GroupDescriptor>>,
    ) -> Subscription {
        let _write = self.write_lock.lock();
        let current = self.get_group(group_id);
        self.group_hub.subscribe(group_id.to_string(), current, listener)
    }

    /// Watch the aggregate of one section.
    pub fn subscribe_section(
        &self,
        group_id: &str,
        section: Option<&str>,
        listener: Arc<dyn SettingsListener<SectionDescriptor>>,
    ) -> Subscription {
        let _write = self.write_lock.lock();
        let current = self.get_section(group_id, section);
        self.section_hub
            .subscribe(SectionKey::new(group_id, section), current, listener)
    }

    // ============== Writes ==============

    /// Merge patches into the overlay.
    ///
    /// Patches for ids without a persisted record are dropped. Returns the
    /// number of patches that actually changed an overlay entry.
    pub fn dispatch_to_editable_settings(&self, patches: Vec<SettingPatch>) -> usize {
        let applied = self.write(|state, relevance| {
            let mut affected = AffectedKeys::default();
            let mut applied = 0;
            for patch in &patches {
                let Some(record) = state.records.get(&patch.id) else {
                    debug!("Dropping patch for unknown setting: id={}", patch.id);
                    continue;
                };
                if state.overlay.apply(patch, record, relevance) {
                    applied += 1;
                    affected.extend(state.index.affected_keys(&patch.id));
                }
            }
            (applied, affected)
        });

        self.metrics.increment_patches(applied as u64);
        debug!(
            "Applied overlay patches: applied={}, received={}",
            applied,
            patches.len()
        );
        applied
    }

    /// Upsert persisted records, as reported by the sync collaborator.
    ///
    /// Package defaults of already known ids are preserved. Returns the number
    /// of records whose persisted content changed.
    pub fn sync_records<I>(&self, records: I) -> usize
    where
        I: IntoIterator<Item = SettingRecord>,
    {
        self.write(|state, relevance| {
            let mut affected = AffectedKeys::default();
            let mut synced = 0;
            for record in records {
                let keys = state.upsert(record, relevance);
                if !keys.is_empty() {
                    synced += 1;
                    affected.extend(keys);
                }
            }
            (synced, affected)
        })
    }

    /// Drop a persisted record together with its overlay entry.
    pub fn remove_record(&self, id: &str) -> Option<SettingRecord> {
        self.write(|state, _| state.remove(id))
    }

    /// Re-evaluate the relevance predicate for every setting.
    ///
    /// Call after an input of the predicate (a feature flag, a dependent
    /// setting) changed outside the store.
    pub fn refresh_relevance(&self) {
        self.write(|state, relevance| {
            for id in state.overlay.ids() {
                if let Some(record) = state.records.get(&id) {
                    state.overlay.resync(record, relevance);
                }
            }
            state.groups.clear();
            state.sections.clear();

            let mut affected = AffectedKeys::default();
            for id in self.setting_hub.watched_keys() {
                affected.add_setting(&id);
            }
            for group_id in self.group_hub.watched_keys() {
                affected.add_group(&group_id);
            }
            for key in self.section_hub.watched_keys() {
                affected.add_section(key);
            }
            ((), affected)
        });
        debug!("Refreshed setting relevance");
    }

    /// Submit a batch of changes through the dispatch coordinator.
    pub async fn dispatch(&self, changes: Vec<SettingChange>) -> Result<DispatchOutcome> {
        self.coordinator.dispatch(self, changes).await
    }

    /// Echo a batch accepted by the persistence collaborator into the
    /// persisted layer.
    pub(crate) fn apply_accepted(&self, changes: &[SettingChange]) -> usize {
        self.write(|state, relevance| {
            let mut affected = AffectedKeys::default();
            let mut applied = 0;
            for change in changes {
                let Some(record) = state.records.get(&change.id) else {
                    debug!("Accepted change for removed setting: id={}", change.id);
                    continue;
                };
                let record = SettingRecord {
                    value: change.value.clone(),
                    editor: change.editor.clone(),
                    ..record.clone()
                };
                affected.extend(state.upsert(record, relevance));
                applied += 1;
            }
            (applied, affected)
        })
    }

    // ============== Facades ==============

    /// Debounced update/reset actions for one setting.
    pub fn setting_actions(self: &Arc<Self>, id: &str) -> SettingActions {
        SettingActions::new(self.clone(), id)
    }

    /// Reset action for one section.
    pub fn section_actions(self: &Arc<Self>, group_id: &str, section: Option<&str>) -> SectionActions {
        SectionActions::new(self.clone(), group_id, section)
    }

    /// Save/cancel actions for one group.
    pub fn group_actions(self: &Arc<Self>, group_id: &str) -> GroupActions {
        GroupActions::new(self.clone(), group_id)
    }

    // ============== Write cycle ==============

    /// Run one serialized write and notify every watcher whose derived value
    /// changed.
    ///
    /// Notifications are delivered outside the state lock. A listener that
    /// writes back into the store queues its own notifications behind the
    /// ones already pending.
    fn write<R, F>(&self, mutate: F) -> R
    where
        F: FnOnce(&mut StoreState, &dyn RelevancePredicate) -> (R, AffectedKeys),
    {
        let delivering = self.write_lock.lock();

        let result = {
            let mut state = self.state.lock();
            let (result, affected) = mutate(&mut *state, self.relevance.as_ref());
            if !affected.is_empty() {
                let pending = self.collect(&mut *state, affected);
                self.outbox.lock().extend(pending);
            }
            result
        };

        if !delivering.replace(true) {
            self.drain();
            delivering.set(false);
        }
        result
    }

    fn collect(&self, state: &mut StoreState, mut affected: AffectedKeys) -> Vec<Notification> {
        state.invalidate(&affected);

        for key in self.section_hub.watched_keys() {
            if affected.touches_setting(&key.group_id) {
                affected.add_section(key);
            }
        }

        let relevance = self.relevance.as_ref();
        let mut pending = Vec::new();

        for id in &affected.settings {
            if self.setting_hub.is_watched(id)
                && let Some(delivery) = self.setting_hub.publish(id, state.setting(relevance, id))
            {
                pending.push(Notification::Setting(delivery));
            }
        }
        for group_id in &affected.groups {
            if self.group_hub.is_watched(group_id)
                && let Some(delivery) = self
                    .group_hub
                    .publish(group_id, state.group(relevance, group_id))
            {
                pending.push(Notification::Group(delivery));
            }
        }
        for key in &affected.sections {
            if self.section_hub.is_watched(key)
                && let Some(delivery) = self.section_hub.publish(key, state.section(relevance, key))
            {
                pending.push(Notification::Section(delivery));
            }
        }

        pending
    }

    fn drain(&self) {
        loop {
            let next = self.outbox.lock().pop_front();
            let Some(notification) = next else {
                break;
            };
            let (kind, delivered) = notification.deliver();
            self.metrics.increment_notifications(kind, delivered as u64);
        }
    }
}

/// Builder for [`SettingsStore`].
pub struct SettingsStoreBuilder {
    persistence: Arc<dyn SettingsPersistence>,
    config: StoreConfig,
    relevance: Arc<dyn RelevancePredicate>,
    session: Arc<dyn SessionContext>,
    notifier: Arc<dyn Notifier>,
    locale_loader: Arc<dyn LocaleLoader>,
    metrics: Option<Arc<StoreMetrics>>,
    records: Vec<SettingRecord>,
}

impl SettingsStoreBuilder {
    pub fn new(persistence: Arc<dyn SettingsPersistence>) -> Self {
        Self {
            persistence,
            config: StoreConfig::default(),
            relevance: Arc::new(AlwaysEnabled),
            session: Arc::new(StaticSession::default()),
            notifier: Arc::new(LogNotifier),
            locale_loader: Arc::new(NoopLocaleLoader),
            metrics: None,
            records: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_relevance(mut self, relevance: Arc<dyn RelevancePredicate>) -> Self {
        self.relevance = relevance;
        self
    }

    pub fn with_session(mut self, session: Arc<dyn SessionContext>) -> Self {
        self.session = session;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_locale_loader(mut self, locale_loader: Arc<dyn LocaleLoader>) -> Self {
        self.locale_loader = locale_loader;
        self
    }

    /// Share a metrics collector between stores.
    pub fn with_metrics(mut self, metrics: Arc<StoreMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Seed the persisted layer.
    pub fn with_records<I>(mut self, records: I) -> Self
    where
        I: IntoIterator<Item = SettingRecord>,
    {
        self.records.extend(records);
        self
    }

    pub fn build(self) -> Result<Arc<SettingsStore>> {
        let metrics = match self.metrics {
            Some(metrics) => metrics,
            None => Arc::new(StoreMetrics::new()?),
        };

        let mut state = StoreState::default();
        for record in self.records {
            state.upsert(record, self.relevance.as_ref());
        }
        let seeded = state.records.len();

        let coordinator = DispatchCoordinator::new(
            self.persistence,
            self.locale_loader,
            self.notifier,
            self.session,
            &self.config,
        );

        info!("Settings store ready: records={}", seeded);

        Ok(Arc::new(SettingsStore {
            state: Mutex::new(state),
            write_lock: ReentrantMutex::new(Cell::new(false)),
            outbox: Mutex::new(VecDeque::new()),
            setting_hub: SubscriptionHub::new("setting"),
            group_hub: SubscriptionHub::new("group"),
            section_hub: SubscriptionHub::new("section"),
            relevance: self.relevance,
            coordinator,
            config: self.config,
            metrics,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::listener::FnListener;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct AcceptAll;

    #[async_trait::async_trait]
    impl SettingsPersistence for AcceptAll {
        async fn submit_changes(&self, _batch: &[SettingChange]) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn records() -> Vec<SettingRecord> {
        vec![
            SettingRecord::group("General"),
            SettingRecord::new("Site_Url", "General", None, json!("http://localhost:3000")),
            SettingRecord::new("Site_Name", "General", None, json!("Strata")),
            SettingRecord::new("Iframe_Enabled", "General", Some("Iframe"), json!(false)),
            SettingRecord::group("Message"),
            SettingRecord::new("Message_MaxAllowedSize", "Message", None, json!(5000)),
        ]
    }

    fn store() -> Arc<SettingsStore> {
        SettingsStore::builder(Arc::new(AcceptAll))
            .with_records(records())
            .build()
            .unwrap()
    }

    fn counter<V: 'static>() -> (Arc<AtomicUsize>, Arc<dyn SettingsListener<V>>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let listener = Arc::new(FnListener::new(move |_value: Option<&V>| {
            counted.fetch_add(1, Ordering::SeqCst);
        }));
        (calls, listener)
    }

    #[test]
    fn test_lookup_miss_is_none() {
        let store = store();
        assert!(store.get("Unknown").is_none());
        assert!(store.get_group("Unknown").is_none());
        assert!(store.get_section("Unknown", None).is_none());
    }

    #[test]
    fn test_unknown_patch_is_dropped() {
        let store = store();
        let applied = store.dispatch_to_editable_settings(vec![
            SettingPatch::new("Unknown").with_value(json!(1)),
            SettingPatch::new("Site_Name").with_value(json!("Renamed")),
        ]);
        assert_eq!(applied, 1);
        assert!(store.get("Unknown").is_none());
        assert!(store.get("Site_Name").unwrap().changed);
    }

    #[test]
    fn test_group_cache_invalidated_by_member_write() {
        let store = store();
        assert!(!store.get_group("General").unwrap().changed);

        store.dispatch_to_editable_settings(vec![
            SettingPatch::new("Iframe_Enabled").with_value(json!(true)),
        ]);
        assert!(store.get_group("General").unwrap().changed);
        assert!(store.get_section("General", Some("Iframe")).unwrap().changed);
        assert!(!store.get_section("General", None).unwrap().changed);
    }

    #[test]
    fn test_write_notifies_only_related_keys() {
        let store = store();
        let (setting_calls, setting_listener) = counter();
        let (other_calls, other_listener) = counter();
        let (group_calls, group_listener) = counter();
        let (unrelated_calls, unrelated_listener) = counter();
        let (section_calls, section_listener) = counter();
        let (other_section_calls, other_section_listener) = counter();

        let _s1 = store.subscribe_setting("Iframe_Enabled", setting_listener);
        let _s2 = store.subscribe_setting("Site_Url", other_listener);
        let _s3 = store.subscribe_group("General", group_listener);
        let _s4 = store.subscribe_group("Message", unrelated_listener);
        let _s5 = store.subscribe_section("General", Some("Iframe"), section_listener);
        let _s6 = store.subscribe_section("General", None, other_section_listener);

        store.dispatch_to_editable_settings(vec![
            SettingPatch::new("Iframe_Enabled").with_value(json!(true)),
        ]);

        assert_eq!(setting_calls.load(Ordering::SeqCst), 1);
        assert_eq!(group_calls.load(Ordering::SeqCst), 1);
        assert_eq!(section_calls.load(Ordering::SeqCst), 1);
        assert_eq!(other_calls.load(Ordering::SeqCst), 0);
        assert_eq!(unrelated_calls.load(Ordering::SeqCst), 0);
        assert_eq!(other_section_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_redundant_write_is_silent() {
        let store = store();
        let (calls, listener) = counter();
        let _sub = store.subscribe_setting("Site_Name", listener);

        // Same as persisted: the derived view does not change
        store.dispatch_to_editable_settings(vec![
            SettingPatch::new("Site_Name").with_value(json!("Strata")),
        ]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_sync_preserves_package_defaults() {
        let store = store();
        let synced = store.sync_records(vec![
            SettingRecord::new("Message_MaxAllowedSize", "Message", None, json!(9000)),
        ]);
        assert_eq!(synced, 1);

        let record = store.record("Message_MaxAllowedSize").unwrap();
        assert_eq!(record.value, json!(9000));
        assert_eq!(record.package_value, json!(5000));

        // Syncing the same content again changes nothing
        let synced = store.sync_records(vec![
            SettingRecord::new("Message_MaxAllowedSize", "Message", None, json!(9000)),
        ]);
        assert_eq!(synced, 0);
    }

    #[test]
    fn test_sync_recomputes_changed() {
        let store = store();
        store.dispatch_to_editable_settings(vec![
            SettingPatch::new("Site_Name").with_value(json!("Renamed")),
        ]);
        assert!(store.get("Site_Name").unwrap().changed);

        store.sync_records(vec![
            SettingRecord::new("Site_Name", "General", None, json!("Renamed")),
        ]);
        assert!(!store.get("Site_Name").unwrap().changed);
    }

    #[test]
    fn test_removing_header_notifies_sections() {
        let store = store();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = seen.clone();
        let _sub = store.subscribe_section(
            "General",
            Some("Iframe"),
            Arc::new(FnListener::new(move |value: Option<&SectionDescriptor>| {
                recorded.lock().push(value.is_some());
            })),
        );

        assert!(store.remove_record("General").is_some());
        assert!(store.get_group("General").is_none());
        assert_eq!(*seen.lock(), vec![false]);
    }

    #[test]
    fn test_refresh_relevance_flips_disabled() {
        let flag = Arc::new(AtomicBool::new(false));
        let predicate_flag = flag.clone();
        let store = SettingsStore::builder(Arc::new(AcceptAll))
            .with_records(records())
            .with_relevance(Arc::new(move |record: &SettingRecord| {
                record.id.starts_with("Iframe_") && predicate_flag.load(Ordering::SeqCst)
            }))
            .build()
            .unwrap();

        let (calls, listener) = counter();
        let _sub = store.subscribe_setting("Iframe_Enabled", listener);
        assert!(!store.get("Iframe_Enabled").unwrap().disabled);

        flag.store(true, Ordering::SeqCst);
        store.refresh_relevance();

        assert!(store.get("Iframe_Enabled").unwrap().disabled);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listener_write_back_is_queued() {
        let store = store();
        let order = Arc::new(Mutex::new(Vec::new()));

        let inner_store = store.clone();
        let recorded = order.clone();
        let _first = store.subscribe_setting(
            "Site_Name",
            Arc::new(FnListener::new(move |_value: Option<&EditableSetting>| {
                recorded.lock().push("Site_Name");
                inner_store.dispatch_to_editable_settings(vec![
                    SettingPatch::new("Site_Url").with_value(json!("https://strata.example")),
                ]);
            })),
        );
        let recorded = order.clone();
        let _second = store.subscribe_setting(
            "Site_Url",
            Arc::new(FnListener::new(move |_value: Option<&EditableSetting>| {
                recorded.lock().push("Site_Url");
            })),
        );

        store.dispatch_to_editable_settings(vec![
            SettingPatch::new("Site_Name").with_value(json!("Renamed")),
        ]);

        assert_eq!(*order.lock(), vec!["Site_Name", "Site_Url"]);
        assert!(store.get("Site_Url").unwrap().changed);
    }

    #[test]
    fn test_listener_detached_mid_write_is_not_called() {
        let store = store();
        let (url_calls, url_listener) = counter::<EditableSetting>();
        let url_sub = Arc::new(Mutex::new(Some(
            store.subscribe_setting("Site_Url", url_listener),
        )));

        let detach = url_sub.clone();
        let _name_sub = store.subscribe_setting(
            "Site_Name",
            Arc::new(FnListener::new(move |_value: Option<&EditableSetting>| {
                detach.lock().take();
            })),
        );

        // Site_Name is delivered first and drops the Site_Url subscription
        // before its queued delivery runs.
        let applied = store.dispatch_to_editable_settings(vec![
            SettingPatch::new("Site_Name").with_value(json!("Renamed")),
            SettingPatch::new("Site_Url").with_value(json!("https://strata.example")),
        ]);

        assert_eq!(applied, 2);
        assert!(url_sub.lock().is_none());
        assert_eq!(url_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_patch_matching_persisted_is_not_counted() {
        let store = store();
        let (calls, listener) = counter::<EditableSetting>();
        let _sub = store.subscribe_setting("Site_Name", listener);

        let applied = store.dispatch_to_editable_settings(vec![
            SettingPatch::new("Site_Name").with_value(json!("Strata")),
        ]);

        assert_eq!(applied, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
