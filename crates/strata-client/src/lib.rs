//! Strata Client - Client-side reactive settings store
//!
//! This crate provides:
//! - An editable overlay over the persisted settings, with dirty tracking
//! - Memoized group and section aggregates
//! - Granular subscriptions per setting, group and section
//! - Dispatch of pending edits to a persistence collaborator
//! - Debounced per-setting actions and group/section bulk actions

pub mod actions;
pub mod config;
pub mod debounce;
pub mod dispatch;
pub mod error;
pub mod metrics;
pub mod model;
pub mod settings;

pub use model::*;

pub use actions::{GroupActions, SaveReport, SectionActions, SettingActions};
pub use config::StoreConfig;
pub use dispatch::DispatchCoordinator;
pub use error::{Result, StoreError};
pub use metrics::{StoreMetrics, Timer};
pub use settings::listener::{FnListener, SettingsListener, Subscription};
pub use settings::{SettingsStore, SettingsStoreBuilder};

// Collaborator contracts and persisted model
pub use strata_common::{
    DispatchOutcome, LocaleLoader, NotificationKind, Notifier, RelevancePredicate, SessionContext,
    SettingChange, SettingKind, SettingRecord, SettingsPersistence,
};
