//! Strata Common - Shared types and collaborator traits
//!
//! This crate provides the foundational types used across all Strata components:
//! - The persisted setting model and dispatch units
//! - Outcome codes handed to the notification collaborator
//! - Collaborator traits for dependency injection
//! - Common constants

pub mod error;
pub mod model;
pub mod traits;

// Re-exports for convenience
pub use error::ErrorCode;
pub use model::{DispatchOutcome, NotificationKind, SettingChange, SettingKind, SettingRecord};
pub use traits::*;

/// Language tag used when neither the session nor the saved value names one
pub const DEFAULT_LANGUAGE: &str = "en";

/// Identifier of the setting that holds the active interface language
pub const LANGUAGE_SETTING_ID: &str = "Language";

/// Default debounce window for per-setting edits, in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Section name used for settings that do not declare a section
pub const UNNAMED_SECTION: &str = "";

/// Normalize an optional section name, mapping `None` and `""` to the
/// implicit unnamed section.
pub fn section_or_unnamed(section: Option<&str>) -> &str {
    section.filter(|s| !s.is_empty()).unwrap_or(UNNAMED_SECTION)
}
