//! Store configuration
//!
//! Values come from the built-in defaults, optionally overridden by a config
//! file and then by `STRATA_*` environment variables.

use std::path::Path;
use std::time::Duration;

use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use strata_common::{DEFAULT_DEBOUNCE_MS, DEFAULT_LANGUAGE, LANGUAGE_SETTING_ID};

use crate::error::Result;

const ENV_PREFIX: &str = "STRATA";

/// Settings store configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Debounce window of per-setting edits in milliseconds
    pub debounce_ms: u64,
    /// Setting whose successful save triggers a locale reload
    pub language_setting_id: String,
    /// Language loaded when neither the session nor the saved value names one
    pub default_language: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            language_setting_id: LANGUAGE_SETTING_ID.to_string(),
            default_language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration, layering `path` (when given) and the environment
    /// over the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let config = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    pub fn with_language_setting_id(mut self, id: &str) -> Self {
        self.language_setting_id = id.to_string();
        self
    }

    pub fn with_default_language(mut self, tag: &str) -> Self {
        self.default_language = tag.to_string();
        self
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
