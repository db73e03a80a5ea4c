//! Error types for the Strata settings store

/// Error type for settings store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("dispatch failed: batch_id={batch_id}, reason={reason}")]
    DispatchFailed { batch_id: String, reason: String },

    #[error("not authorized to edit settings")]
    Unauthorized,

    #[error("session not ready")]
    NotReady,

    #[error("config error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
