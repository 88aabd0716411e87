//! Furlong: an incremental race-result crawler
//!
//! This crate discovers the races held on each of the last N days, fetches
//! the result table of every race it has not saved before, and persists each
//! non-empty result exactly once.

pub mod config;
pub mod crawler;
pub mod output;
pub mod race;
pub mod storage;

use thiserror::Error;

/// Main error type for Furlong operations
#[derive(Debug, Error)]
pub enum FurlongError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Failures talking to or reading the remote race source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Unexpected result table layout for race {race_id}: row {row} has {found} cells, expected at least {expected}")]
    Layout {
        race_id: String,
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),
}

/// Result type alias for Furlong operations
pub type Result<T> = std::result::Result<T, FurlongError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use race::{DateKey, ParticipantResult, RaceId, RaceRecord};
