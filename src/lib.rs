//! TMDb harvest: resumable media metadata collection
//!
//! This crate collects titles, credits, reviews, keywords, images, collections
//! and people from The Movie Database. It prefers the authenticated API and
//! fails over, once and for good, to scraping the public website when the API
//! stops answering. Progress is checkpointed so an interrupted run picks up
//! where it stopped.

pub mod config;
pub mod harvest;
pub mod media;
pub mod output;
pub mod records;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("{label} failed with HTTP {status}")]
    Status { label: String, status: u16 },

    #[error("Failed to decode response for {label}: {source}")]
    Decode {
        label: String,
        source: serde_json::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl HarvestError {
    /// True for failures of a remote source rather than of local state
    ///
    /// Only these may trigger the API to web failover.
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            Self::Http { .. }
                | Self::Status { .. }
                | Self::Decode { .. }
                | Self::Reqwest(_)
                | Self::UrlParse(_)
        )
    }
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

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use media::{CandidateItem, ContentType, DataSource, Query};
pub use records::OutputRecord;
pub use state::{Checkpoint, RunContext, RunMode};
