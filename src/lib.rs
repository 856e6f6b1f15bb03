//! Social-Harvest: a social network activity harvester
//!
//! This crate pages through a social network account's posts, fans out to the
//! comments, likes and shares attached to each post, normalizes them into one
//! interaction record shape and persists everything as size-bounded JSON shard
//! files ready for bulk loading into a search store.

pub mod config;
pub mod crawler;
pub mod output;
pub mod records;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Social-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("API error from {endpoint}: {error}")]
    Api {
        endpoint: String,
        error: records::ApiErrorBody,
    },

    #[error("Malformed response from {url}: {message}")]
    MalformedResponse { url: String, message: String },

    #[error("Credential exchange failed: {0}")]
    Credential(String),

    #[error("Unable to resolve an id for target '{0}'")]
    UnknownTarget(String),

    #[error("Shard error: {0}")]
    Shard(#[from] output::ShardError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CrawlState,
        to: state::CrawlState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
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

    #[error("Invalid time bound: {0}")]
    InvalidTimeBound(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Social-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlDriver, SearchPoller};
pub use output::{RecordKind, ShardBuffer};
pub use records::{Interaction, InteractionKind, Post};
pub use state::CrawlState;
