//! Configuration module for Social-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! The binary layers command line flags and environment variables on top of the
//! loaded file before validating.
//!
//! # Example
//!
//! ```no_run
//! use social_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Posts to fetch: {}", config.crawl.post_count);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlConfig, Credentials, GraphConfig, OutputConfig, SearchConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};

// Re-export validation entry points
pub use validation::{parse_time_bound, validate_crawl, validate_search};

/// Environment variable holding the graph application id
pub const APP_ID_ENV: &str = "FACEBOOK_APP_ID";

/// Environment variable holding the graph application secret
pub const APP_SECRET_ENV: &str = "FACEBOOK_APP_SECRET";

/// Environment variable holding the search API bearer token
pub const SEARCH_TOKEN_ENV: &str = "SEARCH_BEARER_TOKEN";
