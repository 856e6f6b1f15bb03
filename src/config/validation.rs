use crate::config::types::{Config, GraphConfig, OutputConfig, SearchConfig};
use crate::ConfigError;
use chrono::{DateTime, Utc};
use url::Url;

/// Accepted textual form of a post-time bound besides a unix timestamp
const TIME_BOUND_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Validates everything the graph crawl needs
pub fn validate_crawl(config: &Config) -> Result<(), ConfigError> {
    validate_graph_config(&config.graph)?;
    validate_output_config(&config.output)?;

    if config.crawl.target.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawl target (id or username) cannot be empty".to_string(),
        ));
    }

    if config.crawl.post_count < 1 {
        return Err(ConfigError::Validation(format!(
            "post_count must be >= 1, got {}",
            config.crawl.post_count
        )));
    }

    let app_id = config.credentials.app_id.as_deref().unwrap_or("");
    let app_secret = config.credentials.app_secret.as_deref().unwrap_or("");
    if app_id.is_empty() || app_secret.is_empty() {
        return Err(ConfigError::Validation(
            "graph API app id or app secret is missing".to_string(),
        ));
    }

    let since = config
        .crawl
        .since
        .as_deref()
        .map(parse_time_bound)
        .transpose()?;
    let until = config
        .crawl
        .until
        .as_deref()
        .map(parse_time_bound)
        .transpose()?;

    if let (Some(since), Some(until)) = (since, until) {
        if since > until {
            return Err(ConfigError::Validation(format!(
                "published-since ({}) is after published-until ({})",
                since, until
            )));
        }
    }

    Ok(())
}

/// Validates everything the search polling run needs
pub fn validate_search(config: &Config) -> Result<(), ConfigError> {
    validate_output_config(&config.output)?;
    // The search client borrows the graph request timeout
    validate_request_timeout(config.graph.request_timeout_secs)?;
    validate_search_config(&config.search)
}

/// Parses a post-time bound
///
/// Accepts either a unix timestamp (`1490443200`) or a UTC offset time such as
/// `2017-03-25T12:00:00+0000`.
pub fn parse_time_bound(value: &str) -> Result<DateTime<Utc>, ConfigError> {
    let value = value.trim();

    if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
        let seconds: i64 = value
            .parse()
            .map_err(|_| ConfigError::InvalidTimeBound(value.to_string()))?;
        return DateTime::from_timestamp(seconds, 0)
            .ok_or_else(|| ConfigError::InvalidTimeBound(value.to_string()));
    }

    DateTime::parse_from_str(value, TIME_BOUND_FORMAT)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ConfigError::InvalidTimeBound(format!("'{}': {}", value, e)))
}

fn validate_graph_config(config: &GraphConfig) -> Result<(), ConfigError> {
    Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid graph base-url: {}", e)))?;

    if config.api_version.is_empty()
        || !config
            .api_version
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.')
    {
        return Err(ConfigError::Validation(format!(
            "api_version must look like '2.9', got '{}'",
            config.api_version
        )));
    }

    validate_request_timeout(config.request_timeout_secs)?;

    if config.page_limit < 1 || config.page_limit > 100 {
        return Err(ConfigError::Validation(format!(
            "page_limit must be between 1 and 100, got {}",
            config.page_limit
        )));
    }

    Ok(())
}

fn validate_request_timeout(secs: u64) -> Result<(), ConfigError> {
    if secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "data_dir cannot be empty".to_string(),
        ));
    }

    if config.shard_size_bytes == 0 {
        return Err(ConfigError::Validation(
            "shard_size_bytes must be > 0".to_string(),
        ));
    }

    if config.post_shard_size_bytes == Some(0) {
        return Err(ConfigError::Validation(
            "post_shard_size_bytes must be > 0".to_string(),
        ));
    }

    Ok(())
}

fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid search base-url: {}", e)))?;

    if config.query.trim().is_empty() {
        return Err(ConfigError::Validation(
            "search query cannot be empty".to_string(),
        ));
    }

    if config.count < 1 {
        return Err(ConfigError::Validation(
            "search count must be >= 1".to_string(),
        ));
    }

    if config.max_polls < 1 {
        return Err(ConfigError::Validation(
            "max_polls must be >= 1".to_string(),
        ));
    }

    Ok(())
}
