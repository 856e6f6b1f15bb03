use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Social-Harvest
///
/// Every section is optional in the TOML file; command line flags and
/// environment variables are layered on top by the binary.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub graph: GraphConfig,
    pub crawl: CrawlConfig,
    pub credentials: Credentials,
    pub output: OutputConfig,
    pub search: SearchConfig,
}

/// Remote graph API connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Root URL of the graph API
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Version prefixed to endpoints that do not carry one (e.g. "2.9")
    #[serde(rename = "api-version")]
    pub api_version: String,

    /// Socket timeout for every request (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Page size hint sent as `limit`
    #[serde(rename = "page-limit")]
    pub page_limit: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: "https://graph.facebook.com/".to_string(),
            api_version: "2.9".to_string(),
            request_timeout_secs: 125,
            page_limit: crate::crawler::DEFAULT_PAGE_LIMIT,
        }
    }
}

/// What to harvest from the graph API
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Id or username of the crawled account
    pub target: String,

    /// Stop after this many posts
    #[serde(rename = "post-count")]
    pub post_count: u64,

    /// Only posts published after this time (unix timestamp or `%Y-%m-%dT%H:%M:%S%z`)
    pub since: Option<String>,

    /// Only posts published before this time
    pub until: Option<String>,

    /// Also download the profiles of every interacting user
    #[serde(rename = "with-users")]
    pub with_users: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            post_count: 1000,
            since: None,
            until: None,
            with_users: false,
        }
    }
}

/// Application credentials exchanged for a bearer token
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
    #[serde(rename = "app-id")]
    pub app_id: Option<String>,

    #[serde(rename = "app-secret")]
    pub app_secret: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root directory for shard files
    #[serde(rename = "data-dir")]
    pub data_dir: PathBuf,

    /// Approximate size of one shard file (bytes)
    #[serde(rename = "shard-size-bytes")]
    pub shard_size_bytes: u64,

    /// Shard size used for post files only; falls back to `shard-size-bytes`
    #[serde(rename = "post-shard-size-bytes")]
    pub post_shard_size_bytes: Option<u64>,

    /// Write a markdown run report next to the shards
    pub summary: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("../data"),
            shard_size_bytes: 20 * 1024 * 1024,
            post_shard_size_bytes: None,
            summary: false,
        }
    }
}

impl OutputConfig {
    /// Shard threshold for post files
    pub fn post_threshold(&self) -> u64 {
        self.post_shard_size_bytes.unwrap_or(self.shard_size_bytes)
    }
}

/// Time-boxed search polling configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Full URL of the search endpoint
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Raw search string (URL-encoded when sent)
    pub query: String,

    pub lang: String,

    #[serde(rename = "result-type")]
    pub result_type: String,

    /// Results requested per poll
    pub count: u32,

    /// Wall-clock budget for the whole polling run (minutes)
    #[serde(rename = "duration-minutes")]
    pub duration_minutes: u64,

    /// Budget in seconds, overrides `duration-minutes` when set
    #[serde(rename = "duration-secs")]
    pub duration_secs: Option<u64>,

    /// Pause between two polls (milliseconds)
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,

    /// Hard cap on the number of polls
    #[serde(rename = "max-polls")]
    pub max_polls: u64,

    /// Bearer token attached to every search request
    #[serde(rename = "bearer-token")]
    pub bearer_token: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.twitter.com/1.1/search/tweets.json".to_string(),
            query: "article OR security OR IT OR technology filter:links".to_string(),
            lang: "en".to_string(),
            result_type: "recent".to_string(),
            count: 100,
            duration_minutes: 120,
            duration_secs: None,
            poll_interval_ms: 1000,
            max_polls: 360_000,
            bearer_token: None,
        }
    }
}

impl SearchConfig {
    /// Wall-clock budget of a polling run, saturating on huge values
    pub fn time_budget(&self) -> Duration {
        let secs = self
            .duration_secs
            .unwrap_or_else(|| self.duration_minutes.saturating_mul(60));
        Duration::from_secs(secs)
    }
}
