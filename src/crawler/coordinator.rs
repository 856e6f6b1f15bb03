//! Crawl driver - main harvesting orchestration logic
//!
//! This module contains the crawl loop that ties every other part together:
//! - Exchanging the app credentials for an access token
//! - Resolving the crawl target and saving its page info
//! - Paging through the target's posts
//! - Fanning out to the comments, likes and shares of each post
//! - Draining every shard buffer before the run ends, on success or error
//!
//! Requests are awaited one after another; nothing in a run is concurrent.

use crate::config::{parse_time_bound, Config};
use crate::crawler::client::{query_params, GraphClient, QueryParams};
use crate::crawler::credential::CredentialProvider;
use crate::crawler::cursor::{CursorOutcome, PageCursor};
use crate::crawler::fanout::{FanoutParams, ResourceFanout, POST_FIELDS};
use crate::output::{
    ensure_data_dir, generate_markdown_summary, write_shard, CrawlStats, CrawlSummary,
    RecordKind, RunOutcome, ShardBuffer, ShardResult,
};
use crate::records::raw::{RawPost, RawProfile};
use crate::records::{
    ApiErrorBody, AuthorPage, Interaction, Post, UserProfile, GRAPH_ORIGIN, PAGE_FIELDS,
    USER_FIELDS,
};
use crate::state::CrawlState;
use crate::url::profile_name_from_link;
use crate::{HarvestError, Result};
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Progress is logged every this many posts
const PROGRESS_INTERVAL: u64 = 10;

/// The resolved crawl target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: String,
    /// Profile name derived from the profile link, the id when there is none
    pub profile_name: String,
    /// Directory every shard of the run is written to
    pub dir: PathBuf,
}

/// Every buffer a run writes through
///
/// The sink outlives the crawl loop, so the driver can drain it whatever
/// way the loop ended.
struct RunSink {
    posts: ShardBuffer<Post>,
    interactions: ShardBuffer<Interaction>,
    users: ShardBuffer<UserProfile>,
    /// Files written directly, outside any buffer
    extra_files: Vec<PathBuf>,
}

impl RunSink {
    fn new(dir: &Path, config: &Config) -> Self {
        let threshold = config.output.shard_size_bytes;

        Self {
            posts: ShardBuffer::new(RecordKind::Post, dir, config.output.post_threshold()),
            interactions: ShardBuffer::new(RecordKind::Interaction, dir, threshold),
            users: ShardBuffer::new(RecordKind::User, dir, threshold),
            extra_files: Vec::new(),
        }
    }

    /// Flushes every buffer, returning the first failure
    ///
    /// A failing buffer does not stop the others from being flushed.
    fn drain(&mut self) -> ShardResult<()> {
        let results = [
            self.posts.flush(),
            self.interactions.flush(),
            self.users.flush(),
        ];

        let mut first_error = None;
        for result in results {
            if let Err(e) = result {
                tracing::error!("Failed to flush shard buffer: {}", e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn shard_files(&self) -> Vec<PathBuf> {
        self.extra_files
            .iter()
            .chain(self.posts.written())
            .chain(self.interactions.written())
            .chain(self.users.written())
            .cloned()
            .collect()
    }
}

/// Drives one harvesting run through its state machine
///
/// `Init -> FetchingPosts -> {FanningOut -> FetchingPosts} -> Draining -> Done`,
/// with `Aborting` reachable from any active state. Whatever was collected is
/// flushed in `Draining` before an error is handed back to the caller.
pub struct CrawlDriver {
    config: Config,
    client: GraphClient,
    state: CrawlState,
    stats: CrawlStats,
    config_hash: Option<String>,
}

impl CrawlDriver {
    /// Creates a new driver instance
    ///
    /// # Arguments
    ///
    /// * `config` - Validated harvester configuration
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlDriver)` - Driver ready to run
    /// * `Err(HarvestError)` - The HTTP client could not be built
    pub fn new(config: Config) -> Result<Self> {
        let client = GraphClient::new(&config.graph)?;

        Ok(Self {
            config,
            client,
            state: CrawlState::Init,
            stats: CrawlStats::default(),
            config_hash: None,
        })
    }

    /// Records the hash of the config file the run was started with
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    pub fn stats(&self) -> &CrawlStats {
        &self.stats
    }

    /// Moves the driver to `to`, rejecting transitions the state machine forbids
    pub fn transition(&mut self, to: CrawlState) -> Result<()> {
        if !self.state.can_transition_to(to) {
            return Err(HarvestError::InvalidTransition {
                from: self.state,
                to,
            });
        }

        tracing::debug!("Crawl state {} -> {}", self.state, to);
        self.state = to;
        Ok(())
    }

    /// Runs the crawl to completion
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSummary)` - The post listing was exhausted or the post limit reached
    /// * `Err(HarvestError)` - The run failed; everything collected up to the
    ///   failure has been written to shard files
    pub async fn run(&mut self) -> Result<CrawlSummary> {
        let started_at = Utc::now();
        tracing::info!("Starting crawl of '{}'", self.config.crawl.target);

        let target = match self.init().await {
            Ok(target) => target,
            Err(e) => {
                self.abort(&e);
                self.transition(CrawlState::Draining)?;
                self.transition(CrawlState::Done)?;
                return Err(e);
            }
        };

        let mut sink = RunSink::new(&target.dir, &self.config);
        let result = self.harvest(&target, &mut sink).await;
        let outcome = match &result {
            Ok(outcome) => outcome.clone(),
            Err(e) => {
                self.abort(e);
                RunOutcome::Aborted(e.to_string())
            }
        };

        self.transition(CrawlState::Draining)?;
        let drained = sink.drain();
        self.transition(CrawlState::Done)?;

        let summary = CrawlSummary {
            target_id: target.id.clone(),
            target_name: target.profile_name.clone(),
            started_at,
            finished_at: Utc::now(),
            outcome,
            stats: self.stats.clone(),
            post_limit: self.config.crawl.post_count,
            shard_files: sink.shard_files(),
            config_hash: self.config_hash.clone(),
        };
        self.log_summary(&summary);

        if self.config.output.summary {
            self.write_report(&summary, &target.dir);
        }

        result?;
        drained?;
        Ok(summary)
    }

    fn abort(&mut self, error: &HarvestError) {
        tracing::error!("Crawl aborted: {}", error);
        if let Err(e) = self.transition(CrawlState::Aborting) {
            tracing::warn!("{}", e);
        }
    }

    /// The `Init` state: credential exchange and target resolution
    async fn init(&mut self) -> Result<Target> {
        self.authenticate().await?;
        self.resolve_target().await
    }

    async fn authenticate(&mut self) -> Result<()> {
        let provider = {
            let credentials = &self.config.credentials;
            let app_id = credentials
                .app_id
                .as_deref()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| HarvestError::Credential("app id is missing".to_string()))?;
            let app_secret = credentials
                .app_secret
                .as_deref()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| HarvestError::Credential("app secret is missing".to_string()))?;

            CredentialProvider::new(app_id, app_secret)
        };

        let token = provider.acquire(&self.client).await?;
        self.client.set_access_token(token);
        Ok(())
    }

    /// Resolves the configured id or username into an id and a profile name
    pub async fn resolve_target(&self) -> Result<Target> {
        let requested = self.config.crawl.target.trim();

        let lookup = self
            .client
            .get_json(requested, &query_params(&[("fields", "id")]))
            .await?;
        if let Some(error) = api_error(&lookup) {
            return Err(HarvestError::Api {
                endpoint: requested.to_string(),
                error,
            });
        }
        let id = lookup
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| HarvestError::UnknownTarget(requested.to_string()))?
            .to_string();

        let profile = self
            .client
            .get_json(&id, &query_params(&[("fields", "id,name,link")]))
            .await?;
        let profile: RawProfile =
            serde_json::from_value(profile).map_err(|e| HarvestError::MalformedResponse {
                url: id.clone(),
                message: e.to_string(),
            })?;

        let profile_name = profile
            .link
            .as_deref()
            .and_then(profile_name_from_link)
            .unwrap_or_else(|| id.clone());

        tracing::info!(
            "Resolved '{}' to id {} ({})",
            requested,
            id,
            profile.name.as_deref().unwrap_or(&profile_name)
        );

        let dir = self
            .config
            .output
            .data_dir
            .join(GRAPH_ORIGIN)
            .join(format!("user_{}", profile_name));

        Ok(Target {
            id,
            profile_name,
            dir,
        })
    }

    /// Saves the target's own page once per run
    ///
    /// An API error here only costs the page info; the crawl goes on.
    async fn save_page_info(&self, target: &Target) -> Result<Option<PathBuf>> {
        let fields = PAGE_FIELDS.join(",");
        let response = self
            .client
            .get_json(&target.id, &query_params(&[("fields", fields.as_str())]))
            .await?;

        if let Some(error) = api_error(&response) {
            tracing::warn!("Skipping page info of {}: {}", target.id, error);
            return Ok(None);
        }

        match AuthorPage::from_value(response, GRAPH_ORIGIN, &target.profile_name) {
            Some(page) => {
                let path = write_shard(&target.dir, RecordKind::PageInfo.prefix(), &page)?;
                tracing::info!("Saved page info to {}", path.display());
                Ok(Some(path))
            }
            None => {
                tracing::warn!("Page info of {} has no id, skipping", target.id);
                Ok(None)
            }
        }
    }

    /// Query parameters of the post listing
    pub fn post_params(&self) -> Result<QueryParams> {
        let mut params = query_params(&[("fields", POST_FIELDS)]);

        if let Some(since) = &self.config.crawl.since {
            let since = parse_time_bound(since)?;
            params.push(("since".to_string(), since.timestamp().to_string()));
        }
        if let Some(until) = &self.config.crawl.until {
            let until = parse_time_bound(until)?;
            params.push(("until".to_string(), until.timestamp().to_string()));
        }

        Ok(params)
    }

    /// The `FetchingPosts` / `FanningOut` loop
    async fn harvest(&mut self, target: &Target, sink: &mut RunSink) -> Result<RunOutcome> {
        if let Some(page_info) = self.save_page_info(target).await? {
            sink.extra_files.push(page_info);
        }

        self.transition(CrawlState::FetchingPosts)?;

        let page_limit = self.config.graph.page_limit;
        let mut posts = PageCursor::new(
            self.client.clone(),
            format!("{}/posts", target.id),
            self.post_params()?,
            page_limit,
        );
        let fanout = ResourceFanout::new(
            self.client.clone(),
            FanoutParams::default(),
            target.id.as_str(),
            GRAPH_ORIGIN,
            page_limit,
        );

        let mut authors = BTreeSet::new();
        let mut outcome = RunOutcome::Completed;

        while let Some(raw) = posts.next().await? {
            self.transition(CrawlState::FanningOut)?;
            self.fan_out(raw, target, &fanout, sink, &mut authors).await?;

            if self.stats.posts >= self.config.crawl.post_count {
                tracing::info!("Post limit of {} reached", self.config.crawl.post_count);
                outcome = RunOutcome::PostLimitReached;
                break;
            }

            if self.stats.posts > 0 && self.stats.posts % PROGRESS_INTERVAL == 0 {
                tracing::info!(
                    "Progress: {} posts, {} interactions",
                    self.stats.posts,
                    self.stats.interactions()
                );
            }

            self.transition(CrawlState::FetchingPosts)?;
        }

        if let Some(CursorOutcome::Truncated(error)) = posts.outcome() {
            return Err(HarvestError::Api {
                endpoint: posts.endpoint().to_string(),
                error: error.clone(),
            });
        }

        if self.config.crawl.with_users {
            self.fetch_users(&authors, sink).await?;
        }

        Ok(outcome)
    }

    /// Appends one post and every interaction attached to it
    async fn fan_out(
        &mut self,
        raw: Value,
        target: &Target,
        fanout: &ResourceFanout,
        sink: &mut RunSink,
        authors: &mut BTreeSet<String>,
    ) -> Result<()> {
        let raw: RawPost = match serde_json::from_value(raw) {
            Ok(raw) => raw,
            Err(e) => {
                self.stats.skipped += 1;
                tracing::warn!("Skipping malformed post: {}", e);
                return Ok(());
            }
        };

        let post = Post::from_raw(raw, &target.id, GRAPH_ORIGIN);
        let post_id = post.id.clone();
        sink.posts.append(post)?;
        self.stats.posts += 1;

        for mut stream in fanout.for_post(&post_id) {
            while let Some(interaction) = stream.next().await? {
                self.stats.record_interaction(interaction.kind);
                if self.config.crawl.with_users {
                    authors.insert(interaction.author.clone());
                }
                sink.interactions.append(interaction)?;
            }

            self.stats.skipped += stream.skipped();
            if let Some(CursorOutcome::Truncated(error)) = stream.outcome() {
                self.stats.truncated += 1;
                tracing::warn!(
                    "{} of post {} truncated by API error: {}",
                    stream.endpoint(),
                    post_id,
                    error
                );
            }
        }

        Ok(())
    }

    /// Downloads the profile of every distinct interacting user
    async fn fetch_users(&mut self, authors: &BTreeSet<String>, sink: &mut RunSink) -> Result<()> {
        tracing::info!("Fetching {} interacting users", authors.len());
        let fields = USER_FIELDS.join(",");
        let params = query_params(&[("fields", fields.as_str())]);

        for author in authors {
            let response = self.client.get_json(author, &params).await?;
            if let Some(error) = api_error(&response) {
                self.stats.skipped += 1;
                tracing::warn!("Skipping user {}: {}", author, error);
                continue;
            }

            match UserProfile::from_value(response, GRAPH_ORIGIN) {
                Some(user) => {
                    sink.users.append(user)?;
                    self.stats.users += 1;
                }
                None => {
                    self.stats.skipped += 1;
                    tracing::warn!("User {} returned no id, skipping", author);
                }
            }
        }

        Ok(())
    }

    fn log_summary(&self, summary: &CrawlSummary) {
        let stats = &summary.stats;
        tracing::info!(
            "Crawl of {} {} in {}s: {} posts, {} interactions ({} likes, {} comments, {} shares)",
            summary.target_name,
            summary.outcome.describe(),
            summary.duration_seconds(),
            stats.posts,
            stats.interactions(),
            stats.likes,
            stats.comments,
            stats.shares
        );
        if stats.truncated > 0 {
            tracing::warn!(
                "{} sub-resources were truncated by API errors, their listings may be incomplete",
                stats.truncated
            );
        }
        tracing::info!("{} shard files written", summary.shard_files.len());
    }

    fn write_report(&self, summary: &CrawlSummary, dir: &Path) {
        let written = ensure_data_dir(dir).and_then(|_| generate_markdown_summary(summary, dir));
        match written {
            Ok(path) => tracing::info!("Run report written to {}", path.display()),
            Err(e) => tracing::warn!("Failed to write run report: {}", e),
        }
    }
}

/// Returns the error object of a response, if it carries one
fn api_error(value: &Value) -> Option<ApiErrorBody> {
    value
        .get("error")
        .and_then(|error| serde_json::from_value(error.clone()).ok())
}

/// Runs a complete crawl with the given configuration
///
/// # Example
///
/// ```no_run
/// use social_harvest::config::load_config;
/// use social_harvest::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let summary = run_crawl(config).await?;
/// println!("{} posts", summary.stats.posts);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlSummary> {
    let mut driver = CrawlDriver::new(config)?;
    driver.run().await
}
