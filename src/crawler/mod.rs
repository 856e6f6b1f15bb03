//! Crawler module for harvesting the graph API and the search API
//!
//! This module contains the core ingestion logic, including:
//! - The HTTP client and the app credential exchange
//! - Cursor-following pagination over one remote resource
//! - Fan-out from a post to its comments, likes and shares
//! - The crawl driver state machine
//! - The time-boxed search poller

mod client;
mod coordinator;
mod credential;
mod cursor;
mod fanout;
mod poller;

pub use client::{build_http_client, has_version_prefix, query_params, GraphClient, QueryParams};
pub use coordinator::{run_crawl, CrawlDriver, Target};
pub use credential::{parse_token_response, CredentialProvider};
pub use cursor::{CursorOutcome, PageCursor, PageStep, DEFAULT_PAGE_LIMIT};
pub use fanout::{
    project, FanoutParams, InteractionContext, InteractionStream, ResourceFanout,
    COMMENT_FIELDS, POST_FIELDS, SHARE_FIELDS,
};
pub use poller::{PollSummary, SearchPoller};

use crate::config::Config;
use crate::output::CrawlSummary;
use crate::Result;

/// Runs a complete graph crawl
///
/// This is the main entry point for a crawl. It will:
/// 1. Exchange the app credentials for an access token
/// 2. Resolve the target and save its page info
/// 3. Page through the target's posts
/// 4. Fan out to the interactions of every post
/// 5. Flush every shard buffer and report the run
///
/// # Arguments
///
/// * `config` - The harvester configuration
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl completed successfully
/// * `Err(HarvestError)` - Crawl failed after flushing what it collected
pub async fn crawl(config: Config) -> Result<CrawlSummary> {
    run_crawl(config).await
}

