//! Run counters and the end-of-run summary
//!
//! The driver keeps a [`CrawlStats`] value while it runs and turns it into a
//! [`CrawlSummary`] once every buffer has been drained.

use crate::records::InteractionKind;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Counters maintained by the crawl driver
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub posts: u64,
    pub comments: u64,
    pub likes: u64,
    pub shares: u64,

    /// Interacting user profiles downloaded
    pub users: u64,

    /// Raw items rejected at the response boundary
    pub skipped: u64,

    /// Sub-resources whose pagination ended on an API error
    pub truncated: u64,
}

impl CrawlStats {
    pub fn record_interaction(&mut self, kind: InteractionKind) {
        match kind {
            InteractionKind::Like => self.likes += 1,
            InteractionKind::Comment => self.comments += 1,
            InteractionKind::Share => self.shares += 1,
        }
    }

    pub fn interactions(&self) -> u64 {
        self.likes + self.comments + self.shares
    }

    pub fn count_of(&self, kind: InteractionKind) -> u64 {
        match kind {
            InteractionKind::Like => self.likes,
            InteractionKind::Comment => self.comments,
            InteractionKind::Share => self.shares,
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The post listing was exhausted
    Completed,
    /// The configured post count was reached
    PostLimitReached,
    /// An error stopped the run after everything was drained
    Aborted(String),
}

impl RunOutcome {
    pub fn describe(&self) -> String {
        match self {
            Self::Completed => "completed".to_string(),
            Self::PostLimitReached => "stopped at post limit".to_string(),
            Self::Aborted(reason) => format!("aborted: {}", reason),
        }
    }
}

/// Everything reported once a run is done
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub target_id: String,
    pub target_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: RunOutcome,
    pub stats: CrawlStats,
    pub post_limit: u64,
    pub shard_files: Vec<PathBuf>,
    pub config_hash: Option<String>,
}

impl CrawlSummary {
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

/// Prints the run summary to stdout
pub fn print_summary(summary: &CrawlSummary) {
    let stats = &summary.stats;

    println!();
    println!("Started at {}", summary.started_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Finished at {}", summary.finished_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Outcome: {}", summary.outcome.describe());
    println!();
    println!("Total post count: {}", stats.posts);
    println!(
        "Total interaction count: {} ({} likes, {} comments, {} shares)",
        stats.interactions(),
        stats.likes,
        stats.comments,
        stats.shares
    );

    if stats.users > 0 {
        println!("Interacting users downloaded: {}", stats.users);
    }
    if stats.truncated > 0 {
        println!(
            "Truncated sub-resources (API error mid-pagination): {}",
            stats.truncated
        );
    }
    if stats.skipped > 0 {
        println!("Skipped malformed items: {}", stats.skipped);
    }

    println!("Shard files written: {}", summary.shard_files.len());
}
