//! Output module for shard files and run reports
//!
//! This module handles:
//! - Size-bounded batching of records into numbered JSON shard files
//! - Run counters and the printed end-of-run summary
//! - The optional markdown run report

mod markdown;
pub mod shard;
pub mod stats;

pub use markdown::{format_markdown_summary, generate_markdown_summary, SUMMARY_FILE_NAME};
pub use shard::{
    ensure_data_dir, next_shard_path, write_shard, RecordKind, ShardBuffer, ShardError,
    ShardResult, INTERACTION_RECORD_SIZE, POST_RECORD_SIZE,
};
pub use stats::{print_summary, CrawlStats, CrawlSummary, RunOutcome};
