//! Markdown run report
//!
//! Renders a [`CrawlSummary`] as a small markdown document written next to
//! the shard files of the run.

use crate::output::stats::CrawlSummary;
use crate::output::ShardError;
use crate::records::InteractionKind;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name of the report inside the run directory
pub const SUMMARY_FILE_NAME: &str = "run_summary.md";

/// Writes the markdown report for `summary` into `dir`
///
/// # Returns
///
/// * `Ok(PathBuf)` - Path of the written report
/// * `Err(ShardError)` - Failed to write the report
pub fn generate_markdown_summary(summary: &CrawlSummary, dir: &Path) -> Result<PathBuf, ShardError> {
    let markdown = format_markdown_summary(summary);
    let path = dir.join(SUMMARY_FILE_NAME);
    let io_err = |source| ShardError::Io {
        path: path.clone(),
        source,
    };

    let mut file = File::create(&path).map_err(io_err)?;
    file.write_all(markdown.as_bytes()).map_err(io_err)?;

    Ok(path)
}

/// Formats a run summary as markdown
pub fn format_markdown_summary(summary: &CrawlSummary) -> String {
    let stats = &summary.stats;
    let mut md = String::new();

    md.push_str("# Social-Harvest Run Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!(
        "- **Target**: {} (id: {})\n",
        summary.target_name, summary.target_id
    ));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", summary.finished_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {} seconds\n",
        summary.duration_seconds()
    ));
    md.push_str(&format!("- **Outcome**: {}\n", summary.outcome.describe()));
    if let Some(hash) = &summary.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    md.push_str("## Totals\n\n");
    md.push_str(&format!(
        "- **Posts**: {} (limit {})\n",
        stats.posts, summary.post_limit
    ));
    md.push_str(&format!("- **Interactions**: {}\n", stats.interactions()));
    md.push_str(&format!("- **Users**: {}\n\n", stats.users));

    md.push_str("| Interaction | Count |\n");
    md.push_str("|-------------|-------|\n");
    for kind in InteractionKind::fetch_order() {
        md.push_str(&format!("| {} | {} |\n", kind, stats.count_of(kind)));
    }
    md.push('\n');

    if stats.truncated > 0 || stats.skipped > 0 {
        md.push_str("## Warnings\n\n");
        if stats.truncated > 0 {
            md.push_str(&format!(
                "- {} sub-resource listings ended on an API error and may be incomplete\n",
                stats.truncated
            ));
        }
        if stats.skipped > 0 {
            md.push_str(&format!(
                "- {} malformed items were skipped\n",
                stats.skipped
            ));
        }
        md.push('\n');
    }

    if !summary.shard_files.is_empty() {
        md.push_str("## Shard Files\n\n");
        for path in &summary.shard_files {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            md.push_str(&format!("- {}\n", name));
        }
        md.push('\n');
    }

    md
}
