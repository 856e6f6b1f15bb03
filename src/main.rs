//! Social-Harvest main entry point
//!
//! This is the command-line interface for the Social-Harvest activity harvester.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use social_harvest::config::{load_config_with_hash, validate_crawl, validate_search, Config};
use social_harvest::crawler::{CrawlDriver, SearchPoller};
use social_harvest::output::print_summary;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Social-Harvest: a social network activity harvester
///
/// Social-Harvest pages through an account's posts, collects the comments,
/// likes and shares of every post and writes them as size-bounded JSON shard
/// files ready for bulk loading.
#[derive(Parser, Debug)]
#[command(name = "social-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A social network activity harvester", long_about = None)]
struct Cli {
    /// Path to an optional TOML configuration file
    #[arg(short, long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Harvest the posts of a graph API account and their interactions
    Facebook(FacebookArgs),

    /// Poll the search API for shared links for a limited time
    Search(SearchArgs),
}

#[derive(Args, Debug)]
struct FacebookArgs {
    /// Id or username of the account to harvest
    #[arg(value_name = "USER")]
    user: String,

    /// Maximum number of posts to harvest [default: 1000]
    #[arg(short = 'p', long)]
    post_count: Option<u64>,

    /// Only posts published after this time (unix timestamp or 2017-03-25T12:00:00+0000)
    #[arg(short = 's', long = "published-since")]
    since: Option<String>,

    /// Only posts published before this time
    #[arg(short = 'u', long = "published-until")]
    until: Option<String>,

    /// Application id
    #[arg(long, env = "FACEBOOK_APP_ID")]
    app_id: Option<String>,

    /// Application secret
    #[arg(long, env = "FACEBOOK_APP_SECRET", hide_env_values = true)]
    app_secret: Option<String>,

    /// Also download the profile of every interacting user
    #[arg(long)]
    with_users: bool,

    /// Root directory for shard files
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

impl FacebookArgs {
    fn apply(self, config: &mut Config) {
        config.crawl.target = self.user;
        if let Some(post_count) = self.post_count {
            config.crawl.post_count = post_count;
        }
        if self.since.is_some() {
            config.crawl.since = self.since;
        }
        if self.until.is_some() {
            config.crawl.until = self.until;
        }
        if self.app_id.is_some() {
            config.credentials.app_id = self.app_id;
        }
        if self.app_secret.is_some() {
            config.credentials.app_secret = self.app_secret;
        }
        config.crawl.with_users |= self.with_users;
        if let Some(data_dir) = self.data_dir {
            config.output.data_dir = data_dir;
        }
    }
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Search string, URL-encoded when sent
    #[arg(long)]
    query: Option<String>,

    /// How long to keep polling [default: 120]
    #[arg(long)]
    duration_minutes: Option<u64>,

    /// Bearer token of the search API
    #[arg(long, env = "SEARCH_BEARER_TOKEN", hide_env_values = true)]
    bearer_token: Option<String>,

    /// Directory the collected links are written to
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

impl SearchArgs {
    fn apply(self, config: &mut Config) {
        if let Some(query) = self.query {
            config.search.query = query;
        }
        if let Some(duration) = self.duration_minutes {
            config.search.duration_minutes = duration;
        }
        if self.bearer_token.is_some() {
            config.search.bearer_token = self.bearer_token;
        }
        if let Some(data_dir) = self.data_dir {
            config.output.data_dir = data_dir;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) = load_configuration(cli.config.as_deref())?;

    match cli.command {
        Command::Facebook(args) => {
            args.apply(&mut config);
            handle_crawl(config, config_hash).await
        }
        Command::Search(args) => {
            args.apply(&mut config);
            handle_search(config).await
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("social_harvest=info,warn"),
            1 => EnvFilter::new("social_harvest=debug,info"),
            2 => EnvFilter::new("social_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file if one was given, defaults otherwise
fn load_configuration(path: Option<&Path>) -> anyhow::Result<(Config, Option<String>)> {
    let Some(path) = path else {
        return Ok((Config::default(), None));
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    Ok((config, Some(hash)))
}

/// Handles the graph crawl
async fn handle_crawl(config: Config, config_hash: Option<String>) -> anyhow::Result<()> {
    validate_crawl(&config).context("Invalid configuration")?;

    tracing::info!(
        "Harvesting up to {} posts of '{}' into {}",
        config.crawl.post_count,
        config.crawl.target,
        config.output.data_dir.display()
    );

    let mut driver = CrawlDriver::new(config)?;
    if let Some(hash) = config_hash {
        driver = driver.with_config_hash(hash);
    }

    // Dropping the run on Ctrl-C flushes every pending shard buffer
    let summary = tokio::select! {
        result = driver.run() => result.context("Crawl failed")?,
        _ = tokio::signal::ctrl_c() => {
            anyhow::bail!("Crawl interrupted, pending records were flushed");
        }
    };

    print_summary(&summary);
    Ok(())
}

/// Handles the search polling mode
async fn handle_search(config: Config) -> anyhow::Result<()> {
    validate_search(&config).context("Invalid configuration")?;

    tracing::info!(
        "Polling '{}' for {:?}",
        config.search.query,
        config.search.time_budget()
    );

    let mut poller = SearchPoller::new(&config)?;
    let summary = tokio::select! {
        result = poller.run() => result.context("Search polling failed")?,
        _ = tokio::signal::ctrl_c() => {
            anyhow::bail!("Polling interrupted, collected links were flushed");
        }
    };

    println!();
    println!("Started at {}", summary.started_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Finished at {}", summary.finished_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Polls: {}", summary.polls);
    println!(
        "Links collected: {} ({} duplicates dropped)",
        summary.collected, summary.duplicates
    );
    if let Some(path) = &summary.shard_file {
        println!("Saved to {}", path.display());
    }

    Ok(())
}
