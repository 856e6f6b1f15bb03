//! Time-boxed incremental search polling
//!
//! The poller repeatedly queries a search endpoint for a bounded wall-clock
//! duration. After each poll the smallest status id seen so far is sent back
//! as `max_id`, walking the result set towards older statuses, and a seen-id
//! set drops the overlap between consecutive polls.
//!
//! Everything collected stays in one accumulator that is written once, when
//! the loop ends. Its memory grows with the polling window.

use crate::config::{Config, SearchConfig};
use crate::crawler::client::{build_http_client, query_params, QueryParams};
use crate::output::{RecordKind, ShardBuffer};
use crate::records::raw::{RawSearchResponse, RawStatus};
use crate::records::LinkRecord;
use crate::{HarvestError, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;

/// What a polling run produced
#[derive(Debug, Clone)]
pub struct PollSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub polls: u64,
    /// Distinct link records collected
    pub collected: usize,
    /// Records dropped because their id was already seen
    pub duplicates: u64,
    pub min_seen_id: Option<u64>,
    pub shard_file: Option<PathBuf>,
}

/// Polls a search endpoint until its time budget is spent
pub struct SearchPoller {
    config: SearchConfig,
    http: Client,
    accumulator: ShardBuffer<LinkRecord>,
    seen: HashSet<String>,
    min_seen_id: Option<u64>,
    polls: u64,
    duplicates: u64,
}

impl SearchPoller {
    /// Creates a poller writing into `config.output.data_dir`
    ///
    /// # Returns
    ///
    /// * `Ok(SearchPoller)` - Poller ready to run
    /// * `Err(HarvestError)` - The HTTP client could not be built
    pub fn new(config: &Config) -> Result<Self> {
        let http = build_http_client(Duration::from_secs(config.graph.request_timeout_secs))?;

        Ok(Self {
            config: config.search.clone(),
            http,
            // Never flushes on append: the whole run ends up in a single file
            accumulator: ShardBuffer::new(RecordKind::Link, &config.output.data_dir, u64::MAX),
            seen: HashSet::new(),
            min_seen_id: None,
            polls: 0,
            duplicates: 0,
        })
    }

    pub fn collected(&self) -> usize {
        self.accumulator.pending_len()
    }

    pub fn min_seen_id(&self) -> Option<u64> {
        self.min_seen_id
    }

    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// Query parameters of the next poll
    pub fn build_query(&self) -> QueryParams {
        let count = self.config.count.to_string();
        let mut params = query_params(&[
            ("q", self.config.query.as_str()),
            ("lang", self.config.lang.as_str()),
            ("result_type", self.config.result_type.as_str()),
            ("count", count.as_str()),
        ]);

        if let Some(max_id) = self.min_seen_id {
            params.push(("max_id".to_string(), max_id.to_string()));
        }
        params
    }

    /// Issues one search request and ingests its statuses
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of new records added to the accumulator
    /// * `Err(HarvestError)` - Transport failure, error status or unreadable body
    pub async fn poll_once(&mut self) -> Result<usize> {
        let url = self.config.base_url.as_str();
        let params = self.build_query();
        tracing::debug!("GET {} (max_id {:?})", url, self.min_seen_id);

        let http_err = |source| HarvestError::Http {
            url: url.to_string(),
            source,
        };

        let mut request = self.http.get(url).query(&params);
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(http_err)?
            .error_for_status()
            .map_err(http_err)?;
        let body = response.text().await.map_err(http_err)?;

        let response: RawSearchResponse =
            serde_json::from_str(&body).map_err(|e| HarvestError::MalformedResponse {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        self.polls += 1;
        let added = self.ingest(&response.statuses)?;
        tracing::info!(
            "Poll {}: {} new links, {} total",
            self.polls,
            added,
            self.collected()
        );
        Ok(added)
    }

    /// Extracts link records from statuses, dropping already seen ids
    pub fn ingest(&mut self, statuses: &[RawStatus]) -> Result<usize> {
        let mut added = 0;

        for status in statuses {
            for record in LinkRecord::extract_all(status) {
                self.observe_id(&record.id);

                if !self.seen.insert(record.id.clone()) {
                    self.duplicates += 1;
                    continue;
                }
                self.accumulator.append(record)?;
                added += 1;
            }
        }

        Ok(added)
    }

    fn observe_id(&mut self, id: &str) {
        let Ok(id) = id.parse::<u64>() else {
            tracing::debug!("Ignoring non-numeric status id {}", id);
            return;
        };

        self.min_seen_id = Some(match self.min_seen_id {
            Some(current) => current.min(id),
            None => id,
        });
    }

    /// Polls until the time budget or the poll cap is exhausted
    ///
    /// The accumulator is written whether the loop ends normally or on an
    /// error. A loop error takes precedence over a failed write, which is
    /// then only logged.
    pub async fn run(&mut self) -> Result<PollSummary> {
        let started_at = Utc::now();
        let result = self.poll_loop().await;

        let collected = self.collected();
        let flushed = self.accumulator.flush();
        if let Ok(Some(path)) = &flushed {
            tracing::info!("Saved {} links to {}", collected, path.display());
        }

        if let Err(e) = result {
            tracing::error!("Polling aborted: {}", e);
            if let Err(flush_err) = flushed {
                tracing::error!("Failed to save {} collected links: {}", collected, flush_err);
            }
            return Err(e);
        }

        Ok(PollSummary {
            started_at,
            finished_at: Utc::now(),
            polls: self.polls,
            collected,
            duplicates: self.duplicates,
            min_seen_id: self.min_seen_id,
            shard_file: flushed?,
        })
    }

    async fn poll_loop(&mut self) -> Result<()> {
        let budget = self.config.time_budget();
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        let started = Instant::now();

        while self.polls < self.config.max_polls {
            self.poll_once().await?;
            tokio::time::sleep(interval).await;

            if started.elapsed() > budget {
                tracing::info!("Time budget of {:?} spent after {} polls", budget, self.polls);
                break;
            }
        }

        Ok(())
    }
}
