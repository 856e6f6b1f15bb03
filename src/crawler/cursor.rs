//! Cursor over one paginated resource
//!
//! The cursor requests the first page with the caller's parameters and then
//! follows each page's `paging.next` URL verbatim. Every page request is an
//! explicit step whose result says whether items arrived, the listing ended,
//! or the server answered with an error object.

use crate::crawler::client::{GraphClient, QueryParams};
use crate::records::raw::RawPage;
use crate::records::ApiErrorBody;
use crate::{HarvestError, Result};
use serde_json::Value;
use std::collections::VecDeque;

/// Page size hint used when the caller does not set `limit`
pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Result of fetching one page
#[derive(Debug, Clone, PartialEq)]
pub enum PageStep {
    /// A non-empty page of raw items
    Items(Vec<Value>),
    /// No further page exists
    EndOfPages,
    /// The server returned an error object instead of a page
    ApiError(ApiErrorBody),
}

/// How a finished cursor ended
#[derive(Debug, Clone, PartialEq)]
pub enum CursorOutcome {
    /// Every page was read
    Exhausted,
    /// Pagination stopped on a server error; the listing may be incomplete
    Truncated(ApiErrorBody),
}

#[derive(Debug, Clone)]
enum NextRequest {
    Initial(QueryParams),
    Url(String),
    Finished,
}

/// Lazy, in-order, finite sequence of the raw items of one resource
///
/// A cursor can only be restarted by creating a new one.
#[derive(Debug)]
pub struct PageCursor {
    client: GraphClient,
    endpoint: String,
    next_request: NextRequest,
    buffered: VecDeque<Value>,
    outcome: Option<CursorOutcome>,
    pages_fetched: u64,
}

impl PageCursor {
    /// Creates a cursor over `endpoint`
    ///
    /// `limit` is added to `params` when absent.
    pub fn new(
        client: GraphClient,
        endpoint: impl Into<String>,
        mut params: QueryParams,
        limit: u32,
    ) -> Self {
        if !params.iter().any(|(k, _)| k == "limit") {
            params.push(("limit".to_string(), limit.to_string()));
        }

        Self {
            client,
            endpoint: endpoint.into(),
            next_request: NextRequest::Initial(params),
            buffered: VecDeque::new(),
            outcome: None,
            pages_fetched: 0,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// How the cursor ended, once it has
    pub fn outcome(&self) -> Option<&CursorOutcome> {
        self.outcome.as_ref()
    }

    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched
    }

    /// Fetches the next page
    ///
    /// Transport failures and pages that are neither a listing nor an error
    /// object are returned as errors. After `EndOfPages` or `ApiError` no
    /// further request is sent.
    pub async fn next_page(&mut self) -> Result<PageStep> {
        let request = std::mem::replace(&mut self.next_request, NextRequest::Finished);

        let response = match request {
            NextRequest::Finished => {
                self.outcome.get_or_insert(CursorOutcome::Exhausted);
                return Ok(PageStep::EndOfPages);
            }
            NextRequest::Initial(params) => self.client.get_json(&self.endpoint, &params).await?,
            NextRequest::Url(url) => self.client.get_url(&url).await?,
        };
        self.pages_fetched += 1;

        let page: RawPage =
            serde_json::from_value(response).map_err(|e| HarvestError::MalformedResponse {
                url: self.endpoint.clone(),
                message: e.to_string(),
            })?;

        if let Some(error) = page.error {
            self.outcome = Some(CursorOutcome::Truncated(error.clone()));
            return Ok(PageStep::ApiError(error));
        }

        let items = page
            .data
            .ok_or_else(|| HarvestError::MalformedResponse {
                url: self.endpoint.clone(),
                message: "page has neither data nor error".to_string(),
            })?;

        if items.is_empty() {
            self.outcome = Some(CursorOutcome::Exhausted);
            return Ok(PageStep::EndOfPages);
        }

        if let Some(next) = page.paging.and_then(|p| p.next).filter(|n| !n.trim().is_empty()) {
            self.next_request = NextRequest::Url(next);
        }

        Ok(PageStep::Items(items))
    }

    /// Returns the next raw item, fetching pages as needed
    ///
    /// `Ok(None)` marks the end of the sequence; check [`outcome`](Self::outcome)
    /// to tell a complete listing from a truncated one.
    pub async fn next(&mut self) -> Result<Option<Value>> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Ok(Some(item));
            }

            match self.next_page().await? {
                PageStep::Items(items) => self.buffered.extend(items),
                PageStep::EndOfPages => return Ok(None),
                PageStep::ApiError(error) => {
                    tracing::debug!("Pagination of {} stopped: {}", self.endpoint, error);
                    return Ok(None);
                }
            }
        }
    }
}
