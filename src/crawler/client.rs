//! Graph API HTTP client
//!
//! This module handles every request the harvester sends, including:
//! - Building the HTTP client with the fixed per-request socket timeout
//! - Prefixing endpoints with the configured API version
//! - Attaching the access token to each request
//! - Classifying failures into transport errors and malformed responses
//!
//! Requests are never retried: a transport failure goes straight back to the
//! caller.

use crate::config::GraphConfig;
use crate::{HarvestError, Result};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Query parameters of one request, sent in order
pub type QueryParams = Vec<(String, String)>;

/// User agent sent with every request
const USER_AGENT: &str = concat!("social-harvest/", env!("CARGO_PKG_VERSION"));

/// Builds an HTTP client with the given socket timeout
///
/// # Example
///
/// ```no_run
/// use social_harvest::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(Duration::from_secs(125)).unwrap();
/// ```
pub fn build_http_client(timeout: Duration) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Builds query parameters from string pairs
pub fn query_params(pairs: &[(&str, &str)]) -> QueryParams {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Returns true if the endpoint already carries a version (`v2.9/...`)
pub fn has_version_prefix(endpoint: &str) -> bool {
    let bytes = endpoint.strip_prefix('/').unwrap_or(endpoint).as_bytes();
    bytes.len() >= 5
        && bytes[0] == b'v'
        && bytes[1].is_ascii_digit()
        && bytes[2] == b'.'
        && bytes[3].is_ascii_digit()
        && bytes[4] == b'/'
}

/// Client for the paginated graph API
///
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct GraphClient {
    http: Client,
    base_url: Url,
    api_version: String,
    access_token: Option<String>,
}

impl GraphClient {
    /// Creates a client without an access token
    pub fn new(config: &GraphConfig) -> Result<Self> {
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        Ok(Self {
            http: build_http_client(Duration::from_secs(config.request_timeout_secs))?,
            base_url: Url::parse(&base)?,
            api_version: config.api_version.clone(),
            access_token: None,
        })
    }

    /// Attaches `token` to every subsequent request
    pub fn set_access_token(&mut self, token: String) {
        self.access_token = Some(token);
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token.is_some()
    }

    /// Resolves an endpoint against the base URL, adding the version prefix
    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url> {
        let endpoint = endpoint.trim();
        let relative = if has_version_prefix(endpoint) {
            endpoint.trim_start_matches('/').to_string()
        } else {
            format!("v{}/{}", self.api_version, endpoint.trim_start_matches('/'))
        };

        Ok(self.base_url.join(&relative)?)
    }

    /// Sends a GET request to an endpoint and returns the raw body text
    pub async fn get_text(&self, endpoint: &str, params: &[(String, String)]) -> Result<String> {
        let url = self.endpoint_url(endpoint)?;

        let mut params = params.to_vec();
        if let Some(token) = &self.access_token {
            if !params.iter().any(|(k, _)| k == "access_token") {
                params.push(("access_token".to_string(), token.clone()));
            }
        }

        tracing::debug!("GET {}", url);
        let response = self
            .http
            .get(url.clone())
            .query(&params)
            .send()
            .await
            .map_err(|source| HarvestError::Http {
                url: url.to_string(),
                source,
            })?;

        response.text().await.map_err(|source| HarvestError::Http {
            url: url.to_string(),
            source,
        })
    }

    /// Sends a GET request to an endpoint and parses the JSON body
    ///
    /// Error objects returned by the API are parsed like any other payload;
    /// deciding what they mean is up to the caller.
    pub async fn get_json(&self, endpoint: &str, params: &[(String, String)]) -> Result<Value> {
        let body = self.get_text(endpoint, params).await?;
        parse_json_body(endpoint, &body)
    }

    /// Fetches an absolute URL verbatim, e.g. a `paging.next` link
    ///
    /// Such links already embed every parameter, the token included.
    pub async fn get_url(&self, url: &str) -> Result<Value> {
        let url = url.trim();
        tracing::debug!("GET {}", url);

        let http_err = |source| HarvestError::Http {
            url: url.to_string(),
            source,
        };
        let response = self.http.get(url).send().await.map_err(http_err)?;
        let body = response.text().await.map_err(http_err)?;

        parse_json_body(url, &body)
    }
}

fn parse_json_body(url: &str, body: &str) -> Result<Value> {
    serde_json::from_str(body).map_err(|e| HarvestError::MalformedResponse {
        url: url.to_string(),
        message: e.to_string(),
    })
}
