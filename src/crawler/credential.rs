//! App credential exchange
//!
//! Trades an application id/secret pair for an access token with a single
//! request. Older API versions answered with a plain `access_token=<value>`
//! body, newer ones with JSON; both are accepted.

use crate::crawler::client::{query_params, GraphClient};
use crate::{HarvestError, Result};
use serde_json::Value;

/// Endpoint of the token exchange
const TOKEN_ENDPOINT: &str = "oauth/access_token";

/// Prefix of the legacy plain-text token response
const LEGACY_TOKEN_PREFIX: &str = "access_token=";

/// Exchanges application credentials for a bearer token
#[derive(Debug, Clone)]
pub struct CredentialProvider {
    app_id: String,
    app_secret: String,
}

impl CredentialProvider {
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
        }
    }

    /// Requests an app token
    ///
    /// Fails with [`HarvestError::Credential`] when the response carries no
    /// token in either supported form.
    pub async fn acquire(&self, client: &GraphClient) -> Result<String> {
        let params = query_params(&[
            ("client_id", self.app_id.as_str()),
            ("client_secret", self.app_secret.as_str()),
            ("grant_type", "client_credentials"),
        ]);

        let body = client.get_text(TOKEN_ENDPOINT, &params).await?;
        let token = parse_token_response(&body)?;
        tracing::info!("Access token acquired");
        Ok(token)
    }
}

/// Extracts the access token from a token exchange response body
pub fn parse_token_response(body: &str) -> Result<String> {
    let body = body.trim();

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(object)) => {
            if let Some(token) = object
                .get("access_token")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
            {
                return Ok(token.to_string());
            }

            let reason = match object.get("error") {
                Some(error) => error.to_string(),
                None => format!("no access_token in response: {}", body),
            };
            Err(HarvestError::Credential(reason))
        }
        Ok(_) => Err(HarvestError::Credential(format!(
            "unexpected token response: {}",
            body
        ))),
        Err(_) => {
            let token = body
                .strip_prefix(LEGACY_TOKEN_PREFIX)
                .map(|rest| rest.split('&').next().unwrap_or(rest))
                .filter(|t| !t.is_empty())
                .ok_or_else(|| {
                    HarvestError::Credential(format!("malformed token response: {}", body))
                })?;
            Ok(token.to_string())
        }
    }
}
