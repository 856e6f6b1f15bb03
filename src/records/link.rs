use crate::records::raw::RawStatus;
use crate::url::{trim_and_filter_url, TrimmedUrl};
use serde::{Deserialize, Serialize};

/// A link shared in a search result, the unit collected by the polling mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub url: String,
    pub domain: String,
    pub scheme: String,
    /// Id of the status the link was found in
    pub id: String,
    /// Screen name of the status author
    pub user: String,
    pub favorite_count: u64,
    pub retweet_count: u64,
}

impl LinkRecord {
    pub fn new(status: &RawStatus, url: TrimmedUrl) -> Self {
        Self {
            url: url.url,
            domain: url.domain,
            scheme: url.scheme,
            id: status.id_str.clone(),
            user: status.user.screen_name.clone(),
            favorite_count: status.favorite_count,
            retweet_count: status.retweet_count,
        }
    }

    /// Extracts one record per usable link of a status
    ///
    /// Links that fail to parse or point back at a status page are dropped.
    pub fn extract_all(status: &RawStatus) -> Vec<Self> {
        status
            .entities
            .urls
            .iter()
            .filter_map(|entity| entity.expanded_url.as_deref())
            .filter_map(|expanded| match trim_and_filter_url(expanded) {
                Ok(trimmed) => trimmed,
                Err(e) => {
                    tracing::debug!("Dropping unparsable link {}: {}", expanded, e);
                    None
                }
            })
            .map(|trimmed| Self::new(status, trimmed))
            .collect()
    }
}
