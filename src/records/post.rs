use crate::records::raw::RawPost;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A post authored by the crawl target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub created_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_type: Option<String>,
    /// Flattened from the nested `shares.count`, 0 when absent
    pub share_count: u64,
    /// Always the crawl target, never the API's `from`
    pub author: String,
    pub origin: String,
}

impl Post {
    /// Builds a post record from its wire form
    pub fn from_raw(raw: RawPost, author: &str, origin: &str) -> Self {
        let share_count = raw.shares.and_then(|s| s.count).unwrap_or(0);

        Self {
            id: raw.id,
            created_time: raw.created_time,
            message: raw.message,
            link: raw.link,
            place: raw.place,
            status_type: raw.status_type,
            share_count,
            author: author.to_string(),
            origin: origin.to_string(),
        }
    }
}
