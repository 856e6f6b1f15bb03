//! Wire shapes returned by the remote APIs
//!
//! These structs only describe what the ingestion pipeline reads. Anything
//! that fails to deserialize into them is rejected at the response boundary.

use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Error object returned by the graph API in place of a payload
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: String,

    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub code: Option<i64>,
}

impl fmt::Display for ApiErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, self.code) {
            (Some(kind), Some(code)) => write!(f, "{} ({} #{})", self.message, kind, code),
            (Some(kind), None) => write!(f, "{} ({})", self.message, kind),
            (None, Some(code)) => write!(f, "{} (#{})", self.message, code),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

/// One page of a paginated resource
#[derive(Debug, Clone, Deserialize)]
pub struct RawPage {
    pub data: Option<Vec<Value>>,

    #[serde(default)]
    pub paging: Option<RawPaging>,

    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPaging {
    pub next: Option<String>,
}

/// The user or page that performed an action
#[derive(Debug, Clone, Deserialize)]
pub struct RawActor {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawShareCount {
    pub count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPost {
    pub id: String,
    pub created_time: String,
    pub message: Option<String>,
    pub link: Option<String>,
    pub place: Option<Value>,
    pub status_type: Option<String>,
    pub shares: Option<RawShareCount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawComment {
    pub id: String,
    pub created_time: String,
    pub from: RawActor,
    pub message: Option<String>,
    pub like_count: Option<u64>,
}

/// A like; `id` is the id of the liking user, likes have no id of their own
#[derive(Debug, Clone, Deserialize)]
pub struct RawLike {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawShare {
    pub id: String,
    pub created_time: String,
    pub from: RawActor,
    pub message: Option<String>,
}

/// Profile lookup used to resolve the crawl target
#[derive(Debug, Clone, Deserialize)]
pub struct RawProfile {
    pub id: Option<String>,
    pub name: Option<String>,
    pub link: Option<String>,
}

/// Response of the search endpoint used by the polling mode
#[derive(Debug, Clone, Deserialize)]
pub struct RawSearchResponse {
    #[serde(default)]
    pub statuses: Vec<RawStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawStatus {
    pub id_str: String,
    pub user: RawStatusUser,
    #[serde(default)]
    pub favorite_count: u64,
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub entities: RawEntities,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawStatusUser {
    pub screen_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEntities {
    #[serde(default)]
    pub urls: Vec<RawUrlEntity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawUrlEntity {
    pub expanded_url: Option<String>,
}
