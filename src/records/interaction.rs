use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of engagement an [`Interaction`] records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Like,
    Comment,
    Share,
}

impl InteractionKind {
    /// Returns the tag written into shard files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Comment => "comment",
            Self::Share => "share",
        }
    }

    /// Graph API edge the interactions of this kind are read from
    pub fn edge(&self) -> &'static str {
        match self {
            Self::Like => "likes",
            Self::Comment => "comments",
            Self::Share => "sharedposts",
        }
    }

    /// All kinds, in the order they are fetched for a post
    pub fn fetch_order() -> [Self; 3] {
        [Self::Comment, Self::Like, Self::Share]
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A like, comment or share attached to a post, in one unified shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: String,
    /// Id of the post this interaction belongs to
    pub status_id: String,
    /// Author of that post, i.e. the crawl target
    pub status_author: String,
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    /// The acting user
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub like_count: Option<u64>,
    pub origin: String,
}

/// Synthesizes the id of a like, which the API does not assign one
///
/// Deterministic and unique per (acting user, post) pair.
pub fn like_id(acting_user_id: &str, post_id: &str) -> String {
    format!("L_{}_{}", acting_user_id, post_id)
}
