//! Fan-out from one post to its comments, likes and shares
//!
//! Each of the three sub-resources is read through its own [`PageCursor`]
//! and every raw sub-item is projected into the unified [`Interaction`]
//! shape. A sub-resource whose pagination fails on the server side only
//! truncates that sub-resource; transport failures still propagate.

use crate::crawler::client::{query_params, GraphClient, QueryParams};
use crate::crawler::cursor::{CursorOutcome, PageCursor};
use crate::records::raw::{RawComment, RawLike, RawShare};
use crate::records::{like_id, Interaction, InteractionKind};
use crate::Result;
use serde_json::Value;

/// Fields requested for a post
pub const POST_FIELDS: &str = "id,created_time,message,link,place,status_type,shares";

/// Fields requested for a comment
pub const COMMENT_FIELDS: &str = "id,created_time,message,from,like_count";

/// Fields requested for a share; the sharing user is needed on top of the post fields
pub const SHARE_FIELDS: &str = "id,created_time,message,link,place,status_type,shares,from";

/// Values every interaction of one post shares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionContext {
    pub status_id: String,
    pub status_author: String,
    pub origin: String,
}

/// Query parameters for the three sub-resources
#[derive(Debug, Clone)]
pub struct FanoutParams {
    pub comments: QueryParams,
    pub likes: QueryParams,
    pub shares: QueryParams,
}

impl Default for FanoutParams {
    fn default() -> Self {
        Self {
            comments: query_params(&[("fields", COMMENT_FIELDS)]),
            likes: Vec::new(),
            shares: query_params(&[("fields", SHARE_FIELDS)]),
        }
    }
}

impl FanoutParams {
    fn for_kind(&self, kind: InteractionKind) -> QueryParams {
        match kind {
            InteractionKind::Comment => self.comments.clone(),
            InteractionKind::Like => self.likes.clone(),
            InteractionKind::Share => self.shares.clone(),
        }
    }
}

/// Issues the comment, like and share sub-fetches for posts of one author
#[derive(Debug, Clone)]
pub struct ResourceFanout {
    client: GraphClient,
    params: FanoutParams,
    status_author: String,
    origin: String,
    page_limit: u32,
}

impl ResourceFanout {
    pub fn new(
        client: GraphClient,
        params: FanoutParams,
        status_author: impl Into<String>,
        origin: impl Into<String>,
        page_limit: u32,
    ) -> Self {
        Self {
            client,
            params,
            status_author: status_author.into(),
            origin: origin.into(),
            page_limit,
        }
    }

    /// Returns the three lazy interaction sequences of a post
    ///
    /// They are ordered comments, likes, shares; nothing is fetched until a
    /// sequence is polled.
    pub fn for_post(&self, post_id: &str) -> [InteractionStream; 3] {
        InteractionKind::fetch_order().map(|kind| self.stream(post_id, kind))
    }

    /// Returns the lazy sequence of one interaction kind of a post
    pub fn stream(&self, post_id: &str, kind: InteractionKind) -> InteractionStream {
        let cursor = PageCursor::new(
            self.client.clone(),
            format!("{}/{}", post_id, kind.edge()),
            self.params.for_kind(kind),
            self.page_limit,
        );

        InteractionStream {
            kind,
            cursor,
            context: InteractionContext {
                status_id: post_id.to_string(),
                status_author: self.status_author.clone(),
                origin: self.origin.clone(),
            },
            skipped: 0,
        }
    }
}

/// Lazy sequence of normalized interactions of one kind for one post
#[derive(Debug)]
pub struct InteractionStream {
    kind: InteractionKind,
    cursor: PageCursor,
    context: InteractionContext,
    skipped: u64,
}

impl InteractionStream {
    pub fn kind(&self) -> InteractionKind {
        self.kind
    }

    pub fn endpoint(&self) -> &str {
        self.cursor.endpoint()
    }

    /// Raw items dropped because they failed validation
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// How the underlying pagination ended, once it has
    pub fn outcome(&self) -> Option<&CursorOutcome> {
        self.cursor.outcome()
    }

    /// Returns the next interaction, skipping malformed raw items
    pub async fn next(&mut self) -> Result<Option<Interaction>> {
        while let Some(raw) = self.cursor.next().await? {
            match project(self.kind, raw, &self.context) {
                Ok(interaction) => return Ok(Some(interaction)),
                Err(e) => {
                    self.skipped += 1;
                    tracing::warn!(
                        "Skipping malformed {} on {}: {}",
                        self.kind,
                        self.context.status_id,
                        e
                    );
                }
            }
        }
        Ok(None)
    }
}

/// Projects a raw sub-item of the given kind into an interaction
pub fn project(
    kind: InteractionKind,
    raw: Value,
    context: &InteractionContext,
) -> std::result::Result<Interaction, serde_json::Error> {
    Ok(match kind {
        InteractionKind::Comment => project_comment(serde_json::from_value(raw)?, context),
        InteractionKind::Like => project_like(serde_json::from_value(raw)?, context),
        InteractionKind::Share => project_share(serde_json::from_value(raw)?, context),
    })
}

pub fn project_comment(raw: RawComment, context: &InteractionContext) -> Interaction {
    Interaction {
        id: raw.id,
        status_id: context.status_id.clone(),
        status_author: context.status_author.clone(),
        kind: InteractionKind::Comment,
        author: raw.from.id,
        created_time: Some(raw.created_time),
        message: raw.message,
        like_count: raw.like_count,
        origin: context.origin.clone(),
    }
}

/// The like endpoint returns the liking user's id in `id`
pub fn project_like(raw: RawLike, context: &InteractionContext) -> Interaction {
    Interaction {
        id: like_id(&raw.id, &context.status_id),
        status_id: context.status_id.clone(),
        status_author: context.status_author.clone(),
        kind: InteractionKind::Like,
        author: raw.id,
        created_time: None,
        message: None,
        like_count: None,
        origin: context.origin.clone(),
    }
}

pub fn project_share(raw: RawShare, context: &InteractionContext) -> Interaction {
    Interaction {
        id: raw.id,
        status_id: context.status_id.clone(),
        status_author: context.status_author.clone(),
        kind: InteractionKind::Share,
        author: raw.from.id,
        created_time: Some(raw.created_time),
        message: Some(raw.message.unwrap_or_default()),
        like_count: None,
        origin: context.origin.clone(),
    }
}
