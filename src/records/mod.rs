//! Record types for everything the harvester reads and writes
//!
//! # Components
//!
//! - `raw`: wire shapes of the remote APIs, validated on deserialization
//! - `Post` / `Interaction`: the normalized records written to shards
//! - `UserProfile` / `AuthorPage`: profile records for users and the crawl target
//! - `LinkRecord`: link units collected by the search polling mode

mod interaction;
mod link;
mod post;
pub mod raw;
mod user;

pub use interaction::{like_id, Interaction, InteractionKind};
pub use link::LinkRecord;
pub use post::Post;
pub use raw::ApiErrorBody;
pub use user::{AuthorPage, UserProfile, BIRTHDAY_FORMAT, PAGE_FIELDS, USER_FIELDS};

/// Source network tag carried by every graph record
pub const GRAPH_ORIGIN: &str = "facebook";
