//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: the driver's state machine (init, fetching posts, fanning out,
//!   draining, aborting, done) with transition validation

mod crawl_state;

pub use crawl_state::CrawlState;
