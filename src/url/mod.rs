//! URL handling module for Social-Harvest
//!
//! This module provides domain extraction and link trimming for collected
//! links, plus profile-name derivation used to name output directories.

mod domain;
mod trim;

// Re-export main functions
pub use domain::extract_domain;
pub use trim::{profile_name_from_link, trim_and_filter_url, TrimmedUrl};
