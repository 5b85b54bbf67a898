//! URL handling module for the knowledge crawler
//!
//! This module provides seed normalization, link canonicalization, host
//! extraction and the same-site link filter used by the crawl loop.

mod domain;
mod filter;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, same_host};
pub use filter::{filter_links, is_binary_resource, resolve_links, BINARY_EXTENSIONS};
pub use normalize::{canonicalize_url, normalize_seed};
