//! Output module for crawl reports and knowledge-base statistics
//!
//! This module handles:
//! - Formatting crawl and scrape results for the terminal
//! - Listing stored pages
//! - Loading and printing knowledge-base statistics

mod report;
pub mod stats;

pub use report::{format_crawl_report, format_page_list, format_scrape_report};
pub use stats::{load_statistics, print_statistics, KnowledgeBaseStats};
