//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with outcome classification
//! - HTML text extraction and raw link collection
//! - Frontier scheduling and politeness pacing
//! - Overall crawl coordination and single-URL scrapes

mod coordinator;
mod extractor;
mod fetcher;
mod result;
mod scheduler;

pub use coordinator::{crawl_domain, scrape_url, Coordinator};
pub use extractor::{extract, ExtractedPage, BOILERPLATE_TAGS};
pub use fetcher::{
    build_http_client, fetch_page, is_html_content_type, FetchFailure, FetchOutcome, FetchedPage,
};
pub use result::{CrawlRequest, CrawlResult, FailedPage, ScrapeResult};
pub use scheduler::Scheduler;
