//! Request and result types for crawl and scrape operations

use crate::state::StopReason;
use crate::storage::{PageRecord, RunOutcome, RunStatus};
use crate::url::{canonicalize_url, normalize_seed};
use crate::CrawlerError;
use serde::{Deserialize, Serialize};
use url::Url;

/// Input to a domain crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlRequest {
    /// Seed URL or bare domain (`example.com` gets `https://`)
    pub seed: String,

    /// Upper bound on pages dequeued for fetching
    pub max_pages: usize,
}

impl CrawlRequest {
    pub fn new(seed: impl Into<String>, max_pages: usize) -> Self {
        Self {
            seed: seed.into(),
            max_pages,
        }
    }

    /// Checks the request and returns the normalized, canonical seed URL
    ///
    /// The seed is canonicalized like every discovered link so a page linking
    /// back to it is recognized as already visited.
    pub fn validate(&self) -> Result<Url, CrawlerError> {
        if self.seed.trim().is_empty() {
            return Err(CrawlerError::InvalidRequest("Domain is required".to_string()));
        }
        if self.max_pages == 0 {
            return Err(CrawlerError::InvalidRequest(
                "maxPages must be a positive integer".to_string(),
            ));
        }
        Ok(canonicalize_url(&normalize_seed(&self.seed)?))
    }
}

/// A URL that was dequeued but produced no page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedPage {
    pub url: String,
    pub reason: String,
}

/// Outcome of a domain crawl
///
/// `success` is true whenever the loop ran to a stop condition, even if every
/// individual page failed. Request-level failures (bad seed, zero budget) come
/// back with `success == false`, an `error`, and no pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlResult {
    pub success: bool,
    pub pages: Vec<PageRecord>,
    pub total_pages: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
    pub failed_pages: Vec<FailedPage>,
    pub persist_failures: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CrawlResult {
    /// A request-level failure with no pages
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            pages: Vec::new(),
            total_pages: 0,
            error: Some(error.into()),
            stop_reason: None,
            failed_pages: Vec::new(),
            persist_failures: 0,
            message: None,
        }
    }

    /// Fraction of attempted fetches that produced a page
    ///
    /// Returns 0.0 when nothing was attempted.
    pub fn success_ratio(&self) -> f64 {
        let attempted = self.pages.len() + self.failed_pages.len();
        if attempted == 0 {
            return 0.0;
        }
        self.pages.len() as f64 / attempted as f64
    }

    /// Numbers recorded on the run row when this crawl finishes
    pub fn run_outcome(&self) -> RunOutcome {
        let status = match (self.success, self.stop_reason) {
            (false, _) => RunStatus::Failed,
            (true, Some(StopReason::Cancelled)) => RunStatus::Interrupted,
            (true, _) => RunStatus::Completed,
        };

        RunOutcome {
            status,
            stop_reason: self.stop_reason,
            pages_persisted: self.pages.len().saturating_sub(self.persist_failures) as u64,
            pages_failed: (self.failed_pages.len() + self.persist_failures) as u64,
        }
    }
}

/// Outcome of a single-URL scrape
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<PageRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ScrapeResult {
    pub fn success(record: PageRecord) -> Self {
        let message = format!("Successfully scraped {}", record.url);
        Self {
            success: true,
            data: Some(record),
            error: None,
            message: Some(message),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: None,
        }
    }

    /// The page was extracted but could not be stored
    pub fn unsaved(record: PageRecord, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Some(record),
            error: Some(error.into()),
            message: None,
        }
    }
}
