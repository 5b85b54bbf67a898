//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that ties the pieces together:
//! - Validating the request and seeding the scheduler
//! - Fetching pages one at a time with a politeness delay between them
//! - Extracting text and links, queueing fresh same-site links
//! - Streaming each page to the sink as soon as it is extracted
//! - Observing the cancellation flag between iterations

use crate::config::{Config, CrawlerConfig};
use crate::crawler::extractor::extract;
use crate::crawler::fetcher::{build_http_client, fetch_page, FetchOutcome, FetchedPage};
use crate::crawler::result::{CrawlRequest, CrawlResult, FailedPage, ScrapeResult};
use crate::crawler::scheduler::Scheduler;
use crate::state::CrawlPhase;
use crate::storage::{PageRecord, PageSink};
use crate::url::{canonicalize_url, filter_links, normalize_seed, resolve_links};
use crate::CrawlerError;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Main crawler coordinator structure
///
/// One coordinator can serve many crawl and scrape calls; every call owns its
/// own frontier and visited set, so concurrent calls share nothing but the
/// HTTP client and the sink.
pub struct Coordinator {
    config: CrawlerConfig,
    client: Client,
    sink: Arc<dyn PageSink>,
    cancel: Arc<AtomicBool>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `sink` - Where extracted pages are upserted
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(CrawlerError)` - The HTTP client could not be built
    pub fn new(config: &Config, sink: Arc<dyn PageSink>) -> Result<Self, CrawlerError> {
        let client = build_http_client(&config.user_agent, config.crawler.request_timeout())?;

        Ok(Self {
            config: config.crawler.clone(),
            client,
            sink,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Replaces the cancellation flag with one owned by the caller
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns a handle that stops the crawl loop when set to `true`
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Crawls a site breadth-first from the request's seed
    ///
    /// Never returns `Err`: request-level problems come back as a
    /// `CrawlResult` with `success == false`, and per-page problems are
    /// recorded in `failed_pages` / `persist_failures`.
    pub async fn crawl(&self, request: CrawlRequest) -> CrawlResult {
        let seed = match request.validate() {
            Ok(seed) => seed,
            Err(e) => {
                tracing::warn!("Rejected crawl request for {:?}: {}", request.seed, e);
                return CrawlResult::failure(error_message(&e));
            }
        };

        match self.run(seed, request.max_pages).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Crawl of {} aborted: {}", request.seed, e);
                CrawlResult::failure(e.to_string())
            }
        }
    }

    /// Runs the main crawl loop
    ///
    /// Each iteration:
    /// 1. Stops if the frontier is empty, the budget is spent, or the run was cancelled
    /// 2. Dequeues the next URL and skips it if already visited
    /// 3. Marks it visited and waits out the politeness delay
    /// 4. Fetches, extracts, and queues fresh same-site links resolved against
    ///    the requested URL
    /// 5. Upserts the page into the sink
    async fn run(&self, seed: Url, max_pages: usize) -> Result<CrawlResult, CrawlerError> {
        let mut phase = CrawlPhase::Seeded;
        let mut scheduler = Scheduler::new(seed.clone(), self.config.politeness_delay());
        let mut pages: Vec<PageRecord> = Vec::new();
        let mut failed_pages = Vec::new();
        let mut persist_failures = 0;
        let start_time = Instant::now();

        tracing::info!("Crawling {} (max pages: {})", seed, max_pages);
        advance(&mut phase, CrawlPhase::Running)?;

        while !phase.is_stopped() {
            if scheduler.is_empty() {
                tracing::info!("Frontier is empty, crawl complete");
                advance(&mut phase, CrawlPhase::Drained)?;
                continue;
            }
            if scheduler.visited_count() >= max_pages {
                tracing::info!("Reached page budget of {}", max_pages);
                advance(&mut phase, CrawlPhase::BudgetReached)?;
                continue;
            }
            if self.is_cancelled() {
                tracing::info!("Crawl cancelled, returning partial results");
                advance(&mut phase, CrawlPhase::Cancelled)?;
                continue;
            }

            let Some(url) = scheduler.next_url() else {
                continue;
            };
            if scheduler.is_visited(&url) {
                tracing::debug!("Skipping already visited {}", url);
                continue;
            }
            scheduler.mark_visited(&url);

            scheduler.pace().await;
            tracing::info!(
                "Scraping {}/{}: {}",
                scheduler.visited_count(),
                max_pages,
                url
            );

            let fetched = match fetch_page(&self.client, &url).await {
                FetchOutcome::Page(fetched) => fetched,
                FetchOutcome::Failed(failure) => {
                    tracing::warn!("Failed to fetch {}: {}", url, failure);
                    failed_pages.push(FailedPage {
                        url: url.to_string(),
                        reason: failure.to_string(),
                    });
                    continue;
                }
            };

            log_fetched(&url, &fetched);
            let extracted = extract(&fetched.html, self.config.max_content_chars);

            let fresh = resolve_links(
                &extracted.raw_links,
                &url,
                &seed,
                scheduler.visited(),
                scheduler.queued(),
            );
            let mut queued = 0;
            for link in fresh.iter().take(self.config.max_links_per_page) {
                if scheduler.add_to_frontier(link) {
                    queued += 1;
                }
            }
            tracing::debug!(
                "Queued {} new links from {} ({} in frontier)",
                queued,
                url,
                scheduler.frontier_size()
            );

            let links = filter_links(&extracted.raw_links, &url, &seed);
            let record = extracted.into_record(&url, links);

            if !self.persist(&record).await {
                persist_failures += 1;
            }
            pages.push(record);
        }

        let stop_reason = phase.stop_reason();
        advance(&mut phase, CrawlPhase::Done)?;

        tracing::info!(
            "Crawl completed: {} pages extracted, {} failed, {} not persisted in {:?}",
            pages.len(),
            failed_pages.len(),
            persist_failures,
            start_time.elapsed()
        );

        let message = format!("Successfully crawled {} pages from {}", pages.len(), seed);
        Ok(CrawlResult {
            success: true,
            total_pages: pages.len(),
            pages,
            error: None,
            stop_reason,
            failed_pages,
            persist_failures,
            message: Some(message),
        })
    }

    /// Fetches and extracts one URL without following links
    ///
    /// The stored record lists at most `max_scrape_links` same-site links.
    pub async fn scrape(&self, url: &str) -> ScrapeResult {
        let target = match normalize_seed(url) {
            Ok(target) => canonicalize_url(&target),
            Err(e) => {
                tracing::warn!("Rejected scrape of {:?}: {}", url, e);
                return ScrapeResult::failure(format!("Invalid URL: {}", e));
            }
        };

        tracing::info!("Scraping {}", target);
        let fetched = match fetch_page(&self.client, &target).await {
            FetchOutcome::Page(fetched) => fetched,
            FetchOutcome::Failed(failure) => {
                tracing::warn!("Failed to fetch {}: {}", target, failure);
                return ScrapeResult::failure(failure.to_string());
            }
        };

        log_fetched(&target, &fetched);
        let record = self.build_scrape_record(&target, &fetched);
        if self.persist(&record).await {
            ScrapeResult::success(record)
        } else {
            ScrapeResult::unsaved(record, "Failed to save scraped page")
        }
    }

    fn build_scrape_record(&self, target: &Url, fetched: &FetchedPage) -> PageRecord {
        let extracted = extract(&fetched.html, self.config.max_content_chars);
        let links = filter_links(&extracted.raw_links, target, target)
            .into_iter()
            .take(self.config.max_scrape_links)
            .collect();
        extracted.into_record(target, links)
    }

    /// Upserts a record on the blocking pool and waits for it
    ///
    /// Returns false if the sink failed. Failures are logged, never propagated.
    async fn persist(&self, record: &PageRecord) -> bool {
        let sink = Arc::clone(&self.sink);
        let owned = record.clone();

        match tokio::task::spawn_blocking(move || sink.upsert(&owned)).await {
            Ok(Ok(())) => {
                tracing::debug!("Saved {}", record.url);
                true
            }
            Ok(Err(e)) => {
                tracing::warn!("Failed to persist {}: {}", record.url, e);
                false
            }
            Err(e) => {
                tracing::error!("Persistence task for {} did not complete: {}", record.url, e);
                false
            }
        }
    }
}

/// Moves `phase` to `next`, rejecting transitions the phase machine forbids
fn advance(phase: &mut CrawlPhase, next: CrawlPhase) -> Result<(), CrawlerError> {
    if !phase.can_transition_to(next) {
        return Err(CrawlerError::InvalidTransition {
            from: *phase,
            to: next,
        });
    }
    tracing::trace!("Crawl phase {} -> {}", phase, next);
    *phase = next;
    Ok(())
}

fn log_fetched(url: &Url, fetched: &FetchedPage) {
    if fetched.final_url != *url {
        tracing::debug!("{} redirected to {}", url, fetched.final_url);
    }
    tracing::debug!(
        "Fetched {} ({}, {})",
        url,
        fetched.status_code,
        fetched.content_type.as_deref().unwrap_or("no content type")
    );
}

/// Request errors are reported without the enum's category prefix
fn error_message(e: &CrawlerError) -> String {
    match e {
        CrawlerError::InvalidRequest(message) => message.clone(),
        other => other.to_string(),
    }
}

/// Runs a single crawl with a fresh coordinator
pub async fn crawl_domain(
    config: &Config,
    sink: Arc<dyn PageSink>,
    seed: &str,
    max_pages: usize,
) -> CrawlResult {
    match Coordinator::new(config, sink) {
        Ok(coordinator) => coordinator.crawl(CrawlRequest::new(seed, max_pages)).await,
        Err(e) => CrawlResult::failure(e.to_string()),
    }
}

/// Scrapes a single URL with a fresh coordinator
pub async fn scrape_url(config: &Config, sink: Arc<dyn PageSink>, url: &str) -> ScrapeResult {
    match Coordinator::new(config, sink) {
        Ok(coordinator) => coordinator.scrape(url).await,
        Err(e) => ScrapeResult::failure(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;

    fn coordinator() -> Coordinator {
        let sink: Arc<dyn PageSink> = Arc::new(SqliteStorage::new_in_memory().unwrap());
        Coordinator::new(&Config::default(), sink).unwrap()
    }

    #[test]
    fn test_advance_legal() {
        let mut phase = CrawlPhase::Seeded;
        advance(&mut phase, CrawlPhase::Running).unwrap();
        advance(&mut phase, CrawlPhase::Drained).unwrap();
        advance(&mut phase, CrawlPhase::Done).unwrap();
        assert_eq!(phase, CrawlPhase::Done);
    }

    #[test]
    fn test_advance_illegal() {
        let mut phase = CrawlPhase::Seeded;
        let err = advance(&mut phase, CrawlPhase::Done).unwrap_err();
        assert!(matches!(err, CrawlerError::InvalidTransition { .. }));
        assert_eq!(phase, CrawlPhase::Seeded);
    }

    #[test]
    fn test_cancel_flag_is_shared() {
        let coordinator = coordinator();
        let flag = coordinator.cancel_flag();
        assert!(!coordinator.is_cancelled());
        flag.store(true, Ordering::SeqCst);
        assert!(coordinator.is_cancelled());
    }

    #[tokio::test]
    async fn test_empty_seed_rejected_without_fetching() {
        let result = coordinator().crawl(CrawlRequest::new("", 5)).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Domain is required"));
        assert!(result.pages.is_empty());
    }

    #[tokio::test]
    async fn test_zero_budget_rejected() {
        let result = coordinator()
            .crawl(CrawlRequest::new("example.com", 0))
            .await;
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("maxPages must be a positive integer")
        );
    }

    #[tokio::test]
    async fn test_cancelled_before_start_fetches_nothing() {
        let coordinator = coordinator();
        coordinator.cancel_flag().store(true, Ordering::SeqCst);

        let result = coordinator
            .crawl(CrawlRequest::new("https://example.invalid/", 5))
            .await;
        assert!(result.success);
        assert_eq!(result.stop_reason, Some(crate::StopReason::Cancelled));
        assert!(result.pages.is_empty());
        assert!(result.failed_pages.is_empty());
    }

    #[tokio::test]
    async fn test_scrape_invalid_url() {
        let result = coordinator().scrape("   ").await;
        assert!(!result.success);
        assert!(result.data.is_none());
        assert!(result.error.unwrap().starts_with("Invalid URL"));
    }
}
