//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the identifying user agent and a fixed timeout
//! - GET requests to fetch page content
//! - Error classification into `FetchFailure`
//!
//! Nothing in here returns `Err` to the crawl loop: every failure is folded
//! into `FetchOutcome::Failed`. There are no retries at this layer.

use crate::config::UserAgentConfig;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A successfully fetched HTML page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status_code: u16,
    /// Content-Type header value, if the server sent one
    pub content_type: Option<String>,
    /// Page body
    pub html: String,
}

/// Why a fetch did not produce a page
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    /// Server answered with a non-2xx status
    #[error("HTTP error! status: {0}")]
    Status(u16),

    /// The request did not complete within the configured timeout
    #[error("Request timeout")]
    Timeout,

    /// Connection refused, DNS failure, TLS failure
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Any other transport-level error
    #[error("Network error: {0}")]
    Network(String),

    /// 2xx response whose Content-Type is not HTML
    #[error("Expected HTML, got {0}")]
    ContentMismatch(String),

    /// The body could not be read or decoded
    #[error("Failed to read body: {0}")]
    Body(String),
}

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchOutcome {
    /// Successfully fetched an HTML page
    Page(FetchedPage),
    /// The page could not be fetched
    Failed(FetchFailure),
}

/// Builds an HTTP client with proper configuration
///
/// Redirects follow the client's default policy. The timeout covers the whole
/// request, body included.
///
/// # Example
///
/// ```no_run
/// use knowledge_crawler::config::UserAgentConfig;
/// use knowledge_crawler::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "KnowledgeCrawler".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/bot".to_string(),
///     contact_email: "bot@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(10)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a single URL and classifies the outcome
///
/// # Classification
///
/// | Condition | Outcome |
/// |-----------|---------|
/// | 2xx with HTML (or no) Content-Type | `Page` |
/// | 2xx with another Content-Type | `Failed(ContentMismatch)` |
/// | non-2xx status | `Failed(Status)` |
/// | timeout | `Failed(Timeout)` |
/// | connection error | `Failed(Connect)` |
/// | other transport error | `Failed(Network)` |
/// | unreadable body | `Failed(Body)` |
pub async fn fetch_page(client: &Client, url: &Url) -> FetchOutcome {
    let response = match client.get(url.clone()).send().await {
        Ok(response) => response,
        Err(e) => return FetchOutcome::Failed(classify_error(&e)),
    };

    let status = response.status();
    if !status.is_success() {
        return FetchOutcome::Failed(FetchFailure::Status(status.as_u16()));
    }

    let final_url = response.url().clone();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    if let Some(ct) = content_type.as_deref() {
        if !is_html_content_type(ct) {
            return FetchOutcome::Failed(FetchFailure::ContentMismatch(ct.to_string()));
        }
    }

    match response.text().await {
        Ok(html) => FetchOutcome::Page(FetchedPage {
            final_url,
            status_code: status.as_u16(),
            content_type,
            html,
        }),
        Err(e) if e.is_timeout() => FetchOutcome::Failed(FetchFailure::Timeout),
        Err(e) => FetchOutcome::Failed(FetchFailure::Body(e.to_string())),
    }
}

/// Returns true for HTML and XHTML media types
pub fn is_html_content_type(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    media_type == "text/html" || media_type == "application/xhtml+xml"
}

fn classify_error(e: &reqwest::Error) -> FetchFailure {
    if e.is_timeout() {
        FetchFailure::Timeout
    } else if e.is_connect() {
        FetchFailure::Connect(e.to_string())
    } else {
        FetchFailure::Network(e.to_string())
    }
}
