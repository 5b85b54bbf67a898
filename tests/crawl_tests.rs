//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and drive the full
//! crawl and scrape cycles end-to-end against a SQLite knowledge base.

use knowledge_crawler::config::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use knowledge_crawler::crawler::{crawl_domain, scrape_url, Coordinator, CrawlRequest};
use knowledge_crawler::state::StopReason;
use knowledge_crawler::storage::{
    PageRecord, PageSink, SqliteStorage, Storage, StorageError, StorageResult,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with no politeness delay
fn create_test_config(db_path: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_pages: 10,
            politeness_delay_ms: 0, // No pacing in tests
            request_timeout_ms: 2_000,
            max_links_per_page: 10,
            max_content_chars: 10_000,
            max_scrape_links: 50,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
        },
    }
}

fn html_page(title: &str, body: &str) -> String {
    format!(
        "<html><head><title>{}</title></head><body>{}</body></html>",
        title, body
    )
}

fn html_response(html: String) -> ResponseTemplate {
    // set_body_string would force text/plain and trip the content-type guard
    ResponseTemplate::new(200).set_body_raw(html, "text/html")
}

async fn mount_page(server: &MockServer, page_path: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(html_response(html))
        .mount(server)
        .await;
}

async fn mount_never_fetched(server: &MockServer, page_path: &str) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(html_response(html_page("Never", "")))
        .expect(0)
        .mount(server)
        .await;
}

fn memory_storage() -> Arc<SqliteStorage> {
    Arc::new(SqliteStorage::new_in_memory().expect("Failed to open in-memory storage"))
}

fn urls(pages: &[PageRecord]) -> Vec<String> {
    pages.iter().map(|p| p.url.clone()).collect()
}

/// A sink whose every upsert fails
struct FailingSink;

impl PageSink for FailingSink {
    fn upsert(&self, _record: &PageRecord) -> StorageResult<()> {
        Err(StorageError::InvalidValue("disk full".to_string()))
    }
}

/// Stores the record, then raises the cancellation flag
struct CancellingSink {
    inner: SqliteStorage,
    cancel: Arc<AtomicBool>,
}

impl PageSink for CancellingSink {
    fn upsert(&self, record: &PageRecord) -> StorageResult<()> {
        self.inner.upsert(record)?;
        self.cancel.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_breadth_first_same_origin_within_budget() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html_page(
            "Home",
            r#"<a href="/a">A</a> <a href="/b">B</a> <a href="https://other.example/x">X</a>"#,
        ),
    )
    .await;
    mount_page(&server, "/a", html_page("A", r#"<p>Page A</p><a href="/c">C</a>"#)).await;
    mount_page(&server, "/b", html_page("B", "<p>Page B</p>")).await;
    mount_never_fetched(&server, "/c").await;

    let storage = memory_storage();
    let config = create_test_config(":memory:");
    let result = crawl_domain(&config, storage.clone(), &format!("{}/", base), 3).await;

    assert!(result.success);
    assert_eq!(result.total_pages, 3);
    assert_eq!(
        urls(&result.pages),
        vec![
            format!("{}/", base),
            format!("{}/a", base),
            format!("{}/b", base)
        ]
    );
    assert_eq!(result.stop_reason, Some(StopReason::BudgetReached));
    assert_eq!(
        result.message.as_deref(),
        Some(format!("Successfully crawled 3 pages from {}/", base).as_str())
    );

    // Cross-origin links are neither recorded nor followed
    assert_eq!(
        result.pages[0].links,
        vec![format!("{}/a", base), format!("{}/b", base)]
    );
    let seed_host = url::Url::parse(&base).unwrap().host_str().unwrap().to_string();
    for page in &result.pages {
        for link in &page.links {
            let host = url::Url::parse(link).unwrap().host_str().unwrap().to_string();
            assert_eq!(host, seed_host);
        }
    }

    assert_eq!(storage.count_pages().unwrap(), 3);
    let stored = storage.get_page(&format!("{}/a", base)).unwrap().unwrap();
    assert_eq!(stored.title, "A");
    assert_eq!(stored.content, "Page A C");
}

#[tokio::test]
async fn test_budget_of_one_fetches_only_seed() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", html_page("Home", r#"<a href="/a">A</a>"#)).await;
    mount_never_fetched(&server, "/a").await;

    let result = crawl_domain(
        &create_test_config(":memory:"),
        memory_storage(),
        &format!("{}/", base),
        1,
    )
    .await;

    assert!(result.success);
    assert_eq!(result.total_pages, 1);
    assert_eq!(result.stop_reason, Some(StopReason::BudgetReached));
}

#[tokio::test]
async fn test_fragment_and_binary_links_never_fetched() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html_page(
            "Home",
            r##"<a href="#section">Jump</a>
                <a href="file.pdf">PDF</a>
                <a href="/images/photo.JPG">Photo</a>
                <a href="/guide#intro">Guide intro</a>
                <a href="mailto:someone@example.com">Mail</a>"##,
        ),
    )
    .await;
    mount_never_fetched(&server, "/file.pdf").await;
    mount_never_fetched(&server, "/images/photo.JPG").await;
    mount_never_fetched(&server, "/guide").await;

    let result = crawl_domain(
        &create_test_config(":memory:"),
        memory_storage(),
        &format!("{}/", base),
        10,
    )
    .await;

    assert!(result.success);
    assert_eq!(result.total_pages, 1);
    assert!(result.pages[0].links.is_empty());
    assert_eq!(result.stop_reason, Some(StopReason::Drained));
}

#[tokio::test]
async fn test_partial_failure_tolerance() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html_page(
            "Home",
            r#"<a href="/p1">1</a> <a href="/p2">2</a> <a href="/p3">3</a> <a href="/p4">4</a>"#,
        ),
    )
    .await;
    mount_page(&server, "/p1", html_page("P1", "one")).await;
    Mock::given(method("GET"))
        .and(path("/p2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_page(&server, "/p3", html_page("P3", "three")).await;
    mount_page(&server, "/p4", html_page("P4", "four")).await;

    let storage = memory_storage();
    let result = crawl_domain(
        &create_test_config(":memory:"),
        storage.clone(),
        &format!("{}/", base),
        5,
    )
    .await;

    assert!(result.success);
    assert_eq!(
        urls(&result.pages),
        vec![
            format!("{}/", base),
            format!("{}/p1", base),
            format!("{}/p3", base),
            format!("{}/p4", base)
        ]
    );
    assert_eq!(result.failed_pages.len(), 1);
    assert_eq!(result.failed_pages[0].url, format!("{}/p2", base));
    assert_eq!(result.failed_pages[0].reason, "HTTP error! status: 500");
    assert!((result.success_ratio() - 0.8).abs() < 1e-9);
    assert_eq!(storage.count_pages().unwrap(), 4);
}

#[tokio::test]
async fn test_non_html_response_is_content_mismatch() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", html_page("Home", r#"<a href="/data">Data</a>"#)).await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .mount(&server)
        .await;

    let result = crawl_domain(
        &create_test_config(":memory:"),
        memory_storage(),
        &format!("{}/", base),
        5,
    )
    .await;

    assert!(result.success);
    assert_eq!(result.total_pages, 1);
    assert_eq!(result.failed_pages.len(), 1);
    assert!(result.failed_pages[0].reason.starts_with("Expected HTML"));
}

#[tokio::test]
async fn test_persistence_failure_does_not_abort_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", html_page("Home", r#"<a href="/a">A</a>"#)).await;
    mount_page(&server, "/a", html_page("A", "alpha")).await;

    let result = crawl_domain(
        &create_test_config(":memory:"),
        Arc::new(FailingSink),
        &format!("{}/", base),
        5,
    )
    .await;

    assert!(result.success);
    assert_eq!(result.total_pages, 2);
    assert_eq!(result.persist_failures, 2);
    assert_eq!(result.run_outcome().pages_persisted, 0);
}

#[tokio::test]
async fn test_cancellation_returns_partial_results() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html_page("Home", r#"<a href="/a">A</a> <a href="/b">B</a>"#),
    )
    .await;
    mount_never_fetched(&server, "/a").await;
    mount_never_fetched(&server, "/b").await;

    let cancel = Arc::new(AtomicBool::new(false));
    let sink = Arc::new(CancellingSink {
        inner: SqliteStorage::new_in_memory().unwrap(),
        cancel: cancel.clone(),
    });

    let coordinator = Coordinator::new(&create_test_config(":memory:"), sink.clone())
        .unwrap()
        .with_cancel_flag(cancel);
    let result = coordinator
        .crawl(CrawlRequest::new(format!("{}/", base), 10))
        .await;

    assert!(result.success);
    assert_eq!(result.stop_reason, Some(StopReason::Cancelled));
    assert_eq!(result.total_pages, 1);
    assert_eq!(sink.inner.count_pages().unwrap(), 1);
}

#[tokio::test]
async fn test_request_level_failures() {
    let config = create_test_config(":memory:");

    let empty = crawl_domain(&config, memory_storage(), "", 5).await;
    assert!(!empty.success);
    assert_eq!(empty.error.as_deref(), Some("Domain is required"));
    assert!(empty.pages.is_empty());

    let zero = crawl_domain(&config, memory_storage(), "example.com", 0).await;
    assert!(!zero.success);
    assert_eq!(zero.total_pages, 0);

    let no_host = crawl_domain(&config, memory_storage(), "http://", 5).await;
    assert!(!no_host.success);
    assert!(no_host.error.is_some());
}

#[tokio::test]
async fn test_timeout_is_recorded_as_failed_page() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(html_page("Slow", "")).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let mut config = create_test_config(":memory:");
    config.crawler.request_timeout_ms = 200;

    let result = crawl_domain(&config, memory_storage(), &format!("{}/", base), 5).await;

    assert!(result.success);
    assert!(result.pages.is_empty());
    assert_eq!(result.failed_pages.len(), 1);
    assert_eq!(result.failed_pages[0].reason, "Request timeout");
    assert_eq!(result.stop_reason, Some(StopReason::Drained));
}

#[tokio::test]
async fn test_links_resolve_against_requested_url() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/docs/"))
        .mount(&server)
        .await;
    mount_page(&server, "/docs/", html_page("Docs", r#"<a href="intro">Intro</a>"#)).await;
    mount_page(&server, "/intro", html_page("Intro", "hello")).await;
    mount_never_fetched(&server, "/docs/intro").await;

    let result = crawl_domain(
        &create_test_config(":memory:"),
        memory_storage(),
        &format!("{}/", base),
        5,
    )
    .await;

    assert!(result.success);
    assert_eq!(result.pages[0].url, format!("{}/", base));
    assert_eq!(result.pages[0].links, vec![format!("{}/intro", base)]);
    assert_eq!(
        urls(&result.pages),
        vec![format!("{}/", base), format!("{}/intro", base)]
    );
}

#[tokio::test]
async fn test_cross_host_redirect_keeps_seed_host() {
    let server = MockServer::start().await;
    let base = server.uri();
    let port = url::Url::parse(&base).unwrap().port().unwrap();
    let seed = format!("http://localhost:{}/", port);

    // localhost redirects to the 127.0.0.1 address of the same server
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("Location", format!("{}/home", base).as_str()),
        )
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/home",
        html_page("Home", r#"<a href="/a">A</a> <a href="/b">B</a>"#),
    )
    .await;
    mount_page(&server, "/a", html_page("A", "Page A")).await;
    mount_page(&server, "/b", html_page("B", "Page B")).await;

    let result = crawl_domain(&create_test_config(":memory:"), memory_storage(), &seed, 5).await;

    assert!(result.success);
    assert_eq!(result.total_pages, 3);
    assert_eq!(
        result.pages[0].links,
        vec![
            format!("http://localhost:{}/a", port),
            format!("http://localhost:{}/b", port)
        ]
    );
    assert_eq!(
        urls(&result.pages),
        vec![
            seed.clone(),
            format!("http://localhost:{}/a", port),
            format!("http://localhost:{}/b", port)
        ]
    );
}

#[tokio::test]
async fn test_tracked_seed_is_not_fetched_twice() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(html_page(
            "Home",
            r#"<a href="/">Home</a> <a href="/a">A</a>"#,
        )))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/a", html_page("A", "Page A")).await;

    let result = crawl_domain(
        &create_test_config(":memory:"),
        memory_storage(),
        &format!("{}/?utm_source=news", base),
        5,
    )
    .await;

    assert!(result.success);
    assert_eq!(
        urls(&result.pages),
        vec![format!("{}/", base), format!("{}/a", base)]
    );
    assert_eq!(result.stop_reason, Some(StopReason::Drained));
}

#[tokio::test]
async fn test_politeness_delay_between_fetches() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html_page("Home", r#"<a href="/a">A</a> <a href="/b">B</a>"#),
    )
    .await;
    mount_page(&server, "/a", html_page("A", "Page A")).await;
    mount_page(&server, "/b", html_page("B", "Page B")).await;

    let mut config = create_test_config(":memory:");
    config.crawler.politeness_delay_ms = 150;

    let start = Instant::now();
    let result = crawl_domain(&config, memory_storage(), &format!("{}/", base), 5).await;
    let elapsed = start.elapsed();

    assert_eq!(result.total_pages, 3);
    // No wait before the first fetch, one full delay before each later one
    assert!(
        elapsed >= Duration::from_millis(300),
        "three fetches finished in {:?}",
        elapsed
    );
}

#[tokio::test]
async fn test_user_agent_header_sent() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header(
            "user-agent",
            "TestBot/1.0.0 (+https://example.com/contact; test@example.com)",
        ))
        .respond_with(html_response(html_page("Home", "")))
        .expect(1)
        .mount(&server)
        .await;

    let result = crawl_domain(
        &create_test_config(":memory:"),
        memory_storage(),
        &format!("{}/", base),
        1,
    )
    .await;
    assert_eq!(result.total_pages, 1);
}

#[tokio::test]
async fn test_recrawl_upserts_last_write_wins() {
    let server = MockServer::start().await;
    let base = server.uri();
    let seed = format!("{}/", base);

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("knowledge.db");
    let storage = Arc::new(SqliteStorage::new(&db_path).unwrap());
    let config = create_test_config(db_path.to_str().unwrap());

    mount_page(&server, "/", html_page("First", "old content")).await;
    let first = crawl_domain(&config, storage.clone(), &seed, 5).await;
    assert_eq!(first.total_pages, 1);

    server.reset().await;
    mount_page(&server, "/", html_page("Second", "new content")).await;
    let second = crawl_domain(&config, storage.clone(), &seed, 5).await;
    assert_eq!(second.total_pages, 1);

    assert_eq!(storage.count_pages().unwrap(), 1);
    let stored = storage.get_page(&seed).unwrap().unwrap();
    assert_eq!(stored.title, "Second");
    assert_eq!(stored.content, "new content");
}

#[tokio::test]
async fn test_scrape_single_page() {
    let server = MockServer::start().await;
    let base = server.uri();

    let links: String = (0..60)
        .map(|i| format!(r#"<a href="/item/{}">Item {}</a>"#, i, i))
        .collect();
    mount_page(
        &server,
        "/catalog",
        format!(
            r#"<html><head><title>Catalog</title>
               <meta name="description" content="Everything we sell"></head>
               <body><nav>Menu</nav><p>Catalog intro</p>{}</body></html>"#,
            links
        ),
    )
    .await;
    mount_never_fetched(&server, "/item/0").await;

    let storage = memory_storage();
    let url = format!("{}/catalog", base);
    let result = scrape_url(&create_test_config(":memory:"), storage.clone(), &url).await;

    assert!(result.success);
    let data = result.data.unwrap();
    assert_eq!(data.url, url);
    assert_eq!(data.title, "Catalog");
    assert_eq!(data.description, "Everything we sell");
    assert!(data.content.starts_with("Catalog intro"));
    assert!(!data.content.contains("Menu"));
    assert_eq!(data.links.len(), 50);
    assert!(storage.get_page(&url).unwrap().is_some());
}

#[tokio::test]
async fn test_scrape_failures() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_page(&server, "/ok", html_page("Ok", "fine")).await;

    let config = create_test_config(":memory:");

    let missing = scrape_url(&config, memory_storage(), &format!("{}/missing", base)).await;
    assert!(!missing.success);
    assert!(missing.data.is_none());
    assert_eq!(missing.error.as_deref(), Some("HTTP error! status: 404"));

    let unsaved = scrape_url(&config, Arc::new(FailingSink), &format!("{}/ok", base)).await;
    assert!(!unsaved.success);
    assert_eq!(unsaved.data.unwrap().title, "Ok");
    assert!(unsaved.error.is_some());
}
