//! Human-readable reports for crawl and scrape results
//!
//! Formatting is kept separate from printing so the text can be tested.

use crate::crawler::{CrawlResult, ScrapeResult};
use crate::storage::PageRecord;

/// Characters of content shown per page in listings
const PREVIEW_CHARS: usize = 120;

/// Formats a crawl result as a markdown report
pub fn format_crawl_report(result: &CrawlResult) -> String {
    let mut md = String::new();

    md.push_str("# Crawl Report\n\n");

    if !result.success {
        md.push_str(&format!(
            "**Failed**: {}\n",
            result.error.as_deref().unwrap_or("unknown error")
        ));
        return md;
    }

    if let Some(message) = &result.message {
        md.push_str(&format!("{}\n\n", message));
    }

    md.push_str("## Overview\n\n");
    md.push_str(&format!("- **Pages Extracted**: {}\n", result.total_pages));
    md.push_str(&format!("- **Failed Fetches**: {}\n", result.failed_pages.len()));
    md.push_str(&format!(
        "- **Persistence Failures**: {}\n",
        result.persist_failures
    ));
    if let Some(reason) = result.stop_reason {
        md.push_str(&format!("- **Stop Reason**: {}\n", reason));
    }
    md.push_str(&format!(
        "- **Success Rate**: {:.1}%\n\n",
        result.success_ratio() * 100.0
    ));

    if !result.pages.is_empty() {
        md.push_str("## Pages\n\n");
        for page in &result.pages {
            md.push_str(&format!("- {} ({})\n", display_title(page), page.url));
        }
        md.push('\n');
    }

    if !result.failed_pages.is_empty() {
        md.push_str("## Failures\n\n");
        for failed in &result.failed_pages {
            md.push_str(&format!("- {}: {}\n", failed.url, failed.reason));
        }
        md.push('\n');
    }

    md
}

/// Formats a scrape result as a short report
pub fn format_scrape_report(result: &ScrapeResult) -> String {
    let mut out = String::new();

    match (&result.data, &result.error) {
        (Some(page), None) => {
            out.push_str(&format!("Scraped {}\n", page.url));
            out.push_str(&format_page_detail(page));
        }
        (Some(page), Some(error)) => {
            out.push_str(&format!("Extracted {} but did not save it: {}\n", page.url, error));
            out.push_str(&format_page_detail(page));
        }
        (None, error) => {
            out.push_str(&format!(
                "Scrape failed: {}\n",
                error.as_deref().unwrap_or("unknown error")
            ));
        }
    }

    out
}

/// Formats stored pages as a one-line-per-page listing
pub fn format_page_list(pages: &[PageRecord]) -> String {
    if pages.is_empty() {
        return "No pages stored.\n".to_string();
    }

    let mut out = format!("{} page(s):\n", pages.len());
    for page in pages {
        out.push_str(&format!(
            "  {} | {} | {}\n",
            page.scraped_at.format("%Y-%m-%d %H:%M:%S"),
            display_title(page),
            page.url
        ));
    }
    out
}

fn format_page_detail(page: &PageRecord) -> String {
    let mut out = String::new();
    out.push_str(&format!("  Title: {}\n", display_title(page)));
    if !page.description.is_empty() {
        out.push_str(&format!("  Description: {}\n", page.description));
    }
    out.push_str(&format!("  Links: {}\n", page.links.len()));
    out.push_str(&format!("  Content: {}\n", preview(&page.content)));
    out
}

fn display_title(page: &PageRecord) -> &str {
    if page.title.is_empty() {
        "(untitled)"
    } else {
        &page.title
    }
}

fn preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content.to_string(),
    }
}
