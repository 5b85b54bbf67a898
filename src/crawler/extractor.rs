//! HTML text extraction
//!
//! This module turns raw HTML into the parts of a `PageRecord`:
//! - Page title (first `<title>`)
//! - Meta description
//! - Clean `<body>` text with boilerplate removed (head text excluded)
//! - Every raw anchor `href`, unfiltered
//!
//! It is a pure transform over a parsed DOM. Link resolution and same-site
//! filtering live in `crate::url`.

use crate::storage::PageRecord;
use chrono::Utc;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// Elements whose whole subtree is navigation or boilerplate, not page substance
pub const BOILERPLATE_TAGS: &[&str] = &["script", "style", "nav", "header", "footer"];

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    /// Trimmed text of the first `<title>` (empty if absent)
    pub title: String,

    /// `<meta name="description">` content (empty if absent)
    pub description: String,

    /// Whitespace-collapsed body text, capped at the configured length
    pub content: String,

    /// Every anchor `href` value in document order, before any filtering
    pub raw_links: Vec<String>,
}

impl ExtractedPage {
    /// Builds the stored record for `url`, stamping the extraction time
    pub fn into_record(self, url: &Url, links: Vec<String>) -> PageRecord {
        PageRecord {
            url: url.to_string(),
            title: self.title,
            description: self.description,
            content: self.content,
            links,
            scraped_at: Utc::now(),
        }
    }
}

/// Extracts title, description, body text and raw links from HTML
///
/// Malformed markup never fails: missing parts come back as empty strings.
///
/// # Example
///
/// ```
/// use knowledge_crawler::crawler::extract;
///
/// let html = r#"<html><head><title> Docs </title></head>
///     <body><nav>Home About</nav><p>Real   content</p><a href="/next">Next</a></body></html>"#;
/// let page = extract(html, 10_000);
/// assert_eq!(page.title, "Docs");
/// assert_eq!(page.content, "Real content Next");
/// assert_eq!(page.raw_links, vec!["/next".to_string()]);
/// ```
pub fn extract(html: &str, max_content_chars: usize) -> ExtractedPage {
    let document = Html::parse_document(html);

    ExtractedPage {
        title: extract_title(&document),
        description: extract_description(&document),
        content: extract_content(&document, max_content_chars),
        raw_links: extract_raw_links(&document),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> String {
    let Ok(selector) = Selector::parse("title") else {
        return String::new();
    };

    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Extracts `<meta name="description" content="...">`, matching the name case-insensitively
fn extract_description(document: &Html) -> String {
    let Ok(selector) = Selector::parse("meta[name][content]") else {
        return String::new();
    };

    document
        .select(&selector)
        .find(|element| {
            element
                .value()
                .attr("name")
                .is_some_and(|name| name.trim().eq_ignore_ascii_case("description"))
        })
        .and_then(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .unwrap_or_default()
}

/// Extracts visible body text with boilerplate subtrees removed
///
/// Only `<body>` is walked, so `<head>` text such as the `<title>` is not
/// repeated in the content; the title is reported on its own. Documents
/// without a body fall back to the whole tree.
fn extract_content(document: &Html, max_chars: usize) -> String {
    let root = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());

    let collapsed = collapse_whitespace(&collect_text(root));
    truncate_chars(&collapsed, max_chars)
}

/// Walks the subtree in document order, skipping boilerplate elements entirely
fn collect_text(root: ElementRef<'_>) -> String {
    let mut text = String::new();
    let mut stack = vec![*root];

    while let Some(node) = stack.pop() {
        match node.value() {
            Node::Text(chunk) => {
                text.push_str(chunk);
                // Adjacent elements must not glue their words together
                text.push(' ');
            }
            Node::Element(element) if BOILERPLATE_TAGS.contains(&element.name()) => {}
            Node::Element(_) => stack.extend(node.children().rev()),
            _ => {}
        }
    }

    text
}

/// Extracts every `href` of every anchor, in document order
fn extract_raw_links(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(|href| href.to_string())
        .collect()
}

/// Collapses runs of whitespace into single spaces and trims the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncates to at most `max_chars` characters, never splitting a character
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].trim_end().to_string(),
        None => text.to_string(),
    }
}
