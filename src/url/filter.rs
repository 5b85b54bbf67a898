//! Same-site link filtering
//!
//! Turns the raw `href` values collected by the extractor into absolute,
//! canonical URLs the crawler may follow. Everything here is pure: no
//! network, no storage, no shared state.

use crate::url::domain::same_host;
use crate::url::normalize::canonicalize_url;
use std::collections::HashSet;
use url::Url;

/// Path extensions of images, archives, documents and media that are never crawled
pub const BINARY_EXTENSIONS: &[&str] = &[
    // images
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "svg", "ico", "tif", "tiff",
    // archives
    "zip", "tar", "gz", "tgz", "bz2", "xz", "rar", "7z",
    // documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "rtf",
    // media
    "mp3", "mp4", "avi", "mov", "wav", "webm", "mkv",
    // executables and disk images
    "exe", "dmg", "iso", "apk", "bin",
];

/// Returns true when the URL path ends in a known binary/document extension
///
/// The comparison is case-insensitive and only looks at the last path
/// segment, so query strings do not hide the extension.
pub fn is_binary_resource(url: &Url) -> bool {
    let last_segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    match last_segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            BINARY_EXTENSIONS.contains(&ext.as_str())
        }
        _ => false,
    }
}

/// Resolves raw hrefs into followable same-site URLs
///
/// # Filtering Rules
///
/// A resolved URL is discarded if:
/// - it cannot be parsed (relative to `base_url`) or is not HTTP(S)
/// - its hostname differs from `origin`'s hostname
/// - it carries a `#` fragment
/// - its path ends in a binary/document extension
///
/// Survivors are canonicalized and returned in order of first occurrence,
/// with duplicates collapsed.
pub fn filter_links(raw_links: &[String], base_url: &Url, origin: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for href in raw_links {
        let Some(url) = resolve_one(href, base_url, origin) else {
            continue;
        };

        let url = url.to_string();
        if seen.insert(url.clone()) {
            links.push(url);
        }
    }

    links
}

/// Resolves raw hrefs into URLs that are new to the current crawl run
///
/// Applies every rule of [`filter_links`] and additionally drops URLs already
/// present in `visited` or `queued`.
///
/// # Example
///
/// ```
/// use std::collections::HashSet;
/// use url::Url;
/// use knowledge_crawler::url::resolve_links;
///
/// let base = Url::parse("https://example.com/docs/").unwrap();
/// let raw = vec![
///     "/a".to_string(),
///     "intro".to_string(),
///     "#top".to_string(),
///     "guide.pdf".to_string(),
///     "https://other.com/x".to_string(),
/// ];
/// let visited: HashSet<String> = ["https://example.com/a".to_string()].into();
/// let links = resolve_links(&raw, &base, &base, &visited, &HashSet::new());
/// assert_eq!(links, vec!["https://example.com/docs/intro".to_string()]);
/// ```
pub fn resolve_links(
    raw_links: &[String],
    base_url: &Url,
    origin: &Url,
    visited: &HashSet<String>,
    queued: &HashSet<String>,
) -> Vec<String> {
    filter_links(raw_links, base_url, origin)
        .into_iter()
        .filter(|url| {
            let fresh = !visited.contains(url) && !queued.contains(url);
            if !fresh {
                tracing::trace!("Skipping already known link {}", url);
            }
            fresh
        })
        .collect()
}

/// Resolves and checks a single href
fn resolve_one(href: &str, base_url: &Url, origin: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let url = match base_url.join(href) {
        Ok(url) => url,
        Err(e) => {
            tracing::trace!("Discarding unparseable link {:?}: {}", href, e);
            return None;
        }
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    if !same_host(&url, origin) {
        tracing::trace!("Discarding cross-site link {}", url);
        return None;
    }

    if url.fragment().is_some() {
        return None;
    }

    if is_binary_resource(&url) {
        tracing::trace!("Discarding binary resource link {}", url);
        return None;
    }

    Some(canonicalize_url(&url))
}
