use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use knowledge_crawler::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true when both URLs share the same hostname
///
/// Scheme and port are ignored: `http://example.com/a` and
/// `https://example.com:8443/b` are the same site for traversal purposes.
/// A URL without a host never matches.
pub fn same_host(url: &Url, origin: &Url) -> bool {
    match (extract_domain(url), extract_domain(origin)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
