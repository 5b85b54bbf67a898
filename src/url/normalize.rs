use crate::UrlError;
use url::Url;

/// Query parameters that only carry tracking information
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid"];

/// Normalizes a crawl seed into an absolute URL
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace; reject an empty seed
/// 2. Prefix `https://` when the seed carries no `scheme://`
///    (a bare domain such as `example.com`, `httpbin.org` or `example.com/docs`)
/// 3. Parse the URL; reject if malformed
/// 4. Accept only HTTP and HTTPS schemes with a host
///
/// # Examples
///
/// ```
/// use knowledge_crawler::url::normalize_seed;
///
/// let url = normalize_seed("example.com").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/");
/// ```
pub fn normalize_seed(seed: &str) -> Result<Url, UrlError> {
    let seed = seed.trim();
    if seed.is_empty() {
        return Err(UrlError::Empty);
    }

    let with_scheme = if seed.contains("://") {
        seed.to_string()
    } else {
        format!("https://{}", seed)
    };

    let url = Url::parse(&with_scheme).map_err(|e| UrlError::Parse(e.to_string()))?;

    // Both schemes are accepted so plain-HTTP sites (and local mock servers) work
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlError::MissingDomain),
    }
}

/// Canonicalizes a discovered link before it is queued or recorded
///
/// Removes tracking query parameters (`utm_*`, `fbclid`, `gclid`, `mc_eid`)
/// and drops an empty query string. Host lowercasing, default-port removal and
/// dot-segment resolution already happen when the URL is parsed. Remaining
/// parameters keep their original order.
pub fn canonicalize_url(url: &Url) -> Url {
    let mut url = url.clone();

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    url
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
