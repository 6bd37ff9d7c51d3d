use crate::UrlError;
use url::Url;

/// Parses an absolute HTTP(S) URL
///
/// # Arguments
///
/// * `url_str` - The URL string to parse
///
/// # Returns
///
/// * `Ok(Url)` - The parsed URL
/// * `Err(UrlError)` - The string is not an absolute http(s) URL with a host
pub fn parse_absolute(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}

/// Reduces a URL to its canonical form
///
/// The canonical form is used for deduplication and membership checks
/// between frontiers. It keeps only scheme, host (with a non-default port)
/// and path.
///
/// # Canonicalization Steps
///
/// 1. Parse the URL; reject if malformed or not http(s)
/// 2. Lowercase the host (done by the URL parser)
/// 3. Collapse duplicate slashes and dot segments in the path
/// 4. Strip the trailing slash (the root path becomes empty)
/// 5. Drop query and fragment
///
/// Canonicalization is idempotent.
///
/// # Examples
///
/// ```
/// use sumi_scroll::url::canonicalize;
///
/// assert_eq!(canonicalize("https://a.com/x/").unwrap(), "https://a.com/x");
/// assert_eq!(canonicalize("https://A.com/x?q=1#top").unwrap(), "https://a.com/x");
/// assert_eq!(canonicalize("https://a.com/").unwrap(), "https://a.com");
/// ```
pub fn canonicalize(url_str: &str) -> Result<String, UrlError> {
    let url = parse_absolute(url_str)?;
    Ok(canonical_form(&url))
}

/// Canonical form of an already parsed URL
pub fn canonical_form(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_lowercase();
    let port = url.port().map(|p| format!(":{}", p)).unwrap_or_default();
    format!(
        "{}://{}{}{}",
        url.scheme(),
        host,
        port,
        normalize_path(url.path())
    )
}

/// Normalizes a URL path by removing dot segments, empty segments and the
/// trailing slash
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return String::new();
    }

    format!("/{}", segments.join("/"))
}
