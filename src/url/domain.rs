use url::Url;

/// Extracts the host from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_scroll::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true if both URLs share the same host
///
/// Ports and schemes are ignored; `www.` is treated as a distinct host.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_scroll::url::same_host;
///
/// let a = Url::parse("https://example.com/a").unwrap();
/// let b = Url::parse("http://Example.com/b").unwrap();
/// let c = Url::parse("https://blog.example.com/").unwrap();
/// assert!(same_host(&a, &b));
/// assert!(!same_host(&a, &c));
/// ```
pub fn same_host(a: &Url, b: &Url) -> bool {
    match (extract_domain(a), extract_domain(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_domain() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("https://example.com:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_mixed_case() {
        let url = Url::parse("https://Example.COM/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_same_host_ignores_path_and_query() {
        let a = Url::parse("https://example.com/a?x=1").unwrap();
        let b = Url::parse("https://example.com/b/c#d").unwrap();
        assert!(same_host(&a, &b));
    }

    #[test]
    fn test_subdomain_is_different_host() {
        let a = Url::parse("https://example.com/").unwrap();
        let b = Url::parse("https://www.example.com/").unwrap();
        assert!(!same_host(&a, &b));
    }

    #[test]
    fn test_other_domain() {
        let a = Url::parse("https://example.com/").unwrap();
        let b = Url::parse("https://other.org/").unwrap();
        assert!(!same_host(&a, &b));
    }
}
