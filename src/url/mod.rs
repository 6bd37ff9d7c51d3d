//! URL handling module for Sumi-Scroll
//!
//! This module provides canonicalization, host comparison, the page/file
//! extension partition, path pattern matching, and the crawl-scope filter.

mod domain;
mod extensions;
mod matcher;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, same_host};
pub use extensions::{is_file_link, partition_links, FILE_EXTENSIONS};
pub use matcher::matches_path;
pub use normalize::{canonical_form, canonicalize, parse_absolute};

use ::url::Url;

/// Inclusion filter deciding which pages are worth classifying
///
/// A URL is in scope when it lives on the root host and its path does not
/// fall under any of the excluded path patterns.
#[derive(Debug, Clone)]
pub struct ScopeFilter {
    root: Url,
    excluded_paths: Vec<String>,
}

impl ScopeFilter {
    /// Creates a scope filter for the given root URL
    ///
    /// # Arguments
    ///
    /// * `root` - The root URL of the site being mapped
    /// * `excluded_paths` - Path patterns (see [`matches_path`]) to keep out of scope
    pub fn new(root: Url, excluded_paths: Vec<String>) -> Self {
        Self {
            root,
            excluded_paths,
        }
    }

    /// Returns the root URL this filter is anchored to
    pub fn root(&self) -> &Url {
        &self.root
    }

    /// Returns true if the URL string is in scope
    ///
    /// Malformed URLs are never in scope.
    ///
    /// # Examples
    ///
    /// ```
    /// use sumi_scroll::url::ScopeFilter;
    /// use url::Url;
    ///
    /// let root = Url::parse("https://example.com").unwrap();
    /// let filter = ScopeFilter::new(root, vec!["/legal".to_string()]);
    ///
    /// assert!(filter.includes("https://example.com/about"));
    /// assert!(!filter.includes("https://example.com/legal/terms"));
    /// assert!(!filter.includes("https://other.com/about"));
    /// ```
    pub fn includes(&self, url_str: &str) -> bool {
        match parse_absolute(url_str) {
            Ok(url) => self.includes_url(&url),
            Err(_) => false,
        }
    }

    /// Returns true if the parsed URL is in scope
    pub fn includes_url(&self, url: &Url) -> bool {
        if !same_host(&self.root, url) {
            return false;
        }

        let path = url.path();
        !self
            .excluded_paths
            .iter()
            .any(|pattern| matches_path(pattern, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(excluded: &[&str]) -> ScopeFilter {
        ScopeFilter::new(
            Url::parse("https://example.com/").unwrap(),
            excluded.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_same_host_is_in_scope() {
        let filter = filter(&[]);
        assert!(filter.includes("https://example.com/"));
        assert!(filter.includes("https://example.com/services/cloud"));
    }

    #[test]
    fn test_other_host_is_out_of_scope() {
        let filter = filter(&[]);
        assert!(!filter.includes("https://other.com/"));
        assert!(!filter.includes("https://blog.example.com/post"));
    }

    #[test]
    fn test_excluded_paths() {
        let filter = filter(&["/legal", "/blog/*/comments"]);
        assert!(!filter.includes("https://example.com/legal"));
        assert!(!filter.includes("https://example.com/legal/imprint"));
        assert!(!filter.includes("https://example.com/blog/post/comments"));
        assert!(filter.includes("https://example.com/blog/post"));
        assert!(filter.includes("https://example.com/legality"));
    }

    #[test]
    fn test_malformed_is_out_of_scope() {
        let filter = filter(&[]);
        assert!(!filter.includes("not a url"));
        assert!(!filter.includes("mailto:someone@example.com"));
    }
}
