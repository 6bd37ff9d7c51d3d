//! Crawl frontier: an insertion-ordered set of crawl targets

use crate::url::{canonical_form, parse_absolute};
use crate::UrlResult;
use std::collections::HashSet;
use url::Url;

/// An ordered set of URLs queued for one crawl pass
///
/// Members are deduplicated by canonical form, so `https://a.com/x/` and
/// `https://a.com/x?ref=1` count as the same target. The first spelling seen
/// is the one kept and fetched.
#[derive(Debug, Clone, Default)]
pub struct Frontier {
    targets: Vec<Url>,
    canonical: HashSet<String>,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parsed URL; returns false if a canonical-equal member exists
    pub fn insert(&mut self, url: Url) -> bool {
        let key = canonical_form(&url);
        if !self.canonical.insert(key) {
            return false;
        }
        self.targets.push(url);
        true
    }

    /// Parses and adds a URL string
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The URL was added
    /// * `Ok(false)` - A canonical-equal member already exists
    /// * `Err(UrlError)` - The string is not an absolute http(s) URL
    pub fn insert_str(&mut self, url_str: &str) -> UrlResult<bool> {
        Ok(self.insert(parse_absolute(url_str)?))
    }

    /// Returns true if a canonical-equal member exists
    pub fn contains(&self, url: &Url) -> bool {
        self.canonical.contains(&canonical_form(url))
    }

    /// Returns true if the canonical key is already a member
    pub fn contains_canonical(&self, canonical: &str) -> bool {
        self.canonical.contains(canonical)
    }

    /// Keeps the first `cap` members by discovery order
    pub fn truncate(&mut self, cap: usize) {
        if self.targets.len() <= cap {
            return;
        }
        for dropped in self.targets.drain(cap..) {
            self.canonical.remove(&canonical_form(&dropped));
        }
    }

    /// Returns the number of members
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Returns whether the frontier is empty
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Iterates members in discovery order
    pub fn iter(&self) -> impl Iterator<Item = &Url> {
        self.targets.iter()
    }

    /// Members as owned URL strings, in discovery order
    pub fn to_strings(&self) -> Vec<String> {
        self.targets.iter().map(|u| u.to_string()).collect()
    }
}

impl FromIterator<Url> for Frontier {
    fn from_iter<T: IntoIterator<Item = Url>>(iter: T) -> Self {
        let mut frontier = Frontier::new();
        for url in iter {
            frontier.insert(url);
        }
        frontier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_by_canonical_form() {
        let mut frontier = Frontier::new();
        assert!(frontier.insert_str("https://a.com/x").unwrap());
        assert!(!frontier.insert_str("https://a.com/x/").unwrap());
        assert!(!frontier.insert_str("https://a.com/x?utm=1#top").unwrap());
        assert_eq!(frontier.len(), 1);
        assert_eq!(frontier.to_strings(), vec!["https://a.com/x"]);
    }

    #[test]
    fn test_first_spelling_is_kept() {
        let mut frontier = Frontier::new();
        frontier.insert_str("https://a.com/x/").unwrap();
        frontier.insert_str("https://a.com/x").unwrap();
        assert_eq!(frontier.to_strings(), vec!["https://a.com/x/"]);
    }

    #[test]
    fn test_cap_keeps_first_by_discovery_order() {
        let mut frontier = Frontier::new();
        for i in 0..80 {
            frontier
                .insert_str(&format!("https://a.com/page-{}", i))
                .unwrap();
        }
        frontier.truncate(50);

        assert_eq!(frontier.len(), 50);
        let kept = frontier.to_strings();
        assert_eq!(kept.first().unwrap(), "https://a.com/page-0");
        assert_eq!(kept.last().unwrap(), "https://a.com/page-49");
        assert!(!frontier.contains(&Url::parse("https://a.com/page-50").unwrap()));
    }

    #[test]
    fn test_truncate_larger_than_len_is_noop() {
        let mut frontier = Frontier::new();
        frontier.insert_str("https://a.com/").unwrap();
        frontier.truncate(50);
        assert_eq!(frontier.len(), 1);
    }

    #[test]
    fn test_contains_uses_canonical_form() {
        let mut frontier = Frontier::new();
        frontier.insert_str("https://a.com/about").unwrap();
        assert!(frontier.contains(&Url::parse("https://A.com/about/").unwrap()));
        assert!(frontier.contains_canonical("https://a.com/about"));
    }

    #[test]
    fn test_rejects_relative() {
        let mut frontier = Frontier::new();
        assert!(frontier.insert_str("/about").is_err());
        assert!(frontier.is_empty());
    }
}
