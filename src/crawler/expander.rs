//! Link expansion: derives the secondary frontier from the primary pass

use crate::crawler::fetcher::PageResult;
use crate::crawler::frontier::Frontier;
use crate::url::{canonical_form, parse_absolute, same_host};
use std::collections::HashSet;
use url::Url;

/// Result of expanding the primary pass
#[derive(Debug, Clone, Default)]
pub struct Expansion {
    /// Targets for the secondary pass
    pub frontier: Frontier,

    /// Canonical form of every well-formed page link observed, on any host
    pub seen_links: HashSet<String>,
}

/// Builds the secondary frontier from the primary frontier's results
///
/// Every `pages` link of every primary result is considered, in result
/// order then link order. A link becomes a secondary target when it parses
/// as an absolute http(s) URL, is not canonical-equal to a primary member,
/// and lives on the root host. The frontier is capped at `cap`.
///
/// Crawl depth is fixed: secondary results are never expanded further.
pub fn expand(primary: &Frontier, results: &[PageResult], root: &Url, cap: usize) -> Expansion {
    let mut expansion = Expansion::default();
    let mut malformed = 0usize;

    for link in results.iter().flat_map(|result| result.pages.iter()) {
        let Ok(url) = parse_absolute(link) else {
            malformed += 1;
            continue;
        };

        let canonical = canonical_form(&url);
        let already_primary = primary.contains_canonical(&canonical);
        expansion.seen_links.insert(canonical);

        if already_primary || !same_host(root, &url) {
            continue;
        }
        expansion.frontier.insert(url);
    }

    let unique = expansion.frontier.len();
    expansion.frontier.truncate(cap);

    tracing::info!(
        "Expanded {} primary results: {} links seen, {} malformed, {} new same-site pages, {} kept",
        results.len(),
        expansion.seen_links.len(),
        malformed,
        unique,
        expansion.frontier.len()
    );

    expansion
}
