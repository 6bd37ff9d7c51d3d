//! Site mapper: seeds the primary frontier from a mapping service
//!
//! The mapper asks an external service for every URL it knows on the site,
//! keeps same-host page links, and caps the result.

use crate::crawler::frontier::Frontier;
use crate::url::{is_file_link, parse_absolute, same_host};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Errors that can occur while mapping a site
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Mapping service request failed: {0}")]
    Request(String),

    #[error("Mapping service rejected {url}: {message}")]
    Rejected { url: String, message: String },

    #[error("Mapping service returned no links for {0}")]
    NoLinks(String),

    #[error("No same-site page links left for {0} after filtering")]
    NothingToCrawl(String),
}

/// Options passed to the mapping service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapOptions {
    /// Maximum number of links the service should discover
    pub limit: u32,

    /// Whether the service should consult the site's sitemap
    pub include_sitemap: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            limit: 1000,
            include_sitemap: true,
        }
    }
}

/// External service that lists the URLs of a site
#[async_trait]
pub trait MappingService: Send + Sync {
    /// Returns every link the service discovered for `url`, in its order
    async fn map(&self, url: &str, options: MapOptions) -> Result<Vec<String>, MappingError>;
}

/// Builds the primary frontier for a root URL
pub struct SiteMapper {
    service: Arc<dyn MappingService>,
    options: MapOptions,
    max_pages: usize,
}

impl SiteMapper {
    /// Creates a new site mapper
    ///
    /// # Arguments
    ///
    /// * `service` - The mapping service to query
    /// * `options` - Discovery limit and sitemap flag forwarded to the service
    /// * `max_pages` - Cap on the resulting frontier
    pub fn new(service: Arc<dyn MappingService>, options: MapOptions, max_pages: usize) -> Self {
        Self {
            service,
            options,
            max_pages,
        }
    }

    /// Maps the site rooted at `root`
    ///
    /// # Filtering Steps
    ///
    /// 1. Drop malformed or non-http(s) links
    /// 2. Keep only links on the root's host
    /// 3. Drop links to files (see [`crate::url::is_file_link`])
    /// 4. Deduplicate by canonical form
    /// 5. Keep the first `max_pages` by discovery order
    ///
    /// # Returns
    ///
    /// * `Ok(Frontier)` - The primary frontier (never empty)
    /// * `Err(MappingError)` - The service failed or nothing crawlable came back
    pub async fn map(&self, root: &Url) -> Result<Frontier, MappingError> {
        tracing::info!("Mapping {} (limit {})", root, self.options.limit);

        let links = self.service.map(root.as_str(), self.options).await?;
        if links.is_empty() {
            return Err(MappingError::NoLinks(root.to_string()));
        }

        let discovered = links.len();
        let mut frontier = Frontier::new();
        let mut off_site = 0usize;
        let mut files = 0usize;

        for link in links {
            let Ok(url) = parse_absolute(&link) else {
                tracing::debug!("Skipping malformed mapped link: {}", link);
                continue;
            };
            if !same_host(root, &url) {
                off_site += 1;
                continue;
            }
            if is_file_link(url.as_str()) {
                files += 1;
                continue;
            }
            frontier.insert(url);
        }

        let unique = frontier.len();
        frontier.truncate(self.max_pages);

        tracing::info!(
            "Mapped {}: {} discovered, {} off-site, {} files, {} unique pages, {} kept",
            root,
            discovered,
            off_site,
            files,
            unique,
            frontier.len()
        );

        if frontier.is_empty() {
            return Err(MappingError::NothingToCrawl(root.to_string()));
        }

        Ok(frontier)
    }
}
