//! Crawler module for site mapping and page fetching
//!
//! This module contains the crawl side of a job, including:
//! - Seeding the primary frontier from a mapping service
//! - Fetching rendered pages through browser-automation sessions
//! - HTML parsing and link extraction
//! - Rate-limited batch scheduling and retries
//! - Deriving the secondary frontier from the primary pass

mod browser;
mod expander;
mod fetcher;
mod firecrawl;
mod frontier;
mod mapper;
mod parser;
mod retry;
mod scheduler;
mod webdriver;

pub use browser::{BrowserService, BrowserSession, FetchError};
pub use expander::{expand, Expansion};
pub use fetcher::{PageFetcher, PageResult, EXTRACTOR_SCRIPT};
pub use firecrawl::FirecrawlClient;
pub use frontier::Frontier;
pub use mapper::{MapOptions, MappingError, MappingService, SiteMapper};
pub use parser::{extract_page, ExtractedPage};
pub use retry::{RetryPolicy, Retryable};
pub use scheduler::{BatchScheduler, Cancelled};
pub use webdriver::WebDriverBrowser;
