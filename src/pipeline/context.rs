//! Application context shared by every stage of a job
//!
//! The context is built once at process entry from a validated
//! configuration and passed by reference into the pipeline.

use crate::classify::{Classifier, GenerationService, OpenAiClient};
use crate::config::Config;
use crate::crawler::{
    BatchScheduler, BrowserService, FirecrawlClient, MapOptions, MappingService, PageFetcher,
    RetryPolicy, SiteMapper, WebDriverBrowser,
};
use crate::output::SummaryRewriter;
use crate::url::{extract_domain, parse_absolute, ScopeFilter};
use crate::ScrollError;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Handles to the external services a job talks to
#[derive(Clone)]
pub struct Services {
    pub mapping: Arc<dyn MappingService>,
    pub browser: Arc<dyn BrowserService>,
    pub generation: Arc<dyn GenerationService>,
}

impl Services {
    /// Builds the reference HTTP and WebDriver clients from configuration
    pub fn from_config(config: &Config) -> Result<Self, ScrollError> {
        Ok(Self {
            mapping: Arc::new(FirecrawlClient::new(&config.mapping)?),
            browser: Arc::new(WebDriverBrowser::new(&config.browser)),
            generation: Arc::new(OpenAiClient::new(&config.generation)?),
        })
    }
}

/// Everything a job needs: configuration, its hash, the root URL and services
pub struct AppContext {
    config: Config,
    config_hash: String,
    root: Url,
    services: Services,
    classifier: Classifier,
}

impl AppContext {
    /// Creates a context from a validated configuration and explicit services
    ///
    /// # Returns
    ///
    /// * `Ok(AppContext)` - Ready to run jobs
    /// * `Err(ScrollError)` - The root URL is not an absolute http(s) URL, or
    ///   the page schema failed to build
    pub fn new(config: Config, config_hash: String, services: Services) -> Result<Self, ScrollError> {
        let root = parse_absolute(&config.job.root_url)?;
        let classifier = Classifier::new(
            Arc::clone(&services.generation),
            ScopeFilter::new(root.clone(), config.job.exclude_paths.clone()),
            config.job.instructions.clone(),
            config.generation.max_input_chars,
            retry_policy(&config),
        )?;
        Ok(Self {
            config,
            config_hash,
            root,
            services,
            classifier,
        })
    }

    /// Creates a context backed by the reference service clients
    pub fn from_config(config: Config, config_hash: String) -> Result<Self, ScrollError> {
        let services = Services::from_config(&config)?;
        Self::new(config, config_hash, services)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_hash(&self) -> &str {
        &self.config_hash
    }

    /// The parsed root URL
    pub fn root(&self) -> &Url {
        &self.root
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Name of the persisted item: the configured name, else the root host
    pub fn item_name(&self) -> String {
        self.config
            .job
            .item_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| extract_domain(&self.root))
            .unwrap_or_else(|| self.root.to_string())
    }

    /// Retry policy shared by fetches and generation calls
    pub fn retry_policy(&self) -> RetryPolicy {
        retry_policy(&self.config)
    }

    /// Scheduler for both fetch passes
    pub fn fetch_scheduler(&self) -> BatchScheduler {
        BatchScheduler::new(
            self.config.crawler.max_concurrent_pages_open as usize,
            Duration::from_millis(self.config.crawler.batch_interval),
        )
    }

    /// Scheduler for classification calls
    pub fn classify_scheduler(&self) -> BatchScheduler {
        BatchScheduler::new(
            self.config.generation.concurrency as usize,
            Duration::from_millis(self.config.generation.batch_interval),
        )
    }

    pub fn site_mapper(&self) -> SiteMapper {
        SiteMapper::new(
            Arc::clone(&self.services.mapping),
            MapOptions {
                limit: self.config.crawler.map_limit,
                include_sitemap: true,
            },
            self.config.crawler.max_primary_pages,
        )
    }

    pub fn page_fetcher(&self) -> PageFetcher {
        PageFetcher::new(
            Arc::clone(&self.services.browser),
            self.retry_policy(),
            Duration::from_millis(self.config.crawler.fetch_timeout),
        )
    }

    /// The page classifier, built once with the context
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// The summary rewriter, if the rewrite pass is enabled
    pub fn summary_rewriter(&self) -> Option<SummaryRewriter> {
        self.config.generation.rewrite_summary.then(|| {
            SummaryRewriter::new(Arc::clone(&self.services.generation), self.retry_policy())
        })
    }
}

fn retry_policy(config: &Config) -> RetryPolicy {
    RetryPolicy::from_millis(config.crawler.retry_attempts, &config.crawler.retry_delays)
}
