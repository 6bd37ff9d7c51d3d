//! Page fetcher built on a browser-automation service
//!
//! This module handles fetching one page's rendered content:
//! - Opening a dedicated automation session per fetch
//! - Navigating and evaluating the extractor script
//! - Always closing the session, including after failures
//! - Bounding each step of an attempt with a wall-clock timeout
//! - Retrying with a fixed delay schedule and substituting an empty result
//!   once the retries are exhausted

use crate::crawler::browser::{BrowserService, BrowserSession, FetchError};
use crate::crawler::parser::extract_page;
use crate::crawler::retry::RetryPolicy;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Script returning the rendered document as HTML
pub const EXTRACTOR_SCRIPT: &str = "return document.documentElement.outerHTML;";

/// Content of one fetched page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageResult {
    /// The URL that was fetched
    pub url: String,

    /// Visible text of the rendered page
    pub text: String,

    /// Outbound links to pages
    pub pages: Vec<String>,

    /// Outbound links to files
    pub files: Vec<String>,

    /// Image source URLs
    pub images: Vec<String>,
}

impl PageResult {
    /// The sentinel substituted when a fetch exhausted its retries
    pub fn empty(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Returns true if this is the empty sentinel
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
            && self.pages.is_empty()
            && self.files.is_empty()
            && self.images.is_empty()
    }
}

/// Fetches pages through a browser service with retries and a timeout
#[derive(Clone)]
pub struct PageFetcher {
    browser: Arc<dyn BrowserService>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl PageFetcher {
    /// Creates a new page fetcher
    ///
    /// # Arguments
    ///
    /// * `browser` - Service handing out automation sessions
    /// * `retry` - Retry policy applied to each fetch
    /// * `timeout` - Wall-clock budget for one attempt
    pub fn new(browser: Arc<dyn BrowserService>, retry: RetryPolicy, timeout: Duration) -> Self {
        Self {
            browser,
            retry,
            timeout,
        }
    }

    /// Fetches a page, never failing outward
    ///
    /// On exhausted retries (or cancellation) the failure is logged and the
    /// empty sentinel is returned so the pipeline keeps going.
    pub async fn fetch(&self, url: &str, cancel: &CancellationToken) -> PageResult {
        let outcome = self
            .retry
            .run_until_cancelled(url, cancel, move |_| self.fetch_once(url, cancel))
            .await;

        match outcome {
            Ok(page) => page,
            Err(FetchError::Cancelled) => {
                tracing::debug!("Fetch of {} cancelled", url);
                PageResult::empty(url)
            }
            Err(e) => {
                tracing::warn!("Giving up on {}: {}", url, e);
                PageResult::empty(url)
            }
        }
    }

    /// One full session lifecycle for `url`
    ///
    /// Opening the session and extracting the page are each bounded by the
    /// timeout and the cancellation token. Once a session is open it is
    /// closed whatever the extraction outcome.
    async fn fetch_once(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<PageResult, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        let base_url = Url::parse(url).map_err(|e| FetchError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let mut session = self
            .bounded(url, cancel, self.browser.open_session())
            .await?;
        let result = self
            .bounded(url, cancel, Self::extract(session.as_mut(), url, &base_url))
            .await;

        match tokio::time::timeout(self.timeout, session.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!("Failed to close session for {}: {}", url, e),
            Err(_) => tracing::warn!("Closing the session for {} timed out", url),
        }

        result
    }

    /// Runs one step of an attempt under the timeout and the token
    async fn bounded<T>(
        &self,
        url: &str,
        cancel: &CancellationToken,
        step: impl Future<Output = Result<T, FetchError>>,
    ) -> Result<T, FetchError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            result = tokio::time::timeout(self.timeout, step) => match result {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout {
                    url: url.to_string(),
                    seconds: self.timeout.as_secs(),
                }),
            },
        }
    }

    /// Navigates and extracts the page within an open session
    async fn extract(
        session: &mut dyn BrowserSession,
        url: &str,
        base_url: &Url,
    ) -> Result<PageResult, FetchError> {
        session.navigate(url).await?;

        let value = session.evaluate(EXTRACTOR_SCRIPT).await?;
        let html = value.as_str().ok_or_else(|| FetchError::Extraction {
            url: url.to_string(),
            message: format!("extractor returned {} instead of a string", value),
        })?;

        let extracted = extract_page(html, base_url);
        tracing::debug!(
            "Fetched {}: {} chars, {} pages, {} files, {} images",
            url,
            extracted.text.len(),
            extracted.pages.len(),
            extracted.files.len(),
            extracted.images.len()
        );

        Ok(PageResult {
            url: url.to_string(),
            text: extracted.text,
            pages: extracted.pages,
            files: extracted.files,
            images: extracted.images,
        })
    }
}
