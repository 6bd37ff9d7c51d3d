//! Browser-automation service abstraction
//!
//! Every page fetch runs one full session lifecycle:
//! `open_session → navigate → evaluate (repeatable) → close`.
//! Sessions are never shared between concurrent fetches.

use crate::crawler::retry::Retryable;
use crate::crawler::scheduler::Cancelled;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while fetching a page through a browser session
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to open browser session: {0}")]
    Session(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Extraction on {url} failed: {message}")]
    Extraction { url: String, message: String },

    #[error("Fetching {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    #[error("Fetch cancelled")]
    Cancelled,
}

impl From<Cancelled> for FetchError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

/// An open automation session owned by a single fetch
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigates the session to `url` and waits for the page to load
    async fn navigate(&mut self, url: &str) -> Result<(), FetchError>;

    /// Evaluates a script in the page and returns its JSON result
    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value, FetchError>;

    /// Ends the session and releases its remote resources
    async fn close(self: Box<Self>) -> Result<(), FetchError>;
}

/// External service that hands out automation sessions
#[async_trait]
pub trait BrowserService: Send + Sync {
    /// Opens a fresh session
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>, FetchError>;
}
