//! Sumi-Scroll: a site mapper and content aggregator
//!
//! This crate maps a website in two crawl passes, fetches every page's rendered
//! content through a browser-automation service, classifies each page with a
//! structured-output generation service, and assembles the results into a
//! condensed summary index and a full markdown document.

pub mod classify;
pub mod config;
pub mod crawler;
pub mod output;
pub mod pipeline;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Scroll operations
#[derive(Debug, Error)]
pub enum ScrollError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mapping error: {0}")]
    Mapping(#[from] crawler::MappingError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Generation error: {0}")]
    Generation(#[from] classify::GenerationError),

    #[error("Schema error: {0}")]
    Schema(#[from] classify::SchemaError),

    #[error("Assembly error: {0}")]
    Assembly(#[from] output::AssemblyError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::JobState,
        to: state::JobState,
    },

    #[error("Job cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid path pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Sumi-Scroll operations
pub type Result<T> = std::result::Result<T, ScrollError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use classify::{ClassifiedPage, Tag};
pub use config::Config;
pub use crawler::{Frontier, PageResult};
pub use output::OutputDocument;
pub use pipeline::{run_job, AppContext, JobReport};
pub use state::JobState;
pub use url::{canonicalize, is_file_link, same_host, ScopeFilter};
