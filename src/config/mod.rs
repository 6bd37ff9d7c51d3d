//! Configuration module for Sumi-Scroll
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sumi_scroll::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scroll.toml")).unwrap();
//! println!("Fetching {} pages per batch", config.crawler.max_concurrent_pages_open);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BrowserConfig, Config, CrawlerConfig, GenerationConfig, JobConfig, MappingConfig,
    OutputConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

// Re-export validation
pub use validation::validate;
