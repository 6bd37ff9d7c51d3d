use serde::Deserialize;

/// Main configuration structure for Sumi-Scroll
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub job: JobConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub mapping: MappingConfig,
    pub browser: BrowserConfig,
    pub generation: GenerationConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// What to map and how to summarize it
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    /// Root URL of the site to map
    #[serde(rename = "root-url")]
    pub root_url: String,

    /// Name of the persisted item (defaults to the root host)
    #[serde(rename = "item-name", default)]
    pub item_name: Option<String>,

    /// Free-text guidance passed to every summarization prompt
    #[serde(default)]
    pub instructions: String,

    /// Path patterns kept out of classification scope
    #[serde(rename = "exclude-paths", default)]
    pub exclude_paths: Vec<String>,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of pages fetched concurrently per batch
    #[serde(rename = "max-concurrent-pages-open", default = "default_concurrency")]
    pub max_concurrent_pages_open: u32,

    /// Minimum time between batch dispatches (milliseconds)
    #[serde(rename = "batch-interval", default = "default_batch_interval")]
    pub batch_interval: u64,

    /// Maximum number of links requested from the mapping service
    #[serde(rename = "map-limit", default = "default_map_limit")]
    pub map_limit: u32,

    /// Cap on the primary frontier
    #[serde(rename = "max-primary-pages", default = "default_frontier_cap")]
    pub max_primary_pages: usize,

    /// Cap on the secondary frontier
    #[serde(rename = "max-secondary-pages", default = "default_frontier_cap")]
    pub max_secondary_pages: usize,

    /// Wall-clock budget for one fetch attempt (milliseconds)
    #[serde(rename = "fetch-timeout", default = "default_fetch_timeout")]
    pub fetch_timeout: u64,

    /// Attempts per external call, including the first
    #[serde(rename = "retry-attempts", default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delays between attempts (milliseconds)
    #[serde(rename = "retry-delays", default = "default_retry_delays")]
    pub retry_delays: Vec<u64>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_pages_open: default_concurrency(),
            batch_interval: default_batch_interval(),
            map_limit: default_map_limit(),
            max_primary_pages: default_frontier_cap(),
            max_secondary_pages: default_frontier_cap(),
            fetch_timeout: default_fetch_timeout(),
            retry_attempts: default_retry_attempts(),
            retry_delays: default_retry_delays(),
        }
    }
}

/// Mapping service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MappingConfig {
    #[serde(rename = "api-key", default)]
    pub api_key: String,

    #[serde(default = "default_mapping_endpoint")]
    pub endpoint: String,
}

/// Browser-automation service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    #[serde(rename = "api-key", default)]
    pub api_key: String,

    #[serde(rename = "project-id", default)]
    pub project_id: String,

    /// WebDriver endpoint sessions are opened against
    #[serde(rename = "webdriver-url", default = "default_webdriver_url")]
    pub webdriver_url: String,
}

/// Generation service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    #[serde(rename = "api-key", default)]
    pub api_key: String,

    #[serde(default = "default_generation_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Page text is truncated to this many characters before submission
    #[serde(rename = "max-input-chars", default = "default_max_input_chars")]
    pub max_input_chars: usize,

    /// Number of pages classified concurrently per batch
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Minimum time between classification batches (milliseconds)
    #[serde(rename = "batch-interval", default)]
    pub batch_interval: u64,

    /// Whether to run the editorial rewrite over the summary index
    #[serde(rename = "rewrite-summary", default = "default_true")]
    pub rewrite_summary: bool,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database holding persisted items
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,

    /// Optional path the summary index is exported to
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,

    /// Optional path the full document is exported to
    #[serde(rename = "full-path", default)]
    pub full_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            summary_path: None,
            full_path: None,
        }
    }
}

fn default_concurrency() -> u32 {
    5
}

fn default_batch_interval() -> u64 {
    3000
}

fn default_map_limit() -> u32 {
    1000
}

fn default_frontier_cap() -> usize {
    50
}

fn default_fetch_timeout() -> u64 {
    60_000
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delays() -> Vec<u64> {
    vec![1000, 5000, 10_000]
}

fn default_mapping_endpoint() -> String {
    "https://api.firecrawl.dev".to_string()
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_generation_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_input_chars() -> usize {
    50_000
}

fn default_database_path() -> String {
    "./sumi-scroll.db".to_string()
}

fn default_true() -> bool {
    true
}
