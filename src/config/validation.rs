use crate::config::types::{
    BrowserConfig, Config, CrawlerConfig, GenerationConfig, JobConfig, MappingConfig,
    OutputConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
///
/// Missing credentials are reported before anything else is looked at, so a
/// job without keys never gets as far as a network call.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_credentials(&config.mapping, &config.browser, &config.generation)?;
    validate_job_config(&config.job)?;
    validate_crawler_config(&config.crawler)?;
    validate_mapping_config(&config.mapping)?;
    validate_browser_config(&config.browser)?;
    validate_generation_config(&config.generation)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Checks every credential the pipeline needs
fn validate_credentials(
    mapping: &MappingConfig,
    browser: &BrowserConfig,
    generation: &GenerationConfig,
) -> Result<(), ConfigError> {
    let required = [
        ("mapping.api-key", &mapping.api_key),
        ("browser.api-key", &browser.api_key),
        ("browser.project-id", &browser.project_id),
        ("generation.api-key", &generation.api_key),
    ];

    for (key, value) in required {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingCredential(format!(
                "{} must be set",
                key
            )));
        }
    }

    Ok(())
}

/// Validates job configuration
fn validate_job_config(config: &JobConfig) -> Result<(), ConfigError> {
    validate_http_url("root-url", &config.root_url)?;

    if let Some(name) = &config.item_name {
        if name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "item-name cannot be empty when set".to_string(),
            ));
        }
    }

    for pattern in &config.exclude_paths {
        validate_path_pattern(pattern)?;
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_pages_open < 1 || config.max_concurrent_pages_open > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-pages-open must be between 1 and 100, got {}",
            config.max_concurrent_pages_open
        )));
    }

    if config.map_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "map-limit must be >= 1, got {}",
            config.map_limit
        )));
    }

    if config.max_primary_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-primary-pages must be >= 1, got {}",
            config.max_primary_pages
        )));
    }

    if config.fetch_timeout < 1000 {
        return Err(ConfigError::Validation(format!(
            "fetch-timeout must be >= 1000ms, got {}ms",
            config.fetch_timeout
        )));
    }

    if config.retry_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "retry-attempts must be >= 1, got {}",
            config.retry_attempts
        )));
    }

    if config.retry_attempts > 1 && config.retry_delays.is_empty() {
        return Err(ConfigError::Validation(
            "retry-delays cannot be empty when retry-attempts > 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates mapping service configuration
fn validate_mapping_config(config: &MappingConfig) -> Result<(), ConfigError> {
    validate_http_url("mapping.endpoint", &config.endpoint)
}

/// Validates browser service configuration
fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    validate_http_url("browser.webdriver-url", &config.webdriver_url)
}

/// Validates generation service configuration
fn validate_generation_config(config: &GenerationConfig) -> Result<(), ConfigError> {
    validate_http_url("generation.endpoint", &config.endpoint)?;

    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "generation.model cannot be empty".to_string(),
        ));
    }

    if config.max_input_chars < 1 {
        return Err(ConfigError::Validation(
            "generation.max-input-chars must be >= 1".to_string(),
        ));
    }

    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "generation.concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    for (key, path) in [
        ("summary-path", &config.summary_path),
        ("full-path", &config.full_path),
    ] {
        if path.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::Validation(format!(
                "{} cannot be empty when set",
                key
            )));
        }
    }

    Ok(())
}

/// Validates that a value is an absolute http(s) URL with a host
fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", key, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            key, value
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' has no host",
            key, value
        )));
    }

    Ok(())
}

/// Validates an exclusion path pattern
fn validate_path_pattern(pattern: &str) -> Result<(), ConfigError> {
    if !pattern.starts_with('/') {
        return Err(ConfigError::InvalidPattern(format!(
            "Exclude path '{}' must start with '/'",
            pattern
        )));
    }

    if pattern.contains(['?', '#']) {
        return Err(ConfigError::InvalidPattern(format!(
            "Exclude path '{}' cannot contain a query or fragment",
            pattern
        )));
    }

    Ok(())
}
