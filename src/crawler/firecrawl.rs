//! HTTP client for a Firecrawl-compatible map endpoint

use crate::config::MappingConfig;
use crate::crawler::mapper::{MapOptions, MappingError, MappingService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Mapping service backed by `POST {endpoint}/v2/map`
pub struct FirecrawlClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct MapRequest<'a> {
    url: &'a str,
    limit: u32,
    sitemap: &'static str,
}

#[derive(Debug, Deserialize)]
struct MapResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    links: Vec<MapLink>,
    #[serde(default)]
    error: Option<String>,
}

/// Older responses list bare strings, newer ones objects with a `url`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MapLink {
    Plain(String),
    Entry { url: String },
}

impl MapLink {
    fn into_url(self) -> String {
        match self {
            Self::Plain(url) | Self::Entry { url } => url,
        }
    }
}

impl FirecrawlClient {
    /// Creates a new client
    ///
    /// # Returns
    ///
    /// * `Ok(FirecrawlClient)` - Successfully built client
    /// * `Err(reqwest::Error)` - Failed to build the underlying HTTP client
    pub fn new(config: &MappingConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl MappingService for FirecrawlClient {
    async fn map(&self, url: &str, options: MapOptions) -> Result<Vec<String>, MappingError> {
        let request = MapRequest {
            url,
            limit: options.limit,
            sitemap: if options.include_sitemap {
                "include"
            } else {
                "skip"
            },
        };

        let response = self
            .client
            .post(format!("{}/v2/map", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| MappingError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MappingError::Rejected {
                url: url.to_string(),
                message: format!("HTTP {}: {}", status.as_u16(), body),
            });
        }

        let body: MapResponse = response
            .json()
            .await
            .map_err(|e| MappingError::Request(format!("invalid map response: {}", e)))?;

        if !body.success {
            return Err(MappingError::Rejected {
                url: url.to_string(),
                message: body.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        Ok(body.links.into_iter().map(MapLink::into_url).collect())
    }
}
