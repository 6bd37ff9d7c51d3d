//! WebDriver-backed browser service
//!
//! Each session is a fresh WebDriver session against the configured
//! endpoint. Hosted automation providers receive their credentials as a
//! vendor capability block.

use crate::config::BrowserConfig;
use crate::crawler::browser::{BrowserService, BrowserSession, FetchError};
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use serde_json::{json, Map, Value};

/// Vendor capability key carrying the provider credentials
const VENDOR_CAPABILITY: &str = "automation:options";

/// Browser service that opens WebDriver sessions
pub struct WebDriverBrowser {
    webdriver_url: String,
    capabilities: Map<String, Value>,
}

impl WebDriverBrowser {
    /// Creates a new browser service from configuration
    pub fn new(config: &BrowserConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            capabilities: session_capabilities(config),
        }
    }

    /// Returns the WebDriver endpoint sessions are opened against
    pub fn webdriver_url(&self) -> &str {
        &self.webdriver_url
    }
}

/// Builds the capabilities requested for every new session
fn session_capabilities(config: &BrowserConfig) -> Map<String, Value> {
    let mut capabilities = Map::new();
    capabilities.insert("browserName".to_string(), json!("chrome"));
    capabilities.insert(
        "goog:chromeOptions".to_string(),
        json!({ "args": ["--headless=new", "--disable-gpu", "--no-sandbox"] }),
    );
    capabilities.insert(
        VENDOR_CAPABILITY.to_string(),
        json!({
            "apiKey": config.api_key,
            "projectId": config.project_id,
        }),
    );
    capabilities
}

#[async_trait]
impl BrowserService for WebDriverBrowser {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>, FetchError> {
        let mut builder = ClientBuilder::native();
        builder.capabilities(self.capabilities.clone());

        let client = builder
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| FetchError::Session(format!("{}: {}", self.webdriver_url, e)))?;

        tracing::trace!("Opened WebDriver session at {}", self.webdriver_url);
        Ok(Box::new(WebDriverSession { client, url: None }))
    }
}

/// One WebDriver session
struct WebDriverSession {
    client: Client,
    url: Option<String>,
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<(), FetchError> {
        self.client
            .goto(url)
            .await
            .map_err(|e| FetchError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        self.url = Some(url.to_string());
        Ok(())
    }

    async fn evaluate(&mut self, script: &str) -> Result<Value, FetchError> {
        self.client
            .execute(script, Vec::new())
            .await
            .map_err(|e| FetchError::Extraction {
                url: self.url.clone().unwrap_or_default(),
                message: e.to_string(),
            })
    }

    async fn close(self: Box<Self>) -> Result<(), FetchError> {
        self.client
            .close()
            .await
            .map_err(|e| FetchError::Session(format!("close failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_carry_credentials() {
        let config = BrowserConfig {
            api_key: "bb-key".to_string(),
            project_id: "proj-1".to_string(),
            webdriver_url: "http://localhost:4444".to_string(),
        };

        let capabilities = session_capabilities(&config);

        assert_eq!(capabilities["browserName"], "chrome");
        assert_eq!(capabilities[VENDOR_CAPABILITY]["apiKey"], "bb-key");
        assert_eq!(capabilities[VENDOR_CAPABILITY]["projectId"], "proj-1");
        assert!(capabilities["goog:chromeOptions"]["args"]
            .as_array()
            .unwrap()
            .iter()
            .any(|arg| arg == "--headless=new"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_session_error() {
        let browser = WebDriverBrowser::new(&BrowserConfig {
            api_key: "bb-key".to_string(),
            project_id: "proj-1".to_string(),
            webdriver_url: "http://127.0.0.1:9".to_string(),
        });

        let err = browser.open_session().await.err().unwrap();
        assert!(matches!(err, FetchError::Session(_)));
    }
}
