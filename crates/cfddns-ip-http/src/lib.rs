// # HTTP IP Source
//
// This crate provides an [`IpSource`] backed by a plain-text IP-echo service
// such as `https://api.ipify.org`: one GET, the body is the caller's address.
//
// The source does one lookup per call. Polling, change detection and backoff
// live in the core observer.

use cfddns_core::config::IpSourceConfig;
use cfddns_core::traits::{IpSource, IpVersion};
use cfddns_core::{Error, Result};

use std::net::IpAddr;
use std::time::Duration;

/// Default timeout for a single lookup
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP IP-echo source
#[derive(Debug, Clone)]
pub struct HttpIpSource {
    /// URL to fetch IP from
    url: String,

    /// Required address family (None = either)
    version: Option<IpVersion>,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `url`: URL to fetch IP from (e.g., "https://api.ipify.org")
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    /// Create with a custom request timeout
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cfddns/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            version: None,
            client,
        })
    }

    /// Create from configuration
    pub fn from_config(config: &IpSourceConfig) -> Result<Self> {
        config.validate()?;
        Self::with_timeout(config.url.clone(), config.timeout())
    }

    /// Only accept addresses of `version`
    pub fn with_version(mut self, version: IpVersion) -> Self {
        self.version = Some(version);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<IpAddr> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::transport(format!("Request to {} failed: {}", self.url, e)))?;

        if !response.status().is_success() {
            return Err(Error::ip_source(format!("HTTP error: {}", response.status())));
        }

        let ip_text = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("Failed to read response: {}", e)))?;

        let ip_text = ip_text.trim();

        let ip: IpAddr = ip_text
            .parse()
            .map_err(|_| Error::ip_source(format!("Invalid IP address: {:?}", ip_text)))?;

        if let Some(version) = self.version
            && IpVersion::of(&ip) != version
        {
            return Err(Error::ip_source(format!("Expected {:?} address, got: {}", version, ip)));
        }

        tracing::debug!(url = %self.url, %ip, "Fetched public IP");
        Ok(ip)
    }

    fn name(&self) -> &str {
        "http"
    }
}
