// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare API v4 implementation of
// [`DnsProvider`].
//
// ## Scope
//
// - One logical API request per trait call; list calls follow pagination
// - Every response is decoded through the v4 envelope
//   (`success`, `errors`, `messages`, `result`, `result_info`)
// - No retries, backoff or caching. Those belong to the engine
//
// ## Security Requirements
//
// - Keys and tokens NEVER appear in logs or `Debug` output
// - Every request carries the same configured credentials
//
// ## API Reference
//
// - List Zones: GET `/zones?name=...&page=...&per_page=...`
// - Zone Details: GET `/zones/:zone_id`
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=...`
// - DNS Record Details: GET `/zones/:zone_id/dns_records/:record_id`
// - Patch DNS Record: PATCH `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use cfddns_core::config::{Credentials, ProviderConfig};
use cfddns_core::error::ProviderErrorDetail;
use cfddns_core::traits::{DnsProvider, Record, RecordType, Zone};
use cfddns_core::{Error, Result};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Page size used when listing zones
pub const ZONES_PER_PAGE: u32 = 50;

/// Page size used when listing DNS records
pub const RECORDS_PER_PAGE: u32 = 100;

/// Cloudflare API v4 response envelope
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ProviderErrorDetail>,
    #[serde(default)]
    messages: Vec<serde_json::Value>,
    result: Option<T>,
    #[serde(default)]
    result_info: Option<ResultInfo>,
}

/// Pagination block of list responses
#[derive(Debug, Default, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    total_pages: Option<u32>,
    #[serde(default)]
    count: u32,
    #[serde(default)]
    total_count: Option<u32>,
}

/// Just the error list, for decoding failure bodies leniently
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ProviderErrorDetail>,
}

/// Cloudflare DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, [`update_record`](DnsProvider::update_record)
/// fetches the record, logs the PATCH it would send and returns the record
/// with the new content. Nothing is modified on Cloudflare.
///
/// # Security
///
/// The Debug implementation does NOT expose the key or token.
pub struct CloudflareClient {
    /// ⚠️ NEVER log these values
    credentials: Credentials,

    /// API base URL without trailing slash
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: read from the API but never modify records
    dry_run: bool,
}

// Custom Debug implementation that hides the credentials
impl std::fmt::Debug for CloudflareClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareClient")
            .field("credentials", &self.credentials)
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareClient {
    /// Create a live client against the public API with default settings
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::from_config(&ProviderConfig::new(credentials))
    }

    /// Create a client from provider configuration
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for empty credentials, a bad base URL, or when the
    /// HTTP client can't be built.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("cfddns/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        if config.dry_run {
            tracing::warn!("Cloudflare client running in DRY-RUN mode - no changes will be made");
        }

        Ok(Self {
            credentials: config.credentials.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client,
            dry_run: config.dry_run,
        })
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Start a request with the auth headers applied
    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.api_base, path);
        let builder = self.client.request(method, url);

        match &self.credentials {
            Credentials::GlobalKey { email, key } => builder
                .header("X-Auth-Email", email)
                .header("X-Auth-Key", key),
            Credentials::Token { token } => builder.bearer_auth(token),
        }
    }

    /// Send a request and decode the envelope
    ///
    /// Anything but HTTP 200 with `success: true` is an
    /// [`Error::Provider`].
    async fn send<T: DeserializeOwned>(&self, builder: reqwest::RequestBuilder) -> Result<ApiResponse<T>> {
        let response = builder
            .send()
            .await
            .map_err(|e| Error::transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::transport(format!("Failed to read response: {}", e)))?;

        if status != StatusCode::OK {
            let errors = serde_json::from_slice::<ErrorBody>(&body)
                .map(|b| b.errors)
                .unwrap_or_default();

            match status.as_u16() {
                401 | 403 => tracing::warn!(
                    status = status.as_u16(),
                    "Authentication failed: invalid credentials or insufficient permissions"
                ),
                429 => tracing::warn!(status = status.as_u16(), "Rate limit exceeded"),
                500..=599 => tracing::warn!(status = status.as_u16(), "Cloudflare server error"),
                _ => tracing::debug!(status = status.as_u16(), "Cloudflare request rejected"),
            }

            return Err(Error::provider(status.as_u16(), errors));
        }

        let envelope: ApiResponse<T> = serde_json::from_slice(&body)?;
        if !envelope.success {
            return Err(Error::provider(status.as_u16(), envelope.errors));
        }

        if !envelope.messages.is_empty() {
            tracing::debug!(messages = ?envelope.messages, "Cloudflare API messages");
        }

        Ok(envelope)
    }

    /// Send a request whose envelope must carry a result
    async fn fetch_one<T: DeserializeOwned>(&self, builder: reqwest::RequestBuilder) -> Result<T> {
        self.send::<T>(builder).await?.result.ok_or_else(|| {
            Error::provider(
                StatusCode::OK.as_u16(),
                vec![ProviderErrorDetail::new(0, "Response has no result")],
            )
        })
    }

    /// GET every page of a list endpoint
    async fn fetch_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        per_page: u32,
    ) -> Result<Vec<T>> {
        let mut items: Vec<T> = Vec::new();
        let mut page: u32 = 1;
        let per_page = per_page.to_string();

        loop {
            let page_param = page.to_string();
            let builder = self
                .request(Method::GET, path)
                .query(query)
                .query(&[("page", page_param.as_str()), ("per_page", per_page.as_str())]);

            let envelope: ApiResponse<Vec<T>> = self.send(builder).await?;
            let info = envelope.result_info.unwrap_or_default();
            let batch = envelope.result.unwrap_or_default();
            let batch_len = batch.len();
            items.extend(batch);

            let total_pages = info.total_pages.unwrap_or(1);
            tracing::debug!(
                path,
                page = info.page,
                total_pages,
                count = info.count,
                total_count = ?info.total_count,
                "Fetched page"
            );

            if page >= total_pages || batch_len == 0 {
                break;
            }
            page += 1;
        }

        Ok(items)
    }
}

#[async_trait]
impl DnsProvider for CloudflareClient {
    async fn list_zones(&self, name: Option<&str>) -> Result<Vec<Zone>> {
        tracing::debug!(name = ?name, "Listing zones");
        let query: Vec<(&str, &str)> = name.map(|n| vec![("name", n)]).unwrap_or_default();
        self.fetch_all("/zones", &query, ZONES_PER_PAGE).await
    }

    async fn get_zone(&self, zone_id: &str) -> Result<Zone> {
        tracing::debug!(zone_id, "Fetching zone");
        self.fetch_one(self.request(Method::GET, &format!("/zones/{}", zone_id)))
            .await
    }

    async fn list_records(&self, zone_id: &str, record_type: RecordType) -> Result<Vec<Record>> {
        tracing::debug!(zone_id, record_type = %record_type, "Listing DNS records");

        let mut records: Vec<Record> = self
            .fetch_all(
                &format!("/zones/{}/dns_records", zone_id),
                &[("type", record_type.as_str())],
                RECORDS_PER_PAGE,
            )
            .await?;

        for record in &mut records {
            if record.zone_id.is_empty() {
                record.zone_id = zone_id.to_string();
            }
        }
        Ok(records)
    }

    async fn update_record(&self, zone_id: &str, record_id: &str, content: &str) -> Result<Record> {
        let path = format!("/zones/{}/dns_records/{}", zone_id, record_id);
        let payload = serde_json::json!({ "content": content });

        if self.dry_run {
            let mut record: Record = self.fetch_one(self.request(Method::GET, &path)).await?;
            tracing::info!(
                zone_id,
                record = %record.name,
                "[DRY-RUN] Would send PATCH {} with payload: {}",
                path,
                payload
            );
            record.content = content.to_string();
            if record.zone_id.is_empty() {
                record.zone_id = zone_id.to_string();
            }
            return Ok(record);
        }

        tracing::debug!(zone_id, record_id, content, "Patching DNS record");
        let mut record: Record = self
            .fetch_one(self.request(Method::PATCH, &path).json(&payload))
            .await?;
        if record.zone_id.is_empty() {
            record.zone_id = zone_id.to_string();
        }
        Ok(record)
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}
