//! Webhook notifications
//!
//! POSTs a JSON document to every configured URL after a pass changed records:
//!
//! ```json
//! {
//!   "title": "cfddns: IP address changed",
//!   "message": "Your IP address has changed to ...",
//!   "ip": "203.0.113.7",
//!   "records": { "example.com": ["home.example.com"] }
//! }
//! ```
//!
//! Only `http://` and `https://` URLs are delivered. Other service URLs
//! (`smtp://`, `discord://`, ...) are logged by scheme and skipped.

use async_trait::async_trait;
use cfddns_core::traits::{Notifier, UpdatedRecords, format_message};
use cfddns_core::{Error, Result};
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, warn};

const TITLE: &str = "cfddns: IP address changed";

/// Default timeout for a single webhook call
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Notifier posting to a list of webhook URLs
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    urls: Vec<String>,
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// Build a notifier for the webhook URLs among `urls`
    pub fn new(urls: Vec<String>) -> Result<Self> {
        let urls: Vec<String> = urls
            .into_iter()
            .filter(|url| {
                let supported = is_webhook_url(url);
                if !supported {
                    // The rest of the URL may carry credentials
                    let scheme = url.split_once("://").map_or("unknown", |(scheme, _)| scheme);
                    warn!(%scheme, "Unsupported notification URL scheme, skipping");
                }
                supported
            })
            .collect();

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(concat!("cfddns/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { urls, client })
    }

    /// Number of URLs that will be notified
    pub fn url_count(&self) -> usize {
        self.urls.len()
    }

    async fn post(&self, url: &str, payload: &serde_json::Value) -> std::result::Result<(), String> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }
        Ok(())
    }
}

fn is_webhook_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, updated: &UpdatedRecords, new_ip: IpAddr) -> Result<()> {
        let payload = serde_json::json!({
            "title": TITLE,
            "message": format_message(updated, new_ip),
            "ip": new_ip.to_string(),
            "records": updated,
        });

        let mut failed = 0usize;
        for url in &self.urls {
            match self.post(url, &payload).await {
                Ok(()) => debug!(%url, "Webhook delivered"),
                Err(e) => {
                    warn!(%url, error = %e, "Webhook delivery failed");
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(Error::notification(format!(
                "{} of {} webhook(s) failed",
                failed,
                self.urls.len()
            )));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "webhook"
    }
}
