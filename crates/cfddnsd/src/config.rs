//! Environment configuration
//!
//! Reads the daemon settings from environment variables and turns them into
//! the core [`DdnsConfig`].

use anyhow::{Context, Result};
use cfddns_core::config::{Credentials, DdnsConfig};
use cfddns_core::traits::RecordType;
use std::env;
use tracing::Level;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Core engine configuration
    pub ddns: DdnsConfig,
    /// Webhook URLs notified after records change
    pub notification_urls: Vec<String>,
    /// Log level name
    pub log_level: String,
}

impl DaemonConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let auth_key = var("AUTH_KEY").context(
            "AUTH_KEY is required. Set it via: export AUTH_KEY=your_global_api_key_or_token",
        )?;

        // Without an account email the key is treated as a scoped API token
        let credentials = match var("EMAIL") {
            Some(email) => Credentials::global_key(email, auth_key),
            None => Credentials::token(auth_key),
        };

        let mut ddns = DdnsConfig::new(credentials)
            .with_zone_ids(split_list(var("ZONE_ID")))
            .with_zone_names(split_list(var("ZONE_NAME")))
            .with_record_ids(split_list(var("RECORD_ID")));

        if let Some(record_type) = var("RECORD_TYPE") {
            ddns.record_type = parse_record_type(&record_type)?;
        }

        if let Some(interval) = var("CHECK_INTERVAL") {
            ddns.ip_source.interval_secs = interval.parse().with_context(|| {
                format!("CHECK_INTERVAL must be a number of seconds. Got: {}", interval)
            })?;
        }

        if let Some(url) = var("IP_ECHO_URL") {
            ddns.ip_source.url = url;
        }

        ddns.provider.dry_run = match var("DDNS_MODE").map(|m| m.to_lowercase()) {
            None => false,
            Some(mode) if mode == "live" => false,
            Some(mode) if mode == "dry-run" => true,
            Some(mode) => anyhow::bail!(
                "DDNS_MODE '{}' is not valid. Valid modes: live, dry-run",
                mode
            ),
        };

        Ok(Self {
            ddns,
            notification_urls: split_list(var("NOTIFICATION_URLS")),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.ddns.zone_ids.is_empty() && self.ddns.zone_names.is_empty() {
            anyhow::bail!(
                "ZONE_ID or ZONE_NAME is required. \
                Set it via: export ZONE_NAME=example.com"
            );
        }

        self.ddns.validate()?;

        // Unsupported notification schemes are skipped by the notifier, not rejected here
        self.log_level()?;

        Ok(())
    }

    /// Parsed log level
    pub fn log_level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }
}

/// Split a comma-separated variable, dropping empty entries
fn split_list(value: Option<String>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_record_type(value: &str) -> Result<RecordType> {
    match RecordType::from(value.to_string()) {
        RecordType::Other(other) => anyhow::bail!(
            "RECORD_TYPE '{}' is not supported. Supported types: A, AAAA",
            other
        ),
        record_type => Ok(record_type),
    }
}
