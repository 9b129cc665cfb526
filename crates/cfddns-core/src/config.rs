//! Configuration types for the engine
//!
//! This module defines all configuration structures used throughout the crate.
//! Loading them (environment, files) is the job of the embedding binary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::traits::RecordType;

/// Default Cloudflare API base URL
pub const DEFAULT_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default IP-echo service
pub const DEFAULT_IP_ECHO_URL: &str = "https://api.ipify.org";

/// Main engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Zone IDs to manage (takes precedence over `zone_names`)
    #[serde(default)]
    pub zone_ids: Vec<String>,

    /// Zone names to resolve when no zone IDs are configured
    #[serde(default)]
    pub zone_names: Vec<String>,

    /// Record ID allow-list; empty means every address record in the zones
    #[serde(default)]
    pub record_ids: Vec<String>,

    /// Address record type to manage
    #[serde(default = "default_record_type")]
    pub record_type: RecordType,

    /// Public IP lookup configuration
    #[serde(default)]
    pub ip_source: IpSourceConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl DdnsConfig {
    /// Create a configuration with defaults for everything but the credentials
    pub fn new(credentials: Credentials) -> Self {
        Self {
            provider: ProviderConfig::new(credentials),
            zone_ids: Vec::new(),
            zone_names: Vec::new(),
            record_ids: Vec::new(),
            record_type: default_record_type(),
            ip_source: IpSourceConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Select zones by id
    pub fn with_zone_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.zone_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Select zones by name
    pub fn with_zone_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.zone_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict management to the given record ids
    pub fn with_record_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.record_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Set the address record type
    pub fn with_record_type(mut self, record_type: RecordType) -> Self {
        self.record_type = record_type;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.provider.validate()?;
        self.zone_selector()?;

        if !self.record_type.is_address() {
            return Err(crate::Error::config(format!(
                "Record type {} is not an address type (use A or AAAA)",
                self.record_type
            )));
        }

        if self.record_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(crate::Error::config("Record IDs cannot be empty"));
        }

        self.ip_source.validate()?;
        self.engine.validate()?;

        Ok(())
    }

    /// Zone selection mode derived from the configuration shape
    ///
    /// The ID list wins when both lists are present.
    pub fn zone_selector(&self) -> Result<ZoneSelector, crate::Error> {
        let ids = clean_list(&self.zone_ids);
        if !ids.is_empty() {
            return Ok(ZoneSelector::Ids(ids));
        }

        let names = clean_list(&self.zone_names);
        if !names.is_empty() {
            return Ok(ZoneSelector::Names(names));
        }

        Err(crate::Error::config("Either zone IDs or zone names are required"))
    }
}

/// Trim entries, drop empty ones and remove duplicates while keeping order
fn clean_list(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim();
        if !value.is_empty() && !out.iter().any(|v| v == value) {
            out.push(value.to_string());
        }
    }
    out
}

fn default_record_type() -> RecordType {
    RecordType::A
}

/// How configured zones are turned into provider zones
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneSelector {
    /// Validate each id against the provider's zone list
    Ids(Vec<String>),
    /// Look each name up on the provider, case-insensitively
    Names(Vec<String>),
}

/// Provider API credentials
///
/// Every authenticated call carries the same credential values.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credentials {
    /// Global API key sent as `X-Auth-Email` + `X-Auth-Key`
    GlobalKey { email: String, key: String },
    /// Scoped API token sent as a bearer credential
    Token { token: String },
}

impl Credentials {
    pub fn global_key(email: impl Into<String>, key: impl Into<String>) -> Self {
        Self::GlobalKey {
            email: email.into(),
            key: key.into(),
        }
    }

    pub fn token(token: impl Into<String>) -> Self {
        Self::Token {
            token: token.into(),
        }
    }

    fn validate(&self) -> Result<(), crate::Error> {
        match self {
            Credentials::GlobalKey { email, key } => {
                if email.trim().is_empty() {
                    return Err(crate::Error::config("Account email cannot be empty"));
                }
                if key.trim().is_empty() {
                    return Err(crate::Error::config("Auth key cannot be empty"));
                }
            }
            Credentials::Token { token } => {
                if token.trim().is_empty() {
                    return Err(crate::Error::config("API token cannot be empty"));
                }
            }
        }
        Ok(())
    }
}

// Keys and tokens never reach Debug output
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::GlobalKey { email, .. } => f
                .debug_struct("GlobalKey")
                .field("email", email)
                .field("key", &"<REDACTED>")
                .finish(),
            Credentials::Token { .. } => f
                .debug_struct("Token")
                .field("token", &"<REDACTED>")
                .finish(),
        }
    }
}

/// DNS provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API credentials
    pub credentials: Credentials,

    /// API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// HTTP timeout for provider calls (in seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Dry-run mode: read from the provider but never modify records
    #[serde(default)]
    pub dry_run: bool,
}

impl ProviderConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            api_base: default_api_base(),
            timeout_secs: default_timeout_secs(),
            dry_run: false,
        }
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.credentials.validate()?;
        validate_url("Provider API base", &self.api_base)?;
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("Provider timeout must be > 0"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Public IP lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpSourceConfig {
    /// URL of the IP-echo service
    #[serde(default = "default_ip_echo_url")]
    pub url: String,

    /// Check interval (in seconds)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// HTTP timeout for a single lookup (in seconds)
    #[serde(default = "default_ip_timeout_secs")]
    pub timeout_secs: u64,
}

impl IpSourceConfig {
    /// Validate the IP source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        validate_url("IP echo URL", &self.url)?;
        if self.interval_secs == 0 {
            return Err(crate::Error::config("Check interval must be > 0"));
        }
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("IP lookup timeout must be > 0"));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for IpSourceConfig {
    fn default() -> Self {
        Self {
            url: default_ip_echo_url(),
            interval_secs: default_interval_secs(),
            timeout_secs: default_ip_timeout_secs(),
        }
    }
}

fn default_ip_echo_url() -> String {
    DEFAULT_IP_ECHO_URL.to_string()
}

fn default_interval_secs() -> u64 {
    86400
}

fn default_ip_timeout_secs() -> u64 {
    10
}

fn validate_url(what: &str, url: &str) -> Result<(), crate::Error> {
    if url.trim().is_empty() {
        return Err(crate::Error::config(format!("{} cannot be empty", what)));
    }
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(crate::Error::config(format!(
            "{} must use HTTP or HTTPS scheme. Got: {}",
            what, url
        )));
    }
    Ok(())
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// First backoff delay after a failed IP lookup (in seconds)
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,

    /// Upper bound for the IP lookup backoff (in seconds)
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,

    /// Capacity of the engine event channel
    ///
    /// When full, events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.backoff_base_secs == 0 {
            return Err(crate::Error::config("Backoff base must be > 0"));
        }
        if self.backoff_max_secs < self.backoff_base_secs {
            return Err(crate::Error::config(
                "Backoff maximum must be >= backoff base",
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backoff_base_secs: default_backoff_base_secs(),
            backoff_max_secs: default_backoff_max_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_backoff_base_secs() -> u64 {
    5
}

fn default_backoff_max_secs() -> u64 {
    600
}

fn default_event_channel_capacity() -> usize {
    100
}
