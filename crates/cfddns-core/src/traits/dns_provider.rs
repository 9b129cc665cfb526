// # DNS Provider Trait
//
// Defines the interface the engine uses to talk to the DNS provider's zone and
// record endpoints.
//
// ## Implementations
//
// - Cloudflare API v4: `cfddns-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use cfddns_core::traits::{DnsProvider, RecordType};
//
// let zones = provider.list_zones(Some("example.com")).await?;
// let records = provider.list_records(&zones[0].id, RecordType::A).await?;
// let updated = provider
//     .update_record(&zones[0].id, &records[0].id, "203.0.113.7")
//     .await?;
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// A DNS zone managed under the provider account
///
/// Identity is `id`. `name` is the secondary lookup key used by name-based
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
}

impl Zone {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// DNS record type
///
/// Only the address types are managed; anything else the provider returns is
/// kept as `Other` so it can be filtered out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordType {
    /// A record (IPv4)
    A,
    /// AAAA record (IPv6)
    Aaaa,
    /// Any non-address record type
    Other(String),
}

impl RecordType {
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Other(other) => other,
        }
    }

    /// Whether `ip` belongs to the address family of this record type
    pub fn matches_ip(&self, ip: &IpAddr) -> bool {
        match self {
            RecordType::A => ip.is_ipv4(),
            RecordType::Aaaa => ip.is_ipv6(),
            RecordType::Other(_) => false,
        }
    }

    pub fn is_address(&self) -> bool {
        !matches!(self, RecordType::Other(_))
    }
}

impl From<String> for RecordType {
    fn from(value: String) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            _ => RecordType::Other(value),
        }
    }
}

impl From<RecordType> for String {
    fn from(value: RecordType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A DNS address record as reported by the provider
///
/// `content` is the last value observed from the provider, which stays the
/// source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub content: String,
    #[serde(default)]
    pub zone_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
}

impl Record {
    /// Build a bare address record (mostly useful for tests and doubles)
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        record_type: RecordType,
        content: impl Into<String>,
        zone_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            record_type,
            content: content.into(),
            zone_id: zone_id.into(),
            zone_name: None,
            ttl: None,
            proxied: None,
        }
    }

    /// Whether the record already points at `ip`
    ///
    /// Compares parsed addresses so that equivalent IPv6 spellings match;
    /// falls back to a plain string comparison when the content is not an IP.
    pub fn points_to(&self, ip: &IpAddr) -> bool {
        match self.content.trim().parse::<IpAddr>() {
            Ok(current) => current == *ip,
            Err(_) => self.content == ip.to_string(),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {} (id: {})",
            self.record_type, self.name, self.content, self.id
        )
    }
}

/// Trait for DNS provider clients
///
/// Implementations translate each call into exactly one logical API request
/// (list endpoints may follow pagination) and decode the provider's response
/// envelope.
///
/// # Contract
///
/// - A non-success envelope or a non-200 status yields
///   [`Error::Provider`](crate::Error::Provider) carrying the status and the
///   provider error list.
/// - Network failures yield [`Error::Transport`](crate::Error::Transport).
/// - No retries. Retry policy belongs to the caller.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List zones, optionally filtered by name on the provider side
    async fn list_zones(&self, name: Option<&str>) -> Result<Vec<Zone>, crate::Error>;

    /// Fetch a single zone by id
    async fn get_zone(&self, zone_id: &str) -> Result<Zone, crate::Error>;

    /// List all records of `record_type` in a zone
    async fn list_records(
        &self,
        zone_id: &str,
        record_type: RecordType,
    ) -> Result<Vec<Record>, crate::Error>;

    /// Partially update a record so that only its content changes
    ///
    /// Returns the provider's representation of the record after the update.
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        content: &str,
    ) -> Result<Record, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
