// # IP Source Trait
//
// Defines the interface for a single public-IP lookup.
//
// ## Implementations
//
// - HTTP IP-echo service: `cfddns-ip-http` crate
//
// Scheduling, change detection and retry live in
// [`IpObserver`](crate::observer::IpObserver); a source only answers "what is
// my address right now".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// IP version (v4 or v6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => IpVersion::V4,
            IpAddr::V6(_) => IpVersion::V6,
        }
    }
}

/// Trait for public IP lookups
///
/// # Errors
///
/// - [`Error::Transport`](crate::Error::Transport) when the service can't be
///   reached
/// - [`Error::IpSource`](crate::Error::IpSource) when it answers with a
///   non-2xx status or something that isn't a usable address
///
/// Both are treated as transient by the observer. Implementations must not
/// retry or sleep.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Look up the current public IP address once
    async fn current(&self) -> Result<IpAddr, crate::Error>;

    /// Short name used in logs
    fn name(&self) -> &str;
}
