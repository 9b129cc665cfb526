//! Zone resolution
//!
//! Turns the configured zone selector into provider zones, once, at startup.
//! Entries that don't match anything are logged and dropped; only an empty
//! result is fatal.

use tracing::{debug, info, warn};

use crate::config::ZoneSelector;
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, Zone};

/// Resolves configured zone IDs or names against the provider
pub struct ZoneResolver<'a> {
    provider: &'a dyn DnsProvider,
}

impl<'a> ZoneResolver<'a> {
    pub fn new(provider: &'a dyn DnsProvider) -> Self {
        Self { provider }
    }

    /// Resolve the selector into validated zones, in configuration order
    ///
    /// # Errors
    ///
    /// - [`Error::NoZonesFound`] when nothing matched
    /// - any provider error, unchanged
    pub async fn resolve(&self, selector: &ZoneSelector) -> Result<Vec<Zone>> {
        let zones = match selector {
            ZoneSelector::Ids(ids) => self.validate_ids(ids).await?,
            ZoneSelector::Names(names) => self.resolve_names(names).await?,
        };

        if zones.is_empty() {
            return Err(Error::NoZonesFound);
        }

        info!(
            count = zones.len(),
            zones = %zones.iter().map(|z| z.name.as_str()).collect::<Vec<_>>().join(", "),
            "Resolved zones"
        );
        Ok(zones)
    }

    /// Keep the configured IDs present in the provider's zone list
    async fn validate_ids(&self, ids: &[String]) -> Result<Vec<Zone>> {
        let available = self.provider.list_zones(None).await?;
        debug!(available = available.len(), "Fetched zone list");

        let mut zones: Vec<Zone> = Vec::with_capacity(ids.len());
        for id in ids {
            if zones.iter().any(|z| &z.id == id) {
                continue;
            }
            match available.iter().find(|z| &z.id == id) {
                Some(zone) => zones.push(zone.clone()),
                None => warn!(zone_id = %id, "Configured zone ID not found, skipping"),
            }
        }

        Ok(zones)
    }

    /// Look up each configured name, matching case-insensitively
    async fn resolve_names(&self, names: &[String]) -> Result<Vec<Zone>> {
        let mut zones: Vec<Zone> = Vec::with_capacity(names.len());

        for name in names {
            let candidates = self.provider.list_zones(Some(name)).await?;
            let mut matches = candidates
                .into_iter()
                .filter(|z| z.name.eq_ignore_ascii_case(name));

            let Some(zone) = matches.next() else {
                warn!(zone_name = %name, "Configured zone name not found, skipping");
                continue;
            };
            if matches.next().is_some() {
                warn!(zone_name = %name, "Configured zone name is ambiguous, skipping");
                continue;
            }

            if zones.iter().any(|z| z.id == zone.id) {
                continue;
            }
            zones.push(zone);
        }

        Ok(zones)
    }
}
