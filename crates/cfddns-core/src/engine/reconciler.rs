//! Reconciliation pass
//!
//! One pass = refresh the [`RecordStore`], then push the new IP to every
//! record that doesn't already carry it.

use std::net::IpAddr;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::store::{RecordSelection, RecordStore, RefreshSummary};
use crate::traits::{DnsProvider, UpdatedRecords};

/// Result of a successful pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Records changed per zone name, each list in update order
    pub updated: UpdatedRecords,
    /// Records that already pointed at the IP
    pub unchanged: usize,
    /// What the refresh did to the cache
    pub refresh: RefreshSummary,
}

impl PassReport {
    /// Number of records changed
    pub fn updated_count(&self) -> usize {
        self.updated.values().map(Vec::len).sum()
    }
}

/// Computes and applies the minimal set of record updates for an IP
pub struct Reconciler {
    provider: Arc<dyn DnsProvider>,
    selection: RecordSelection,
}

struct Pending {
    zone_id: String,
    zone_name: String,
    record_id: String,
    record_name: String,
}

impl Reconciler {
    pub fn new(provider: Arc<dyn DnsProvider>, selection: RecordSelection) -> Self {
        Self {
            provider,
            selection,
        }
    }

    pub fn selection(&self) -> &RecordSelection {
        &self.selection
    }

    /// Run one pass for `ip`
    ///
    /// Records are visited in zone order, then record order. The first failed
    /// update aborts the pass; records updated before it keep their new
    /// content in the store, the failed one keeps its old content.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] if `ip` is not of the managed record family
    ///   (checked before any provider call)
    /// - any refresh or update error
    pub async fn reconcile(&self, store: &mut RecordStore, ip: IpAddr) -> Result<PassReport> {
        if !self.selection.record_type.matches_ip(&ip) {
            return Err(Error::invalid_input(format!(
                "IP {} cannot be written to {} records",
                ip, self.selection.record_type
            )));
        }

        let refresh = store.refresh(self.provider.as_ref(), &self.selection).await?;

        let mut report = PassReport {
            refresh,
            ..PassReport::default()
        };

        let mut pending: Vec<Pending> = Vec::new();
        for (zone, records) in store.iter() {
            for record in records {
                if record.points_to(&ip) {
                    debug!(zone = %zone.name, record = %record.name, %ip, "Record up to date");
                    report.unchanged += 1;
                    continue;
                }
                pending.push(Pending {
                    zone_id: zone.id.clone(),
                    zone_name: zone.name.clone(),
                    record_id: record.id.clone(),
                    record_name: record.name.clone(),
                });
            }
        }

        let content = ip.to_string();
        for item in pending {
            let mut updated = match self
                .provider
                .update_record(&item.zone_id, &item.record_id, &content)
                .await
            {
                Ok(record) => record,
                Err(e) => {
                    error!(
                        zone = %item.zone_name,
                        record = %item.record_name,
                        record_id = %item.record_id,
                        status = ?e.status(),
                        error = %e,
                        "Failed to update record"
                    );
                    return Err(e);
                }
            };

            if updated.zone_id.is_empty() {
                updated.zone_id = item.zone_id.clone();
            }
            if updated.id != item.record_id {
                debug!(
                    expected = %item.record_id,
                    returned = %updated.id,
                    "Provider returned a different record id, keeping the cached one"
                );
                updated.id = item.record_id.clone();
            }
            store.replace(&item.zone_id, updated);

            info!(zone = %item.zone_name, record = %item.record_name, %ip, "Record updated");
            report
                .updated
                .entry(item.zone_name)
                .or_default()
                .push(item.record_name);
        }

        Ok(report)
    }
}
