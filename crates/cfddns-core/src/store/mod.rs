// # Record Store
//
// Per-zone cache of the address records the engine manages.
//
// ## Refresh
//
// Every refresh fetches the zone's records from the provider and merges them
// into the cached sequence by record name:
//
// 1. Fresh records are grouped by name, keeping fetch order within a name.
// 2. Each cached record whose name still has a fresh candidate is replaced in
//    place by the first such candidate.
// 3. Fresh records that matched nothing are appended in fetch order.
//
// Cached records the provider no longer returns are evicted with a warning.
// The result is that a provider reordering its listing never reorders the
// cache, and update order stays stable between passes.
//
// ## Ownership
//
// The store is owned by the engine's control loop and only mutated there, so
// it carries no locks.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::traits::{DnsProvider, Record, RecordType, Zone};

/// Which records of the resolved zones are managed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSelection {
    /// Address type to fetch and keep
    pub record_type: RecordType,
    /// Record ID allow-list; empty keeps every record of `record_type`
    pub record_ids: Vec<String>,
}

impl RecordSelection {
    pub fn new(record_type: RecordType) -> Self {
        Self {
            record_type,
            record_ids: Vec::new(),
        }
    }

    pub fn with_record_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.record_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Whether a fetched record belongs to the managed set
    pub fn accepts(&self, record: &Record) -> bool {
        record.record_type == self.record_type
            && (self.record_ids.is_empty() || self.record_ids.iter().any(|id| id == &record.id))
    }
}

/// Outcome of a refresh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Cached records replaced by a fresh copy
    pub retained: usize,
    /// Fresh records that were not cached before
    pub added: usize,
    /// Cached records the provider no longer returned
    pub evicted: usize,
}

impl RefreshSummary {
    fn absorb(&mut self, other: RefreshSummary) {
        self.retained += other.retained;
        self.added += other.added;
        self.evicted += other.evicted;
    }
}

#[derive(Debug, Clone)]
struct ZoneRecords {
    zone: Zone,
    records: Vec<Record>,
}

/// Ordered mapping from resolved zone to its managed records
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    zones: Vec<ZoneRecords>,
}

impl RecordStore {
    /// Create an empty store for the resolved zones
    pub fn new(zones: Vec<Zone>) -> Self {
        Self {
            zones: zones
                .into_iter()
                .map(|zone| ZoneRecords {
                    zone,
                    records: Vec::new(),
                })
                .collect(),
        }
    }

    /// Resolved zones in order
    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter().map(|z| &z.zone)
    }

    /// Zones with their records, in order
    pub fn iter(&self) -> impl Iterator<Item = (&Zone, &[Record])> {
        self.zones.iter().map(|z| (&z.zone, z.records.as_slice()))
    }

    /// Records cached for a zone (empty for unknown zones)
    pub fn records(&self, zone_id: &str) -> &[Record] {
        self.zones
            .iter()
            .find(|z| z.zone.id == zone_id)
            .map(|z| z.records.as_slice())
            .unwrap_or(&[])
    }

    /// Total number of cached records
    pub fn len(&self) -> usize {
        self.zones.iter().map(|z| z.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrite a cached record with a newer representation, matched by id
    ///
    /// Returns `false` when the record isn't cached under that zone.
    pub fn replace(&mut self, zone_id: &str, record: Record) -> bool {
        let Some(entry) = self.zones.iter_mut().find(|z| z.zone.id == zone_id) else {
            return false;
        };
        match entry.records.iter_mut().find(|r| r.id == record.id) {
            Some(slot) => {
                *slot = record;
                true
            }
            None => false,
        }
    }

    /// Re-fetch every zone and merge the result into the cache
    ///
    /// # Errors
    ///
    /// - any provider error, unchanged (zones merged before the failure keep
    ///   their fresh records)
    /// - [`Error::NoRecordsFound`] when no zone has a managed record left
    pub async fn refresh(
        &mut self,
        provider: &dyn DnsProvider,
        selection: &RecordSelection,
    ) -> Result<RefreshSummary> {
        let mut summary = RefreshSummary::default();
        let mut seen_ids: HashSet<String> = HashSet::new();

        for entry in &mut self.zones {
            let fetched = provider
                .list_records(&entry.zone.id, selection.record_type.clone())
                .await?;

            let fresh: Vec<Record> = fetched
                .into_iter()
                .filter(|r| selection.accepts(r))
                .map(|mut r| {
                    if r.zone_id.is_empty() {
                        r.zone_id = entry.zone.id.clone();
                    }
                    r
                })
                .collect();

            seen_ids.extend(fresh.iter().map(|r| r.id.clone()));

            let zone_summary = merge_by_name(&entry.zone, &mut entry.records, fresh);
            debug!(
                zone = %entry.zone.name,
                retained = zone_summary.retained,
                added = zone_summary.added,
                evicted = zone_summary.evicted,
                "Zone refreshed"
            );

            if entry.records.is_empty() {
                info!(zone = %entry.zone.name, "No matching {} records in zone", selection.record_type);
            }

            summary.absorb(zone_summary);
        }

        for id in &selection.record_ids {
            if !seen_ids.contains(id) {
                warn!(record_id = %id, "Configured record ID not found in any zone");
            }
        }

        if self.is_empty() {
            return Err(Error::NoRecordsFound);
        }

        Ok(summary)
    }
}

/// Merge `fresh` into `cached` by record name
fn merge_by_name(zone: &Zone, cached: &mut Vec<Record>, fresh: Vec<Record>) -> RefreshSummary {
    let mut summary = RefreshSummary::default();

    let mut slots: Vec<Option<Record>> = Vec::with_capacity(fresh.len());
    let mut by_name: HashMap<String, VecDeque<usize>> = HashMap::new();
    for (idx, record) in fresh.into_iter().enumerate() {
        by_name.entry(record.name.clone()).or_default().push_back(idx);
        slots.push(Some(record));
    }

    let mut merged: Vec<Record> = Vec::with_capacity(slots.len());
    for old in cached.drain(..) {
        let fresh = by_name
            .get_mut(&old.name)
            .and_then(VecDeque::pop_front)
            .and_then(|idx| slots[idx].take());

        match fresh {
            Some(record) => {
                merged.push(record);
                summary.retained += 1;
            }
            None => {
                warn!(
                    zone = %zone.name,
                    record = %old.name,
                    record_id = %old.id,
                    "Record no longer returned by provider, evicting"
                );
                summary.evicted += 1;
            }
        }
    }

    for record in slots.into_iter().flatten() {
        merged.push(record);
        summary.added += 1;
    }

    *cached = merged;
    summary
}
