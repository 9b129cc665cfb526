//! Test doubles and common utilities for contract tests
//!
//! The doubles record every call so tests can assert on exactly what the
//! engine asked the provider to do. All of them are cheap to clone and clones
//! share state, so a test can keep a handle after moving one into the engine.

#![allow(dead_code)]

use async_trait::async_trait;
use cfddns_core::error::{Error, ProviderErrorDetail, Result};
use cfddns_core::traits::{DnsProvider, IpSource, Notifier, Record, RecordType, UpdatedRecords, Zone};
use cfddns_core::{Credentials, DdnsConfig};
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Parse an IP literal
pub fn ip(s: &str) -> IpAddr {
    s.parse().expect("valid IP literal")
}

/// Build an A record in zone `zone_id`
pub fn a_record(zone_id: &str, id: &str, name: &str, content: &str) -> Record {
    Record::new(id, name, RecordType::A, content, zone_id)
}

/// Minimal valid configuration selecting zones by id
pub fn config_for_zone_ids(ids: &[&str]) -> DdnsConfig {
    let mut config = DdnsConfig::new(Credentials::token("test-token")).with_zone_ids(ids.iter().copied());
    config.ip_source.interval_secs = 60;
    config
}

/// A call received by [`MockDnsProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    ListZones(Option<String>),
    GetZone(String),
    ListRecords(String, RecordType),
    UpdateRecord {
        zone_id: String,
        record_id: String,
        content: String,
    },
}

#[derive(Default)]
struct ProviderState {
    zones: Vec<Zone>,
    records: HashMap<String, Vec<Record>>,
    calls: Vec<ProviderCall>,
    failing_updates: HashSet<String>,
    failing_lists: HashSet<String>,
    update_delay: Duration,
}

/// In-memory provider that records calls and applies updates
#[derive(Clone, Default)]
pub struct MockDnsProvider {
    state: Arc<Mutex<ProviderState>>,
    update_call_count: Arc<AtomicUsize>,
}

impl MockDnsProvider {
    pub fn new(zones: Vec<Zone>) -> Self {
        let provider = Self::default();
        provider.state.lock().unwrap().zones = zones;
        provider
    }

    /// Single zone `example.com`/`z1` with `home.example.com`/`r1` at `content`
    pub fn single_record(content: &str) -> Self {
        let provider = Self::new(vec![Zone::new("z1", "example.com")]);
        provider.set_records("z1", vec![a_record("z1", "r1", "home.example.com", content)]);
        provider
    }

    /// Replace the records the provider lists for a zone
    pub fn set_records(&self, zone_id: &str, records: Vec<Record>) {
        self.state
            .lock()
            .unwrap()
            .records
            .insert(zone_id.to_string(), records);
    }

    /// Reverse the listing order of a zone
    pub fn reverse_records(&self, zone_id: &str) {
        if let Some(records) = self.state.lock().unwrap().records.get_mut(zone_id) {
            records.reverse();
        }
    }

    /// Make every update of `record_id` fail with a provider error
    pub fn fail_updates_for(&self, record_id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_updates
            .insert(record_id.to_string());
    }

    /// Make listing the records of `zone_id` fail with a provider error
    pub fn fail_listing_for(&self, zone_id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_lists
            .insert(zone_id.to_string());
    }

    /// Make every update take `delay` before it is applied
    pub fn delay_updates(&self, delay: Duration) {
        self.state.lock().unwrap().update_delay = delay;
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock().unwrap();
        state.failing_updates.clear();
        state.failing_lists.clear();
    }

    /// Every call received so far
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// `(zone_id, record_id, content)` of every update call
    pub fn update_calls(&self) -> Vec<(String, String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ProviderCall::UpdateRecord {
                    zone_id,
                    record_id,
                    content,
                } => Some((zone_id, record_id, content)),
                _ => None,
            })
            .collect()
    }

    /// Get the number of times update_record() was called
    pub fn update_call_count(&self) -> usize {
        self.update_call_count.load(Ordering::SeqCst)
    }

    /// Current provider-side content of a record
    pub fn content_of(&self, record_id: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .records
            .values()
            .flatten()
            .find(|r| r.id == record_id)
            .map(|r| r.content.clone())
    }

    fn rejected() -> Error {
        Error::provider(
            400,
            vec![ProviderErrorDetail::new(9005, "Content for A record is invalid")],
        )
    }
}

#[async_trait]
impl DnsProvider for MockDnsProvider {
    async fn list_zones(&self, name: Option<&str>) -> Result<Vec<Zone>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ProviderCall::ListZones(name.map(str::to_string)));
        Ok(state
            .zones
            .iter()
            .filter(|z| name.is_none_or(|n| z.name.eq_ignore_ascii_case(n)))
            .cloned()
            .collect())
    }

    async fn get_zone(&self, zone_id: &str) -> Result<Zone> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ProviderCall::GetZone(zone_id.to_string()));
        state
            .zones
            .iter()
            .find(|z| z.id == zone_id)
            .cloned()
            .ok_or_else(|| Error::provider(404, vec![ProviderErrorDetail::new(1001, "Invalid zone identifier")]))
    }

    async fn list_records(&self, zone_id: &str, record_type: RecordType) -> Result<Vec<Record>> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(ProviderCall::ListRecords(zone_id.to_string(), record_type.clone()));
        if state.failing_lists.contains(zone_id) {
            return Err(Error::provider(500, Vec::new()));
        }
        Ok(state
            .records
            .get(zone_id)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.record_type == record_type)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_record(&self, zone_id: &str, record_id: &str, content: &str) -> Result<Record> {
        self.update_call_count.fetch_add(1, Ordering::SeqCst);
        let delay = self.state.lock().unwrap().update_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.calls.push(ProviderCall::UpdateRecord {
            zone_id: zone_id.to_string(),
            record_id: record_id.to_string(),
            content: content.to_string(),
        });

        if state.failing_updates.contains(record_id) {
            return Err(Self::rejected());
        }

        let record = state
            .records
            .get_mut(zone_id)
            .and_then(|records| records.iter_mut().find(|r| r.id == record_id))
            .ok_or_else(|| Error::provider(404, vec![ProviderErrorDetail::new(81044, "Record not found")]))?;
        record.content = content.to_string();
        Ok(record.clone())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

#[derive(Default)]
struct SourceState {
    ip: Option<IpAddr>,
    failures_left: usize,
    calls: Vec<Instant>,
}

/// IP source returning a settable address, optionally failing first
#[derive(Clone, Default)]
pub struct ScriptedIpSource {
    state: Arc<Mutex<SourceState>>,
}

impl ScriptedIpSource {
    pub fn new(ip: IpAddr) -> Self {
        let source = Self::default();
        source.set(ip);
        source
    }

    /// Source that fails every lookup
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn set(&self, ip: IpAddr) {
        self.state.lock().unwrap().ip = Some(ip);
    }

    /// Fail the next `n` lookups with a transport error
    pub fn fail_next(&self, n: usize) {
        self.state.lock().unwrap().failures_left = n;
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    /// Instants at which lookups happened
    pub fn call_times(&self) -> Vec<Instant> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl IpSource for ScriptedIpSource {
    async fn current(&self) -> Result<IpAddr> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Instant::now());
        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(Error::transport("connection refused"));
        }
        state
            .ip
            .ok_or_else(|| Error::transport("connection refused"))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// IP source whose lookups never complete
pub struct HangingIpSource;

#[async_trait]
impl IpSource for HangingIpSource {
    async fn current(&self) -> Result<IpAddr> {
        std::future::pending().await
    }

    fn name(&self) -> &str {
        "hanging"
    }
}

/// Notifier that records deliveries
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    deliveries: Arc<Mutex<Vec<(UpdatedRecords, IpAddr)>>>,
    delay: Duration,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take `delay` before recording each delivery
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Record deliveries, then report failure
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn deliveries(&self) -> Vec<(UpdatedRecords, IpAddr)> {
        self.deliveries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, updated: &UpdatedRecords, new_ip: IpAddr) -> Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.deliveries.lock().unwrap().push((updated.clone(), new_ip));
        if self.fail {
            return Err(Error::notification("webhook returned 500"));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}
