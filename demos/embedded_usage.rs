//! Minimal embedding example for cfddns-core
//!
//! Runs the engine against an in-memory provider and a fixed IP source. The
//! application owns the engine lifecycle through a cancellation token.

use cfddns_core::traits::{
    DnsProvider, IpSource, Notifier, Record, RecordType, UpdatedRecords, Zone, format_message,
};
use cfddns_core::{Credentials, DdnsConfig, DdnsEngine, EngineEvent, Error, Result};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

const ZONE_ID: &str = "023e105f4ecef8ad9ca31a8372d0c353";

/// IP source that always reports the same address
struct FixedIpSource(IpAddr);

#[async_trait::async_trait]
impl IpSource for FixedIpSource {
    async fn current(&self) -> Result<IpAddr> {
        Ok(self.0)
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Provider keeping one zone in memory
struct InMemoryProvider {
    zone: Zone,
    records: Mutex<Vec<Record>>,
}

impl InMemoryProvider {
    fn new() -> Self {
        Self {
            zone: Zone::new(ZONE_ID, "example.com"),
            records: Mutex::new(vec![
                Record::new("r-home", "home.example.com", RecordType::A, "192.0.2.1", ZONE_ID),
                Record::new("r-vpn", "vpn.example.com", RecordType::A, "192.0.2.1", ZONE_ID),
            ]),
        }
    }
}

#[async_trait::async_trait]
impl DnsProvider for InMemoryProvider {
    async fn list_zones(&self, name: Option<&str>) -> Result<Vec<Zone>> {
        Ok(std::iter::once(self.zone.clone())
            .filter(|z| name.is_none_or(|n| z.name.eq_ignore_ascii_case(n)))
            .collect())
    }

    async fn get_zone(&self, _zone_id: &str) -> Result<Zone> {
        Ok(self.zone.clone())
    }

    async fn list_records(&self, _zone_id: &str, record_type: RecordType) -> Result<Vec<Record>> {
        let records = self
            .records
            .lock()
            .map_err(|_| Error::transport("record lock poisoned"))?;
        Ok(records.iter().filter(|r| r.record_type == record_type).cloned().collect())
    }

    async fn update_record(&self, _zone_id: &str, record_id: &str, content: &str) -> Result<Record> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| Error::transport("record lock poisoned"))?;
        let record = records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| Error::provider(404, Vec::new()))?;
        println!("[Embedded] Updating {} -> {}", record.name, content);
        record.content = content.to_string();
        Ok(record.clone())
    }

    fn provider_name(&self) -> &'static str {
        "in-memory"
    }
}

/// Notifier printing the message body
struct PrintNotifier;

#[async_trait::async_trait]
impl Notifier for PrintNotifier {
    async fn notify(&self, updated: &UpdatedRecords, new_ip: IpAddr) -> Result<()> {
        print!("[Notify]\n{}", format_message(updated, new_ip));
        Ok(())
    }

    fn name(&self) -> &str {
        "print"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Embedded cfddns-core Example ===\n");

    let config = DdnsConfig::new(Credentials::token("unused-by-in-memory-provider"))
        .with_zone_names(["example.com"]);

    println!("1. Creating engine...");
    let (engine, mut event_rx) = DdnsEngine::new(
        Arc::new(FixedIpSource(IpAddr::from([203, 0, 113, 7]))),
        Arc::new(InMemoryProvider::new()),
        config,
    )?;
    let engine = engine.with_notifier(Arc::new(PrintNotifier));

    let cancel = CancellationToken::new();

    println!("2. Starting engine in background...");
    let engine_handle = tokio::spawn(engine.run(cancel.clone()));

    // Stop after the first pass
    while let Some(event) = event_rx.recv().await {
        println!("[Event] {:?}", event);
        if matches!(event, EngineEvent::PassCompleted { .. } | EngineEvent::PassFailed { .. }) {
            break;
        }
    }

    println!("\n3. Cancelling engine...");
    cancel.cancel();
    match engine_handle.await {
        Ok(result) => result?,
        Err(e) => println!("Engine task failed: {}", e),
    }

    println!("\n=== Embedding Successful ===");
    Ok(())
}
