// # cfddns-core
//
// Core library for the zone/record reconciliation daemon.
//
// ## Architecture Overview
//
// This library provides the core functionality for keeping DNS address
// records pointed at the host's public IP:
// - **DnsProvider**: Trait for the provider's zone and record endpoints
// - **IpSource**: Trait for a single public-IP lookup
// - **Notifier**: Trait for delivering the records changed by a pass
// - **IpObserver**: Periodic lookup with backoff and change detection
// - **ZoneResolver**: Configured zone IDs/names to provider zones
// - **RecordStore**: Per-zone record cache, refreshed by merge
// - **Reconciler**: Computes and applies the minimal set of updates
// - **DdnsEngine**: Control loop tying it all together
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from HTTP clients
// 2. **Provider is truth**: Records are refreshed before every pass
// 3. **Library-First**: Loading configuration and installing a subscriber is
//    left to the binary

pub mod config;
pub mod engine;
pub mod error;
pub mod observer;
pub mod resolver;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use config::{
    Credentials, DdnsConfig, EngineConfig, IpSourceConfig, ProviderConfig, ZoneSelector,
};
pub use engine::{DdnsEngine, EngineEvent, PassReport, Reconciler};
pub use error::{Error, ProviderErrorDetail, Result};
pub use observer::{IpObserver, backoff_delay};
pub use resolver::ZoneResolver;
pub use store::{RecordSelection, RecordStore, RefreshSummary};
pub use traits::{DnsProvider, IpSource, IpVersion, Notifier, Record, RecordType, UpdatedRecords, Zone};
