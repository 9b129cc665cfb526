//! Core traits for the engine
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`DnsProvider`]: Zone and record endpoints of the DNS provider
//! - [`IpSource`]: Single public-IP lookup
//! - [`Notifier`]: Sink for the records changed by a pass

pub mod dns_provider;
pub mod ip_source;
pub mod notifier;

pub use dns_provider::{DnsProvider, Record, RecordType, Zone};
pub use ip_source::{IpSource, IpVersion};
pub use notifier::{Notifier, UpdatedRecords, format_message};
