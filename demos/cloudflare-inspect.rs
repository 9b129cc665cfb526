// # Cloudflare Zone/Record Inspection Tool
//
// Read-only helper for finding the zone and record IDs to put in `ZONE_ID`
// and `RECORD_ID`. Never modifies anything.
//
// ## Usage
//
// ```bash
// AUTH_KEY=your_token \
// ZONE_NAME=example.com \
// RECORD_TYPE=A \
// cargo run -p cfddns-demos --bin cloudflare_inspect
// ```
//
// ## Environment Variables
//
// Required:
// - `AUTH_KEY`: Global API key, or API token when `EMAIL` is unset
//
// Optional:
// - `EMAIL`: Account email for the global API key
// - `ZONE_NAME`: Only show this zone (default: every zone)
// - `RECORD_TYPE`: A or AAAA (default: A)

use cfddns_cloudflare::CloudflareClient;
use cfddns_core::traits::{DnsProvider, RecordType};
use cfddns_core::Credentials;
use std::env;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let Some(auth_key) = env::var("AUTH_KEY").ok().filter(|k| !k.is_empty()) else {
        tracing::error!("AUTH_KEY environment variable is required");
        return ExitCode::from(1);
    };

    let credentials = match env::var("EMAIL").ok().filter(|e| !e.is_empty()) {
        Some(email) => Credentials::global_key(email, auth_key),
        None => Credentials::token(auth_key),
    };

    let record_type = RecordType::from(env::var("RECORD_TYPE").unwrap_or_else(|_| "A".to_string()));
    if !record_type.is_address() {
        tracing::error!("RECORD_TYPE must be A or AAAA, got {}", record_type);
        return ExitCode::from(1);
    }

    let client = match CloudflareClient::new(credentials) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to create client: {}", e);
            return ExitCode::from(1);
        }
    };

    let zone_name = env::var("ZONE_NAME").ok();
    let zones = match client.list_zones(zone_name.as_deref()).await {
        Ok(zones) => zones,
        Err(e) => {
            tracing::error!("Failed to list zones: {}", e);
            return ExitCode::from(2);
        }
    };

    if zones.is_empty() {
        tracing::warn!("No zones visible with these credentials");
    }

    for zone in zones {
        println!("{}", zone);
        match client.list_records(&zone.id, record_type.clone()).await {
            Ok(records) => {
                for record in records {
                    println!("\t- {}", record);
                }
            }
            Err(e) => tracing::error!(zone = %zone.name, "Failed to list records: {}", e),
        }
    }

    ExitCode::SUCCESS
}
