// # Notifier Trait
//
// Sink for the outcome of a reconciliation pass. Delivery transport and its
// retry policy belong to the implementation; the engine only logs failures.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::net::IpAddr;

/// Records changed by one pass, keyed by zone name, in update order
pub type UpdatedRecords = BTreeMap<String, Vec<String>>;

/// Trait for notification sinks
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification about the records that now point at `new_ip`
    async fn notify(&self, updated: &UpdatedRecords, new_ip: IpAddr) -> Result<(), crate::Error>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// Render the human-readable notification body
///
/// ```text
/// Your IP address has changed to 203.0.113.7 for the following record(s):
/// example.com
///     - home.example.com
/// ```
pub fn format_message(updated: &UpdatedRecords, new_ip: IpAddr) -> String {
    let mut msg = format!(
        "Your IP address has changed to {} for the following record(s):\r\n",
        new_ip
    );

    for (zone, records) in updated {
        msg.push_str(zone);
        msg.push_str("\r\n");
        for record in records {
            msg.push_str("\t- ");
            msg.push_str(record);
            msg.push_str("\r\n");
        }
    }

    msg
}
