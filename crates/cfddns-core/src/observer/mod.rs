//! Public IP observer
//!
//! Polls an [`IpSource`] on a fixed interval and publishes the address on a
//! `watch` channel only when it differs from the last published value.
//!
//! ## States
//!
//! ```text
//! Polling ── lookup ok ──▶ Resolved(ip) ── next tick ──▶ Polling
//!    │
//!    └── lookup failed ──▶ Backoff(n) ── delay elapsed ──▶ Polling (same tick)
//! ```
//!
//! The first tick fires immediately. A failed lookup is retried for the same
//! tick with an exponentially growing delay, so a flaky IP-echo service never
//! costs a whole check interval. Cancellation is observed inside the lookup
//! and inside the backoff wait.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, IpSourceConfig};
use crate::traits::IpSource;

/// Delay before retry number `attempt` (1-based)
///
/// `base * 2^(attempt - 1)`, capped at `max`.
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let exp = attempt.saturating_sub(1).min(31);
    base.checked_mul(1u32 << exp).unwrap_or(max).min(max)
}

/// Periodic public IP lookup with change detection
pub struct IpObserver {
    source: Arc<dyn IpSource>,
    interval: Duration,
    backoff_base: Duration,
    backoff_max: Duration,
}

impl IpObserver {
    /// Create an observer with the default backoff (5s doubling, 10 minute cap)
    pub fn new(source: Arc<dyn IpSource>, interval: Duration) -> Self {
        let defaults = EngineConfig::default();
        Self {
            source,
            interval,
            backoff_base: Duration::from_secs(defaults.backoff_base_secs),
            backoff_max: Duration::from_secs(defaults.backoff_max_secs),
        }
    }

    /// Create an observer from configuration
    pub fn from_config(
        source: Arc<dyn IpSource>,
        ip_source: &IpSourceConfig,
        engine: &EngineConfig,
    ) -> Self {
        Self::new(source, ip_source.interval()).with_backoff(
            Duration::from_secs(engine.backoff_base_secs),
            Duration::from_secs(engine.backoff_max_secs),
        )
    }

    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_max = max;
        self
    }

    /// Run until `cancel` fires or every receiver is gone
    ///
    /// Publishes `Some(ip)` on the first successful lookup and on every later
    /// change. The channel keeps only the latest value.
    pub async fn run(self, tx: watch::Sender<Option<IpAddr>>, cancel: CancellationToken) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last: Option<IpAddr> = None;

        info!(
            source = self.source.name(),
            interval_secs = self.interval.as_secs(),
            "IP observer started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let Some(ip) = self.lookup_with_backoff(&cancel).await else {
                break;
            };

            if last == Some(ip) {
                debug!(%ip, "Public IP unchanged");
                continue;
            }

            match last {
                Some(previous) => info!(%previous, %ip, "Public IP changed"),
                None => info!(%ip, "Public IP resolved"),
            }
            last = Some(ip);

            if tx.send(Some(ip)).is_err() {
                debug!("IP receiver dropped, stopping observer");
                break;
            }
        }

        info!("IP observer stopped");
    }

    /// Look up the current IP, retrying with backoff until it succeeds
    ///
    /// Returns `None` when cancelled.
    async fn lookup_with_backoff(&self, cancel: &CancellationToken) -> Option<IpAddr> {
        let mut attempt: u32 = 0;

        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                result = self.source.current() => result,
            };

            let err = match result {
                Ok(ip) => return Some(ip),
                Err(e) => e,
            };

            attempt = attempt.saturating_add(1);
            let delay = backoff_delay(attempt, self.backoff_base, self.backoff_max);
            warn!(
                source = self.source.name(),
                attempt,
                transient = err.is_transient(),
                error = %err,
                "IP lookup failed, retrying in {}s",
                delay.as_secs()
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
