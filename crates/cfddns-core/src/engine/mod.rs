//! Core reconciliation engine
//!
//! The DdnsEngine is responsible for:
//! - Resolving the configured zones once at startup
//! - Keeping the record cache in sync with the provider
//! - Reacting to public IP changes with a reconciliation pass
//! - Handing the pass outcome to the notifiers
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   watch<Option<IpAddr>>   ┌──────────────┐
//! │ IpObserver  │──────────────────────────▶│ DdnsEngine   │
//! │ (own task)  │                           │ control loop │
//! └─────────────┘                           └──────────────┘
//!                                                  │
//!         ┌────────────────────────────────────────┼──────────────────────┐
//!         │                                        │                      │
//!         ▼                                        ▼                      ▼
//! ┌──────────────┐                         ┌──────────────┐        ┌─────────────┐
//! │ RecordStore  │◀── refresh / replace ───│ Reconciler   │        │  Notifiers  │
//! │ (loop-owned) │                         │ (DnsProvider)│        │  (JoinSet)  │
//! └──────────────┘                         └──────────────┘        └─────────────┘
//! ```
//!
//! ## Event Flow
//!
//! 1. Zones resolved, records fetched (failures here end `run` with an error)
//! 2. Observer publishes a changed IP
//! 3. Reconciler refreshes the store and updates stale records
//! 4. Changed records are sent to every notifier in the background
//! 5. Events are emitted for monitoring/logging
//!
//! IPs published while a pass is running coalesce in the watch channel; the
//! loop only ever sees the latest one.
//!
//! A failed pass is retried for the same IP on an exponential backoff until it
//! succeeds or a newer IP arrives. The observer only publishes changes, so
//! without this a failure would stick until the public IP moved again.

pub mod reconciler;

pub use reconciler::{PassReport, Reconciler};

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{DdnsConfig, EngineConfig, IpSourceConfig, ZoneSelector};
use crate::error::{Error, Result};
use crate::observer::{IpObserver, backoff_delay};
use crate::resolver::ZoneResolver;
use crate::store::{RecordSelection, RecordStore};
use crate::traits::{DnsProvider, IpSource, Notifier, UpdatedRecords};

/// Events emitted by the DdnsEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Zones resolved and initial records fetched
    Started { zones: usize, records: usize },

    /// Observer published a new public IP
    IpChanged { new_ip: IpAddr },

    /// Reconciliation pass finished
    PassCompleted {
        ip: IpAddr,
        updated: UpdatedRecords,
        unchanged: usize,
    },

    /// Reconciliation pass aborted
    PassFailed { ip: IpAddr, error: String },

    /// A notifier failed to deliver
    NotificationFailed { notifier: String, error: String },

    /// Engine stopped
    Stopped { reason: String },
}

/// Retry schedule for the latest IP whose pass failed
#[derive(Debug, Default)]
struct PassRetry {
    pending: Option<(IpAddr, Instant)>,
    attempt: u32,
}

impl PassRetry {
    /// Schedule another pass for `ip`, returning the delay
    fn schedule(&mut self, ip: IpAddr, base: Duration, max: Duration) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        let delay = backoff_delay(self.attempt, base, max);
        self.pending = Some((ip, Instant::now() + delay));
        delay
    }

    fn clear(&mut self) {
        self.pending = None;
        self.attempt = 0;
    }

    fn ip(&self) -> Option<IpAddr> {
        self.pending.map(|(ip, _)| ip)
    }

    /// When the retry is due; only meaningful while one is pending
    fn deadline(&self) -> Instant {
        self.pending.map(|(_, at)| at).unwrap_or_else(Instant::now)
    }
}

/// Core reconciliation engine
///
/// ## Lifecycle
///
/// 1. Create with [`DdnsEngine::new()`]
/// 2. Optionally attach notifiers with [`DdnsEngine::with_notifier()`]
/// 3. Start with [`DdnsEngine::run()`]
/// 4. Cancel the token to stop; `run` returns once the in-flight pass and
///    pending notifications are done
///
/// ## Threading
///
/// The control loop runs on the caller's task and owns the record store. The
/// IP observer runs on a spawned task; notifications run on a `JoinSet`.
pub struct DdnsEngine {
    /// IP source polled by the observer
    ip_source: Arc<dyn IpSource>,

    /// DNS provider shared by resolver, store and reconciler
    provider: Arc<dyn DnsProvider>,

    /// Notification sinks
    notifiers: Vec<Arc<dyn Notifier>>,

    /// Configured zone selection
    zone_selector: ZoneSelector,

    /// Pass logic
    reconciler: Reconciler,

    /// Observer settings
    ip_config: IpSourceConfig,
    engine_config: EngineConfig,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl DdnsEngine {
    /// Create a new engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    ///
    /// # Errors
    ///
    /// [`Error::Config`](crate::Error::Config) if the configuration is invalid
    pub fn new(
        ip_source: Arc<dyn IpSource>,
        provider: Arc<dyn DnsProvider>,
        config: DdnsConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let zone_selector = config.zone_selector()?;
        let selection = RecordSelection::new(config.record_type.clone())
            .with_record_ids(config.record_ids.iter().map(|id| id.trim().to_string()));

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            ip_source,
            reconciler: Reconciler::new(Arc::clone(&provider), selection),
            provider,
            notifiers: Vec::new(),
            zone_selector,
            ip_config: config.ip_source,
            engine_config: config.engine,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Attach a notification sink
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    /// Run the engine until `cancel` fires
    ///
    /// # Returns
    ///
    /// - `Ok(())`: clean shutdown
    /// - `Err(Error)`: startup failure (zone resolution or initial fetch)
    ///
    /// Failures of individual passes are logged and reported as
    /// [`EngineEvent::PassFailed`]; they never end the loop.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        info!(provider = self.provider.provider_name(), "Starting engine");

        let zones = ZoneResolver::new(self.provider.as_ref())
            .resolve(&self.zone_selector)
            .await?;

        let mut store = RecordStore::new(zones);
        store
            .refresh(self.provider.as_ref(), self.reconciler.selection())
            .await?;

        let zone_count = store.zones().count();
        info!(zones = zone_count, records = store.len(), "Initial records fetched");
        self.emit_event(EngineEvent::Started {
            zones: zone_count,
            records: store.len(),
        });

        let (ip_tx, mut ip_rx) = watch::channel(None);
        let observer_cancel = cancel.child_token();
        let observer = IpObserver::from_config(
            Arc::clone(&self.ip_source),
            &self.ip_config,
            &self.engine_config,
        );
        let observer_handle = tokio::spawn(observer.run(ip_tx, observer_cancel.clone()));

        let mut notifications: JoinSet<()> = JoinSet::new();
        let mut retry = PassRetry::default();
        let retry_base = Duration::from_secs(self.engine_config.backoff_base_secs);
        let retry_max = Duration::from_secs(self.engine_config.backoff_max_secs);

        let reason = loop {
            let ip = tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!("Shutdown signal received");
                    break "Shutdown signal";
                }

                changed = ip_rx.changed() => {
                    if changed.is_err() {
                        warn!("IP observer stopped unexpectedly");
                        break "IP observer stopped";
                    }
                    let latest = *ip_rx.borrow_and_update();
                    let Some(ip) = latest else {
                        continue;
                    };
                    // A newer IP replaces whatever was waiting for a retry
                    retry.clear();
                    self.emit_event(EngineEvent::IpChanged { new_ip: ip });
                    ip
                }

                _ = sleep_until(retry.deadline()), if retry.ip().is_some() => {
                    let Some(ip) = retry.ip() else {
                        continue;
                    };
                    info!(%ip, attempt = retry.attempt, "Retrying failed reconciliation pass");
                    ip
                }

                Some(joined) = notifications.join_next(), if !notifications.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "Notification task panicked");
                    }
                    continue;
                }
            };

            if self.run_pass(&mut store, ip, &mut notifications).await {
                let delay = retry.schedule(ip, retry_base, retry_max);
                warn!(
                    %ip,
                    attempt = retry.attempt,
                    "Reconciliation pass will be retried in {}s",
                    delay.as_secs()
                );
            } else {
                retry.clear();
            }
        };

        observer_cancel.cancel();
        if let Err(e) = observer_handle.await {
            warn!(error = %e, "IP observer task panicked");
        }

        if !notifications.is_empty() {
            debug!(pending = notifications.len(), "Waiting for pending notifications");
        }
        while let Some(joined) = notifications.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Notification task panicked");
            }
        }

        self.emit_event(EngineEvent::Stopped {
            reason: reason.to_string(),
        });
        info!("Engine stopped");

        Ok(())
    }

    /// Run one pass for `ip`
    ///
    /// Returns `true` when the pass failed and is worth retrying.
    async fn run_pass(
        &self,
        store: &mut RecordStore,
        ip: IpAddr,
        notifications: &mut JoinSet<()>,
    ) -> bool {
        match self.reconciler.reconcile(store, ip).await {
            Ok(report) => {
                info!(
                    %ip,
                    updated = report.updated_count(),
                    unchanged = report.unchanged,
                    evicted = report.refresh.evicted,
                    "Reconciliation pass completed"
                );

                if !report.updated.is_empty() {
                    self.dispatch_notifications(&report.updated, ip, notifications);
                }

                self.emit_event(EngineEvent::PassCompleted {
                    ip,
                    updated: report.updated,
                    unchanged: report.unchanged,
                });
                false
            }
            Err(e) => {
                error!(%ip, error = %e, "Reconciliation pass failed");
                self.emit_event(EngineEvent::PassFailed {
                    ip,
                    error: e.to_string(),
                });
                // The address family won't change by waiting
                !matches!(e, Error::InvalidInput(_))
            }
        }
    }

    /// Spawn one delivery per notifier; failures are logged only
    fn dispatch_notifications(
        &self,
        updated: &UpdatedRecords,
        ip: IpAddr,
        notifications: &mut JoinSet<()>,
    ) {
        for notifier in &self.notifiers {
            let notifier = Arc::clone(notifier);
            let updated = updated.clone();
            let event_tx = self.event_tx.clone();

            notifications.spawn(async move {
                match notifier.notify(&updated, ip).await {
                    Ok(()) => debug!(notifier = notifier.name(), "Notification sent"),
                    Err(e) => {
                        warn!(notifier = notifier.name(), error = %e, "Notification failed");
                        send_event(
                            &event_tx,
                            EngineEvent::NotificationFailed {
                                notifier: notifier.name().to_string(),
                                error: e.to_string(),
                            },
                        );
                    }
                }
            });
        }
    }

    fn emit_event(&self, event: EngineEvent) {
        send_event(&self.event_tx, event);
    }
}

/// Send an event, dropping it (with a warning) when the channel is full
fn send_event(tx: &mpsc::Sender<EngineEvent>, event: EngineEvent) {
    match tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
        // Nobody is listening; that's allowed.
        Err(mpsc::error::TrySendError::Closed(_)) => {}
    }
}
