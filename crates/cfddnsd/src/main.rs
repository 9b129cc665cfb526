// # cfddnsd - Cloudflare DDNS Daemon
//
// Thin integration layer. All reconciliation logic lives in cfddns-core.
//
// The daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Installing the tracing subscriber
// 3. Building the Cloudflare client, IP source and notifiers
// 4. Running the engine until SIGTERM/SIGINT
//
// ## Configuration
//
// ### Credentials
// - `AUTH_KEY`: Global API key, or an API token when `EMAIL` is unset (required)
// - `EMAIL`: Account email for the global API key
//
// ### Selection
// - `ZONE_ID`: Comma-separated zone IDs (takes precedence over `ZONE_NAME`)
// - `ZONE_NAME`: Comma-separated zone names
// - `RECORD_ID`: Comma-separated record IDs to manage (default: all)
// - `RECORD_TYPE`: `A` (default) or `AAAA`
//
// ### Behavior
// - `CHECK_INTERVAL`: Seconds between IP checks (default: 86400)
// - `IP_ECHO_URL`: IP-echo service (default: https://api.ipify.org)
// - `NOTIFICATION_URLS`: Comma-separated webhook URLs (http/https only; other
//   schemes are skipped with a warning)
// - `LOG_LEVEL`: trace, debug, info, warn, error (default: info)
// - `DDNS_MODE`: `live` (default) or `dry-run`
//
// ## Example
//
// ```bash
// export AUTH_KEY=your_api_token
// export ZONE_NAME=example.com
// export CHECK_INTERVAL=300
//
// cfddnsd
// ```

mod config;
mod notify;

use anyhow::Result;
use cfddns_cloudflare::CloudflareClient;
use cfddns_core::traits::IpVersion;
use cfddns_core::{DdnsEngine, EngineEvent, RecordType};
use cfddns_ip_http::HttpIpSource;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use crate::config::DaemonConfig;
use crate::notify::WebhookNotifier;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl DdnsExitCode {
    /// Classify a daemon error
    ///
    /// Bad settings and selections that match nothing won't fix themselves
    /// on restart; everything else might.
    fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<cfddns_core::Error>() {
            Some(
                cfddns_core::Error::Config(_)
                | cfddns_core::Error::NoZonesFound
                | cfddns_core::Error::NoRecordsFound,
            ) => DdnsExitCode::ConfigError,
            _ => DdnsExitCode::RuntimeError,
        }
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match DaemonConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DdnsExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration validation error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting cfddnsd daemon");

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_daemon(config).await {
            Ok(()) => DdnsExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                DdnsExitCode::for_error(&e)
            }
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: DaemonConfig) -> Result<()> {
    let provider = CloudflareClient::from_config(&config.ddns.provider)?;

    let version = match config.ddns.record_type {
        RecordType::Aaaa => IpVersion::V6,
        _ => IpVersion::V4,
    };
    let ip_source = HttpIpSource::from_config(&config.ddns.ip_source)?.with_version(version);

    info!(
        record_type = %config.ddns.record_type,
        interval_secs = config.ddns.ip_source.interval_secs,
        ip_echo = %config.ddns.ip_source.url,
        dry_run = config.ddns.provider.dry_run,
        "Configuration loaded"
    );

    let (mut engine, events) = DdnsEngine::new(Arc::new(ip_source), Arc::new(provider), config.ddns)?;

    if !config.notification_urls.is_empty() {
        let notifier = WebhookNotifier::new(config.notification_urls)?;
        if notifier.url_count() > 0 {
            info!(count = notifier.url_count(), "Webhook notifications enabled");
            engine = engine.with_notifier(Arc::new(notifier));
        }
    }

    let cancel = CancellationToken::new();

    let signals = tokio::spawn(wait_for_shutdown(cancel.clone()));
    let event_log = tokio::spawn(log_events(events));

    let result = engine.run(cancel.clone()).await;

    // The engine may have stopped on its own; release the signal task either way
    cancel.cancel();
    if let Ok(Err(e)) = signals.await {
        warn!("Signal handling error: {:#}", e);
    }
    let _ = event_log.await;

    result?;
    info!("Shutdown complete");
    Ok(())
}

/// Log engine events at debug level
async fn log_events(mut events: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        debug!(?event, "Engine event");
    }
}

/// Cancel `cancel` on SIGTERM or SIGINT
///
/// Returns early without error if `cancel` fires first.
#[cfg(unix)]
async fn wait_for_shutdown(cancel: CancellationToken) -> Result<()> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let received = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
        _ = cancel.cancelled() => return Ok(()),
    };

    info!("Received shutdown signal: {}", received);
    cancel.cancel();
    Ok(())
}

/// Cancel `cancel` on CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown(cancel: CancellationToken) -> Result<()> {
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
            info!("Received shutdown signal: SIGINT");
            cancel.cancel();
        }
        _ = cancel.cancelled() => {}
    }
    Ok(())
}
