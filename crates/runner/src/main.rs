mod metrics;
mod server;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dispatcher_core::{
    config::LogFormat, create_sink, load_config, load_config_from_env, open_store,
    validate_config, Config, CsvDirectorySource, DispatchEngine, ItemSource, SanitizedConfig,
    StopReason,
};

/// Application version
pub(crate) const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Config file used when `DISPATCHER_CONFIG` is not set.
const DEFAULT_CONFIG_PATH: &str = "dispatcher.toml";

#[tokio::main]
async fn main() {
    let config = match load() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(LogFormat::Pretty);
            error!("Fatal error: {:#}", e);
            std::process::exit(1);
        }
    };
    init_tracing(config.logging.format);

    if let Err(e) = run(config).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Load from `DISPATCHER_CONFIG`, else `dispatcher.toml` if present, else the
/// environment alone.
fn load() -> Result<Config> {
    match std::env::var("DISPATCHER_CONFIG") {
        Ok(path) => load_from(Path::new(&path)),
        Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            load_from(Path::new(DEFAULT_CONFIG_PATH))
        }
        Err(_) => load_config_from_env().context("Failed to load config from environment"),
    }
}

fn load_from(path: &Path) -> Result<Config> {
    load_config(path).with_context(|| format!("Failed to load config from {:?}", path))
}

/// Short sha256 of the sanitized config, logged so runs can be correlated with settings.
fn config_hash(config: &Config) -> String {
    let sanitized = SanitizedConfig::from(config);
    let config_json = serde_json::to_string(&sanitized).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    config_hash[..16].to_string()
}

async fn run(config: Config) -> Result<()> {
    validate_config(&config).context("Configuration validation failed")?;

    info!(
        version = VERSION,
        config_hash = %config_hash(&config),
        "Configuration loaded successfully"
    );
    info!("Source directory: {:?}", config.source.dir);
    info!(
        "Status backend: {:?} at {:?}",
        config.status.backend, config.status.path
    );

    let source: Arc<dyn ItemSource> = Arc::new(
        CsvDirectorySource::from_config(&config.source).context("Failed to create item source")?,
    );
    let sink = create_sink(&config.sink).context("Failed to create request sink")?;
    info!("Using request sink: {}", sink.name());
    let status = open_store(&config.status).context("Failed to open status store")?;

    // Metrics endpoint lives for the duration of the run.
    let server_shutdown = CancellationToken::new();
    let metrics_server = match config.metrics.listen {
        Some(addr) => Some(server::spawn(addr, server_shutdown.clone()).await?),
        None => None,
    };

    let cancel = CancellationToken::new();
    let signal_task = tokio::spawn(cancel_on_signal(cancel.clone()));

    let mut engine = DispatchEngine::new(config.dispatch.clone(), source, sink, status)
        .context("Failed to create dispatch engine")?
        .with_cancellation(cancel)
        .with_observer(metrics::observer());

    let result = engine.run().await;

    if let Err(e) = engine.flush_status().await {
        warn!("Final status flush failed: {}", e);
    }

    signal_task.abort();
    server_shutdown.cancel();
    if let Some(handle) = metrics_server {
        if let Err(e) = handle.await {
            warn!("Metrics server task failed: {}", e);
        }
    }

    let summary = result.context("Dispatch run failed")?;
    match summary.stop_reason {
        StopReason::Completed => info!("All sources dispatched"),
        StopReason::CeilingReached => info!("Stopped at the global item ceiling"),
        StopReason::Cancelled => info!("Stopped on shutdown signal"),
    }
    if summary.degraded {
        warn!("Some status changes were not persisted; they will be resubmitted next run");
    }
    Ok(())
}

/// Cancel `token` on Ctrl+C or SIGTERM.
async fn cancel_on_signal(token: CancellationToken) {
    shutdown_signal().await;
    info!("Shutdown signal received, draining in-flight submissions");
    token.cancel();
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
