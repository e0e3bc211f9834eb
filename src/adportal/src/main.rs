//! AdPortal: multi-platform ad campaign backend.
//!
//! Main entry point that wires the registry, ledger, adapters, orchestrator
//! and ingestor together and starts the servers.

use adportal_adapters::AdapterSet;
use adportal_analytics::{AnalyticsIngestor, FactStore};
use adportal_api::{ApiServer, AppState};
use adportal_core::config::AppConfig;
use adportal_fanout::FanoutOrchestrator;
use adportal_integrations::{GoogleTokenRefresher, IntegrationRegistry};
use adportal_ledger::LedgerStore;
use clap::Parser;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "adportal")]
#[command(about = "Create and track ad campaigns across Meta, Google and TikTok")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "ADPORTAL__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "ADPORTAL__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Prometheus exporter port (overrides config)
    #[arg(long, env = "ADPORTAL__METRICS__PORT")]
    metrics_port: Option<u16>,

    /// Skip the periodic analytics ingest
    #[arg(long, default_value_t = false)]
    no_ingest: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adportal=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("AdPortal starting up");

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(port) = cli.metrics_port {
        config.metrics.port = port;
    }
    if cli.no_ingest {
        config.analytics.enabled = false;
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        metrics_port = config.metrics.port,
        ingest = config.analytics.enabled,
        "Configuration loaded"
    );

    let request_timeout = Duration::from_millis(config.platforms.request_timeout_ms);
    let adapters = AdapterSet::from_config(&config.platforms)?;
    let registry = Arc::new(
        IntegrationRegistry::new().with_refresher(Arc::new(GoogleTokenRefresher::new(
            &config.platforms.google,
            request_timeout,
        )?)),
    );
    let ledger = Arc::new(LedgerStore::new());
    let orchestrator = FanoutOrchestrator::new(ledger, registry.clone(), adapters.clone(), &config.fanout);
    let ingestor = Arc::new(AnalyticsIngestor::new(
        registry.clone(),
        adapters,
        Arc::new(FactStore::new()),
    ));

    let api_server = ApiServer::new(
        config.clone(),
        AppState {
            orchestrator,
            registry,
            ingestor: ingestor.clone(),
            node_id: config.node_id.clone(),
            start_time: Instant::now(),
        },
    );

    if let Err(e) = api_server.start_metrics() {
        error!(error = %e, "Failed to start metrics exporter");
    }

    if config.analytics.enabled {
        let every = Duration::from_secs(config.analytics.ingest_interval_secs.max(1));
        ingestor.spawn_periodic(every);
        info!(interval_secs = every.as_secs(), "Periodic analytics ingest scheduled");
    } else {
        info!("Periodic analytics ingest disabled");
    }

    info!("AdPortal is ready to serve traffic");

    // Blocks until shutdown
    api_server.start_http().await?;

    Ok(())
}
