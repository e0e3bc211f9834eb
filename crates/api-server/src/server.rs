//! API server: REST routes plus the Prometheus exporter.

use crate::rest::{self, AppState};
use adportal_core::config::AppConfig;
use axum::routing::{get, post, put};
use axum::Router;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct ApiServer {
    config: AppConfig,
    state: AppState,
}

/// All REST routes bound to `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Campaigns
        .route("/api/v1/organizations/:org_id/ads", post(rest::create_ad))
        .route("/api/v1/campaigns/:campaign_id/sync", post(rest::resync_campaign))
        .route("/api/v1/campaigns/:campaign_id/status", get(rest::campaign_status))
        // Integrations
        .route("/api/v1/organizations/:org_id/integrations", get(rest::list_integrations))
        .route(
            "/api/v1/organizations/:org_id/integrations/:platform",
            put(rest::connect_integration),
        )
        .route(
            "/api/v1/organizations/:org_id/integrations/:platform/account",
            put(rest::select_account),
        )
        .route(
            "/api/v1/organizations/:org_id/integrations/:platform/active",
            put(rest::set_integration_active),
        )
        // Assets
        .route("/api/v1/organizations/:org_id/assets", get(rest::list_assets))
        .route("/api/v1/organizations/:org_id/assets/:asset_id", put(rest::rename_asset))
        .route("/api/v1/organizations/:org_id/assets/:asset_id/archive", post(rest::archive_asset))
        // Analytics
        .route("/api/v1/organizations/:org_id/analytics/ingest", post(rest::ingest_analytics))
        .route("/api/v1/organizations/:org_id/analytics/summary", get(rest::analytics_summary))
        // Operational endpoints
        .route("/health", get(rest::health_check))
        .route("/ready", get(rest::readiness))
        .route("/live", get(rest::liveness))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

impl ApiServer {
    pub fn new(config: AppConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = router(self.state.clone());
        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Install the Prometheus recorder and its HTTP listener on the metrics port.
    pub fn start_metrics(&self) -> anyhow::Result<()> {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(SocketAddr::new(self.config.api.host.parse()?, self.config.metrics.port))
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }
}
