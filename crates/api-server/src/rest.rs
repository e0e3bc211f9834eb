//! REST handlers. Each one parses the request, calls into the core and maps
//! the result; no business rules live here.

use crate::error::ApiError;
use adportal_analytics::{summarize, AnalyticsIngestor, PerformanceSummary};
use adportal_core::models::{AdAsset, AdIntegration};
use adportal_core::Platform;
use adportal_fanout::{CreateAdRequest, FanoutOrchestrator, FanoutReport};
use adportal_integrations::{IntegrationRegistry, OAuthGrant};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: FanoutOrchestrator,
    pub registry: Arc<IntegrationRegistry>,
    pub ingestor: Arc<AnalyticsIngestor>,
    pub node_id: String,
    pub start_time: Instant,
}

fn parse_platform(raw: &str) -> Result<Platform, ApiError> {
    raw.parse::<Platform>().map_err(ApiError::bad_request)
}

// ─── Campaigns ──────────────────────────────────────────────────────────────

/// POST /api/v1/organizations/:org_id/ads
pub async fn create_ad(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
    Json(request): Json<CreateAdRequest>,
) -> Result<(StatusCode, Json<FanoutReport>), ApiError> {
    metrics::counter!("api.create_ad").increment(1);
    let report = state.orchestrator.create_ad(org_id, &request).await.map_err(|e| {
        warn!(organization_id = %org_id, error = %e, "Create-ad rejected");
        ApiError::from(e)
    })?;
    Ok((StatusCode::CREATED, Json(report)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ResyncRequest {
    #[serde(default)]
    pub platforms: Option<Vec<Platform>>,
}

/// POST /api/v1/campaigns/:campaign_id/sync
pub async fn resync_campaign(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
    body: Option<Json<ResyncRequest>>,
) -> Result<Json<FanoutReport>, ApiError> {
    metrics::counter!("api.resync").increment(1);
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let report = state
        .orchestrator
        .resync(campaign_id, request.platforms.as_deref())
        .await?;
    Ok(Json(report))
}

/// GET /api/v1/campaigns/:campaign_id/status
pub async fn campaign_status(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<FanoutReport>, ApiError> {
    Ok(Json(state.orchestrator.status(campaign_id)?))
}

// ─── Integrations ───────────────────────────────────────────────────────────

/// PUT /api/v1/organizations/:org_id/integrations/:platform
pub async fn connect_integration(
    State(state): State<AppState>,
    Path((org_id, platform)): Path<(Uuid, String)>,
    Json(grant): Json<OAuthGrant>,
) -> Result<Json<AdIntegration>, ApiError> {
    let platform = parse_platform(&platform)?;
    if grant.access_token.trim().is_empty() {
        return Err(ApiError::bad_request("access_token must not be empty"));
    }
    metrics::counter!("api.integrations.connect", "platform" => platform.as_str()).increment(1);
    Ok(Json(state.registry.connect(org_id, platform, grant)))
}

#[derive(Debug, Deserialize)]
pub struct SelectAccountRequest {
    pub ad_account_id: String,
    #[serde(default)]
    pub ad_account_name: Option<String>,
}

/// PUT /api/v1/organizations/:org_id/integrations/:platform/account
pub async fn select_account(
    State(state): State<AppState>,
    Path((org_id, platform)): Path<(Uuid, String)>,
    Json(request): Json<SelectAccountRequest>,
) -> Result<Json<AdIntegration>, ApiError> {
    let platform = parse_platform(&platform)?;
    if request.ad_account_id.trim().is_empty() {
        return Err(ApiError::bad_request("ad_account_id must not be empty"));
    }
    let integration =
        state
            .registry
            .select_ad_account(org_id, platform, &request.ad_account_id, request.ad_account_name)?;
    Ok(Json(integration))
}

#[derive(Debug, Deserialize)]
pub struct ActivationRequest {
    pub active: bool,
}

/// PUT /api/v1/organizations/:org_id/integrations/:platform/active
pub async fn set_integration_active(
    State(state): State<AppState>,
    Path((org_id, platform)): Path<(Uuid, String)>,
    Json(request): Json<ActivationRequest>,
) -> Result<Json<AdIntegration>, ApiError> {
    let platform = parse_platform(&platform)?;
    Ok(Json(state.registry.set_active(org_id, platform, request.active)?))
}

/// GET /api/v1/organizations/:org_id/integrations
pub async fn list_integrations(State(state): State<AppState>, Path(org_id): Path<Uuid>) -> Json<Vec<AdIntegration>> {
    Json(state.registry.list(org_id))
}

// ─── Assets ─────────────────────────────────────────────────────────────────

/// GET /api/v1/organizations/:org_id/assets
pub async fn list_assets(State(state): State<AppState>, Path(org_id): Path<Uuid>) -> Json<Vec<AdAsset>> {
    Json(state.orchestrator.ledger().assets().list_for_organization(org_id))
}

#[derive(Debug, Deserialize)]
pub struct RenameAssetRequest {
    pub file_name: String,
}

/// PUT /api/v1/organizations/:org_id/assets/:asset_id
pub async fn rename_asset(
    State(state): State<AppState>,
    Path((org_id, asset_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<RenameAssetRequest>,
) -> Result<Json<AdAsset>, ApiError> {
    let file_name = request.file_name.trim();
    if file_name.is_empty() {
        return Err(ApiError::bad_request("file_name must not be empty"));
    }
    let assets = state.orchestrator.ledger().assets();
    assets.check_owner(org_id, &[asset_id])?;
    Ok(Json(assets.rename(asset_id, file_name)?))
}

/// POST /api/v1/organizations/:org_id/assets/:asset_id/archive
pub async fn archive_asset(
    State(state): State<AppState>,
    Path((org_id, asset_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<AdAsset>, ApiError> {
    let assets = state.orchestrator.ledger().assets();
    assets.check_owner(org_id, &[asset_id])?;
    let archived = assets.archive(asset_id)?;
    info!(organization_id = %org_id, asset_id = %asset_id, "Asset archived");
    Ok(Json(archived))
}

// ─── Analytics ──────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct IngestRequest {
    /// Defaults to yesterday (UTC).
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Defaults to every active integration of the organization.
    #[serde(default)]
    pub platforms: Option<Vec<Platform>>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub date: NaiveDate,
    pub facts: BTreeMap<Platform, usize>,
    pub errors: BTreeMap<Platform, String>,
}

/// POST /api/v1/organizations/:org_id/analytics/ingest
pub async fn ingest_analytics(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
    body: Option<Json<IngestRequest>>,
) -> Json<IngestResponse> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let date = request
        .date
        .unwrap_or_else(|| Utc::now().date_naive() - Duration::days(1));
    let platforms = request.platforms.unwrap_or_else(|| {
        state
            .registry
            .list(org_id)
            .into_iter()
            .filter(|i| i.is_active)
            .map(|i| i.platform)
            .collect()
    });

    let mut response = IngestResponse {
        date,
        facts: BTreeMap::new(),
        errors: BTreeMap::new(),
    };
    for platform in platforms {
        match state.ingestor.ingest(org_id, platform, date).await {
            Ok(n) => {
                response.facts.insert(platform, n);
            }
            Err(e) => {
                response.errors.insert(platform, e.to_string());
            }
        }
    }
    info!(
        organization_id = %org_id,
        date = %date,
        failed = response.errors.len(),
        "On-demand ingest finished"
    );
    Json(response)
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// GET /api/v1/organizations/:org_id/analytics/summary?from=&to=
pub async fn analytics_summary(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
    Query(range): Query<SummaryQuery>,
) -> Result<Json<PerformanceSummary>, ApiError> {
    if range.from > range.to {
        return Err(ApiError::bad_request("'from' must not be after 'to'"));
    }
    Ok(Json(summarize(state.ingestor.facts(), org_id, range.from, range.to)))
}

// ─── Operational ────────────────────────────────────────────────────────────

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready
pub async fn readiness() -> StatusCode {
    StatusCode::OK
}

/// GET /live
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
}
