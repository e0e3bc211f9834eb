//! Campaign Fan-out Orchestrator.
//!
//! Drives each (campaign, platform) pair through
//! UNCREATED → CAMPAIGN_CREATED → ADGROUP_CREATED → AD_CREATED, one
//! independent chain per platform. Every step is check-then-create under the
//! row's lock, so re-running a chain never duplicates a remote object.

use crate::error::{FanoutError, FanoutResult};
use crate::request::CreateAdRequest;
use crate::retry::RetryPolicy;
use adportal_adapters::{
    AdGroupInput, AdapterError, AdapterResult, AdapterSet, CampaignInput, PlatformAdapter, RequestContext,
};
use adportal_core::config::FanoutConfig;
use adportal_core::models::*;
use adportal_core::types::{CampaignStatus, FanoutStage};
use adportal_core::Platform;
use adportal_integrations::IntegrationRegistry;
use adportal_ledger::{LedgerError, LedgerResult, LedgerStore, PlatformSnapshot, SyncTarget};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Per-platform outcome of a create, re-sync or status call.
#[derive(Debug, Clone, Serialize)]
pub struct FanoutReport {
    pub campaign: UnifiedCampaign,
    pub outcomes: Vec<PlatformSnapshot>,
}

impl FanoutReport {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.stage.is_terminal_success())
    }

    pub fn outcome(&self, platform: Platform) -> Option<&PlatformSnapshot> {
        self.outcomes.iter().find(|o| o.platform == platform)
    }
}

/// Platform-agnostic content every chain builds its rows from.
#[derive(Debug, Clone)]
struct Blueprint {
    targeting: NormalizedTargeting,
    creative: Creative,
    asset_ids: Vec<Uuid>,
}

struct ChainRows {
    platform_campaign: PlatformCampaign,
    ad_group: AdGroup,
    ad: Ad,
}

#[derive(Clone)]
pub struct FanoutOrchestrator {
    ledger: Arc<LedgerStore>,
    registry: Arc<IntegrationRegistry>,
    adapters: AdapterSet,
    retry: RetryPolicy,
    reconcile_on_timeout: bool,
}

impl FanoutOrchestrator {
    pub fn new(
        ledger: Arc<LedgerStore>,
        registry: Arc<IntegrationRegistry>,
        adapters: AdapterSet,
        config: &FanoutConfig,
    ) -> Self {
        info!(
            max_retries = config.max_retries,
            reconcile_on_timeout = config.reconcile_on_timeout,
            "Fan-out orchestrator initialized"
        );
        Self {
            ledger,
            registry,
            adapters,
            retry: RetryPolicy::from(config),
            reconcile_on_timeout: config.reconcile_on_timeout,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn ledger(&self) -> &Arc<LedgerStore> {
        &self.ledger
    }

    // ─── Entry points ───────────────────────────────────────────────────

    /// Validate, write the campaign and budgets, then materialize the
    /// campaign on every requested platform. Nothing is written if a
    /// requested platform has no active integration.
    pub async fn create_ad(&self, organization_id: Uuid, request: &CreateAdRequest) -> FanoutResult<FanoutReport> {
        let validated = request.validate(organization_id)?;

        let missing = self.registry.missing_platforms(organization_id, &validated.platforms);
        if !missing.is_empty() {
            warn!(organization_id = %organization_id, missing = ?missing, "Create-ad rejected: missing integrations");
            return Err(FanoutError::MissingIntegrations(missing));
        }
        if let Some(platform) = validated.platforms.iter().find(|p| self.adapters.get(**p).is_none()) {
            return Err(FanoutError::AdapterUnavailable(*platform));
        }

        // The campaign write carries the name and budget checks; the asset is
        // only registered once it has succeeded.
        let (campaign, budgets) = self.ledger.create_campaign(validated.campaign)?;
        let asset_ids = match validated.asset {
            Some(asset) => vec![self.ledger.assets().register(asset)?.id],
            None => Vec::new(),
        };
        let blueprint = Blueprint {
            targeting: validated.targeting,
            creative: validated.creative,
            asset_ids,
        };

        let outcomes = self.fan_out(&campaign, budgets, &blueprint).await;
        let report = FanoutReport { campaign, outcomes };
        info!(
            campaign_id = %report.campaign.id,
            all_succeeded = report.all_succeeded(),
            "Create-ad finished"
        );
        Ok(report)
    }

    /// Re-run the chains of an existing campaign from its stored rows,
    /// optionally for a subset of its platforms.
    pub async fn resync(&self, campaign_id: Uuid, platforms: Option<&[Platform]>) -> FanoutResult<FanoutReport> {
        let campaign = self.campaign(campaign_id)?;
        let mut budgets = self.ledger.budgets(campaign_id);
        if let Some(platforms) = platforms {
            if let Some(unknown) = platforms.iter().find(|p| !budgets.iter().any(|b| b.platform == **p)) {
                return Err(FanoutError::InvalidRequest(format!(
                    "campaign {campaign_id} has no {unknown} budget"
                )));
            }
            budgets.retain(|b| platforms.contains(&b.platform));
        }
        let blueprint = self.stored_blueprint(&campaign)?;

        let outcomes = self.fan_out(&campaign, budgets, &blueprint).await;
        Ok(FanoutReport { campaign, outcomes })
    }

    pub fn status(&self, campaign_id: Uuid) -> FanoutResult<FanoutReport> {
        let campaign = self.campaign(campaign_id)?;
        let outcomes = self.ledger.campaign_status(campaign_id)?;
        Ok(FanoutReport { campaign, outcomes })
    }

    fn campaign(&self, campaign_id: Uuid) -> FanoutResult<UnifiedCampaign> {
        self.ledger.campaign(campaign_id).map_err(|e| match e {
            LedgerError::NotFound { .. } => FanoutError::CampaignNotFound(campaign_id),
            other => FanoutError::LocalPersistence(other),
        })
    }

    /// Targeting and creative are identical across platforms; read them back
    /// from any platform's rows.
    fn stored_blueprint(&self, campaign: &UnifiedCampaign) -> FanoutResult<Blueprint> {
        self.ledger
            .platform_campaigns_for(campaign.id)
            .into_iter()
            .find_map(|pc| {
                let group = self.ledger.ad_group_for(pc.id)?;
                let ad = self.ledger.ad_for(group.id)?;
                Some(Blueprint {
                    targeting: group.normalized_targeting,
                    creative: ad.creative,
                    asset_ids: ad.asset_ids,
                })
            })
            .ok_or_else(|| {
                FanoutError::InvalidRequest(format!("campaign {} has no stored ad to re-sync", campaign.id))
            })
    }

    // ─── Fan-out ────────────────────────────────────────────────────────

    async fn fan_out(
        &self,
        campaign: &UnifiedCampaign,
        budgets: Vec<CampaignBudget>,
        blueprint: &Blueprint,
    ) -> Vec<PlatformSnapshot> {
        let mut platforms: Vec<Platform> = budgets.iter().map(|b| b.platform).collect();
        platforms.sort();

        let mut chains = JoinSet::new();
        for budget in budgets {
            let this = self.clone();
            let campaign = campaign.clone();
            let blueprint = blueprint.clone();
            chains.spawn(async move {
                let platform = budget.platform;
                let aborted = this.run_platform(&campaign, &budget, &blueprint).await.err();
                (platform, aborted)
            });
        }

        // Failures that happened before the platform had rows to record them on.
        let mut aborted: HashMap<Platform, String> = HashMap::new();
        let mut finished: HashSet<Platform> = HashSet::new();
        while let Some(joined) = chains.join_next().await {
            match joined {
                Ok((platform, reason)) => {
                    finished.insert(platform);
                    if let Some(reason) = reason {
                        aborted.insert(platform, reason);
                    }
                }
                Err(e) => error!(campaign_id = %campaign.id, error = %e, "Platform chain panicked"),
            }
        }
        // A chain that never returned cannot have recorded its own failure.
        for platform in platforms.iter().filter(|p| !finished.contains(*p)) {
            metrics::counter!("fanout.chain_aborted", "platform" => platform.as_str()).increment(1);
            let reason = format!("{platform} sync aborted unexpectedly; re-sync to retry");
            if let Some(target) = pending_target(&self.ledger.snapshot(campaign.id, *platform)) {
                self.record(target, &reason);
            }
            aborted.insert(*platform, reason);
        }

        platforms
            .into_iter()
            .map(|platform| {
                let mut snapshot = self.ledger.snapshot(campaign.id, platform);
                if let Some(reason) = aborted.remove(&platform) {
                    snapshot.stage = FanoutStage::Error;
                    snapshot.error_message = Some(reason);
                }
                snapshot
            })
            .collect()
    }

    /// One platform's chain. Adapter and credential failures are recorded on
    /// the rows; `Err` carries failures that happened before any row existed.
    async fn run_platform(
        &self,
        campaign: &UnifiedCampaign,
        budget: &CampaignBudget,
        blueprint: &Blueprint,
    ) -> Result<(), String> {
        let platform = budget.platform;
        let adapter = self
            .adapters
            .get(platform)
            .ok_or_else(|| FanoutError::AdapterUnavailable(platform).to_string())?;
        let integration = self
            .registry
            .integration(campaign.organization_id, platform)
            .map_err(|e| e.to_string())?;
        let rows = self
            .ensure_rows(campaign, budget, blueprint, adapter.as_ref(), integration.id)
            .map_err(|e| e.to_string())?;
        let campaign_target = SyncTarget::PlatformCampaign(rows.platform_campaign.id);
        let group_target = SyncTarget::AdGroup(rows.ad_group.id);
        let ad_target = SyncTarget::Ad(rows.ad.id);

        let credential = match self.registry.get_credential(campaign.organization_id, platform).await {
            Ok(credential) => credential,
            Err(e) => {
                warn!(campaign_id = %campaign.id, platform = %platform, error = %e, "No usable credential");
                self.record(campaign_target, &e.to_string());
                return Ok(());
            }
        };
        let ctx = RequestContext::new(&credential, self.adapters.request_timeout());
        let ctx = &ctx;
        let adapter: &dyn PlatformAdapter = adapter.as_ref();

        // Campaign
        let platform_campaign = &rows.platform_campaign;
        let input = CampaignInput { campaign, budget, platform_campaign };
        let campaign_name = platform_campaign.name.as_str();
        let created = self
            .run_step(
                platform,
                "campaign",
                campaign_target,
                move || adapter.create_campaign(ctx, input),
                move || adapter.find_campaign_by_name(ctx, campaign_name),
            )
            .await;
        let Some(external_campaign_id) = created else {
            return Ok(());
        };

        // Ad group
        let group = self.ledger.ad_group(rows.ad_group.id).map_err(|e| e.to_string())?;
        if !group.sync.is_created() {
            match adapter.translate_targeting(&group.normalized_targeting) {
                Ok(config) => self
                    .ledger
                    .set_targeting_config(group.id, config)
                    .map_err(|e| e.to_string())?,
                Err(e) => {
                    self.step_failed(platform, "ad_group", group_target, &e);
                    return Ok(());
                }
            }
        }
        let group = self.ledger.ad_group(rows.ad_group.id).map_err(|e| e.to_string())?;
        let platform_campaign = self
            .ledger
            .platform_campaign(rows.platform_campaign.id)
            .map_err(|e| e.to_string())?;
        let (group_ref, platform_campaign_ref) = (&group, &platform_campaign);
        let input = AdGroupInput {
            campaign,
            budget,
            platform_campaign: platform_campaign_ref,
            ad_group: group_ref,
        };
        let external_campaign_id = external_campaign_id.as_str();
        let created = self
            .run_step(
                platform,
                "ad_group",
                group_target,
                move || adapter.create_ad_group(ctx, input),
                move || adapter.find_ad_group_by_name(ctx, external_campaign_id, &group_ref.name),
            )
            .await;
        let Some(external_group_id) = created else {
            return Ok(());
        };

        // Assets + ad
        let group = self.ledger.ad_group(rows.ad_group.id).map_err(|e| e.to_string())?;
        let ad = self.ledger.ad(rows.ad.id).map_err(|e| e.to_string())?;
        let (group_ref, ad_ref) = (&group, &ad);
        let external_group_id = external_group_id.as_str();
        let integration_id = integration.id;
        let created = self
            .run_step(
                platform,
                "ad",
                ad_target,
                move || self.upload_and_create_ad(adapter, ctx, integration_id, group_ref, ad_ref),
                move || adapter.find_ad_by_name(ctx, external_group_id, &ad_ref.name),
            )
            .await;

        if created.is_some() {
            for asset_id in &ad.asset_ids {
                if let Err(e) = self.ledger.assets().mark_in_use(*asset_id) {
                    warn!(asset_id = %asset_id, error = %e, "Could not mark asset in use");
                }
            }
            info!(campaign_id = %campaign.id, platform = %platform, "Platform chain complete");
        }
        Ok(())
    }

    /// Insert the chain's rows if missing; existing rows are returned as stored.
    fn ensure_rows(
        &self,
        campaign: &UnifiedCampaign,
        budget: &CampaignBudget,
        blueprint: &Blueprint,
        adapter: &dyn PlatformAdapter,
        integration_id: Uuid,
    ) -> LedgerResult<ChainRows> {
        let platform_campaign = self.ledger.ensure_platform_campaign(PlatformCampaign {
            id: Uuid::new_v4(),
            campaign_id: campaign.id,
            integration_id,
            platform: budget.platform,
            name: campaign.name.clone(),
            status: CampaignStatus::Paused,
            extra: adapter.campaign_extra(budget),
            capabilities: adapter.capabilities(),
            sync: Default::default(),
        })?;

        let (start_time, end_time) = flight(budget, Utc::now());
        let ad_group = self.ledger.ensure_ad_group(AdGroup {
            id: Uuid::new_v4(),
            platform_campaign_id: platform_campaign.id,
            name: format!("{} Ad Group", campaign.name),
            targeting_config: serde_json::Value::Null,
            normalized_targeting: blueprint.targeting.clone(),
            bidding_config: adapter.map_objective(campaign.objective),
            start_time,
            end_time,
            status: CampaignStatus::Paused,
            sync: Default::default(),
        })?;

        let ad = self.ledger.ensure_ad(Ad {
            id: Uuid::new_v4(),
            ad_group_id: ad_group.id,
            name: blueprint.creative.ad_name.clone(),
            creative: blueprint.creative.clone(),
            asset_ids: blueprint.asset_ids.clone(),
            status: CampaignStatus::Paused,
            sync: Default::default(),
        })?;

        Ok(ChainRows { platform_campaign, ad_group, ad })
    }

    /// Upload any asset not yet uploaded through this integration, then create
    /// the ad referencing the platform-side asset ids.
    async fn upload_and_create_ad(
        &self,
        adapter: &dyn PlatformAdapter,
        ctx: &RequestContext,
        integration_id: Uuid,
        ad_group: &AdGroup,
        ad: &Ad,
    ) -> AdapterResult<String> {
        let assets = self.ledger.assets();
        let mut uploaded = Vec::with_capacity(ad.asset_ids.len());
        for asset_id in &ad.asset_ids {
            let content = assets
                .content(*asset_id)
                .map_err(|e| AdapterError::validation(ctx.platform, e.to_string()))?;
            let platform_asset_id = match assets.platform_asset(*asset_id, integration_id) {
                Some(existing) => existing.platform_asset_id,
                None => {
                    let platform_asset_id = adapter.upload_asset(ctx, &content).await?;
                    debug!(asset_id = %asset_id, platform = %ctx.platform, "Asset uploaded");
                    assets
                        .record_platform_asset(PlatformAsset {
                            asset_id: *asset_id,
                            integration_id,
                            platform: ctx.platform,
                            platform_asset_id,
                            uploaded_at: Utc::now(),
                        })
                        .platform_asset_id
                }
            };
            uploaded.push(UploadedAsset {
                asset_id: *asset_id,
                kind: content.asset.kind,
                platform_asset_id,
            });
        }
        adapter.create_ad(ctx, ad_group, ad, &uploaded).await
    }

    // ─── Step execution ─────────────────────────────────────────────────

    /// Check-then-create for one row, under that row's lock. Returns the
    /// external id when the object exists remotely, `None` once a failure has
    /// been recorded on the row.
    async fn run_step<C, CF, R, RF>(
        &self,
        platform: Platform,
        step: &'static str,
        target: SyncTarget,
        create: C,
        reconcile: R,
    ) -> Option<String>
    where
        C: Fn() -> CF,
        CF: Future<Output = AdapterResult<String>>,
        R: Fn() -> RF,
        RF: Future<Output = AdapterResult<Option<String>>>,
    {
        let _row = self.ledger.lock(target).await;
        let state = match self.ledger.sync_state(target) {
            Ok(state) => state,
            Err(e) => {
                error!(platform = %platform, step, error = %e, "Sync row vanished");
                return None;
            }
        };

        if let Some(existing) = state.external_id {
            debug!(platform = %platform, step, external_id = %existing, "Already created; skipping");
            if let Err(e) = self.ledger.record_verified(target) {
                warn!(platform = %platform, step, error = %e, "Could not refresh sync timestamp");
            }
            return Some(existing);
        }

        // A previous attempt may have ended with an unknown outcome.
        if state.has_error() && self.reconcile_on_timeout {
            if let Ok(Some(found)) = reconcile().await {
                metrics::counter!("fanout.reconciled", "platform" => platform.as_str(), "step" => step).increment(1);
                info!(platform = %platform, step, external_id = %found, "Found object left by an earlier attempt");
                return self.commit(platform, step, target, &found);
            }
        }

        let mut attempt: u32 = 0;
        loop {
            let error = match create().await {
                Ok(external_id) => return self.commit(platform, step, target, &external_id),
                Err(error) => error,
            };

            if error.is_timeout() && self.reconcile_on_timeout {
                match reconcile().await {
                    Ok(Some(found)) => {
                        metrics::counter!("fanout.reconciled", "platform" => platform.as_str(), "step" => step)
                            .increment(1);
                        info!(platform = %platform, step, external_id = %found, "Timed-out create found on platform");
                        return self.commit(platform, step, target, &found);
                    }
                    Ok(None) => debug!(platform = %platform, step, "Timed-out create not found on platform"),
                    Err(lookup) => {
                        // Without a lookup the outcome stays unknown; creating
                        // again could duplicate the object.
                        warn!(platform = %platform, step, error = %lookup, "Reconciliation lookup failed");
                        self.step_failed(platform, step, target, &error);
                        return None;
                    }
                }
            }

            if error.is_retryable() && attempt < self.retry.max_retries {
                let delay = self.retry.backoff_for_attempt(attempt);
                attempt += 1;
                metrics::counter!("fanout.steps.retried", "platform" => platform.as_str(), "step" => step).increment(1);
                warn!(
                    platform = %platform,
                    step,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Transient failure; retrying"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            self.step_failed(platform, step, target, &error);
            return None;
        }
    }

    fn commit(&self, platform: Platform, step: &'static str, target: SyncTarget, external_id: &str) -> Option<String> {
        match self.ledger.record_success(target, external_id) {
            Ok(_) => {
                metrics::counter!("fanout.steps.succeeded", "platform" => platform.as_str(), "step" => step)
                    .increment(1);
                info!(platform = %platform, step, external_id, "Step succeeded");
                Some(external_id.to_string())
            }
            Err(e) => {
                error!(platform = %platform, step, error = %e, "Could not record external id");
                self.record(target, &e.to_string());
                None
            }
        }
    }

    fn step_failed(&self, platform: Platform, step: &'static str, target: SyncTarget, error: &AdapterError) {
        metrics::counter!(
            "fanout.steps.failed",
            "platform" => platform.as_str(),
            "step" => step,
            "kind" => error.kind()
        )
        .increment(1);
        warn!(platform = %platform, step, kind = error.kind(), error = %error, "Step failed");
        self.record(target, &error.to_string());
    }

    fn record(&self, target: SyncTarget, message: &str) {
        if let Err(e) = self.ledger.record_error(target, message) {
            error!(target = ?target, error = %e, "Could not record sync error");
        }
    }
}

/// The shallowest row that exists but has no external id yet.
fn pending_target(snapshot: &PlatformSnapshot) -> Option<SyncTarget> {
    let levels = [
        (snapshot.platform_campaign_id.map(SyncTarget::PlatformCampaign), &snapshot.external_campaign_id),
        (snapshot.ad_group_id.map(SyncTarget::AdGroup), &snapshot.external_ad_group_id),
        (snapshot.ad_id.map(SyncTarget::Ad), &snapshot.external_ad_id),
    ];
    levels
        .into_iter()
        .find(|(_, external_id)| external_id.is_none())
        .and_then(|(target, _)| target)
}

/// Ad group window: from the budget start (never in the past) to the end of
/// the last day, or open-ended.
fn flight(budget: &CampaignBudget, now: DateTime<Utc>) -> (DateTime<Utc>, Option<DateTime<Utc>>) {
    let start = at_time(budget.start_date, NaiveTime::MIN).max(now);
    let end = budget
        .schedule_end()
        .and_then(|d| NaiveTime::from_hms_opt(23, 59, 59).map(|t| at_time(d, t)));
    (start, end)
}

fn at_time(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(time))
}
