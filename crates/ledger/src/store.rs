//! In-memory campaign ledger backed by DashMap.
//!
//! Every uniqueness rule is enforced through the map entry API so concurrent
//! writers observe a single winner, the same contract a unique index gives.

use crate::assets::AssetLibrary;
use crate::error::{LedgerError, LedgerResult};
use crate::locks::{RowGuard, RowLocks, SyncTarget};
use crate::stage::{derive_stage, PlatformSnapshot};
use adportal_core::models::*;
use adportal_core::types::{BudgetType, CampaignStatus, Objective, Platform};
use adportal_core::{MinorUnits, SyncState};
use chrono::{NaiveDate, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;
use tracing::{debug, info};
use uuid::Uuid;

/// Input for the transactional campaign + budgets write.
#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub organization_id: Uuid,
    pub name: String,
    pub objective: Objective,
    pub currency: String,
    pub budgets: Vec<NewBudget>,
}

#[derive(Debug, Clone)]
pub struct NewBudget {
    pub platform: Platform,
    pub budget_type: BudgetType,
    pub amount: MinorUnits,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub run_continuously: bool,
}

/// Thread-safe store for the campaign tree and its sync state.
pub struct LedgerStore {
    campaigns: DashMap<Uuid, UnifiedCampaign>,
    campaign_names: DashMap<(Uuid, String), Uuid>,
    budgets: DashMap<Uuid, Vec<CampaignBudget>>,
    platform_campaigns: DashMap<Uuid, PlatformCampaign>,
    platform_campaign_keys: DashMap<(Uuid, Uuid), Uuid>,
    ad_groups: DashMap<Uuid, AdGroup>,
    ad_group_keys: DashMap<Uuid, Uuid>,
    ads: DashMap<Uuid, Ad>,
    ad_keys: DashMap<Uuid, Uuid>,
    locks: RowLocks,
    assets: AssetLibrary,
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore {
    pub fn new() -> Self {
        info!("Ledger store initialized (in-memory)");
        Self {
            campaigns: DashMap::new(),
            campaign_names: DashMap::new(),
            budgets: DashMap::new(),
            platform_campaigns: DashMap::new(),
            platform_campaign_keys: DashMap::new(),
            ad_groups: DashMap::new(),
            ad_group_keys: DashMap::new(),
            ads: DashMap::new(),
            ad_keys: DashMap::new(),
            locks: RowLocks::new(),
            assets: AssetLibrary::new(),
        }
    }

    pub fn assets(&self) -> &AssetLibrary {
        &self.assets
    }

    pub async fn lock(&self, target: SyncTarget) -> RowGuard<'_> {
        self.locks.acquire(target).await
    }

    // ─── Unified campaigns ──────────────────────────────────────────────────

    /// Write the campaign and all of its budgets, or nothing.
    pub fn create_campaign(
        &self,
        new: NewCampaign,
    ) -> LedgerResult<(UnifiedCampaign, Vec<CampaignBudget>)> {
        validate_budgets(&new.budgets)?;
        let name = new.name.trim().to_string();
        if name.is_empty() {
            return Err(LedgerError::InvalidBudget("campaign name is empty".into()));
        }

        let campaign = UnifiedCampaign {
            id: Uuid::new_v4(),
            organization_id: new.organization_id,
            name: name.clone(),
            objective: new.objective,
            status: CampaignStatus::Paused,
            currency: new.currency.to_ascii_uppercase(),
            created_at: Utc::now(),
        };
        let budgets: Vec<CampaignBudget> = new
            .budgets
            .into_iter()
            .map(|b| CampaignBudget {
                id: Uuid::new_v4(),
                campaign_id: campaign.id,
                platform: b.platform,
                budget_type: b.budget_type,
                amount: b.amount,
                start_date: b.start_date,
                end_date: b.end_date,
                run_continuously: b.run_continuously,
            })
            .collect();

        match self
            .campaign_names
            .entry((new.organization_id, name.to_lowercase()))
        {
            Entry::Occupied(_) => return Err(LedgerError::DuplicateCampaignName(name)),
            Entry::Vacant(slot) => {
                self.budgets.insert(campaign.id, budgets.clone());
                self.campaigns.insert(campaign.id, campaign.clone());
                slot.insert(campaign.id);
            }
        }

        info!(
            campaign_id = %campaign.id,
            organization_id = %campaign.organization_id,
            budgets = budgets.len(),
            "Unified campaign created"
        );
        Ok((campaign, budgets))
    }

    pub fn campaign(&self, id: Uuid) -> LedgerResult<UnifiedCampaign> {
        self.campaigns
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or_else(|| LedgerError::not_found("campaign", id))
    }

    pub fn campaign_by_name(&self, organization_id: Uuid, name: &str) -> Option<UnifiedCampaign> {
        let id = *self
            .campaign_names
            .get(&(organization_id, name.trim().to_lowercase()))?
            .value();
        self.campaign(id).ok()
    }

    pub fn campaigns_for(&self, organization_id: Uuid) -> Vec<UnifiedCampaign> {
        let mut campaigns: Vec<UnifiedCampaign> = self
            .campaigns
            .iter()
            .filter(|r| r.value().organization_id == organization_id)
            .map(|r| r.value().clone())
            .collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        campaigns
    }

    pub fn campaign_count(&self) -> usize {
        self.campaigns.len()
    }

    pub fn budgets(&self, campaign_id: Uuid) -> Vec<CampaignBudget> {
        self.budgets
            .get(&campaign_id)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    pub fn budget_for(&self, campaign_id: Uuid, platform: Platform) -> Option<CampaignBudget> {
        self.budgets(campaign_id)
            .into_iter()
            .find(|b| b.platform == platform)
    }

    // ─── Platform rows (unique-key upserts) ─────────────────────────────────

    /// Insert the row unless one already exists for (campaign, integration);
    /// either way the stored row is returned.
    pub fn ensure_platform_campaign(&self, draft: PlatformCampaign) -> LedgerResult<PlatformCampaign> {
        let key = (draft.campaign_id, draft.integration_id);
        match self.platform_campaign_keys.entry(key) {
            Entry::Occupied(existing) => self.platform_campaign(*existing.get()),
            Entry::Vacant(slot) => {
                debug!(platform_campaign_id = %draft.id, platform = %draft.platform, "Platform campaign row created");
                self.platform_campaigns.insert(draft.id, draft.clone());
                slot.insert(draft.id);
                Ok(draft)
            }
        }
    }

    pub fn ensure_ad_group(&self, draft: AdGroup) -> LedgerResult<AdGroup> {
        match self.ad_group_keys.entry(draft.platform_campaign_id) {
            Entry::Occupied(existing) => self.ad_group(*existing.get()),
            Entry::Vacant(slot) => {
                self.ad_groups.insert(draft.id, draft.clone());
                slot.insert(draft.id);
                Ok(draft)
            }
        }
    }

    pub fn ensure_ad(&self, draft: Ad) -> LedgerResult<Ad> {
        match self.ad_keys.entry(draft.ad_group_id) {
            Entry::Occupied(existing) => self.ad(*existing.get()),
            Entry::Vacant(slot) => {
                self.ads.insert(draft.id, draft.clone());
                slot.insert(draft.id);
                Ok(draft)
            }
        }
    }

    pub fn platform_campaign(&self, id: Uuid) -> LedgerResult<PlatformCampaign> {
        self.platform_campaigns
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or_else(|| LedgerError::not_found("platform campaign", id))
    }

    pub fn platform_campaigns_for(&self, campaign_id: Uuid) -> Vec<PlatformCampaign> {
        let mut rows: Vec<PlatformCampaign> = self
            .platform_campaigns
            .iter()
            .filter(|r| r.value().campaign_id == campaign_id)
            .map(|r| r.value().clone())
            .collect();
        rows.sort_by_key(|r| r.platform);
        rows
    }

    pub fn platform_campaign_for(
        &self,
        campaign_id: Uuid,
        platform: Platform,
    ) -> Option<PlatformCampaign> {
        self.platform_campaigns_for(campaign_id)
            .into_iter()
            .find(|r| r.platform == platform)
    }

    pub fn ad_group(&self, id: Uuid) -> LedgerResult<AdGroup> {
        self.ad_groups
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or_else(|| LedgerError::not_found("ad group", id))
    }

    pub fn ad_group_for(&self, platform_campaign_id: Uuid) -> Option<AdGroup> {
        let id = *self.ad_group_keys.get(&platform_campaign_id)?.value();
        self.ad_group(id).ok()
    }

    pub fn ad(&self, id: Uuid) -> LedgerResult<Ad> {
        self.ads
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or_else(|| LedgerError::not_found("ad", id))
    }

    pub fn ad_for(&self, ad_group_id: Uuid) -> Option<Ad> {
        let id = *self.ad_keys.get(&ad_group_id)?.value();
        self.ad(id).ok()
    }

    /// Replace the targeting sent to the platform. Only allowed before the
    /// group exists remotely.
    pub fn set_targeting_config(&self, ad_group_id: Uuid, config: serde_json::Value) -> LedgerResult<()> {
        let mut row = self
            .ad_groups
            .get_mut(&ad_group_id)
            .ok_or_else(|| LedgerError::not_found("ad group", ad_group_id))?;
        if !row.sync.is_created() {
            row.targeting_config = config;
        }
        Ok(())
    }

    pub fn set_status(&self, target: SyncTarget, status: CampaignStatus) -> LedgerResult<()> {
        self.with_row(target, |_, row_status| *row_status = status)
    }

    // ─── Sync state ─────────────────────────────────────────────────────────

    pub fn sync_state(&self, target: SyncTarget) -> LedgerResult<SyncState> {
        let mut state = None;
        self.with_row(target, |sync, _| state = Some(sync.clone()))?;
        state.ok_or_else(|| LedgerError::not_found(target.kind(), target.id()))
    }

    /// Persist a platform-assigned id. An existing different id is a conflict
    /// and leaves the row untouched.
    pub fn record_success(&self, target: SyncTarget, external_id: &str) -> LedgerResult<SyncState> {
        let now = Utc::now();
        let mut outcome = None;
        self.with_row(target, |sync, _| {
            outcome = Some(sync.record_success(external_id, now).map(|_| sync.clone()));
        })?;
        match outcome {
            Some(result) => Ok(result?),
            None => Err(LedgerError::not_found(target.kind(), target.id())),
        }
    }

    /// Refresh the sync timestamp for an object that already exists remotely.
    pub fn record_verified(&self, target: SyncTarget) -> LedgerResult<()> {
        let now = Utc::now();
        self.with_row(target, |sync, _| sync.record_verified(now))
    }

    pub fn record_error(&self, target: SyncTarget, message: &str) -> LedgerResult<()> {
        let now = Utc::now();
        self.with_row(target, |sync, _| sync.record_error(message, now))
    }

    fn with_row<F>(&self, target: SyncTarget, f: F) -> LedgerResult<()>
    where
        F: FnOnce(&mut SyncState, &mut CampaignStatus),
    {
        let found = match target {
            SyncTarget::PlatformCampaign(id) => self
                .platform_campaigns
                .get_mut(&id)
                .map(|mut r| {
                    let row = r.value_mut();
                    f(&mut row.sync, &mut row.status)
                }),
            SyncTarget::AdGroup(id) => self.ad_groups.get_mut(&id).map(|mut r| {
                let row = r.value_mut();
                f(&mut row.sync, &mut row.status)
            }),
            SyncTarget::Ad(id) => self.ads.get_mut(&id).map(|mut r| {
                let row = r.value_mut();
                f(&mut row.sync, &mut row.status)
            }),
        };
        found.ok_or_else(|| LedgerError::not_found(target.kind(), target.id()))
    }

    // ─── Status view ────────────────────────────────────────────────────────

    pub fn snapshot(&self, campaign_id: Uuid, platform: Platform) -> PlatformSnapshot {
        let platform_campaign = self.platform_campaign_for(campaign_id, platform);
        let ad_group = platform_campaign
            .as_ref()
            .and_then(|pc| self.ad_group_for(pc.id));
        let ad = ad_group.as_ref().and_then(|g| self.ad_for(g.id));
        derive_stage(platform, platform_campaign.as_ref(), ad_group.as_ref(), ad.as_ref())
    }

    /// Per-platform stage for every platform budgeted on the campaign.
    pub fn campaign_status(&self, campaign_id: Uuid) -> LedgerResult<Vec<PlatformSnapshot>> {
        self.campaign(campaign_id)?;
        let mut platforms: Vec<Platform> = self
            .budgets(campaign_id)
            .iter()
            .map(|b| b.platform)
            .chain(self.platform_campaigns_for(campaign_id).iter().map(|r| r.platform))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        platforms.sort();
        Ok(platforms
            .into_iter()
            .map(|p| self.snapshot(campaign_id, p))
            .collect())
    }
}

fn validate_budgets(budgets: &[NewBudget]) -> LedgerResult<()> {
    if budgets.is_empty() {
        return Err(LedgerError::InvalidBudget("at least one budget is required".into()));
    }
    let mut seen = HashSet::new();
    for budget in budgets {
        if !seen.insert(budget.platform) {
            return Err(LedgerError::InvalidBudget(format!(
                "duplicate budget for {}",
                budget.platform
            )));
        }
        if budget.amount.value() <= 0 {
            return Err(LedgerError::InvalidBudget(format!(
                "{} budget must be positive",
                budget.platform
            )));
        }
        if let Some(end) = budget.end_date {
            if end < budget.start_date {
                return Err(LedgerError::InvalidBudget(format!(
                    "{} end date {} is before start date {}",
                    budget.platform, end, budget.start_date
                )));
            }
        }
        if budget.budget_type == BudgetType::OneTime
            && budget.end_date.is_none()
            && !budget.run_continuously
        {
            return Err(LedgerError::InvalidBudget(format!(
                "{} one-time budget needs an end date or run_continuously",
                budget.platform
            )));
        }
    }
    Ok(())
}
