//! Scripted in-memory adapter for orchestrator and ingestor tests.
//!
//! Each create operation pops its next [`Step`] from a queue; an empty queue
//! succeeds. Created objects are remembered by name so the `find_*_by_name`
//! lookups see them, including objects created by a call that then timed out.

use crate::context::RequestContext;
use crate::error::{AdapterError, AdapterResult};
use crate::{AdGroupInput, CampaignInput, DailyMetrics, PlatformAdapter};
use adportal_core::models::*;
use adportal_core::types::*;
use adportal_core::{MinorUnits, Objective, Platform};
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Step {
    Succeed,
    Fail(AdapterError),
    /// The platform creates the object but the caller sees a timeout.
    CreateThenTimeout,
    /// The call panics, as a bug in an adapter would.
    Panic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Op {
    CreateCampaign,
    CreateAdGroup,
    UploadAsset,
    CreateAd,
    FindByName,
    FetchMetrics,
}

#[derive(Default)]
struct FakeState {
    scripts: HashMap<Op, VecDeque<Step>>,
    calls: BTreeMap<Op, usize>,
    budgets: Vec<MinorUnits>,
    remote: HashMap<(Op, String), String>,
    next_id: u64,
    metrics: Option<AdapterResult<DailyMetrics>>,
}

pub struct FakeAdapter {
    platform: Platform,
    delay: Option<Duration>,
    state: Mutex<FakeState>,
}

impl FakeAdapter {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            delay: None,
            state: Mutex::new(FakeState::default()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue outcomes for one operation, consumed in order.
    pub fn script(self, op: Op, steps: impl IntoIterator<Item = Step>) -> Self {
        self.state.lock().scripts.entry(op).or_default().extend(steps);
        self
    }

    pub fn with_metrics(self, metrics: DailyMetrics) -> Self {
        self.state.lock().metrics = Some(Ok(metrics));
        self
    }

    pub fn with_metrics_error(self, error: AdapterError) -> Self {
        self.state.lock().metrics = Some(Err(error));
        self
    }

    pub fn calls(&self, op: Op) -> usize {
        self.state.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Budget amounts received by `create_campaign`, in order.
    pub fn budgets_seen(&self) -> Vec<MinorUnits> {
        self.state.lock().budgets.clone()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn create(&self, op: Op, name: &str) -> AdapterResult<String> {
        let mut state = self.state.lock();
        *state.calls.entry(op).or_default() += 1;
        let step = state
            .scripts
            .get_mut(&op)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Step::Succeed);
        let timed_out = match step {
            Step::Fail(error) => return Err(error),
            Step::Succeed => false,
            Step::CreateThenTimeout => true,
            Step::Panic => {
                drop(state);
                panic!("scripted panic in {op:?}");
            }
        };
        state.next_id += 1;
        let id = format!("{}-{:?}-{}", self.platform.as_str().to_ascii_lowercase(), op, state.next_id);
        state.remote.insert((op, name.to_string()), id.clone());
        if timed_out {
            Err(AdapterError::timeout(self.platform, "scripted timeout"))
        } else {
            Ok(id)
        }
    }

    fn find(&self, op: Op, name: &str) -> Option<String> {
        let mut state = self.state.lock();
        *state.calls.entry(Op::FindByName).or_default() += 1;
        state.remote.get(&(op, name.to_string())).cloned()
    }
}

#[async_trait]
impl PlatformAdapter for FakeAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn map_objective(&self, objective: Objective) -> ObjectiveConfig {
        ObjectiveRow {
            campaign_objective: objective.as_str(),
            promotion_type: "WEBSITE",
            optimization_goal: "CLICKS",
            billing_event: "CPC",
            bid_type: "LOWEST_COST",
            pacing: "STANDARD",
        }
        .to_config(objective != Objective::Traffic)
    }

    fn capabilities(&self) -> CapabilityFlags {
        CapabilityFlags {
            keyword_targeting: true,
            gender_targeting: true,
            lifetime_budget: true,
            video_assets: true,
            min_targetable_age: 18,
        }
    }

    fn campaign_extra(&self, budget: &CampaignBudget) -> PlatformExtra {
        PlatformExtra::Tiktok {
            budget_mode: format!("{:?}", budget.effective_type()),
        }
    }

    fn translate_targeting(&self, targeting: &NormalizedTargeting) -> AdapterResult<Value> {
        if targeting.locations.is_empty() {
            return Err(AdapterError::validation(self.platform, "at least one location is required"));
        }
        Ok(json!({
            "locations": targeting.locations,
            "age": [targeting.min_age, targeting.max_age],
        }))
    }

    async fn create_campaign(&self, _ctx: &RequestContext, input: CampaignInput<'_>) -> AdapterResult<String> {
        self.pause().await;
        self.state.lock().budgets.push(input.budget.amount);
        self.create(Op::CreateCampaign, &input.platform_campaign.name)
    }

    async fn create_ad_group(&self, _ctx: &RequestContext, input: AdGroupInput<'_>) -> AdapterResult<String> {
        self.pause().await;
        self.create(Op::CreateAdGroup, &input.ad_group.name)
    }

    async fn upload_asset(&self, _ctx: &RequestContext, content: &AssetContent) -> AdapterResult<String> {
        self.pause().await;
        self.create(Op::UploadAsset, &content.asset.content_hash)
    }

    async fn create_ad(
        &self,
        _ctx: &RequestContext,
        _ad_group: &AdGroup,
        ad: &Ad,
        _assets: &[UploadedAsset],
    ) -> AdapterResult<String> {
        self.pause().await;
        self.create(Op::CreateAd, &ad.name)
    }

    async fn find_campaign_by_name(&self, _ctx: &RequestContext, name: &str) -> AdapterResult<Option<String>> {
        Ok(self.find(Op::CreateCampaign, name))
    }

    async fn find_ad_group_by_name(
        &self,
        _ctx: &RequestContext,
        _external_campaign_id: &str,
        name: &str,
    ) -> AdapterResult<Option<String>> {
        Ok(self.find(Op::CreateAdGroup, name))
    }

    async fn find_ad_by_name(
        &self,
        _ctx: &RequestContext,
        _external_ad_group_id: &str,
        name: &str,
    ) -> AdapterResult<Option<String>> {
        Ok(self.find(Op::CreateAd, name))
    }

    async fn fetch_daily_metrics(&self, _ctx: &RequestContext, _date: NaiveDate) -> AdapterResult<DailyMetrics> {
        let mut state = self.state.lock();
        *state.calls.entry(Op::FetchMetrics).or_default() += 1;
        state.metrics.clone().unwrap_or_else(|| Ok(DailyMetrics::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_is_consumed_in_order() {
        let fake = FakeAdapter::new(Platform::Meta).script(
            Op::CreateCampaign,
            [Step::Fail(AdapterError::transient(Platform::Meta, "busy")), Step::Succeed],
        );
        assert!(fake.create(Op::CreateCampaign, "a").is_err());
        assert!(fake.create(Op::CreateCampaign, "a").is_ok());
        assert!(fake.create(Op::CreateCampaign, "b").is_ok());
        assert_eq!(fake.calls(Op::CreateCampaign), 3);
    }

    #[test]
    fn test_timed_out_create_is_findable() {
        let fake = FakeAdapter::new(Platform::Google).script(Op::CreateAd, [Step::CreateThenTimeout]);
        let err = fake.create(Op::CreateAd, "Spring ad").unwrap_err();
        assert!(err.is_timeout());
        assert!(fake.find(Op::CreateAd, "Spring ad").is_some());
        assert!(fake.find(Op::CreateAd, "Other").is_none());
    }
}
