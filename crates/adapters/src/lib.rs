//! Platform adapters: translate unified campaign intent into one ad
//! platform's API calls and map its responses back to ledger vocabulary.
//!
//! Adapters never retry; they classify every failure as auth, validation or
//! transient and leave policy to the caller.

pub mod context;
pub mod error;
pub mod geo;
pub mod google;
pub(crate) mod http;
pub mod meta;
pub mod set;
pub mod tiktok;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use context::RequestContext;
pub use error::{AdapterError, AdapterResult};
pub use http::is_excluded_status;
pub use set::AdapterSet;

use adportal_core::models::*;
use adportal_core::performance::{CampaignDailyMetrics, DeviceMetrics};
use adportal_core::types::{CapabilityFlags, ObjectiveConfig};
use adportal_core::{Objective, Platform};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Daily metrics keyed by external campaign id.
pub type DailyMetrics = BTreeMap<String, CampaignDailyMetrics>;

/// Inputs for building one platform campaign.
#[derive(Debug, Clone, Copy)]
pub struct CampaignInput<'a> {
    pub campaign: &'a UnifiedCampaign,
    pub budget: &'a CampaignBudget,
    pub platform_campaign: &'a PlatformCampaign,
}

/// Inputs for building one ad group under an already-created campaign.
#[derive(Debug, Clone, Copy)]
pub struct AdGroupInput<'a> {
    pub campaign: &'a UnifiedCampaign,
    pub budget: &'a CampaignBudget,
    pub platform_campaign: &'a PlatformCampaign,
    pub ad_group: &'a AdGroup,
}

/// Capability interface implemented once per ad platform.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// Total over [`Objective`]; unsupported objectives resolve to a
    /// documented fallback row with `fallback = true`.
    fn map_objective(&self, objective: Objective) -> ObjectiveConfig;

    fn capabilities(&self) -> CapabilityFlags;

    fn campaign_extra(&self, budget: &CampaignBudget) -> PlatformExtra;

    /// Platform targeting schema for the normalized snapshot.
    fn translate_targeting(&self, targeting: &NormalizedTargeting) -> AdapterResult<serde_json::Value>;

    async fn create_campaign(&self, ctx: &RequestContext, input: CampaignInput<'_>) -> AdapterResult<String>;

    async fn create_ad_group(&self, ctx: &RequestContext, input: AdGroupInput<'_>) -> AdapterResult<String>;

    /// Upload one asset and return the platform-side reference.
    async fn upload_asset(&self, ctx: &RequestContext, content: &AssetContent) -> AdapterResult<String>;

    async fn create_ad(
        &self,
        ctx: &RequestContext,
        ad_group: &AdGroup,
        ad: &Ad,
        assets: &[UploadedAsset],
    ) -> AdapterResult<String>;

    // Lookups used to reconcile a timed-out create.

    async fn find_campaign_by_name(&self, ctx: &RequestContext, name: &str) -> AdapterResult<Option<String>>;

    async fn find_ad_group_by_name(
        &self,
        ctx: &RequestContext,
        external_campaign_id: &str,
        name: &str,
    ) -> AdapterResult<Option<String>>;

    async fn find_ad_by_name(
        &self,
        ctx: &RequestContext,
        external_ad_group_id: &str,
        name: &str,
    ) -> AdapterResult<Option<String>>;

    /// Read-only. Deleted and draft campaigns are excluded; valid campaigns
    /// without activity are reported with zeroed metrics.
    async fn fetch_daily_metrics(&self, ctx: &RequestContext, date: NaiveDate) -> AdapterResult<DailyMetrics>;
}

/// One reported (campaign, device) slice.
pub(crate) struct MetricsRow {
    pub campaign_id: String,
    pub device: String,
    pub metrics: DeviceMetrics,
}

/// Fold device rows into per-campaign totals. Only campaigns in `valid`
/// (id -> name) are kept, and every one of them is present in the output.
pub(crate) fn assemble_metrics(
    valid: BTreeMap<String, String>,
    rows: impl IntoIterator<Item = MetricsRow>,
) -> DailyMetrics {
    let mut devices: BTreeMap<String, BTreeMap<String, DeviceMetrics>> = BTreeMap::new();
    for row in rows {
        if !valid.contains_key(&row.campaign_id) {
            continue;
        }
        let slot = devices
            .entry(row.campaign_id)
            .or_default()
            .entry(row.device.to_ascii_lowercase())
            .or_default();
        let return_value = slot.roas * slot.spend + row.metrics.roas * row.metrics.spend;
        slot.spend += row.metrics.spend;
        slot.impressions += row.metrics.impressions;
        slot.clicks += row.metrics.clicks;
        slot.roas = if slot.spend > 0.0 { return_value / slot.spend } else { 0.0 };
    }

    valid
        .into_iter()
        .map(|(id, name)| {
            let breakdown = devices.remove(&id).unwrap_or_default();
            (id, CampaignDailyMetrics::from_devices(name, breakdown))
        })
        .collect()
}

/// Age buckets overlapping an inclusive range. Each bucket is `(label, lo, hi)`.
pub(crate) fn overlapping_buckets(
    buckets: &[(&'static str, u8, u8)],
    min_age: u8,
    max_age: u8,
) -> Vec<&'static str> {
    buckets
        .iter()
        .filter(|(_, lo, hi)| *lo <= max_age && *hi >= min_age)
        .map(|(label, _, _)| *label)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUCKETS: &[(&str, u8, u8)] = &[("A", 18, 24), ("B", 25, 34), ("C", 35, 100)];

    #[test]
    fn test_overlapping_buckets() {
        assert_eq!(overlapping_buckets(BUCKETS, 20, 30), vec!["A", "B"]);
        assert_eq!(overlapping_buckets(BUCKETS, 18, 65), vec!["A", "B", "C"]);
        assert_eq!(overlapping_buckets(BUCKETS, 40, 45), vec!["C"]);
    }
}
