use adportal_core::models::{Ad, AdGroup, PlatformCampaign};
use adportal_core::types::{FanoutStage, Platform};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Where one platform's chain stands, read straight off the ledger rows.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlatformSnapshot {
    pub platform: Platform,
    pub stage: FanoutStage,
    pub platform_campaign_id: Option<Uuid>,
    pub external_campaign_id: Option<String>,
    pub ad_group_id: Option<Uuid>,
    pub external_ad_group_id: Option<String>,
    pub ad_id: Option<Uuid>,
    pub external_ad_id: Option<String>,
    pub error_message: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// The stage is the deepest level with an external id, unless the first
/// level without one carries an error.
pub fn derive_stage(
    platform: Platform,
    campaign: Option<&PlatformCampaign>,
    ad_group: Option<&AdGroup>,
    ad: Option<&Ad>,
) -> PlatformSnapshot {
    let syncs = [
        campaign.map(|r| &r.sync),
        ad_group.map(|r| &r.sync),
        ad.map(|r| &r.sync),
    ];

    let created_levels = syncs
        .iter()
        .take_while(|s| s.map(|s| s.is_created()).unwrap_or(false))
        .count();

    // Errors on deeper rows are left over from earlier runs.
    let error_message = syncs
        .get(created_levels)
        .copied()
        .flatten()
        .and_then(|s| s.error_message.clone());

    let stage = match (created_levels, error_message.is_some()) {
        (3, _) => FanoutStage::AdCreated,
        (_, true) => FanoutStage::Error,
        (0, false) => FanoutStage::Uncreated,
        (1, false) => FanoutStage::CampaignCreated,
        _ => FanoutStage::AdgroupCreated,
    };

    let last_synced_at = syncs.iter().flatten().filter_map(|s| s.last_synced_at).max();

    PlatformSnapshot {
        platform,
        stage,
        platform_campaign_id: campaign.map(|r| r.id),
        external_campaign_id: campaign.and_then(|r| r.sync.external_id.clone()),
        ad_group_id: ad_group.map(|r| r.id),
        external_ad_group_id: ad_group.and_then(|r| r.sync.external_id.clone()),
        ad_id: ad.map(|r| r.id),
        external_ad_id: ad.and_then(|r| r.sync.external_id.clone()),
        error_message: if stage == FanoutStage::AdCreated { None } else { error_message },
        last_synced_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adportal_core::models::{NormalizedTargeting, PlatformExtra};
    use adportal_core::types::{CampaignStatus, CapabilityFlags, Gender, ObjectiveConfig};
    use adportal_core::SyncState;

    fn campaign_row(sync: SyncState) -> PlatformCampaign {
        PlatformCampaign {
            id: Uuid::new_v4(),
            campaign_id: Uuid::new_v4(),
            integration_id: Uuid::new_v4(),
            platform: Platform::Tiktok,
            name: "c".into(),
            status: CampaignStatus::Paused,
            extra: PlatformExtra::Tiktok { budget_mode: "BUDGET_MODE_DAY".into() },
            capabilities: CapabilityFlags::default(),
            sync,
        }
    }

    fn ad_group_row(platform_campaign_id: Uuid, sync: SyncState) -> AdGroup {
        AdGroup {
            id: Uuid::new_v4(),
            platform_campaign_id,
            name: "g".into(),
            targeting_config: serde_json::Value::Null,
            normalized_targeting: NormalizedTargeting {
                min_age: 18,
                max_age: 65,
                gender: Gender::All,
                locations: vec!["US".into()],
                keywords: Vec::new(),
            },
            bidding_config: ObjectiveConfig {
                campaign_objective: "TRAFFIC".into(),
                promotion_type: "WEBSITE".into(),
                optimization_goal: "CLICK".into(),
                billing_event: "CPC".into(),
                bid_type: "BID_TYPE_NO_BID".into(),
                pacing: "PACING_MODE_SMOOTH".into(),
                fallback: false,
            },
            start_time: Utc::now(),
            end_time: None,
            status: CampaignStatus::Paused,
            sync,
        }
    }

    #[test]
    fn test_no_rows_is_uncreated() {
        let snap = derive_stage(Platform::Meta, None, None, None);
        assert_eq!(snap.stage, FanoutStage::Uncreated);
        assert!(snap.platform_campaign_id.is_none());
    }

    #[test]
    fn test_created_campaign_without_group() {
        let mut sync = SyncState::default();
        sync.record_success("1800", Utc::now()).unwrap();
        let row = campaign_row(sync);
        let snap = derive_stage(Platform::Tiktok, Some(&row), None, None);
        assert_eq!(snap.stage, FanoutStage::CampaignCreated);
        assert_eq!(snap.external_campaign_id.as_deref(), Some("1800"));
    }

    #[test]
    fn test_error_comes_from_first_uncreated_level() {
        let mut campaign_sync = SyncState::default();
        campaign_sync.record_error("budget too low", Utc::now());
        let row = campaign_row(campaign_sync);
        let mut stale = SyncState::default();
        stale.record_error("stale ad group failure", Utc::now());
        let group = ad_group_row(row.id, stale);
        let snap = derive_stage(Platform::Tiktok, Some(&row), Some(&group), None);
        assert_eq!(snap.stage, FanoutStage::Error);
        assert_eq!(snap.error_message.as_deref(), Some("budget too low"));
    }

    #[test]
    fn test_error_on_campaign_row() {
        let mut sync = SyncState::default();
        sync.record_error("Access token expired", Utc::now());
        let row = campaign_row(sync);
        let snap = derive_stage(Platform::Tiktok, Some(&row), None, None);
        assert_eq!(snap.stage, FanoutStage::Error);
        assert_eq!(snap.error_message.as_deref(), Some("Access token expired"));
    }
}
