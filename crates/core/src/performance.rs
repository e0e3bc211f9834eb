use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-device metrics for one campaign-day as reported by a platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DeviceMetrics {
    pub spend: f64,
    pub impressions: u64,
    pub clicks: u64,
    /// Return on ad spend as reported for this device slice.
    pub roas: f64,
}

/// One campaign-day of metrics with totals recomputed from the device rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CampaignDailyMetrics {
    pub campaign_name: String,
    pub spend: f64,
    pub impressions: u64,
    pub clicks: u64,
    /// Percent, e.g. `5.0` for 5%.
    pub ctr: f64,
    pub cpc: f64,
    pub roas: f64,
    pub device_breakdown: BTreeMap<String, DeviceMetrics>,
}

impl CampaignDailyMetrics {
    /// Zeroed metrics for a valid campaign with no activity.
    pub fn zeroed(campaign_name: impl Into<String>) -> Self {
        Self {
            campaign_name: campaign_name.into(),
            ..Self::default()
        }
    }

    /// Sum the device rows and derive ratios from the sums. CTR and CPC are
    /// never averaged across devices; ROAS is weighted by spend.
    pub fn from_devices(
        campaign_name: impl Into<String>,
        device_breakdown: BTreeMap<String, DeviceMetrics>,
    ) -> Self {
        let spend: f64 = device_breakdown.values().map(|d| d.spend).sum();
        let impressions: u64 = device_breakdown.values().map(|d| d.impressions).sum();
        let clicks: u64 = device_breakdown.values().map(|d| d.clicks).sum();
        let return_value: f64 = device_breakdown.values().map(|d| d.roas * d.spend).sum();

        Self {
            campaign_name: campaign_name.into(),
            spend,
            impressions,
            clicks,
            ctr: ratio(clicks as f64 * 100.0, impressions as f64),
            cpc: ratio(spend, clicks as f64),
            roas: ratio(return_value, spend),
            device_breakdown,
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_recomputed_from_sums() {
        let mut devices = BTreeMap::new();
        devices.insert(
            "mobile".to_string(),
            DeviceMetrics { spend: 10.0, impressions: 100, clicks: 5, roas: 0.0 },
        );
        devices.insert(
            "desktop".to_string(),
            DeviceMetrics { spend: 20.0, impressions: 100, clicks: 5, roas: 0.0 },
        );

        let totals = CampaignDailyMetrics::from_devices("Spring", devices);
        assert_eq!(totals.spend, 30.0);
        assert_eq!(totals.clicks, 10);
        assert_eq!(totals.impressions, 200);
        assert!((totals.ctr - 5.0).abs() < f64::EPSILON);
        assert!((totals.cpc - 3.0).abs() < f64::EPSILON);
        assert_eq!(totals.device_breakdown.len(), 2);
    }

    #[test]
    fn test_roas_is_spend_weighted() {
        let mut devices = BTreeMap::new();
        devices.insert("ios".into(), DeviceMetrics { spend: 30.0, impressions: 10, clicks: 1, roas: 2.0 });
        devices.insert("android".into(), DeviceMetrics { spend: 10.0, impressions: 10, clicks: 1, roas: 6.0 });
        let totals = CampaignDailyMetrics::from_devices("c", devices);
        // (30*2 + 10*6) / 40
        assert!((totals.roas - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_activity_is_all_zero() {
        let totals = CampaignDailyMetrics::from_devices("idle", BTreeMap::new());
        assert_eq!(totals, CampaignDailyMetrics::zeroed("idle"));
        assert_eq!(totals.ctr, 0.0);
    }
}
