use crate::facts::FactStore;
use adportal_core::Platform;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Dashboard roll-up of an organization's daily facts over a date range.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PerformanceSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub campaigns: usize,
    pub total_spend: f64,
    pub impressions: u64,
    pub clicks: u64,
    /// Percent.
    pub ctr: f64,
    pub cpc: f64,
    /// Spend-weighted across facts.
    pub roas: f64,
    pub spend_by_platform: BTreeMap<Platform, f64>,
}

/// Ratios are recomputed from the summed counters, never averaged per row.
pub fn summarize(facts: &FactStore, organization_id: Uuid, from: NaiveDate, to: NaiveDate) -> PerformanceSummary {
    let rows = facts.for_organization(organization_id, from, to);

    let mut campaigns = BTreeSet::new();
    let mut spend_by_platform = BTreeMap::new();
    let (mut spend, mut impressions, mut clicks, mut return_value) = (0.0, 0u64, 0u64, 0.0);
    for fact in &rows {
        let m = &fact.metrics;
        campaigns.insert((fact.key.platform, fact.key.campaign_id.as_str()));
        *spend_by_platform.entry(fact.key.platform).or_insert(0.0) += m.spend;
        spend += m.spend;
        impressions += m.impressions;
        clicks += m.clicks;
        return_value += m.roas * m.spend;
    }

    PerformanceSummary {
        from,
        to,
        campaigns: campaigns.len(),
        total_spend: spend,
        impressions,
        clicks,
        ctr: ratio(clicks as f64 * 100.0, impressions as f64),
        cpc: ratio(spend, clicks as f64),
        roas: ratio(return_value, spend),
        spend_by_platform,
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
    use crate::facts::{DailyFact, FactKey};
    use adportal_core::performance::CampaignDailyMetrics;
    use chrono::Utc;
    use rstest::rstest;

    fn put(store: &FactStore, org: Uuid, platform: Platform, campaign: &str, day: u32, m: (f64, u64, u64, f64)) {
        let (spend, impressions, clicks, roas) = m;
        store.upsert(DailyFact {
            key: FactKey {
                platform,
                account_id: "acct".into(),
                campaign_id: campaign.into(),
                adgroup_id: None,
                date: NaiveDate::from_ymd_opt(2030, 5, day).unwrap(),
            },
            organization_id: org,
            metrics: CampaignDailyMetrics {
                campaign_name: campaign.into(),
                spend,
                impressions,
                clicks,
                roas,
                ..CampaignDailyMetrics::default()
            },
            ingested_at: Utc::now(),
        });
    }

    #[test]
    fn test_summary_recomputes_ratios_from_sums() {
        let store = FactStore::new();
        let org = Uuid::new_v4();
        put(&store, org, Platform::Meta, "a", 1, (30.0, 1000, 10, 2.0));
        put(&store, org, Platform::Meta, "a", 2, (10.0, 0, 0, 0.0));
        put(&store, org, Platform::Google, "b", 1, (60.0, 1000, 40, 1.0));
        put(&store, org, Platform::Google, "b", 9, (99.0, 1, 1, 1.0));

        let summary = summarize(
            &store,
            org,
            NaiveDate::from_ymd_opt(2030, 5, 1).unwrap(),
            NaiveDate::from_ymd_opt(2030, 5, 7).unwrap(),
        );
        assert_eq!(summary.campaigns, 2);
        assert_eq!(summary.total_spend, 100.0);
        assert_eq!(summary.impressions, 2000);
        assert_eq!(summary.clicks, 50);
        assert_eq!(summary.ctr, 2.5);
        assert_eq!(summary.cpc, 2.0);
        assert!((summary.roas - 1.2).abs() < 1e-9);
        assert_eq!(summary.spend_by_platform[&Platform::Meta], 40.0);
        assert_eq!(summary.spend_by_platform[&Platform::Google], 60.0);
    }

    #[rstest]
    #[case::first_day(1, 1, 90.0)]
    #[case::whole_week(1, 7, 100.0)]
    #[case::inclusive_end(2, 9, 109.0)]
    #[case::gap(3, 8, 0.0)]
    fn test_range_bounds_are_inclusive(#[case] from: u32, #[case] to: u32, #[case] spend: f64) {
        let store = FactStore::new();
        let org = Uuid::new_v4();
        put(&store, org, Platform::Meta, "a", 1, (30.0, 1000, 10, 2.0));
        put(&store, org, Platform::Meta, "a", 2, (10.0, 0, 0, 0.0));
        put(&store, org, Platform::Google, "b", 1, (60.0, 1000, 40, 1.0));
        put(&store, org, Platform::Google, "b", 9, (99.0, 1, 1, 1.0));
        put(&store, Uuid::new_v4(), Platform::Meta, "other", 1, (500.0, 1, 1, 1.0));

        let day = |d| NaiveDate::from_ymd_opt(2030, 5, d).unwrap();
        let summary = summarize(&store, org, day(from), day(to));
        assert_eq!(summary.total_spend, spend);
    }

    #[test]
    fn test_empty_range_is_zeroed() {
        let date = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let summary = summarize(&FactStore::new(), Uuid::new_v4(), date, date);
        assert_eq!(summary.total_spend, 0.0);
        assert_eq!(summary.ctr, 0.0);
        assert!(summary.spend_by_platform.is_empty());
    }
}
