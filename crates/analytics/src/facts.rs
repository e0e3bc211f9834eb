use adportal_core::performance::CampaignDailyMetrics;
use adportal_core::Platform;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// Identity of one daily fact row. Campaign-level rows have no ad group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FactKey {
    pub platform: Platform,
    pub account_id: String,
    pub campaign_id: String,
    pub adgroup_id: Option<String>,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailyFact {
    #[serde(flatten)]
    pub key: FactKey,
    pub organization_id: Uuid,
    /// Totals plus the device breakdown they were recomputed from.
    pub metrics: CampaignDailyMetrics,
    pub ingested_at: DateTime<Utc>,
}

/// Daily fact table. Writing an existing key replaces the whole row.
pub struct FactStore {
    facts: DashMap<FactKey, DailyFact>,
}

impl FactStore {
    pub fn new() -> Self {
        info!("Daily fact store initialized");
        Self { facts: DashMap::new() }
    }

    /// Insert or replace; returns `true` when a previous row was replaced.
    pub fn upsert(&self, fact: DailyFact) -> bool {
        self.facts.insert(fact.key.clone(), fact).is_some()
    }

    pub fn get(&self, key: &FactKey) -> Option<DailyFact> {
        self.facts.get(key).map(|f| f.clone())
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// An organization's facts with `from <= date <= to`, ordered by key.
    pub fn for_organization(&self, organization_id: Uuid, from: NaiveDate, to: NaiveDate) -> Vec<DailyFact> {
        let mut facts: Vec<DailyFact> = self
            .facts
            .iter()
            .filter(|f| f.organization_id == organization_id && f.key.date >= from && f.key.date <= to)
            .map(|f| f.clone())
            .collect();
        facts.sort_by(|a, b| a.key.cmp(&b.key));
        facts
    }
}

impl Default for FactStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(org: Uuid, day: u32, spend: f64) -> DailyFact {
        let mut metrics = CampaignDailyMetrics::zeroed("Spring");
        metrics.spend = spend;
        DailyFact {
            key: FactKey {
                platform: Platform::Meta,
                account_id: "act_1".into(),
                campaign_id: "120".into(),
                adgroup_id: None,
                date: NaiveDate::from_ymd_opt(2030, 3, day).unwrap(),
            },
            organization_id: org,
            metrics,
            ingested_at: Utc::now(),
        }
    }

    #[test]
    fn test_upsert_is_last_write_wins() {
        let store = FactStore::new();
        let org = Uuid::new_v4();
        assert!(!store.upsert(fact(org, 1, 10.0)));
        assert!(store.upsert(fact(org, 1, 12.5)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&fact(org, 1, 0.0).key).unwrap().metrics.spend, 12.5);
    }

    #[test]
    fn test_for_organization_filters_range_and_tenant() {
        let store = FactStore::new();
        let org = Uuid::new_v4();
        for day in 1..=5 {
            store.upsert(fact(org, day, 1.0));
        }
        store.upsert(fact(Uuid::new_v4(), 2, 1.0));

        let from = NaiveDate::from_ymd_opt(2030, 3, 2).unwrap();
        let to = NaiveDate::from_ymd_opt(2030, 3, 4).unwrap();
        let facts = store.for_organization(org, from, to);
        assert_eq!(facts.len(), 3);
        assert_eq!(facts[0].key.date, from);
    }
}
