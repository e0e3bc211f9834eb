//! Pulls one day of per-campaign metrics per (organization, platform) and
//! writes them to the fact store. Independent of the creation pipeline.

use crate::facts::{DailyFact, FactKey, FactStore};
use adportal_adapters::{AdapterError, AdapterSet, RequestContext};
use adportal_core::Platform;
use adportal_integrations::{IntegrationRegistry, RegistryError};
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("no adapter configured for {0}")]
    AdapterUnavailable(Platform),

    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

/// Outcome of one pass over every active integration.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct IngestRun {
    pub date: Option<NaiveDate>,
    pub integrations: usize,
    pub facts: usize,
    pub failures: usize,
}

pub struct AnalyticsIngestor {
    registry: Arc<IntegrationRegistry>,
    adapters: AdapterSet,
    facts: Arc<FactStore>,
}

impl AnalyticsIngestor {
    pub fn new(registry: Arc<IntegrationRegistry>, adapters: AdapterSet, facts: Arc<FactStore>) -> Self {
        Self { registry, adapters, facts }
    }

    pub fn facts(&self) -> &Arc<FactStore> {
        &self.facts
    }

    /// Fetch and upsert one day for one integration. Returns the number of
    /// fact rows written.
    pub async fn ingest(&self, organization_id: Uuid, platform: Platform, date: NaiveDate) -> Result<usize, IngestError> {
        let adapter = self
            .adapters
            .get(platform)
            .ok_or(IngestError::AdapterUnavailable(platform))?;
        let credential = self.registry.get_credential(organization_id, platform).await?;
        let ctx = RequestContext::new(&credential, self.adapters.request_timeout());

        let rows = adapter.fetch_daily_metrics(&ctx, date).await?;
        let ingested_at = Utc::now();
        let mut replaced = 0usize;
        let written = rows.len();
        for (campaign_id, metrics) in rows {
            let fact = DailyFact {
                key: FactKey {
                    platform,
                    account_id: credential.ad_account_id.clone(),
                    campaign_id,
                    adgroup_id: None,
                    date,
                },
                organization_id,
                metrics,
                ingested_at,
            };
            if self.facts.upsert(fact) {
                replaced += 1;
            }
        }

        metrics::counter!("analytics.facts_upserted", "platform" => platform.as_str()).increment(written as u64);
        info!(
            organization_id = %organization_id,
            platform = %platform,
            date = %date,
            facts = written,
            replaced,
            "Daily metrics ingested"
        );
        Ok(written)
    }

    /// One pass over every active integration. A failing integration is
    /// logged and counted; the others still run.
    pub async fn ingest_all(&self, date: NaiveDate) -> IngestRun {
        let mut run = IngestRun {
            date: Some(date),
            ..IngestRun::default()
        };
        for integration in self.registry.active() {
            run.integrations += 1;
            match self.ingest(integration.organization_id, integration.platform, date).await {
                Ok(n) => run.facts += n,
                Err(e) => {
                    run.failures += 1;
                    metrics::counter!("analytics.ingest_failures", "platform" => integration.platform.as_str())
                        .increment(1);
                    warn!(
                        organization_id = %integration.organization_id,
                        platform = %integration.platform,
                        error = %e,
                        "Daily ingest failed"
                    );
                }
            }
        }
        info!(
            date = %date,
            integrations = run.integrations,
            facts = run.facts,
            failures = run.failures,
            "Ingest pass complete"
        );
        run
    }

    /// Ingest the previous UTC day on a fixed interval until the task is
    /// aborted. The first pass runs immediately.
    pub fn spawn_periodic(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let yesterday = Utc::now().date_naive() - ChronoDuration::days(1);
                debug!(date = %yesterday, "Starting scheduled ingest");
                self.ingest_all(yesterday).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adportal_adapters::fake::{FakeAdapter, Op};
    use adportal_adapters::DailyMetrics;
    use adportal_core::performance::{CampaignDailyMetrics, DeviceMetrics};
    use adportal_integrations::OAuthGrant;
    use std::collections::BTreeMap;

    fn grant() -> OAuthGrant {
        OAuthGrant {
            access_token: "token".into(),
            refresh_token: None,
            expires_in_secs: None,
            ad_account_id: Some("act_1".into()),
            ad_account_name: None,
            settings: None,
        }
    }

    fn day_metrics(spend: f64) -> DailyMetrics {
        let mut devices = BTreeMap::new();
        devices.insert(
            "mobile".to_string(),
            DeviceMetrics { spend, impressions: 100, clicks: 5, roas: 2.0 },
        );
        let mut metrics = DailyMetrics::new();
        metrics.insert("120".into(), CampaignDailyMetrics::from_devices("Spring", devices));
        metrics.insert("121".into(), CampaignDailyMetrics::zeroed("Idle"));
        metrics
    }

    fn ingestor(fake: FakeAdapter) -> (AnalyticsIngestor, Arc<IntegrationRegistry>, Arc<FakeAdapter>) {
        let registry = Arc::new(IntegrationRegistry::new());
        let fake = Arc::new(fake);
        let adapters = AdapterSet::new(Duration::from_secs(5)).with(fake.clone());
        (
            AnalyticsIngestor::new(registry.clone(), adapters, Arc::new(FactStore::new())),
            registry,
            fake,
        )
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 3, 1).unwrap()
    }

    #[tokio::test]
    async fn test_rerun_replaces_facts() {
        let org = Uuid::new_v4();
        let (first, registry, _) = ingestor(FakeAdapter::new(Platform::Meta).with_metrics(day_metrics(10.0)));
        registry.connect(org, Platform::Meta, grant());
        assert_eq!(first.ingest(org, Platform::Meta, date()).await.unwrap(), 2);

        // same store, new values from the platform
        let fake = Arc::new(FakeAdapter::new(Platform::Meta).with_metrics(day_metrics(12.0)));
        let second = AnalyticsIngestor::new(
            registry.clone(),
            AdapterSet::new(Duration::from_secs(5)).with(fake),
            first.facts().clone(),
        );
        second.ingest(org, Platform::Meta, date()).await.unwrap();

        assert_eq!(first.facts().len(), 2);
        let key = FactKey {
            platform: Platform::Meta,
            account_id: "act_1".into(),
            campaign_id: "120".into(),
            adgroup_id: None,
            date: date(),
        };
        let fact = first.facts().get(&key).unwrap();
        assert_eq!(fact.metrics.spend, 12.0);
        assert_eq!(fact.metrics.ctr, 5.0);
        assert!(fact.metrics.device_breakdown.contains_key("mobile"));
    }

    #[tokio::test]
    async fn test_zeroed_campaign_is_stored() {
        let org = Uuid::new_v4();
        let (ingestor, registry, _) = ingestor(FakeAdapter::new(Platform::Tiktok).with_metrics(day_metrics(1.0)));
        registry.connect(org, Platform::Tiktok, grant());
        ingestor.ingest(org, Platform::Tiktok, date()).await.unwrap();
        let idle = ingestor
            .facts()
            .for_organization(org, date(), date())
            .into_iter()
            .find(|f| f.key.campaign_id == "121")
            .unwrap();
        assert_eq!(idle.metrics, CampaignDailyMetrics::zeroed("Idle"));
    }

    #[tokio::test]
    async fn test_missing_integration_fails_without_fetch() {
        let (ingestor, _, fake) = ingestor(FakeAdapter::new(Platform::Google));
        let err = ingestor.ingest(Uuid::new_v4(), Platform::Google, date()).await.unwrap_err();
        assert!(matches!(err, IngestError::Registry(RegistryError::IntegrationNotFound { .. })));
        assert_eq!(fake.calls(Op::FetchMetrics), 0);
    }

    #[tokio::test]
    async fn test_ingest_all_counts_failures_and_continues() {
        let (ingestor, registry, _) = ingestor(
            FakeAdapter::new(Platform::Meta)
                .with_metrics_error(AdapterError::auth(Platform::Meta, "token revoked")),
        );
        registry.connect(Uuid::new_v4(), Platform::Meta, grant());
        registry.connect(Uuid::new_v4(), Platform::Google, grant());

        let run = ingestor.ingest_all(date()).await;
        assert_eq!(run.integrations, 2);
        assert_eq!(run.failures, 2);
        assert_eq!(run.facts, 0);
        assert!(ingestor.facts().is_empty());
    }
}
