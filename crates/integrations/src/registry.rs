//! Integration Registry: one credential set per (organization, platform).

use crate::error::{RegistryError, RegistryResult};
use crate::oauth::TokenRefresher;
use adportal_core::models::{AdIntegration, Credential, IntegrationSettings, TokenSet};
use adportal_core::Platform;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// Tokens are refreshed this long before they actually expire.
const EXPIRY_SKEW_SECS: i64 = 60;

type IntegrationKey = (Uuid, Platform);

/// Result of a completed OAuth flow.
#[derive(Clone, Deserialize)]
pub struct OAuthGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in_secs: Option<i64>,
    #[serde(default)]
    pub ad_account_id: Option<String>,
    #[serde(default)]
    pub ad_account_name: Option<String>,
    #[serde(default)]
    pub settings: Option<IntegrationSettings>,
}

impl std::fmt::Debug for OAuthGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthGrant")
            .field("access_token", &"<redacted>")
            .field("expires_in_secs", &self.expires_in_secs)
            .field("ad_account_id", &self.ad_account_id)
            .finish()
    }
}

pub struct IntegrationRegistry {
    integrations: DashMap<IntegrationKey, AdIntegration>,
    refresh_locks: DashMap<IntegrationKey, Arc<Mutex<()>>>,
    refreshers: HashMap<Platform, Arc<dyn TokenRefresher>>,
}

impl IntegrationRegistry {
    pub fn new() -> Self {
        info!("Integration registry initialized");
        Self {
            integrations: DashMap::new(),
            refresh_locks: DashMap::new(),
            refreshers: HashMap::new(),
        }
    }

    pub fn with_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refreshers.insert(refresher.platform(), refresher);
        self
    }

    // ─── Integration management ─────────────────────────────────────────

    /// Upsert from an OAuth grant. Reconnecting keeps the row id and the
    /// selected ad account unless the grant names a new one.
    pub fn connect(&self, organization_id: Uuid, platform: Platform, grant: OAuthGrant) -> AdIntegration {
        let now = Utc::now();
        let tokens = TokenSet {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            expires_at: grant.expires_in_secs.map(|secs| now + Duration::seconds(secs)),
        };
        let settings = grant
            .settings
            .filter(|s| s.platform() == platform)
            .unwrap_or_else(|| IntegrationSettings::empty(platform));

        let mut entry = self
            .integrations
            .entry((organization_id, platform))
            .or_insert_with(|| AdIntegration {
                id: Uuid::new_v4(),
                organization_id,
                platform,
                tokens: tokens.clone(),
                ad_account_id: None,
                ad_account_name: None,
                settings: settings.clone(),
                is_active: true,
                connected_at: now,
                updated_at: now,
            });
        let integration = entry.value_mut();
        integration.tokens = tokens;
        integration.settings = settings;
        integration.is_active = true;
        integration.updated_at = now;
        if grant.ad_account_id.is_some() {
            integration.ad_account_id = grant.ad_account_id;
            integration.ad_account_name = grant.ad_account_name;
        }
        info!(
            organization_id = %organization_id,
            platform = %platform,
            integration_id = %integration.id,
            "Integration connected"
        );
        integration.clone()
    }

    pub fn select_ad_account(
        &self,
        organization_id: Uuid,
        platform: Platform,
        ad_account_id: &str,
        ad_account_name: Option<String>,
    ) -> RegistryResult<AdIntegration> {
        self.update(organization_id, platform, |integration| {
            integration.ad_account_id = Some(ad_account_id.trim().to_string());
            integration.ad_account_name = ad_account_name;
        })
    }

    pub fn set_active(&self, organization_id: Uuid, platform: Platform, active: bool) -> RegistryResult<AdIntegration> {
        self.update(organization_id, platform, |integration| integration.is_active = active)
    }

    pub fn update_settings(
        &self,
        organization_id: Uuid,
        platform: Platform,
        settings: IntegrationSettings,
    ) -> RegistryResult<AdIntegration> {
        self.update(organization_id, platform, |integration| integration.settings = settings)
    }

    fn update(
        &self,
        organization_id: Uuid,
        platform: Platform,
        apply: impl FnOnce(&mut AdIntegration),
    ) -> RegistryResult<AdIntegration> {
        let mut integration = self
            .integrations
            .get_mut(&(organization_id, platform))
            .ok_or(RegistryError::IntegrationNotFound { organization_id, platform })?;
        apply(&mut integration);
        integration.updated_at = Utc::now();
        Ok(integration.clone())
    }

    pub fn integration(&self, organization_id: Uuid, platform: Platform) -> RegistryResult<AdIntegration> {
        self.integrations
            .get(&(organization_id, platform))
            .map(|i| i.clone())
            .ok_or(RegistryError::IntegrationNotFound { organization_id, platform })
    }

    pub fn list(&self, organization_id: Uuid) -> Vec<AdIntegration> {
        let mut integrations: Vec<AdIntegration> = self
            .integrations
            .iter()
            .filter(|e| e.key().0 == organization_id)
            .map(|e| e.value().clone())
            .collect();
        integrations.sort_by_key(|i| i.platform);
        integrations
    }

    pub fn active(&self) -> Vec<AdIntegration> {
        self.integrations
            .iter()
            .filter(|e| e.is_active)
            .map(|e| e.value().clone())
            .collect()
    }

    /// Requested platforms without an active integration, in request order.
    pub fn missing_platforms(&self, organization_id: Uuid, platforms: &[Platform]) -> Vec<Platform> {
        platforms
            .iter()
            .copied()
            .filter(|platform| {
                !self
                    .integrations
                    .get(&(organization_id, *platform))
                    .map(|i| i.is_active)
                    .unwrap_or(false)
            })
            .collect()
    }

    // ─── Credential resolution ──────────────────────────────────────────

    /// A live credential for one unit of adapter work. Expired tokens get a
    /// single refresh attempt, serialized per (organization, platform).
    pub async fn get_credential(&self, organization_id: Uuid, platform: Platform) -> RegistryResult<Credential> {
        let integration = self.usable(organization_id, platform)?;
        let skew = Duration::seconds(EXPIRY_SKEW_SECS);
        if !integration.tokens.is_expired(Utc::now(), skew) {
            return credential(&integration);
        }

        let key = (organization_id, platform);
        let lock = self
            .refresh_locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let result = {
            let _guard = lock.lock().await;
            self.refresh_credential(organization_id, platform).await
        };
        drop(lock);
        self.refresh_locks.remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    /// Runs under the (organization, platform) refresh lock.
    async fn refresh_credential(&self, organization_id: Uuid, platform: Platform) -> RegistryResult<Credential> {
        let skew = Duration::seconds(EXPIRY_SKEW_SECS);
        // Another caller may have refreshed while we waited.
        let integration = self.usable(organization_id, platform)?;
        if !integration.tokens.is_expired(Utc::now(), skew) {
            return credential(&integration);
        }

        match self.refresh(&integration).await {
            Ok(tokens) => {
                let refreshed = self.update(organization_id, platform, |i| i.tokens = tokens)?;
                metrics::counter!("integrations.token_refreshes", "platform" => platform.as_str()).increment(1);
                info!(organization_id = %organization_id, platform = %platform, "Access token refreshed");
                credential(&refreshed)
            }
            // Still inside the skew window: the old token works for now.
            Err(reason) if !integration.tokens.is_expired(Utc::now(), Duration::zero()) => {
                warn!(platform = %platform, reason = %reason, "Token refresh failed; using unexpired token");
                credential(&integration)
            }
            Err(reason) => {
                warn!(organization_id = %organization_id, platform = %platform, reason = %reason, "Credential expired");
                Err(RegistryError::CredentialExpired { platform, reason })
            }
        }
    }

    fn usable(&self, organization_id: Uuid, platform: Platform) -> RegistryResult<AdIntegration> {
        let integration = self.integration(organization_id, platform)?;
        if !integration.is_active {
            return Err(RegistryError::IntegrationInactive { organization_id, platform });
        }
        Ok(integration)
    }

    async fn refresh(&self, integration: &AdIntegration) -> Result<TokenSet, String> {
        let refresh_token = integration
            .tokens
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| "no refresh token on file".to_string())?;
        let refresher = self
            .refreshers
            .get(&integration.platform)
            .ok_or_else(|| format!("{} tokens cannot be refreshed; reconnect the account", integration.platform))?;
        refresher.refresh(refresh_token).await.map_err(|e| e.to_string())
    }
}

impl Default for IntegrationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn credential(integration: &AdIntegration) -> RegistryResult<Credential> {
    let ad_account_id = integration
        .ad_account_id
        .clone()
        .filter(|id| !id.is_empty())
        .ok_or(RegistryError::AccountNotSelected {
            organization_id: integration.organization_id,
            platform: integration.platform,
        })?;
    Ok(Credential {
        integration_id: integration.id,
        organization_id: integration.organization_id,
        platform: integration.platform,
        access_token: integration.tokens.access_token.clone(),
        ad_account_id,
        settings: integration.settings.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RefreshError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRefresher {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl TokenRefresher for CountingRefresher {
        fn platform(&self) -> Platform {
            Platform::Google
        }

        async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, RefreshError> {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                return Err(RefreshError::Rejected { status: 400, body: "invalid_grant".into() });
            }
            Ok(TokenSet {
                access_token: format!("fresh-{n}"),
                refresh_token: Some(refresh_token.to_string()),
                expires_at: Some(Utc::now() + Duration::hours(1)),
            })
        }
    }

    fn grant(expires_in_secs: Option<i64>) -> OAuthGrant {
        OAuthGrant {
            access_token: "initial".into(),
            refresh_token: Some("refresh".into()),
            expires_in_secs,
            ad_account_id: Some("123".into()),
            ad_account_name: Some("Main".into()),
            settings: None,
        }
    }

    fn registry(fail: bool) -> (IntegrationRegistry, Arc<CountingRefresher>) {
        let refresher = Arc::new(CountingRefresher { calls: AtomicUsize::new(0), fail });
        (IntegrationRegistry::new().with_refresher(refresher.clone()), refresher)
    }

    #[tokio::test]
    async fn test_not_found_and_inactive() {
        let (registry, _) = registry(false);
        let org = Uuid::new_v4();
        assert!(matches!(
            registry.get_credential(org, Platform::Meta).await,
            Err(RegistryError::IntegrationNotFound { .. })
        ));

        registry.connect(org, Platform::Meta, grant(None));
        registry.set_active(org, Platform::Meta, false).unwrap();
        assert!(matches!(
            registry.get_credential(org, Platform::Meta).await,
            Err(RegistryError::IntegrationInactive { .. })
        ));
    }

    #[tokio::test]
    async fn test_account_must_be_selected() {
        let (registry, _) = registry(false);
        let org = Uuid::new_v4();
        let mut g = grant(None);
        g.ad_account_id = None;
        registry.connect(org, Platform::Tiktok, g);
        assert!(matches!(
            registry.get_credential(org, Platform::Tiktok).await,
            Err(RegistryError::AccountNotSelected { .. })
        ));

        registry.select_ad_account(org, Platform::Tiktok, " 7000 ", None).unwrap();
        let credential = registry.get_credential(org, Platform::Tiktok).await.unwrap();
        assert_eq!(credential.ad_account_id, "7000");
    }

    #[tokio::test]
    async fn test_reconnect_keeps_id_and_account() {
        let (registry, _) = registry(false);
        let org = Uuid::new_v4();
        let first = registry.connect(org, Platform::Meta, grant(None));
        let mut again = grant(None);
        again.ad_account_id = None;
        again.access_token = "rotated".into();
        let second = registry.connect(org, Platform::Meta, again);
        assert_eq!(first.id, second.id);
        assert_eq!(second.ad_account_id.as_deref(), Some("123"));
        assert_eq!(registry.list(org).len(), 1);
    }

    #[tokio::test]
    async fn test_expired_google_token_is_refreshed_once_under_concurrency() {
        let (registry, refresher) = registry(false);
        let registry = Arc::new(registry);
        let org = Uuid::new_v4();
        registry.connect(org, Platform::Google, grant(Some(-10)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.get_credential(org, Platform::Google).await })
            })
            .collect();
        for handle in handles {
            let credential = handle.await.unwrap().unwrap();
            assert_eq!(credential.access_token, "fresh-1");
        }
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert!(registry.refresh_locks.is_empty());
    }

    #[tokio::test]
    async fn test_failed_refresh_is_credential_expired() {
        let (registry, _) = registry(true);
        let org = Uuid::new_v4();
        registry.connect(org, Platform::Google, grant(Some(-10)));
        let err = registry.get_credential(org, Platform::Google).await.unwrap_err();
        assert!(matches!(err, RegistryError::CredentialExpired { platform: Platform::Google, .. }));
        assert!(registry.refresh_locks.is_empty());
    }

    #[tokio::test]
    async fn test_meta_tokens_are_not_refreshed() {
        let (registry, refresher) = registry(false);
        let org = Uuid::new_v4();
        registry.connect(org, Platform::Meta, grant(Some(-10)));
        let err = registry.get_credential(org, Platform::Meta).await.unwrap_err();
        assert!(matches!(err, RegistryError::CredentialExpired { platform: Platform::Meta, .. }));
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_token_inside_skew_survives_failed_refresh() {
        let (registry, _) = registry(true);
        let org = Uuid::new_v4();
        registry.connect(org, Platform::Google, grant(Some(30)));
        let credential = registry.get_credential(org, Platform::Google).await.unwrap();
        assert_eq!(credential.access_token, "initial");
    }

    #[test]
    fn test_missing_platforms() {
        let (registry, _) = registry(false);
        let org = Uuid::new_v4();
        registry.connect(org, Platform::Meta, grant(None));
        registry.connect(org, Platform::Tiktok, grant(None));
        let missing = registry.missing_platforms(org, &[Platform::Meta, Platform::Tiktok, Platform::Google]);
        assert_eq!(missing, vec![Platform::Google]);

        registry.set_active(org, Platform::Tiktok, false).unwrap();
        let missing = registry.missing_platforms(org, &[Platform::Meta, Platform::Tiktok]);
        assert_eq!(missing, vec![Platform::Tiktok]);
    }
}
