//! Persisted rows of the campaign tree and the integrations that feed it.

use crate::money::MinorUnits;
use crate::sync::SyncState;
use crate::types::*;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ─── Tenancy & Integrations ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

/// Platform-specific integration settings. Closed set so adapters are handed
/// a checked shape instead of a free-form map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "platform", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrationSettings {
    Meta {
        /// Facebook page the ads are published from.
        page_id: Option<String>,
    },
    Google {
        /// Manager account used as `login-customer-id`.
        login_customer_id: Option<String>,
    },
    Tiktok {
        display_name: Option<String>,
    },
}

impl IntegrationSettings {
    pub fn empty(platform: Platform) -> Self {
        match platform {
            Platform::Meta => IntegrationSettings::Meta { page_id: None },
            Platform::Google => IntegrationSettings::Google { login_customer_id: None },
            Platform::Tiktok => IntegrationSettings::Tiktok { display_name: None },
        }
    }

    pub fn platform(&self) -> Platform {
        match self {
            IntegrationSettings::Meta { .. } => Platform::Meta,
            IntegrationSettings::Google { .. } => Platform::Google,
            IntegrationSettings::Tiktok { .. } => Platform::Tiktok,
        }
    }
}

/// OAuth token material. Never printed.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenSet {
    pub fn is_expired(&self, now: DateTime<Utc>, skew: chrono::Duration) -> bool {
        self.expires_at.map(|at| at - skew <= now).unwrap_or(false)
    }
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// One connected ad platform per (organization, platform).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdIntegration {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub platform: Platform,
    #[serde(skip_serializing)]
    pub tokens: TokenSet,
    /// Selected external ad account; required before any campaign work.
    pub ad_account_id: Option<String>,
    pub ad_account_name: Option<String>,
    pub settings: IntegrationSettings,
    pub is_active: bool,
    pub connected_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Live credential handed to adapters for a single unit of work.
#[derive(Clone)]
pub struct Credential {
    pub integration_id: Uuid,
    pub organization_id: Uuid,
    pub platform: Platform,
    pub access_token: String,
    pub ad_account_id: String,
    pub settings: IntegrationSettings,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("integration_id", &self.integration_id)
            .field("platform", &self.platform)
            .field("access_token", &"<redacted>")
            .field("ad_account_id", &self.ad_account_id)
            .finish()
    }
}

// ─── Campaign Tree ──────────────────────────────────────────────────────────

/// Organization-level campaign intent; the aggregate root of the tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedCampaign {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub objective: Objective,
    pub status: CampaignStatus,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignBudget {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub platform: Platform,
    pub budget_type: BudgetType,
    pub amount: MinorUnits,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub run_continuously: bool,
}

impl CampaignBudget {
    /// Lifetime budgets without a fixed end are run as daily budgets.
    pub fn effective_type(&self) -> BudgetType {
        match (self.budget_type, self.end_date, self.run_continuously) {
            (BudgetType::OneTime, Some(_), false) => BudgetType::OneTime,
            _ => BudgetType::Daily,
        }
    }

    pub fn schedule_end(&self) -> Option<NaiveDate> {
        if self.run_continuously {
            None
        } else {
            self.end_date
        }
    }
}

/// Platform-specific campaign settings, one variant per platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "platform", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlatformExtra {
    Meta {
        special_ad_categories: Vec<String>,
        buying_type: String,
    },
    Google {
        advertising_channel_type: String,
        bidding_strategy: String,
    },
    Tiktok {
        budget_mode: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformCampaign {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub integration_id: Uuid,
    pub platform: Platform,
    pub name: String,
    pub status: CampaignStatus,
    pub extra: PlatformExtra,
    pub capabilities: CapabilityFlags,
    pub sync: SyncState,
}

/// Platform-agnostic targeting snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedTargeting {
    pub min_age: u8,
    pub max_age: u8,
    pub gender: Gender,
    /// ISO 3166-1 alpha-2 country codes.
    pub locations: Vec<String>,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdGroup {
    pub id: Uuid,
    pub platform_campaign_id: Uuid,
    pub name: String,
    /// Targeting in the platform's own schema, as sent.
    pub targeting_config: serde_json::Value,
    pub normalized_targeting: NormalizedTargeting,
    pub bidding_config: ObjectiveConfig,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: CampaignStatus,
    pub sync: SyncState,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Creative {
    pub ad_name: String,
    pub headline: String,
    pub primary_text: String,
    pub description: String,
    pub call_to_action: CallToAction,
    pub destination_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ad {
    pub id: Uuid,
    pub ad_group_id: Uuid,
    pub name: String,
    pub creative: Creative,
    pub asset_ids: Vec<Uuid>,
    pub status: CampaignStatus,
    pub sync: SyncState,
}

// ─── Assets ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdAsset {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub kind: AssetKind,
    pub file_name: String,
    /// Hex SHA-256 of the file bytes; unique per organization.
    pub content_hash: String,
    /// Public URL of the stored object.
    pub storage_url: String,
    pub size_bytes: u64,
    pub status: AssetStatus,
    pub locked: bool,
    pub created_at: DateTime<Utc>,
}

/// An asset as handed to an adapter: row plus the raw bytes.
#[derive(Debug, Clone)]
pub struct AssetContent {
    pub asset: AdAsset,
    pub bytes: Vec<u8>,
}

/// Join row recording that an asset has been uploaded through an integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformAsset {
    pub asset_id: Uuid,
    pub integration_id: Uuid,
    pub platform: Platform,
    pub platform_asset_id: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Asset reference resolved for an ad create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub asset_id: Uuid,
    pub kind: AssetKind,
    pub platform_asset_id: String,
}
