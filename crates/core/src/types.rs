use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ad platforms an organization can connect.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Platform {
    Meta,
    Google,
    Tiktok,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Meta, Platform::Google, Platform::Tiktok];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Meta => "META",
            Platform::Google => "GOOGLE",
            Platform::Tiktok => "TIKTOK",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Meta => "Meta (Facebook/Instagram)",
            Platform::Google => "Google Ads",
            Platform::Tiktok => "TikTok Ads",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "META" => Ok(Platform::Meta),
            "GOOGLE" => Ok(Platform::Google),
            "TIKTOK" => Ok(Platform::Tiktok),
            other => Err(format!("unknown platform '{other}'")),
        }
    }
}

/// Organization-level campaign objective. Every adapter maps each value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Objective {
    Awareness,
    Traffic,
    Engagement,
    Lead,
    Sales,
    AppInstall,
    VideoView,
}

impl Objective {
    pub const ALL: [Objective; 7] = [
        Objective::Awareness,
        Objective::Traffic,
        Objective::Engagement,
        Objective::Lead,
        Objective::Sales,
        Objective::AppInstall,
        Objective::VideoView,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Objective::Awareness => "AWARENESS",
            Objective::Traffic => "TRAFFIC",
            Objective::Engagement => "ENGAGEMENT",
            Objective::Lead => "LEAD",
            Objective::Sales => "SALES",
            Objective::AppInstall => "APP_INSTALL",
            Objective::VideoView => "VIDEO_VIEW",
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status shared by campaigns, ad groups and ads.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    Active,
    #[default]
    Paused,
    Archived,
    Error,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetType {
    /// Lifetime budget spread over the flight dates.
    #[serde(alias = "LIFETIME", alias = "TOTAL")]
    OneTime,
    Daily,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    #[default]
    #[serde(alias = "ANY", alias = "BOTH")]
    All,
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetKind {
    Image,
    Video,
}

/// Asset lifecycle: DRAFT -> UPLOADED -> IN_USE -> ARCHIVED.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetStatus {
    Draft,
    Uploaded,
    InUse,
    Archived,
}

impl AssetStatus {
    pub fn can_transition_to(&self, next: AssetStatus) -> bool {
        use AssetStatus::*;
        matches!(
            (self, next),
            (Draft, Uploaded) | (Uploaded, InUse) | (InUse, InUse) | (Draft, Archived) | (Uploaded, Archived) | (InUse, Archived)
        )
    }
}

/// Call-to-action button, in the vocabulary shared by Meta and TikTok.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallToAction {
    #[default]
    LearnMore,
    ShopNow,
    SignUp,
    Download,
    ContactUs,
    BookNow,
    GetQuote,
    WatchMore,
    Subscribe,
    ApplyNow,
}

impl CallToAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallToAction::LearnMore => "LEARN_MORE",
            CallToAction::ShopNow => "SHOP_NOW",
            CallToAction::SignUp => "SIGN_UP",
            CallToAction::Download => "DOWNLOAD",
            CallToAction::ContactUs => "CONTACT_US",
            CallToAction::BookNow => "BOOK_NOW",
            CallToAction::GetQuote => "GET_QUOTE",
            CallToAction::WatchMore => "WATCH_MORE",
            CallToAction::Subscribe => "SUBSCRIBE",
            CallToAction::ApplyNow => "APPLY_NOW",
        }
    }
}

/// Position of one (campaign, platform) pair in the fan-out state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FanoutStage {
    Uncreated,
    CampaignCreated,
    AdgroupCreated,
    AdCreated,
    Error,
}

impl FanoutStage {
    pub fn is_terminal_success(&self) -> bool {
        matches!(self, FanoutStage::AdCreated)
    }
}

/// A platform's required objective tuple, produced by an adapter's lookup table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectiveConfig {
    /// Campaign-level objective in the platform's vocabulary.
    pub campaign_objective: String,
    /// Promotion type (TikTok) or advertising channel (Google).
    pub promotion_type: String,
    pub optimization_goal: String,
    pub billing_event: String,
    pub bid_type: String,
    pub pacing: String,
    /// Set when the platform has no native equivalent and a documented fallback row was used.
    pub fallback: bool,
}

/// Static row of an adapter's objective table.
#[derive(Debug, Clone, Copy)]
pub struct ObjectiveRow {
    pub campaign_objective: &'static str,
    pub promotion_type: &'static str,
    pub optimization_goal: &'static str,
    pub billing_event: &'static str,
    pub bid_type: &'static str,
    pub pacing: &'static str,
}

impl ObjectiveRow {
    pub fn to_config(self, fallback: bool) -> ObjectiveConfig {
        ObjectiveConfig {
            campaign_objective: self.campaign_objective.to_string(),
            promotion_type: self.promotion_type.to_string(),
            optimization_goal: self.optimization_goal.to_string(),
            billing_event: self.billing_event.to_string(),
            bid_type: self.bid_type.to_string(),
            pacing: self.pacing.to_string(),
            fallback,
        }
    }
}

/// Feature support cached on each platform campaign row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CapabilityFlags {
    pub keyword_targeting: bool,
    pub gender_targeting: bool,
    pub lifetime_budget: bool,
    pub video_assets: bool,
    /// Lowest age the platform accepts for targeting.
    pub min_targetable_age: u8,
}
