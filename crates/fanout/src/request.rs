//! Inbound create-ad request and its validation into ledger inputs.

use crate::error::{FanoutError, FanoutResult};
use adportal_core::models::{Creative, NormalizedTargeting};
use adportal_core::types::{AssetKind, BudgetType, CallToAction, Gender};
use adportal_core::{MinorUnits, Objective, Platform};
use adportal_ledger::{NewAsset, NewBudget, NewCampaign};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use uuid::Uuid;

const MIN_AGE: u8 = 13;
const MAX_AGE: u8 = 100;
const MAX_NAME_LEN: usize = 255;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAdRequest {
    pub platforms: Vec<Platform>,
    pub campaign_name: String,
    pub objective: Objective,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub budgets: Vec<BudgetRequest>,
    pub targeting: TargetingRequest,
    pub creative: CreativeRequest,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct BudgetRequest {
    pub platform: Platform,
    #[serde(default = "default_budget_type")]
    pub budget_type: BudgetType,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Major currency units, e.g. `25.00`.
    pub budget: f64,
    #[serde(default)]
    pub run_continuously: bool,
}

fn default_budget_type() -> BudgetType {
    BudgetType::Daily
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetingRequest {
    #[serde(default = "default_min_age")]
    pub min_age: u8,
    #[serde(default = "default_max_age")]
    pub max_age: u8,
    #[serde(default)]
    pub gender: Gender,
    pub locations: Vec<String>,
    /// A list, or a single comma-separated string.
    #[serde(default, deserialize_with = "string_or_list")]
    pub keywords: Vec<String>,
}

fn default_min_age() -> u8 {
    18
}

fn default_max_age() -> u8 {
    65
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreativeRequest {
    pub ad_name: String,
    pub headline: String,
    pub primary_text: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub call_to_action: CallToAction,
    pub destination_url: String,
    #[serde(default)]
    pub file: Option<FileUpload>,
}

#[derive(Clone, Deserialize)]
pub struct FileUpload {
    pub file_name: String,
    /// Inferred from the file extension when absent.
    #[serde(default)]
    pub kind: Option<AssetKind>,
    pub storage_url: String,
    pub content_base64: String,
}

impl std::fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileUpload")
            .field("file_name", &self.file_name)
            .field("kind", &self.kind)
            .field("storage_url", &self.storage_url)
            .field("content_len", &self.content_base64.len())
            .finish()
    }
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Keywords {
        One(String),
        Many(Vec<String>),
    }

    let items = match Keywords::deserialize(deserializer)? {
        Keywords::One(joined) => joined.split(',').map(str::to_string).collect(),
        Keywords::Many(items) => items,
    };
    Ok(items
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect())
}

/// A request that passed validation, ready for the ledger.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub platforms: Vec<Platform>,
    pub campaign: NewCampaign,
    pub targeting: NormalizedTargeting,
    pub creative: Creative,
    pub asset: Option<NewAsset>,
}

impl CreateAdRequest {
    pub fn validate(&self, organization_id: Uuid) -> FanoutResult<ValidatedRequest> {
        let platforms = dedupe_platforms(&self.platforms)?;

        let name = self.campaign_name.trim();
        if name.is_empty() {
            return Err(invalid("campaign_name is required"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(invalid(format!("campaign_name exceeds {MAX_NAME_LEN} characters")));
        }

        let currency = self.currency.trim().to_ascii_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid(format!("'{}' is not an ISO 4217 currency code", self.currency)));
        }

        let budgets = self.validate_budgets(&platforms, &currency)?;

        Ok(ValidatedRequest {
            platforms,
            campaign: NewCampaign {
                organization_id,
                name: name.to_string(),
                objective: self.objective,
                currency,
                budgets,
            },
            targeting: self.targeting.validate()?,
            creative: self.creative.validate()?,
            asset: self
                .creative
                .file
                .as_ref()
                .map(|file| file.decode(organization_id))
                .transpose()?,
        })
    }

    /// Exactly one budget per requested platform, amounts in minor units.
    fn validate_budgets(&self, platforms: &[Platform], currency: &str) -> FanoutResult<Vec<NewBudget>> {
        let mut budgets = Vec::with_capacity(platforms.len());
        for platform in platforms {
            let mut matching = self.budgets.iter().filter(|b| b.platform == *platform);
            let budget = matching
                .next()
                .ok_or_else(|| invalid(format!("no budget given for {platform}")))?;
            if matching.next().is_some() {
                return Err(invalid(format!("more than one budget given for {platform}")));
            }
            let amount = MinorUnits::from_major(budget.budget, currency)
                .map_err(|e| invalid(format!("{platform} budget: {e}")))?;
            budgets.push(NewBudget {
                platform: *platform,
                budget_type: budget.budget_type,
                amount,
                start_date: budget.start_date,
                end_date: budget.end_date,
                run_continuously: budget.run_continuously,
            });
        }
        if let Some(stray) = self.budgets.iter().find(|b| !platforms.contains(&b.platform)) {
            return Err(invalid(format!("budget given for unrequested platform {}", stray.platform)));
        }
        Ok(budgets)
    }
}

impl TargetingRequest {
    fn validate(&self) -> FanoutResult<NormalizedTargeting> {
        if self.min_age < MIN_AGE || self.max_age > MAX_AGE || self.min_age > self.max_age {
            return Err(invalid(format!(
                "age range {}-{} must lie within {MIN_AGE}-{MAX_AGE}",
                self.min_age, self.max_age
            )));
        }
        let mut locations: Vec<String> = Vec::new();
        for raw in &self.locations {
            let code = raw.trim().to_ascii_uppercase();
            if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(invalid(format!("'{raw}' is not an ISO country code")));
            }
            if !locations.contains(&code) {
                locations.push(code);
            }
        }
        if locations.is_empty() {
            return Err(invalid("at least one location is required"));
        }
        Ok(NormalizedTargeting {
            min_age: self.min_age,
            max_age: self.max_age,
            gender: self.gender,
            locations,
            keywords: self.keywords.clone(),
        })
    }
}

impl CreativeRequest {
    fn validate(&self) -> FanoutResult<Creative> {
        for (field, value) in [
            ("ad_name", &self.ad_name),
            ("headline", &self.headline),
            ("primary_text", &self.primary_text),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(format!("creative.{field} is required")));
            }
        }
        let url = url::Url::parse(self.destination_url.trim())
            .map_err(|e| invalid(format!("destination_url: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("destination_url must be http or https"));
        }
        Ok(Creative {
            ad_name: self.ad_name.trim().to_string(),
            headline: self.headline.trim().to_string(),
            primary_text: self.primary_text.trim().to_string(),
            description: self.description.trim().to_string(),
            call_to_action: self.call_to_action,
            destination_url: url.to_string(),
        })
    }
}

impl FileUpload {
    fn decode(&self, organization_id: Uuid) -> FanoutResult<NewAsset> {
        let bytes = BASE64
            .decode(self.content_base64.trim())
            .map_err(|e| invalid(format!("file content is not valid base64: {e}")))?;
        if bytes.is_empty() {
            return Err(invalid("file is empty"));
        }
        let kind = self
            .kind
            .or_else(|| infer_kind(&self.file_name))
            .ok_or_else(|| invalid(format!("cannot tell the media type of '{}'", self.file_name)))?;
        Ok(NewAsset {
            organization_id,
            file_name: self.file_name.clone(),
            kind,
            storage_url: self.storage_url.clone(),
            bytes,
        })
    }
}

fn infer_kind(file_name: &str) -> Option<AssetKind> {
    let extension = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" | "png" | "gif" | "webp" => Some(AssetKind::Image),
        "mp4" | "mov" | "avi" | "webm" => Some(AssetKind::Video),
        _ => None,
    }
}

fn dedupe_platforms(platforms: &[Platform]) -> FanoutResult<Vec<Platform>> {
    let mut seen = HashSet::new();
    let unique: Vec<Platform> = platforms.iter().copied().filter(|p| seen.insert(*p)).collect();
    if unique.is_empty() {
        return Err(invalid("at least one platform is required"));
    }
    Ok(unique)
}

fn invalid(message: impl Into<String>) -> FanoutError {
    FanoutError::InvalidRequest(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    pub(crate) fn request_json() -> serde_json::Value {
        json!({
            "platforms": ["META", "TIKTOK"],
            "campaign_name": "Holiday Sale",
            "objective": "TRAFFIC",
            "currency": "usd",
            "budgets": [
                { "platform": "META", "budget_type": "DAILY", "start_date": "2025-12-01", "budget": 25.00 },
                { "platform": "TIKTOK", "budget_type": "ONE_TIME", "start_date": "2025-12-01",
                  "end_date": "2025-12-31", "budget": 500 }
            ],
            "targeting": { "min_age": 21, "max_age": 45, "gender": "FEMALE",
                           "locations": ["us", "CA", "US"], "keywords": "shoes, running ,," },
            "creative": { "ad_name": "Holiday Ad", "headline": "50% off", "primary_text": "Only this week",
                          "call_to_action": "SHOP_NOW", "destination_url": "https://shop.example.com/sale" }
        })
    }

    fn parse(value: serde_json::Value) -> CreateAdRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_valid_request_converts_to_minor_units() {
        let org = Uuid::new_v4();
        let validated = parse(request_json()).validate(org).unwrap();
        assert_eq!(validated.platforms, vec![Platform::Meta, Platform::Tiktok]);
        assert_eq!(validated.campaign.currency, "USD");
        assert_eq!(validated.campaign.budgets[0].amount, MinorUnits(2500));
        assert_eq!(validated.campaign.budgets[1].amount, MinorUnits(50_000));
        assert_eq!(validated.targeting.locations, vec!["US", "CA"]);
        assert_eq!(validated.targeting.keywords, vec!["shoes", "running"]);
        assert_eq!(validated.creative.call_to_action, CallToAction::ShopNow);
        assert!(validated.asset.is_none());
    }

    #[test]
    fn test_file_is_decoded() {
        let mut value = request_json();
        value["creative"]["file"] = json!({
            "file_name": "hero.PNG",
            "storage_url": "https://cdn.example.com/hero.png",
            "content_base64": BASE64.encode(b"png-bytes"),
        });
        let asset = parse(value).validate(Uuid::new_v4()).unwrap().asset.unwrap();
        assert_eq!(asset.kind, AssetKind::Image);
        assert_eq!(asset.bytes, b"png-bytes");
    }

    #[rstest]
    #[case::no_platforms("/platforms", json!([]))]
    #[case::blank_name("/campaign_name", json!("  "))]
    #[case::bad_currency("/currency", json!("DOLLARS"))]
    #[case::negative_budget("/budgets/0/budget", json!(-5))]
    #[case::sub_cent_budget("/budgets/0/budget", json!(25.005))]
    #[case::inverted_ages("/targeting/min_age", json!(50))]
    #[case::bad_location("/targeting/locations", json!(["USA"]))]
    #[case::no_locations("/targeting/locations", json!([]))]
    #[case::bad_url("/creative/destination_url", json!("ftp://example.com"))]
    #[case::blank_headline("/creative/headline", json!(""))]
    fn test_rejections(#[case] pointer: &str, #[case] value: serde_json::Value) {
        let mut body = request_json();
        *body.pointer_mut(pointer).unwrap() = value;
        let err = parse(body).validate(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, FanoutError::InvalidRequest(_)), "{err}");
    }

    #[test]
    fn test_budget_required_per_platform() {
        let mut body = request_json();
        body["platforms"] = json!(["META", "TIKTOK", "GOOGLE"]);
        let err = parse(body).validate(Uuid::new_v4()).unwrap_err();
        assert!(err.to_string().contains("GOOGLE"));
    }

    #[test]
    fn test_stray_budget_rejected() {
        let mut body = request_json();
        body["platforms"] = json!(["META"]);
        assert!(parse(body).validate(Uuid::new_v4()).is_err());
    }
}
