//! Meta Marketing API (Graph) adapter.
//!
//! Campaign → ad set → ad creative + ad. Budgets live on the ad set in minor
//! units. Keywords are dropped: Meta interest targeting needs interest ids,
//! not free text.

use crate::context::RequestContext;
use crate::error::{AdapterError, AdapterResult};
use crate::http::{body_preview, id_string, lenient_f64, lenient_u64, send_json, MAX_PAGES};
use crate::{assemble_metrics, AdGroupInput, CampaignInput, DailyMetrics, MetricsRow, PlatformAdapter};
use adportal_core::config::MetaConfig;
use adportal_core::models::*;
use adportal_core::performance::DeviceMetrics;
use adportal_core::types::*;
use adportal_core::{Objective, Platform};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{info, warn};

const MIN_AGE: u8 = 18;
const MAX_AGE: u8 = 65;

const TRAFFIC: ObjectiveRow = ObjectiveRow {
    campaign_objective: "OUTCOME_TRAFFIC",
    promotion_type: "WEBSITE",
    optimization_goal: "LINK_CLICKS",
    billing_event: "IMPRESSIONS",
    bid_type: "LOWEST_COST_WITHOUT_CAP",
    pacing: "STANDARD",
};

/// Rows without a pixel or app: conversion-style objectives fall back to traffic.
fn objective_row(objective: Objective) -> (ObjectiveRow, bool) {
    match objective {
        Objective::Traffic => (TRAFFIC, false),
        Objective::Awareness => (
            ObjectiveRow {
                campaign_objective: "OUTCOME_AWARENESS",
                optimization_goal: "REACH",
                ..TRAFFIC
            },
            false,
        ),
        Objective::Engagement => (
            ObjectiveRow {
                campaign_objective: "OUTCOME_ENGAGEMENT",
                promotion_type: "ON_POST",
                optimization_goal: "POST_ENGAGEMENT",
                ..TRAFFIC
            },
            false,
        ),
        Objective::VideoView => (
            ObjectiveRow {
                campaign_objective: "OUTCOME_ENGAGEMENT",
                promotion_type: "ON_VIDEO",
                optimization_goal: "THRUPLAY",
                ..TRAFFIC
            },
            false,
        ),
        Objective::Lead | Objective::Sales | Objective::AppInstall => (TRAFFIC, true),
    }
}

pub struct MetaAdapter {
    client: Client,
    base_url: String,
}

impl MetaAdapter {
    pub fn new(config: &MetaConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: format!(
                "{}/{}",
                config.graph_url.trim_end_matches('/'),
                config.api_version
            ),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post(&self, ctx: &RequestContext, path: &str, payload: &Value) -> AdapterResult<Value> {
        let request = self
            .client
            .post(self.url(path))
            .bearer_auth(&ctx.access_token)
            .timeout(ctx.timeout)
            .json(payload);
        let (status, body) = send_json(Platform::Meta, request).await?;
        check_graph_response(status, body)
    }

    async fn get(&self, ctx: &RequestContext, path: &str, query: &[(&str, String)]) -> AdapterResult<Value> {
        let request = self
            .client
            .get(self.url(path))
            .bearer_auth(&ctx.access_token)
            .timeout(ctx.timeout)
            .query(query);
        let (status, body) = send_json(Platform::Meta, request).await?;
        check_graph_response(status, body)
    }

    /// Follow `paging.cursors.after` until the edge has no next page, and
    /// return every row under a single `data` array.
    async fn get_all(&self, ctx: &RequestContext, path: &str, query: &[(&str, String)]) -> AdapterResult<Value> {
        let mut rows = Vec::new();
        let mut after: Option<String> = None;
        for _ in 0..MAX_PAGES {
            let mut page_query = query.to_vec();
            if let Some(cursor) = after.take() {
                page_query.push(("after", cursor));
            }
            let body = self.get(ctx, path, &page_query).await?;
            rows.extend(data_rows(&body).cloned());
            match next_page_cursor(&body) {
                Some(cursor) => after = Some(cursor),
                None => return Ok(json!({ "data": rows })),
            }
        }
        warn!(path, pages = MAX_PAGES, "Stopped paging before the last page");
        Ok(json!({ "data": rows }))
    }

    async fn find_in_edge(&self, ctx: &RequestContext, path: &str, name: &str) -> AdapterResult<Option<String>> {
        let filtering = json!([{ "field": "name", "operator": "EQUAL", "value": name }]);
        let body = self
            .get(
                ctx,
                path,
                &[
                    ("fields", "id,name".to_string()),
                    ("filtering", filtering.to_string()),
                    ("limit", "50".to_string()),
                ],
            )
            .await?;
        Ok(find_by_name(&body, name))
    }
}

pub(crate) fn account_path(ad_account_id: &str) -> String {
    format!("act_{}", ad_account_id.trim_start_matches("act_"))
}

// ─── Payload builders ───────────────────────────────────────────────────────

pub(crate) fn campaign_payload(input: &CampaignInput<'_>, objective: &ObjectiveConfig) -> Value {
    let (special_ad_categories, buying_type) = match &input.platform_campaign.extra {
        PlatformExtra::Meta { special_ad_categories, buying_type } => {
            (special_ad_categories.clone(), buying_type.clone())
        }
        _ => (Vec::new(), "AUCTION".to_string()),
    };
    json!({
        "name": input.platform_campaign.name,
        "objective": objective.campaign_objective,
        "status": "PAUSED",
        "special_ad_categories": special_ad_categories,
        "buying_type": buying_type,
    })
}

pub(crate) fn ad_set_payload(input: &AdGroupInput<'_>, external_campaign_id: &str) -> Value {
    let group = input.ad_group;
    let bidding = &group.bidding_config;
    let mut payload = json!({
        "name": group.name,
        "campaign_id": external_campaign_id,
        "billing_event": bidding.billing_event,
        "optimization_goal": bidding.optimization_goal,
        "bid_strategy": bidding.bid_type,
        "targeting": group.targeting_config,
        "start_time": group.start_time.to_rfc3339(),
        "status": "PAUSED",
    });
    // Budget amounts are sent in minor units.
    let amount = input.budget.amount.value();
    match input.budget.effective_type() {
        BudgetType::OneTime => payload["lifetime_budget"] = json!(amount),
        BudgetType::Daily => payload["daily_budget"] = json!(amount),
    }
    if let Some(end) = group.end_time {
        payload["end_time"] = json!(end.to_rfc3339());
    }
    payload
}

pub(crate) fn creative_payload(ad: &Ad, page_id: &str, assets: &[UploadedAsset]) -> Value {
    let creative = &ad.creative;
    let call_to_action = json!({
        "type": creative.call_to_action.as_str(),
        "value": { "link": creative.destination_url },
    });
    let image = assets.iter().find(|a| a.kind == AssetKind::Image);
    let video = assets.iter().find(|a| a.kind == AssetKind::Video);

    let story = match video {
        Some(video) => {
            let mut video_data = json!({
                "video_id": video.platform_asset_id,
                "message": creative.primary_text,
                "title": creative.headline,
                "link_description": creative.description,
                "call_to_action": call_to_action,
            });
            if let Some(image) = image {
                video_data["image_hash"] = json!(image.platform_asset_id);
            }
            json!({ "page_id": page_id, "video_data": video_data })
        }
        None => {
            let mut link_data = json!({
                "link": creative.destination_url,
                "message": creative.primary_text,
                "name": creative.headline,
                "description": creative.description,
                "call_to_action": call_to_action,
            });
            if let Some(image) = image {
                link_data["image_hash"] = json!(image.platform_asset_id);
            }
            json!({ "page_id": page_id, "link_data": link_data })
        }
    };

    json!({
        "name": format!("{} creative", ad.name),
        "object_story_spec": story,
    })
}

pub(crate) fn targeting_payload(targeting: &NormalizedTargeting) -> AdapterResult<Value> {
    if targeting.locations.is_empty() {
        return Err(AdapterError::validation(Platform::Meta, "at least one location is required"));
    }
    let countries: Vec<String> = targeting
        .locations
        .iter()
        .map(|c| c.trim().to_ascii_uppercase())
        .collect();
    let age_min = targeting.min_age.clamp(MIN_AGE, MAX_AGE);
    let age_max = targeting.max_age.clamp(age_min, MAX_AGE);

    let mut payload = json!({
        "geo_locations": { "countries": countries },
        "age_min": age_min,
        "age_max": age_max,
        "targeting_automation": { "advantage_audience": 0 },
    });
    match targeting.gender {
        Gender::Male => payload["genders"] = json!([1]),
        Gender::Female => payload["genders"] = json!([2]),
        Gender::All => {}
    }
    Ok(payload)
}

// ─── Response handling ──────────────────────────────────────────────────────

fn check_graph_response(status: StatusCode, body: Value) -> AdapterResult<Value> {
    if let Some(error) = body.get("error") {
        return Err(classify_graph_error(status, error));
    }
    if !status.is_success() {
        return Err(crate::http::map_status_error(
            Platform::Meta,
            status,
            body.to_string().as_bytes(),
        ));
    }
    Ok(body)
}

/// Graph errors carry a numeric code that is more precise than the HTTP status.
pub(crate) fn classify_graph_error(status: StatusCode, error: &Value) -> AdapterError {
    let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
    let message = error
        .get("error_user_msg")
        .or_else(|| error.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| body_preview(error.to_string().as_bytes()));
    let message = format!("code {code}: {message}");
    let transient_flag = error.get("is_transient").and_then(Value::as_bool).unwrap_or(false);

    match code {
        102 | 190 | 10 | 200 => AdapterError::auth(Platform::Meta, message),
        1 | 2 | 4 | 17 | 32 | 341 | 613 | 80004 => AdapterError::transient(Platform::Meta, message),
        _ if transient_flag || status.is_server_error() => AdapterError::transient(Platform::Meta, message),
        _ => AdapterError::validation(Platform::Meta, message),
    }
}

fn created_id(body: &Value, what: &str) -> AdapterResult<String> {
    id_string(body.get("id"))
        .ok_or_else(|| AdapterError::validation(Platform::Meta, format!("{what} response missing id")))
}

pub(crate) fn parse_image_hash(body: &Value) -> AdapterResult<String> {
    body.get("images")
        .and_then(Value::as_object)
        .and_then(|images| images.values().next())
        .and_then(|image| image.get("hash"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AdapterError::validation(Platform::Meta, "image upload response missing hash"))
}

fn find_by_name(body: &Value, name: &str) -> Option<String> {
    body.get("data")?
        .as_array()?
        .iter()
        .find(|row| row.get("name").and_then(Value::as_str) == Some(name))
        .and_then(|row| id_string(row.get("id")))
}

pub(crate) fn parse_daily_metrics(campaigns: &Value, insights: &Value) -> DailyMetrics {
    let valid: BTreeMap<String, String> = data_rows(campaigns)
        .filter(|c| {
            let status = c.get("effective_status").and_then(Value::as_str).unwrap_or_default();
            !crate::is_excluded_status(status)
        })
        .filter_map(|c| {
            let id = id_string(c.get("id"))?;
            let name = c.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
            Some((id, name))
        })
        .collect();

    let rows = data_rows(insights).filter_map(|row| {
        Some(MetricsRow {
            campaign_id: id_string(row.get("campaign_id"))?,
            device: row
                .get("impression_device")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            metrics: DeviceMetrics {
                spend: lenient_f64(row.get("spend")),
                impressions: lenient_u64(row.get("impressions")),
                clicks: lenient_u64(row.get("clicks")),
                roas: row
                    .get("purchase_roas")
                    .and_then(Value::as_array)
                    .and_then(|actions| actions.first())
                    .map(|action| lenient_f64(action.get("value")))
                    .unwrap_or(0.0),
            },
        })
    });

    assemble_metrics(valid, rows)
}

/// Cursor for the next page. Graph omits `paging.next` on the last page.
pub(crate) fn next_page_cursor(body: &Value) -> Option<String> {
    let paging = body.get("paging")?;
    paging.get("next")?;
    paging
        .get("cursors")?
        .get("after")?
        .as_str()
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

fn data_rows(body: &Value) -> impl Iterator<Item = &Value> {
    body.get("data")
        .and_then(Value::as_array)
        .map(|rows| rows.iter())
        .into_iter()
        .flatten()
}

fn page_id(ctx: &RequestContext) -> AdapterResult<String> {
    match &ctx.settings {
        IntegrationSettings::Meta { page_id: Some(page_id) } if !page_id.is_empty() => Ok(page_id.clone()),
        _ => Err(AdapterError::validation(
            Platform::Meta,
            "integration has no Facebook page selected",
        )),
    }
}

#[async_trait]
impl PlatformAdapter for MetaAdapter {
    fn platform(&self) -> Platform {
        Platform::Meta
    }

    fn map_objective(&self, objective: Objective) -> ObjectiveConfig {
        let (row, fallback) = objective_row(objective);
        row.to_config(fallback)
    }

    fn capabilities(&self) -> CapabilityFlags {
        CapabilityFlags {
            keyword_targeting: false,
            gender_targeting: true,
            lifetime_budget: true,
            video_assets: true,
            min_targetable_age: MIN_AGE,
        }
    }

    fn campaign_extra(&self, _budget: &CampaignBudget) -> PlatformExtra {
        PlatformExtra::Meta {
            special_ad_categories: Vec::new(),
            buying_type: "AUCTION".to_string(),
        }
    }

    fn translate_targeting(&self, targeting: &NormalizedTargeting) -> AdapterResult<Value> {
        if !targeting.keywords.is_empty() {
            warn!(count = targeting.keywords.len(), "Meta does not support keyword targeting; keywords dropped");
        }
        targeting_payload(targeting)
    }

    async fn create_campaign(&self, ctx: &RequestContext, input: CampaignInput<'_>) -> AdapterResult<String> {
        let objective = self.map_objective(input.campaign.objective);
        let payload = campaign_payload(&input, &objective);
        let path = format!("{}/campaigns", account_path(&ctx.ad_account_id));
        let body = self.post(ctx, &path, &payload).await?;
        let id = created_id(&body, "campaign")?;
        info!(platform = "META", external_id = %id, request_id = %ctx.request_id, "Campaign created");
        Ok(id)
    }

    async fn create_ad_group(&self, ctx: &RequestContext, input: AdGroupInput<'_>) -> AdapterResult<String> {
        let external_campaign_id = input
            .platform_campaign
            .sync
            .external_id
            .as_deref()
            .ok_or_else(|| AdapterError::validation(Platform::Meta, "campaign has not been created"))?;
        let payload = ad_set_payload(&input, external_campaign_id);
        let path = format!("{}/adsets", account_path(&ctx.ad_account_id));
        let body = self.post(ctx, &path, &payload).await?;
        created_id(&body, "ad set")
    }

    async fn upload_asset(&self, ctx: &RequestContext, content: &AssetContent) -> AdapterResult<String> {
        let account = account_path(&ctx.ad_account_id);
        match content.asset.kind {
            AssetKind::Image => {
                let payload = json!({ "bytes": BASE64.encode(&content.bytes) });
                let body = self.post(ctx, &format!("{account}/adimages"), &payload).await?;
                parse_image_hash(&body)
            }
            AssetKind::Video => {
                let payload = json!({
                    "file_url": content.asset.storage_url,
                    "name": content.asset.file_name,
                });
                let body = self.post(ctx, &format!("{account}/advideos"), &payload).await?;
                created_id(&body, "video upload")
            }
        }
    }

    async fn create_ad(
        &self,
        ctx: &RequestContext,
        ad_group: &AdGroup,
        ad: &Ad,
        assets: &[UploadedAsset],
    ) -> AdapterResult<String> {
        let adset_id = ad_group
            .sync
            .external_id
            .as_deref()
            .ok_or_else(|| AdapterError::validation(Platform::Meta, "ad set has not been created"))?;
        let page_id = page_id(ctx)?;
        let account = account_path(&ctx.ad_account_id);

        let creative = self
            .post(ctx, &format!("{account}/adcreatives"), &creative_payload(ad, &page_id, assets))
            .await?;
        let creative_id = created_id(&creative, "ad creative")?;

        let payload = json!({
            "name": ad.name,
            "adset_id": adset_id,
            "creative": { "creative_id": creative_id },
            "status": "PAUSED",
        });
        let body = self.post(ctx, &format!("{account}/ads"), &payload).await?;
        created_id(&body, "ad")
    }

    async fn find_campaign_by_name(&self, ctx: &RequestContext, name: &str) -> AdapterResult<Option<String>> {
        let path = format!("{}/campaigns", account_path(&ctx.ad_account_id));
        self.find_in_edge(ctx, &path, name).await
    }

    async fn find_ad_group_by_name(
        &self,
        ctx: &RequestContext,
        external_campaign_id: &str,
        name: &str,
    ) -> AdapterResult<Option<String>> {
        self.find_in_edge(ctx, &format!("{external_campaign_id}/adsets"), name).await
    }

    async fn find_ad_by_name(
        &self,
        ctx: &RequestContext,
        external_ad_group_id: &str,
        name: &str,
    ) -> AdapterResult<Option<String>> {
        self.find_in_edge(ctx, &format!("{external_ad_group_id}/ads"), name).await
    }

    async fn fetch_daily_metrics(&self, ctx: &RequestContext, date: NaiveDate) -> AdapterResult<DailyMetrics> {
        let account = account_path(&ctx.ad_account_id);
        let campaigns = self
            .get_all(
                ctx,
                &format!("{account}/campaigns"),
                &[
                    ("fields", "id,name,effective_status".to_string()),
                    ("limit", "500".to_string()),
                ],
            )
            .await?;
        let day = date.format("%Y-%m-%d").to_string();
        let insights = self
            .get_all(
                ctx,
                &format!("{account}/insights"),
                &[
                    ("level", "campaign".to_string()),
                    ("fields", "campaign_id,campaign_name,spend,impressions,clicks,purchase_roas".to_string()),
                    ("breakdowns", "impression_device".to_string()),
                    ("time_range", json!({ "since": day, "until": day }).to_string()),
                    ("limit", "500".to_string()),
                ],
            )
            .await?;
        Ok(parse_daily_metrics(&campaigns, &insights))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adportal_core::MinorUnits;
    use adportal_core::SyncState;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use uuid::Uuid;

    fn adapter() -> MetaAdapter {
        MetaAdapter::new(&MetaConfig::default()).unwrap()
    }

    fn targeting() -> NormalizedTargeting {
        NormalizedTargeting {
            min_age: 13,
            max_age: 80,
            gender: Gender::Female,
            locations: vec!["us".into(), "CA".into()],
            keywords: vec!["running shoes".into()],
        }
    }

    #[test]
    fn test_objective_table_is_total() {
        let adapter = adapter();
        for objective in Objective::ALL {
            let config = adapter.map_objective(objective);
            assert!(!config.campaign_objective.is_empty());
            assert!(!config.optimization_goal.is_empty());
            assert!(!config.billing_event.is_empty());
            assert!(!config.bid_type.is_empty());
        }
        let traffic = adapter.map_objective(Objective::Traffic);
        assert_eq!(traffic.campaign_objective, "OUTCOME_TRAFFIC");
        assert_eq!(traffic.optimization_goal, "LINK_CLICKS");
        assert!(adapter.map_objective(Objective::Sales).fallback);
    }

    #[test]
    fn test_targeting_clamps_ages_and_drops_keywords() {
        let payload = adapter().translate_targeting(&targeting()).unwrap();
        assert_eq!(payload["age_min"], 18);
        assert_eq!(payload["age_max"], 65);
        assert_eq!(payload["genders"], json!([2]));
        assert_eq!(payload["geo_locations"]["countries"], json!(["US", "CA"]));
        assert_eq!(payload["targeting_automation"]["advantage_audience"], 0);
        assert!(payload.get("keywords").is_none());
        assert!(payload.get("interests").is_none());
    }

    #[test]
    fn test_targeting_requires_location() {
        let mut t = targeting();
        t.locations.clear();
        assert_eq!(adapter().translate_targeting(&t).unwrap_err().kind(), "validation");
    }

    #[rstest]
    #[case::expired_token(190, false, "auth")]
    #[case::permission(200, false, "auth")]
    #[case::rate_limit(17, false, "transient")]
    #[case::flagged_transient(100, true, "transient")]
    #[case::bad_param(100, false, "validation")]
    fn test_graph_error_classification(#[case] code: i64, #[case] transient: bool, #[case] kind: &str) {
        let error = json!({ "message": "boom", "code": code, "is_transient": transient });
        assert_eq!(classify_graph_error(StatusCode::BAD_REQUEST, &error).kind(), kind);
    }

    #[test]
    fn test_ad_set_payload_uses_minor_units() {
        let campaign = UnifiedCampaign {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            name: "Spring".into(),
            objective: Objective::Traffic,
            status: CampaignStatus::Paused,
            currency: "USD".into(),
            created_at: Utc::now(),
        };
        let budget = CampaignBudget {
            id: Uuid::new_v4(),
            campaign_id: campaign.id,
            platform: Platform::Meta,
            budget_type: BudgetType::Daily,
            amount: MinorUnits(2500),
            start_date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            end_date: None,
            run_continuously: true,
        };
        let platform_campaign = PlatformCampaign {
            id: Uuid::new_v4(),
            campaign_id: campaign.id,
            integration_id: Uuid::new_v4(),
            platform: Platform::Meta,
            name: "Spring".into(),
            status: CampaignStatus::Paused,
            extra: adapter().campaign_extra(&budget),
            capabilities: adapter().capabilities(),
            sync: SyncState::default(),
        };
        let ad_group = AdGroup {
            id: Uuid::new_v4(),
            platform_campaign_id: platform_campaign.id,
            name: "Spring - Ad Set".into(),
            targeting_config: json!({}),
            normalized_targeting: targeting(),
            bidding_config: adapter().map_objective(Objective::Traffic),
            start_time: Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap(),
            end_time: None,
            status: CampaignStatus::Paused,
            sync: SyncState::default(),
        };
        let input = AdGroupInput {
            campaign: &campaign,
            budget: &budget,
            platform_campaign: &platform_campaign,
            ad_group: &ad_group,
        };
        let payload = ad_set_payload(&input, "120200");
        assert_eq!(payload["daily_budget"], 2500);
        assert_eq!(payload["billing_event"], "IMPRESSIONS");
        assert_eq!(payload["bid_strategy"], "LOWEST_COST_WITHOUT_CAP");
        assert_eq!(payload["campaign_id"], "120200");
        assert!(payload.get("end_time").is_none());
    }

    #[test]
    fn test_parse_image_hash() {
        let body = json!({ "images": { "bytes": { "hash": "abc123", "url": "https://x" } } });
        assert_eq!(parse_image_hash(&body).unwrap(), "abc123");
        assert!(parse_image_hash(&json!({})).is_err());
    }

    #[test]
    fn test_daily_metrics_excludes_deleted_and_zero_fills() {
        let campaigns = json!({ "data": [
            { "id": "1", "name": "Live", "effective_status": "ACTIVE" },
            { "id": "2", "name": "Idle", "effective_status": "PAUSED" },
            { "id": "3", "name": "Gone", "effective_status": "DELETED" },
        ]});
        let insights = json!({ "data": [
            { "campaign_id": "1", "impression_device": "iphone", "spend": "10.00", "impressions": "100", "clicks": "5" },
            { "campaign_id": "1", "impression_device": "desktop", "spend": "20.00", "impressions": "100", "clicks": "5",
              "purchase_roas": [{ "action_type": "omni_purchase", "value": "1.5" }] },
            { "campaign_id": "3", "impression_device": "desktop", "spend": "99", "impressions": "1", "clicks": "1" },
        ]});
        let metrics = parse_daily_metrics(&campaigns, &insights);
        assert_eq!(metrics.len(), 2);
        let live = &metrics["1"];
        assert_eq!(live.spend, 30.0);
        assert!((live.ctr - 5.0).abs() < 1e-9);
        assert!((live.roas - 1.0).abs() < 1e-9);
        assert_eq!(metrics["2"].impressions, 0);
        assert!(!metrics.contains_key("3"));
    }

    #[rstest]
    #[case::more_pages(json!({ "data": [], "paging": { "cursors": { "after": "QVFI" }, "next": "https://graph" } }), Some("QVFI"))]
    #[case::last_page(json!({ "data": [], "paging": { "cursors": { "after": "QVFI" } } }), None)]
    #[case::no_paging(json!({ "data": [] }), None)]
    #[case::empty_cursor(json!({ "paging": { "cursors": { "after": "" }, "next": "https://graph" } }), None)]
    fn test_next_page_cursor(#[case] body: Value, #[case] expected: Option<&str>) {
        assert_eq!(next_page_cursor(&body).as_deref(), expected);
    }

    #[test]
    fn test_account_path() {
        assert_eq!(account_path("12345"), "act_12345");
        assert_eq!(account_path("act_12345"), "act_12345");
    }
}
