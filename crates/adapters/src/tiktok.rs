//! TikTok Business API adapter.
//!
//! Every response is an envelope `{code, message, data}` where `code == 0`
//! means success, regardless of the HTTP status. Budgets are sent as decimal
//! major units. Keywords are dropped: TikTok targets by interest category ids.

use crate::context::RequestContext;
use crate::error::{AdapterError, AdapterResult};
use crate::geo;
use crate::http::{id_string, lenient_f64, lenient_u64, send_json, MAX_PAGES};
use crate::{
    assemble_metrics, overlapping_buckets, AdGroupInput, CampaignInput, DailyMetrics, MetricsRow,
    PlatformAdapter,
};
use adportal_core::config::TiktokConfig;
use adportal_core::models::*;
use adportal_core::performance::DeviceMetrics;
use adportal_core::types::*;
use adportal_core::{Objective, Platform};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{info, warn};

const AGE_GROUPS: &[(&str, u8, u8)] = &[
    ("AGE_13_17", 13, 17),
    ("AGE_18_24", 18, 24),
    ("AGE_25_34", 25, 34),
    ("AGE_35_44", 35, 44),
    ("AGE_45_54", 45, 54),
    ("AGE_55_100", 55, 100),
];

// Standard settings for advertisers without a pixel.
const TRAFFIC: ObjectiveRow = ObjectiveRow {
    campaign_objective: "TRAFFIC",
    promotion_type: "WEBSITE",
    optimization_goal: "CLICK",
    billing_event: "CPC",
    bid_type: "BID_TYPE_NO_BID",
    pacing: "PACING_MODE_SMOOTH",
};

/// AWARENESS needs CPM billing with REACH; VIDEO_VIEW needs CPM with
/// VIDEO_VIEW; ENGAGEMENT optimizes for clicks. Everything else falls back to
/// the traffic row.
fn objective_row(objective: Objective) -> (ObjectiveRow, bool) {
    match objective {
        Objective::Traffic => (TRAFFIC, false),
        Objective::Awareness => (
            ObjectiveRow {
                campaign_objective: "REACH",
                optimization_goal: "REACH",
                billing_event: "CPM",
                ..TRAFFIC
            },
            false,
        ),
        Objective::VideoView => (
            ObjectiveRow {
                campaign_objective: "VIDEO_VIEWS",
                optimization_goal: "VIDEO_VIEW",
                billing_event: "CPM",
                ..TRAFFIC
            },
            false,
        ),
        Objective::Engagement => (
            ObjectiveRow {
                campaign_objective: "ENGAGEMENT",
                ..TRAFFIC
            },
            false,
        ),
        Objective::Lead | Objective::Sales | Objective::AppInstall => (TRAFFIC, true),
    }
}

pub struct TiktokAdapter {
    client: Client,
    base_url: String,
}

impl TiktokAdapter {
    pub fn new(config: &TiktokConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/", self.base_url, path.trim_matches('/'))
    }

    async fn post(&self, ctx: &RequestContext, path: &str, payload: &Value) -> AdapterResult<Value> {
        let request = self
            .client
            .post(self.url(path))
            .header("Access-Token", &ctx.access_token)
            .timeout(ctx.timeout)
            .json(payload);
        let (status, body) = send_json(Platform::Tiktok, request).await?;
        unwrap_envelope(status, body)
    }

    async fn get(&self, ctx: &RequestContext, path: &str, query: &[(&str, String)]) -> AdapterResult<Value> {
        let request = self
            .client
            .get(self.url(path))
            .header("Access-Token", &ctx.access_token)
            .timeout(ctx.timeout)
            .query(query);
        let (status, body) = send_json(Platform::Tiktok, request).await?;
        unwrap_envelope(status, body)
    }

    /// Walk `page_info` until the last page, and return every row under a
    /// single `list` array.
    async fn get_all(&self, ctx: &RequestContext, path: &str, query: &[(&str, String)]) -> AdapterResult<Value> {
        let mut rows = Vec::new();
        let mut page = 1;
        while page <= MAX_PAGES {
            let mut page_query = query.to_vec();
            page_query.push(("page", page.to_string()));
            let data = self.get(ctx, path, &page_query).await?;
            rows.extend(list_rows(&data).cloned());
            if page >= total_pages(&data) {
                return Ok(json!({ "list": rows }));
            }
            page += 1;
        }
        warn!(path, pages = MAX_PAGES, "Stopped paging before the last page");
        Ok(json!({ "list": rows }))
    }

    async fn find_in_list(
        &self,
        ctx: &RequestContext,
        path: &str,
        filtering: Value,
        id_field: &str,
        name_field: &str,
        name: &str,
    ) -> AdapterResult<Option<String>> {
        let data = self
            .get(
                ctx,
                path,
                &[
                    ("advertiser_id", ctx.ad_account_id.clone()),
                    ("filtering", filtering.to_string()),
                    ("page_size", "100".to_string()),
                ],
            )
            .await?;
        Ok(id_by_name(&data, id_field, name_field, name))
    }
}

/// `YYYY-MM-DD HH:MM:SS` in UTC.
pub(crate) fn tiktok_datetime(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Minor units to the decimal major-unit amount TikTok expects.
fn major_amount(budget: &CampaignBudget, currency: &str) -> f64 {
    budget.amount.to_major(currency)
}

fn budget_mode(budget: &CampaignBudget) -> &'static str {
    match budget.effective_type() {
        BudgetType::Daily => "BUDGET_MODE_DAY",
        BudgetType::OneTime => "BUDGET_MODE_TOTAL",
    }
}

pub(crate) fn campaign_payload(
    advertiser_id: &str,
    input: &CampaignInput<'_>,
    objective: &ObjectiveConfig,
) -> Value {
    json!({
        "advertiser_id": advertiser_id,
        "campaign_name": input.platform_campaign.name,
        "objective_type": objective.campaign_objective,
        "budget_mode": budget_mode(input.budget),
        "budget": major_amount(input.budget, &input.campaign.currency),
    })
}

pub(crate) fn ad_group_payload(advertiser_id: &str, input: &AdGroupInput<'_>, external_campaign_id: &str) -> Value {
    let group = input.ad_group;
    let bidding = &group.bidding_config;
    let mut payload = json!({
        "advertiser_id": advertiser_id,
        "campaign_id": external_campaign_id,
        "adgroup_name": group.name,
        "placement_type": "PLACEMENT_TYPE_NORMAL",
        "placements": ["PLACEMENT_TIKTOK"],
        "budget_mode": budget_mode(input.budget),
        "budget": major_amount(input.budget, &input.campaign.currency),
        "schedule_start_time": tiktok_datetime(group.start_time),
        "promotion_type": bidding.promotion_type,
        "optimization_goal": bidding.optimization_goal,
        "billing_event": bidding.billing_event,
        "bid_type": bidding.bid_type,
        "pacing": bidding.pacing,
    });
    match group.end_time {
        Some(end) => {
            payload["schedule_type"] = json!("SCHEDULE_START_END");
            payload["schedule_end_time"] = json!(tiktok_datetime(end));
        }
        None => payload["schedule_type"] = json!("SCHEDULE_FROM_NOW"),
    }
    if let Some(targeting) = group.targeting_config.as_object() {
        for (key, value) in targeting {
            payload[key.as_str()] = value.clone();
        }
    }
    payload
}

pub(crate) fn targeting_payload(targeting: &NormalizedTargeting) -> AdapterResult<Value> {
    let mut location_ids = Vec::new();
    for code in &targeting.locations {
        match geo::geonames_id(code) {
            Some(id) => location_ids.push(id.to_string()),
            None => warn!(country = %code, "No TikTok location id for country; dropped"),
        }
    }
    if location_ids.is_empty() {
        return Err(AdapterError::validation(
            Platform::Tiktok,
            "none of the requested locations can be targeted",
        ));
    }
    let gender = match targeting.gender {
        Gender::All => "GENDER_UNLIMITED",
        Gender::Male => "GENDER_MALE",
        Gender::Female => "GENDER_FEMALE",
    };
    Ok(json!({
        "location_ids": location_ids,
        "age_groups": overlapping_buckets(AGE_GROUPS, targeting.min_age, targeting.max_age),
        "gender": gender,
    }))
}

pub(crate) fn ad_payload(
    advertiser_id: &str,
    external_ad_group_id: &str,
    ad: &Ad,
    display_name: &str,
    assets: &[UploadedAsset],
) -> AdapterResult<Value> {
    let creative = &ad.creative;
    let mut body = json!({
        "ad_name": ad.name,
        "ad_text": creative.primary_text,
        "call_to_action": creative.call_to_action.as_str(),
        "landing_page_url": creative.destination_url,
        "display_name": display_name,
    });

    let video = assets.iter().find(|a| a.kind == AssetKind::Video);
    let images: Vec<&str> = assets
        .iter()
        .filter(|a| a.kind == AssetKind::Image)
        .map(|a| a.platform_asset_id.as_str())
        .collect();
    match (video, images.is_empty()) {
        (Some(video), _) => {
            body["ad_format"] = json!("SINGLE_VIDEO");
            body["video_id"] = json!(video.platform_asset_id);
            if let Some(cover) = images.first() {
                body["image_ids"] = json!([cover]);
            }
        }
        (None, false) => {
            body["ad_format"] = json!("SINGLE_IMAGE");
            body["image_ids"] = json!(images);
        }
        (None, true) => {
            return Err(AdapterError::validation(
                Platform::Tiktok,
                "ads need a video or image asset",
            ))
        }
    }

    Ok(json!({
        "advertiser_id": advertiser_id,
        "adgroup_id": external_ad_group_id,
        "creatives": [body],
    }))
}

// ─── Response handling ──────────────────────────────────────────────────────

/// Unwrap `{code, message, data}`, classifying non-zero codes.
pub(crate) fn unwrap_envelope(status: StatusCode, body: Value) -> AdapterResult<Value> {
    let code = body.get("code").and_then(Value::as_i64);
    match code {
        Some(0) => Ok(body.get("data").cloned().unwrap_or(Value::Null)),
        Some(code) => {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            Err(classify_code(code, message))
        }
        None => Err(crate::http::map_status_error(
            Platform::Tiktok,
            if status.is_success() { StatusCode::BAD_GATEWAY } else { status },
            body.to_string().as_bytes(),
        )),
    }
}

pub(crate) fn classify_code(code: i64, message: &str) -> AdapterError {
    let message = format!("code {code}: {message}");
    match code {
        40001 | 40101..=40105 => AdapterError::auth(Platform::Tiktok, message),
        40100 | 50000..=59999 => AdapterError::transient(Platform::Tiktok, message),
        _ => AdapterError::validation(Platform::Tiktok, message),
    }
}

/// Id of the listed row whose name matches exactly. TikTok filters are
/// fuzzy, so the match is re-checked here.
pub(crate) fn id_by_name(data: &Value, id_field: &str, name_field: &str, name: &str) -> Option<String> {
    list_rows(data)
        .find(|row| row.get(name_field).and_then(Value::as_str) == Some(name))
        .and_then(|row| id_string(row.get(id_field)))
}

/// `page_info.total_page`; a response without it is a single page.
pub(crate) fn total_pages(data: &Value) -> usize {
    data.get("page_info")
        .and_then(|info| info.get("total_page"))
        .and_then(Value::as_u64)
        .map_or(1, |n| n.max(1) as usize)
}

fn list_rows(data: &Value) -> impl Iterator<Item = &Value> {
    data.get("list")
        .and_then(Value::as_array)
        .map(|rows| rows.iter())
        .into_iter()
        .flatten()
}

fn required_id(data: &Value, field: &str) -> AdapterResult<String> {
    id_string(data.get(field))
        .ok_or_else(|| AdapterError::validation(Platform::Tiktok, format!("response missing {field}")))
}

/// Upload responses come back as an object or a one-element list.
pub(crate) fn upload_id(data: &Value, field: &str) -> AdapterResult<String> {
    let row = match data {
        Value::Array(rows) => rows.first().unwrap_or(&Value::Null),
        other => other,
    };
    required_id(row, field)
}

pub(crate) fn parse_daily_metrics(campaigns: &Value, report: &Value) -> DailyMetrics {
    let valid: BTreeMap<String, String> = list_rows(campaigns)
        .filter(|c| {
            let status = c
                .get("primary_status")
                .or_else(|| c.get("operation_status"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            !crate::is_excluded_status(status)
        })
        .filter_map(|c| {
            let id = id_string(c.get("campaign_id"))?;
            let name = c
                .get("campaign_name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Some((id, name))
        })
        .collect();

    let rows = list_rows(report).filter_map(|row| {
        let dimensions = row.get("dimensions")?;
        let metrics = row.get("metrics")?;
        Some(MetricsRow {
            campaign_id: id_string(dimensions.get("campaign_id"))?,
            device: dimensions
                .get("device_system")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            metrics: DeviceMetrics {
                spend: lenient_f64(metrics.get("spend")),
                impressions: lenient_u64(metrics.get("impressions")),
                clicks: lenient_u64(metrics.get("clicks")),
                roas: lenient_f64(metrics.get("conversion_roas")),
            },
        })
    });

    assemble_metrics(valid, rows)
}

fn display_name(ctx: &RequestContext, ad: &Ad) -> String {
    match &ctx.settings {
        IntegrationSettings::Tiktok { display_name: Some(name) } if !name.is_empty() => name.clone(),
        _ => ad.creative.ad_name.clone(),
    }
}

#[async_trait]
impl PlatformAdapter for TiktokAdapter {
    fn platform(&self) -> Platform {
        Platform::Tiktok
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
            min_targetable_age: 13,
        }
    }

    fn campaign_extra(&self, budget: &CampaignBudget) -> PlatformExtra {
        PlatformExtra::Tiktok {
            budget_mode: budget_mode(budget).to_string(),
        }
    }

    fn translate_targeting(&self, targeting: &NormalizedTargeting) -> AdapterResult<Value> {
        if !targeting.keywords.is_empty() {
            warn!(count = targeting.keywords.len(), "TikTok does not support keyword targeting; keywords dropped");
        }
        targeting_payload(targeting)
    }

    async fn create_campaign(&self, ctx: &RequestContext, input: CampaignInput<'_>) -> AdapterResult<String> {
        let objective = self.map_objective(input.campaign.objective);
        let payload = campaign_payload(&ctx.ad_account_id, &input, &objective);
        let data = self.post(ctx, "campaign/create", &payload).await?;
        let id = required_id(&data, "campaign_id")?;
        info!(platform = "TIKTOK", external_id = %id, request_id = %ctx.request_id, "Campaign created");
        Ok(id)
    }

    async fn create_ad_group(&self, ctx: &RequestContext, input: AdGroupInput<'_>) -> AdapterResult<String> {
        let external_campaign_id = input
            .platform_campaign
            .sync
            .external_id
            .as_deref()
            .ok_or_else(|| AdapterError::validation(Platform::Tiktok, "campaign has not been created"))?;
        let payload = ad_group_payload(&ctx.ad_account_id, &input, external_campaign_id);
        let data = self.post(ctx, "adgroup/create", &payload).await?;
        required_id(&data, "adgroup_id")
    }

    async fn upload_asset(&self, ctx: &RequestContext, content: &AssetContent) -> AdapterResult<String> {
        let asset = &content.asset;
        match asset.kind {
            AssetKind::Video => {
                let payload = json!({
                    "advertiser_id": ctx.ad_account_id,
                    "upload_type": "UPLOAD_BY_URL",
                    "video_url": asset.storage_url,
                    "file_name": asset.file_name,
                });
                let data = self.post(ctx, "file/video/ad/upload", &payload).await?;
                upload_id(&data, "video_id")
            }
            AssetKind::Image => {
                let payload = json!({
                    "advertiser_id": ctx.ad_account_id,
                    "upload_type": "UPLOAD_BY_URL",
                    "image_url": asset.storage_url,
                    "file_name": asset.file_name,
                });
                let data = self.post(ctx, "file/image/ad/upload", &payload).await?;
                upload_id(&data, "image_id")
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
        let external_ad_group_id = ad_group
            .sync
            .external_id
            .as_deref()
            .ok_or_else(|| AdapterError::validation(Platform::Tiktok, "ad group has not been created"))?;
        let payload = ad_payload(
            &ctx.ad_account_id,
            external_ad_group_id,
            ad,
            &display_name(ctx, ad),
            assets,
        )?;
        let data = self.post(ctx, "ad/create", &payload).await?;
        data.get("ad_ids")
            .and_then(Value::as_array)
            .and_then(|ids| ids.first())
            .and_then(|id| id_string(Some(id)))
            .ok_or_else(|| AdapterError::validation(Platform::Tiktok, "response missing ad_ids"))
    }

    async fn find_campaign_by_name(&self, ctx: &RequestContext, name: &str) -> AdapterResult<Option<String>> {
        self.find_in_list(
            ctx,
            "campaign/get",
            json!({ "campaign_name": name }),
            "campaign_id",
            "campaign_name",
            name,
        )
        .await
    }

    async fn find_ad_group_by_name(
        &self,
        ctx: &RequestContext,
        external_campaign_id: &str,
        name: &str,
    ) -> AdapterResult<Option<String>> {
        self.find_in_list(
            ctx,
            "adgroup/get",
            json!({ "campaign_ids": [external_campaign_id] }),
            "adgroup_id",
            "adgroup_name",
            name,
        )
        .await
    }

    async fn find_ad_by_name(
        &self,
        ctx: &RequestContext,
        external_ad_group_id: &str,
        name: &str,
    ) -> AdapterResult<Option<String>> {
        self.find_in_list(
            ctx,
            "ad/get",
            json!({ "adgroup_ids": [external_ad_group_id] }),
            "ad_id",
            "ad_name",
            name,
        )
        .await
    }

    async fn fetch_daily_metrics(&self, ctx: &RequestContext, date: NaiveDate) -> AdapterResult<DailyMetrics> {
        let campaigns = self
            .get_all(
                ctx,
                "campaign/get",
                &[
                    ("advertiser_id", ctx.ad_account_id.clone()),
                    ("page_size", "1000".to_string()),
                ],
            )
            .await?;
        let campaign_ids: Vec<String> = list_rows(&campaigns)
            .filter_map(|c| id_string(c.get("campaign_id")))
            .collect();
        if campaign_ids.is_empty() {
            return Ok(DailyMetrics::new());
        }

        let day = date.format("%Y-%m-%d").to_string();
        let report = self
            .get_all(
                ctx,
                "report/integrated/get",
                &[
                    ("advertiser_id", ctx.ad_account_id.clone()),
                    ("report_type", "BASIC".to_string()),
                    ("data_level", "AUCTION_CAMPAIGN".to_string()),
                    ("dimensions", json!(["campaign_id", "device_system"]).to_string()),
                    (
                        "metrics",
                        json!(["spend", "impressions", "clicks", "ctr", "cpc", "conversion_roas"]).to_string(),
                    ),
                    ("start_date", day.clone()),
                    ("end_date", day),
                    ("filtering", json!({ "campaign_ids": campaign_ids }).to_string()),
                    ("page_size", "1000".to_string()),
                ],
            )
            .await?;
        Ok(parse_daily_metrics(&campaigns, &report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn adapter() -> TiktokAdapter {
        TiktokAdapter::new(&TiktokConfig::default()).unwrap()
    }

    #[rstest]
    #[case::traffic(Objective::Traffic, "CLICK", "CPC", false)]
    #[case::awareness(Objective::Awareness, "REACH", "CPM", false)]
    #[case::video(Objective::VideoView, "VIDEO_VIEW", "CPM", false)]
    #[case::engagement(Objective::Engagement, "CLICK", "CPC", false)]
    #[case::lead(Objective::Lead, "CLICK", "CPC", true)]
    #[case::sales(Objective::Sales, "CLICK", "CPC", true)]
    #[case::app_install(Objective::AppInstall, "CLICK", "CPC", true)]
    fn test_objective_table(
        #[case] objective: Objective,
        #[case] goal: &str,
        #[case] billing: &str,
        #[case] fallback: bool,
    ) {
        let config = adapter().map_objective(objective);
        assert_eq!(config.optimization_goal, goal);
        assert_eq!(config.billing_event, billing);
        assert_eq!(config.promotion_type, "WEBSITE");
        assert_eq!(config.bid_type, "BID_TYPE_NO_BID");
        assert_eq!(config.pacing, "PACING_MODE_SMOOTH");
        assert_eq!(config.fallback, fallback);
    }

    #[test]
    fn test_datetime_format() {
        let at = Utc.with_ymd_and_hms(2025, 12, 20, 9, 5, 0).unwrap();
        assert_eq!(tiktok_datetime(at), "2025-12-20 09:05:00");
    }

    #[test]
    fn test_targeting_maps_locations_and_ages() {
        let targeting = NormalizedTargeting {
            min_age: 21,
            max_age: 40,
            gender: Gender::Male,
            locations: vec!["US".into(), "ZZ".into()],
            keywords: vec!["shoes".into()],
        };
        let payload = adapter().translate_targeting(&targeting).unwrap();
        assert_eq!(payload["location_ids"], json!(["6252001"]));
        assert_eq!(payload["age_groups"], json!(["AGE_18_24", "AGE_25_34", "AGE_35_44"]));
        assert_eq!(payload["gender"], "GENDER_MALE");
        assert!(payload.get("keywords").is_none());
    }

    #[test]
    fn test_targeting_with_only_unknown_locations_is_rejected() {
        let targeting = NormalizedTargeting {
            min_age: 18,
            max_age: 65,
            gender: Gender::All,
            locations: vec!["ZZ".into()],
            keywords: vec![],
        };
        assert_eq!(adapter().translate_targeting(&targeting).unwrap_err().kind(), "validation");
    }

    #[rstest]
    #[case::expired_token(40105, "auth")]
    #[case::invalid_token(40001, "auth")]
    #[case::rate_limited(40100, "transient")]
    #[case::server(51000, "transient")]
    #[case::bad_param(40002, "validation")]
    fn test_code_classification(#[case] code: i64, #[case] kind: &str) {
        assert_eq!(classify_code(code, "x").kind(), kind);
    }

    #[test]
    fn test_envelope() {
        let ok = json!({ "code": 0, "message": "OK", "data": { "campaign_id": 1851326442807426u64 } });
        let data = unwrap_envelope(StatusCode::OK, ok).unwrap();
        assert_eq!(required_id(&data, "campaign_id").unwrap(), "1851326442807426");

        let budget_too_low = json!({ "code": 40002, "message": "Budget is too low", "data": {} });
        let err = unwrap_envelope(StatusCode::OK, budget_too_low).unwrap_err();
        assert!(err.message().contains("Budget is too low"));
    }

    #[test]
    fn test_upload_id_accepts_list() {
        assert_eq!(upload_id(&json!([{ "video_id": "v1" }]), "video_id").unwrap(), "v1");
        assert_eq!(upload_id(&json!({ "image_id": "i1" }), "image_id").unwrap(), "i1");
    }

    #[test]
    fn test_id_by_name_requires_exact_match() {
        let data = json!({ "list": [
            { "campaign_id": "1801", "campaign_name": "Spring sale" },
            { "campaign_id": 1802, "campaign_name": "Spring" },
        ]});
        assert_eq!(id_by_name(&data, "campaign_id", "campaign_name", "Spring").as_deref(), Some("1802"));
        assert_eq!(id_by_name(&data, "campaign_id", "campaign_name", "spring"), None);
        assert_eq!(id_by_name(&json!({}), "adgroup_id", "adgroup_name", "Spring"), None);
    }

    #[rstest]
    #[case::three_pages(json!({ "list": [], "page_info": { "page": 1, "total_page": 3 } }), 3)]
    #[case::single(json!({ "list": [], "page_info": { "page": 1, "total_page": 1 } }), 1)]
    #[case::empty_result(json!({ "list": [], "page_info": { "page": 1, "total_page": 0 } }), 1)]
    #[case::no_page_info(json!({ "list": [] }), 1)]
    fn test_total_pages(#[case] data: Value, #[case] expected: usize) {
        assert_eq!(total_pages(&data), expected);
    }

    #[test]
    fn test_daily_metrics_filters_and_zero_fills() {
        let campaigns = json!({ "list": [
            { "campaign_id": "1", "campaign_name": "Live", "primary_status": "STATUS_DELIVERY_OK" },
            { "campaign_id": "2", "campaign_name": "Quiet", "operation_status": "ENABLE" },
            { "campaign_id": "3", "campaign_name": "Removed", "primary_status": "CAMPAIGN_STATUS_DELETE" },
            { "campaign_id": "4", "campaign_name": "Draft", "primary_status": "DRAFT" },
        ]});
        let report = json!({ "list": [
            { "dimensions": { "campaign_id": "1", "device_system": "ANDROID" },
              "metrics": { "spend": "10.0", "impressions": "100", "clicks": "5", "conversion_roas": "2.0" } },
            { "dimensions": { "campaign_id": "1", "device_system": "IOS" },
              "metrics": { "spend": "20.0", "impressions": "100", "clicks": "5", "conversion_roas": "0" } },
        ]});
        let metrics = parse_daily_metrics(&campaigns, &report);
        assert_eq!(metrics.keys().collect::<Vec<_>>(), vec!["1", "2"]);
        let live = &metrics["1"];
        assert_eq!(live.clicks, 10);
        assert!((live.ctr - 5.0).abs() < 1e-9);
        assert!((live.cpc - 3.0).abs() < 1e-9);
        assert_eq!(live.device_breakdown.len(), 2);
        assert_eq!(metrics["2"].spend, 0.0);
    }
}
