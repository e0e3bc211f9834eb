//! Google Ads REST adapter (Display network).
//!
//! Campaign and budget are created in one atomic `googleAds:mutate`, as are
//! the ad group and its criteria. Amounts go out in micros. Lifetime budgets
//! are not supported on Display campaigns, so one-time budgets are spread
//! evenly across the flight as a daily amount.

use crate::context::RequestContext;
use crate::error::{AdapterError, AdapterResult};
use crate::geo;
use crate::http::{body_preview, id_string, lenient_f64, lenient_u64, send_json};
use crate::{
    assemble_metrics, overlapping_buckets, AdGroupInput, CampaignInput, DailyMetrics, MetricsRow,
    PlatformAdapter,
};
use adportal_core::config::GoogleConfig;
use adportal_core::models::*;
use adportal_core::performance::DeviceMetrics;
use adportal_core::types::*;
use adportal_core::{MinorUnits, Objective, Platform};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{info, warn};

const CHANNEL: &str = "DISPLAY";

const AGE_RANGES: &[(&str, u8, u8)] = &[
    ("AGE_RANGE_18_24", 18, 24),
    ("AGE_RANGE_25_34", 25, 34),
    ("AGE_RANGE_35_44", 35, 44),
    ("AGE_RANGE_45_54", 45, 54),
    ("AGE_RANGE_55_64", 55, 64),
    ("AGE_RANGE_65_UP", 65, 120),
];

const TRAFFIC: ObjectiveRow = ObjectiveRow {
    campaign_objective: "WEBSITE_TRAFFIC",
    promotion_type: "WEBSITE",
    optimization_goal: "CLICKS",
    billing_event: "CPC",
    bid_type: "TARGET_SPEND",
    pacing: "STANDARD",
};

const AWARENESS: ObjectiveRow = ObjectiveRow {
    campaign_objective: "BRAND_AWARENESS_AND_REACH",
    optimization_goal: "IMPRESSIONS",
    billing_event: "CPM",
    bid_type: "MANUAL_CPM",
    ..TRAFFIC
};

/// Display campaigns without conversion tracking only support click and
/// impression bidding. Video views map to the awareness row.
fn objective_row(objective: Objective) -> (ObjectiveRow, bool) {
    match objective {
        Objective::Traffic => (TRAFFIC, false),
        Objective::Awareness => (AWARENESS, false),
        Objective::VideoView => (AWARENESS, true),
        Objective::Engagement | Objective::Lead | Objective::Sales | Objective::AppInstall => {
            (TRAFFIC, true)
        }
    }
}

pub struct GoogleAdapter {
    client: Client,
    base_url: String,
    developer_token: String,
}

impl GoogleAdapter {
    pub fn new(config: &GoogleConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: format!(
                "{}/{}",
                config.ads_url.trim_end_matches('/'),
                config.api_version
            ),
            developer_token: config.developer_token.clone(),
        })
    }

    async fn call(&self, ctx: &RequestContext, method: &str, payload: &Value) -> AdapterResult<Value> {
        let url = format!(
            "{}/customers/{}/googleAds:{}",
            self.base_url,
            customer_id(&ctx.ad_account_id),
            method
        );
        let mut request = self
            .client
            .post(url)
            .bearer_auth(&ctx.access_token)
            .header("developer-token", &self.developer_token)
            .timeout(ctx.timeout)
            .json(payload);
        if let IntegrationSettings::Google { login_customer_id: Some(login) } = &ctx.settings {
            request = request.header("login-customer-id", customer_id(login));
        }
        let (status, body) = send_json(Platform::Google, request).await?;
        check_response(status, body)
    }

    async fn mutate(&self, ctx: &RequestContext, operations: Vec<Value>) -> AdapterResult<Value> {
        self.call(ctx, "mutate", &json!({ "mutateOperations": operations })).await
    }

    async fn search(&self, ctx: &RequestContext, query: String) -> AdapterResult<Value> {
        self.call(ctx, "search", &json!({ "query": query })).await
    }

    async fn find_one(&self, ctx: &RequestContext, query: String, entity: &str) -> AdapterResult<Option<String>> {
        let body = self.search(ctx, query).await?;
        Ok(first_entity_id(&body, entity))
    }
}

/// Customer ids are accepted with or without dashes.
pub(crate) fn customer_id(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// GAQL string literal.
pub(crate) fn gaql_quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn resource(customer: &str, collection: &str, id: &str) -> String {
    format!("customers/{customer}/{collection}/{id}")
}

/// Last path segment of a resource name; ad group ads use `group~ad`.
pub(crate) fn resource_id(resource_name: &str) -> Option<String> {
    let last = resource_name.rsplit('/').next()?;
    let id = last.rsplit('~').next()?;
    (!id.is_empty()).then(|| id.to_string())
}

/// Daily amount in micros. One-time budgets are divided over the inclusive
/// flight length, rounding up so the full amount can be spent.
pub(crate) fn daily_budget_micros(budget: &CampaignBudget, currency: &str) -> AdapterResult<i64> {
    let minor = match (budget.effective_type(), budget.end_date) {
        (BudgetType::OneTime, Some(end)) => {
            let days = (end - budget.start_date).num_days().max(0) + 1;
            let amount = budget.amount.value();
            amount / days + i64::from(amount % days != 0)
        }
        _ => budget.amount.value(),
    };
    MinorUnits(minor)
        .to_micros(currency)
        .map_err(|e| AdapterError::validation(Platform::Google, e.to_string()))
}

// ─── Payload builders ───────────────────────────────────────────────────────

pub(crate) fn campaign_operations(customer: &str, input: &CampaignInput<'_>) -> AdapterResult<Vec<Value>> {
    let amount_micros = daily_budget_micros(input.budget, &input.campaign.currency)?;
    let budget_resource = resource(customer, "campaignBudgets", "-1");
    let (channel, bidding) = match &input.platform_campaign.extra {
        PlatformExtra::Google { advertising_channel_type, bidding_strategy } => {
            (advertising_channel_type.clone(), bidding_strategy.clone())
        }
        _ => (CHANNEL.to_string(), TRAFFIC.bid_type.to_string()),
    };

    let mut campaign = json!({
        "name": input.platform_campaign.name,
        "status": "PAUSED",
        "advertisingChannelType": channel,
        "campaignBudget": budget_resource,
        "startDate": input.budget.start_date.format("%Y-%m-%d").to_string(),
    });
    match bidding.as_str() {
        "MANUAL_CPM" => campaign["manualCpm"] = json!({}),
        "MANUAL_CPC" => campaign["manualCpc"] = json!({}),
        _ => campaign["targetSpend"] = json!({}),
    }
    if let Some(end) = input.budget.schedule_end() {
        campaign["endDate"] = json!(end.format("%Y-%m-%d").to_string());
    }

    Ok(vec![
        json!({ "campaignBudgetOperation": { "create": {
            "resourceName": budget_resource,
            "name": format!("{} budget", input.platform_campaign.name),
            "amountMicros": amount_micros.to_string(),
            "deliveryMethod": "STANDARD",
            "explicitlyShared": false,
        }}}),
        json!({ "campaignOperation": { "create": campaign } }),
    ])
}

/// Ad group plus its criteria. Locations are campaign criteria on Display;
/// ages, gender and keywords attach to the ad group.
pub(crate) fn ad_group_operations(customer: &str, external_campaign_id: &str, group: &AdGroup) -> Vec<Value> {
    let campaign_resource = resource(customer, "campaigns", external_campaign_id);
    let group_resource = resource(customer, "adGroups", "-2");
    let targeting = &group.targeting_config;

    let mut operations = vec![json!({ "adGroupOperation": { "create": {
        "resourceName": group_resource,
        "name": group.name,
        "campaign": campaign_resource,
        "status": "PAUSED",
        "type": "DISPLAY_STANDARD",
    }}})];

    for geo_target in string_list(targeting, "geoTargetConstants") {
        operations.push(json!({ "campaignCriterionOperation": { "create": {
            "campaign": campaign_resource,
            "location": { "geoTargetConstant": geo_target },
        }}}));
    }
    for age_range in string_list(targeting, "ageRanges") {
        operations.push(json!({ "adGroupCriterionOperation": { "create": {
            "adGroup": group_resource,
            "ageRange": { "type": age_range },
        }}}));
    }
    if let Some(gender) = targeting.get("gender").and_then(Value::as_str) {
        operations.push(json!({ "adGroupCriterionOperation": { "create": {
            "adGroup": group_resource,
            "gender": { "type": gender },
        }}}));
    }
    for keyword in string_list(targeting, "keywords") {
        operations.push(json!({ "adGroupCriterionOperation": { "create": {
            "adGroup": group_resource,
            "keyword": { "text": keyword, "matchType": "BROAD" },
        }}}));
    }
    operations
}

fn string_list<'a>(value: &'a Value, field: &str) -> impl Iterator<Item = &'a str> {
    value
        .get(field)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str))
        .into_iter()
        .flatten()
}

pub(crate) fn targeting_payload(targeting: &NormalizedTargeting) -> AdapterResult<Value> {
    let mut geo_targets = Vec::new();
    for code in &targeting.locations {
        match geo::google_geo_target(code) {
            Some(id) => geo_targets.push(format!("geoTargetConstants/{id}")),
            None => warn!(country = %code, "No Google geo target for country; dropped"),
        }
    }
    if geo_targets.is_empty() {
        return Err(AdapterError::validation(
            Platform::Google,
            "none of the requested locations can be targeted",
        ));
    }

    let mut payload = json!({
        "geoTargetConstants": geo_targets,
        "ageRanges": overlapping_buckets(AGE_RANGES, targeting.min_age, targeting.max_age),
        "keywords": targeting.keywords,
    });
    match targeting.gender {
        Gender::Male => payload["gender"] = json!("MALE"),
        Gender::Female => payload["gender"] = json!("FEMALE"),
        Gender::All => {}
    }
    Ok(payload)
}

pub(crate) fn ad_operation(
    customer: &str,
    external_ad_group_id: &str,
    ad: &Ad,
    business_name: &str,
    assets: &[UploadedAsset],
) -> AdapterResult<Value> {
    let image = assets
        .iter()
        .find(|a| a.kind == AssetKind::Image)
        .ok_or_else(|| AdapterError::validation(Platform::Google, "responsive display ads need an image asset"))?;
    let image_asset = json!([{ "asset": resource(customer, "assets", &image.platform_asset_id) }]);
    let creative = &ad.creative;

    Ok(json!({ "adGroupAdOperation": { "create": {
        "adGroup": resource(customer, "adGroups", external_ad_group_id),
        "status": "PAUSED",
        "ad": {
            "name": ad.name,
            "finalUrls": [creative.destination_url],
            "responsiveDisplayAd": {
                "headlines": [{ "text": creative.headline }],
                "longHeadline": { "text": creative.primary_text },
                "descriptions": [{ "text": creative.description }],
                "businessName": business_name,
                "marketingImages": image_asset,
                "squareMarketingImages": image_asset,
                "callToActionText": creative.call_to_action.as_str().replace('_', " "),
            },
        },
    }}}))
}

// ─── Response handling ──────────────────────────────────────────────────────

fn check_response(status: StatusCode, body: Value) -> AdapterResult<Value> {
    if status.is_success() && body.get("error").is_none() {
        return Ok(body);
    }
    match body.get("error") {
        Some(error) => Err(classify_google_error(status, error)),
        None => Err(crate::http::map_status_error(
            Platform::Google,
            status,
            body.to_string().as_bytes(),
        )),
    }
}

/// Google RPC status names are more precise than the HTTP status.
pub(crate) fn classify_google_error(status: StatusCode, error: &Value) -> AdapterError {
    let rpc_status = error.get("status").and_then(Value::as_str).unwrap_or_default();
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| body_preview(error.to_string().as_bytes()));
    let message = format!("{rpc_status}: {message}");

    match rpc_status {
        "UNAUTHENTICATED" | "PERMISSION_DENIED" => AdapterError::auth(Platform::Google, message),
        "DEADLINE_EXCEEDED" => AdapterError::timeout(Platform::Google, message),
        "RESOURCE_EXHAUSTED" | "UNAVAILABLE" | "INTERNAL" | "ABORTED" => {
            AdapterError::transient(Platform::Google, message)
        }
        "" => crate::http::map_status_error(Platform::Google, status, message.as_bytes()),
        _ => AdapterError::validation(Platform::Google, message),
    }
}

fn mutate_result_id(body: &Value, result_field: &str) -> AdapterResult<String> {
    body.get("mutateOperationResponses")
        .and_then(Value::as_array)
        .and_then(|responses| {
            responses
                .iter()
                .find_map(|r| r.get(result_field)?.get("resourceName")?.as_str())
        })
        .and_then(resource_id)
        .ok_or_else(|| {
            AdapterError::validation(Platform::Google, format!("mutate response missing {result_field}"))
        })
}

fn result_rows(body: &Value) -> impl Iterator<Item = &Value> {
    body.get("results")
        .and_then(Value::as_array)
        .map(|rows| rows.iter())
        .into_iter()
        .flatten()
}

/// `results[0].<entity>.id` of a search response.
pub(crate) fn first_entity_id(body: &Value, entity: &str) -> Option<String> {
    result_rows(body)
        .next()
        .and_then(|row| row.get(entity))
        .and_then(|e| id_string(e.get("id")))
}

/// `results[0].adGroupAd.ad.id`; ads nest one level deeper than other entities.
pub(crate) fn first_ad_id(body: &Value) -> Option<String> {
    result_rows(body)
        .next()
        .and_then(|row| row.get("adGroupAd")?.get("ad")?.get("id"))
        .and_then(|id| id_string(Some(id)))
}

pub(crate) fn parse_daily_metrics(campaigns: &Value, report: &Value) -> DailyMetrics {
    let valid: BTreeMap<String, String> = result_rows(campaigns)
        .filter_map(|row| row.get("campaign"))
        .filter(|c| {
            let status = c.get("status").and_then(Value::as_str).unwrap_or_default();
            !crate::is_excluded_status(status)
        })
        .filter_map(|c| {
            let id = id_string(c.get("id"))?;
            let name = c.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
            Some((id, name))
        })
        .collect();

    let rows = result_rows(report).filter_map(|row| {
        let metrics = row.get("metrics")?;
        let spend = lenient_f64(metrics.get("costMicros")) / 1_000_000.0;
        let value = lenient_f64(metrics.get("conversionsValue"));
        Some(MetricsRow {
            campaign_id: id_string(row.get("campaign")?.get("id"))?,
            device: row
                .get("segments")
                .and_then(|s| s.get("device"))
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            metrics: DeviceMetrics {
                spend,
                impressions: lenient_u64(metrics.get("impressions")),
                clicks: lenient_u64(metrics.get("clicks")),
                roas: if spend > 0.0 { value / spend } else { 0.0 },
            },
        })
    });

    assemble_metrics(valid, rows)
}

#[async_trait]
impl PlatformAdapter for GoogleAdapter {
    fn platform(&self) -> Platform {
        Platform::Google
    }

    fn map_objective(&self, objective: Objective) -> ObjectiveConfig {
        let (row, fallback) = objective_row(objective);
        row.to_config(fallback)
    }

    fn capabilities(&self) -> CapabilityFlags {
        CapabilityFlags {
            keyword_targeting: true,
            gender_targeting: true,
            lifetime_budget: false,
            video_assets: false,
            min_targetable_age: 18,
        }
    }

    fn campaign_extra(&self, _budget: &CampaignBudget) -> PlatformExtra {
        PlatformExtra::Google {
            advertising_channel_type: CHANNEL.to_string(),
            bidding_strategy: TRAFFIC.bid_type.to_string(),
        }
    }

    fn translate_targeting(&self, targeting: &NormalizedTargeting) -> AdapterResult<Value> {
        targeting_payload(targeting)
    }

    async fn create_campaign(&self, ctx: &RequestContext, input: CampaignInput<'_>) -> AdapterResult<String> {
        let customer = customer_id(&ctx.ad_account_id);
        let body = self.mutate(ctx, campaign_operations(&customer, &input)?).await?;
        let id = mutate_result_id(&body, "campaignResult")?;
        info!(platform = "GOOGLE", external_id = %id, request_id = %ctx.request_id, "Campaign created");
        Ok(id)
    }

    async fn create_ad_group(&self, ctx: &RequestContext, input: AdGroupInput<'_>) -> AdapterResult<String> {
        let external_campaign_id = input
            .platform_campaign
            .sync
            .external_id
            .as_deref()
            .ok_or_else(|| AdapterError::validation(Platform::Google, "campaign has not been created"))?;
        let customer = customer_id(&ctx.ad_account_id);
        let operations = ad_group_operations(&customer, external_campaign_id, input.ad_group);
        let body = self.mutate(ctx, operations).await?;
        mutate_result_id(&body, "adGroupResult")
    }

    async fn upload_asset(&self, ctx: &RequestContext, content: &AssetContent) -> AdapterResult<String> {
        if content.asset.kind == AssetKind::Video {
            return Err(AdapterError::validation(
                Platform::Google,
                "video assets must be linked from YouTube",
            ));
        }
        let operation = json!({ "assetOperation": { "create": {
            "name": content.asset.file_name,
            "type": "IMAGE",
            "imageAsset": { "data": BASE64.encode(&content.bytes) },
        }}});
        let body = self.mutate(ctx, vec![operation]).await?;
        mutate_result_id(&body, "assetResult")
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
            .ok_or_else(|| AdapterError::validation(Platform::Google, "ad group has not been created"))?;
        let customer = customer_id(&ctx.ad_account_id);
        let operation = ad_operation(&customer, external_ad_group_id, ad, &ad.creative.ad_name, assets)?;
        let body = self.mutate(ctx, vec![operation]).await?;
        mutate_result_id(&body, "adGroupAdResult")
    }

    async fn find_campaign_by_name(&self, ctx: &RequestContext, name: &str) -> AdapterResult<Option<String>> {
        let query = format!(
            "SELECT campaign.id, campaign.name FROM campaign \
             WHERE campaign.name = {} AND campaign.status != 'REMOVED'",
            gaql_quote(name)
        );
        self.find_one(ctx, query, "campaign").await
    }

    async fn find_ad_group_by_name(
        &self,
        ctx: &RequestContext,
        external_campaign_id: &str,
        name: &str,
    ) -> AdapterResult<Option<String>> {
        let query = format!(
            "SELECT ad_group.id, ad_group.name FROM ad_group \
             WHERE campaign.id = {} AND ad_group.name = {}",
            customer_id(external_campaign_id),
            gaql_quote(name)
        );
        self.find_one(ctx, query, "adGroup").await
    }

    async fn find_ad_by_name(
        &self,
        ctx: &RequestContext,
        external_ad_group_id: &str,
        name: &str,
    ) -> AdapterResult<Option<String>> {
        let query = format!(
            "SELECT ad_group_ad.ad.id, ad_group_ad.ad.name FROM ad_group_ad \
             WHERE ad_group.id = {} AND ad_group_ad.ad.name = {}",
            customer_id(external_ad_group_id),
            gaql_quote(name)
        );
        let body = self.search(ctx, query).await?;
        Ok(first_ad_id(&body))
    }

    async fn fetch_daily_metrics(&self, ctx: &RequestContext, date: NaiveDate) -> AdapterResult<DailyMetrics> {
        let day = date.format("%Y-%m-%d");
        let campaigns = self
            .search(
                ctx,
                "SELECT campaign.id, campaign.name, campaign.status FROM campaign \
                 WHERE campaign.status != 'REMOVED'"
                    .to_string(),
            )
            .await?;
        let report = self
            .search(
                ctx,
                format!(
                    "SELECT campaign.id, segments.device, metrics.cost_micros, metrics.impressions, \
                     metrics.clicks, metrics.conversions_value FROM campaign \
                     WHERE segments.date = '{day}'"
                ),
            )
            .await?;
        Ok(parse_daily_metrics(&campaigns, &report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adportal_core::SyncState;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use uuid::Uuid;

    fn adapter() -> GoogleAdapter {
        GoogleAdapter::new(&GoogleConfig::default()).unwrap()
    }

    fn budget(budget_type: BudgetType, amount: i64, end: Option<NaiveDate>) -> CampaignBudget {
        CampaignBudget {
            id: Uuid::new_v4(),
            campaign_id: Uuid::new_v4(),
            platform: Platform::Google,
            budget_type,
            amount: MinorUnits(amount),
            start_date: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            end_date: end,
            run_continuously: false,
        }
    }

    #[rstest]
    #[case::traffic(Objective::Traffic, "CLICKS", "TARGET_SPEND", false)]
    #[case::awareness(Objective::Awareness, "IMPRESSIONS", "MANUAL_CPM", false)]
    #[case::video(Objective::VideoView, "IMPRESSIONS", "MANUAL_CPM", true)]
    #[case::sales(Objective::Sales, "CLICKS", "TARGET_SPEND", true)]
    fn test_objective_table(
        #[case] objective: Objective,
        #[case] goal: &str,
        #[case] bid: &str,
        #[case] fallback: bool,
    ) {
        let config = adapter().map_objective(objective);
        assert_eq!(config.optimization_goal, goal);
        assert_eq!(config.bid_type, bid);
        assert_eq!(config.fallback, fallback);
    }

    #[test]
    fn test_daily_budget_micros() {
        let daily = budget(BudgetType::Daily, 2500, None);
        assert_eq!(daily_budget_micros(&daily, "USD").unwrap(), 25_000_000);

        // 100.00 over ten days
        let end = NaiveDate::from_ymd_opt(2025, 12, 10);
        let one_time = budget(BudgetType::OneTime, 10_000, end);
        assert_eq!(daily_budget_micros(&one_time, "USD").unwrap(), 10_000_000);

        let uneven = budget(BudgetType::OneTime, 1_000, NaiveDate::from_ymd_opt(2025, 12, 3));
        assert_eq!(daily_budget_micros(&uneven, "USD").unwrap(), 3_340_000);
    }

    #[test]
    fn test_budget_beyond_micros_range_is_a_validation_error() {
        // 1e15 USD
        let huge = budget(BudgetType::Daily, 100_000_000_000_000_000, None);
        let err = daily_budget_micros(&huge, "USD").unwrap_err();
        assert!(matches!(err, AdapterError::Validation { platform: Platform::Google, .. }));
    }

    #[test]
    fn test_search_lookups_read_first_row() {
        let campaigns = json!({ "results": [
            { "campaign": { "resourceName": "customers/1/campaigns/77", "id": "77", "name": "Spring" } },
            { "campaign": { "id": "78" } },
        ]});
        assert_eq!(first_entity_id(&campaigns, "campaign").as_deref(), Some("77"));
        assert_eq!(first_entity_id(&campaigns, "adGroup"), None);
        assert_eq!(first_entity_id(&json!({}), "campaign"), None);

        let ads = json!({ "results": [{ "adGroupAd": { "ad": { "id": 9001, "name": "Ad" } } }] });
        assert_eq!(first_ad_id(&ads).as_deref(), Some("9001"));
        assert_eq!(first_ad_id(&json!({ "results": [] })), None);
    }

    #[test]
    fn test_campaign_operations_are_atomic_pair() {
        let campaign = UnifiedCampaign {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            name: "Spring".into(),
            objective: Objective::Traffic,
            status: CampaignStatus::Paused,
            currency: "USD".into(),
            created_at: Utc::now(),
        };
        let budget = budget(BudgetType::Daily, 2500, None);
        let platform_campaign = PlatformCampaign {
            id: Uuid::new_v4(),
            campaign_id: campaign.id,
            integration_id: Uuid::new_v4(),
            platform: Platform::Google,
            name: "Spring".into(),
            status: CampaignStatus::Paused,
            extra: adapter().campaign_extra(&budget),
            capabilities: adapter().capabilities(),
            sync: SyncState::default(),
        };
        let input = CampaignInput { campaign: &campaign, budget: &budget, platform_campaign: &platform_campaign };
        let ops = campaign_operations("1234567890", &input).unwrap();
        assert_eq!(ops.len(), 2);
        let budget_op = &ops[0]["campaignBudgetOperation"]["create"];
        let campaign_op = &ops[1]["campaignOperation"]["create"];
        assert_eq!(budget_op["amountMicros"], "25000000");
        assert_eq!(budget_op["resourceName"], "customers/1234567890/campaignBudgets/-1");
        assert_eq!(campaign_op["campaignBudget"], budget_op["resourceName"]);
        assert_eq!(campaign_op["status"], "PAUSED");
        assert_eq!(campaign_op["advertisingChannelType"], "DISPLAY");
        assert_eq!(campaign_op["startDate"], "2025-12-01");
        assert!(campaign_op.get("targetSpend").is_some());
        assert!(campaign_op.get("endDate").is_none());
    }

    #[test]
    fn test_targeting_and_criteria() {
        let targeting = NormalizedTargeting {
            min_age: 30,
            max_age: 50,
            gender: Gender::Female,
            locations: vec!["US".into(), "GB".into()],
            keywords: vec!["running shoes".into()],
        };
        let payload = adapter().translate_targeting(&targeting).unwrap();
        assert_eq!(payload["geoTargetConstants"], json!(["geoTargetConstants/2840", "geoTargetConstants/2826"]));
        assert_eq!(payload["ageRanges"], json!(["AGE_RANGE_25_34", "AGE_RANGE_35_44", "AGE_RANGE_45_54"]));
        assert_eq!(payload["gender"], "FEMALE");

        let group = AdGroup {
            id: Uuid::new_v4(),
            platform_campaign_id: Uuid::new_v4(),
            name: "Spring group".into(),
            targeting_config: payload,
            normalized_targeting: targeting,
            bidding_config: adapter().map_objective(Objective::Traffic),
            start_time: Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap(),
            end_time: None,
            status: CampaignStatus::Paused,
            sync: SyncState::default(),
        };
        let ops = ad_group_operations("123", "555", &group);
        // group + 2 locations + 3 ages + gender + 1 keyword
        assert_eq!(ops.len(), 8);
        assert_eq!(ops[1]["campaignCriterionOperation"]["create"]["campaign"], "customers/123/campaigns/555");
        assert_eq!(ops[7]["adGroupCriterionOperation"]["create"]["keyword"]["matchType"], "BROAD");
    }

    #[rstest]
    #[case::unauthenticated("UNAUTHENTICATED", "auth", false)]
    #[case::quota("RESOURCE_EXHAUSTED", "transient", false)]
    #[case::deadline("DEADLINE_EXCEEDED", "transient", true)]
    #[case::invalid("INVALID_ARGUMENT", "validation", false)]
    fn test_error_classification(#[case] rpc: &str, #[case] kind: &str, #[case] timed_out: bool) {
        let error = json!({ "code": 400, "message": "boom", "status": rpc });
        let classified = classify_google_error(StatusCode::BAD_REQUEST, &error);
        assert_eq!(classified.kind(), kind);
        assert_eq!(classified.is_timeout(), timed_out);
    }

    #[test]
    fn test_resource_ids() {
        assert_eq!(resource_id("customers/1/campaigns/99").as_deref(), Some("99"));
        assert_eq!(resource_id("customers/1/adGroupAds/5~77").as_deref(), Some("77"));
        assert_eq!(customer_id("123-456-7890"), "1234567890");
        assert_eq!(gaql_quote("Bob's sale"), "'Bob\\'s sale'");
    }

    #[test]
    fn test_daily_metrics_convert_micros() {
        let campaigns = json!({ "results": [
            { "campaign": { "id": "1", "name": "Live", "status": "ENABLED" } },
            { "campaign": { "id": "2", "name": "Paused", "status": "PAUSED" } },
            { "campaign": { "id": "3", "name": "Gone", "status": "REMOVED" } },
        ]});
        let report = json!({ "results": [
            { "campaign": { "id": "1" }, "segments": { "device": "MOBILE" },
              "metrics": { "costMicros": "10000000", "impressions": "200", "clicks": "10", "conversionsValue": 30.0 } },
            { "campaign": { "id": "3" }, "segments": { "device": "DESKTOP" },
              "metrics": { "costMicros": "5000000", "impressions": "10", "clicks": "1" } },
        ]});
        let metrics = parse_daily_metrics(&campaigns, &report);
        assert_eq!(metrics.len(), 2);
        let live = &metrics["1"];
        assert!((live.spend - 10.0).abs() < 1e-9);
        assert!((live.ctr - 5.0).abs() < 1e-9);
        assert!((live.roas - 3.0).abs() < 1e-9);
        assert!(live.device_breakdown.contains_key("mobile"));
        assert_eq!(metrics["2"].impressions, 0);
    }
}
