//! Transport plumbing shared by the HTTP adapters: status and transport error
//! mapping, JSON decoding and the lenient number readers platform payloads need.

use crate::error::{AdapterError, AdapterResult};
use adportal_core::Platform;
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::debug;

/// Upper bound on pages fetched for one listing.
pub(crate) const MAX_PAGES: usize = 50;

/// Send a request and hand back the status and decoded body. Non-JSON bodies
/// on success are reported as validation errors.
pub(crate) async fn send_json(
    platform: Platform,
    request: RequestBuilder,
) -> AdapterResult<(StatusCode, Value)> {
    let response = request
        .send()
        .await
        .map_err(|e| map_transport_error(platform, e))?;
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| map_transport_error(platform, e))?;
    debug!(platform = %platform, status = status.as_u16(), bytes = body.len(), "Platform response");

    match serde_json::from_slice::<Value>(&body) {
        Ok(value) => Ok((status, value)),
        Err(_) if !status.is_success() => Err(map_status_error(platform, status, &body)),
        Err(e) => Err(AdapterError::validation(
            platform,
            format!("undecodable response ({e}): {}", body_preview(&body)),
        )),
    }
}

pub(crate) fn map_transport_error(platform: Platform, error: reqwest::Error) -> AdapterError {
    if error.is_timeout() {
        AdapterError::timeout(platform, error.to_string())
    } else {
        AdapterError::transient(platform, error.to_string())
    }
}

pub(crate) fn map_status_error(platform: Platform, status: StatusCode, body: &[u8]) -> AdapterError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), preview)
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AdapterError::auth(platform, message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            AdapterError::timeout(platform, message)
        }
        StatusCode::TOO_MANY_REQUESTS => AdapterError::transient(platform, message),
        _ if status.is_client_error() => AdapterError::validation(platform, message),
        _ => AdapterError::transient(platform, message),
    }
}

pub(crate) fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

/// Numbers arrive as JSON numbers or as decimal strings depending on the API.
pub(crate) fn lenient_f64(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

pub(crate) fn lenient_u64(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f.max(0.0) as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Ids may be numeric or string; always hand them on as strings.
pub(crate) fn id_string(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Campaign statuses that are left out of analytics across all platforms.
pub fn is_excluded_status(status: &str) -> bool {
    matches!(
        status.trim().to_ascii_uppercase().as_str(),
        "DELETE" | "DELETED" | "DRAFT" | "CAMPAIGN_STATUS_DELETE" | "REMOVED"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case::unauthorized(StatusCode::UNAUTHORIZED, "auth", false)]
    #[case::forbidden(StatusCode::FORBIDDEN, "auth", false)]
    #[case::rate_limited(StatusCode::TOO_MANY_REQUESTS, "transient", false)]
    #[case::request_timeout(StatusCode::REQUEST_TIMEOUT, "transient", true)]
    #[case::gateway_timeout(StatusCode::GATEWAY_TIMEOUT, "transient", true)]
    #[case::bad_request(StatusCode::BAD_REQUEST, "validation", false)]
    #[case::server_error(StatusCode::INTERNAL_SERVER_ERROR, "transient", false)]
    fn test_status_mapping(#[case] status: StatusCode, #[case] kind: &str, #[case] timed_out: bool) {
        let error = map_status_error(Platform::Meta, status, b"{\"error\":\"nope\"}");
        assert_eq!(error.kind(), kind);
        assert_eq!(error.is_timeout(), timed_out);
    }

    #[test]
    fn test_body_preview_truncates() {
        let body = "x".repeat(400);
        let preview = body_preview(body.as_bytes());
        assert_eq!(preview.len(), 163);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn test_lenient_readers() {
        let row = json!({"spend": "12.50", "impressions": "100", "clicks": 7, "id": 1800});
        assert_eq!(lenient_f64(row.get("spend")), 12.5);
        assert_eq!(lenient_u64(row.get("impressions")), 100);
        assert_eq!(lenient_u64(row.get("clicks")), 7);
        assert_eq!(lenient_u64(row.get("missing")), 0);
        assert_eq!(id_string(row.get("id")).as_deref(), Some("1800"));
    }

    #[rstest]
    #[case("DELETE", true)]
    #[case("deleted", true)]
    #[case("DRAFT", true)]
    #[case("CAMPAIGN_STATUS_DELETE", true)]
    #[case("REMOVED", true)]
    #[case("ACTIVE", false)]
    #[case("", false)]
    fn test_excluded_statuses(#[case] status: &str, #[case] excluded: bool) {
        assert_eq!(is_excluded_status(status), excluded);
    }
}
