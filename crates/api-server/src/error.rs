//! Mapping from core errors to HTTP responses.

use adportal_analytics::IngestError;
use adportal_fanout::FanoutError;
use adportal_integrations::RegistryError;
use adportal_ledger::LedgerError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_request", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        metrics::counter!("api.errors", "code" => self.code).increment(1);
        let body = ErrorResponse {
            error: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<FanoutError> for ApiError {
    fn from(e: FanoutError) -> Self {
        let message = e.to_string();
        match e {
            FanoutError::InvalidRequest(_) => Self::bad_request(message),
            FanoutError::MissingIntegrations(_) => Self::new(StatusCode::BAD_REQUEST, "missing_integrations", message),
            FanoutError::AdapterUnavailable(_) => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "adapter_unavailable", message)
            }
            FanoutError::CampaignNotFound(_) => Self::new(StatusCode::NOT_FOUND, "campaign_not_found", message),
            FanoutError::Registry(inner) => inner.into(),
            FanoutError::LocalPersistence(inner) => inner.into(),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        let message = e.to_string();
        match e {
            LedgerError::DuplicateCampaignName(_) => Self::new(StatusCode::CONFLICT, "duplicate_campaign_name", message),
            LedgerError::InvalidBudget(_) | LedgerError::ForeignAsset { .. } => Self::bad_request(message),
            LedgerError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, "not_found", message),
            LedgerError::AssetLocked(_) | LedgerError::InvalidAssetTransition { .. } => {
                Self::new(StatusCode::CONFLICT, "asset_conflict", message)
            }
            LedgerError::ExternalIdConflict(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "ledger_conflict", message)
            }
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        let code = match &e {
            RegistryError::IntegrationNotFound { .. } => {
                return Self::new(StatusCode::NOT_FOUND, "integration_not_found", e.to_string())
            }
            RegistryError::IntegrationInactive { .. } => "integration_inactive",
            RegistryError::AccountNotSelected { .. } => "account_not_selected",
            RegistryError::CredentialExpired { .. } => "credential_expired",
        };
        Self::new(StatusCode::CONFLICT, code, e.to_string())
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::Registry(inner) => inner.into(),
            IngestError::AdapterUnavailable(_) => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "adapter_unavailable", e.to_string())
            }
            IngestError::Adapter(_) => Self::new(StatusCode::BAD_GATEWAY, "platform_error", e.to_string()),
        }
    }
}
