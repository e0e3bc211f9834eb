use adportal_core::Platform;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no {platform} integration for organization {organization_id}")]
    IntegrationNotFound { organization_id: Uuid, platform: Platform },

    #[error("{platform} integration for organization {organization_id} is inactive")]
    IntegrationInactive { organization_id: Uuid, platform: Platform },

    #[error("{platform} integration for organization {organization_id} has no ad account selected")]
    AccountNotSelected { organization_id: Uuid, platform: Platform },

    #[error("{platform} credential expired: {reason}")]
    CredentialExpired { platform: Platform, reason: String },
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Failure of a token refresh call. Always surfaced as `CredentialExpired`.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("token endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("token endpoint rejected refresh ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("malformed token response: {0}")]
    Malformed(String),
}
