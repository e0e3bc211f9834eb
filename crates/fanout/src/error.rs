use adportal_core::Platform;
use adportal_integrations::RegistryError;
use adportal_ledger::LedgerError;
use thiserror::Error;
use uuid::Uuid;

pub type FanoutResult<T> = Result<T, FanoutError>;

/// Errors that abort a whole create or re-sync. Per-platform failures are
/// not errors at this level; they are recorded on the ledger rows.
#[derive(Error, Debug, Clone)]
pub enum FanoutError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("no active integration for: {}", join_platforms(.0))]
    MissingIntegrations(Vec<Platform>),

    #[error("no adapter configured for {0}")]
    AdapterUnavailable(Platform),

    #[error("campaign {0} not found")]
    CampaignNotFound(Uuid),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("local persistence failed: {0}")]
    LocalPersistence(#[from] LedgerError),
}

fn join_platforms(platforms: &[Platform]) -> String {
    platforms
        .iter()
        .map(Platform::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_integrations_names_platforms() {
        let err = FanoutError::MissingIntegrations(vec![Platform::Google, Platform::Tiktok]);
        assert_eq!(err.to_string(), "no active integration for: GOOGLE, TIKTOK");
    }
}
