use adportal_core::types::AssetStatus;
use adportal_core::ExternalIdConflict;
use thiserror::Error;
use uuid::Uuid;

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("campaign name '{0}' already exists in this organization")]
    DuplicateCampaignName(String),

    #[error("invalid budget: {0}")]
    InvalidBudget(String),

    #[error(transparent)]
    ExternalIdConflict(#[from] ExternalIdConflict),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Uuid },

    #[error("asset {0} is locked by a live ad")]
    AssetLocked(Uuid),

    #[error("asset cannot move from {from:?} to {to:?}")]
    InvalidAssetTransition { from: AssetStatus, to: AssetStatus },

    #[error("asset {asset_id} does not belong to organization {organization_id}")]
    ForeignAsset { asset_id: Uuid, organization_id: Uuid },
}

impl LedgerError {
    pub(crate) fn not_found(kind: &'static str, id: Uuid) -> Self {
        LedgerError::NotFound { kind, id }
    }
}
