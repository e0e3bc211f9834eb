pub mod config;
pub mod error;
pub mod models;
pub mod money;
pub mod performance;
pub mod sync;
pub mod types;

pub use config::AppConfig;
pub use error::{AdPortalError, AdPortalResult, MoneyError};
pub use money::MinorUnits;
pub use sync::{ExternalIdConflict, SyncState};
pub use types::{Objective, Platform};
