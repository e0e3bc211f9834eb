//! Sync State Ledger: the campaign tree rows, their remote-world bookkeeping
//! and the organization asset library.

pub mod assets;
pub mod error;
pub mod locks;
pub mod stage;
pub mod store;

pub use assets::{AssetLibrary, NewAsset};
pub use error::{LedgerError, LedgerResult};
pub use locks::{RowGuard, RowLocks, SyncTarget};
pub use stage::PlatformSnapshot;
pub use store::{LedgerStore, NewBudget, NewCampaign};
