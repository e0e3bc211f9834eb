use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Remote-world bookkeeping carried by every platform-side row.
///
/// `external_id` is a permanent claim that the remote object exists: once set
/// it is never cleared or replaced. `error_message` always holds the most
/// recent failure and is cleared by the next success.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncState {
    pub external_id: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("external id already set to '{existing}', refusing '{attempted}'")]
pub struct ExternalIdConflict {
    pub existing: String,
    pub attempted: String,
}

impl SyncState {
    pub fn is_created(&self) -> bool {
        self.external_id.is_some()
    }

    pub fn has_error(&self) -> bool {
        self.error_message.is_some()
    }

    /// Record a successful remote create. Re-recording the same id is a no-op
    /// apart from the timestamp.
    pub fn record_success(
        &mut self,
        external_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), ExternalIdConflict> {
        match &self.external_id {
            Some(existing) if existing != external_id => {
                return Err(ExternalIdConflict {
                    existing: existing.clone(),
                    attempted: external_id.to_string(),
                })
            }
            Some(_) => {}
            None => self.external_id = Some(external_id.to_string()),
        }
        self.error_message = None;
        self.last_synced_at = Some(at);
        Ok(())
    }

    /// Mark the object as synced without a new id (skip path).
    pub fn record_verified(&mut self, at: DateTime<Utc>) {
        self.error_message = None;
        self.last_synced_at = Some(at);
    }

    pub fn record_error(&mut self, message: impl Into<String>, at: DateTime<Utc>) {
        self.error_message = Some(message.into());
        self.last_synced_at = Some(at);
    }
}
