//! Organization asset library: content-hash dedupe, lifecycle and locking,
//! plus the per-integration upload join rows.

use crate::error::{LedgerError, LedgerResult};
use adportal_core::models::{AdAsset, AssetContent, PlatformAsset};
use adportal_core::types::{AssetKind, AssetStatus};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// A file handed in with a create-ad request.
#[derive(Debug, Clone)]
pub struct NewAsset {
    pub organization_id: Uuid,
    pub file_name: String,
    pub kind: AssetKind,
    pub storage_url: String,
    pub bytes: Vec<u8>,
}

pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[derive(Default)]
pub struct AssetLibrary {
    assets: DashMap<Uuid, AdAsset>,
    by_hash: DashMap<(Uuid, String), Uuid>,
    contents: DashMap<Uuid, Arc<Vec<u8>>>,
    platform_assets: DashMap<(Uuid, Uuid), PlatformAsset>,
}

impl AssetLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file for an organization. Identical bytes resolve to the
    /// existing asset instead of a second row.
    pub fn register(&self, new: NewAsset) -> LedgerResult<AdAsset> {
        let hash = content_hash(&new.bytes);
        let key = (new.organization_id, hash.clone());

        let asset_id = match self.by_hash.entry(key) {
            Entry::Occupied(existing) => {
                let id = *existing.get();
                debug!(asset_id = %id, hash = %hash, "Asset deduplicated by content hash");
                return self.get(id);
            }
            Entry::Vacant(slot) => {
                let asset = AdAsset {
                    id: Uuid::new_v4(),
                    organization_id: new.organization_id,
                    kind: new.kind,
                    file_name: new.file_name,
                    content_hash: hash,
                    storage_url: new.storage_url,
                    size_bytes: new.bytes.len() as u64,
                    status: AssetStatus::Draft,
                    locked: false,
                    created_at: Utc::now(),
                };
                let id = asset.id;
                self.contents.insert(id, Arc::new(new.bytes));
                self.assets.insert(id, asset);
                slot.insert(id);
                id
            }
        };

        let asset = self.transition(asset_id, AssetStatus::Uploaded)?;
        info!(asset_id = %asset.id, organization_id = %asset.organization_id, size = asset.size_bytes, "Asset registered");
        Ok(asset)
    }

    pub fn get(&self, id: Uuid) -> LedgerResult<AdAsset> {
        self.assets
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or_else(|| LedgerError::not_found("asset", id))
    }

    pub fn content(&self, id: Uuid) -> LedgerResult<AssetContent> {
        let asset = self.get(id)?;
        let bytes = self
            .contents
            .get(&id)
            .map(|r| r.value().as_ref().clone())
            .ok_or_else(|| LedgerError::not_found("asset content", id))?;
        Ok(AssetContent { asset, bytes })
    }

    pub fn list_for_organization(&self, organization_id: Uuid) -> Vec<AdAsset> {
        let mut assets: Vec<AdAsset> = self
            .assets
            .iter()
            .filter(|r| r.value().organization_id == organization_id)
            .map(|r| r.value().clone())
            .collect();
        assets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        assets
    }

    /// Ensure every asset belongs to the organization before it is attached to an ad.
    pub fn check_owner(&self, organization_id: Uuid, asset_ids: &[Uuid]) -> LedgerResult<()> {
        for id in asset_ids {
            let asset = self.get(*id)?;
            if asset.organization_id != organization_id {
                return Err(LedgerError::ForeignAsset {
                    asset_id: *id,
                    organization_id,
                });
            }
        }
        Ok(())
    }

    /// Move an asset to IN_USE and lock it once a live ad references it.
    pub fn mark_in_use(&self, id: Uuid) -> LedgerResult<AdAsset> {
        let mut asset = self.transition(id, AssetStatus::InUse)?;
        if let Some(mut row) = self.assets.get_mut(&id) {
            row.locked = true;
            asset = row.clone();
        }
        Ok(asset)
    }

    pub fn rename(&self, id: Uuid, file_name: impl Into<String>) -> LedgerResult<AdAsset> {
        let mut row = self
            .assets
            .get_mut(&id)
            .ok_or_else(|| LedgerError::not_found("asset", id))?;
        if row.locked {
            return Err(LedgerError::AssetLocked(id));
        }
        row.file_name = file_name.into();
        Ok(row.clone())
    }

    pub fn archive(&self, id: Uuid) -> LedgerResult<AdAsset> {
        if self.get(id)?.locked {
            return Err(LedgerError::AssetLocked(id));
        }
        self.transition(id, AssetStatus::Archived)
    }

    fn transition(&self, id: Uuid, to: AssetStatus) -> LedgerResult<AdAsset> {
        let mut row = self
            .assets
            .get_mut(&id)
            .ok_or_else(|| LedgerError::not_found("asset", id))?;
        if row.status == to {
            return Ok(row.clone());
        }
        if !row.status.can_transition_to(to) {
            return Err(LedgerError::InvalidAssetTransition { from: row.status, to });
        }
        row.status = to;
        Ok(row.clone())
    }

    // ─── Platform uploads ───────────────────────────────────────────────────

    pub fn platform_asset(&self, asset_id: Uuid, integration_id: Uuid) -> Option<PlatformAsset> {
        self.platform_assets
            .get(&(asset_id, integration_id))
            .map(|r| r.value().clone())
    }

    /// Record an upload. If another caller recorded one first, theirs is kept
    /// and returned.
    pub fn record_platform_asset(&self, upload: PlatformAsset) -> PlatformAsset {
        self.platform_assets
            .entry((upload.asset_id, upload.integration_id))
            .or_insert(upload)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adportal_core::types::Platform;

    fn new_asset(org: Uuid, bytes: &[u8]) -> NewAsset {
        NewAsset {
            organization_id: org,
            file_name: "hero.png".into(),
            kind: AssetKind::Image,
            storage_url: "https://cdn.example.com/hero.png".into(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn test_same_bytes_same_org_dedupes() {
        let library = AssetLibrary::new();
        let org = Uuid::new_v4();
        let first = library.register(new_asset(org, b"png-bytes")).unwrap();
        let second = library.register(new_asset(org, b"png-bytes")).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.status, AssetStatus::Uploaded);
        assert_eq!(library.list_for_organization(org).len(), 1);
    }

    #[test]
    fn test_same_bytes_other_org_is_separate() {
        let library = AssetLibrary::new();
        let a = library.register(new_asset(Uuid::new_v4(), b"x")).unwrap();
        let b = library.register(new_asset(Uuid::new_v4(), b"x")).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.content_hash, b.content_hash);
    }

    #[test]
    fn test_locked_asset_rejects_mutation() {
        let library = AssetLibrary::new();
        let asset = library.register(new_asset(Uuid::new_v4(), b"x")).unwrap();
        let in_use = library.mark_in_use(asset.id).unwrap();
        assert!(in_use.locked);
        assert_eq!(in_use.status, AssetStatus::InUse);
        assert_eq!(library.archive(asset.id).unwrap_err(), LedgerError::AssetLocked(asset.id));
        assert!(matches!(library.rename(asset.id, "new.png"), Err(LedgerError::AssetLocked(_))));
    }

    #[test]
    fn test_archived_asset_cannot_be_used() {
        let library = AssetLibrary::new();
        let asset = library.register(new_asset(Uuid::new_v4(), b"x")).unwrap();
        library.archive(asset.id).unwrap();
        assert!(matches!(
            library.mark_in_use(asset.id),
            Err(LedgerError::InvalidAssetTransition { .. })
        ));
    }

    #[test]
    fn test_first_platform_upload_wins() {
        let library = AssetLibrary::new();
        let asset_id = Uuid::new_v4();
        let integration_id = Uuid::new_v4();
        let upload = |id: &str| PlatformAsset {
            asset_id,
            integration_id,
            platform: Platform::Meta,
            platform_asset_id: id.into(),
            uploaded_at: Utc::now(),
        };
        library.record_platform_asset(upload("hash-1"));
        let kept = library.record_platform_asset(upload("hash-2"));
        assert_eq!(kept.platform_asset_id, "hash-1");
        assert!(library.platform_asset(asset_id, integration_id).is_some());
    }

    #[test]
    fn test_check_owner() {
        let library = AssetLibrary::new();
        let org = Uuid::new_v4();
        let asset = library.register(new_asset(org, b"x")).unwrap();
        assert!(library.check_owner(org, &[asset.id]).is_ok());
        assert!(matches!(
            library.check_owner(Uuid::new_v4(), &[asset.id]),
            Err(LedgerError::ForeignAsset { .. })
        ));
    }
}
