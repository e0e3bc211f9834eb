use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// A row whose remote object is created by the fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncTarget {
    PlatformCampaign(Uuid),
    AdGroup(Uuid),
    Ad(Uuid),
}

impl SyncTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            SyncTarget::PlatformCampaign(_) => "platform campaign",
            SyncTarget::AdGroup(_) => "ad group",
            SyncTarget::Ad(_) => "ad",
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            SyncTarget::PlatformCampaign(id) | SyncTarget::AdGroup(id) | SyncTarget::Ad(id) => *id,
        }
    }
}

/// Row-level async locks guarding check-then-create on a single row.
///
/// Holders keep the guard across the remote call, so a second caller for the
/// same row waits and then observes the external id written by the first.
#[derive(Default)]
pub struct RowLocks {
    locks: DashMap<SyncTarget, Arc<Mutex<()>>>,
}

impl RowLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, target: SyncTarget) -> RowGuard<'_> {
        let lock = self
            .locks
            .entry(target)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        RowGuard {
            guard: Some(lock.lock_owned().await),
            locks: &self.locks,
            target,
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Held for the duration of a row's check-then-create. The row's entry is
/// dropped from the lock table once nobody holds or waits on it.
pub struct RowGuard<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    locks: &'a DashMap<SyncTarget, Arc<Mutex<()>>>,
    target: SyncTarget,
}

impl Drop for RowGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.remove_if(&self.target, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_row_is_serialized() {
        let locks = Arc::new(RowLocks::new());
        let target = SyncTarget::AdGroup(Uuid::new_v4());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let locks = locks.clone();
            let inside = inside.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(target).await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_released_rows_leave_no_entry() {
        let locks = RowLocks::new();
        let target = SyncTarget::Ad(Uuid::new_v4());
        {
            let _guard = locks.acquire(target).await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());

        for _ in 0..10 {
            drop(locks.acquire(SyncTarget::AdGroup(Uuid::new_v4())).await);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_entry_survives_while_a_waiter_is_queued() {
        let locks = Arc::new(RowLocks::new());
        let target = SyncTarget::PlatformCampaign(Uuid::new_v4());
        let first = locks.acquire(target).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(target).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(first);
        assert_eq!(locks.len(), 1);

        waiter.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_different_rows_do_not_block() {
        let locks = RowLocks::new();
        let _a = locks.acquire(SyncTarget::Ad(Uuid::new_v4())).await;
        let b = tokio::time::timeout(
            Duration::from_millis(50),
            locks.acquire(SyncTarget::Ad(Uuid::new_v4())),
        )
        .await;
        assert!(b.is_ok());
    }
}
