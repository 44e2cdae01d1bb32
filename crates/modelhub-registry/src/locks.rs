//! Per-branch serialization of version sequencing

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// In-process mutual exclusion keyed by branch id
///
/// Guards the read-latest-label / insert-version window. Hold a guard only
/// around the metadata transaction, never across an upload.
#[derive(Debug, Default)]
pub struct BranchLocks {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl BranchLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `branch_id`
    pub async fn acquire(&self, branch_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Entries only referenced by the map are idle
            locks.retain(|id, lock| *id == branch_id || Arc::strong_count(lock) > 1);
            locks.entry(branch_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of branches with a live lock entry
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_branch_is_exclusive() {
        let locks = Arc::new(BranchLocks::new());
        let branch = Uuid::new_v4();

        let guard = locks.acquire(branch).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(branch).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_other_branches_are_independent() {
        let locks = BranchLocks::new();
        let _a = locks.acquire(Uuid::new_v4()).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(Uuid::new_v4())).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_idle_entries_are_pruned() {
        let locks = BranchLocks::new();
        for _ in 0..5 {
            let _guard = locks.acquire(Uuid::new_v4()).await;
        }
        let _last = locks.acquire(Uuid::new_v4()).await;
        assert_eq!(locks.len().await, 1);
    }
}
