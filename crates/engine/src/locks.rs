//! Per-project exclusive access.
//!
//! Every mutation of a project's ledger runs while holding that project's
//! lock. Locks are created on first use and dropped again once nobody holds
//! or waits for them, so ids that never turn into a project leave nothing
//! behind. Distinct projects never contend.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

type LockMap = HashMap<Uuid, Arc<AsyncMutex<()>>>;

#[derive(Debug, Default)]
pub(crate) struct ProjectLocks {
    inner: Mutex<LockMap>,
}

/// Exclusive access to one project, released on drop.
#[derive(Debug)]
pub(crate) struct ProjectGuard<'a> {
    locks: &'a ProjectLocks,
    project_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ProjectLocks {
    fn map(&self) -> MutexGuard<'_, LockMap> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Waits for exclusive access to `project_id`.
    pub(crate) async fn acquire(&self, project_id: Uuid) -> ProjectGuard<'_> {
        let lock = self
            .map()
            .entry(project_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        ProjectGuard {
            locks: self,
            project_id,
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Number of projects with a live lock entry.
    pub(crate) fn tracked(&self) -> usize {
        self.map().len()
    }
}

impl Drop for ProjectGuard<'_> {
    fn drop(&mut self) {
        let mut map = self.locks.map();
        // Release first so the map holds the last reference when nobody waits.
        self.guard.take();
        if map
            .get(&self.project_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&self.project_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_project_is_exclusive() {
        let locks = ProjectLocks::default();
        let project_id = Uuid::new_v4();

        let guard = locks.acquire(project_id).await;
        let second = tokio::time::timeout(Duration::from_millis(20), locks.acquire(project_id));
        assert!(second.await.is_err());

        drop(guard);
        let _guard = locks.acquire(project_id).await;
    }

    #[tokio::test]
    async fn distinct_projects_do_not_contend() {
        let locks = ProjectLocks::default();
        let _a = locks.acquire(Uuid::new_v4()).await;
        let b = tokio::time::timeout(Duration::from_millis(20), locks.acquire(Uuid::new_v4()));
        assert!(b.await.is_ok());
    }

    #[tokio::test]
    async fn entries_are_dropped_with_the_last_guard() {
        let locks = ProjectLocks::default();
        for _ in 0..100 {
            let _guard = locks.acquire(Uuid::new_v4()).await;
        }
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn waiting_acquirer_keeps_the_entry() {
        let locks = Arc::new(ProjectLocks::default());
        let project_id = Uuid::new_v4();

        let first = locks.acquire(project_id).await;
        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(project_id).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(first);
        assert!(locks.tracked() <= 1);
        waiter.await.unwrap();
        assert_eq!(locks.tracked(), 0);
    }
}
