use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppointmentError;

/// Per-practitioner allocation locks.
///
/// Holders run the generate-verify-commit sequence for one practitioner at a
/// time. Waiters give up after `timeout` with a retriable `LockTimeout`.
/// Different practitioners never contend, and no caller holds two locks.
pub struct AllocationCoordinator {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
    timeout: Duration,
}

/// Held for the duration of one allocation; dropping it releases the lock.
#[derive(Debug)]
pub struct AllocationGuard {
    practitioner_id: Uuid,
    _guard: OwnedMutexGuard<()>,
}

impl AllocationGuard {
    pub fn practitioner_id(&self) -> Uuid {
        self.practitioner_id
    }
}

impl AllocationCoordinator {
    pub fn new(timeout: Duration) -> Self {
        Self { locks: DashMap::new(), timeout }
    }

    pub async fn acquire(&self, practitioner_id: Uuid) -> Result<AllocationGuard, AppointmentError> {
        // Clone the Arc out so the DashMap shard lock is not held across the await.
        let lock = self
            .locks
            .entry(practitioner_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        match tokio::time::timeout(self.timeout, lock.lock_owned()).await {
            Ok(guard) => {
                debug!("Acquired allocation lock for practitioner {}", practitioner_id);
                Ok(AllocationGuard { practitioner_id, _guard: guard })
            }
            Err(_) => {
                let waited_ms = self.timeout.as_millis() as u64;
                warn!("Allocation lock for practitioner {} timed out after {}ms", practitioner_id, waited_ms);
                Err(AppointmentError::LockTimeout { practitioner_id, waited_ms })
            }
        }
    }

    /// Drops lock entries nobody is holding or waiting on.
    pub fn prune(&self) {
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    pub fn tracked(&self) -> usize {
        self.locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn second_waiter_times_out_while_first_holds() {
        let coordinator = AllocationCoordinator::new(Duration::from_millis(50));
        let practitioner = Uuid::new_v4();

        let held = coordinator.acquire(practitioner).await.unwrap();
        assert_matches!(
            coordinator.acquire(practitioner).await,
            Err(AppointmentError::LockTimeout { waited_ms: 50, .. })
        );

        drop(held);
        assert!(coordinator.acquire(practitioner).await.is_ok());
    }

    #[tokio::test]
    async fn different_practitioners_do_not_contend() {
        let coordinator = AllocationCoordinator::new(Duration::from_millis(50));

        let _a = coordinator.acquire(Uuid::new_v4()).await.unwrap();
        let _b = coordinator.acquire(Uuid::new_v4()).await.unwrap();
        assert_eq!(coordinator.tracked(), 2);
    }

    #[tokio::test]
    async fn prune_keeps_held_locks() {
        let coordinator = AllocationCoordinator::new(Duration::from_millis(50));
        let held = coordinator.acquire(Uuid::new_v4()).await.unwrap();
        drop(coordinator.acquire(Uuid::new_v4()).await.unwrap());

        coordinator.prune();
        assert_eq!(coordinator.tracked(), 1);
        assert!(coordinator.locks.contains_key(&held.practitioner_id()));
    }

    #[tokio::test]
    async fn cancelled_waiter_leaves_lock_usable() {
        let coordinator = Arc::new(AllocationCoordinator::new(Duration::from_secs(5)));
        let practitioner = Uuid::new_v4();
        let held = coordinator.acquire(practitioner).await.unwrap();

        let waiter = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.acquire(practitioner).await.map(|_| ()) })
        };
        tokio::task::yield_now().await;
        waiter.abort();
        let _ = waiter.await;

        drop(held);
        assert!(coordinator.acquire(practitioner).await.is_ok());
    }
}
