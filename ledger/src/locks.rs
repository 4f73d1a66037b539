//! Per-account row locks.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use teller_common::{AccountId, Result, TellerError};

/// Guard holding one account's exclusive row lock. The lock is
/// released when the guard drops, on every exit path.
pub type RowGuard = OwnedMutexGuard<()>;

/// Table of exclusive per-account locks.
///
/// A mutex is created lazily the first time an account is touched and
/// lives for the lifetime of the table. Waiters queue fairly on the
/// underlying tokio mutex.
#[derive(Debug, Default)]
pub struct RowLocks {
    locks: DashMap<AccountId, Arc<Mutex<()>>>,
}

impl RowLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    fn mutex_for(&self, id: AccountId) -> Arc<Mutex<()>> {
        self.locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Acquire the exclusive lock for one account, waiting at most
    /// `wait` if a bound is given.
    pub async fn lock(&self, id: AccountId, wait: Option<Duration>) -> Result<RowGuard> {
        let mutex = self.mutex_for(id);
        match wait {
            None => Ok(mutex.lock_owned().await),
            Some(bound) => tokio::time::timeout(bound, mutex.lock_owned())
                .await
                .map_err(|_| TellerError::LockTimeout(id)),
        }
    }

    /// Acquire both locks in ascending account-id order, independent
    /// of argument order, so opposite-direction transfers between the
    /// same pair can never form a lock cycle.
    ///
    /// Guards come back in argument order: `(guard_a, guard_b)`.
    pub async fn lock_pair(
        &self,
        a: AccountId,
        b: AccountId,
        wait: Option<Duration>,
    ) -> Result<(RowGuard, RowGuard)> {
        debug_assert_ne!(a, b, "lock_pair requires distinct accounts");
        if a < b {
            let guard_a = self.lock(a, wait).await?;
            let guard_b = self.lock(b, wait).await?;
            Ok((guard_a, guard_b))
        } else {
            let guard_b = self.lock(b, wait).await?;
            let guard_a = self.lock(a, wait).await?;
            Ok((guard_a, guard_b))
        }
    }
}
