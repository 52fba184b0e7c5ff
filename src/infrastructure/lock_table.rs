use crate::domain::ports::{LockKey, RowLock};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Rows = Arc<DashMap<LockKey, Arc<Mutex<()>>>>;

/// Per-row mutexes shared by the store adapters.
///
/// One `tokio::sync::Mutex<()>` per key, created on first use and removed when
/// the last holder or waiter lets go. Guards are owned so they can live inside
/// a unit of work across `.await` points.
#[derive(Default, Debug)]
pub struct LockTable {
    rows: Rows,
}

struct RowGuard {
    key: LockKey,
    rows: Rows,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for RowGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters hold a clone of the mutex, so the entry survives while anyone
        // is queued on it.
        self.rows
            .remove_if(&self.key, |_, row| Arc::strong_count(row) == 1);
    }
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: LockKey) -> RowLock {
        // Declared before the row handle so a cancelled wait drops the handle
        // first and the entry can still be pruned.
        let mut pending = RowGuard {
            key,
            rows: self.rows.clone(),
            guard: None,
        };
        // Clone the Arc out so the DashMap shard is not held while waiting.
        let row = self.rows.entry(key).or_default().clone();
        pending.guard = Some(row.lock_owned().await);
        tracing::trace!(%key, "row lock acquired");
        RowLock::new(pending)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
