//! Per-session serialization.
//!
//! Messages for one session are processed strictly one at a time; different
//! sessions proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::foundation::SessionId;

type LockTable = HashMap<SessionId, Arc<AsyncMutex<()>>>;

/// Table of per-session async locks.
#[derive(Clone, Default)]
pub struct SessionLocks {
    locks: Arc<Mutex<LockTable>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other holder has this session, then returns a guard.
    ///
    /// The guard is owned so it can be moved into a spawned task that
    /// finishes the commit.
    pub async fn acquire(&self, session_id: &SessionId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut table = self.table();
            // Entries only referenced by the table are idle.
            table.retain(|id, lock| id == session_id || Arc::strong_count(lock) > 1);
            table
                .entry(session_id.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of sessions with a lock entry.
    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn table(&self) -> MutexGuard<'_, LockTable> {
        self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
