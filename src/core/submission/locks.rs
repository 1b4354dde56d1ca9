//! Per-(episode, manufacturer) locking

use crate::domain::ids::{EpisodeId, ManufacturerId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type PairKey = (EpisodeId, ManufacturerId);

/// Serializes work on the same (episode, manufacturer) pair
///
/// Different pairs never wait on each other. Idle entries are pruned on
/// every acquisition.
#[derive(Debug, Default)]
pub struct PairLocks {
    locks: Mutex<HashMap<PairKey, Arc<AsyncMutex<()>>>>,
}

impl PairLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to the pair
    pub async fn acquire(
        &self,
        episode_id: EpisodeId,
        manufacturer_id: &ManufacturerId,
    ) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(
                locks
                    .entry((episode_id, manufacturer_id.clone()))
                    .or_default(),
            )
        };
        lock.lock_owned().await
    }

    /// Number of pairs currently tracked
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
