//! Per-record async locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use sheetsync_core::RecordId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Serializes mutations of the same record id while letting different ids
/// proceed concurrently.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    slots: Mutex<HashMap<RecordId, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`. Released when the guard drops.
    pub async fn lock(&self, id: &RecordId) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self
                .slots
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            // Slots nobody holds or waits on are only referenced by the map.
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots.entry(id.clone()).or_default().clone()
        };
        slot.lock_owned().await
    }

    /// Number of ids with a live slot.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
