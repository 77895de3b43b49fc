use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use sheetsync_core::{Entity, RecordId};
use sheetsync_reports::Record;

use super::{RemoteError, RemoteStore};

/// In-memory remote store.
///
/// Intended for tests/dev. Can be switched offline (every call fails with a
/// network error) or made to reject writes.
#[derive(Debug)]
pub struct InMemoryRemote<R> {
    rows: RwLock<Vec<R>>,
    online: AtomicBool,
    rejecting: AtomicBool,
    calls: AtomicUsize,
}

impl<R: Record> Default for InMemoryRemote<R> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            online: AtomicBool::new(true),
            rejecting: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }
}

impl<R: Record> InMemoryRemote<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<R>) -> Self {
        Self {
            rows: RwLock::new(rows),
            ..Self::default()
        }
    }

    /// A store that is unreachable from the start.
    pub fn offline() -> Self {
        let store = Self::default();
        store.set_online(false);
        store
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Answer every create with `created: 0`.
    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::SeqCst);
    }

    /// Snapshot of the stored rows.
    pub fn rows(&self) -> Vec<R> {
        self.rows
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of calls attempted (including ones that failed while offline).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn reach(&self) -> Result<(), RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RemoteError::Network("in-memory remote is offline".to_string()))
        }
    }
}

#[async_trait::async_trait]
impl<R: Record> RemoteStore<R> for InMemoryRemote<R> {
    async fn list(&self) -> Result<Vec<R>, RemoteError> {
        self.reach()?;
        Ok(self.rows())
    }

    async fn search_by_id(&self, id: &RecordId) -> Result<Vec<R>, RemoteError> {
        self.reach()?;
        Ok(self.rows().into_iter().filter(|r| r.id() == id).collect())
    }

    async fn create(&self, record: &R) -> Result<(), RemoteError> {
        self.reach()?;
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(RemoteError::Rejected("created: 0".to_string()));
        }

        let mut rows = self
            .rows
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match rows.iter_mut().find(|r| r.id() == record.id()) {
            Some(existing) => *existing = record.clone(),
            None => rows.push(record.clone()),
        }
        Ok(())
    }

    async fn update(&self, id: &RecordId, record: &R) -> Result<(), RemoteError> {
        self.reach()?;
        let mut rows = self
            .rows
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let existing = rows
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| RemoteError::NotFound(id.clone()))?;
        *existing = record.clone();
        Ok(())
    }

    async fn delete(&self, id: &RecordId) -> Result<(), RemoteError> {
        self.reach()?;
        let mut rows = self
            .rows
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = rows.len();
        rows.retain(|r| r.id() != id);
        if rows.len() == before {
            return Err(RemoteError::NotFound(id.clone()));
        }
        Ok(())
    }
}
