//! Remote store boundary.
//!
//! The remote store is a spreadsheet-backed REST API holding one collection per
//! report domain. It is authoritative when reachable; every failure is handed
//! back as a [`RemoteError`] so the synchronizer can fall back to the local cache.

pub mod in_memory;
pub mod sheetdb;

use std::sync::Arc;

use sheetsync_core::RecordId;
use sheetsync_reports::Record;

pub use in_memory::InMemoryRemote;
pub use sheetdb::SheetDbStore;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),

    #[error("remote store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode remote response: {0}")]
    Decode(String),

    #[error("record {0} not found in remote store")]
    NotFound(RecordId),

    #[error("remote store rejected the write: {0}")]
    Rejected(String),
}

impl RemoteError {
    /// True when the store could not be reached or refused the request at the
    /// HTTP level, as opposed to answering with an unexpected body.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, RemoteError::Network(_) | RemoteError::Status { .. })
    }
}

/// How a domain's store applies updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMode {
    /// Full replace (`PUT base/id/<id>`).
    #[default]
    Put,
    /// Partial merge (`PATCH base/id/<id>`).
    Patch,
}

/// Async access to one remote record collection.
#[async_trait::async_trait]
pub trait RemoteStore<R: Record>: Send + Sync {
    /// Fetch the whole collection.
    async fn list(&self) -> Result<Vec<R>, RemoteError>;

    /// Rows whose id equals `id` (normally zero or one).
    async fn search_by_id(&self, id: &RecordId) -> Result<Vec<R>, RemoteError>;

    async fn create(&self, record: &R) -> Result<(), RemoteError>;

    /// Update the row keyed by `id`. `NotFound` when no row was touched.
    async fn update(&self, id: &RecordId, record: &R) -> Result<(), RemoteError>;

    /// Delete the row keyed by `id`. `NotFound` when no row was removed.
    async fn delete(&self, id: &RecordId) -> Result<(), RemoteError>;
}

#[async_trait::async_trait]
impl<R, S> RemoteStore<R> for Arc<S>
where
    R: Record,
    S: RemoteStore<R> + ?Sized,
{
    async fn list(&self) -> Result<Vec<R>, RemoteError> {
        (**self).list().await
    }

    async fn search_by_id(&self, id: &RecordId) -> Result<Vec<R>, RemoteError> {
        (**self).search_by_id(id).await
    }

    async fn create(&self, record: &R) -> Result<(), RemoteError> {
        (**self).create(record).await
    }

    async fn update(&self, id: &RecordId, record: &R) -> Result<(), RemoteError> {
        (**self).update(id, record).await
    }

    async fn delete(&self, id: &RecordId) -> Result<(), RemoteError> {
        (**self).delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_failures_count_as_unreachable() {
        assert!(RemoteError::Network("refused".into()).is_unreachable());
        assert!(
            RemoteError::Status {
                status: 503,
                body: String::new()
            }
            .is_unreachable()
        );
        assert!(!RemoteError::Decode("eof".into()).is_unreachable());
        assert!(!RemoteError::NotFound(RecordId::from("x")).is_unreachable());
        assert!(!RemoteError::Rejected("created: 0".into()).is_unreachable());
    }
}
