//! Remote-first record synchronizer with local-cache fallback.
//!
//! One instance per report domain. Every mutation is attempted against the
//! remote store first and mirrored into the local cache whatever the remote
//! outcome; reads fall back to the cache when the remote store is unavailable.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Mutex;

use chrono::NaiveDate;
use sheetsync_core::{DomainError, Entity, RecordId, position_of};
use sheetsync_reports::{CollectionStats, Record, ServiceReport, ServiceStats, search};

use crate::cache::LocalCache;
use crate::keyed_lock::KeyedLocks;
use crate::offline::OfflineMode;
use crate::remote::{RemoteError, RemoteStore};
use crate::types::{CacheEffect, Listing, Lookup, Operation, SyncOutcome, Via};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("invalid record: {0}")]
    Invalid(#[from] DomainError),

    #[error("local cache unavailable: {0}")]
    Cache(String),
}

impl From<anyhow::Error> for SyncError {
    fn from(err: anyhow::Error) -> Self {
        SyncError::Cache(format!("{err:#}"))
    }
}

/// Synchronizer for one record collection.
pub struct RecordSynchronizer<R, S> {
    remote: S,
    cache: LocalCache,
    locks: KeyedLocks,
    connectivity: Mutex<OfflineMode>,
    _record: PhantomData<fn() -> R>,
}

impl<R, S> RecordSynchronizer<R, S>
where
    R: Record,
    S: RemoteStore<R>,
{
    pub fn new(remote: S, cache: LocalCache) -> Self {
        Self {
            remote,
            cache,
            locks: KeyedLocks::new(),
            connectivity: Mutex::new(OfflineMode::new()),
            _record: PhantomData,
        }
    }

    pub fn remote(&self) -> &S {
        &self.remote
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    /// Connectivity as observed by the most recent remote call.
    pub fn connectivity(&self) -> OfflineMode {
        self.connectivity
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Create a record. Succeeds while the local cache is writable, even when
    /// the remote store is down.
    pub async fn create(&self, record: R) -> Result<SyncOutcome, SyncError> {
        record.validate()?;
        let id = record.id().clone();
        let _guard = self.locks.lock(&id).await;

        let remote = self.remote.create(&record).await;
        let remote_error = self.settle(Operation::Create, &id, remote);

        let cache = self
            .cache
            .modify(R::COLLECTION, |records: &mut Vec<R>| upsert(records, record))
            .await?;

        Ok(SyncOutcome::new(R::LABEL, Operation::Create, id, remote_error, cache))
    }

    /// Update the record keyed by `id`. The record's own id is forced to `id`.
    ///
    /// A local cache miss leaves the cache untouched and is reported as
    /// [`CacheEffect::Missing`].
    pub async fn update(&self, id: &RecordId, mut record: R) -> Result<SyncOutcome, SyncError> {
        if id.is_empty() {
            return Err(DomainError::invalid_id("cannot update a record without an id").into());
        }
        record.set_id(id.clone());
        record.validate()?;
        let _guard = self.locks.lock(id).await;

        let remote = self.remote.update(id, &record).await;
        let remote_error = self.settle(Operation::Update, id, remote);

        let cache = self
            .cache
            .modify(R::COLLECTION, |records: &mut Vec<R>| replace(records, record))
            .await?;

        if cache == CacheEffect::Missing {
            tracing::warn!(collection = R::COLLECTION, %id, "no local copy to update");
        }

        Ok(SyncOutcome::new(R::LABEL, Operation::Update, id.clone(), remote_error, cache))
    }

    /// Delete the record keyed by `id` from both stores. Deleting an unknown
    /// id is not an error.
    pub async fn delete(&self, id: &RecordId) -> Result<SyncOutcome, SyncError> {
        if id.is_empty() {
            return Err(DomainError::invalid_id("cannot delete a record without an id").into());
        }
        let _guard = self.locks.lock(id).await;

        // A store that has no such row already agrees with the local removal.
        let remote = match self.remote.delete(id).await {
            Err(RemoteError::NotFound(_)) => {
                tracing::debug!(collection = R::COLLECTION, %id, "remote store had no row to delete");
                Ok(())
            }
            other => other,
        };
        let remote_error = self.settle(Operation::Delete, id, remote);

        let cache = self
            .cache
            .modify(R::COLLECTION, |records: &mut Vec<R>| remove(records, id))
            .await?;

        Ok(SyncOutcome::new(R::LABEL, Operation::Delete, id.clone(), remote_error, cache))
    }

    /// List the collection, optionally filtered by a free-text query.
    ///
    /// Never fails: a successful remote fetch replaces the local cache
    /// wholesale, otherwise the cached collection (possibly empty) is served.
    /// Statistics cover the whole collection, before filtering.
    pub async fn list(&self, query: Option<&str>) -> Listing<R> {
        let (records, via, remote_error) = match self.remote.list().await {
            Ok(rows) => {
                self.observe_reachable();
                let records = dedupe_by_id(rows);
                tracing::info!(collection = R::COLLECTION, count = records.len(), "loaded from remote store");

                if let Err(err) = self.cache.set_all(R::COLLECTION, &records).await {
                    tracing::error!(collection = R::COLLECTION, error = %format!("{err:#}"), "failed to refresh local cache");
                }
                (records, Via::Remote, None)
            }
            Err(err) => {
                self.observe_failure(&err);
                tracing::warn!(collection = R::COLLECTION, error = %err, "remote list failed; using local data");
                (self.cached_or_empty().await, Via::Local, Some(err.to_string()))
            }
        };

        let stats = CollectionStats::compute(&records);
        let records = search::filter(records, query);

        Listing {
            records,
            via,
            degraded: via == Via::Local,
            stats,
            remote_error,
        }
    }

    /// Read one record from the local cache only.
    pub async fn get_cached(&self, id: &RecordId) -> Result<Option<R>, SyncError> {
        let records: Vec<R> = self.cache.get_all(R::COLLECTION).await?;
        Ok(records.into_iter().find(|r| r.id() == id))
    }

    /// Look a record up remotely (search endpoint, then a full listing),
    /// falling back to the local cache when the remote store is unavailable.
    pub async fn fetch(&self, id: &RecordId) -> Result<Lookup<R>, SyncError> {
        let found = match self.remote.search_by_id(id).await {
            Ok(rows) => match rows.into_iter().find(|r| r.id() == id) {
                Some(record) => Ok(Some(record)),
                None => {
                    tracing::debug!(collection = R::COLLECTION, %id, "search found no match; scanning full listing");
                    self.remote
                        .list()
                        .await
                        .map(|rows| rows.into_iter().find(|r| r.id() == id))
                }
            },
            Err(err) => Err(err),
        };

        match found {
            Ok(record) => {
                self.observe_reachable();
                Ok(Lookup {
                    record,
                    via: Via::Remote,
                    degraded: false,
                })
            }
            Err(err) => {
                self.observe_failure(&err);
                tracing::warn!(collection = R::COLLECTION, %id, error = %err, "remote lookup failed; using local data");
                Ok(Lookup {
                    record: self.get_cached(id).await?,
                    via: Via::Local,
                    degraded: true,
                })
            }
        }
    }

    /// Record connectivity and log the path taken. Returns the fallback reason
    /// when the remote attempt failed.
    fn settle(&self, operation: Operation, id: &RecordId, result: Result<(), RemoteError>) -> Option<String> {
        match result {
            Ok(()) => {
                self.observe_reachable();
                tracing::info!(collection = R::COLLECTION, ?operation, %id, "applied to remote store");
                None
            }
            Err(err) => {
                self.observe_failure(&err);
                tracing::warn!(collection = R::COLLECTION, ?operation, %id, error = %err, "remote store failed; applying locally");
                Some(err.to_string())
            }
        }
    }

    fn observe_reachable(&self) {
        self.connectivity
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .set_online();
    }

    fn observe_failure(&self, err: &RemoteError) {
        let mut connectivity = self
            .connectivity
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if err.is_unreachable() {
            connectivity.set_offline(err.to_string());
        } else {
            connectivity.set_online();
        }
    }

    async fn cached_or_empty(&self) -> Vec<R> {
        match self.cache.get_all(R::COLLECTION).await {
            Ok(records) => records,
            Err(err) => {
                tracing::error!(collection = R::COLLECTION, error = %format!("{err:#}"), "local cache unreadable; serving empty collection");
                Vec::new()
            }
        }
    }
}

impl<S> RecordSynchronizer<ServiceReport, S>
where
    S: RemoteStore<ServiceReport>,
{
    /// Next sequential CSR number over the current collection.
    pub async fn next_csr_no(&self) -> String {
        let listing = self.list(None).await;
        sheetsync_reports::next_csr_no(&listing.records)
    }

    /// Open / warranty / closed-this-month counts over the current collection.
    pub async fn service_stats(&self, today: NaiveDate) -> ServiceStats {
        let listing = self.list(None).await;
        ServiceStats::compute(&listing.records, today)
    }
}

fn upsert<R: Record>(records: &mut Vec<R>, record: R) -> CacheEffect {
    match position_of(records, record.id()) {
        Some(idx) => {
            records[idx] = record;
            CacheEffect::Replaced
        }
        None => {
            records.push(record);
            CacheEffect::Inserted
        }
    }
}

fn replace<R: Record>(records: &mut [R], record: R) -> CacheEffect {
    match position_of(records, record.id()) {
        Some(idx) => {
            records[idx] = record;
            CacheEffect::Replaced
        }
        None => CacheEffect::Missing,
    }
}

fn remove<R: Record>(records: &mut Vec<R>, id: &RecordId) -> CacheEffect {
    let before = records.len();
    records.retain(|r| r.id() != id);
    if records.len() == before {
        CacheEffect::Missing
    } else {
        CacheEffect::Removed
    }
}

/// Keep the first row for each id, preserving order.
fn dedupe_by_id<R: Record>(rows: Vec<R>) -> Vec<R> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|r| seen.insert(r.id().clone()))
        .collect()
}
