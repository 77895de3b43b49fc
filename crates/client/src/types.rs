//! Shared result types returned by the synchronizer.
//!
//! Every operation reports which path served it so the presentation layer can
//! show a transient notice (remote vs. local fallback).

use serde::{Deserialize, Serialize};
use sheetsync_core::RecordId;
use sheetsync_reports::CollectionStats;

/// Which store served a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Via {
    Remote,
    Local,
}

/// Mutating operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

/// What a mutation did to the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheEffect {
    Inserted,
    Replaced,
    Removed,
    /// No entry with the id existed locally; the cache was left unchanged.
    Missing,
}

/// Connectivity state of the client, as last observed against the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityState {
    /// The last remote call reached the store.
    Online,
    /// The last remote call failed at the network or HTTP level.
    Offline,
}

/// Result of a create, update or delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub operation: Operation,
    pub id: RecordId,
    pub via: Via,
    /// True when only the local cache was written.
    pub degraded: bool,
    pub cache: CacheEffect,
    /// Why the remote store was bypassed, when it was.
    pub remote_error: Option<String>,
    #[serde(skip)]
    label: &'static str,
}

impl SyncOutcome {
    pub(crate) fn new(
        label: &'static str,
        operation: Operation,
        id: RecordId,
        remote_error: Option<String>,
        cache: CacheEffect,
    ) -> Self {
        let via = if remote_error.is_some() { Via::Local } else { Via::Remote };
        Self {
            operation,
            id,
            via,
            degraded: via == Via::Local,
            cache,
            remote_error,
            label,
        }
    }

    /// Transient user-facing message naming the path that served the request.
    pub fn notice(&self) -> String {
        let label = self.label;
        match (self.operation, self.via, self.cache) {
            (Operation::Create, Via::Remote, _) => format!("{label} saved to remote store"),
            (Operation::Create, Via::Local, _) => {
                format!("{label} saved locally (not synchronized with remote store)")
            }
            (Operation::Update, Via::Remote, CacheEffect::Missing) => {
                format!("{label} updated in remote store (no local copy to refresh)")
            }
            (Operation::Update, Via::Remote, _) => format!("{label} updated in remote store"),
            (Operation::Update, Via::Local, CacheEffect::Missing) => {
                format!("{label} not found locally; nothing was updated")
            }
            (Operation::Update, Via::Local, _) => {
                format!("{label} updated locally (not synchronized with remote store)")
            }
            (Operation::Delete, Via::Remote, _) => format!("{label} deleted"),
            (Operation::Delete, Via::Local, _) => {
                format!("{label} deleted locally (not synchronized with remote store)")
            }
        }
    }
}

/// Result of listing a collection.
#[derive(Debug, Clone, Serialize)]
pub struct Listing<R> {
    pub records: Vec<R>,
    pub via: Via,
    pub degraded: bool,
    /// Statistics over the whole collection, before any search filter.
    pub stats: CollectionStats,
    pub remote_error: Option<String>,
}

impl<R> Listing<R> {
    pub fn notice(&self) -> &'static str {
        match self.via {
            Via::Remote => "Data loaded from remote store",
            Via::Local => "Using local data (remote store unavailable)",
        }
    }
}

/// Result of looking up one record.
#[derive(Debug, Clone, Serialize)]
pub struct Lookup<R> {
    pub record: Option<R>,
    pub via: Via,
    pub degraded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_marks_outcome_degraded() {
        let outcome = SyncOutcome::new(
            "Installation report",
            Operation::Create,
            RecordId::from("A"),
            Some("network error: connection refused".into()),
            CacheEffect::Inserted,
        );
        assert_eq!(outcome.via, Via::Local);
        assert!(outcome.degraded);
        assert_eq!(
            outcome.notice(),
            "Installation report saved locally (not synchronized with remote store)"
        );
    }

    #[test]
    fn update_miss_is_reported_distinctly() {
        let outcome = SyncOutcome::new(
            "Service report",
            Operation::Update,
            RecordId::from("A"),
            None,
            CacheEffect::Missing,
        );
        assert!(!outcome.degraded);
        assert_eq!(
            outcome.notice(),
            "Service report updated in remote store (no local copy to refresh)"
        );
    }

    #[test]
    fn outcome_serializes_lowercase_tags() {
        let outcome = SyncOutcome::new(
            "Service report",
            Operation::Delete,
            RecordId::from("A"),
            None,
            CacheEffect::Removed,
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["via"], "remote");
        assert_eq!(json["cache"], "removed");
        assert!(json.get("label").is_none());
    }
}
