//! The record abstraction shared by both report domains.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use sheetsync_core::{DomainResult, Entity, RecordId};

/// Derived lifecycle status of a report.
///
/// Never stored: always projected from `closedDate`, so it cannot drift.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Open,
    Closed,
}

impl Status {
    /// `Closed` iff the closed date is a non-empty string.
    pub fn from_closed_date(closed_date: Option<&str>) -> Self {
        match closed_date {
            Some(date) if !date.is_empty() => Status::Closed,
            _ => Status::Open,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Open => "Open",
            Status::Closed => "Closed",
        }
    }
}

impl core::fmt::Display for Status {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One report kept in a record collection (remote sheet + local cache).
///
/// Implementors define the wire shape through serde and expose the handful of
/// fields the synchronizer, search and statistics need.
pub trait Record:
    Entity<Id = RecordId> + Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Fixed local cache key for this domain's collection.
    const COLLECTION: &'static str;

    /// Human-readable noun used in notifications and logs.
    const LABEL: &'static str;

    /// Force the identifier (used when an update is keyed by an explicit id).
    fn set_id(&mut self, id: RecordId);

    fn customer_name(&self) -> &str;

    /// Invoice number (installation) or CSR number (service).
    fn reference_no(&self) -> Option<&str>;

    fn engineer_name(&self) -> Option<&str>;

    /// Number of nested line items (installed items / replaced spares).
    fn line_item_count(&self) -> usize;

    fn closed_date(&self) -> Option<&str> {
        None
    }

    fn status(&self) -> Status {
        Status::from_closed_date(self.closed_date())
    }

    /// Required-field check run before any write.
    fn validate(&self) -> DomainResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn absent_or_empty_closed_date_is_open() {
        assert_eq!(Status::from_closed_date(None), Status::Open);
        assert_eq!(Status::from_closed_date(Some("")), Status::Open);
        assert_eq!(Status::from_closed_date(Some("2024-05-01")), Status::Closed);
        assert_eq!(Status::Closed.to_string(), "Closed");
    }

    proptest! {
        /// Property: status is Closed exactly when the closed date is non-empty.
        #[test]
        fn status_tracks_closed_date(date in ".{0,12}") {
            let status = Status::from_closed_date(Some(&date));
            prop_assert_eq!(status == Status::Closed, !date.is_empty());
        }
    }
}
