//! Collection statistics (pure, recomputed on every listing).

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::record::{Record, Status};
use crate::service::ServiceReport;

/// Summary counters shown above a record list.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub total: usize,
    /// Distinct customer names (exact string equality).
    pub distinct_customers: usize,
    /// Nested line items summed across records. Records whose stored items
    /// could not be decoded carry an empty list and so contribute zero.
    pub total_line_items: usize,
    /// Distinct non-empty engineer names.
    pub distinct_engineers: usize,
}

impl CollectionStats {
    pub fn compute<R: Record>(records: &[R]) -> Self {
        let customers: HashSet<&str> = records.iter().map(R::customer_name).collect();
        let engineers: HashSet<&str> = records
            .iter()
            .filter_map(R::engineer_name)
            .filter(|name| !name.is_empty())
            .collect();

        Self {
            total: records.len(),
            distinct_customers: customers.len(),
            total_line_items: records.iter().map(R::line_item_count).sum(),
            distinct_engineers: engineers.len(),
        }
    }
}

/// Service dashboard counters.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStats {
    pub total: usize,
    pub open: usize,
    pub warranty: usize,
    /// Reports whose closed date falls in the reference month.
    pub closed_this_month: usize,
}

impl ServiceStats {
    /// Compute counters with `today` selecting the "this month" window.
    pub fn compute(records: &[ServiceReport], today: NaiveDate) -> Self {
        let closed_this_month = records
            .iter()
            .filter_map(ServiceReport::parsed_closed_date)
            .filter(|closed| closed.year() == today.year() && closed.month() == today.month())
            .count();

        Self {
            total: records.len(),
            open: records.iter().filter(|r| r.status() == Status::Open).count(),
            warranty: records.iter().filter(|r| r.is_warranty()).count(),
            closed_this_month,
        }
    }
}
