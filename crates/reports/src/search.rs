//! Free-text filtering over a record collection.

use crate::record::Record;

/// Case-insensitive substring query over customer name, reference number and
/// engineer name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    needle: String,
}

impl SearchQuery {
    /// Returns `None` for a blank query (no filtering). Surrounding spaces in a
    /// non-blank query are significant.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self {
                needle: raw.to_lowercase(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.needle
    }

    pub fn matches<R: Record>(&self, record: &R) -> bool {
        let hit = |field: Option<&str>| field.is_some_and(|value| value.to_lowercase().contains(&self.needle));

        hit(Some(record.customer_name())) || hit(record.reference_no()) || hit(record.engineer_name())
    }

    /// Keep matching records, preserving order.
    pub fn filter<R: Record>(&self, records: Vec<R>) -> Vec<R> {
        records.into_iter().filter(|record| self.matches(record)).collect()
    }
}

/// Apply an optional raw query; a missing or blank query returns `records` unchanged.
pub fn filter<R: Record>(records: Vec<R>, query: Option<&str>) -> Vec<R> {
    match query.and_then(SearchQuery::parse) {
        Some(query) => query.filter(records),
        None => records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installation::InstallationReport;
    use crate::service::ServiceReport;
    use proptest::prelude::*;
    use sheetsync_core::RecordId;

    fn installation(id: &str, customer: &str, invoice: Option<&str>, engineer: Option<&str>) -> InstallationReport {
        let mut report = InstallationReport::with_id(RecordId::from(id), customer);
        report.invoice_no = invoice.map(str::to_string);
        report.engineer_name = engineer.map(str::to_string);
        report.city = Some("Pune".into());
        report
    }

    fn sample() -> Vec<InstallationReport> {
        vec![
            installation("1", "Acme Labs", Some("INV-100"), Some("Ravi")),
            installation("2", "Globex", Some("INV-200"), None),
            installation("3", "Initech", None, Some("Meena")),
        ]
    }

    fn ids<R: Record>(records: &[R]) -> Vec<String> {
        records.iter().map(|r| r.id().to_string()).collect()
    }

    #[test]
    fn matches_each_searchable_field() {
        assert_eq!(ids(&filter(sample(), Some("acme"))), ["1"]);
        assert_eq!(ids(&filter(sample(), Some("inv-2"))), ["2"]);
        assert_eq!(ids(&filter(sample(), Some("MEENA"))), ["3"]);
    }

    #[test]
    fn other_fields_are_not_searched() {
        assert!(filter(sample(), Some("pune")).is_empty());
    }

    #[test]
    fn blank_query_keeps_everything() {
        assert_eq!(filter(sample(), Some("   ")).len(), 3);
        assert_eq!(filter(sample(), None).len(), 3);
    }

    #[test]
    fn surrounding_spaces_are_part_of_the_query() {
        assert_eq!(ids(&filter(sample(), Some(" labs"))), ["1"]);
        assert!(filter(sample(), Some(" acme")).is_empty());
        assert_eq!(SearchQuery::parse(" Ltd").map(|q| q.as_str().to_string()), Some(" ltd".to_string()));
    }

    #[test]
    fn service_reports_search_csr_number() {
        let mut report = ServiceReport::with_id(RecordId::from("s1"), "Acme");
        report.csr_no = Some("042".into());
        assert_eq!(filter(vec![report], Some("42")).len(), 1);
    }

    proptest! {
        /// Property: case of the query never changes the result.
        #[test]
        fn query_case_is_irrelevant(query in "[a-zA-Z0-9-]{1,6}") {
            let lower = ids(&filter(sample(), Some(&query.to_lowercase())));
            let upper = ids(&filter(sample(), Some(&query.to_uppercase())));
            prop_assert_eq!(lower, upper);
        }
    }
}
