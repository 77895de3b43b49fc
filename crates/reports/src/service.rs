//! Service reports: customer service requests (CSR) against installed equipment.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};

use sheetsync_core::{DomainError, DomainResult, Entity, RecordId};

use crate::codec;
use crate::record::Record;

/// Marker older rows use for "no spares" in the joined spare columns.
const LEGACY_NONE: &str = "N/A";
/// Separator older rows use between joined spare values.
const LEGACY_SEPARATOR: &str = ", ";

/// Kind of service visit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServiceType {
    Warranty,
    Paid,
    Amc,
    /// Any other label, kept verbatim.
    Other(String),
}

impl ServiceType {
    pub fn as_str(&self) -> &str {
        match self {
            ServiceType::Warranty => "WARRANTY SERVICE",
            ServiceType::Paid => "PAID SERVICE",
            ServiceType::Amc => "AMC SERVICE",
            ServiceType::Other(label) => label,
        }
    }
}

/// Only the exact canonical labels map to named kinds; anything else is
/// stored back exactly as read.
impl From<&str> for ServiceType {
    fn from(value: &str) -> Self {
        match value {
            "WARRANTY SERVICE" => ServiceType::Warranty,
            "PAID SERVICE" => ServiceType::Paid,
            "AMC SERVICE" => ServiceType::Amc,
            other => ServiceType::Other(other.to_string()),
        }
    }
}

impl core::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A spare part replaced during a service visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparePart {
    #[serde(default, deserialize_with = "codec::text")]
    pub name: String,
    #[serde(default, with = "codec::lenient")]
    pub quantity: Option<u32>,
    #[serde(default, with = "codec::lenient")]
    pub cost: Option<f64>,
}

impl SparePart {
    pub fn new(name: impl Into<String>, quantity: Option<u32>, cost: Option<f64>) -> Self {
        Self {
            name: name.into(),
            quantity,
            cost,
        }
    }
}

/// Service report record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ServiceRow", into = "ServiceRow")]
pub struct ServiceReport {
    pub id: RecordId,
    pub date: Option<String>,
    pub csr_no: Option<String>,
    pub customer_name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub contact_no: Option<String>,
    pub equipment_name: Option<String>,
    pub serial_no: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub customer_problem: Option<String>,
    pub diagnosis_findings: Option<String>,
    pub rectification: Option<String>,
    pub service_type: Option<ServiceType>,
    pub events: Option<String>,
    pub start_of_service: Option<String>,
    pub end_of_service: Option<String>,
    pub expected_complaint_closed_date: Option<String>,
    pub closed_date: Option<String>,
    pub engineer_name: Option<String>,
    pub spares: Vec<SparePart>,
}

impl ServiceReport {
    /// Start a new report with a fresh id, dated today.
    pub fn new(customer_name: impl Into<String>) -> Self {
        let mut report = Self::with_id(RecordId::generate(), customer_name);
        report.date = Some(chrono::Local::now().date_naive().format("%Y-%m-%d").to_string());
        report
    }

    pub fn with_id(id: RecordId, customer_name: impl Into<String>) -> Self {
        Self {
            id,
            date: None,
            csr_no: None,
            customer_name: customer_name.into(),
            address: None,
            city: None,
            contact_no: None,
            equipment_name: None,
            serial_no: None,
            manufacturer: None,
            model: None,
            customer_problem: None,
            diagnosis_findings: None,
            rectification: None,
            service_type: None,
            events: None,
            start_of_service: None,
            end_of_service: None,
            expected_complaint_closed_date: None,
            closed_date: None,
            engineer_name: None,
            spares: Vec::new(),
        }
    }

    /// Close the complaint on `date` (`YYYY-MM-DD`).
    pub fn close(&mut self, date: NaiveDate) {
        self.closed_date = Some(date.format("%Y-%m-%d").to_string());
    }

    pub fn reopen(&mut self) {
        self.closed_date = None;
    }

    pub fn is_warranty(&self) -> bool {
        matches!(self.service_type, Some(ServiceType::Warranty))
    }

    /// Sum of `quantity * cost` over spares that carry both values.
    pub fn spares_cost(&self) -> f64 {
        self.spares
            .iter()
            .filter_map(|spare| Some(f64::from(spare.quantity?) * spare.cost?))
            .sum()
    }

    pub(crate) fn parsed_date(&self) -> Option<NaiveDate> {
        parse_date(self.date.as_deref())
    }

    pub(crate) fn parsed_closed_date(&self) -> Option<NaiveDate> {
        parse_date(self.closed_date.as_deref())
    }
}

fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw?.trim(), "%Y-%m-%d").ok()
}

impl Entity for ServiceReport {
    type Id = RecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Record for ServiceReport {
    const COLLECTION: &'static str = "serviceReports";
    const LABEL: &'static str = "Service report";

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn customer_name(&self) -> &str {
        &self.customer_name
    }

    fn reference_no(&self) -> Option<&str> {
        self.csr_no.as_deref()
    }

    fn engineer_name(&self) -> Option<&str> {
        self.engineer_name.as_deref()
    }

    fn line_item_count(&self) -> usize {
        self.spares.len()
    }

    fn closed_date(&self) -> Option<&str> {
        self.closed_date.as_deref()
    }

    fn validate(&self) -> DomainResult<()> {
        if self.id.is_empty() {
            return Err(DomainError::invalid_id("service report id is empty"));
        }
        if self.customer_name.trim().is_empty() {
            return Err(DomainError::validation("customer name is required"));
        }
        Ok(())
    }
}

/// Next CSR number: highest numeric CSR in `records` plus one, zero-padded to
/// three digits. Non-numeric CSR values count as zero.
pub fn next_csr_no(records: &[ServiceReport]) -> String {
    let highest = records
        .iter()
        .filter_map(|report| report.csr_no.as_deref())
        .map(csr_value)
        .max()
        .unwrap_or(0);
    format!("{:03}", highest.saturating_add(1))
}

fn csr_value(raw: &str) -> u64 {
    let digits: String = raw.trim().chars().take_while(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

/// Order reports by `date`, newest first. Missing or unparsable dates sort
/// last; ties keep their original order.
pub fn sort_newest_first(records: &mut [ServiceReport]) {
    records.sort_by_key(|report| core::cmp::Reverse(report.parsed_date()));
}

/// Spreadsheet row shape for service reports.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceRow {
    id: RecordId,
    #[serde(default, with = "codec::opt_string")]
    date: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    csr_no: Option<String>,
    #[serde(default, deserialize_with = "codec::text")]
    customer_name: String,
    #[serde(default, with = "codec::opt_string")]
    address: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    city: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    contact_no: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    equipment_name: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    serial_no: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    manufacturer: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    model: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    customer_problem: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    diagnosis_findings: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    rectification: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    service_type: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    events: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    start_of_service: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    end_of_service: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    expected_complaint_closed_date: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    closed_date: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    engineer_name: Option<String>,
    #[serde(
        default,
        serialize_with = "serialize_spares",
        deserialize_with = "codec::embedded_json_opt::deserialize"
    )]
    spares: Option<Vec<SparePart>>,
    #[serde(default, deserialize_with = "codec::opt_string::deserialize", skip_serializing)]
    spare_names: Option<String>,
    #[serde(default, deserialize_with = "codec::opt_string::deserialize", skip_serializing)]
    spare_quantities: Option<String>,
    #[serde(default, deserialize_with = "codec::opt_string::deserialize", skip_serializing)]
    spare_costs: Option<String>,
}

fn serialize_spares<S>(spares: &Option<Vec<SparePart>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let encoded = serde_json::to_string(spares.as_deref().unwrap_or(&[]))
        .map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&encoded)
}

/// Decode the older parallel `spareNames` / `spareQuantities` / `spareCosts`
/// columns (values joined by `", "`, `"N/A"` for none).
fn legacy_spares(names: Option<&str>, quantities: Option<&str>, costs: Option<&str>) -> Vec<SparePart> {
    let Some(names) = names.filter(|names| *names != LEGACY_NONE) else {
        return Vec::new();
    };

    let split = |column: Option<&str>| -> Vec<String> {
        column
            .filter(|column| *column != LEGACY_NONE)
            .map(|column| column.split(LEGACY_SEPARATOR).map(str::to_string).collect())
            .unwrap_or_default()
    };
    let quantities = split(quantities);
    let costs = split(costs);

    names
        .split(LEGACY_SEPARATOR)
        .enumerate()
        .filter(|(_, name)| !name.trim().is_empty())
        .map(|(idx, name)| SparePart {
            name: name.to_string(),
            quantity: quantities.get(idx).and_then(|q| q.trim().parse().ok()),
            cost: costs.get(idx).and_then(|c| c.trim().parse().ok()),
        })
        .collect()
}

impl From<ServiceRow> for ServiceReport {
    fn from(row: ServiceRow) -> Self {
        let spares = match row.spares {
            Some(spares) => spares,
            None => legacy_spares(
                row.spare_names.as_deref(),
                row.spare_quantities.as_deref(),
                row.spare_costs.as_deref(),
            ),
        };

        Self {
            id: row.id,
            date: row.date,
            csr_no: row.csr_no,
            customer_name: row.customer_name,
            address: row.address,
            city: row.city,
            contact_no: row.contact_no,
            equipment_name: row.equipment_name,
            serial_no: row.serial_no,
            manufacturer: row.manufacturer,
            model: row.model,
            customer_problem: row.customer_problem,
            diagnosis_findings: row.diagnosis_findings,
            rectification: row.rectification,
            service_type: row.service_type.as_deref().map(ServiceType::from),
            events: row.events,
            start_of_service: row.start_of_service,
            end_of_service: row.end_of_service,
            expected_complaint_closed_date: row.expected_complaint_closed_date,
            closed_date: row.closed_date,
            engineer_name: row.engineer_name,
            spares,
        }
    }
}

impl From<ServiceReport> for ServiceRow {
    fn from(report: ServiceReport) -> Self {
        Self {
            id: report.id,
            date: report.date,
            csr_no: report.csr_no,
            customer_name: report.customer_name,
            address: report.address,
            city: report.city,
            contact_no: report.contact_no,
            equipment_name: report.equipment_name,
            serial_no: report.serial_no,
            manufacturer: report.manufacturer,
            model: report.model,
            customer_problem: report.customer_problem,
            diagnosis_findings: report.diagnosis_findings,
            rectification: report.rectification,
            service_type: report.service_type.map(|kind| kind.as_str().to_string()),
            events: report.events,
            start_of_service: report.start_of_service,
            end_of_service: report.end_of_service,
            expected_complaint_closed_date: report.expected_complaint_closed_date,
            closed_date: report.closed_date,
            engineer_name: report.engineer_name,
            spares: Some(report.spares),
            spare_names: None,
            spare_quantities: None,
            spare_costs: None,
        }
    }
}
