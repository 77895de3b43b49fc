//! Installation reports: one visit installing up to five items at a customer site.

use serde::{Deserialize, Serialize};

use sheetsync_core::{DomainError, DomainResult, Entity, RecordId};

use crate::codec;
use crate::record::Record;

/// Maximum number of installed items per report.
pub const MAX_INSTALLATION_ITEMS: usize = 5;

fn default_quantity() -> u32 {
    1
}

/// One installed item.
///
/// The row serial number is positional (index + 1) and is not stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationItem {
    #[serde(rename = "itemDescription", alias = "description", default, deserialize_with = "codec::text")]
    pub description: String,
    #[serde(default, with = "codec::opt_string")]
    pub manufacturer: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    pub serial_no: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    pub model_no: Option<String>,
    #[serde(default = "default_quantity", deserialize_with = "codec::quantity")]
    pub quantity: u32,
}

impl InstallationItem {
    pub fn new(description: impl Into<String>, quantity: u32) -> Self {
        Self {
            description: description.into(),
            manufacturer: None,
            serial_no: None,
            model_no: None,
            quantity: quantity.max(1),
        }
    }
}

/// Installation report record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationReport {
    pub id: RecordId,
    #[serde(default, with = "codec::opt_string")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "codec::text")]
    pub customer_name: String,
    #[serde(default, with = "codec::opt_string")]
    pub address: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    pub city: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    pub customer_contact: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    pub invoice_no: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    pub invoice_date: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    pub installation_date: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    pub engineer_name: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    pub engineer_contact: Option<String>,
    /// Warranty length in months, as entered.
    #[serde(default, with = "codec::opt_string")]
    pub warranty_period: Option<String>,
    #[serde(default, with = "codec::yes_no")]
    pub demo_given: bool,
    #[serde(default, with = "codec::yes_no")]
    pub training_given: bool,
    #[serde(default, with = "codec::opt_string")]
    pub event_start: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    pub event_end: Option<String>,
    #[serde(default, with = "codec::opt_string")]
    pub closed_date: Option<String>,
    #[serde(default, with = "codec::embedded_json")]
    pub items: Vec<InstallationItem>,
}

impl InstallationReport {
    /// Start a new report with a fresh id, dated today.
    pub fn new(customer_name: impl Into<String>) -> Self {
        let mut report = Self::with_id(RecordId::generate(), customer_name);
        report.date = Some(chrono::Local::now().date_naive().format("%Y-%m-%d").to_string());
        report
    }

    /// Build a report with an explicit id (no date default).
    pub fn with_id(id: RecordId, customer_name: impl Into<String>) -> Self {
        Self {
            id,
            date: None,
            customer_name: customer_name.into(),
            address: None,
            city: None,
            customer_contact: None,
            invoice_no: None,
            invoice_date: None,
            installation_date: None,
            engineer_name: None,
            engineer_contact: None,
            warranty_period: None,
            demo_given: false,
            training_given: false,
            event_start: None,
            event_end: None,
            closed_date: None,
            items: Vec::new(),
        }
    }

    /// Append an item, enforcing the per-report maximum.
    pub fn push_item(&mut self, item: InstallationItem) -> DomainResult<()> {
        if self.items.len() >= MAX_INSTALLATION_ITEMS {
            return Err(DomainError::invariant(format!(
                "maximum {MAX_INSTALLATION_ITEMS} items allowed per installation"
            )));
        }
        self.items.push(item);
        Ok(())
    }

    /// Replace the item list. Rows without a description are dropped, the way
    /// blank form rows are ignored on submit.
    pub fn set_items(&mut self, items: Vec<InstallationItem>) -> DomainResult<()> {
        let items: Vec<_> = items
            .into_iter()
            .filter(|item| !item.description.trim().is_empty())
            .collect();
        if items.len() > MAX_INSTALLATION_ITEMS {
            return Err(DomainError::invariant(format!(
                "maximum {MAX_INSTALLATION_ITEMS} items allowed per installation"
            )));
        }
        self.items = items;
        Ok(())
    }

    /// Total installed quantity across items.
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}

impl Entity for InstallationReport {
    type Id = RecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Record for InstallationReport {
    const COLLECTION: &'static str = "installationReports";
    const LABEL: &'static str = "Installation report";

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn customer_name(&self) -> &str {
        &self.customer_name
    }

    fn reference_no(&self) -> Option<&str> {
        self.invoice_no.as_deref()
    }

    fn engineer_name(&self) -> Option<&str> {
        self.engineer_name.as_deref()
    }

    fn line_item_count(&self) -> usize {
        self.items.len()
    }

    fn closed_date(&self) -> Option<&str> {
        self.closed_date.as_deref()
    }

    fn validate(&self) -> DomainResult<()> {
        if self.id.is_empty() {
            return Err(DomainError::invalid_id("installation report id is empty"));
        }
        if self.customer_name.trim().is_empty() {
            return Err(DomainError::validation("customer name is required"));
        }
        if self.items.len() > MAX_INSTALLATION_ITEMS {
            return Err(DomainError::invariant(format!(
                "maximum {MAX_INSTALLATION_ITEMS} items allowed per installation"
            )));
        }
        Ok(())
    }
}
