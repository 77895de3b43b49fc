//! Report record schemas (installation and service reports).
//!
//! This crate holds the typed record shapes and the pure projections the
//! presentation layer renders: derived status, collection statistics, free-text
//! search and CSR numbering. No IO, no HTTP, no storage.

pub mod codec;
pub mod installation;
pub mod record;
pub mod search;
pub mod service;
pub mod stats;

pub use installation::{InstallationItem, InstallationReport, MAX_INSTALLATION_ITEMS};
pub use record::{Record, Status};
pub use search::SearchQuery;
pub use service::{ServiceReport, ServiceType, SparePart, next_csr_no, sort_newest_first};
pub use stats::{CollectionStats, ServiceStats};
