//! `sheetsync-client`
//!
//! **Responsibility:** Keep installation and service report collections in
//! sync between a spreadsheet-backed REST store and a durable local cache.
//!
//! This crate provides:
//! - A remote-first synchronizer per report domain with local fallback
//! - The SQLite local cache
//! - The HTTP remote store client and an in-memory double
//! - Environment configuration and the CLI command surface

pub mod cache;
pub mod commands;
pub mod config;
pub mod keyed_lock;
pub mod offline;
pub mod remote;
pub mod synchronizer;
pub mod types;

pub use cache::LocalCache;
pub use config::{ClientConfig, ConfigError};
pub use offline::{ConnectivityState, OfflineMode};
pub use remote::{InMemoryRemote, RemoteError, RemoteStore, SheetDbStore, UpdateMode};
pub use synchronizer::{RecordSynchronizer, SyncError};
pub use types::{CacheEffect, Listing, Lookup, Operation, SyncOutcome, Via};
