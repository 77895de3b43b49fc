//! Connectivity tracking for the remote store.

use chrono::{DateTime, Utc};

pub use crate::types::ConnectivityState;

/// Last observed connectivity to the remote store.
///
/// The synchronizer updates this after every remote attempt; it never gates
/// a call (every operation still tries the remote store first).
#[derive(Debug, Clone)]
pub struct OfflineMode {
    state: ConnectivityState,
    last_error: Option<String>,
    changed_at: Option<DateTime<Utc>>,
}

impl OfflineMode {
    pub fn new() -> Self {
        Self {
            state: ConnectivityState::Online,
            last_error: None,
            changed_at: None,
        }
    }

    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    /// The error that caused the most recent switch to offline, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// When the state last flipped.
    pub fn changed_at(&self) -> Option<DateTime<Utc>> {
        self.changed_at
    }

    /// Mark the client as offline.
    pub fn set_offline(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        if self.state == ConnectivityState::Online {
            tracing::warn!(%reason, "remote store unreachable; serving from local cache");
            self.changed_at = Some(Utc::now());
        }
        self.state = ConnectivityState::Offline;
        self.last_error = Some(reason);
    }

    /// Mark the client as online.
    pub fn set_online(&mut self) {
        if self.state == ConnectivityState::Offline {
            tracing::info!("remote store reachable again");
            self.changed_at = Some(Utc::now());
        }
        self.state = ConnectivityState::Online;
        self.last_error = None;
    }

    pub fn is_offline(&self) -> bool {
        self.state == ConnectivityState::Offline
    }
}

impl Default for OfflineMode {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flips_and_remembers_reason() {
        let mut mode = OfflineMode::new();
        assert!(!mode.is_offline());
        assert!(mode.changed_at().is_none());

        mode.set_offline("network error: refused");
        assert!(mode.is_offline());
        assert_eq!(mode.last_error(), Some("network error: refused"));
        let first_flip = mode.changed_at();
        assert!(first_flip.is_some());

        mode.set_offline("network error: timeout");
        assert_eq!(mode.changed_at(), first_flip);
        assert_eq!(mode.last_error(), Some("network error: timeout"));

        mode.set_online();
        assert_eq!(mode.state(), ConnectivityState::Online);
        assert!(mode.last_error().is_none());
    }
}
