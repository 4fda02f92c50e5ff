//! # Sync State
//!
//! Phases of the poll synchronizer and the status snapshot handed to the
//! presentation layer.

use chrono::{DateTime, Utc};

use super::metrics::SyncMetrics;

/// Poll synchronizer state machine
///
/// ```text
/// Idle -> Scheduled -> Fetching -> Reconciled -> Scheduled -> ...
///                          \-> Failed ----------/
/// any -> Idle   (deselect / teardown)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncPhase {
    /// No active conversation; nothing is polled
    Idle,
    /// Waiting for the next tick or an explicit trigger
    Scheduled,
    /// A snapshot request is outstanding
    Fetching,
    /// Transient: a snapshot was just applied
    Reconciled,
    /// Transient: the last fetch failed, store left untouched
    Failed,
}

/// How the most recent fetch ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LastFetch {
    Reconciled { at: DateTime<Utc> },
    Failed { at: DateTime<Utc>, error: String },
}

/// Sync status exposed to the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub struct SyncStatus {
    pub phase: SyncPhase,
    pub last_fetch: Option<LastFetch>,
    pub consecutive_failures: u32,
    pub metrics: SyncMetrics,
}

impl SyncStatus {
    pub fn is_fetching(&self) -> bool {
        self.phase == SyncPhase::Fetching
    }

    /// Error of the most recent fetch, cleared by the next success
    pub fn last_error(&self) -> Option<&str> {
        match &self.last_fetch {
            Some(LastFetch::Failed { error, .. }) => Some(error),
            _ => None,
        }
    }

    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        match self.last_fetch {
            Some(LastFetch::Reconciled { at }) => Some(at),
            _ => None,
        }
    }
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self {
            phase: SyncPhase::Idle,
            last_fetch: None,
            consecutive_failures: 0,
            metrics: SyncMetrics::default(),
        }
    }
}
