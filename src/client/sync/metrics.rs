//! # Sync Metrics
//!
//! Counters for the poll loop: how many fetches ran, how they ended and how
//! long they took.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncMetrics {
    pub total_fetches: u64,
    pub successful_fetches: u64,
    pub failed_fetches: u64,
    /// Results thrown away because the conversation changed or was torn down
    pub discarded_fetches: u64,
    pub acks_sent: u64,
    pub acks_failed: u64,
    pub average_fetch_duration: Duration,
    pub last_fetch_duration: Option<Duration>,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fetch_start(&mut self) {
        self.total_fetches += 1;
    }

    pub fn record_fetch_success(&mut self, started: Instant, now: Instant) {
        let duration = now.saturating_duration_since(started);
        self.last_fetch_duration = Some(duration);
        self.successful_fetches += 1;

        // Update rolling average
        let total = self.average_fetch_duration * (self.successful_fetches - 1) as u32 + duration;
        self.average_fetch_duration = total / self.successful_fetches as u32;
    }

    pub fn record_fetch_failure(&mut self) {
        self.failed_fetches += 1;
    }

    pub fn record_fetch_discarded(&mut self) {
        self.discarded_fetches += 1;
    }

    pub fn record_ack(&mut self, succeeded: bool) {
        if succeeded {
            self.acks_sent += 1;
        } else {
            self.acks_failed += 1;
        }
    }

    pub fn success_rate(&self) -> f64 {
        let settled = self.successful_fetches + self.failed_fetches;
        if settled == 0 {
            0.0
        } else {
            self.successful_fetches as f64 / settled as f64
        }
    }
}
