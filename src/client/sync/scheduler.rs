//! # Poll Scheduler
//!
//! Decides when the active conversation is polled next.
//!
//! ## Features
//!
//! - **Fixed cadence**: one poll per interval after each completed poll
//! - **Early triggers**: sends and conversation switches make the next poll due now
//! - **Optional backoff**: consecutive failures can stretch the delay up to a cap
//!
//! Time is passed in by the caller so the schedule can be driven by a paused
//! tokio clock in tests.

use std::time::Duration;
use tokio::time::Instant;

use crate::shared::config::FailureBackoff;

/// Poll scheduler
#[derive(Debug, Clone)]
pub struct PollScheduler {
    /// Base poll interval
    base_interval: Duration,
    /// Failure policy
    backoff: FailureBackoff,
    /// When the next poll is due; `None` while stopped
    next_due: Option<Instant>,
    /// Failed polls since the last success
    consecutive_failures: u32,
}

impl PollScheduler {
    /// Create a new poll scheduler
    pub fn new(base_interval: Duration, backoff: FailureBackoff) -> Self {
        Self {
            base_interval,
            backoff,
            next_due: None,
            consecutive_failures: 0,
        }
    }

    /// Start scheduling with a poll due immediately
    pub fn start(&mut self, now: Instant) {
        self.consecutive_failures = 0;
        self.next_due = Some(now);
    }

    /// Stop the scheduler
    pub fn stop(&mut self) {
        self.next_due = None;
        self.consecutive_failures = 0;
    }

    pub fn is_active(&self) -> bool {
        self.next_due.is_some()
    }

    /// Make the next poll due now. Ignored while stopped.
    pub fn request_immediate(&mut self, now: Instant) {
        if self.next_due.is_some() {
            self.next_due = Some(now);
        }
    }

    /// Check if a poll should run now
    pub fn is_due(&self, now: Instant) -> bool {
        matches!(self.next_due, Some(due) if due <= now)
    }

    /// Record a successful poll
    pub fn record_success(&mut self, now: Instant) {
        self.consecutive_failures = 0;
        if self.next_due.is_some() {
            self.next_due = Some(now + self.base_interval);
        }
    }

    /// Record a failed poll
    pub fn record_failure(&mut self, now: Instant) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.next_due.is_some() {
            self.next_due = Some(now + self.current_delay());
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Delay applied after the most recent poll
    pub fn current_delay(&self) -> Duration {
        match self.backoff {
            FailureBackoff::None => self.base_interval,
            FailureBackoff::Exponential { max } => {
                if self.consecutive_failures == 0 {
                    return self.base_interval;
                }
                let factor = 2u32.saturating_pow(self.consecutive_failures.min(16));
                self.base_interval.saturating_mul(factor).min(max)
            }
        }
    }

    /// Get time until the next poll; `None` while stopped
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.next_due
            .map(|due| due.saturating_duration_since(now))
    }
}
