//! # Poll Synchronizer
//!
//! Keeps the [`MessageStore`] of the active conversation in step with the
//! backend by polling it on a fixed interval.
//!
//! The synchronizer itself does no I/O. A poll is split in two:
//! [`PollSynchronizer::begin_fetch`] hands out a [`FetchTicket`] for the
//! active key, and [`PollSynchronizer::complete_fetch`] applies the response
//! for that ticket. Between the two the caller is free to await the backend
//! without holding any lock, so the user can switch conversations while a
//! request is outstanding.
//!
//! ## Guarantees
//!
//! - At most one fetch is outstanding; triggers that arrive meanwhile are
//!   coalesced into one follow-up poll.
//! - Every activation and teardown bumps a generation counter. A response
//!   whose ticket carries an older generation is discarded, even if it is the
//!   most recently completed request.
//! - A failed fetch leaves the store as it was and keeps the schedule running.
//! - A ticket whose request is never answered, because the future awaiting it
//!   was dropped, is handed back with [`PollSynchronizer::abandon_fetch`] so
//!   the next poll can start. Read-acknowledgement claims are released the
//!   same way, and are forgotten whenever the generation changes.
//!
//! The async driver lives in [`background`].

pub mod background;
pub mod metrics;
pub mod scheduler;
pub mod sync_state;

use chrono::Utc;
use std::time::Duration;
use tokio::time::Instant;

use crate::client::api::ApiError;
use crate::client::config::Config;
use crate::client::messaging::receipts::ReadReceiptTracker;
use crate::client::messaging::store::MessageStore;
use crate::shared::config::FailureBackoff;
use crate::shared::messaging::{ConversationKey, Message, MessageId, UserId};

pub use background::{PollResult, SyncService, SyncServiceError};
pub use metrics::SyncMetrics;
pub use scheduler::PollScheduler;
pub use sync_state::{LastFetch, SyncPhase, SyncStatus};

/// Permission to apply one snapshot, issued by [`PollSynchronizer::begin_fetch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    key: ConversationKey,
    generation: u64,
    seq: u64,
    started: Instant,
}

impl FetchTicket {
    pub fn key(&self) -> ConversationKey {
        self.key
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// What applying a fetch result did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Snapshot applied; the listed messages need a read-acknowledgement
    Reconciled {
        changed: bool,
        to_acknowledge: Vec<MessageId>,
    },
    /// Fetch failed; the store was left untouched
    Failed { error: ApiError },
    /// The ticket was superseded; nothing was applied
    Discarded,
}

#[derive(Debug)]
pub struct PollSynchronizer {
    current_user: UserId,
    phase: SyncPhase,
    generation: u64,
    next_seq: u64,
    /// Sequence number of the outstanding fetch
    in_flight: Option<u64>,
    rerun_requested: bool,
    store: MessageStore,
    receipts: ReadReceiptTracker,
    scheduler: PollScheduler,
    metrics: SyncMetrics,
    last_fetch: Option<LastFetch>,
}

impl PollSynchronizer {
    pub fn new(current_user: UserId, interval: Duration, backoff: FailureBackoff) -> Self {
        Self {
            current_user,
            phase: SyncPhase::Idle,
            generation: 0,
            next_seq: 0,
            in_flight: None,
            rerun_requested: false,
            store: MessageStore::new(),
            receipts: ReadReceiptTracker::new(),
            scheduler: PollScheduler::new(interval, backoff),
            metrics: SyncMetrics::new(),
            last_fetch: None,
        }
    }

    pub fn from_config(current_user: UserId, config: &Config) -> Self {
        Self::new(current_user, config.poll_interval(), config.failure_backoff())
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn key(&self) -> Option<ConversationKey> {
        self.store.key()
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn messages(&self) -> &[Message] {
        self.store.messages()
    }

    pub fn receipts(&self) -> &ReadReceiptTracker {
        &self.receipts
    }

    pub fn metrics(&self) -> &SyncMetrics {
        &self.metrics
    }

    pub fn has_fetch_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            phase: self.phase,
            last_fetch: self.last_fetch.clone(),
            consecutive_failures: self.scheduler.consecutive_failures(),
            metrics: self.metrics.clone(),
        }
    }

    /// Point the synchronizer at `key`.
    ///
    /// `None` goes to Idle. Activating the key that is already active is a
    /// no-op. A different key discards the store, invalidates any outstanding
    /// fetch and schedules an immediate poll. Returns whether anything changed.
    pub fn activate(&mut self, key: Option<ConversationKey>, now: Instant) -> bool {
        let Some(key) = key else {
            let was_active = self.phase != SyncPhase::Idle;
            self.go_idle();
            return was_active;
        };
        if self.phase != SyncPhase::Idle && self.store.key() == Some(key) {
            return false;
        }

        self.generation += 1;
        self.in_flight = None;
        self.rerun_requested = false;
        self.store.reset(Some(key));
        self.receipts.reset();
        self.last_fetch = None;
        self.phase = SyncPhase::Scheduled;
        self.scheduler.start(now);
        tracing::info!(conversation = %key, generation = self.generation, "conversation activated");
        true
    }

    /// Stop polling and discard whatever is outstanding.
    pub fn teardown(&mut self) {
        if self.phase != SyncPhase::Idle {
            tracing::debug!(generation = self.generation, "synchronizer torn down");
        }
        self.go_idle();
    }

    fn go_idle(&mut self) {
        self.generation += 1;
        self.in_flight = None;
        self.rerun_requested = false;
        self.store.reset(None);
        self.receipts.reset();
        self.last_fetch = None;
        self.phase = SyncPhase::Idle;
        self.scheduler.stop();
    }

    /// Explicit trigger (message sent, manual refresh): poll as soon as possible.
    pub fn trigger(&mut self, now: Instant) {
        if self.phase == SyncPhase::Idle {
            return;
        }
        self.scheduler.request_immediate(now);
        if self.in_flight.is_some() {
            self.rerun_requested = true;
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.phase != SyncPhase::Idle && self.in_flight.is_none() && self.scheduler.is_due(now)
    }

    /// Time until the next scheduled poll; `None` while Idle.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        if self.phase == SyncPhase::Idle {
            return None;
        }
        self.scheduler.time_until_due(now)
    }

    /// Start a fetch for the active key.
    ///
    /// Returns `None` while Idle or while another fetch is outstanding; in the
    /// latter case a follow-up poll is requested instead.
    pub fn begin_fetch(&mut self, now: Instant) -> Option<FetchTicket> {
        if self.phase == SyncPhase::Idle {
            return None;
        }
        let key = self.store.key()?;
        if self.in_flight.is_some() {
            self.rerun_requested = true;
            return None;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.in_flight = Some(seq);
        self.phase = SyncPhase::Fetching;
        self.metrics.record_fetch_start();
        Some(FetchTicket {
            key,
            generation: self.generation,
            seq,
            started: now,
        })
    }

    /// Apply the result of the fetch started with `ticket`.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Message>, ApiError>,
        now: Instant,
    ) -> FetchOutcome {
        if ticket.generation != self.generation || self.in_flight != Some(ticket.seq) {
            self.metrics.record_fetch_discarded();
            tracing::debug!(
                conversation = %ticket.key,
                seq = ticket.seq,
                "discarding response for superseded conversation"
            );
            return FetchOutcome::Discarded;
        }
        self.in_flight = None;

        let outcome = match result {
            Ok(snapshot) => {
                let reconciled = self.store.reconcile(snapshot, self.current_user);
                self.phase = SyncPhase::Reconciled;
                self.metrics.record_fetch_success(ticket.started, now);
                self.scheduler.record_success(now);
                self.last_fetch = Some(LastFetch::Reconciled { at: Utc::now() });
                let to_acknowledge = self.receipts.claim_pending(&self.store, self.current_user);
                FetchOutcome::Reconciled {
                    changed: reconciled.changed(),
                    to_acknowledge,
                }
            }
            Err(error) => {
                self.phase = SyncPhase::Failed;
                self.metrics.record_fetch_failure();
                self.scheduler.record_failure(now);
                tracing::warn!(
                    conversation = %ticket.key,
                    error = %error,
                    consecutive_failures = self.scheduler.consecutive_failures(),
                    "message poll failed, keeping last snapshot"
                );
                self.last_fetch = Some(LastFetch::Failed {
                    at: Utc::now(),
                    error: error.to_string(),
                });
                FetchOutcome::Failed { error }
            }
        };

        self.phase = SyncPhase::Scheduled;
        if self.rerun_requested {
            self.scheduler.request_immediate(now);
        }
        outcome
    }

    /// Give up on the fetch started with `ticket` without applying anything.
    ///
    /// For a current ticket the outstanding slot is freed and the poll is
    /// rescheduled immediately. A superseded ticket is ignored. Returns
    /// whether the ticket was current.
    pub fn abandon_fetch(&mut self, ticket: FetchTicket, now: Instant) -> bool {
        if ticket.generation != self.generation || self.in_flight != Some(ticket.seq) {
            return false;
        }
        self.in_flight = None;
        self.rerun_requested = false;
        self.phase = SyncPhase::Scheduled;
        self.scheduler.request_immediate(now);
        self.metrics.record_fetch_discarded();
        tracing::debug!(conversation = %ticket.key, seq = ticket.seq, "fetch abandoned before completion");
        true
    }

    /// Whether a trigger arrived while the last fetch was outstanding. Clears the flag.
    pub fn take_rerun(&mut self) -> bool {
        std::mem::take(&mut self.rerun_requested)
    }

    /// Record the result of a read-acknowledgement claimed by the pass that
    /// held `ticket`. Answers from an earlier generation only count in metrics.
    pub fn complete_ack(&mut self, ticket: FetchTicket, id: MessageId, result: &Result<(), ApiError>) {
        self.metrics.record_ack(result.is_ok());
        if ticket.generation != self.generation {
            return;
        }
        match result {
            Ok(()) => self.receipts.complete(id, true),
            Err(e) => {
                tracing::warn!(message_id = %id, error = %e, "read acknowledgement failed, will retry");
                self.receipts.complete(id, false);
            }
        }
    }

    /// Release acknowledgements that were claimed but never answered, so the
    /// next pass claims them again.
    pub fn abandon_acks(&mut self, ticket: FetchTicket, ids: &[MessageId]) {
        if ticket.generation != self.generation {
            return;
        }
        for id in ids {
            self.receipts.complete(*id, false);
        }
    }
}
