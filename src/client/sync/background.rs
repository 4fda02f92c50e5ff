//! # Background Sync Task
//!
//! Drives a [`MessagingSession`]'s synchronizer against a [`PortalApi`].
//!
//! The session sits behind a tokio mutex. The lock is taken to start a fetch
//! and again to apply its result, never across the request itself, so the
//! presentation layer can read and mutate state while a poll is outstanding.
//! Responses that arrive after the conversation changed are discarded by the
//! synchronizer's ticket check.
//!
//! A poll pass may be cancelled at any await point, by [`SyncService::stop`]
//! or by a caller dropping the future (a timeout, a `select!`). Whatever the
//! pass had claimed, the outstanding fetch or its unanswered
//! read-acknowledgements, is handed back to the synchronizer when that
//! happens, so the next pass starts cleanly.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::Mutex;
//! use maternity_messaging::client::api::HttpPortalApi;
//! use maternity_messaging::client::config::Config;
//! use maternity_messaging::client::messaging::state::MessagingSession;
//! use maternity_messaging::client::sync::SyncService;
//! use maternity_messaging::shared::messaging::{CurrentUser, UserId};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let session = MessagingSession::new(CurrentUser::clinician(UserId::new_v4()), &config);
//! let api = Arc::new(HttpPortalApi::new(config)?);
//! let mut service = SyncService::new(Arc::new(Mutex::new(session)), api);
//! service.start()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use futures_util::future::join_all;
use thiserror::Error;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::{FetchOutcome, FetchTicket};
use crate::client::api::{ApiError, PortalApi};
use crate::client::messaging::state::MessagingSession;
use crate::shared::messaging::MessageId;

/// How one poll pass ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult {
    /// Snapshot applied
    Applied { changed: bool, acknowledged: usize },
    /// Fetch failed; the previous snapshot stays visible
    Failed(ApiError),
    /// Conversation changed while the request was outstanding
    Discarded,
    /// Another fetch was already outstanding; it will run again when done
    Coalesced,
    /// No active conversation
    Idle,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncServiceError {
    #[error("Sync service is already running")]
    AlreadyRunning,
}

pub struct SyncService {
    session: Arc<Mutex<MessagingSession>>,
    api: Arc<dyn PortalApi>,
    wake: Arc<Notify>,
    background_task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for SyncService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncService")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl SyncService {
    pub fn new(session: Arc<Mutex<MessagingSession>>, api: Arc<dyn PortalApi>) -> Self {
        Self {
            session,
            api,
            wake: Arc::new(Notify::new()),
            background_task: None,
        }
    }

    pub fn session(&self) -> &Arc<Mutex<MessagingSession>> {
        &self.session
    }

    pub fn api(&self) -> &Arc<dyn PortalApi> {
        &self.api
    }

    pub fn is_running(&self) -> bool {
        self.background_task
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Spawn the poll loop. Must be called from within a tokio runtime.
    ///
    /// The loop first re-activates the selected conversation, so a service
    /// stopped with [`stop`](Self::stop) picks up where it left off.
    pub fn start(&mut self) -> Result<(), SyncServiceError> {
        if self.is_running() {
            return Err(SyncServiceError::AlreadyRunning);
        }

        let session = Arc::clone(&self.session);
        let api = Arc::clone(&self.api);
        let wake = Arc::clone(&self.wake);
        let handle = tokio::spawn(async move {
            Self::poll_loop(session, api, wake).await;
        });
        self.background_task = Some(handle);
        tracing::debug!("sync loop started");
        Ok(())
    }

    /// Stop the loop and tear the session's synchronizer down. Any response
    /// still in flight is discarded when it arrives.
    pub async fn stop(&mut self) {
        if let Some(handle) = self.background_task.take() {
            handle.abort();
        }
        self.session.lock().await.teardown();
        tracing::debug!("sync loop stopped");
    }

    /// Ask for a poll as soon as possible. Coalesces with an outstanding fetch.
    pub async fn trigger(&self) {
        self.session.lock().await.sync_mut().trigger(Instant::now());
        self.wake.notify_one();
    }

    /// Wake the loop after the session was changed from outside, e.g. a new
    /// conversation was activated.
    pub fn notify(&self) {
        self.wake.notify_one();
    }

    /// Run one poll pass now, plus any follow-up requested while it ran.
    pub async fn poll_once(&self) -> PollResult {
        let result = Self::poll(&self.session, self.api.as_ref(), &self.wake).await;
        self.wake.notify_one();
        result
    }

    async fn poll_loop(session: Arc<Mutex<MessagingSession>>, api: Arc<dyn PortalApi>, wake: Arc<Notify>) {
        if session.lock().await.resume(Instant::now()) {
            tracing::debug!("selected conversation resumed");
        }
        loop {
            let (delay, busy) = {
                let guard = session.lock().await;
                let sync = guard.sync();
                (sync.time_until_due(Instant::now()), sync.has_fetch_in_flight())
            };

            match delay {
                // The caller that owns the outstanding fetch wakes us when done
                _ if busy => wake.notified().await,
                None => wake.notified().await,
                Some(delay) if !delay.is_zero() => {
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = wake.notified() => {}
                    }
                }
                Some(_) => {
                    let result = Self::poll(&session, api.as_ref(), &wake).await;
                    tracing::trace!(?result, "poll pass finished");
                }
            }
        }
    }

    async fn poll(
        session: &Arc<Mutex<MessagingSession>>,
        api: &dyn PortalApi,
        wake: &Arc<Notify>,
    ) -> PollResult {
        let mut result = Self::poll_pass(session, api, wake).await;
        while matches!(result, PollResult::Applied { .. } | PollResult::Failed(_))
            && session.lock().await.sync_mut().take_rerun()
        {
            result = Self::poll_pass(session, api, wake).await;
        }
        result
    }

    async fn poll_pass(
        session: &Arc<Mutex<MessagingSession>>,
        api: &dyn PortalApi,
        wake: &Arc<Notify>,
    ) -> PollResult {
        let ticket = {
            let mut guard = session.lock().await;
            match guard.sync_mut().begin_fetch(Instant::now()) {
                Some(ticket) => ticket,
                None if guard.sync().has_fetch_in_flight() => return PollResult::Coalesced,
                None => return PollResult::Idle,
            }
        };
        let mut pass = PassGuard::new(session, wake, ticket);

        let response = api.fetch_messages(ticket.key()).await;

        let outcome = {
            let mut guard = session.lock().await;
            pass.settle();
            guard
                .sync_mut()
                .complete_fetch(ticket, response, Instant::now())
        };

        match outcome {
            FetchOutcome::Reconciled {
                changed,
                to_acknowledge,
            } => {
                let acknowledged = to_acknowledge.len();
                if acknowledged > 0 {
                    pass.awaiting_acks(to_acknowledge.clone());
                    let results = join_all(to_acknowledge.iter().map(|id| api.mark_read(*id))).await;
                    let mut guard = session.lock().await;
                    pass.settle();
                    for (id, result) in to_acknowledge.into_iter().zip(results) {
                        guard.sync_mut().complete_ack(ticket, id, &result);
                    }
                }
                PollResult::Applied {
                    changed,
                    acknowledged,
                }
            }
            FetchOutcome::Failed { error } => PollResult::Failed(error),
            FetchOutcome::Discarded => PollResult::Discarded,
        }
    }
}

/// What a poll pass still owes the synchronizer
#[derive(Debug)]
enum Outstanding {
    Fetch,
    Acks(Vec<MessageId>),
    Settled,
}

/// Hands an interrupted poll pass back to the synchronizer when dropped
/// before [`settle`](PassGuard::settle) is called.
struct PassGuard<'a> {
    session: &'a Arc<Mutex<MessagingSession>>,
    wake: &'a Arc<Notify>,
    ticket: FetchTicket,
    outstanding: Outstanding,
}

impl<'a> PassGuard<'a> {
    fn new(session: &'a Arc<Mutex<MessagingSession>>, wake: &'a Arc<Notify>, ticket: FetchTicket) -> Self {
        Self {
            session,
            wake,
            ticket,
            outstanding: Outstanding::Fetch,
        }
    }

    fn awaiting_acks(&mut self, ids: Vec<MessageId>) {
        self.outstanding = Outstanding::Acks(ids);
    }

    fn settle(&mut self) {
        self.outstanding = Outstanding::Settled;
    }
}

fn release_pass(session: &mut MessagingSession, ticket: FetchTicket, outstanding: Outstanding) {
    let sync = session.sync_mut();
    match outstanding {
        Outstanding::Fetch => {
            sync.abandon_fetch(ticket, Instant::now());
        }
        Outstanding::Acks(ids) => sync.abandon_acks(ticket, &ids),
        Outstanding::Settled => {}
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        let outstanding = std::mem::replace(&mut self.outstanding, Outstanding::Settled);
        if matches!(outstanding, Outstanding::Settled) {
            return;
        }
        let ticket = self.ticket;
        tracing::debug!(conversation = %ticket.key(), seq = ticket.seq(), "poll pass interrupted");

        if let Ok(mut guard) = self.session.try_lock() {
            release_pass(&mut guard, ticket, outstanding);
            drop(guard);
            self.wake.notify_one();
            return;
        }
        // The lock is busy; finish the release once it frees up
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let session = Arc::clone(self.session);
                let wake = Arc::clone(self.wake);
                handle.spawn(async move {
                    release_pass(&mut *session.lock().await, ticket, outstanding);
                    wake.notify_one();
                });
            }
            Err(_) => tracing::warn!(
                conversation = %ticket.key(),
                "no runtime to release an interrupted poll pass"
            ),
        }
    }
}

impl Drop for SyncService {
    fn drop(&mut self) {
        if let Some(handle) = self.background_task.take() {
            handle.abort();
        }
    }
}
