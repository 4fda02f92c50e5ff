//! Messaging Client
//!
//! Everything a signed-in patient or clinician needs to hold a conversation:
//!
//! - [`directory`] - the counterparts the user may message
//! - [`selector`] - which conversation is active
//! - [`store`] - the reconciled message list of the active conversation
//! - [`receipts`] - read-acknowledgement bookkeeping
//! - [`composer`] - draft handling and the send gate
//! - [`state`] - the session tying them together
//!
//! [`MessagingClient`] wraps a session and a [`SyncService`] behind an async
//! API for the presentation layer.

pub mod composer;
pub mod directory;
pub mod receipts;
pub mod selector;
pub mod state;
pub mod store;

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::client::api::PortalApi;
use crate::client::config::Config;
use crate::client::sync::{PollResult, SyncService, SyncServiceError};
use crate::shared::error::SharedError;
use crate::shared::messaging::{CurrentUser, Message, UserId};

pub use composer::{ComposeError, Composer};
pub use directory::ContactDirectory;
pub use selector::SelectionChange;
pub use state::{ConversationView, MessagingSession};

/// Async facade over one messaging session
#[derive(Debug)]
pub struct MessagingClient {
    session: Arc<Mutex<MessagingSession>>,
    service: SyncService,
}

impl MessagingClient {
    pub fn new(api: Arc<dyn PortalApi>, config: &Config, user: CurrentUser) -> Self {
        let session = Arc::new(Mutex::new(MessagingSession::new(user, config)));
        let service = SyncService::new(Arc::clone(&session), api);
        Self { session, service }
    }

    pub fn session(&self) -> &Arc<Mutex<MessagingSession>> {
        &self.session
    }

    fn api(&self) -> &dyn PortalApi {
        self.service.api().as_ref()
    }

    /// Start background polling of the active conversation.
    pub fn start(&mut self) -> Result<(), SyncServiceError> {
        self.service.start()
    }

    pub fn is_running(&self) -> bool {
        self.service.is_running()
    }

    /// Stop polling and drop the loaded messages. A later [`start`](Self::start)
    /// resumes the selected conversation.
    pub async fn shutdown(&mut self) {
        self.service.stop().await;
    }

    /// Load the contact directory and auto-select the first contact when
    /// nothing is selected yet.
    pub async fn load_contacts(&self) -> SelectionChange {
        let user = self.session.lock().await.user().clone();
        let directory = ContactDirectory::load(self.api(), &user).await;
        let (change, due) = {
            let mut session = self.session.lock().await;
            let now = Instant::now();
            let change = session.set_directory(directory, now);
            (change, session.sync().is_due(now))
        };
        if due {
            self.refresh_now().await;
        }
        change
    }

    /// Switch to the conversation with `counterpart` and fetch it immediately.
    pub async fn select(&self, counterpart: UserId) -> Result<SelectionChange, SharedError> {
        let (change, due) = {
            let mut session = self.session.lock().await;
            let now = Instant::now();
            let change = session.select(counterpart, now)?;
            (change, change.is_change() || session.sync().is_due(now))
        };
        if due {
            self.refresh_now().await;
        }
        Ok(change)
    }

    /// Send `body` to the active conversation, then refresh it.
    ///
    /// Empty or whitespace-only text is rejected without a request.
    pub async fn send(&self, body: &str) -> Result<Message, ComposeError> {
        let key = self.session.lock().await.active_key();
        let request = Composer::prepare(key, body)?;
        let message = Composer::submit(self.api(), &request).await?;
        self.sync_now().await;
        Ok(message)
    }

    /// Send the current draft. The draft is cleared only if the send
    /// succeeded and it was not edited in the meantime.
    pub async fn send_draft(&self) -> Result<Message, ComposeError> {
        let draft = self.session.lock().await.composer().draft().to_string();
        let message = self.send(&draft).await?;

        let mut session = self.session.lock().await;
        if session.composer().draft() == draft {
            session.composer_mut().consume_draft();
        }
        Ok(message)
    }

    pub async fn set_draft(&self, text: impl Into<String>) {
        self.session.lock().await.composer_mut().set_draft(text);
    }

    /// Poll the active conversation now. With the background loop running
    /// this only wakes it and returns `None`.
    pub async fn sync_now(&self) -> Option<PollResult> {
        if self.service.is_running() {
            self.service.trigger().await;
            return None;
        }
        self.session
            .lock()
            .await
            .sync_mut()
            .trigger(Instant::now());
        Some(self.service.poll_once().await)
    }

    /// A fresh conversation was activated; its first poll is already due.
    async fn refresh_now(&self) {
        if self.service.is_running() {
            self.service.notify();
        } else {
            let result = self.service.poll_once().await;
            tracing::debug!(?result, "initial conversation load");
        }
    }

    pub async fn view(&self) -> ConversationView {
        self.session.lock().await.view()
    }
}
