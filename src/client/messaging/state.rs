//! Messaging State
//!
//! The session context of one signed-in user. It owns the directory, the
//! selector, the composer draft and the synchronizer (which in turn owns the
//! message store). Every mutation goes through a method here; nothing is
//! shared globally.

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use super::composer::Composer;
use super::directory::ContactDirectory;
use super::selector::{ConversationSelector, SelectionChange};
use crate::client::config::Config;
use crate::client::sync::{PollSynchronizer, SyncPhase, SyncStatus};
use crate::shared::error::SharedError;
use crate::shared::messaging::{Contact, ConversationKey, CurrentUser, Message, UserId};

/// Everything the presentation layer renders, captured at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationView {
    pub contacts: Vec<Contact>,
    pub directory_error: Option<String>,
    pub active_counterpart: Option<UserId>,
    pub active_key: Option<ConversationKey>,
    pub messages: Vec<Message>,
    /// Changes whenever `messages` changes
    pub revision: u64,
    pub unread_count: usize,
    pub draft: String,
    pub status: SyncStatus,
}

impl ConversationView {
    /// First load of a conversation: fetching with nothing to show yet
    pub fn is_loading(&self) -> bool {
        self.status.phase == SyncPhase::Fetching && self.messages.is_empty()
    }

    pub fn is_fetching(&self) -> bool {
        self.status.is_fetching()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.status.last_error()
    }

    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        self.status.last_synced_at()
    }

    pub fn active_contact(&self) -> Option<&Contact> {
        let active = self.active_counterpart?;
        self.contacts.iter().find(|c| c.user_id == active)
    }
}

/// The main state for one messaging session
#[derive(Debug)]
pub struct MessagingSession {
    user: CurrentUser,
    directory: ContactDirectory,
    selector: ConversationSelector,
    composer: Composer,
    sync: PollSynchronizer,
}

impl MessagingSession {
    pub fn new(user: CurrentUser, config: &Config) -> Self {
        let sync = PollSynchronizer::from_config(user.id, config);
        Self::with_synchronizer(user, sync)
    }

    pub fn with_synchronizer(user: CurrentUser, sync: PollSynchronizer) -> Self {
        Self {
            user,
            directory: ContactDirectory::new(),
            selector: ConversationSelector::new(),
            composer: Composer::new(),
            sync,
        }
    }

    pub fn user(&self) -> &CurrentUser {
        &self.user
    }

    pub fn directory(&self) -> &ContactDirectory {
        &self.directory
    }

    pub fn active_counterpart(&self) -> Option<UserId> {
        self.selector.active()
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut Composer {
        &mut self.composer
    }

    pub fn sync(&self) -> &PollSynchronizer {
        &self.sync
    }

    pub fn sync_mut(&mut self) -> &mut PollSynchronizer {
        &mut self.sync
    }

    /// The (pregnancy, counterpart) key of the active conversation, if resolvable
    pub fn active_key(&self) -> Option<ConversationKey> {
        self.selector.resolve_key(&self.user, &self.directory)
    }

    /// Install a freshly loaded directory. Auto-selects the first contact
    /// when nothing is selected and drops a selection that disappeared.
    pub fn set_directory(&mut self, directory: ContactDirectory, now: Instant) -> SelectionChange {
        self.directory = directory;
        let change = self.selector.reconcile_with(&self.directory);
        self.apply_selection(now);
        change
    }

    /// Make `counterpart` the active conversation.
    ///
    /// Selecting the counterpart that is already active changes nothing,
    /// unless polling was torn down, in which case it starts again.
    pub fn select(
        &mut self,
        counterpart: UserId,
        now: Instant,
    ) -> Result<SelectionChange, SharedError> {
        if self.directory.get(counterpart).is_none() {
            return Err(SharedError::UnknownContact(counterpart));
        }
        let change = self.selector.select(counterpart);
        if change.is_change() || self.sync.phase() == SyncPhase::Idle {
            self.apply_selection(now);
        }
        Ok(change)
    }

    pub fn clear_selection(&mut self, now: Instant) -> SelectionChange {
        let change = self.selector.clear();
        self.apply_selection(now);
        change
    }

    /// Push the selector's key into the synchronizer. Returns whether the
    /// active conversation changed.
    fn apply_selection(&mut self, now: Instant) -> bool {
        let key = self.active_key();
        if key.is_none() && self.selector.active().is_some() {
            tracing::warn!(
                counterpart = ?self.selector.active(),
                "no pregnancy scope for selected contact, conversation stays inactive"
            );
        }
        self.sync.activate(key, now)
    }

    /// Re-activate the selected conversation after a teardown. Returns
    /// whether polling started again.
    pub fn resume(&mut self, now: Instant) -> bool {
        self.apply_selection(now)
    }

    /// Stop polling and forget the loaded messages. The selection survives
    /// so [`resume`](Self::resume) can pick it up again.
    pub fn teardown(&mut self) {
        self.sync.teardown();
    }

    pub fn view(&self) -> ConversationView {
        ConversationView {
            contacts: self.directory.contacts().to_vec(),
            directory_error: self.directory.last_error().map(str::to_string),
            active_counterpart: self.selector.active(),
            active_key: self.sync.key(),
            messages: self.sync.messages().to_vec(),
            revision: self.sync.store().revision(),
            unread_count: self.sync.store().unread_inbound_count(self.user.id),
            draft: self.composer.draft().to_string(),
            status: self.sync.status(),
        }
    }
}
