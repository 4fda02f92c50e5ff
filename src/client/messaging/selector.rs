//! Conversation Selector
//!
//! Holds the one active counterpart of a session and turns it into a
//! [`ConversationKey`] once a pregnancy scope can be resolved.

use super::directory::ContactDirectory;
use crate::shared::messaging::{ConversationKey, CurrentUser, Role, UserId};

/// What a selection call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    /// The requested counterpart was already active
    Unchanged,
    /// The active counterpart changed (from `None` on first selection)
    Switched {
        previous: Option<UserId>,
        current: UserId,
    },
    /// The selection was cleared
    Cleared { previous: UserId },
}

impl SelectionChange {
    pub fn is_change(&self) -> bool {
        !matches!(self, SelectionChange::Unchanged)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationSelector {
    active: Option<UserId>,
}

impl ConversationSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<UserId> {
        self.active
    }

    /// Activate `counterpart`. Selecting the active counterpart again is a no-op.
    pub fn select(&mut self, counterpart: UserId) -> SelectionChange {
        if self.active == Some(counterpart) {
            return SelectionChange::Unchanged;
        }
        let previous = self.active.replace(counterpart);
        SelectionChange::Switched {
            previous,
            current: counterpart,
        }
    }

    pub fn clear(&mut self) -> SelectionChange {
        match self.active.take() {
            Some(previous) => SelectionChange::Cleared { previous },
            None => SelectionChange::Unchanged,
        }
    }

    /// Pick the first directory entry when nothing is selected yet.
    pub fn auto_select(&mut self, directory: &ContactDirectory) -> SelectionChange {
        if self.active.is_some() {
            return SelectionChange::Unchanged;
        }
        match directory.first() {
            Some(contact) => self.select(contact.user_id),
            None => SelectionChange::Unchanged,
        }
    }

    /// Re-validate the selection after the directory was reloaded: a
    /// counterpart that disappeared is dropped and the first entry, if any,
    /// takes its place.
    pub fn reconcile_with(&mut self, directory: &ContactDirectory) -> SelectionChange {
        match self.active {
            Some(active) if directory.get(active).is_some() => SelectionChange::Unchanged,
            Some(previous) => match directory.first() {
                Some(first) => {
                    self.active = Some(first.user_id);
                    SelectionChange::Switched {
                        previous: Some(previous),
                        current: first.user_id,
                    }
                }
                None => self.clear(),
            },
            None => self.auto_select(directory),
        }
    }

    /// Resolve the active conversation key.
    ///
    /// Clinicians take the pregnancy from the selected patient; patients use
    /// their own pregnancy and fall back to the contact's.
    pub fn resolve_key(
        &self,
        user: &CurrentUser,
        directory: &ContactDirectory,
    ) -> Option<ConversationKey> {
        let counterpart = self.active?;
        let contact_pregnancy = directory.get(counterpart).and_then(|c| c.pregnancy_id);
        let pregnancy = match user.role {
            Role::Clinician => contact_pregnancy,
            Role::Patient => user.pregnancy_id.or(contact_pregnancy),
        }?;
        Some(ConversationKey::new(pregnancy, counterpart))
    }
}
