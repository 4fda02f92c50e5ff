//! # Message Store
//!
//! Read-through cache of one conversation. The backend snapshot is the
//! source of truth: every successful poll replaces the store content with
//! the snapshot rather than merging into it.
//!
//! ## Reconciliation rules
//!
//! - Entries that fail the two-party invariants, or belong to another
//!   conversation, are dropped and logged.
//! - Duplicate ids collapse to their first occurrence.
//! - Output is ordered by (timestamp, id) ascending. Snapshots already in that
//!   order are taken as-is; otherwise they are stable-sorted on that pair.
//! - `read` never goes back from `true` to `false` within one conversation.
//! - Reconciling an identical snapshot leaves the store, including its
//!   revision, untouched.

use std::collections::HashSet;

use crate::shared::messaging::{ConversationKey, Message, MessageId, UserId};

/// Result of one reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No active key; the store was emptied
    Skipped,
    /// Content is identical to what was already held
    Unchanged { dropped: usize },
    /// Content was replaced
    Replaced { dropped: usize },
}

impl ReconcileOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, ReconcileOutcome::Replaced { .. })
    }

    pub fn dropped(&self) -> usize {
        match self {
            ReconcileOutcome::Skipped => 0,
            ReconcileOutcome::Unchanged { dropped } | ReconcileOutcome::Replaced { dropped } => {
                *dropped
            }
        }
    }
}

/// Ordered messages of the active conversation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageStore {
    key: Option<ConversationKey>,
    messages: Vec<Message>,
    /// Bumped whenever visible content changes
    revision: u64,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(&self) -> Option<ConversationKey> {
        self.key
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Inbound messages `user` has not acknowledged yet
    pub fn unread_inbound(&self, user: UserId) -> impl Iterator<Item = &Message> + '_ {
        self.messages.iter().filter(move |m| m.is_unread_for(user))
    }

    pub fn unread_inbound_count(&self, user: UserId) -> usize {
        self.unread_inbound(user).count()
    }

    /// Point the store at a new conversation, discarding everything it held.
    pub fn reset(&mut self, key: Option<ConversationKey>) {
        if self.key == key {
            return;
        }
        self.key = key;
        if !self.messages.is_empty() {
            self.messages.clear();
            self.revision += 1;
        }
    }

    /// Replace the store content with `snapshot`.
    pub fn reconcile(&mut self, snapshot: Vec<Message>, current_user: UserId) -> ReconcileOutcome {
        let Some(key) = self.key else {
            if !self.messages.is_empty() {
                self.messages.clear();
                self.revision += 1;
            }
            return ReconcileOutcome::Skipped;
        };

        let (mut next, dropped) = normalize_snapshot(snapshot, key, current_user);
        if dropped > 0 {
            tracing::warn!(conversation = %key, dropped, "dropped snapshot entries outside this conversation");
        }

        // Keep read receipts monotonic against the previous content.
        let already_read: HashSet<MessageId> = self
            .messages
            .iter()
            .filter(|m| m.read)
            .map(|m| m.id)
            .collect();
        for message in next.iter_mut().filter(|m| !m.read) {
            if already_read.contains(&message.id) {
                message.read = true;
            }
        }

        if next == self.messages {
            return ReconcileOutcome::Unchanged { dropped };
        }
        self.messages = next;
        self.revision += 1;
        ReconcileOutcome::Replaced { dropped }
    }
}

/// Filter, deduplicate and order a raw snapshot for `key`.
///
/// Returns the visible sequence and how many entries were dropped.
pub fn normalize_snapshot(
    snapshot: Vec<Message>,
    key: ConversationKey,
    current_user: UserId,
) -> (Vec<Message>, usize) {
    let total = snapshot.len();
    let mut seen = HashSet::with_capacity(total);
    let mut kept: Vec<Message> = snapshot
        .into_iter()
        .filter(|m| m.check_invariants(current_user).is_ok())
        .filter(|m| key.contains(m, current_user))
        .filter(|m| seen.insert(m.id))
        .collect();
    let dropped = total - kept.len();

    let in_order = kept
        .windows(2)
        .all(|pair| pair[0].order_key() <= pair[1].order_key());
    if !in_order {
        kept.sort_by_key(Message::order_key);
    }
    (kept, dropped)
}
