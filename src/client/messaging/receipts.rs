//! Read-Receipt Tracker
//!
//! Decides which inbound messages need a read-acknowledgement after a
//! reconciliation, and makes sure each id has at most one acknowledgement
//! outstanding. An id stays tracked from the moment its acknowledgement is
//! claimed until a snapshot shows it as read; a failed or abandoned
//! acknowledgement releases the id so the next pass retries it.

use std::collections::HashMap;

use super::store::MessageStore;
use crate::shared::messaging::{MessageId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckState {
    /// Request issued, no answer yet
    InFlight,
    /// Backend accepted it; waiting for a snapshot to show `read == true`
    Acknowledged,
}

#[derive(Debug, Clone, Default)]
pub struct ReadReceiptTracker {
    tracked: HashMap<MessageId, AckState>,
}

impl ReadReceiptTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim every unread inbound message in `store` that is not already
    /// tracked. The caller must issue exactly one acknowledgement per
    /// returned id and report back through [`complete`](Self::complete).
    pub fn claim_pending(&mut self, store: &MessageStore, user: UserId) -> Vec<MessageId> {
        // Anything the snapshot now shows as read is done.
        for message in store.messages().iter().filter(|m| m.read) {
            self.tracked.remove(&message.id);
        }

        let mut claimed = Vec::new();
        for message in store.unread_inbound(user) {
            if !self.tracked.contains_key(&message.id) {
                self.tracked.insert(message.id, AckState::InFlight);
                claimed.push(message.id);
            }
        }
        claimed
    }

    /// Record the result of an acknowledgement request.
    pub fn complete(&mut self, id: MessageId, succeeded: bool) {
        match self.tracked.get_mut(&id) {
            Some(state) if succeeded => *state = AckState::Acknowledged,
            Some(_) => {
                self.tracked.remove(&id);
            }
            None => {}
        }
    }

    /// Forget every claim, outstanding or not. Called whenever the active
    /// conversation changes; answers for the old claims must not reach
    /// [`complete`](Self::complete) afterwards.
    pub fn reset(&mut self) {
        self.tracked.clear();
    }

    pub fn state(&self, id: MessageId) -> Option<AckState> {
        self.tracked.get(&id).copied()
    }

    pub fn in_flight(&self) -> usize {
        self.tracked
            .values()
            .filter(|s| **s == AckState::InFlight)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }
}
