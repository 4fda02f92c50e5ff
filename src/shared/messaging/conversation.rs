//! Conversation Key
//!
//! Conversations are not persisted. A conversation is identified by the
//! pregnancy it belongs to and the counterpart the current user talks to.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::message::Message;
use super::user::{PregnancyId, UserId};

/// Identifies one message thread: (pregnancy, counterpart)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationKey {
    pub pregnancy_id: PregnancyId,
    pub counterpart_id: UserId,
}

impl ConversationKey {
    pub fn new(pregnancy_id: PregnancyId, counterpart_id: UserId) -> Self {
        Self {
            pregnancy_id,
            counterpart_id,
        }
    }

    /// Whether `message` belongs to this thread as seen by `current_user`
    pub fn contains(&self, message: &Message, current_user: UserId) -> bool {
        message.pregnancy_id == self.pregnancy_id
            && message.counterpart_of(current_user) == Some(self.counterpart_id)
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.pregnancy_id, self.counterpart_id)
    }
}
