//! Message Data Structure
//!
//! A message between one patient and one clinician inside a pregnancy scope.
//! Ids and timestamps are assigned by the backend; the client never mints
//! either.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::user::{PregnancyId, UserId};
use crate::shared::error::{SharedError, Violation};

/// Longest accepted message body, counted in chars after trimming
pub const MAX_BODY_CHARS: usize = 4000;

/// Server-assigned message id, increasing in server order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Represents a chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message ID
    pub id: MessageId,
    /// Pregnancy the conversation belongs to
    pub pregnancy_id: PregnancyId,
    /// User who sent the message
    pub from_user_id: UserId,
    /// User the message is addressed to
    pub to_user_id: UserId,
    /// Message text
    #[serde(rename = "message", alias = "body")]
    pub body: String,
    /// When the backend accepted the message
    pub timestamp: DateTime<Utc>,
    /// Whether the recipient has acknowledged the message
    #[serde(default)]
    pub read: bool,
}

impl Message {
    /// Whether this message was addressed to `user`
    pub fn is_inbound_for(&self, user: UserId) -> bool {
        self.to_user_id == user
    }

    /// Whether `user` still has to acknowledge this message
    pub fn is_unread_for(&self, user: UserId) -> bool {
        self.is_inbound_for(user) && !self.read
    }

    /// The other party, if `user` takes part in this message at all
    pub fn counterpart_of(&self, user: UserId) -> Option<UserId> {
        if self.from_user_id == user {
            Some(self.to_user_id)
        } else if self.to_user_id == user {
            Some(self.from_user_id)
        } else {
            None
        }
    }

    /// Sort key used for display order
    pub fn order_key(&self) -> (DateTime<Utc>, MessageId) {
        (self.timestamp, self.id)
    }

    /// Check the two-party invariants from the point of view of `current_user`.
    pub fn check_invariants(&self, current_user: UserId) -> Result<(), SharedError> {
        let violation = if self.from_user_id == self.to_user_id {
            Violation::SelfAddressed
        } else if self.counterpart_of(current_user).is_none() {
            Violation::NotAParty
        } else if self.body.trim().is_empty() {
            Violation::EmptyBody
        } else {
            return Ok(());
        };
        Err(SharedError::violation(self.id, violation))
    }

    /// Get a preview of the message (first N characters)
    pub fn preview(&self, max_len: usize) -> String {
        let body = self.body.trim();
        if body.chars().count() <= max_len {
            body.to_string()
        } else {
            let mut preview: String = body.chars().take(max_len.saturating_sub(3)).collect();
            preview.push_str("...");
            preview
        }
    }
}

/// Body of `POST /messages`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub pregnancy_id: PregnancyId,
    pub to_user_id: UserId,
    pub message: String,
}

impl SendMessageRequest {
    /// Build a request from raw composer input, trimming and validating the body.
    pub fn new(
        pregnancy_id: PregnancyId,
        to_user_id: UserId,
        body: &str,
    ) -> Result<Self, SharedError> {
        let message = validate_body(body)?;
        Ok(Self {
            pregnancy_id,
            to_user_id,
            message,
        })
    }
}

/// Trim a body and check it is sendable.
pub fn validate_body(body: &str) -> Result<String, SharedError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(SharedError::validation("message", "Message text cannot be empty"));
    }
    if trimmed.chars().count() > MAX_BODY_CHARS {
        return Err(SharedError::validation(
            "message",
            format!("Message text exceeds {} characters", MAX_BODY_CHARS),
        ));
    }
    Ok(trimmed.to_string())
}
