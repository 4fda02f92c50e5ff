//! Composer
//!
//! Validates outbound messages and submits them. A message is only sent when
//! a conversation key is resolved and the trimmed body is non-empty; anything
//! else is rejected before a request is made. Accepted messages are not
//! inserted locally: the caller triggers a poll and the next snapshot shows
//! them.

use thiserror::Error;

use crate::client::api::{ApiError, PortalApi};
use crate::shared::error::SharedError;
use crate::shared::messaging::{ConversationKey, Message, SendMessageRequest};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ComposeError {
    #[error("No active conversation")]
    NoActiveConversation,
    #[error("Message text cannot be empty")]
    EmptyBody,
    #[error(transparent)]
    Invalid(SharedError),
    #[error("Message was not sent: {0}")]
    Rejected(#[from] ApiError),
}

impl ComposeError {
    /// Whether the failure happened locally, before any request was made
    pub fn is_local(&self) -> bool {
        !matches!(self, ComposeError::Rejected(_))
    }
}

/// Draft holder and send gate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Composer {
    draft: String,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Clear the draft once the backend accepted it.
    pub fn consume_draft(&mut self) {
        self.draft.clear();
    }

    /// Build the request for `body`, or reject it without touching the network.
    pub fn prepare(
        key: Option<ConversationKey>,
        body: &str,
    ) -> Result<SendMessageRequest, ComposeError> {
        let key = key.ok_or(ComposeError::NoActiveConversation)?;
        if body.trim().is_empty() {
            return Err(ComposeError::EmptyBody);
        }
        SendMessageRequest::new(key.pregnancy_id, key.counterpart_id, body)
            .map_err(ComposeError::Invalid)
    }

    /// Submit a prepared request.
    pub async fn submit<A>(api: &A, request: &SendMessageRequest) -> Result<Message, ComposeError>
    where
        A: PortalApi + ?Sized,
    {
        match api.send_message(request).await {
            Ok(message) => {
                tracing::info!(message_id = %message.id, to_user_id = %request.to_user_id, "message sent");
                Ok(message)
            }
            Err(e) => {
                tracing::warn!(error = %e, to_user_id = %request.to_user_id, "message send failed");
                Err(ComposeError::Rejected(e))
            }
        }
    }
}
