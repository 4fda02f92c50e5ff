//! Messaging Data Errors
//!
//! Errors raised by the data model itself, before anything reaches the
//! network: a body that cannot be sent, a message that breaks the two-party
//! rules of a conversation, or a counterpart outside the directory.
//!
//! ```rust
//! use maternity_messaging::shared::error::SharedError;
//! use maternity_messaging::shared::messaging::validate_body;
//!
//! let error = validate_body("   ").unwrap_err();
//! assert!(matches!(error, SharedError::Validation { field: "message", .. }));
//! ```
use thiserror::Error;

use crate::shared::messaging::{MessageId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SharedError {
    /// Input rejected before it became a request
    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// A message that cannot belong to any conversation of the current user
    #[error("Message {id} {violation}")]
    InvariantViolation { id: MessageId, violation: Violation },

    #[error("{0} is not in the contact directory")]
    UnknownContact(UserId),
}

/// Which two-party rule a message breaks
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    #[error("is addressed to its own sender")]
    SelfAddressed,
    #[error("does not involve the current user")]
    NotAParty,
    #[error("has an empty body")]
    EmptyBody,
}

impl SharedError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn violation(id: MessageId, violation: Violation) -> Self {
        Self::InvariantViolation { id, violation }
    }
}
