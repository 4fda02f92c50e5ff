//! Messaging Module
//!
//! This module contains the data structures of the secure messaging system:
//!
//! - `CurrentUser`, `Role` and the id newtypes - who is talking
//! - `Contact` - a counterpart from the directory
//! - `Message` - one message of a two-party thread
//! - `ConversationKey` - the (pregnancy, counterpart) pair naming a thread
//!
//! # Usage
//!
//! ```rust
//! use maternity_messaging::shared::messaging::{Contact, ConversationKey, Message, Role};
//! ```

pub mod contact;
pub mod conversation;
pub mod message;
pub mod user;

// Re-export all types
pub use contact::Contact;
pub use conversation::ConversationKey;
pub use message::{validate_body, Message, MessageId, SendMessageRequest, MAX_BODY_CHARS};
pub use user::{CurrentUser, PregnancyId, Role, UserId};
