//! Client Module
//!
//! The portal-side messaging engine: the REST seam to the backend, the
//! client configuration, session state and the poll synchronizer.

/// Backend REST seam
pub mod api;

/// Client configuration (env, TOML file, token)
pub mod config;

/// Directory, selection, message store, receipts and composer
pub mod messaging;

/// Polling synchronization of the active conversation
pub mod sync;

pub use api::{ApiError, HttpPortalApi, PortalApi};
pub use config::Config;
pub use messaging::{ConversationView, MessagingClient, MessagingSession};
pub use sync::{PollResult, PollSynchronizer, SyncPhase, SyncService, SyncStatus};
