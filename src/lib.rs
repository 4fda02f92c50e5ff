//! Maternity Messaging - Main Library
//!
//! The secure messaging engine of a maternity care portal. A patient and
//! their clinicians exchange messages scoped to one pregnancy; the engine
//! keeps the open conversation in step with the portal backend by polling.
//!
//! # Overview
//!
//! This library provides:
//! - A role-aware contact directory (patients see clinicians and vice versa)
//! - Conversation selection keyed by (pregnancy, counterpart)
//! - A message store that reconciles full snapshots from the backend
//! - Read-acknowledgement of inbound messages, exactly once per message
//! - A poll synchronizer that never applies a response for a conversation
//!   the user already left
//!
//! # Module Structure
//!
//! - **`shared`** - Types that go over the wire plus shared config and errors
//!   - Users, roles, contacts, messages, conversation keys
//!   - `AppConfig` and the failure backoff policy
//!
//! - **`client`** - The engine itself
//!   - `PortalApi` trait and its reqwest implementation
//!   - `MessagingSession` state and the `MessagingClient` facade
//!   - `PollSynchronizer` (sans-IO) and `SyncService` (tokio driver)
//!
//! # Feature Flags
//!
//! - **`cli`** (default) - builds the `portal-chat` terminal client and pulls
//!   in `tracing-subscriber`
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use maternity_messaging::client::{Config, HttpPortalApi, MessagingClient};
//! use maternity_messaging::shared::messaging::{CurrentUser, UserId};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let api = Arc::new(HttpPortalApi::new(config.clone())?);
//! let mut client = MessagingClient::new(api, &config, CurrentUser::clinician(UserId::new_v4()));
//!
//! client.load_contacts().await;
//! client.start()?;
//! client.send("Your scan results look normal.").await?;
//! let view = client.view().await;
//! println!("{} messages", view.messages.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod shared;
