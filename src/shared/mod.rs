//! Shared Module
//!
//! This module contains types and data structures that are shared between
//! the messaging engine and the portal backend. These types are used for
//! serialization over the portal's REST API.
//!
//! # Overview
//!
//! The shared module provides transport-agnostic types. Nothing in here
//! performs I/O.

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Messaging types: users, contacts, messages, conversation keys
pub mod messaging;

/// Re-export commonly used types for convenience
pub use config::{AppConfig, AppConfigBuilder, ConfigError, FailureBackoff};
pub use error::{SharedError, Violation};
