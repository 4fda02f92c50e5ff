//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - An in-memory portal backend implementing `PortalApi`
//! - Message and contact fixtures
//! - Custom assertion macros

pub mod fake_api;
pub mod fixtures;

// Re-export commonly used utilities
pub use fake_api::*;
pub use fixtures::*;
