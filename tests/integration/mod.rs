//! Integration tests
//!
//! Engine behaviour against an in-memory backend, the REST client against
//! wiremock, and configuration loading.

mod config_test;
mod http_api_test;
