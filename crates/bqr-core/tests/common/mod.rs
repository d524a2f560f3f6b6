//! Shared helpers for integration tests.

pub mod api_server;
