//! Integration tests against a live PostgreSQL (`DATABASE_URL`) and a running server.
//!
//! Run with: cargo test -- --ignored

mod api_tests;
mod common;
mod ledger_tests;
mod registry_tests;
