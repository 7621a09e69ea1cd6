//! Integration tests for the docstore client.
//!
//! Everything runs in process: HTTP tests use a `wiremock` server on
//! localhost, the rest use the in-memory server and mock connector from
//! `docstore::testing`. No external service is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test --test integration
//!
//! # With client logs
//! RUST_LOG=docstore=debug cargo test --test integration -- --nocapture
//! ```

mod client_tests;
mod common;
mod correlation_tests;
mod outcome_tests;
mod pagination_tests;
mod patch_tests;
mod taxonomy_tests;
