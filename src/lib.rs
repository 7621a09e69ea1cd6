//! # docstore
//!
//! Async Rust client core for versioned JSON document store APIs.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docstore::prelude::*;
//! use serde_json::Value;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::builder()
//!         .endpoint("https://api.example.com")
//!         .api_key("3f2b9c1e-5a7d-4e60-9f1a-2c8d7b6e4a10")
//!         .build()?;
//!
//!     // Conditionally bump a counter, but only while the item is active.
//!     let patch = PatchDocument::builder()
//!         .test("/status", "active")
//!         .inc("/logins")
//!         .build();
//!     let outcome = client.send(
//!         Envelope::patch("users/alice").patch_body(&patch).build(),
//!         decode::raw(),
//!     );
//!
//!     match outcome.await {
//!         Ok(response) => println!("new ref: {:?}", response.etag_ref()),
//!         Err(err) if err.kind() == ErrorKind::TestAssertionFailed => {
//!             println!("not active: {:?}", err.failed_op());
//!         }
//!         Err(err) => return Err(err),
//!     }
//!
//!     // Walk a listing page by page.
//!     let mut page = client.send_paged(
//!         Envelope::get("users").query("limit", "50").build(),
//!         decode::json::<Page<Value>>(),
//!     );
//!     loop {
//!         println!("{} users", page.wait().await?.count);
//!         match page.next().await? {
//!             Some(next) => page = next,
//!             None => break,
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Key Concepts
//!
//! - **Envelope in, Outcome out**: [`Client::send`] takes an immutable
//!   [`Envelope`] and a [`Decoder`] and returns an [`Outcome`] at once.
//! - **One request per channel**: requests run on pooled channels, one
//!   exchange at a time each; pool size bounds concurrency.
//! - **Ordered classification**: error responses map to exactly one
//!   [`ErrorKind`] by a fixed, first-match rule table.
//! - **No retries**: failures are reported, never replayed.
//!
//! ## Features
//!
//! - `rest` (default): HTTP channels via reqwest
//! - `rustls` (default): Use rustls for TLS
//! - `native-tls`: Use native TLS (OpenSSL on Linux, Secure Transport on macOS)

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

// Core modules
pub mod auth;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod outcome;
pub mod patch;
pub mod request;
pub mod response;

// Channels and pooling
pub mod transport;

// Testing utilities
pub mod testing;

// Prelude for convenient imports
pub mod prelude;

mod user_agent;

// Re-export main types at crate root for convenience
pub use client::{Client, ClientBuilder};
pub use error::{Error, ErrorKind, Result};
pub use outcome::{Outcome, Page, Paginated};
pub use patch::{PatchBuilder, PatchDocument, PatchFailure, PatchOp, TestValue};
pub use request::{Envelope, EnvelopeBuilder, Headers, Method, StatusSet};
pub use response::{Decoder, ErrorDocument, ItemPath, RawResponse, classify, decode};

// Re-export auth types
pub use auth::{ApiKeyConfig, BearerCredentialsConfig, Credentials};

// Re-export config types
pub use config::{Endpoint, PoolConfig};

// Re-export transport types
#[cfg(feature = "rest")]
pub use transport::HttpConnector;
pub use transport::{Channel, Connector, PoolStats, WireRequest};
