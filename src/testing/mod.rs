//! Testing utilities.
//!
//! - [`MockConnector`]: channels answered by a closure, with counters for
//!   connects, exchanges and peak concurrency
//! - [`InMemoryServer`]: a small document store behind a [`MockConnector`],
//!   with conditional writes, patches and paged listing
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use docstore::{Client, Envelope, decode};
//! use docstore::testing::InMemoryServer;
//! use serde_json::{Value, json};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), docstore::Error> {
//! let server = InMemoryServer::new("test-key");
//! server.insert("users", "alice", json!({"name": "Alice"}));
//!
//! let client = Client::builder()
//!     .endpoint("https://store.test")
//!     .api_key("test-key")
//!     .connector(Arc::new(server.connector()))
//!     .build()?;
//!
//! let user: Value = client
//!     .send(Envelope::get("users/alice").build(), decode::json())
//!     .await?;
//! assert_eq!(user["name"], "Alice");
//! # Ok(())
//! # }
//! ```
//!
//! ## MockConnector vs InMemoryServer
//!
//! | Feature | MockConnector | InMemoryServer |
//! |---------|---------------|----------------|
//! | Scripted responses and faults | ✓ | ✗ |
//! | Concurrency counters | ✓ | ✓ (via its connector) |
//! | Stored items and refs | ✗ | ✓ |
//! | Patch evaluation | ✗ | ✓ |
//! | Best for | Unit tests | Integration tests |

mod mock_connector;
mod server;

pub use mock_connector::{MockConnector, MockReply, echo_response};
pub use server::InMemoryServer;
