//! The client entry point.
//!
//! A [`Client`] owns a channel pool and the standard headers derived from
//! its configuration. Resource-specific APIs build an
//! [`Envelope`](crate::Envelope) and pass it to [`Client::send`] together
//! with a decoder.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docstore::{Client, Envelope, decode};
//! use serde_json::Value;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), docstore::Error> {
//! let client = Client::builder()
//!     .endpoint("https://api.example.com")
//!     .api_key("3f2b9c1e-5a7d-4e60-9f1a-2c8d7b6e4a10")
//!     .build()?;
//!
//! let user: Value = client
//!     .send(Envelope::get("users/alice").build(), decode::json())
//!     .await?;
//! println!("{}", user["name"]);
//! # Ok(())
//! # }
//! ```

mod builder;
mod inner;

pub use builder::{
    API_KEY_ENV, ClientBuilder, ENDPOINT_ENV, HasCredentials, HasEndpoint, NoCredentials,
    NoEndpoint,
};

use std::sync::Arc;

use crate::config::Endpoint;
use crate::dispatch::Dispatcher;
use crate::outcome::{Outcome, Paginated};
use crate::request::Envelope;
use crate::response::Decoder;
use crate::transport::PoolStats;

/// The document store client.
///
/// ## Thread Safety
///
/// `Client` is `Clone` and thread-safe. Clones share one channel pool, so
/// the pool limits apply across all of them.
#[derive(Clone)]
pub struct Client {
    inner: Arc<inner::ClientInner>,
}

impl Client {
    /// Creates a new client builder.
    pub fn builder() -> ClientBuilder<NoEndpoint, NoCredentials> {
        ClientBuilder::new()
    }

    /// Sends a request.
    ///
    /// Returns immediately with an [`Outcome`] that resolves to the decoded
    /// response, or to an error classified from the status and body. Must be
    /// called within a Tokio runtime.
    pub fn send<T, D>(&self, envelope: Envelope, decoder: D) -> Outcome<T>
    where
        T: Clone + Send + Sync + 'static,
        D: Decoder<T> + 'static,
    {
        self.inner.dispatcher().send(envelope, decoder)
    }

    /// Sends a request whose result can link to a following page.
    ///
    /// Use [`Outcome::next`] or [`Outcome::pages`] to walk the pages.
    pub fn send_paged<T, D>(&self, envelope: Envelope, decoder: D) -> Outcome<T>
    where
        T: Paginated + Clone + Send + Sync + 'static,
        D: Decoder<T> + 'static,
    {
        self.inner.dispatcher().send_paged(envelope, decoder)
    }

    /// Returns the configured endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        self.inner.dispatcher().pool().endpoint()
    }

    /// Returns channel pool counters.
    pub fn pool_stats(&self) -> PoolStats {
        self.inner.dispatcher().pool().stats()
    }

    /// Returns the dispatcher, for collaborators that need the wire form of
    /// a request.
    pub fn dispatcher(&self) -> &Dispatcher {
        self.inner.dispatcher()
    }

    /// Closes the channel pool.
    ///
    /// Idle channels are closed immediately; in-flight requests complete and
    /// their channels are closed on return. Later requests fail with
    /// `ChannelUnavailable`.
    pub fn close(&self) {
        self.inner.dispatcher().pool().close();
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.dispatcher().pool().is_closed()
    }

    pub(crate) fn from_inner(inner: inner::ClientInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint().to_string())
            .finish_non_exhaustive()
    }
}
