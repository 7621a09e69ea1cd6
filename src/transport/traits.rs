//! Transport trait definitions and common types.
//!
//! A [`Connector`] opens [`Channel`]s to an [`Endpoint`]. A channel carries
//! one request/response exchange at a time; the `&mut self` receiver on
//! [`Channel::exchange`] makes a second concurrent write on the same channel
//! impossible.

use bytes::Bytes;
use url::Url;

use crate::config::{Endpoint, PoolConfig};
use crate::request::{Headers, Method};
use crate::response::RawResponse;
use crate::Error;

// ============================================================================
// Wire Request
// ============================================================================

/// A fully addressed request with the standard headers applied.
#[derive(Debug, Clone)]
pub struct WireRequest {
    /// Correlation id, also sent as `X-Request-Id`.
    pub request_id: String,
    /// Request method.
    pub method: Method,
    /// Absolute URL, query included.
    pub url: Url,
    /// Every header to send.
    pub headers: Headers,
    /// Body bytes.
    pub body: Option<Bytes>,
}

// ============================================================================
// Channel
// ============================================================================

/// One duplex connection to the service.
///
/// Implementations report transport faults as [`Error`]s of kind
/// `Transport` or `Timeout` and mark themselves closed, so the pool discards
/// them instead of handing them out again.
#[async_trait::async_trait]
pub trait Channel: Send {
    /// Writes `request` and reads its response.
    async fn exchange(&mut self, request: &WireRequest) -> Result<RawResponse, Error>;

    /// Returns `false` once the channel has faulted or been closed.
    fn is_open(&self) -> bool;

    /// Closes the channel. Further exchanges fail.
    fn close(&mut self);
}

// ============================================================================
// Connector
// ============================================================================

/// Opens channels.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    /// Opens a new channel to `endpoint`.
    async fn connect(
        &self,
        endpoint: &Endpoint,
        config: &PoolConfig,
    ) -> Result<Box<dyn Channel>, Error>;
}
