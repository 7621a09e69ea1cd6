//! Decoders turning a successful [`RawResponse`] into a typed value.
//!
//! Any `Fn(&RawResponse) -> Result<T, Error>` is a decoder, so
//! collaborators can pass closures directly:
//!
//! ```rust
//! use docstore::{Error, RawResponse, decode::Decoder};
//!
//! let ref_of = |response: &RawResponse| -> Result<String, Error> {
//!     response
//!         .etag_ref()
//!         .map(str::to_owned)
//!         .ok_or_else(|| Error::invalid_response("missing ETag"))
//! };
//! let response = RawResponse::new(201, Default::default(), "").with_header("ETag", "\"abc\"");
//! assert_eq!(ref_of.decode(&response).unwrap(), "abc");
//! ```

use serde::de::DeserializeOwned;

use super::RawResponse;
use crate::Error;

/// Interprets a raw success response as `T`.
pub trait Decoder<T>: Send + Sync {
    /// Decodes the response.
    fn decode(&self, response: &RawResponse) -> Result<T, Error>;
}

impl<T, F> Decoder<T> for F
where
    F: Fn(&RawResponse) -> Result<T, Error> + Send + Sync,
{
    fn decode(&self, response: &RawResponse) -> Result<T, Error> {
        self(response)
    }
}

/// Decodes the body as JSON.
pub fn json<T>() -> impl Decoder<T> + Clone + 'static
where
    T: DeserializeOwned + 'static,
{
    |response: &RawResponse| response.json::<T>()
}

/// Decodes a `404` as `None` and any other status as JSON.
///
/// Pair with an envelope that accepts `404`.
pub fn json_or_none<T>() -> impl Decoder<Option<T>> + Clone + 'static
where
    T: DeserializeOwned + 'static,
{
    |response: &RawResponse| {
        if response.status() == 404 {
            Ok(None)
        } else {
            response.json::<T>().map(Some)
        }
    }
}

/// Ignores the body.
pub fn empty() -> impl Decoder<()> + Clone + 'static {
    |_: &RawResponse| Ok(())
}

/// Returns the response itself, for callers that need headers.
pub fn raw() -> impl Decoder<RawResponse> + Clone + 'static {
    |response: &RawResponse| Ok(response.clone())
}
