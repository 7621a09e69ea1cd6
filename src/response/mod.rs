//! Raw responses, classification and decoding.

mod classifier;
pub mod decode;
mod meta;

use std::io::Read;

use bytes::Bytes;
use flate2::read::GzDecoder;
use serde::de::DeserializeOwned;

pub use classifier::{ErrorDocument, classify};
pub use decode::Decoder;
pub use meta::ItemPath;

use crate::{Error, Headers};

/// A completed wire exchange: status, headers and body bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    status: u16,
    headers: Headers,
    body: Bytes,
}

impl RawResponse {
    /// Creates a response.
    pub fn new(status: u16, headers: Headers, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Creates a response with a JSON body and `Content-Type` header.
    pub fn json_body(status: u16, value: &serde_json::Value) -> Self {
        let mut headers = Headers::new();
        headers.insert("Content-Type", "application/json");
        Self::new(status, headers, value.to_string())
    }

    /// Returns the status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns the headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Returns the body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the correlation id echoed by the server.
    pub fn request_id(&self) -> Option<&str> {
        self.header("X-Request-Id")
    }

    /// Adds a header, returning the modified response.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.body).map_err(|e| {
            Error::invalid_response(format!("failed to decode response body: {}", e))
                .with_status(self.status)
                .with_source(e)
        })
    }

    /// Decodes a gzip `Content-Encoding`, leaving other bodies as they are.
    pub fn decompressed(mut self) -> Result<Self, Error> {
        let gzip = self
            .header("Content-Encoding")
            .is_some_and(|encoding| encoding.trim().eq_ignore_ascii_case("gzip"));
        if !gzip || self.body.is_empty() {
            return Ok(self);
        }

        let mut decoded = Vec::with_capacity(self.body.len() * 4);
        GzDecoder::new(self.body.as_ref())
            .read_to_end(&mut decoded)
            .map_err(|e| {
                Error::invalid_response(format!("failed to decompress body: {}", e))
                    .with_status(self.status)
                    .with_source(e)
            })?;
        self.headers.remove("Content-Encoding");
        self.headers.remove("Content-Length");
        self.body = Bytes::from(decoded);
        Ok(self)
    }
}
