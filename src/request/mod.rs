//! Request envelopes: immutable descriptions of one outbound operation.
//!
//! Resource-specific builders (collections, search, relations, ...) produce an
//! [`Envelope`] and hand it to [`Client::send`](crate::Client::send). The
//! dispatcher never modifies an envelope; it copies it into a wire request and
//! adds the standard headers there.
//!
//! ```rust
//! use docstore::{Envelope, PatchDocument};
//!
//! let lookup = Envelope::get("users/alice").accept_status(404).build();
//! assert!(lookup.accepts(404));
//!
//! let patch = PatchDocument::builder().inc("/logins").build();
//! let update = Envelope::patch("users/alice")
//!     .header("If-Match", "\"0c8f2b1a\"")
//!     .patch_body(&patch)
//!     .build();
//! assert_eq!(update.header("content-type"), Some("application/json-patch+json"));
//!
//! let search = Envelope::get("users")
//!     .query("query", "name:alice AND age:[30 TO *]")
//!     .build();
//! assert_eq!(search.query_string(), "query=name%3Aalice%20AND%20age%3A%5B30%20TO%20%2A%5D");
//! ```

mod headers;

use std::fmt;

use bytes::Bytes;
use serde::Serialize;

pub use headers::Headers;

use crate::{Error, patch::PatchDocument};

/// Request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `HEAD`
    Head,
    /// `PUT`
    Put,
    /// `POST`
    Post,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Returns the method token as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of status codes an operation treats as success.
///
/// Defaults to every `2xx` status. Lookup-style operations add `404` so that a
/// missing item decodes to an empty result instead of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSet {
    any_2xx: bool,
    extra: Vec<u16>,
}

impl Default for StatusSet {
    fn default() -> Self {
        Self {
            any_2xx: true,
            extra: Vec::new(),
        }
    }
}

impl StatusSet {
    /// A set containing exactly the given statuses.
    pub fn only(statuses: impl IntoIterator<Item = u16>) -> Self {
        Self {
            any_2xx: false,
            extra: statuses.into_iter().collect(),
        }
    }

    /// Adds a status to the set.
    #[must_use]
    pub fn with(mut self, status: u16) -> Self {
        if !self.extra.contains(&status) {
            self.extra.push(status);
        }
        self
    }

    /// Returns `true` if `status` counts as success.
    pub fn contains(&self, status: u16) -> bool {
        (self.any_2xx && (200..300).contains(&status)) || self.extra.contains(&status)
    }
}

/// An immutable description of one operation.
///
/// Paths are relative to the endpoint's base path (`/v0` by default). A path
/// that already starts with the base path, such as a `next` link returned by
/// the server, is used as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: Headers,
    body: Option<Bytes>,
    success: StatusSet,
}

impl Envelope {
    /// Starts building an envelope.
    pub fn builder(method: Method, path: impl Into<String>) -> EnvelopeBuilder {
        EnvelopeBuilder {
            envelope: Envelope {
                method,
                path: path.into(),
                query: Vec::new(),
                headers: Headers::new(),
                body: None,
                success: StatusSet::default(),
            },
        }
    }

    /// Starts a `GET` envelope.
    pub fn get(path: impl Into<String>) -> EnvelopeBuilder {
        Self::builder(Method::Get, path)
    }

    /// Starts a `PUT` envelope.
    pub fn put(path: impl Into<String>) -> EnvelopeBuilder {
        Self::builder(Method::Put, path)
    }

    /// Starts a `POST` envelope.
    pub fn post(path: impl Into<String>) -> EnvelopeBuilder {
        Self::builder(Method::Post, path)
    }

    /// Starts a `PATCH` envelope.
    pub fn patch(path: impl Into<String>) -> EnvelopeBuilder {
        Self::builder(Method::Patch, path)
    }

    /// Starts a `DELETE` envelope.
    pub fn delete(path: impl Into<String>) -> EnvelopeBuilder {
        Self::builder(Method::Delete, path)
    }

    /// Returns the method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Returns the path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the query parameters in insertion order.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Returns the percent-encoded query string, without the leading `?`.
    pub fn query_string(&self) -> String {
        self.query
            .iter()
            .map(|(name, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(name),
                    urlencoding::encode(value)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Returns the caller-supplied headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns a caller-supplied header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Returns the body bytes, if any.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Returns the statuses this operation treats as success.
    pub fn success_statuses(&self) -> &StatusSet {
        &self.success
    }

    /// Returns `true` if `status` counts as success for this operation.
    pub fn accepts(&self, status: u16) -> bool {
        self.success.contains(status)
    }

    /// Derives the envelope for a continuation link.
    ///
    /// The link carries its own path and query; headers and the success set
    /// carry over, the body does not.
    pub(crate) fn follow(&self, link: &str) -> Result<Envelope, Error> {
        let resolved = url::Url::parse("http://link.invalid/")
            .and_then(|base| base.join(link))
            .map_err(|e| {
                Error::invalid_argument(format!("invalid continuation link {:?}: {}", link, e))
            })?;
        Ok(Envelope {
            method: Method::Get,
            path: resolved.path().to_string(),
            query: resolved
                .query_pairs()
                .map(|(name, value)| (name.into_owned(), value.into_owned()))
                .collect(),
            headers: self.headers.clone(),
            body: None,
            success: self.success.clone(),
        })
    }
}

/// Builder for [`Envelope`].
#[derive(Debug, Clone)]
pub struct EnvelopeBuilder {
    envelope: Envelope,
}

impl EnvelopeBuilder {
    /// Appends a query parameter.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.envelope.query.push((name.into(), value.into()));
        self
    }

    /// Sets a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.envelope.headers.insert(name, value);
        self
    }

    /// Sets raw body bytes.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.envelope.body = Some(body.into());
        self
    }

    /// Serializes `value` as a JSON body and sets `Content-Type`.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, Error> {
        let body = serde_json::to_vec(value)
            .map_err(|e| Error::invalid_argument(format!("failed to encode body: {}", e)))?;
        self.envelope.body = Some(Bytes::from(body));
        self.envelope
            .headers
            .insert("Content-Type", "application/json");
        Ok(self)
    }

    /// Encodes a patch document as the body.
    #[must_use]
    pub fn patch_body(mut self, patch: &PatchDocument) -> Self {
        self.envelope.body = Some(patch.to_bytes());
        self.envelope
            .headers
            .insert("Content-Type", "application/json-patch+json");
        self
    }

    /// Adds a status the operation treats as success.
    #[must_use]
    pub fn accept_status(mut self, status: u16) -> Self {
        self.envelope.success = self.envelope.success.with(status);
        self
    }

    /// Replaces the success set.
    #[must_use]
    pub fn success_statuses(mut self, statuses: StatusSet) -> Self {
        self.envelope.success = statuses;
        self
    }

    /// Finishes the envelope.
    pub fn build(self) -> Envelope {
        self.envelope
    }
}
