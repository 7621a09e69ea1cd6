//! Main error type for the document store client.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::{Map, Value};

use super::ErrorKind;
use crate::patch::{PatchFailure, PatchOp};

/// The error every failed operation resolves to.
///
/// ```text
/// Error
/// ├── kind: ErrorKind          (category for matching)
/// ├── message: String          (human-readable description)
/// ├── status: Option           (response status code)
/// ├── request_id: Option       (correlation id)
/// ├── code: Option             (server error code)
/// ├── body: Option             (raw response body)
/// ├── details: Option          (structured detail map)
/// ├── locator: Option          (server-side locator)
/// ├── info: Option             (details.info convenience)
/// ├── patch_failure: Option    (failing op + index)
/// └── source: Option           (underlying cause)
/// ```
///
/// `Error` is cheap to clone so a single terminal value can be observed by
/// several waiters and callbacks.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: Cow<'static, str>,
    status: Option<u16>,
    request_id: Option<String>,
    code: Option<String>,
    body: Option<Bytes>,
    details: Option<Map<String, Value>>,
    locator: Option<String>,
    info: Option<String>,
    patch_failure: Option<Box<PatchFailure>>,
    source: Option<Arc<dyn StdError + Send + Sync + 'static>>,
}

impl Error {
    /// Creates a new error with the given kind and message.
    ///
    /// ```rust
    /// use docstore::{Error, ErrorKind};
    ///
    /// let err = Error::new(ErrorKind::InvalidArgument, "key cannot be empty");
    /// assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    /// ```
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            request_id: None,
            code: None,
            body: None,
            details: None,
            locator: None,
            info: None,
            patch_failure: None,
            source: None,
        }
    }

    /// Creates an error from a kind with a default message.
    pub fn from_kind(kind: ErrorKind) -> Self {
        let message = match kind {
            ErrorKind::VersionMismatch => "item version does not match",
            ErrorKind::AlreadyPresent => "item already present",
            ErrorKind::PatchConflict => "patch operation could not be applied",
            ErrorKind::TestAssertionFailed => "patch test operation failed",
            ErrorKind::BadRequest => "request was rejected as malformed",
            ErrorKind::InvalidCredential => "authentication failed",
            ErrorKind::RequestFailed => "request failed",
            ErrorKind::ChannelUnavailable => "no channel available",
            ErrorKind::Timeout => "timed out",
            ErrorKind::Transport => "transport failure",
            ErrorKind::InvalidResponse => "invalid response",
            ErrorKind::Configuration => "configuration error",
            ErrorKind::InvalidArgument => "invalid argument",
        };
        Self::new(kind, message)
    }

    /// Returns the error kind.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the response status code, if the error came from a response.
    #[inline]
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns the correlation id of the request that failed.
    ///
    /// This is the id echoed by the server when present, otherwise the id
    /// the client generated for the request.
    #[inline]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Returns the server error code, such as `patch_conflict`.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Returns the raw response body.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Returns the structured `details` map.
    pub fn details(&self) -> Option<&Map<String, Value>> {
        self.details.as_ref()
    }

    /// Returns the server locator string.
    pub fn locator(&self) -> Option<&str> {
        self.locator.as_deref()
    }

    /// Returns `details.info`, if it was a string.
    pub fn info(&self) -> Option<&str> {
        self.info.as_deref()
    }

    /// Returns the decoded patch failure for `PatchConflict` and
    /// `TestAssertionFailed` errors.
    pub fn patch_failure(&self) -> Option<&PatchFailure> {
        self.patch_failure.as_deref()
    }

    /// Returns the index of the failing top-level patch operation.
    pub fn op_index(&self) -> Option<usize> {
        self.patch_failure.as_ref().map(|f| f.op_index())
    }

    /// Returns the innermost failing patch operation.
    pub fn failed_op(&self) -> Option<&PatchOp> {
        self.patch_failure.as_ref().map(|f| f.failing_op())
    }

    /// Returns `true` if this error is generally safe to retry unchanged.
    #[inline]
    pub fn is_retriable(&self) -> bool {
        self.kind.is_retriable()
    }

    /// Sets the response status.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the correlation id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Sets the server error code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Sets the raw response body.
    #[must_use]
    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the details map. A string `info` entry is also surfaced through
    /// [`info`](Error::info).
    #[must_use]
    pub fn with_details(mut self, details: Map<String, Value>) -> Self {
        self.info = details
            .get("info")
            .and_then(Value::as_str)
            .map(str::to_owned);
        self.details = Some(details);
        self
    }

    /// Sets the server locator.
    #[must_use]
    pub fn with_locator(mut self, locator: impl Into<String>) -> Self {
        self.locator = Some(locator.into());
        self
    }

    /// Attaches a decoded patch failure.
    #[must_use]
    pub fn with_patch_failure(mut self, failure: PatchFailure) -> Self {
        self.patch_failure = Some(Box::new(failure));
        self
    }

    /// Sets the underlying cause.
    #[must_use]
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    // Convenience constructors for locally raised errors

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Creates a channel unavailable error.
    pub fn channel_unavailable(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::ChannelUnavailable, message)
    }

    /// Creates a transport error.
    pub fn transport(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InvalidResponse, message)
    }

    /// Creates the generic fallback for an unclassified response.
    pub fn request_failed(status: u16) -> Self {
        Self::new(
            ErrorKind::RequestFailed,
            format!("request failed with status {}", status),
        )
        .with_status(status)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;

        if let Some(status) = self.status {
            write!(f, " (status: {})", status)?;
        }
        if let Some(ref request_id) = self.request_id {
            write!(f, " (request_id: {})", request_id)?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::from_kind(kind)
    }
}

impl From<PatchFailure> for Error {
    fn from(failure: PatchFailure) -> Self {
        let kind = if failure.op().is_test() {
            ErrorKind::TestAssertionFailed
        } else {
            ErrorKind::PatchConflict
        };
        Error::new(kind, failure.to_string())
            .with_code("patch_conflict")
            .with_details(failure.to_details())
            .with_patch_failure(failure)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::TimedOut => ErrorKind::Timeout,
            _ => ErrorKind::Transport,
        };
        Error::new(kind, err.to_string()).with_source(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::configuration(format!("invalid URL: {}", err)).with_source(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::invalid_response(format!("JSON error: {}", err)).with_source(err)
    }
}
