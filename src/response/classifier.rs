//! Ordered classification of failed exchanges.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::RawResponse;
use crate::{Error, ErrorKind, StatusSet, patch::PatchFailure};

/// The structured error document a failed response may carry.
///
/// Every field is optional, but the body must be a JSON object for the
/// document to count as parsed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ErrorDocument {
    /// Server error code, such as `item_version_mismatch`.
    pub code: Option<String>,
    /// Human-readable message.
    pub message: Option<String>,
    /// Structured detail map.
    pub details: Option<Map<String, Value>>,
    /// Server-side locator.
    pub locator: Option<String>,
}

impl ErrorDocument {
    /// Parses a response body, returning `None` if it is not a well-formed
    /// error document.
    pub fn parse(body: &[u8]) -> Option<Self> {
        match serde_json::from_slice::<Value>(body).ok()? {
            value @ Value::Object(_) => serde_json::from_value(value).ok(),
            _ => None,
        }
    }

    fn failed_op_name(&self) -> Option<&str> {
        self.details.as_ref()?.get("op")?.get("op")?.as_str()
    }
}

/// Decides whether `response` is a success for an operation accepting
/// `success`, and selects the error kind when it is not.
///
/// The rules are checked in order and the first match wins:
///
/// 1. status in `success`: success
/// 2. body does not parse as an [`ErrorDocument`]: `InvalidCredential` for
///    401, otherwise `RequestFailed`
/// 3. `item_version_mismatch`: `VersionMismatch`
/// 4. `item_already_present`: `AlreadyPresent`
/// 5. `patch_conflict`: `TestAssertionFailed` if `details.op.op` is `test`,
///    otherwise `PatchConflict`
/// 6. `api_bad_request`: `BadRequest`
/// 7. status 401: `InvalidCredential`
/// 8. anything else: `RequestFailed`
///
/// `request_id` is used as the correlation id unless the response echoes
/// one in `X-Request-Id`.
///
/// ```rust
/// use docstore::{ErrorKind, RawResponse, StatusSet, classify};
/// use serde_json::json;
///
/// let response = RawResponse::json_body(409, &json!({"code": "item_version_mismatch"}));
/// let err = classify(&response, &StatusSet::default(), "req-1").unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::VersionMismatch);
/// assert_eq!(err.request_id(), Some("req-1"));
/// ```
pub fn classify(response: &RawResponse, success: &StatusSet, request_id: &str) -> Result<(), Error> {
    let status = response.status();
    if success.contains(status) {
        return Ok(());
    }

    let request_id = response.request_id().unwrap_or(request_id);
    let base = |kind: ErrorKind, message: Option<&str>| {
        let err = match message {
            Some(message) => Error::new(kind, message.to_owned()),
            None if kind == ErrorKind::RequestFailed => Error::request_failed(status),
            None => Error::from_kind(kind),
        };
        err.with_status(status)
            .with_request_id(request_id)
            .with_body(response.body().clone())
    };

    let Some(document) = ErrorDocument::parse(response.body()) else {
        let kind = if status == 401 {
            ErrorKind::InvalidCredential
        } else {
            ErrorKind::RequestFailed
        };
        return Err(base(kind, None));
    };

    let mut patch_failure = None;
    let kind = match document.code.as_deref() {
        Some("item_version_mismatch") => ErrorKind::VersionMismatch,
        Some("item_already_present") => ErrorKind::AlreadyPresent,
        Some("patch_conflict") => {
            patch_failure = document
                .details
                .as_ref()
                .and_then(|details| PatchFailure::from_details(details).ok());
            if document.failed_op_name() == Some("test") {
                ErrorKind::TestAssertionFailed
            } else {
                ErrorKind::PatchConflict
            }
        }
        Some("api_bad_request") => ErrorKind::BadRequest,
        _ if status == 401 => ErrorKind::InvalidCredential,
        _ => ErrorKind::RequestFailed,
    };

    let mut err = base(kind, document.message.as_deref());
    if let Some(code) = document.code {
        err = err.with_code(code);
    }
    if let Some(details) = document.details {
        err = err.with_details(details);
    }
    if let Some(locator) = document.locator {
        err = err.with_locator(locator);
    }
    if let Some(failure) = patch_failure {
        err = err.with_patch_failure(failure);
    }

    tracing::debug!(
        status,
        kind = %err.kind(),
        request_id = %request_id,
        "Classified failed response"
    );

    Err(err)
}
