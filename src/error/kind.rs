//! Error kind enumeration for the classification taxonomy.

/// Categorization of failed operations.
///
/// The first seven kinds are server-reported and selected by the response
/// classifier in a fixed priority order. The remaining kinds are raised
/// locally and never come from a response body.
///
/// | ErrorKind             | Origin | Recovery                               |
/// |-----------------------|--------|----------------------------------------|
/// | `VersionMismatch`     | server | Re-read the item and retry             |
/// | `AlreadyPresent`      | server | Choose a new key                       |
/// | `PatchConflict`       | server | Fix the patch document                 |
/// | `TestAssertionFailed` | server | Retry with updated assumptions         |
/// | `BadRequest`          | server | Client bug, fix the request            |
/// | `InvalidCredential`   | server | Fix credentials                        |
/// | `RequestFailed`       | server | Inspect status and body                |
/// | `ChannelUnavailable`  | local  | Retry later or grow the pool           |
/// | `Timeout`             | local  | Retry; the server effect may have run  |
/// | `Transport`           | local  | Retry; the server effect may have run  |
/// | `InvalidResponse`     | local  | Server/client version skew             |
/// | `Configuration`       | local  | Fix the client configuration           |
/// | `InvalidArgument`     | local  | Fix the input                          |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ErrorKind {
    /// Optimistic-concurrency precondition failed (`item_version_mismatch`).
    #[error("version mismatch")]
    VersionMismatch,

    /// Create-if-absent precondition failed (`item_already_present`).
    #[error("already present")]
    AlreadyPresent,

    /// A non-`test` patch operation failed to apply (`patch_conflict`).
    #[error("patch conflict")]
    PatchConflict,

    /// A `test` patch operation did not hold (`patch_conflict` on a test op).
    #[error("test assertion failed")]
    TestAssertionFailed,

    /// Malformed request (`api_bad_request`).
    #[error("bad request")]
    BadRequest,

    /// Authentication rejected (HTTP 401).
    #[error("invalid credential")]
    InvalidCredential,

    /// Unclassified non-success response.
    #[error("request failed")]
    RequestFailed,

    /// No channel could be acquired before the acquisition timeout.
    #[error("channel unavailable")]
    ChannelUnavailable,

    /// The caller's wait elapsed.
    #[error("timeout")]
    Timeout,

    /// The channel faulted while the request was in flight.
    #[error("transport error")]
    Transport,

    /// A success response could not be decoded.
    #[error("invalid response")]
    InvalidResponse,

    /// Client configuration is invalid.
    #[error("configuration error")]
    Configuration,

    /// A caller-supplied argument is invalid.
    #[error("invalid argument")]
    InvalidArgument,
}

impl ErrorKind {
    /// Returns `true` if the kind was raised locally rather than classified
    /// from a server response.
    #[inline]
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ErrorKind::ChannelUnavailable
                | ErrorKind::Timeout
                | ErrorKind::Transport
                | ErrorKind::InvalidResponse
                | ErrorKind::Configuration
                | ErrorKind::InvalidArgument
        )
    }

    /// Returns `true` if repeating the same request unchanged may succeed.
    ///
    /// ```rust
    /// use docstore::ErrorKind;
    ///
    /// assert!(ErrorKind::ChannelUnavailable.is_retriable());
    /// assert!(!ErrorKind::VersionMismatch.is_retriable());
    /// ```
    #[inline]
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ErrorKind::ChannelUnavailable | ErrorKind::Timeout | ErrorKind::Transport
        )
    }

    /// Returns `true` if the caller should re-read the item before retrying
    /// with a rebuilt request.
    #[inline]
    pub fn requires_refresh(&self) -> bool {
        matches!(
            self,
            ErrorKind::VersionMismatch | ErrorKind::TestAssertionFailed
        )
    }

    /// Returns the server error code that selects this kind, if any.
    pub fn server_code(&self) -> Option<&'static str> {
        match self {
            ErrorKind::VersionMismatch => Some("item_version_mismatch"),
            ErrorKind::AlreadyPresent => Some("item_already_present"),
            ErrorKind::PatchConflict | ErrorKind::TestAssertionFailed => Some("patch_conflict"),
            ErrorKind::BadRequest => Some("api_bad_request"),
            _ => None,
        }
    }
}
