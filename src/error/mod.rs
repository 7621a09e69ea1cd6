//! Error types for the document store client.
//!
//! Every failed operation resolves to exactly one [`Error`], whose
//! [`ErrorKind`] is selected by the response classifier or raised locally.
//!
//! ```rust
//! use docstore::{Error, ErrorKind};
//!
//! fn on_failure(err: &Error) {
//!     match err.kind() {
//!         ErrorKind::VersionMismatch => { /* re-read and retry */ }
//!         ErrorKind::TestAssertionFailed => {
//!             let index = err.patch_failure().map(|f| f.op_index());
//!             eprintln!("assertion {:?} did not hold", index);
//!         }
//!         kind if kind.is_retriable() => { /* retry later */ }
//!         _ => eprintln!("{}", err),
//!     }
//! }
//! # on_failure(&Error::timeout("waited too long"));
//! ```

#[allow(clippy::module_inception)]
mod error;
mod kind;

pub use error::Error;
pub use kind::ErrorKind;

/// A specialized `Result` type for document store operations.
pub type Result<T> = std::result::Result<T, Error>;
