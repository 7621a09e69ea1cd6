//! Prelude module for convenient imports.
//!
//! ```rust
//! use docstore::prelude::*;
//! ```
//!
//! This provides access to:
//! - Client and builder
//! - Envelopes, outcomes and decoders
//! - Error types
//! - Patch algebra
//! - Credentials and configuration

pub use crate::{
    auth::{ApiKeyConfig, BearerCredentialsConfig, Credentials},
    client::{Client, ClientBuilder},
    config::{Endpoint, PoolConfig},
    error::{Error, ErrorKind, Result},
    outcome::{Outcome, Page, Paginated},
    patch::{PatchBuilder, PatchDocument, PatchFailure, PatchOp, TestValue},
    request::{Envelope, Method, StatusSet},
    response::{Decoder, RawResponse, decode},
};
