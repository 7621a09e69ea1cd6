//! Authentication credentials.
//!
//! - [`ApiKeyConfig`]: API key sent as `Authorization: Basic base64(key + ":")`
//! - [`BearerCredentialsConfig`]: pre-issued bearer token
//!
//! ```rust
//! use docstore::{Client, Credentials};
//!
//! let client = Client::builder()
//!     .endpoint("https://api.example.com")
//!     .credentials(Credentials::api_key("3f2b9c1e-5a7d-4e60-9f1a-2c8d7b6e4a10"))
//!     .build()?;
//! # Ok::<(), docstore::Error>(())
//! ```

mod credentials;

pub use credentials::{ApiKeyConfig, BearerCredentialsConfig, Credentials};
