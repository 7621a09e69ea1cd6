//! Configuration types for the document store client.
//!
//! - [`Endpoint`]: where requests go
//! - [`PoolConfig`]: channel pool bounds and timeouts

mod endpoint;
mod pool;

pub use endpoint::{DEFAULT_BASE_PATH, Endpoint};
pub use pool::PoolConfig;
