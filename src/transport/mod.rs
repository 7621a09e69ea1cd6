//! Channels and the pool that hands them out.
//!
//! A [`Channel`] is one persistent connection that carries one request and
//! its response at a time. [`Connector`]s open channels; the
//! [`ChannelPool`] bounds how many exist and how many are in flight.
//!
//! - [`HttpConnector`] (feature `rest`, default): keep-alive HTTP via reqwest
//! - [`MockConnector`](crate::testing::MockConnector): scripted, in memory

mod pool;
mod traits;

#[cfg(feature = "rest")]
mod http;

pub use pool::{ChannelPool, PoolStats, PooledChannel};
pub use traits::{Channel, Connector, WireRequest};

#[cfg(feature = "rest")]
pub use http::{HttpChannel, HttpConnector};
