//! Channel pool configuration.

use std::time::Duration;

use crate::Error;

/// Bounds and timeouts for the channel pool.
///
/// `max_channels` caps the number of requests in flight at once; further
/// requests wait up to `acquire_timeout` for a channel to come back.
///
/// ## Example
///
/// ```rust
/// use docstore::PoolConfig;
/// use std::time::Duration;
///
/// let config = PoolConfig::builder()
///     .max_channels(4)
///     .max_idle(2)
///     .acquire_timeout(Duration::from_millis(500))
///     .build();
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder)]
pub struct PoolConfig {
    /// Maximum number of open channels.
    #[builder(default = 16)]
    pub max_channels: usize,

    /// Maximum number of idle channels kept for reuse.
    #[builder(default = 8)]
    pub max_idle: usize,

    /// How long `acquire` waits for a free channel.
    #[builder(default = Duration::from_secs(10))]
    pub acquire_timeout: Duration,

    /// Idle channels older than this are closed instead of reused.
    #[builder(default = Duration::from_secs(90))]
    pub idle_timeout: Duration,

    /// Timeout for opening a channel.
    #[builder(default = Duration::from_secs(10))]
    pub connect_timeout: Duration,

    /// Timeout for one request/response exchange on a channel.
    #[builder(default = Duration::from_secs(30))]
    pub io_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl PoolConfig {
    /// Checks the bounds for consistency.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_channels == 0 {
            return Err(Error::configuration("max_channels must be at least 1"));
        }
        if self.max_idle > self.max_channels {
            return Err(Error::configuration(format!(
                "max_idle ({}) cannot exceed max_channels ({})",
                self.max_idle, self.max_channels
            )));
        }
        if self.acquire_timeout.is_zero() {
            return Err(Error::configuration("acquire_timeout must be non-zero"));
        }
        Ok(())
    }
}
