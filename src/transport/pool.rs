//! Bounded pool of channels.
//!
//! Checkout is gated by a semaphore with one permit per channel, so at most
//! `max_channels` requests are in flight and each holds a channel exclusively
//! until it is released. Healthy channels go back on an idle stack; faulted
//! ones are closed and replaced lazily by the next acquirer.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, trace};

use crate::config::{Endpoint, PoolConfig};
use crate::response::RawResponse;
use crate::transport::traits::{Channel, Connector, WireRequest};
use crate::Error;

/// Point-in-time pool counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Configured channel limit.
    pub max_channels: usize,
    /// Channels currently checked out.
    pub in_use: usize,
    /// Idle channels ready for reuse.
    pub idle: usize,
    /// Channels opened since the pool was created.
    pub opened: u64,
    /// Channels closed since the pool was created.
    pub closed: u64,
    /// Acquisitions served by an idle channel.
    pub reused: u64,
    /// Acquisitions that gave up waiting.
    pub acquire_timeouts: u64,
}

struct IdleChannel {
    channel: Box<dyn Channel>,
    since: Instant,
}

#[derive(Default)]
struct Counters {
    opened: AtomicU64,
    closed: AtomicU64,
    reused: AtomicU64,
    acquire_timeouts: AtomicU64,
}

/// Hands out channels for one request/response cycle at a time.
pub struct ChannelPool {
    connector: Arc<dyn Connector>,
    endpoint: Endpoint,
    config: PoolConfig,
    permits: Arc<Semaphore>,
    idle: Mutex<Vec<IdleChannel>>,
    counters: Counters,
}

impl fmt::Debug for ChannelPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelPool")
            .field("endpoint", &self.endpoint.to_string())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl ChannelPool {
    /// Creates an empty pool. Channels are opened on demand.
    pub fn new(
        connector: Arc<dyn Connector>,
        endpoint: Endpoint,
        config: PoolConfig,
    ) -> Result<Arc<Self>, Error> {
        config.validate()?;
        Ok(Arc::new(Self {
            connector,
            endpoint,
            permits: Arc::new(Semaphore::new(config.max_channels)),
            idle: Mutex::new(Vec::with_capacity(config.max_idle)),
            counters: Counters::default(),
            config,
        }))
    }

    /// Returns the pool configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Returns the endpoint channels connect to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Checks out a channel.
    ///
    /// Waits up to `acquire_timeout` for a free slot, then reuses an idle
    /// channel or opens a new one. Fails with `ChannelUnavailable` when the
    /// wait elapses or the pool is closed.
    pub async fn acquire(self: &Arc<Self>) -> Result<PooledChannel, Error> {
        let timeout = self.config.acquire_timeout;
        let permit =
            match tokio::time::timeout(timeout, Arc::clone(&self.permits).acquire_owned()).await {
                Ok(Ok(permit)) => permit,
                Ok(Err(_)) => return Err(Error::channel_unavailable("channel pool is closed")),
                Err(_) => {
                    self.counters.acquire_timeouts.fetch_add(1, Ordering::Relaxed);
                    debug!(?timeout, "Timed out waiting for a channel");
                    return Err(Error::channel_unavailable(format!(
                        "no channel became available within {:?}",
                        timeout
                    )));
                }
            };

        let channel = match self.take_idle() {
            Some(channel) => {
                self.counters.reused.fetch_add(1, Ordering::Relaxed);
                trace!("Reusing idle channel");
                channel
            }
            None => self.open().await?,
        };

        Ok(PooledChannel {
            channel: Some(channel),
            pool: Arc::clone(self),
            _permit: permit,
        })
    }

    /// Returns a checked-out channel.
    ///
    /// A healthy, open channel goes back on the idle stack unless it is
    /// already full; anything else is closed.
    pub fn release(&self, mut pooled: PooledChannel, healthy: bool) {
        if let Some(channel) = pooled.channel.take() {
            self.put_back(channel, healthy);
        }
    }

    /// Closes the pool. Idle channels are closed, waiting and future
    /// acquirers fail, and checked-out channels are closed on release.
    pub fn close(&self) {
        self.permits.close();
        let drained: Vec<_> = self.idle.lock().drain(..).collect();
        for idle in drained {
            self.discard(idle.channel);
        }
        debug!("Channel pool closed");
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    /// Returns current counters.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            max_channels: self.config.max_channels,
            in_use: self
                .config
                .max_channels
                .saturating_sub(self.permits.available_permits()),
            idle: self.idle.lock().len(),
            opened: self.counters.opened.load(Ordering::Relaxed),
            closed: self.counters.closed.load(Ordering::Relaxed),
            reused: self.counters.reused.load(Ordering::Relaxed),
            acquire_timeouts: self.counters.acquire_timeouts.load(Ordering::Relaxed),
        }
    }

    fn take_idle(&self) -> Option<Box<dyn Channel>> {
        loop {
            let idle = self.idle.lock().pop()?;
            if idle.channel.is_open() && idle.since.elapsed() < self.config.idle_timeout {
                return Some(idle.channel);
            }
            trace!("Discarding stale idle channel");
            self.discard(idle.channel);
        }
    }

    async fn open(&self) -> Result<Box<dyn Channel>, Error> {
        let connect = self.connector.connect(&self.endpoint, &self.config);
        let channel = tokio::time::timeout(self.config.connect_timeout, connect)
            .await
            .map_err(|_| {
                Error::transport(format!(
                    "connecting to {} timed out after {:?}",
                    self.endpoint, self.config.connect_timeout
                ))
            })??;
        let opened = self.counters.opened.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(endpoint = %self.endpoint, opened, "Opened channel");
        Ok(channel)
    }

    fn put_back(&self, channel: Box<dyn Channel>, healthy: bool) {
        if !healthy || !channel.is_open() || self.is_closed() {
            self.discard(channel);
            return;
        }
        let mut idle = self.idle.lock();
        if idle.len() >= self.config.max_idle {
            drop(idle);
            self.discard(channel);
            return;
        }
        idle.push(IdleChannel {
            channel,
            since: Instant::now(),
        });
    }

    fn discard(&self, mut channel: Box<dyn Channel>) {
        channel.close();
        self.counters.closed.fetch_add(1, Ordering::Relaxed);
    }
}

/// A channel checked out of a [`ChannelPool`].
///
/// Return it with [`ChannelPool::release`]. Dropping it without a release
/// counts as unhealthy: the channel is closed and its slot freed.
pub struct PooledChannel {
    channel: Option<Box<dyn Channel>>,
    pool: Arc<ChannelPool>,
    _permit: OwnedSemaphorePermit,
}

impl PooledChannel {
    /// Performs one exchange on the channel.
    pub async fn exchange(&mut self, request: &WireRequest) -> Result<RawResponse, Error> {
        match self.channel.as_mut() {
            Some(channel) => channel.exchange(request).await,
            None => Err(Error::transport("channel already released")),
        }
    }

    /// Returns `true` if the underlying channel is still usable.
    pub fn is_open(&self) -> bool {
        self.channel.as_ref().is_some_and(|c| c.is_open())
    }
}

impl fmt::Debug for PooledChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledChannel")
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl Drop for PooledChannel {
    fn drop(&mut self) {
        // The permit is a later field, so it is released after the channel
        // has been handed back.
        if let Some(channel) = self.channel.take() {
            self.pool.discard(channel);
        }
    }
}
