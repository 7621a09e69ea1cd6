//! Scriptable in-memory connector.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::json;

use crate::config::{Endpoint, PoolConfig};
use crate::response::RawResponse;
use crate::transport::{Channel, Connector, WireRequest};
use crate::Error;

/// What a mock channel does with one request.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Returns the response.
    Respond(RawResponse),
    /// Fails the exchange with an I/O fault and closes the channel.
    Fault(std::io::ErrorKind),
    /// Fails the exchange before anything is sent; the channel stays open.
    Reject(Error),
    /// Waits, then carries out the inner reply.
    Delayed(Duration, Box<MockReply>),
}

impl MockReply {
    /// Delays this reply.
    pub fn after(self, delay: Duration) -> Self {
        MockReply::Delayed(delay, Box::new(self))
    }
}

type Handler = dyn Fn(&WireRequest) -> MockReply + Send + Sync;

struct MockState {
    handler: RwLock<Arc<Handler>>,
    connect_failure: RwLock<Option<Error>>,
    requests: RwLock<Vec<WireRequest>>,
    connects: AtomicU64,
    exchanges: AtomicU64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// A [`Connector`] whose channels answer from a handler function.
///
/// The connector counts connects and exchanges and tracks the highest number
/// of exchanges in flight at once.
///
/// ```rust
/// use docstore::testing::{MockConnector, MockReply};
/// use docstore::RawResponse;
/// use serde_json::json;
///
/// let connector = MockConnector::new(|request| {
///     if request.url.path().ends_with("/missing") {
///         MockReply::Respond(RawResponse::json_body(404, &json!({"code": "items_not_found"})))
///     } else {
///         MockReply::Respond(RawResponse::json_body(200, &json!({"ok": true})))
///     }
/// });
/// assert_eq!(connector.connect_count(), 0);
/// ```
#[derive(Clone)]
pub struct MockConnector {
    state: Arc<MockState>,
}

impl MockConnector {
    /// Creates a connector answering every request with `handler`.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&WireRequest) -> MockReply + Send + Sync + 'static,
    {
        Self {
            state: Arc::new(MockState {
                handler: RwLock::new(Arc::new(handler)),
                connect_failure: RwLock::new(None),
                requests: RwLock::new(Vec::new()),
                connects: AtomicU64::new(0),
                exchanges: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }),
        }
    }

    /// Creates a connector answering every request with the same response.
    pub fn respond_with(response: RawResponse) -> Self {
        Self::new(move |_| MockReply::Respond(response.clone()))
    }

    /// Creates a connector whose responses echo the request.
    ///
    /// The body is `{"requestId", "method", "path", "query", "body"}` and the
    /// `X-Request-Id` header is echoed back.
    pub fn echo() -> Self {
        Self::new(|request| MockReply::Respond(echo_response(request)))
    }

    /// Replaces the handler.
    pub fn set_handler<F>(&self, handler: F)
    where
        F: Fn(&WireRequest) -> MockReply + Send + Sync + 'static,
    {
        *self.state.handler.write() = Arc::new(handler);
    }

    /// Makes every subsequent connect fail with `error`.
    pub fn fail_connects(&self, error: Error) {
        *self.state.connect_failure.write() = Some(error);
    }

    /// Lets connects succeed again.
    pub fn clear_connect_failure(&self) {
        *self.state.connect_failure.write() = None;
    }

    /// Returns the number of channels opened.
    pub fn connect_count(&self) -> u64 {
        self.state.connects.load(Ordering::Relaxed)
    }

    /// Returns the number of exchanges started.
    pub fn exchange_count(&self) -> u64 {
        self.state.exchanges.load(Ordering::Relaxed)
    }

    /// Returns the highest number of exchanges that were in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }

    /// Returns every request received, in arrival order.
    pub fn requests(&self) -> Vec<WireRequest> {
        self.state.requests.read().clone()
    }

    /// Returns the most recent request.
    pub fn last_request(&self) -> Option<WireRequest> {
        self.state.requests.read().last().cloned()
    }
}

impl fmt::Debug for MockConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockConnector")
            .field("connects", &self.connect_count())
            .field("exchanges", &self.exchange_count())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        _endpoint: &Endpoint,
        _config: &PoolConfig,
    ) -> Result<Box<dyn Channel>, Error> {
        if let Some(error) = self.state.connect_failure.read().clone() {
            return Err(error);
        }
        self.state.connects.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(MockChannel {
            state: Arc::clone(&self.state),
            open: true,
        }))
    }
}

struct MockChannel {
    state: Arc<MockState>,
    open: bool,
}

#[async_trait::async_trait]
impl Channel for MockChannel {
    async fn exchange(&mut self, request: &WireRequest) -> Result<RawResponse, Error> {
        if !self.open {
            return Err(Error::transport("channel is closed"));
        }

        self.state.exchanges.fetch_add(1, Ordering::Relaxed);
        self.state.requests.write().push(request.clone());
        let now = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let handler = Arc::clone(&*self.state.handler.read());
        let mut reply = handler(request);
        while let MockReply::Delayed(delay, inner) = reply {
            tokio::time::sleep(delay).await;
            reply = *inner;
        }

        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
        match reply {
            MockReply::Respond(response) => Ok(response),
            MockReply::Fault(kind) => {
                self.open = false;
                Err(Error::from(std::io::Error::new(kind, "simulated channel fault"))
                    .with_request_id(request.request_id.clone()))
            }
            MockReply::Reject(err) => Err(err.with_request_id(request.request_id.clone())),
            MockReply::Delayed(..) => Err(Error::transport("unreachable delayed reply")),
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.open = false;
    }
}

/// Builds the response [`MockConnector::echo`] returns.
pub fn echo_response(request: &WireRequest) -> RawResponse {
    let body = request
        .body
        .as_ref()
        .map(|b| String::from_utf8_lossy(b).into_owned());
    let mut response = RawResponse::json_body(
        200,
        &json!({
            "requestId": request.request_id,
            "method": request.method.as_str(),
            "path": request.url.path(),
            "query": request.url.query(),
            "body": body,
        }),
    );
    if let Some(id) = request.headers.get("X-Request-Id") {
        response = response.with_header("X-Request-Id", id);
    }
    response
}
