//! Request dispatch.
//!
//! The dispatcher turns an [`Envelope`] into a wire request, runs it over a
//! pooled channel on its own task, and resolves the returned [`Outcome`]
//! with the classified and decoded response. Exactly one exchange is made
//! per request; nothing is retried.

mod headers;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Handle;
use tracing::{Instrument, debug, debug_span, warn};
use uuid::Uuid;

pub use headers::{DEFAULT_API_VERSION, StandardHeaders};

use crate::outcome::{Completer, Outcome, Pager, Paginated};
use crate::request::{Envelope, StatusSet};
use crate::response::{Decoder, RawResponse, classify};
use crate::transport::{ChannelPool, WireRequest};
use crate::{Error, ErrorKind};

/// Sends envelopes over a [`ChannelPool`].
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    pool: Arc<ChannelPool>,
    headers: Arc<StandardHeaders>,
}

impl Dispatcher {
    /// Creates a dispatcher.
    pub fn new(pool: Arc<ChannelPool>, headers: StandardHeaders) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                pool,
                headers: Arc::new(headers),
            }),
        }
    }

    /// Returns the pool requests run on.
    pub fn pool(&self) -> &Arc<ChannelPool> {
        &self.inner.pool
    }

    /// Returns the headers added to every request.
    pub fn standard_headers(&self) -> &StandardHeaders {
        &self.inner.headers
    }

    /// Sends `envelope` and decodes a success response with `decoder`.
    ///
    /// Returns immediately. Must be called within a Tokio runtime; without
    /// one the outcome resolves to a `Configuration` error.
    pub fn send<T, D>(&self, envelope: Envelope, decoder: D) -> Outcome<T>
    where
        T: Clone + Send + Sync + 'static,
        D: Decoder<T> + 'static,
    {
        self.dispatch(envelope, Arc::new(decoder), None)
    }

    /// Like [`send`](Self::send), for results that can point at a following
    /// page. The outcome supports [`Outcome::next`].
    pub fn send_paged<T, D>(&self, envelope: Envelope, decoder: D) -> Outcome<T>
    where
        T: Paginated + Clone + Send + Sync + 'static,
        D: Decoder<T> + 'static,
    {
        let decoder: Arc<dyn Decoder<T>> = Arc::new(decoder);
        let pager = Arc::new(Pager::new(self.clone(), Arc::clone(&decoder), envelope.clone()));
        self.dispatch(envelope, decoder, Some(pager))
    }

    pub(crate) fn dispatch<T>(
        &self,
        envelope: Envelope,
        decoder: Arc<dyn Decoder<T>>,
        pager: Option<Arc<Pager<T>>>,
    ) -> Outcome<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let request_id = Uuid::new_v4().to_string();
        let Ok(runtime) = Handle::try_current() else {
            return Outcome::ready(Err(Error::configuration(
                "requests must be sent from within a Tokio runtime",
            )
            .with_request_id(request_id)));
        };

        let (outcome, completer) = Outcome::pending(&request_id, runtime.clone(), pager);
        let span = debug_span!(
            "exchange",
            request_id = %request_id,
            method = %envelope.method(),
            path = envelope.path(),
        );
        let inner = Arc::clone(&self.inner);
        runtime.spawn(
            async move {
                inner
                    .exchange(&envelope, decoder.as_ref(), &request_id, completer)
                    .await;
            }
            .instrument(span),
        );
        outcome
    }

    /// Builds the wire form of `envelope`: its own headers plus the
    /// standard headers and `X-Request-Id`, with the path resolved against
    /// the endpoint.
    pub fn wire_request(&self, envelope: &Envelope, request_id: &str) -> Result<WireRequest, Error> {
        self.inner.wire_request(envelope, request_id)
    }
}

impl DispatcherInner {
    fn wire_request(&self, envelope: &Envelope, request_id: &str) -> Result<WireRequest, Error> {
        let url = self
            .pool
            .endpoint()
            .resolve(envelope.path(), &envelope.query_string())?;

        let mut headers = envelope.headers().clone();
        self.headers.apply(&mut headers);
        headers.insert("X-Request-Id", request_id);

        Ok(WireRequest {
            request_id: request_id.to_owned(),
            method: envelope.method(),
            url,
            headers,
            body: envelope.body().cloned(),
        })
    }

    async fn exchange<T>(
        &self,
        envelope: &Envelope,
        decoder: &dyn Decoder<T>,
        request_id: &str,
        completer: Completer<T>,
    ) where
        T: Clone + Send + Sync + 'static,
    {
        let wire = match self.wire_request(envelope, request_id) {
            Ok(wire) => wire,
            Err(err) => {
                completer.complete(Err(tag(err, request_id)));
                return;
            }
        };

        let mut channel = match self.pool.acquire().await {
            Ok(channel) => channel,
            Err(err) => {
                warn!(error = %err, "No channel for request");
                completer.complete(Err(tag(err, request_id)));
                return;
            }
        };

        let started = Instant::now();
        match channel.exchange(&wire).await {
            Ok(raw) => {
                debug!(status = raw.status(), elapsed = ?started.elapsed(), "Exchange complete");
                let result = interpret(raw, envelope.success_statuses(), decoder, request_id);
                completer.complete(result);
                self.pool.release(channel, true);
            }
            Err(err) => {
                warn!(error = %err, elapsed = ?started.elapsed(), "Channel fault");
                completer.complete(Err(tag(err, request_id)));
                let healthy = channel.is_open();
                self.pool.release(channel, healthy);
            }
        }
    }
}

/// Classifies a response and decodes it on success.
fn interpret<T>(
    raw: RawResponse,
    success: &StatusSet,
    decoder: &dyn Decoder<T>,
    request_id: &str,
) -> Result<T, Error> {
    let raw = raw.decompressed().map_err(|e| tag(e, request_id))?;
    classify(&raw, success, request_id)?;

    decoder.decode(&raw).map_err(|err| {
        let err = if err.kind() == ErrorKind::InvalidResponse {
            err
        } else {
            Error::invalid_response(format!("failed to decode response: {}", err.message()))
                .with_source(err)
        };
        let err = if err.status().is_none() {
            err.with_status(raw.status())
        } else {
            err
        };
        tag(err, raw.request_id().unwrap_or(request_id))
    })
}

fn tag(err: Error, request_id: &str) -> Error {
    if err.request_id().is_some() {
        err
    } else {
        err.with_request_id(request_id)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pool", &self.inner.pool)
            .field("headers", &self.inner.headers)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use serde_json::{Value, json};

    use super::*;
    use crate::auth::Credentials;
    use crate::config::{Endpoint, PoolConfig};
    use crate::decode;
    use crate::testing::{MockConnector, MockReply};

    fn dispatcher(connector: &MockConnector, config: PoolConfig) -> Dispatcher {
        let endpoint = Endpoint::parse("https://api.example.com").unwrap();
        let headers = StandardHeaders::new(
            &endpoint,
            &Credentials::api_key("k"),
            DEFAULT_API_VERSION,
            "docstore-rust/test".to_owned(),
        );
        let pool = ChannelPool::new(Arc::new(connector.clone()), endpoint, config).unwrap();
        Dispatcher::new(pool, headers)
    }

    #[tokio::test]
    async fn test_wire_request_headers() {
        let dispatcher = dispatcher(&MockConnector::echo(), PoolConfig::default());
        let envelope = Envelope::get("users/alice")
            .query("values", "true")
            .header("Authorization", "Bearer spoofed")
            .header("If-None-Match", "\"r1\"")
            .build();

        let wire = dispatcher.wire_request(&envelope, "req-1").unwrap();
        assert_eq!(wire.url.as_str(), "https://api.example.com/v0/users/alice?values=true");
        assert_eq!(wire.headers.get("authorization"), Some("Basic azo="));
        assert_eq!(wire.headers.get("host"), Some("api.example.com"));
        assert_eq!(wire.headers.get("x-request-id"), Some("req-1"));
        assert_eq!(wire.headers.get("if-none-match"), Some("\"r1\""));
        assert!(wire.body.is_none());
    }

    #[tokio::test]
    async fn test_send_decodes_success() {
        let connector = MockConnector::echo();
        let dispatcher = dispatcher(&connector, PoolConfig::default());

        let outcome = dispatcher.send(Envelope::get("users").build(), decode::json::<Value>());
        let body = outcome.wait().await.unwrap();

        assert_eq!(body["requestId"], outcome.request_id());
        assert_eq!(body["path"], "/v0/users");
        assert_eq!(dispatcher.pool().stats().idle, 1);
    }

    #[tokio::test]
    async fn test_error_status_is_classified() {
        let connector = MockConnector::respond_with(RawResponse::json_body(
            409,
            &json!({"code": "item_already_present", "message": "exists"}),
        ));
        let dispatcher = dispatcher(&connector, PoolConfig::default());

        let err = dispatcher
            .send(Envelope::put("users/a").build(), decode::empty())
            .wait()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyPresent);
        assert_eq!(err.status(), Some(409));
        assert!(err.request_id().is_some());
        // A classified error response leaves the channel healthy.
        assert_eq!(dispatcher.pool().stats().idle, 1);
    }

    #[tokio::test]
    async fn test_decoder_failure_is_invalid_response() {
        let connector = MockConnector::respond_with(RawResponse::new(
            200,
            Default::default(),
            "not json",
        ));
        let dispatcher = dispatcher(&connector, PoolConfig::default());

        let err = dispatcher
            .send(Envelope::get("users/a").build(), decode::json::<Value>())
            .wait()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
        assert_eq!(err.status(), Some(200));
    }

    #[tokio::test]
    async fn test_custom_decoder_error_becomes_invalid_response() {
        let dispatcher = dispatcher(&MockConnector::echo(), PoolConfig::default());
        let strict = |_: &RawResponse| -> Result<u8, Error> { Err(Error::invalid_argument("nope")) };

        let err = dispatcher
            .send(Envelope::get("x").build(), strict)
            .wait()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
    }

    #[tokio::test]
    async fn test_fault_resolves_and_discards_channel() {
        let connector =
            MockConnector::new(|_| MockReply::Fault(std::io::ErrorKind::ConnectionReset));
        let dispatcher = dispatcher(&connector, PoolConfig::default());

        let outcome = dispatcher.send(Envelope::delete("users/a").build(), decode::empty());
        let err = outcome.wait().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.request_id(), Some(outcome.request_id()));
        assert_eq!(connector.exchange_count(), 1);

        tokio::time::sleep(Duration::from_millis(10)).await;
        let stats = dispatcher.pool().stats();
        assert_eq!(stats.idle, 0);
        assert_eq!(stats.closed, 1);
    }

    #[tokio::test]
    async fn test_rejected_request_keeps_channel() {
        let connector = MockConnector::new(|request| {
            if request.url.path().ends_with("/bad") {
                MockReply::Reject(Error::invalid_argument("bad header value"))
            } else {
                MockReply::Respond(crate::testing::echo_response(request))
            }
        });
        let dispatcher = dispatcher(&connector, PoolConfig::default());

        let err = dispatcher
            .send(Envelope::get("bad").build(), decode::empty())
            .wait()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        dispatcher
            .send(Envelope::get("good").build(), decode::empty())
            .wait()
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(connector.connect_count(), 1);
        let stats = dispatcher.pool().stats();
        assert_eq!(stats.idle, 1);
        assert_eq!(stats.closed, 0);
    }

    #[tokio::test]
    async fn test_exhausted_pool_is_channel_unavailable() {
        let connector = MockConnector::echo();
        connector.set_handler(|request| {
            MockReply::Respond(crate::testing::echo_response(request)).after(Duration::from_millis(200))
        });
        let config = PoolConfig::builder()
            .max_channels(1)
            .max_idle(1)
            .acquire_timeout(Duration::from_millis(20))
            .build();
        let dispatcher = dispatcher(&connector, config);

        let slow = dispatcher.send(Envelope::get("a").build(), decode::empty());
        tokio::time::sleep(Duration::from_millis(5)).await;
        let starved = dispatcher.send(Envelope::get("b").build(), decode::empty());

        assert_eq!(
            starved.wait().await.unwrap_err().kind(),
            ErrorKind::ChannelUnavailable
        );
        slow.wait().await.unwrap();
    }

    #[test]
    fn test_send_without_runtime() {
        let dispatcher = dispatcher(&MockConnector::echo(), PoolConfig::default());

        let outcome = dispatcher.send(Envelope::get("x").build(), decode::empty());
        let err = outcome.try_result().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
