//! HTTP channels using reqwest.
//!
//! Each [`HttpChannel`] owns its own `reqwest::Client` limited to a single
//! idle connection, so one channel maps to one keep-alive HTTP/1.1
//! connection. The client is told nothing about compression; the response
//! body is passed through untouched and decompressed by the dispatcher.

use crate::config::{Endpoint, PoolConfig};
use crate::error::ErrorKind;
use crate::request::{Headers, Method};
use crate::response::RawResponse;
use crate::transport::traits::{Channel, Connector, WireRequest};
use crate::Error;

// ============================================================================
// Connector
// ============================================================================

/// Opens [`HttpChannel`]s.
#[derive(Debug, Clone, Default)]
pub struct HttpConnector {
    _private: (),
}

impl HttpConnector {
    /// Creates a connector.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Connector for HttpConnector {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        config: &PoolConfig,
    ) -> Result<Box<dyn Channel>, Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.io_timeout)
            .pool_max_idle_per_host(1)
            .pool_idle_timeout(config.idle_timeout)
            .build()
            .map_err(|e| {
                Error::new(
                    ErrorKind::Configuration,
                    format!("Failed to create HTTP client: {}", e),
                )
            })?;

        tracing::trace!(endpoint = %endpoint, "Opened HTTP channel");

        Ok(Box::new(HttpChannel {
            client,
            open: true,
        }))
    }
}

// ============================================================================
// Channel
// ============================================================================

/// A channel backed by one keep-alive HTTP connection.
pub struct HttpChannel {
    client: reqwest::Client,
    open: bool,
}

impl std::fmt::Debug for HttpChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChannel")
            .field("open", &self.open)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Channel for HttpChannel {
    async fn exchange(&mut self, request: &WireRequest) -> Result<RawResponse, Error> {
        if !self.open {
            return Err(Error::transport("channel is closed"));
        }

        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), request.url.clone());
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let result = async {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let mut headers = Headers::new();
            for (name, value) in response.headers() {
                if let Ok(value) = value.to_str() {
                    headers.append(name.as_str(), value);
                }
            }
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(RawResponse::new(status, headers, body))
        }
        .await;

        result.map_err(|e| {
            // Builder errors are raised before any I/O.
            if !e.is_builder() {
                self.open = false;
            }
            map_reqwest_error(e).with_request_id(request.request_id.clone())
        })
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.open = false;
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Put => reqwest::Method::PUT,
        Method::Post => reqwest::Method::POST,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

// ============================================================================
// Error Mapping
// ============================================================================

/// Maps reqwest errors to client errors.
fn map_reqwest_error(e: reqwest::Error) -> Error {
    let err = if e.is_timeout() {
        Error::new(ErrorKind::Timeout, format!("Request timed out: {}", e))
    } else if e.is_connect() {
        Error::new(ErrorKind::Transport, format!("Connection failed: {}", e))
    } else if e.is_builder() {
        Error::new(
            ErrorKind::InvalidArgument,
            format!("Invalid request: {}", e),
        )
    } else {
        Error::new(ErrorKind::Transport, format!("HTTP error: {}", e))
    };
    err.with_source(e)
}
