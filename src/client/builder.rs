//! Client builder with typestate pattern.

use std::{marker::PhantomData, sync::Arc};

use super::inner::ClientInner;
use crate::{
    Client, Error,
    auth::Credentials,
    config::{Endpoint, PoolConfig},
    dispatch::{DEFAULT_API_VERSION, Dispatcher, StandardHeaders},
    transport::{ChannelPool, Connector},
    user_agent::user_agent_with,
};

/// Environment variable holding the endpoint URL.
pub const ENDPOINT_ENV: &str = "DOCSTORE_ENDPOINT";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "DOCSTORE_API_KEY";

/// Marker type: endpoint not yet provided.
pub struct NoEndpoint;

/// Marker type: endpoint has been provided.
pub struct HasEndpoint;

/// Marker type: credentials not yet provided.
pub struct NoCredentials;

/// Marker type: credentials have been provided.
pub struct HasCredentials;

/// Builder for creating [`Client`] instances.
///
/// Uses the typestate pattern so that `build()` only exists once the
/// endpoint and credentials are set.
///
/// ## Required Configuration
///
/// - `endpoint()`: the service URL; a path in it becomes the base path
/// - `credentials()` or `api_key()`: authentication
///
/// ## Optional Configuration
///
/// - `pool_config()`: channel limits and timeouts
/// - `api_version()`: value of `X-Api-Version` (default `v0`)
/// - `base_path()`: path prefix for every request (default `/v0`)
/// - `application()`: identifier appended to the User-Agent
/// - `connector()`: how channels are opened (default HTTP)
/// - `insecure()`: allow plain `http` endpoints
///
/// ## Example
///
/// ```rust
/// use std::time::Duration;
/// use docstore::{Client, PoolConfig};
///
/// let client = Client::builder()
///     .endpoint("https://api.example.com")
///     .api_key("3f2b9c1e-5a7d-4e60-9f1a-2c8d7b6e4a10")
///     .pool_config(PoolConfig::builder().max_channels(32).build())
///     .application("inventory-sync/2.3")
///     .build()?;
/// assert_eq!(client.pool_stats().max_channels, 32);
/// # Ok::<(), docstore::Error>(())
/// ```
pub struct ClientBuilder<EndpointState, CredentialsState> {
    endpoint: Option<String>,
    credentials: Option<Credentials>,
    pool_config: PoolConfig,
    api_version: String,
    base_path: Option<String>,
    application: Option<String>,
    connector: Option<Arc<dyn Connector>>,
    insecure: bool,
    _endpoint_state: PhantomData<EndpointState>,
    _credentials_state: PhantomData<CredentialsState>,
}

impl ClientBuilder<NoEndpoint, NoCredentials> {
    /// Creates a new client builder.
    pub fn new() -> Self {
        Self {
            endpoint: None,
            credentials: None,
            pool_config: PoolConfig::default(),
            api_version: DEFAULT_API_VERSION.to_owned(),
            base_path: None,
            application: None,
            connector: None,
            insecure: false,
            _endpoint_state: PhantomData,
            _credentials_state: PhantomData,
        }
    }

    /// Creates a builder from `DOCSTORE_ENDPOINT` and `DOCSTORE_API_KEY`.
    ///
    /// Fails with a `Configuration` error naming the first variable that is
    /// missing or empty.
    pub fn from_env() -> Result<ClientBuilder<HasEndpoint, HasCredentials>, Error> {
        let endpoint = read_env(ENDPOINT_ENV)?;
        let api_key = read_env(API_KEY_ENV)?;
        Ok(Self::new().endpoint(endpoint).api_key(api_key))
    }
}

fn read_env(name: &str) -> Result<String, Error> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::configuration(format!("{} is not set", name))),
    }
}

impl Default for ClientBuilder<NoEndpoint, NoCredentials> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> ClientBuilder<NoEndpoint, C> {
    /// Sets the service endpoint, e.g. `https://api.example.com`.
    pub fn endpoint(self, url: impl Into<String>) -> ClientBuilder<HasEndpoint, C> {
        ClientBuilder {
            endpoint: Some(url.into()),
            credentials: self.credentials,
            pool_config: self.pool_config,
            api_version: self.api_version,
            base_path: self.base_path,
            application: self.application,
            connector: self.connector,
            insecure: self.insecure,
            _endpoint_state: PhantomData,
            _credentials_state: PhantomData,
        }
    }
}

impl<E> ClientBuilder<E, NoCredentials> {
    /// Sets the authentication credentials.
    ///
    /// Accepts any type that can be converted into [`Credentials`]:
    /// - [`ApiKeyConfig`](crate::ApiKeyConfig)
    /// - [`BearerCredentialsConfig`](crate::BearerCredentialsConfig)
    pub fn credentials(self, credentials: impl Into<Credentials>) -> ClientBuilder<E, HasCredentials> {
        ClientBuilder {
            endpoint: self.endpoint,
            credentials: Some(credentials.into()),
            pool_config: self.pool_config,
            api_version: self.api_version,
            base_path: self.base_path,
            application: self.application,
            connector: self.connector,
            insecure: self.insecure,
            _endpoint_state: PhantomData,
            _credentials_state: PhantomData,
        }
    }

    /// Authenticates with an API key.
    pub fn api_key(self, key: impl Into<String>) -> ClientBuilder<E, HasCredentials> {
        self.credentials(Credentials::api_key(key))
    }
}

impl<E, C> ClientBuilder<E, C> {
    /// Sets the channel pool configuration.
    #[must_use]
    pub fn pool_config(mut self, config: PoolConfig) -> Self {
        self.pool_config = config;
        self
    }

    /// Sets the `X-Api-Version` header value.
    #[must_use]
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Overrides the base path requests are resolved against. An empty
    /// string means the endpoint root.
    #[must_use]
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    /// Appends an application identifier to the User-Agent.
    #[must_use]
    pub fn application(mut self, application: impl Into<String>) -> Self {
        self.application = Some(application.into());
        self
    }

    /// Sets how channels are opened.
    ///
    /// Defaults to [`HttpConnector`](crate::transport::HttpConnector) when the
    /// `rest` feature is enabled.
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Allows plain `http` endpoints.
    ///
    /// **Warning**: credentials are sent in clear text. Development only.
    #[must_use]
    pub fn insecure(mut self) -> Self {
        self.insecure = true;
        self
    }
}

impl ClientBuilder<HasEndpoint, HasCredentials> {
    /// Builds the client.
    ///
    /// No connection is made here; channels open on first use. Requests
    /// must be sent from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if the endpoint is malformed or not
    /// `https` (without [`insecure`](Self::insecure)), the credentials are
    /// empty, the pool configuration is invalid, or no connector is
    /// available.
    pub fn build(self) -> Result<Client, Error> {
        let raw = self
            .endpoint
            .ok_or_else(|| Error::configuration("endpoint is required"))?;
        let mut endpoint = Endpoint::parse(&raw)
            .map_err(|e| Error::configuration(format!("invalid endpoint: {}", e.message())))?;
        if let Some(base_path) = &self.base_path {
            endpoint = endpoint.with_base_path(base_path);
        }

        if !endpoint.is_secure() && !self.insecure {
            return Err(Error::configuration(
                "HTTPS is required. Use .insecure() for development with HTTP.",
            ));
        }

        let credentials = self
            .credentials
            .ok_or_else(|| Error::configuration("credentials are required"))?;
        credentials.validate()?;

        if self.api_version.trim().is_empty() {
            return Err(Error::configuration("API version cannot be empty"));
        }

        let connector = match self.connector {
            Some(connector) => connector,
            None => default_connector()?,
        };

        let headers = StandardHeaders::new(
            &endpoint,
            &credentials,
            self.api_version.trim(),
            user_agent_with(self.application.as_deref()),
        );
        tracing::debug!(endpoint = %endpoint, "Building client");

        let pool = ChannelPool::new(connector, endpoint, self.pool_config)?;
        let inner = ClientInner::new(Dispatcher::new(pool, headers));
        Ok(Client::from_inner(inner))
    }
}

#[cfg(feature = "rest")]
fn default_connector() -> Result<Arc<dyn Connector>, Error> {
    Ok(Arc::new(crate::transport::HttpConnector::new()))
}

#[cfg(not(feature = "rest"))]
fn default_connector() -> Result<Arc<dyn Connector>, Error> {
    Err(Error::configuration(
        "no connector configured; enable the 'rest' feature or call .connector()",
    ))
}
