//! Common test harness for docstore integration tests.

use std::sync::{Arc, Once};

use docstore::testing::{InMemoryServer, MockConnector};
use docstore::{Client, PoolConfig};
use wiremock::MockServer;

/// API key every fixture client authenticates with.
pub const API_KEY: &str = "integration-key";

/// `Authorization` value for [`API_KEY`]: `Basic base64("integration-key:")`.
pub const AUTHORIZATION: &str = "Basic aW50ZWdyYXRpb24ta2V5Og==";

static TRACING: Once = Once::new();

/// Installs a test subscriber honouring `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Builds a client for a wiremock server over plain HTTP.
pub fn http_client(server: &MockServer) -> Client {
    init_tracing();
    Client::builder()
        .endpoint(server.uri())
        .api_key(API_KEY)
        .insecure()
        .build()
        .expect("client should build")
}

/// Builds a client whose channels come from `connector`.
pub fn mock_client(connector: &MockConnector, pool: PoolConfig) -> Client {
    init_tracing();
    Client::builder()
        .endpoint("https://store.test")
        .api_key(API_KEY)
        .pool_config(pool)
        .connector(Arc::new(connector.clone()))
        .build()
        .expect("client should build")
}

/// An in-memory server plus a client connected to it.
pub struct TestFixture {
    pub server: InMemoryServer,
    pub client: Client,
}

impl TestFixture {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::with_server(InMemoryServer::new(API_KEY))
    }

    /// Wraps an existing server.
    pub fn with_server(server: InMemoryServer) -> Self {
        let client = mock_client(&server.connector(), PoolConfig::default());
        Self { server, client }
    }
}
