//! Credential types and the `Authorization` values they produce.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use zeroize::Zeroizing;

use crate::Error;

/// API key credentials, sent as HTTP Basic auth with the key as the user
/// name and an empty password.
///
/// ## Example
///
/// ```rust
/// use docstore::ApiKeyConfig;
///
/// let key = ApiKeyConfig::new("3f2b9c1e-5a7d-4e60-9f1a-2c8d7b6e4a10");
/// assert!(key.authorization_value().starts_with("Basic "));
/// ```
#[derive(Clone)]
pub struct ApiKeyConfig {
    key: Arc<Zeroizing<String>>,
}

impl ApiKeyConfig {
    /// Creates API key credentials.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: Arc::new(Zeroizing::new(key.into())),
        }
    }

    /// Returns the key.
    pub fn key(&self) -> &str {
        self.key.as_str()
    }

    /// Returns `Basic base64(key + ":")`.
    pub fn authorization_value(&self) -> String {
        let userpass = Zeroizing::new(format!("{}:", self.key.as_str()));
        format!("Basic {}", STANDARD.encode(userpass.as_bytes()))
    }
}

impl fmt::Debug for ApiKeyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyConfig")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Bearer token credentials configuration.
///
/// For deployments fronted by a token-issuing gateway. Tokens are sent as
/// given and never refreshed.
///
/// ```rust
/// use docstore::BearerCredentialsConfig;
///
/// let config = BearerCredentialsConfig::new("eyJhbGciOiJFZERTQSI...");
/// assert_eq!(config.token(), "eyJhbGciOiJFZERTQSI...");
/// ```
#[derive(Clone)]
pub struct BearerCredentialsConfig {
    token: Arc<Zeroizing<String>>,
}

impl BearerCredentialsConfig {
    /// Creates a new bearer credentials configuration.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Arc::new(Zeroizing::new(token.into())),
        }
    }

    /// Returns the bearer token.
    pub fn token(&self) -> &str {
        self.token.as_str()
    }
}

impl fmt::Debug for BearerCredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerCredentialsConfig")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Authentication credentials.
///
/// The `Authorization` header value is derived once when the client is
/// built and reused for every request.
#[derive(Clone)]
pub enum Credentials {
    /// API key sent as Basic auth.
    ApiKey(ApiKeyConfig),

    /// Bearer token.
    Bearer(BearerCredentialsConfig),
}

impl Credentials {
    /// Creates API key credentials.
    pub fn api_key(key: impl Into<String>) -> Self {
        Credentials::ApiKey(ApiKeyConfig::new(key))
    }

    /// Creates bearer token credentials.
    pub fn bearer(token: impl Into<String>) -> Self {
        Credentials::Bearer(BearerCredentialsConfig::new(token))
    }

    /// Returns `true` for API key credentials.
    pub fn is_api_key(&self) -> bool {
        matches!(self, Credentials::ApiKey(_))
    }

    /// Returns `true` for bearer credentials.
    pub fn is_bearer(&self) -> bool {
        matches!(self, Credentials::Bearer(_))
    }

    /// Rejects empty or whitespace-only secrets and secrets that cannot be
    /// carried in a header.
    pub fn validate(&self) -> Result<(), Error> {
        let (what, secret) = match self {
            Credentials::ApiKey(config) => ("API key", config.key()),
            Credentials::Bearer(config) => ("bearer token", config.token()),
        };
        if secret.trim().is_empty() {
            return Err(Error::configuration(format!("{} cannot be empty", what)));
        }
        if secret.chars().any(|c| c.is_control()) {
            return Err(Error::configuration(format!(
                "{} contains control characters",
                what
            )));
        }
        Ok(())
    }

    /// Returns the `Authorization` header value.
    pub fn authorization_value(&self) -> String {
        match self {
            Credentials::ApiKey(config) => config.authorization_value(),
            Credentials::Bearer(config) => format!("Bearer {}", config.token()),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::ApiKey(config) => f.debug_tuple("ApiKey").field(config).finish(),
            Credentials::Bearer(config) => f.debug_tuple("Bearer").field(config).finish(),
        }
    }
}

impl From<ApiKeyConfig> for Credentials {
    fn from(config: ApiKeyConfig) -> Self {
        Credentials::ApiKey(config)
    }
}

impl From<BearerCredentialsConfig> for Credentials {
    fn from(config: BearerCredentialsConfig) -> Self {
        Credentials::Bearer(config)
    }
}
