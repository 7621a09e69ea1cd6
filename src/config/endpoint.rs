//! Service endpoint addressing.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::Error;

/// Default API base path.
pub const DEFAULT_BASE_PATH: &str = "/v0";

/// The remote service address plus the API base path requests resolve under.
///
/// If the URL carries a path, it becomes the base path; otherwise
/// [`DEFAULT_BASE_PATH`] is used.
///
/// ```rust
/// use docstore::Endpoint;
///
/// let endpoint = Endpoint::parse("https://api.example.com").unwrap();
/// assert_eq!(endpoint.base_path(), "/v0");
/// assert_eq!(endpoint.host_header(), "api.example.com");
///
/// let url = endpoint.resolve("users/alice", "").unwrap();
/// assert_eq!(url.as_str(), "https://api.example.com/v0/users/alice");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
    base_path: String,
}

impl Endpoint {
    /// Parses an endpoint URL. Only `http` and `https` are accepted.
    pub fn parse(url: &str) -> Result<Self, Error> {
        let mut url = Url::parse(url)?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(Error::configuration(format!(
                    "unsupported endpoint scheme {:?}",
                    other
                )));
            }
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(Error::configuration("endpoint URL has no host"));
        }

        let base_path = match url.path().trim_end_matches('/') {
            "" => DEFAULT_BASE_PATH.to_string(),
            path => path.to_string(),
        };
        url.set_path("");
        url.set_query(None);
        url.set_fragment(None);

        Ok(Self { url, base_path })
    }

    /// Replaces the base path.
    #[must_use]
    pub fn with_base_path(mut self, base_path: &str) -> Self {
        let trimmed = base_path.trim_matches('/');
        self.base_path = if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        };
        self
    }

    /// Returns the scheme and authority as a URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the base path, without a trailing slash.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Returns `true` for `https` endpoints.
    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "https"
    }

    /// Returns the `Host` header value: the host, plus the port when it is
    /// not the scheme's default.
    pub fn host_header(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        match self.url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    /// Resolves a request path and encoded query string to a full URL.
    ///
    /// Paths that already start with the base path are used as they are, so
    /// continuation links returned by the server resolve unchanged.
    pub fn resolve(&self, path: &str, query: &str) -> Result<Url, Error> {
        let already_based = !self.base_path.is_empty()
            && (path == self.base_path
                || path
                    .strip_prefix(self.base_path.as_str())
                    .is_some_and(|rest| rest.starts_with('/')));

        let full = if already_based {
            path.to_string()
        } else {
            format!("{}/{}", self.base_path, path.trim_start_matches('/'))
        };

        let mut url = self.url.clone();
        url.set_path(&full);
        url.set_query(if query.is_empty() { None } else { Some(query) });
        Ok(url)
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Endpoint::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            self.url.as_str().trim_end_matches('/'),
            self.base_path
        )
    }
}
