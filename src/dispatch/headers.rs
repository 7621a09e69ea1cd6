//! Headers attached to every request.

use std::fmt;

use zeroize::Zeroizing;

use crate::auth::Credentials;
use crate::config::Endpoint;
use crate::request::Headers;

/// Default protocol version sent in `X-Api-Version`.
pub const DEFAULT_API_VERSION: &str = "v0";

/// The fixed header set derived from the client configuration.
///
/// Built once when the client is built. Values here override any header of
/// the same name supplied by an envelope.
#[derive(Clone)]
pub struct StandardHeaders {
    entries: Vec<(&'static str, String)>,
    authorization: Zeroizing<String>,
}

impl StandardHeaders {
    /// Derives the standard headers.
    pub fn new(
        endpoint: &Endpoint,
        credentials: &Credentials,
        api_version: &str,
        user_agent: String,
    ) -> Self {
        Self {
            entries: vec![
                ("X-Api-Version", api_version.to_owned()),
                ("Host", endpoint.host_header()),
                ("User-Agent", user_agent),
                ("Accept-Encoding", "gzip".to_owned()),
            ],
            authorization: Zeroizing::new(credentials.authorization_value()),
        }
    }

    /// Writes every standard header into `headers`, replacing existing values.
    pub fn apply(&self, headers: &mut Headers) {
        for (name, value) in &self.entries {
            headers.insert(*name, value.as_str());
        }
        headers.insert("Authorization", self.authorization.as_str());
    }

    /// Returns a standard header value.
    pub fn get(&self, name: &str) -> Option<&str> {
        if name.eq_ignore_ascii_case("authorization") {
            return Some(self.authorization.as_str());
        }
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Debug for StandardHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in &self.entries {
            map.entry(name, value);
        }
        map.entry(&"Authorization", &"[REDACTED]").finish()
    }
}
