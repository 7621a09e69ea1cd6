//! Case-insensitive header list shared by envelopes, wire requests and responses.

use std::fmt;

/// An ordered list of header name/value pairs.
///
/// Lookups and replacements are ASCII case-insensitive on the name, matching
/// HTTP semantics. Names keep the casing they were inserted with.
///
/// ## Example
///
/// ```rust
/// use docstore::Headers;
///
/// let mut headers = Headers::new();
/// headers.insert("Content-Type", "application/json");
/// headers.insert("content-type", "application/json-patch+json");
///
/// assert_eq!(headers.len(), 1);
/// assert_eq!(headers.get("CONTENT-TYPE"), Some("application/json-patch+json"));
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header, replacing any existing value with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Appends a header without replacing existing values.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Returns the first value for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns `true` if a header named `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Removes every header named `name`, returning the first removed value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let mut removed = None;
        self.entries.retain(|(existing, value)| {
            if existing.eq_ignore_ascii_case(name) {
                if removed.is_none() {
                    removed = Some(value.clone());
                }
                false
            } else {
                true
            }
        });
        removed
    }

    /// Iterates over all name/value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in &self.entries {
            if name.eq_ignore_ascii_case("authorization") {
                map.entry(name, &"[REDACTED]");
            } else {
                map.entry(name, value);
            }
        }
        map.finish()
    }
}

impl<N, V> FromIterator<(N, V)> for Headers
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}
