//! Response header conventions: entity tag refs, timestamps and locations.

use chrono::{DateTime, Utc};

use super::RawResponse;

impl RawResponse {
    /// Returns the item ref carried in the `ETag` header, without quotes or a
    /// weak-validator prefix.
    pub fn etag_ref(&self) -> Option<&str> {
        let tag = self.header("ETag")?.trim();
        let tag = tag.strip_prefix("W/").unwrap_or(tag);
        let tag = tag
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .unwrap_or(tag);
        Some(tag).filter(|t| !t.is_empty())
    }

    /// Returns the `Last-Modified` timestamp.
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        let value = self.header("Last-Modified")?;
        DateTime::parse_from_rfc2822(value.trim())
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Returns the `Location` header.
    pub fn location(&self) -> Option<&str> {
        self.header("Location")
    }

    /// Parses the `Location` header into item coordinates.
    pub fn item_path(&self) -> Option<ItemPath> {
        self.location().and_then(ItemPath::parse)
    }
}

/// Item coordinates from a creation response's `Location` header.
///
/// The expected shape is `/<version>/<collection>/<key>[/refs/<ref>]`; the
/// version segment is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemPath {
    /// Collection name.
    pub collection: String,
    /// Item key.
    pub key: String,
    /// Item ref, when the location names one.
    pub item_ref: Option<String>,
}

impl ItemPath {
    /// Parses a location path. Returns `None` for other shapes.
    ///
    /// ```rust
    /// use docstore::ItemPath;
    ///
    /// let path = ItemPath::parse("/v0/users/alice%20b/refs/0c8f2b1a").unwrap();
    /// assert_eq!(path.collection, "users");
    /// assert_eq!(path.key, "alice b");
    /// assert_eq!(path.item_ref.as_deref(), Some("0c8f2b1a"));
    /// ```
    pub fn parse(location: &str) -> Option<Self> {
        let path = location.split(['?', '#']).next()?;
        let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.first().is_some_and(|s| is_version(s)) {
            segments.remove(0);
        }
        let decode = |s: &str| urlencoding::decode(s).ok().map(|d| d.into_owned());

        match segments.as_slice() {
            [collection, key] => Some(Self {
                collection: decode(*collection)?,
                key: decode(*key)?,
                item_ref: None,
            }),
            [collection, key, "refs", item_ref] => Some(Self {
                collection: decode(*collection)?,
                key: decode(*key)?,
                item_ref: Some(decode(*item_ref)?),
            }),
            _ => None,
        }
    }
}

fn is_version(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::Headers;

    fn with(name: &str, value: &str) -> RawResponse {
        RawResponse::new(201, Headers::new(), "").with_header(name, value)
    }

    #[test]
    fn test_etag_ref() {
        assert_eq!(with("ETag", "\"82eafab14dc84ed3\"").etag_ref(), Some("82eafab14dc84ed3"));
        assert_eq!(with("etag", "W/\"abc\"").etag_ref(), Some("abc"));
        assert_eq!(with("ETag", "\"\"").etag_ref(), None);
        assert_eq!(with("X-Other", "1").etag_ref(), None);
    }

    #[test]
    fn test_last_modified() {
        let response = with("Last-Modified", "Tue, 15 Nov 1994 08:12:31 GMT");
        assert_eq!(
            response.last_modified(),
            Some(Utc.with_ymd_and_hms(1994, 11, 15, 8, 12, 31).unwrap())
        );
        assert_eq!(with("Last-Modified", "yesterday").last_modified(), None);
    }

    #[test]
    fn test_item_path_without_ref_or_version() {
        let path = ItemPath::parse("/users/alice").unwrap();
        assert_eq!(path.collection, "users");
        assert_eq!(path.key, "alice");
        assert_eq!(path.item_ref, None);
    }

    #[test]
    fn test_item_path_from_response() {
        let response = with("Location", "/v0/users/bob/refs/f00d?x=1");
        let path = response.item_path().unwrap();
        assert_eq!(path.key, "bob");
        assert_eq!(path.item_ref.as_deref(), Some("f00d"));
    }

    #[test]
    fn test_item_path_rejects_other_shapes() {
        assert!(ItemPath::parse("/v0/users").is_none());
        assert!(ItemPath::parse("/v0/users/bob/events/x").is_none());
    }
}
