//! Paginated results.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Outcome;
use crate::dispatch::Dispatcher;
use crate::request::Envelope;
use crate::response::Decoder;
use crate::Error;

/// A decoded result that may point at a following page.
pub trait Paginated {
    /// Returns the continuation link, or `None` on the last page.
    fn next_link(&self) -> Option<&str>;
}

/// A page of list-like results.
///
/// Matches the list envelope the server uses for item listings, searches,
/// events and relations.
///
/// ```rust
/// use docstore::{Page, Paginated};
/// use serde_json::json;
///
/// let page: Page<String> = serde_json::from_value(json!({
///     "count": 2,
///     "results": ["a", "b"],
///     "next": "/v0/users?limit=2&afterKey=b"
/// }))?;
/// assert_eq!(page.next_link(), Some("/v0/users?limit=2&afterKey=b"));
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<V> {
    /// Number of results on this page.
    #[serde(default)]
    pub count: u64,

    /// Total matches, when the server reports it.
    #[serde(rename = "totalCount", default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,

    /// The results.
    #[serde(default = "Vec::new")]
    pub results: Vec<V>,

    /// Link to the next page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,

    /// Link to the previous page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
}

impl<V> Page<V> {
    /// Returns `true` if no page follows this one.
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

impl<V> Paginated for Page<V> {
    fn next_link(&self) -> Option<&str> {
        self.next.as_deref()
    }
}

/// Re-issues a paged request for a continuation link, keeping the decoder
/// and the original envelope's headers.
pub(crate) struct Pager<T> {
    dispatcher: Dispatcher,
    decoder: Arc<dyn Decoder<T>>,
    template: Envelope,
}

impl<T> Pager<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        dispatcher: Dispatcher,
        decoder: Arc<dyn Decoder<T>>,
        template: Envelope,
    ) -> Self {
        Self {
            dispatcher,
            decoder,
            template,
        }
    }

    pub(crate) fn follow(self: &Arc<Self>, link: &str) -> Result<Outcome<T>, Error> {
        let envelope = self.template.follow(link)?;
        tracing::trace!(link, "Following continuation link");
        Ok(self
            .dispatcher
            .dispatch(envelope, Arc::clone(&self.decoder), Some(Arc::clone(self))))
    }
}

impl<T> fmt::Debug for Pager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pager")
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}
