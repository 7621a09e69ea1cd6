//! An in-memory document store speaking the wire protocol.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use flate2::Compression;
use flate2::write::GzEncoder;
use parking_lot::RwLock;
use serde_json::{Value, json};

use super::{MockConnector, MockReply};
use crate::auth::Credentials;
use crate::config::DEFAULT_BASE_PATH;
use crate::patch::PatchDocument;
use crate::request::{Headers, Method};
use crate::response::RawResponse;
use crate::transport::WireRequest;

const DEFAULT_LIST_LIMIT: usize = 10;

#[derive(Debug, Clone)]
struct StoredItem {
    value: Value,
    item_ref: String,
}

struct ServerState {
    authorization: String,
    items: RwLock<BTreeMap<String, BTreeMap<String, StoredItem>>>,
    next_ref: AtomicU64,
    gzip: AtomicBool,
}

/// A small document store that answers requests in memory.
///
/// Supports item get, conditional put, patch with the full operation set,
/// delete, and paged listing under `/v0/{collection}[/{key}]`. Requests must
/// carry the `Authorization` value derived from the API key the server was
/// created with.
///
/// ```rust
/// use std::sync::Arc;
/// use docstore::Client;
/// use docstore::testing::InMemoryServer;
/// use serde_json::json;
///
/// let server = InMemoryServer::new("test-key");
/// server.insert("users", "alice", json!({"logins": 0}));
///
/// let client = Client::builder()
///     .endpoint("https://store.test")
///     .api_key("test-key")
///     .connector(Arc::new(server.connector()))
///     .build()?;
/// # let _ = client;
/// # Ok::<(), docstore::Error>(())
/// ```
#[derive(Clone)]
pub struct InMemoryServer {
    state: Arc<ServerState>,
}

impl InMemoryServer {
    /// Creates an empty server accepting `api_key`.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            state: Arc::new(ServerState {
                authorization: Credentials::api_key(api_key).authorization_value(),
                items: RwLock::new(BTreeMap::new()),
                next_ref: AtomicU64::new(1),
                gzip: AtomicBool::new(false),
            }),
        }
    }

    /// Compresses response bodies when the request accepts gzip.
    #[must_use]
    pub fn with_gzip(self, enabled: bool) -> Self {
        self.state.gzip.store(enabled, Ordering::Relaxed);
        self
    }

    /// Returns a connector whose channels are served by this server.
    pub fn connector(&self) -> MockConnector {
        let server = self.clone();
        MockConnector::new(move |request| MockReply::Respond(server.handle(request)))
    }

    /// Stores an item directly, returning its new ref.
    pub fn insert(&self, collection: &str, key: &str, value: Value) -> String {
        let item_ref = self.next_ref();
        self.state
            .items
            .write()
            .entry(collection.to_owned())
            .or_default()
            .insert(
                key.to_owned(),
                StoredItem {
                    value,
                    item_ref: item_ref.clone(),
                },
            );
        item_ref
    }

    /// Returns an item's current value.
    pub fn get(&self, collection: &str, key: &str) -> Option<Value> {
        self.lookup(collection, key).map(|item| item.value)
    }

    /// Returns an item's current ref.
    pub fn item_ref(&self, collection: &str, key: &str) -> Option<String> {
        self.lookup(collection, key).map(|item| item.item_ref)
    }

    /// Returns the number of items in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.state
            .items
            .read()
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Answers one request.
    pub fn handle(&self, request: &WireRequest) -> RawResponse {
        let mut response = self.route(request);
        if let Some(id) = request.headers.get("X-Request-Id") {
            response = response.with_header("X-Request-Id", id);
        }
        let accepts_gzip = request
            .headers
            .get("Accept-Encoding")
            .is_some_and(|v| v.contains("gzip"));
        if accepts_gzip && self.state.gzip.load(Ordering::Relaxed) {
            response = gzip(response);
        }
        response
    }

    fn route(&self, request: &WireRequest) -> RawResponse {
        if request.headers.get("Authorization") != Some(self.state.authorization.as_str()) {
            return RawResponse::json_body(401, &json!({}));
        }

        let Some(rest) = request.url.path().strip_prefix(DEFAULT_BASE_PATH) else {
            return error(404, "api_not_found", "unknown path");
        };
        let segments: Vec<String> = rest
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                urlencoding::decode(s)
                    .map(|d| d.into_owned())
                    .unwrap_or_else(|_| s.to_owned())
            })
            .collect();

        match (request.method, segments.as_slice()) {
            (Method::Get, [collection]) => self.list(request, collection),
            (Method::Get, [collection, key]) => self.read(collection, key),
            (Method::Put, [collection, key]) => self.put(request, collection, key),
            (Method::Patch, [collection, key]) => self.patch(request, collection, key),
            (Method::Delete, [collection, key]) => self.delete(collection, key),
            (_, [_] | [_, _]) => error(405, "api_method_not_allowed", "method not allowed"),
            _ => error(404, "api_not_found", "unknown path"),
        }
    }

    fn read(&self, collection: &str, key: &str) -> RawResponse {
        match self.lookup(collection, key) {
            Some(item) => RawResponse::json_body(200, &item.value)
                .with_header("ETag", format!("\"{}\"", item.item_ref))
                .with_header("Content-Location", location(collection, key, &item.item_ref)),
            None => error(
                404,
                "items_not_found",
                &format!("the item at {}/{} does not exist", collection, key),
            ),
        }
    }

    fn put(&self, request: &WireRequest, collection: &str, key: &str) -> RawResponse {
        let value = match request.body.as_deref().map(serde_json::from_slice::<Value>) {
            Some(Ok(value)) => value,
            Some(Err(e)) => return error(400, "api_bad_request", &format!("invalid JSON: {}", e)),
            None => return error(400, "api_bad_request", "missing request body"),
        };

        let mut items = self.state.items.write();
        let current = items.get(collection).and_then(|c| c.get(key));
        if let Some(rejection) = precondition(&request.headers, current) {
            return rejection;
        }

        let item_ref = self.next_ref();
        items.entry(collection.to_owned()).or_default().insert(
            key.to_owned(),
            StoredItem {
                value,
                item_ref: item_ref.clone(),
            },
        );
        written(collection, key, &item_ref)
    }

    fn patch(&self, request: &WireRequest, collection: &str, key: &str) -> RawResponse {
        let patch = match request.body.as_deref().map(PatchDocument::from_slice) {
            Some(Ok(patch)) => patch,
            Some(Err(e)) => return error(400, "api_bad_request", e.message()),
            None => return error(400, "api_bad_request", "missing request body"),
        };

        let mut items = self.state.items.write();
        let Some(current) = items.get(collection).and_then(|c| c.get(key)) else {
            return error(
                404,
                "items_not_found",
                &format!("the item at {}/{} does not exist", collection, key),
            );
        };
        if let Some(rejection) = precondition(&request.headers, Some(current)) {
            return rejection;
        }

        let mut value = current.value.clone();
        if let Err(failure) = patch.apply(&mut value) {
            return RawResponse::json_body(
                409,
                &json!({
                    "code": "patch_conflict",
                    "message": failure.to_string(),
                    "details": failure.to_details(),
                }),
            );
        }

        let item_ref = self.next_ref();
        items.entry(collection.to_owned()).or_default().insert(
            key.to_owned(),
            StoredItem {
                value,
                item_ref: item_ref.clone(),
            },
        );
        written(collection, key, &item_ref)
    }

    fn delete(&self, collection: &str, key: &str) -> RawResponse {
        if let Some(items) = self.state.items.write().get_mut(collection) {
            items.remove(key);
        }
        RawResponse::new(204, Headers::new(), "")
    }

    fn list(&self, request: &WireRequest, collection: &str) -> RawResponse {
        let mut limit = DEFAULT_LIST_LIMIT;
        let mut after = None;
        for (name, value) in request.url.query_pairs() {
            match name.as_ref() {
                "limit" => match value.parse::<usize>() {
                    Ok(n) if (1..=100).contains(&n) => limit = n,
                    _ => return error(400, "api_bad_request", "limit must be between 1 and 100"),
                },
                "afterKey" => after = Some(value.into_owned()),
                _ => {}
            }
        }

        let items = self.state.items.read();
        let mut remaining = items
            .get(collection)
            .into_iter()
            .flat_map(|c| c.iter())
            .filter(|(key, _)| after.as_deref().is_none_or(|a| key.as_str() > a))
            .peekable();

        let mut results = Vec::new();
        let mut last_key = None;
        while results.len() < limit {
            let Some((key, item)) = remaining.next() else {
                break;
            };
            results.push(json!({
                "path": {"collection": collection, "key": key, "ref": item.item_ref},
                "value": item.value,
            }));
            last_key = Some(key.clone());
        }

        let mut body = json!({"count": results.len(), "results": results});
        if let (Some(last), Some(_)) = (last_key, remaining.peek()) {
            body["next"] = Value::String(format!(
                "{}/{}?limit={}&afterKey={}",
                DEFAULT_BASE_PATH,
                urlencoding::encode(collection),
                limit,
                urlencoding::encode(&last)
            ));
        }
        RawResponse::json_body(200, &body)
    }

    fn lookup(&self, collection: &str, key: &str) -> Option<StoredItem> {
        self.state
            .items
            .read()
            .get(collection)
            .and_then(|c| c.get(key))
            .cloned()
    }

    fn next_ref(&self) -> String {
        format!("{:016x}", self.state.next_ref.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Debug for InMemoryServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryServer")
            .field("collections", &self.state.items.read().len())
            .finish_non_exhaustive()
    }
}

/// Checks `If-Match` and `If-None-Match: *` against the current item.
fn precondition(headers: &Headers, current: Option<&StoredItem>) -> Option<RawResponse> {
    if let Some(expected) = headers.get("If-Match") {
        let expected = expected.trim().trim_matches('"');
        if current.is_none_or(|item| item.item_ref != expected) {
            return Some(error(
                409,
                "item_version_mismatch",
                "the version of the item does not match",
            ));
        }
    }
    if headers.get("If-None-Match").map(str::trim) == Some("*") && current.is_some() {
        return Some(error(
            409,
            "item_already_present",
            "the item is already present",
        ));
    }
    None
}

fn location(collection: &str, key: &str, item_ref: &str) -> String {
    format!(
        "{}/{}/{}/refs/{}",
        DEFAULT_BASE_PATH,
        urlencoding::encode(collection),
        urlencoding::encode(key),
        item_ref
    )
}

fn written(collection: &str, key: &str, item_ref: &str) -> RawResponse {
    RawResponse::new(201, Headers::new(), "")
        .with_header("ETag", format!("\"{}\"", item_ref))
        .with_header("Location", location(collection, key, item_ref))
}

fn error(status: u16, code: &str, message: &str) -> RawResponse {
    RawResponse::json_body(
        status,
        &json!({
            "code": code,
            "message": message,
            "locator": uuid::Uuid::new_v4().simple().to_string(),
        }),
    )
}

fn gzip(response: RawResponse) -> RawResponse {
    if response.body().is_empty() {
        return response;
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    if encoder.write_all(response.body()).is_err() {
        return response;
    }
    match encoder.finish() {
        Ok(bytes) => {
            let mut headers = response.headers().clone();
            headers.insert("Content-Encoding", "gzip");
            headers.remove("Content-Length");
            RawResponse::new(response.status(), headers, bytes)
        }
        Err(_) => response,
    }
}
