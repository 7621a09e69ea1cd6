//! End-to-end tests over HTTP against a local wiremock server.

use std::io::Write;

use docstore::{Envelope, ErrorKind, PatchDocument, decode};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{AUTHORIZATION, http_client};

/// Every request carries the standard headers.
#[tokio::test]
async fn test_standard_headers_injected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v0/users/alice"))
        .and(header("authorization", AUTHORIZATION))
        .and(header("x-api-version", "v0"))
        .and(header("accept-encoding", "gzip"))
        .and(header_exists("x-request-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Alice"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = http_client(&server);
    let user: Value = client
        .send(Envelope::get("users/alice").build(), decode::json())
        .await
        .expect("request should succeed");
    assert_eq!(user["name"], "Alice");

    let received = server.received_requests().await.expect("recording enabled");
    let user_agent = received[0]
        .headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .expect("user agent header");
    assert!(user_agent.starts_with("docstore-rust/"));
    assert!(user_agent.contains("(rust/"));

    let request_id = received[0]
        .headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .expect("request id header");
    assert!(uuid::Uuid::parse_str(request_id).is_ok());
}

/// Query parameters are percent-encoded and bodies are sent as given.
#[tokio::test]
async fn test_query_and_patch_body() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/v0/users/alice"))
        .and(header("content-type", "application/json-patch+json"))
        .and(header("if-match", "\"r1\""))
        .and(body_json(json!([
            {"op": "test", "path": "/age", "value": 30},
            {"op": "inc", "path": "/age"}
        ])))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("etag", "\"r2\"")
                .insert_header("location", "/v0/users/alice/refs/r2"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v0/users"))
        .and(query_param("query", "name:alice AND age:[30 TO *]"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 0, "results": []})))
        .mount(&server)
        .await;

    let client = http_client(&server);
    let patch = PatchDocument::builder().test("/age", 30).inc("/age").build();
    let response = client
        .send(
            Envelope::patch("users/alice")
                .header("If-Match", "\"r1\"")
                .patch_body(&patch)
                .build(),
            decode::raw(),
        )
        .await
        .expect("patch should succeed");
    assert_eq!(response.etag_ref(), Some("r2"));
    let location = response.item_path().expect("location header");
    assert_eq!(location.key, "alice");
    assert_eq!(location.item_ref.as_deref(), Some("r2"));

    let search: Value = client
        .send(
            Envelope::get("users")
                .query("query", "name:alice AND age:[30 TO *]")
                .build(),
            decode::json(),
        )
        .await
        .expect("search should succeed");
    assert_eq!(search["count"], 0);
}

/// Gzip bodies are decompressed before decoding and classification.
#[tokio::test]
async fn test_gzip_response_body() {
    let server = MockServer::start().await;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(br#"{"code":"item_version_mismatch","message":"stale"}"#)
        .expect("compress");
    let compressed = encoder.finish().expect("compress");

    Mock::given(method("PUT"))
        .respond_with(
            ResponseTemplate::new(409)
                .insert_header("content-encoding", "gzip")
                .set_body_raw(compressed, "application/json"),
        )
        .mount(&server)
        .await;

    let client = http_client(&server);
    let err = client
        .send(
            Envelope::put("users/alice")
                .json(&json!({"name": "Alice"}))
                .expect("serializable")
                .build(),
            decode::empty(),
        )
        .await
        .expect_err("should be rejected");

    assert_eq!(err.kind(), ErrorKind::VersionMismatch);
    assert_eq!(err.message(), "stale");
}

/// A 404 accepted by the envelope is a success the decoder sees.
#[tokio::test]
async fn test_not_found_as_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"code": "items_not_found"})),
        )
        .mount(&server)
        .await;

    let client = http_client(&server);
    let missing: Option<Value> = client
        .send(
            Envelope::get("users/nobody").accept_status(404).build(),
            decode::json_or_none(),
        )
        .await
        .expect("404 is accepted");
    assert!(missing.is_none());

    let err = client
        .send(Envelope::get("users/nobody").build(), decode::json::<Value>())
        .await
        .expect_err("404 is not accepted");
    assert_eq!(err.kind(), ErrorKind::RequestFailed);
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.code(), Some("items_not_found"));
}

/// The server's echoed request id wins over the generated one.
#[tokio::test]
async fn test_echoed_request_id_on_error() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .respond_with(
            ResponseTemplate::new(500)
                .insert_header("x-request-id", "server-side-id")
                .set_body_string("internal error"),
        )
        .mount(&server)
        .await;

    let client = http_client(&server);
    let outcome = client.send(Envelope::delete("users/alice").build(), decode::empty());
    let err = outcome.wait().await.expect_err("500 fails");

    assert_eq!(err.kind(), ErrorKind::RequestFailed);
    assert_eq!(err.request_id(), Some("server-side-id"));
    assert_ne!(outcome.request_id(), "server-side-id");
    assert_eq!(err.body().map(|b| b.as_ref()), Some(&b"internal error"[..]));
}

/// A connection that cannot be made resolves as a transport failure.
#[tokio::test]
async fn test_unreachable_endpoint() {
    let client = docstore::Client::builder()
        .endpoint("http://127.0.0.1:1")
        .api_key("k")
        .insecure()
        .build()
        .expect("client should build");

    let outcome = client.send(Envelope::get("users").build(), decode::empty());
    let err = outcome.wait().await.expect_err("nothing listens on port 1");
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.request_id(), Some(outcome.request_id()));
    assert!(err.is_retriable());
}
