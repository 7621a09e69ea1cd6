//! Error responses over HTTP map to exactly one error kind.

use docstore::{Envelope, ErrorKind, PatchOp, decode};
use serde_json::{Value, json};
use test_case::test_case;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::http_client;

async fn failing_patch(status: u16, body: Value) -> docstore::Error {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(&server)
        .await;

    http_client(&server)
        .send(
            Envelope::patch("users/alice").body("[]").build(),
            decode::empty(),
        )
        .await
        .expect_err("response is an error")
}

#[test_case(409, json!({"code": "item_version_mismatch"}), ErrorKind::VersionMismatch ; "version mismatch")]
#[test_case(409, json!({"code": "item_already_present"}), ErrorKind::AlreadyPresent ; "already present")]
#[test_case(400, json!({"code": "api_bad_request", "message": "limit out of range"}), ErrorKind::BadRequest ; "bad request")]
#[test_case(401, json!({}), ErrorKind::InvalidCredential ; "unauthorized")]
#[test_case(403, json!({"code": "security_forbidden"}), ErrorKind::RequestFailed ; "unrecognized code")]
#[tokio::test]
async fn test_error_kinds(status: u16, body: Value, expected: ErrorKind) {
    let err = failing_patch(status, body).await;
    assert_eq!(err.kind(), expected);
    assert_eq!(err.status(), Some(status));
    assert!(err.request_id().is_some());
}

#[tokio::test]
async fn test_patch_conflict_reports_failed_op() {
    let err = failing_patch(
        409,
        json!({
            "code": "patch_conflict",
            "message": "operation 1 (move) failed",
            "details": {"opIndex": 1, "op": {"op": "move", "from": "/a", "path": "/b"}},
        }),
    )
    .await;

    assert_eq!(err.kind(), ErrorKind::PatchConflict);
    assert_eq!(err.op_index(), Some(1));
    assert_eq!(
        err.failed_op(),
        Some(&PatchOp::Move {
            from: "/a".into(),
            path: "/b".into(),
        })
    );
}

#[tokio::test]
async fn test_failed_test_op_is_assertion() {
    let err = failing_patch(
        409,
        json!({
            "code": "patch_conflict",
            "details": {"opIndex": 0, "op": {"op": "test", "path": "/status", "value": "active"}},
        }),
    )
    .await;

    assert_eq!(err.kind(), ErrorKind::TestAssertionFailed);
    assert_eq!(err.op_index(), Some(0));
    assert!(err.failed_op().is_some_and(PatchOp::is_test));
}

#[tokio::test]
async fn test_unparsed_body_keeps_raw_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let err = http_client(&server)
        .send(Envelope::get("users").build(), decode::empty())
        .await
        .expect_err("502 fails");

    assert_eq!(err.kind(), ErrorKind::RequestFailed);
    assert_eq!(err.status(), Some(502));
    assert!(err.code().is_none());
    assert_eq!(
        err.body().map(|b| b.as_ref()),
        Some(&b"<html>bad gateway</html>"[..])
    );
}

#[tokio::test]
async fn test_error_document_fields_are_kept() {
    let err = failing_patch(
        409,
        json!({
            "code": "item_version_mismatch",
            "message": "the version of the item does not match",
            "locator": "7f1c0d2e9a",
        }),
    )
    .await;

    assert_eq!(err.code(), Some("item_version_mismatch"));
    assert_eq!(err.locator(), Some("7f1c0d2e9a"));
    assert_eq!(err.message(), "the version of the item does not match");
    assert!(!err.kind().is_local());
}
