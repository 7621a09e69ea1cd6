//! Patch documents applied by the in-memory server.

use anyhow::Context;
use docstore::{Envelope, ErrorKind, PatchDocument, PatchOp, decode};
use serde_json::{Value, json};

use crate::common::TestFixture;

fn counters() -> Value {
    json!({"a": 0, "b": 0, "c": 0, "d": 0})
}

async fn send_patch(fixture: &TestFixture, patch: &PatchDocument) -> docstore::Result<()> {
    fixture
        .client
        .send(
            Envelope::patch("counters/k").patch_body(patch).build(),
            decode::empty(),
        )
        .await
}

#[tokio::test]
async fn test_conditional_scope_skips_only_nested_ops() {
    let fixture = TestFixture::new();
    fixture.server.insert("counters", "k", counters());

    let patch = PatchDocument::builder()
        .inc("/a")
        .patch_if(
            "/",
            PatchDocument::builder().inc("/b").test("/a", 100).inc("/c"),
        )
        .inc("/d")
        .build();
    send_patch(&fixture, &patch).await.expect("patch applies");

    assert_eq!(
        fixture.server.get("counters", "k"),
        Some(json!({"a": 1, "b": 0, "c": 0, "d": 1}))
    );
}

#[tokio::test]
async fn test_unconditional_scope_fails_whole_document() {
    let fixture = TestFixture::new();
    let before = fixture.server.insert("counters", "k", counters());

    let patch = PatchDocument::builder()
        .inc("/a")
        .patch(
            "/",
            PatchDocument::builder().inc("/b").test("/a", 100).inc("/c"),
        )
        .inc("/d")
        .build();
    let err = send_patch(&fixture, &patch)
        .await
        .expect_err("nested test fails");

    assert_eq!(err.kind(), ErrorKind::PatchConflict);
    assert_eq!(err.op_index(), Some(1));
    let failure = err.patch_failure().expect("structured failure");
    assert_eq!(failure.op(), patch.get(1).expect("built op"));
    assert_eq!(failure.nested_path(), &[1]);
    assert_eq!(
        failure.failing_op(),
        &PatchOp::Test {
            path: "/a".into(),
            value: docstore::TestValue::Value(json!(100)),
            negate: false,
        }
    );

    assert_eq!(fixture.server.get("counters", "k"), Some(counters()));
    assert_eq!(fixture.server.item_ref("counters", "k"), Some(before));
}

#[tokio::test]
async fn test_failed_op_matches_built_op() {
    let fixture = TestFixture::new();
    fixture
        .server
        .insert("users", "alice", json!({"name": "Alice", "tags": ["a"]}));

    let patch = PatchDocument::builder()
        .add("/tags/-", "b")
        .move_path("/nickname", "/alias")
        .replace("/name", "Al")
        .build();
    let err = fixture
        .client
        .send(
            Envelope::patch("users/alice").patch_body(&patch).build(),
            decode::empty(),
        )
        .await
        .expect_err("move from a missing path conflicts");

    assert_eq!(err.kind(), ErrorKind::PatchConflict);
    assert_eq!(err.op_index(), Some(1));
    assert_eq!(err.failed_op(), patch.get(1));
    assert_eq!(
        fixture.server.get("users", "alice"),
        Some(json!({"name": "Alice", "tags": ["a"]}))
    );
}

#[tokio::test]
async fn test_presence_sentinel_differs_from_null() {
    let fixture = TestFixture::new();
    fixture
        .server
        .insert("users", "alice", json!({"nickname": "Al", "deleted": null}));

    let present = PatchDocument::builder()
        .test_field_present("/nickname")
        .test_field_present("/deleted")
        .test_field_missing("/email")
        .add("/checked", true)
        .build();
    fixture
        .client
        .send(
            Envelope::patch("users/alice").patch_body(&present).build(),
            decode::empty(),
        )
        .await
        .expect("presence assertions hold");

    let literal_null = PatchDocument::builder().test("/nickname", Value::Null).build();
    let err = fixture
        .client
        .send(
            Envelope::patch("users/alice").patch_body(&literal_null).build(),
            decode::empty(),
        )
        .await
        .expect_err("a string is not null");
    assert_eq!(err.kind(), ErrorKind::TestAssertionFailed);
    assert_eq!(
        err.patch_failure().and_then(|f| f.actual()),
        Some(&json!("Al"))
    );

    assert_eq!(
        fixture.server.get("users", "alice"),
        Some(json!({"nickname": "Al", "deleted": null, "checked": true}))
    );
}

#[tokio::test]
async fn test_negated_test() {
    let fixture = TestFixture::new();
    fixture
        .server
        .insert("users", "alice", json!({"status": "active", "logins": 4}));

    let patch = PatchDocument::builder()
        .test_not("/status", "banned")
        .inc_by("/logins", 2)
        .init("/firstLogin", "2026-01-01")
        .merge("/prefs", json!({"theme": "dark"}))
        .build();
    fixture
        .client
        .send(
            Envelope::patch("users/alice").patch_body(&patch).build(),
            decode::empty(),
        )
        .await
        .expect("negated test holds");

    assert_eq!(
        fixture.server.get("users", "alice"),
        Some(json!({
            "status": "active",
            "logins": 6,
            "firstLogin": "2026-01-01",
            "prefs": {"theme": "dark"},
        }))
    );
}

#[tokio::test]
async fn test_if_match_guards_patch() {
    let fixture = TestFixture::new();
    let current = fixture.server.insert("users", "alice", json!({"logins": 0}));
    let patch = PatchDocument::builder().inc("/logins").build();

    let err = fixture
        .client
        .send(
            Envelope::patch("users/alice")
                .header("If-Match", "\"0000000000000000\"")
                .patch_body(&patch)
                .build(),
            decode::empty(),
        )
        .await
        .expect_err("stale ref");
    assert_eq!(err.kind(), ErrorKind::VersionMismatch);

    let response = fixture
        .client
        .send(
            Envelope::patch("users/alice")
                .header("If-Match", format!("\"{}\"", current))
                .patch_body(&patch)
                .build(),
            decode::raw(),
        )
        .await
        .expect("current ref");
    assert_eq!(
        response.etag_ref(),
        fixture.server.item_ref("users", "alice").as_deref()
    );
    assert_eq!(fixture.server.get("users", "alice"), Some(json!({"logins": 1})));
}

#[tokio::test]
async fn test_create_only_put() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let create = || -> anyhow::Result<Envelope> {
        Ok(Envelope::put("users/bob")
            .header("If-None-Match", "*")
            .json(&json!({"name": "Bob"}))?
            .build())
    };

    fixture
        .client
        .send(create()?, decode::empty())
        .await
        .context("first create should succeed")?;
    let err = fixture
        .client
        .send(create()?, decode::empty())
        .await
        .expect_err("second create conflicts");
    assert_eq!(err.kind(), ErrorKind::AlreadyPresent);
    assert_eq!(fixture.server.len("users"), 1);
    Ok(())
}
