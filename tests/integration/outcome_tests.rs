//! Observing results through the outcome handle.

use std::sync::Arc;
use std::time::Duration;

use docstore::testing::{MockConnector, MockReply, echo_response};
use docstore::{Envelope, ErrorKind, Outcome, PoolConfig, decode};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::common::{TestFixture, mock_client};

fn delayed_echo(delay: Duration) -> MockConnector {
    MockConnector::new(move |request| MockReply::Respond(echo_response(request)).after(delay))
}

/// Waiting and callbacks observe the same terminal value.
#[tokio::test]
async fn test_wait_and_callback_agree() {
    let connector = delayed_echo(Duration::from_millis(20));
    let client = mock_client(&connector, PoolConfig::default());

    let outcome = client.send(Envelope::get("items/a").build(), decode::json::<Value>());
    let (tx, rx) = oneshot::channel();
    outcome.on_complete(
        move |value| {
            let _ = tx.send(value);
        },
        |_| {},
    );

    let waited = outcome.wait().await.expect("request succeeds");
    let delivered = rx.await.expect("success callback runs");
    assert_eq!(waited, delivered);
    assert_eq!(waited["requestId"], outcome.request_id());
}

/// Only the failure callback runs for a failed request.
#[tokio::test]
async fn test_failure_callback() {
    let fixture = TestFixture::new();
    let outcome = fixture
        .client
        .send(Envelope::get("users/nobody").build(), decode::json::<Value>());

    let (tx, rx) = oneshot::channel();
    let success_ran = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&success_ran);
    outcome.on_complete(move |_| *flag.lock() = true, move |err| {
        let _ = tx.send(err);
    });

    let err = rx.await.expect("failure callback runs");
    assert_eq!(err.kind(), ErrorKind::RequestFailed);
    assert_eq!(err.code(), Some("items_not_found"));
    assert!(!*success_ran.lock());
}

/// A callback registered after resolution still runs.
#[tokio::test]
async fn test_callback_after_resolution() {
    let outcome = Outcome::ready(Ok(7_u32));
    let (tx, rx) = oneshot::channel();
    outcome.on_complete(
        move |value| {
            let _ = tx.send(value);
        },
        |_| {},
    );
    assert_eq!(rx.await.expect("callback runs"), 7);
}

/// A timed-out wait does not cancel the request.
#[tokio::test]
async fn test_wait_timeout_leaves_outcome_pending() {
    let connector = delayed_echo(Duration::from_millis(100));
    let client = mock_client(&connector, PoolConfig::default());

    let outcome = client.send(Envelope::get("items/slow").build(), decode::json::<Value>());
    let err = outcome
        .wait_timeout(Duration::from_millis(10))
        .await
        .expect_err("too early");
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(err.request_id(), Some(outcome.request_id()));
    assert!(!outcome.is_resolved());

    let value = outcome
        .wait_timeout(Duration::from_secs(5))
        .await
        .expect("resolves later");
    assert_eq!(value["path"], "/v0/items/slow");
    assert!(outcome.try_result().is_some_and(|r| r.is_ok()));
}

/// Blocking waits work from threads outside the runtime.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_wait_blocking_from_thread() {
    let connector = delayed_echo(Duration::from_millis(20));
    let client = mock_client(&connector, PoolConfig::default());

    let outcome = client.send(Envelope::get("items/b").build(), decode::json::<Value>());
    let waiter = outcome.clone();
    let value = tokio::task::spawn_blocking(move || waiter.wait_blocking(Some(Duration::from_secs(5))))
        .await
        .expect("blocking task joins")
        .expect("request succeeds");

    assert_eq!(value["path"], "/v0/items/b");
    assert!(outcome.is_resolved());
}

/// Clones share one result and every waiter sees it.
#[tokio::test]
async fn test_clones_share_result() {
    let fixture = TestFixture::new();
    fixture
        .server
        .insert("users", "alice", serde_json::json!({"name": "Alice"}));

    let outcome = fixture
        .client
        .send(Envelope::get("users/alice").build(), decode::json::<Value>());
    let other = outcome.clone();

    let (a, b) = tokio::join!(outcome.wait(), other.wait());
    assert_eq!(a.expect("first waiter"), b.expect("second waiter"));
    assert_eq!(outcome.request_id(), other.request_id());
}
