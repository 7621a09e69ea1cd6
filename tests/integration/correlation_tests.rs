//! Concurrent requests over a bounded pool keep their results apart.

use std::time::Duration;

use docstore::testing::{MockConnector, MockReply, echo_response};
use docstore::{Envelope, ErrorKind, PoolConfig, decode};
use futures::future::join_all;
use serde_json::Value;

use crate::common::mock_client;

/// Every outcome resolves with the response to its own request, while no
/// more than `max_channels` exchanges run at once.
#[tokio::test]
async fn test_results_match_requests_under_contention() {
    let connector = MockConnector::new(|request| {
        MockReply::Respond(echo_response(request)).after(Duration::from_millis(10))
    });
    let pool = PoolConfig::builder().max_channels(4).max_idle(4).build();
    let client = mock_client(&connector, pool);

    let outcomes: Vec<_> = (0..32)
        .map(|i| {
            client.send(
                Envelope::get(format!("items/key-{}", i)).build(),
                decode::json::<Value>(),
            )
        })
        .collect();

    let results = join_all(outcomes.iter().map(|o| o.wait())).await;
    for (i, (outcome, result)) in outcomes.iter().zip(results).enumerate() {
        let body = result.expect("echo should succeed");
        assert_eq!(body["requestId"], outcome.request_id());
        assert_eq!(body["path"], format!("/v0/items/key-{}", i));
    }

    assert!(connector.max_in_flight() <= 4);
    assert!(connector.connect_count() <= 4);
    assert_eq!(connector.exchange_count(), 32);
}

/// Request ids are unique per send.
#[tokio::test]
async fn test_request_ids_are_unique() {
    let connector = MockConnector::echo();
    let client = mock_client(&connector, PoolConfig::default());

    let outcomes: Vec<_> = (0..16)
        .map(|_| client.send(Envelope::get("items").build(), decode::empty()))
        .collect();
    join_all(outcomes.iter().map(|o| o.wait())).await;

    let mut ids: Vec<_> = outcomes.iter().map(|o| o.request_id().to_owned()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 16);
}

/// A request that cannot get a channel in time fails locally and the pool
/// stays usable.
#[tokio::test]
async fn test_pool_exhaustion_is_local() {
    let connector = MockConnector::new(|request| {
        MockReply::Respond(echo_response(request)).after(Duration::from_millis(200))
    });
    let pool = PoolConfig::builder()
        .max_channels(1)
        .max_idle(1)
        .acquire_timeout(Duration::from_millis(20))
        .build();
    let client = mock_client(&connector, pool);

    let slow = client.send(Envelope::get("items/slow").build(), decode::json::<Value>());
    tokio::time::sleep(Duration::from_millis(5)).await;
    let starved = client.send(Envelope::get("items/starved").build(), decode::json::<Value>());

    let err = starved.wait().await.expect_err("no channel is free");
    assert_eq!(err.kind(), ErrorKind::ChannelUnavailable);
    assert_eq!(err.request_id(), Some(starved.request_id()));

    slow.wait().await.expect("first request completes");
    client
        .send(Envelope::get("items/after").build(), decode::json::<Value>())
        .await
        .expect("pool recovers once the channel is back");
    assert_eq!(connector.exchange_count(), 2);
}

/// A channel fault fails only the request that was on it.
#[tokio::test]
async fn test_fault_discards_channel() {
    let connector = MockConnector::new(|request| {
        if request.url.path().ends_with("/broken") {
            MockReply::Fault(std::io::ErrorKind::ConnectionReset)
        } else {
            MockReply::Respond(echo_response(request))
        }
    });
    let pool = PoolConfig::builder().max_channels(1).max_idle(1).build();
    let client = mock_client(&connector, pool);

    let err = client
        .send(Envelope::get("items/broken").build(), decode::empty())
        .await
        .expect_err("fault fails the request");
    assert_eq!(err.kind(), ErrorKind::Transport);

    client
        .send(Envelope::get("items/fine").build(), decode::empty())
        .await
        .expect("a fresh channel serves the next request");
    assert_eq!(connector.connect_count(), 2);
    let stats = client.pool_stats();
    assert_eq!(stats.closed, 1);
    assert_eq!(stats.idle, 1);
}
