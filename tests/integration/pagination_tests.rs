//! Walking listings page by page.

use docstore::testing::MockConnector;
use docstore::{Envelope, ErrorKind, Page, PoolConfig, decode};
use futures::{StreamExt, TryStreamExt};
use serde_json::{Value, json};

use crate::common::{AUTHORIZATION, TestFixture, mock_client};

fn seeded(count: usize) -> TestFixture {
    let fixture = TestFixture::new();
    for i in 0..count {
        fixture
            .server
            .insert("users", &format!("user-{:02}", i), json!({"n": i}));
    }
    fixture
}

fn keys(page: &Page<Value>) -> Vec<String> {
    page.results
        .iter()
        .filter_map(|item| item["path"]["key"].as_str().map(str::to_owned))
        .collect()
}

#[tokio::test]
async fn test_next_walks_every_page() {
    let fixture = seeded(7);

    let mut outcome = fixture.client.send_paged(
        Envelope::get("users").query("limit", "3").build(),
        decode::json::<Page<Value>>(),
    );
    let mut sizes = Vec::new();
    let mut seen = Vec::new();
    loop {
        let page = outcome.wait().await.expect("page loads");
        sizes.push(page.count);
        seen.extend(keys(&page));
        match outcome.next().await.expect("next link resolves") {
            Some(next) => outcome = next,
            None => break,
        }
    }

    assert_eq!(sizes, vec![3, 3, 1]);
    let expected: Vec<String> = (0..7).map(|i| format!("user-{:02}", i)).collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_pages_stream() {
    let fixture = seeded(5);

    let pages: Vec<Page<Value>> = fixture
        .client
        .send_paged(
            Envelope::get("users").query("limit", "2").build(),
            decode::json::<Page<Value>>(),
        )
        .pages()
        .try_collect()
        .await
        .expect("all pages load");

    assert_eq!(pages.len(), 3);
    assert!(pages.last().is_some_and(Page::is_last));
    let total: u64 = pages.iter().map(|p| p.count).sum();
    assert_eq!(total, 5);
}

#[tokio::test]
async fn test_single_page_has_no_next() {
    let fixture = seeded(2);

    let outcome = fixture.client.send_paged(
        Envelope::get("users").build(),
        decode::json::<Page<Value>>(),
    );
    assert!(outcome.next().await.expect("page loads").is_none());
}

#[tokio::test]
async fn test_follow_reuses_headers() {
    let connector = MockConnector::respond_with(docstore::RawResponse::json_body(
        200,
        &json!({"count": 1, "results": [1], "next": "/v0/numbers?afterKey=1"}),
    ));
    let client = mock_client(&connector, PoolConfig::default());

    let first = client.send_paged(
        Envelope::get("numbers")
            .header("X-Tenant", "acme")
            .build(),
        decode::json::<Page<u32>>(),
    );
    let second = first
        .next()
        .await
        .expect("first page loads")
        .expect("a next link is present");
    second.wait().await.expect("second page loads");

    let requests = connector.requests();
    assert_eq!(requests.len(), 2);
    let follow = &requests[1];
    assert_eq!(follow.url.path(), "/v0/numbers");
    assert_eq!(follow.url.query(), Some("afterKey=1"));
    assert_eq!(follow.headers.get("X-Tenant"), Some("acme"));
    assert_eq!(follow.headers.get("Authorization"), Some(AUTHORIZATION));
    assert_ne!(follow.request_id, requests[0].request_id);
    assert_eq!(second.request_id(), follow.request_id);
}

#[tokio::test]
async fn test_failed_page_ends_stream() {
    let fixture = seeded(3);

    let mut stream = std::pin::pin!(
        fixture
            .client
            .send_paged(
                Envelope::get("users").query("limit", "0").build(),
                decode::json::<Page<Value>>(),
            )
            .pages()
    );

    let err = stream
        .next()
        .await
        .expect("one item")
        .expect_err("limit 0 is rejected");
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_next_requires_paged_send() {
    let connector = MockConnector::respond_with(docstore::RawResponse::json_body(
        200,
        &json!({"count": 0, "results": [], "next": "/v0/numbers?afterKey=1"}),
    ));
    let client = mock_client(&connector, PoolConfig::default());

    let outcome = client.send(Envelope::get("numbers").build(), decode::json::<Page<u32>>());
    let err = outcome.next().await.expect_err("no pager attached");
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}
