mod common;

use axum::http::StatusCode;
use common::MockPushServer;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::sleep;
use ytail::client::{FlushError, ShippingClient};
use ytail::config::ClientConfig;
use ytail::pipeline::Metadata;

const WAIT: Duration = Duration::from_secs(5);

fn client_config(server: &MockPushServer) -> ClientConfig {
    let mut labels = BTreeMap::new();
    labels.insert("service_name".to_string(), "checkout".to_string());
    labels.insert("env".to_string(), "test".to_string());

    let mut config = ClientConfig::new(server.push_url(), labels);
    config.batch_max_wait = Duration::from_millis(200);
    config.backoff = Duration::from_millis(20);
    config.max_backoff = Duration::from_millis(100);
    config.timeout = Duration::from_secs(2);
    config
}

#[tokio::test]
async fn test_push_payload_shape() {
    let server = MockPushServer::start().await;
    let client = ShippingClient::builder(client_config(&server)).start().unwrap();

    let mut metadata = Metadata::new();
    metadata.insert("trace_id".to_string(), "abc123".to_string());
    client.send("first", Metadata::new()).await.unwrap();
    client.send("second", metadata).await.unwrap();

    let pushes = server.wait_for_pushes(1, WAIT).await;
    assert_eq!(pushes.len(), 1);

    let push = &pushes[0];
    assert_eq!(push.content_type.as_deref(), Some("application/json"));

    let streams = push.body["streams"].as_array().unwrap();
    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0]["stream"]["service_name"], "checkout");
    assert_eq!(streams[0]["stream"]["env"], "test");

    let values = streams[0]["values"].as_array().unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(values[0].as_array().unwrap().len(), 2);
    assert_eq!(values[0][1], "first");
    assert_eq!(values[1][1], "second");
    assert_eq!(values[1][2]["trace_id"], "abc123");

    let ts: u128 = values[0][0].as_str().unwrap().parse().unwrap();
    assert!(ts > 1_600_000_000_000_000_000);

    client.stop().await;
}

#[tokio::test]
async fn test_size_threshold_splits_batches() {
    let server = MockPushServer::start().await;
    let mut config = client_config(&server);
    // Two 6-byte lines exceed the threshold
    config.batch_max_size = 10;
    config.batch_max_wait = Duration::from_secs(30);
    let client = ShippingClient::builder(config).start().unwrap();

    for i in 1..=5 {
        client.send(format!("line-{}", i), Metadata::new()).await.unwrap();
    }

    let pushes = server.wait_for_pushes(2, WAIT).await;
    assert_eq!(pushes.len(), 2);
    assert_eq!(pushes[0].lines(), vec!["line-1", "line-2"]);
    assert_eq!(pushes[1].lines(), vec!["line-3", "line-4"]);

    client.stop().await;
}

#[tokio::test]
async fn test_failing_endpoint_retried_then_recorded() {
    let server = MockPushServer::start_with_status(StatusCode::INTERNAL_SERVER_ERROR).await;
    let mut config = client_config(&server);
    config.retry = 3;
    config.batch_max_size = 0;
    let client = ShippingClient::builder(config).start().unwrap();

    client.send("rejected", Metadata::new()).await.unwrap();

    let deadline = tokio::time::Instant::now() + WAIT;
    while client.err().is_none() && tokio::time::Instant::now() < deadline {
        sleep(Duration::from_millis(10)).await;
    }

    let err = client.err().expect("delivery failure recorded");
    match &*err {
        FlushError::Delivery { attempts, source } => {
            assert_eq!(*attempts, 3);
            assert!(source.to_string().contains("500"));
        }
        other => panic!("unexpected error: {}", other),
    }

    sleep(Duration::from_millis(300)).await;
    assert_eq!(server.pushes().len(), 3);

    // Endpoint recovers: the next batch carries only new entries
    server.set_status(StatusCode::NO_CONTENT);
    let _ = client.send("accepted", Metadata::new()).await;
    let pushes = server.wait_for_pushes(4, WAIT).await;
    assert_eq!(pushes[3].lines(), vec!["accepted"]);

    let deadline = tokio::time::Instant::now() + WAIT;
    while client.err().is_some() && tokio::time::Instant::now() < deadline {
        sleep(Duration::from_millis(10)).await;
    }
    assert!(client.err().is_none());

    client.stop().await;
}

#[tokio::test]
async fn test_unreachable_endpoint_does_not_stop_client() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = ClientConfig::new(format!("http://{}/push", addr), BTreeMap::new());
    config.retry = 2;
    config.backoff = Duration::from_millis(10);
    config.batch_max_size = 0;
    let client = ShippingClient::builder(config).start().unwrap();

    client.send("lost", Metadata::new()).await.unwrap();

    let deadline = tokio::time::Instant::now() + WAIT;
    while client.err().is_none() && tokio::time::Instant::now() < deadline {
        sleep(Duration::from_millis(10)).await;
    }
    assert!(client.err().is_some());

    // Still accepting entries
    let result = client.send("still queued", Metadata::new()).await;
    assert!(matches!(result, Err(ytail::client::SendError::LastFlush(_))));

    client.stop().await;
}
