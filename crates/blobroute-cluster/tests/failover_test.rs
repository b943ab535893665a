//! Read-failover and write-fan-out behavior of the cluster client.

mod common;

use bytes::Bytes;
use futures::StreamExt;

use blobroute_core::{
    ClusterError, DeleteMultiOptions, GetOptions, HeadOptions, PutOptions, SignatureOptions,
};
use common::{started_client, test_config, MockBackend, Outcome};

#[tokio::test]
async fn read_fails_over_on_server_error() {
    let a = MockBackend::new("a");
    let b = MockBackend::new("b");
    let client = started_client(vec![a.clone(), b.clone()], test_config()).await;

    a.script("head", vec![Outcome::Status(503)]);

    let meta = client.head("k", HeadOptions::default()).await.unwrap();
    assert_eq!(meta.etag.as_deref(), Some("b"));
    assert_eq!(a.calls_for("head", "k"), 1);
    assert_eq!(b.calls_for("head", "k"), 1);
}

#[tokio::test]
async fn read_fails_over_on_transport_error() {
    let a = MockBackend::new("a");
    let b = MockBackend::new("b");
    let client = started_client(vec![a.clone(), b.clone()], test_config()).await;

    a.script("get", vec![Outcome::Transport]);

    let content = client.get("k", GetOptions::default()).await.unwrap();
    assert_eq!(content.meta.etag.as_deref(), Some("b"));
    assert_eq!(content.body, Bytes::from_static(b"abc"));
}

#[tokio::test]
async fn protocol_answer_is_not_retried() {
    let a = MockBackend::new("a");
    let b = MockBackend::new("b");
    let client = started_client(vec![a.clone(), b.clone()], test_config()).await;

    a.script("head", vec![Outcome::Status(404)]);

    let err = client.head("k", HeadOptions::default()).await.unwrap_err();
    match err {
        ClusterError::Backend(backend) => assert_eq!(backend.status, Some(404)),
        other => panic!("expected a backend error, got {other:?}"),
    }
    assert_eq!(b.calls_for("head", "k"), 0);
}

#[tokio::test]
async fn read_exhaustion_reports_all_clients_down() {
    let a = MockBackend::new("a");
    let b = MockBackend::new("b");
    let client = started_client(vec![a.clone(), b.clone()], test_config()).await;

    a.script("head", vec![Outcome::Transport]);
    b.script("head", vec![Outcome::Status(500)]);

    let err = client.head("k", HeadOptions::default()).await.unwrap_err();
    assert!(matches!(err, ClusterError::AllNodesDown { .. }));
    assert!(err.to_string().ends_with("(all clients are down)"));
    assert_eq!(a.calls_for("head", "k"), 1);
    assert_eq!(b.calls_for("head", "k"), 1);
}

#[tokio::test]
async fn get_stream_fails_over_before_streaming() {
    let a = MockBackend::new("a");
    let b = MockBackend::new("b");
    let client = started_client(vec![a.clone(), b.clone()], test_config()).await;

    a.script("get_stream", vec![Outcome::Status(502)]);

    let mut stream = client.get_stream("k", GetOptions::default()).await.unwrap();
    let chunk = stream.next().await.unwrap().unwrap();
    assert_eq!(chunk, Bytes::from_static(b"abc"));
    assert_eq!(b.calls_for("get_stream", "k"), 1);
}

#[tokio::test]
async fn write_fans_out_and_returns_first_node_receipt() {
    let a = MockBackend::new("a");
    let b = MockBackend::new("b");
    let c = MockBackend::new("c");
    let client = started_client(vec![a.clone(), b.clone(), c.clone()], test_config()).await;

    let receipt = client
        .put("k", Bytes::from_static(b"v"), PutOptions::default())
        .await
        .unwrap();

    assert_eq!(receipt.etag.as_deref(), Some("a"));
    for node in [&a, &b, &c] {
        assert_eq!(node.calls_for("put", "k"), 1);
    }
}

#[tokio::test]
async fn write_fails_when_any_node_rejects() {
    let a = MockBackend::new("a");
    let b = MockBackend::new("b");
    let c = MockBackend::new("c");
    let client = started_client(vec![a.clone(), b.clone(), c.clone()], test_config()).await;

    b.script("put", vec![Outcome::Status(500)]);

    let err = client
        .put("k", Bytes::from_static(b"v"), PutOptions::default())
        .await
        .unwrap_err();
    match err {
        ClusterError::Backend(backend) => assert_eq!(backend.status, Some(500)),
        other => panic!("expected a backend error, got {other:?}"),
    }
    // The fan-out still reached every node before the failure was reported.
    for node in [&a, &b, &c] {
        assert_eq!(node.calls_for("put", "k"), 1);
    }
}

#[tokio::test]
async fn write_reaches_nodes_marked_down() {
    let a = MockBackend::new("a");
    let b = MockBackend::new("b");
    b.pin("head", Outcome::Transport);

    let client = started_client(vec![a.clone(), b.clone()], test_config()).await;
    assert_eq!(client.availability().await, vec![true, false]);

    client
        .put("k", Bytes::from_static(b"v"), PutOptions::default())
        .await
        .unwrap();
    assert_eq!(b.calls_for("put", "k"), 1);
}

#[tokio::test]
async fn every_write_operation_fans_out() {
    let a = MockBackend::new("a");
    let b = MockBackend::new("b");
    let client = started_client(vec![a.clone(), b.clone()], test_config()).await;

    client.delete("k").await.unwrap();
    client
        .delete_multi(
            &["k1".to_string(), "k2".to_string()],
            DeleteMultiOptions::default(),
        )
        .await
        .unwrap();
    client
        .copy("dst", "src", PutOptions::default())
        .await
        .unwrap();
    client
        .put_meta("k", Default::default())
        .await
        .unwrap();
    client
        .put_stream(
            "k",
            || futures::stream::iter(vec![Ok(Bytes::from_static(b"v"))]).boxed(),
            PutOptions::default(),
        )
        .await
        .unwrap();

    for node in [&a, &b] {
        assert_eq!(node.calls_for("delete", "k"), 1);
        assert_eq!(node.calls_for("delete_multi", "k1,k2"), 1);
        assert_eq!(node.calls_for("copy", "dst"), 1);
        assert_eq!(node.calls_for("put_meta", "k"), 1);
        assert_eq!(node.calls_for("put_stream", "k"), 1);
    }
}

#[tokio::test]
async fn signature_url_uses_one_scheduled_node_without_retry() {
    let a = MockBackend::new("a");
    let b = MockBackend::new("b");
    let client = started_client(vec![a.clone(), b.clone()], test_config()).await;

    let first = client
        .signature_url("k", SignatureOptions::default())
        .await
        .unwrap();
    let second = client
        .signature_url("k", SignatureOptions::default())
        .await
        .unwrap();

    assert!(first.starts_with("mock://a/k"));
    assert!(second.starts_with("mock://b/k"));
}
