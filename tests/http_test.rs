//! Integration tests for the standalone HTTP bridge.

#![cfg(feature = "standalone")]

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use promethea::http::{ServerConfig, StandaloneServer};
use promethea::prelude::*;
use tokio::time::timeout;

#[test]
fn server_config_defaults_match_convention() {
    let config = ServerConfig::default();
    assert_eq!(config.port, 9090);
    assert_eq!(config.host, "0.0.0.0");
    assert_eq!(config.metrics_path, "/metrics");
}

fn leaked_test_registry(name: &str) -> &'static Registry {
    Box::leak(Box::new(Registry::new(name).unwrap()))
}

#[tokio::test]
async fn metrics_endpoint_serves_registered_counters() {
    let registry = leaked_test_registry("http_integration");
    let counter = Arc::new(Counter::new("http_test_requests_total", "help", vec![]).unwrap());
    registry.register_metric(counter.clone()).unwrap();
    counter.inc(&[]).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let server = StandaloneServer::builder().port(port).host("127.0.0.1").build(registry);
    let server_handle = tokio::spawn(async move { server.run().await });

    tokio::time::sleep(Duration::from_millis(100)).await;

    let client = reqwest::Client::new();
    let resp = timeout(
        Duration::from_secs(5),
        client.get(format!("http://127.0.0.1:{port}/metrics")).send(),
    )
    .await
    .expect("request timed out")
    .expect("request failed");

    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "text/plain; version=0.0.4"
    );
    let body = resp.text().await.unwrap();
    assert!(body.contains("http_test_requests_total 1"));

    server_handle.abort();
}

#[tokio::test]
async fn unknown_path_is_404() {
    let registry = leaked_test_registry("http_404");

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let server = StandaloneServer::builder().port(port).host("127.0.0.1").build(registry);
    let server_handle = tokio::spawn(async move { server.run().await });

    tokio::time::sleep(Duration::from_millis(100)).await;

    let client = reqwest::Client::new();
    let resp = timeout(
        Duration::from_secs(5),
        client.get(format!("http://127.0.0.1:{port}/nope")).send(),
    )
    .await
    .expect("request timed out")
    .expect("request failed");

    assert_eq!(resp.status(), 404);

    server_handle.abort();
}
