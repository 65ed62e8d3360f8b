// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::fake::FakeWorkerClient;
use super::*;
use nbk_core::test_support::{block_id, kernel_id, user_id};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn retry_policy() -> RetryPolicy {
    RetryPolicy { max_attempts: 3, base_delay_ms: 1, max_delay_ms: 5, retry_on_status: vec![503] }
}

/// Spawns a one-shot TCP server that replies with `status_line` to every
/// connection it accepts, up to `responses.len()` times.
async fn spawn_server(responses: Vec<&'static str>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        for response in responses {
            let Ok((mut stream, _)) = listener.accept().await else { return };
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let _ = stream.write_all(response.as_bytes()).await;
        }
    });
    addr.to_string()
}

#[tokio::test]
async fn dispatch_succeeds_on_first_2xx_response() {
    let addr = spawn_server(vec!["HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n"]).await;
    let (host, port) = addr.rsplit_once(':').expect("host:port");
    let client = HttpWorkerClient::new(std::time::Duration::from_secs(2), retry_policy()).expect("client");
    client
        .dispatch(host, port.parse().unwrap(), &kernel_id("k1"), &user_id("u1"), &block_id("b1"), Attempt::FIRST)
        .await
        .expect("dispatch should succeed");
}

#[tokio::test]
async fn dispatch_retries_retryable_status_then_succeeds() {
    let addr = spawn_server(vec!["HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\n\r\n", "HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n"]).await;
    let (host, port) = addr.rsplit_once(':').expect("host:port");
    let client = HttpWorkerClient::new(std::time::Duration::from_secs(2), retry_policy()).expect("client");
    client
        .dispatch(host, port.parse().unwrap(), &kernel_id("k1"), &user_id("u1"), &block_id("b1"), Attempt::FIRST)
        .await
        .expect("dispatch should succeed after one retry");
}

#[tokio::test]
async fn dispatch_does_not_retry_non_retryable_status() {
    let addr = spawn_server(vec!["HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\n\r\n"]).await;
    let (host, port) = addr.rsplit_once(':').expect("host:port");
    let client = HttpWorkerClient::new(std::time::Duration::from_secs(2), retry_policy()).expect("client");
    let err = client
        .dispatch(host, port.parse().unwrap(), &kernel_id("k1"), &user_id("u1"), &block_id("b1"), Attempt::FIRST)
        .await
        .unwrap_err();
    assert!(matches!(err, KernelError::Dispatch(_)));
}

#[tokio::test]
async fn dispatch_fails_after_exhausting_retries_on_connection_error() {
    let client = HttpWorkerClient::new(std::time::Duration::from_millis(200), retry_policy()).expect("client");
    let err = client
        .dispatch("127.0.0.1", 1, &kernel_id("k1"), &user_id("u1"), &block_id("b1"), Attempt::FIRST)
        .await
        .unwrap_err();
    assert!(matches!(err, KernelError::Dispatch(_)));
}

#[tokio::test]
async fn fake_worker_client_records_dispatched_blocks() {
    let fake = FakeWorkerClient::new();
    fake.dispatch("nbk-k1", 9000, &kernel_id("k1"), &user_id("u1"), &block_id("b1"), Attempt::FIRST).await.expect("dispatch");
    assert_eq!(fake.dispatched.lock()[0], ("k1".to_string(), "b1".to_string()));
}

#[tokio::test]
async fn fake_worker_client_can_be_configured_to_fail() {
    let fake = FakeWorkerClient::new();
    fake.set_fail(true);
    let err = fake.dispatch("nbk-k1", 9000, &kernel_id("k1"), &user_id("u1"), &block_id("b1"), Attempt::FIRST).await.unwrap_err();
    assert!(matches!(err, KernelError::Dispatch(_)));
}
