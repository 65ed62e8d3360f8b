// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::os::unix::fs::PermissionsExt;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use nbk_adapters::block_source::fake::FakeBlockSource;
use nbk_adapters::orchestrator::fake::FakeOrchestrator;
use nbk_adapters::worker_client::fake::FakeWorkerClient;
use nbk_adapters::{BlockSource, ContainerOrchestrator, StaticTypeLoader, WorkerClient};
use nbk_core::{KernelId, UserId};
use nbk_engine::KernelManagerConfig;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use super::*;
use crate::user_resolver::fake::StaticUserIdResolver;

fn fake_compiler(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("fake_compiler.sh");
    std::fs::write(&path, "#!/bin/sh\ntouch \"$4\"\nexit 0\n").expect("write fake compiler");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
    path
}

struct Harness {
    server: Arc<WsServer>,
    block_source: Arc<FakeBlockSource>,
    worker_client: Arc<FakeWorkerClient>,
    addr: std::net::SocketAddr,
    shutdown: CancellationToken,
    _mount: tempfile::TempDir,
}

async fn harness(user_id: UserId) -> Harness {
    let mount = tempfile::tempdir().expect("tempdir");
    let compiler = fake_compiler(mount.path());

    let orchestrator = Arc::new(FakeOrchestrator::new());
    let worker_client = Arc::new(FakeWorkerClient::new());
    let block_source = Arc::new(FakeBlockSource::new());
    let type_loader = Arc::new(StaticTypeLoader);

    let config = KernelManagerConfig {
        mount_path: mount.path().to_path_buf(),
        compiler_bin: compiler.to_str().expect("utf8").to_string(),
        plugin_flag: "-buildmode=plugin".to_string(),
        src_ext: "go".to_string(),
        obj_ext: "so".to_string(),
        compile_timeout: Duration::from_secs(5),
        container_name_prefix: "nbk-".to_string(),
        worker_app_port: 9000,
        rmq_addr: "amqp://localhost".to_string(),
        export_prefix: "Export_block_".to_string(),
        block_prefix: "block_".to_string(),
        chan_name: "nbk.results".to_string(),
        block_timeout_secs: 30,
    };

    let kernel_manager = Arc::new(nbk_engine::KernelManager::new(
        config,
        Arc::clone(&orchestrator) as Arc<dyn ContainerOrchestrator>,
        Arc::clone(&worker_client) as Arc<dyn WorkerClient>,
        Arc::clone(&block_source) as Arc<dyn BlockSource>,
        type_loader,
    ));

    let router = Arc::new(SessionRouter::new());
    let resolver = Arc::new(StaticUserIdResolver(user_id));
    let server = Arc::new(WsServer::new(kernel_manager, router, resolver, "/api/v1/nbk/ws/", 3));

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");

    let shutdown = CancellationToken::new();
    tokio::spawn(Arc::clone(&server).serve(listener, shutdown.clone()));

    Harness { server, block_source, worker_client, addr, shutdown, _mount: mount }
}

#[tokio::test]
async fn full_round_trip_runs_a_block_and_stops_kernel_on_close() {
    let kid = KernelId::from_string("k1");
    let uid = UserId::from_string("u1");
    let h = harness(uid).await;
    h.block_source.set_text(&kid, &nbk_core::BlockId::from_string("b1"), "x := 1\n");

    let url = format!("ws://{}/api/v1/nbk/ws/?kernel-id=k1", h.addr);
    let (mut ws, response) = tokio_tungstenite::connect_async(&url).await.expect("connect");
    assert_eq!(response.status(), 101);

    ws.send(Message::Text("b1".to_string().into())).await.expect("send block id");

    // Give run_block time to dispatch before asserting.
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if !h.worker_client.dispatched.lock().is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("block dispatched within timeout");

    assert_eq!(h.worker_client.dispatched.lock()[0], ("k1".to_string(), "b1".to_string()));
    assert_eq!(h.server.router.active_connection_count(), 1);

    drop(ws);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.server.router.active_connection_count(), 0);

    h.shutdown.cancel();
}

#[tokio::test]
async fn missing_kernel_id_is_rejected_with_400() {
    let h = harness(UserId::from_string("u1")).await;

    let url = format!("ws://{}/api/v1/nbk/ws/", h.addr);
    let err = tokio_tungstenite::connect_async(&url).await.expect_err("missing kernel-id rejected");
    assert!(format!("{err}").contains("400") || format!("{err:?}").contains("400"));

    h.shutdown.cancel();
}

#[tokio::test]
async fn second_connection_for_same_user_is_rejected() {
    let uid = UserId::from_string("u1");
    let h = harness(uid).await;

    let url = format!("ws://{}/api/v1/nbk/ws/?kernel-id=k1", h.addr);
    let (_ws, _resp) = tokio_tungstenite::connect_async(&url).await.expect("first connect succeeds");

    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = tokio_tungstenite::connect_async(&url).await;
    assert!(second.is_err(), "second connection for the same user must be rejected");

    h.shutdown.cancel();
}

#[tokio::test]
async fn compile_failure_is_reported_as_a_failing_kernel_message() {
    let kid = KernelId::from_string("k1");
    let uid = UserId::from_string("u1");
    let h = harness(uid).await;
    // No text registered for "missing" — BlockSource::read_text fails, which
    // run_block surfaces as an Io error reported back as a failing message.
    let _ = kid;

    let url = format!("ws://{}/api/v1/nbk/ws/?kernel-id=k1", h.addr);
    let (mut ws, _resp) = tokio_tungstenite::connect_async(&url).await.expect("connect");

    ws.send(Message::Text("missing".to_string().into())).await.expect("send block id");

    let reply = tokio::time::timeout(Duration::from_secs(2), ws.next()).await.expect("no timeout").expect("frame").expect("ok frame");
    let Message::Text(text) = reply else { panic!("expected text frame") };
    let msg: nbk_wire::KernelMessage = serde_json::from_str(&text).expect("valid json");
    assert!(msg.fail);

    h.shutdown.cancel();
}
