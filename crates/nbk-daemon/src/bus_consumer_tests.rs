// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use nbk_adapters::result_bus::fake::FakeResultBus;
use nbk_core::{BlockId, KernelId, UserId};

use super::*;

#[tokio::test]
async fn routes_delivery_to_its_kernel_listener() {
    let router = Arc::new(SessionRouter::new());
    let user = UserId::from_string("u1");
    let kernel = KernelId::from_string("k1");
    let mut rx = router.register(user).expect("register");
    router.set_listener(kernel, user);

    let (tx, bus) = FakeResultBus::new();
    let consumer = BusConsumer::new(Box::new(bus), Arc::clone(&router));
    let shutdown = CancellationToken::new();
    let shutdown_clone = shutdown.clone();
    let handle = tokio::spawn(consumer.run(shutdown_clone));

    let msg = KernelMessage::success(kernel, BlockId::from_string("b1"), serde_json::json!({"ok": true}));
    let raw = serde_json::to_vec(&msg).expect("serialize");
    tx.send(raw.clone()).expect("send");

    let forwarded = rx.recv().await.expect("delivered");
    assert_eq!(forwarded.as_bytes(), raw.as_slice(), "forwarded bytes are the worker's exact payload");

    shutdown.cancel();
    handle.await.expect("consumer task joins");
}

#[tokio::test]
async fn malformed_delivery_is_dropped_and_consumer_continues() {
    let router = Arc::new(SessionRouter::new());
    let user = UserId::from_string("u1");
    let kernel = KernelId::from_string("k1");
    let mut rx = router.register(user).expect("register");
    router.set_listener(kernel, user);

    let (tx, bus) = FakeResultBus::new();
    let consumer = BusConsumer::new(Box::new(bus), Arc::clone(&router));
    let shutdown = CancellationToken::new();
    let shutdown_clone = shutdown.clone();
    let handle = tokio::spawn(consumer.run(shutdown_clone));

    tx.send(b"not json".to_vec()).expect("send garbage");

    let msg = KernelMessage::success(kernel, BlockId::from_string("b1"), serde_json::json!(1));
    let raw = serde_json::to_vec(&msg).expect("serialize");
    tx.send(raw.clone()).expect("send good message");

    let forwarded = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.expect("no timeout").expect("delivered");
    assert_eq!(forwarded.as_bytes(), raw.as_slice());

    shutdown.cancel();
    handle.await.expect("consumer task joins");
}

#[tokio::test]
async fn delivery_for_unknown_kernel_is_dropped_without_panicking() {
    let router = Arc::new(SessionRouter::new());
    let (tx, bus) = FakeResultBus::new();
    let consumer = BusConsumer::new(Box::new(bus), router);
    let shutdown = CancellationToken::new();
    let shutdown_clone = shutdown.clone();
    let handle = tokio::spawn(consumer.run(shutdown_clone));

    let msg = KernelMessage::failure(KernelId::from_string("ghost"), BlockId::from_string("b1"), "oops");
    tx.send(serde_json::to_vec(&msg).expect("serialize")).expect("send");

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.cancel();
    handle.await.expect("consumer task joins");
}

#[tokio::test]
async fn exits_when_bus_connection_closes() {
    let router = Arc::new(SessionRouter::new());
    let (tx, bus) = FakeResultBus::new();
    let consumer = BusConsumer::new(Box::new(bus), router);
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(consumer.run(shutdown));

    drop(tx);

    tokio::time::timeout(Duration::from_secs(1), handle).await.expect("consumer exits promptly").expect("join ok");
}
