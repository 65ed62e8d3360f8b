// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Websocket upgrade handler and per-connection read/write loop (C7's
//! `Upgrade handler`), driven over a raw [`TcpListener`] the way the
//! reference daemon drives its own listener loop (`listener/mod.rs`):
//! accept, spawn a per-connection task, select the accept loop against a
//! shutdown token.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use nbk_core::{BlockId, KernelId};
use nbk_engine::KernelManager;
use nbk_wire::KernelMessage;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;

use crate::http_parse::{self, UpgradeRequest};
use crate::session::SessionRouter;
use crate::user_resolver::UserIdResolver;

/// Everything the upgrade handler and connection loop need. Cheap to clone
/// (every field is already an `Arc` or a plain value) — a fresh clone is
/// handed to each spawned connection task.
#[derive(Clone)]
pub struct WsServer {
    kernel_manager: Arc<KernelManager>,
    router: Arc<SessionRouter>,
    resolver: Arc<dyn UserIdResolver>,
    ws_path: String,
    max_consecutive_send_failures: u32,
}

impl WsServer {
    pub fn new(
        kernel_manager: Arc<KernelManager>,
        router: Arc<SessionRouter>,
        resolver: Arc<dyn UserIdResolver>,
        ws_path: impl Into<String>,
        max_consecutive_send_failures: u32,
    ) -> Self {
        Self { kernel_manager, router, resolver, ws_path: ws_path.into(), max_consecutive_send_failures }
    }

    /// Accepts connections on `listener` until `shutdown` is cancelled.
    /// Matches spec.md §5's "stop accepting new websocket upgrades" — the
    /// accept loop itself exits, but connections already past the upgrade
    /// are left running to drain.
    pub async fn serve(self: Arc<Self>, listener: TcpListener, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("websocket listener stopping on shutdown");
                    return;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            let server = Arc::clone(&self);
                            tokio::spawn(async move {
                                tracing::debug!(%addr, "accepted connection");
                                server.handle_connection(stream).await;
                            });
                        }
                        Err(e) => tracing::warn!(error = %e, "accept failed"),
                    }
                }
            }
        }
    }

    async fn handle_connection(&self, mut stream: TcpStream) {
        let head = match http_parse::read_request_head(&mut stream).await {
            Ok(head) => head,
            Err(e) => {
                tracing::debug!(error = %e, "failed to read request head");
                return;
            }
        };

        let request = match http_parse::parse_request(&head) {
            Ok(request) => request,
            Err(e) => {
                let _ = http_parse::write_http_error(&mut stream, "400 Bad Request", &e).await;
                return;
            }
        };

        if request.path != self.ws_path {
            let _ = http_parse::write_http_error(&mut stream, "404 Not Found", "unknown path").await;
            return;
        }

        if let Err(e) = self.admit(&mut stream, &request).await {
            tracing::debug!(error = %e, "upgrade request rejected");
        }
    }

    /// Runs the upgrade sequence from spec.md §4.7: validate `kernel-id`,
    /// reject an already-connected user, start the kernel, then upgrade.
    /// Any failure after `register` rolls its reservation back so a failed
    /// attempt never leaks a phantom connection slot.
    async fn admit(&self, stream: &mut TcpStream, request: &UpgradeRequest) -> Result<(), String> {
        let Some(kernel_id) = request.kernel_id.as_deref().map(KernelId::from_string) else {
            http_parse::write_http_error(stream, "400 Bad Request", "missing kernel-id").await.map_err(|e| e.to_string())?;
            return Err("missing kernel-id".to_string());
        };

        let user_id = match self.resolver.resolve(request.user_header.as_deref()) {
            Ok(user_id) => user_id,
            Err(e) => {
                http_parse::write_http_error(stream, "400 Bad Request", &e.to_string()).await.map_err(|e| e.to_string())?;
                return Err(e.to_string());
            }
        };

        let Some(ws_key) = request.ws_key.clone() else {
            http_parse::write_http_error(stream, "400 Bad Request", "missing Sec-WebSocket-Key").await.map_err(|e| e.to_string())?;
            return Err("missing Sec-WebSocket-Key".to_string());
        };

        let mut rx = match self.router.register(user_id) {
            Ok(rx) => rx,
            Err(e) => {
                http_parse::write_http_error(stream, "400 Bad Request", &e.to_string()).await.map_err(|e| e.to_string())?;
                return Err(e.to_string());
            }
        };

        if let Err(e) = self.kernel_manager.start_kernel(&kernel_id, &user_id).await {
            self.router.unregister(&user_id);
            http_parse::write_http_error(stream, "400 Bad Request", &e.to_string()).await.map_err(|e| e.to_string())?;
            return Err(e.to_string());
        }

        if let Err(e) = http_parse::write_switching_protocols(stream, &ws_key).await {
            self.router.unregister(&user_id);
            let _ = self.kernel_manager.stop_kernel(&kernel_id, &user_id).await;
            return Err(e.to_string());
        }

        self.router.set_listener(kernel_id, user_id);

        let ws_stream = WebSocketStream::from_raw_socket(stream, Role::Server, None).await;
        self.drive_connection(ws_stream, &mut rx, kernel_id, user_id).await;

        self.router.unregister(&user_id);
        self.router.clear_listener_if(&kernel_id, &user_id);
        if let Err(e) = self.kernel_manager.stop_kernel(&kernel_id, &user_id).await {
            tracing::warn!(%kernel_id, %user_id, error = %e, "failed to stop kernel on session teardown");
        }
        Ok(())
    }

    /// Drives one connection's inbound/outbound loop until the socket
    /// closes, errors, or `max_consecutive_send_failures` outbound sends in
    /// a row fail (Open Question 3 in `DESIGN.md`).
    async fn drive_connection(
        &self,
        ws_stream: WebSocketStream<&mut TcpStream>,
        rx: &mut mpsc::UnboundedReceiver<String>,
        kernel_id: KernelId,
        user_id: nbk_core::UserId,
    ) {
        let (mut sink, mut stream) = ws_stream.split();
        let mut consecutive_failures: u32 = 0;

        loop {
            tokio::select! {
                inbound = stream.next() => {
                    match inbound {
                        Some(Ok(Message::Text(text))) => {
                            let block_id = BlockId::from_string(text.trim());
                            if let Err(e) = self.kernel_manager.run_block(&kernel_id, &user_id, &block_id).await {
                                let msg = KernelMessage::failure(kernel_id, block_id, e.compiling_message());
                                if !send_text(&mut sink, &msg).await {
                                    break;
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_other)) => {}
                        Some(Err(e)) => {
                            tracing::debug!(%kernel_id, %user_id, error = %e, "error reading websocket message");
                            if sink.send(Message::Text("error reading message".to_string().into())).await.is_err() {
                                break;
                            }
                        }
                    }
                }
                outbound = rx.recv() => {
                    match outbound {
                        Some(payload) => {
                            if sink.send(Message::Text(payload.into())).await.is_err() {
                                consecutive_failures += 1;
                                tracing::warn!(%kernel_id, %user_id, failures = consecutive_failures, "failed to send outbound message");
                                if consecutive_failures >= self.max_consecutive_send_failures {
                                    break;
                                }
                            } else {
                                consecutive_failures = 0;
                            }
                        }
                        None => break,
                    }
                }
            }
        }

        let _ = sink.close().await;
    }
}

/// Serializes `msg` and sends it as a text frame. Returns `false` (and the
/// caller should close the connection) on a send failure, matching "on
/// send failure, close and exit" from spec.md §4.7.
async fn send_text<S>(sink: &mut futures_util::stream::SplitSink<WebSocketStream<S>, Message>, msg: &KernelMessage) -> bool
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let Ok(text) = serde_json::to_string(msg) else {
        tracing::error!("failed to serialize outbound kernel message");
        return false;
    };
    sink.send(Message::Text(text.into())).await.is_ok()
}
