// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graceful shutdown signal.
//!
//! Waits on `ctrl_c` the way the reference CLI's log-tail/watch loops do
//! (`tokio::signal::ctrl_c()` raced in a `select!`), plus `SIGTERM` since
//! this binary runs as a long-lived service rather than an interactive
//! command, not just an interactive ctrl-c target.

use tokio_util::sync::CancellationToken;

/// Waits for either a `ctrl_c` or (on unix) a `SIGTERM`, then cancels
/// `token`. Intended to be spawned once, at startup, alongside the
/// websocket accept loop and the result bus consumer — both select on the
/// same token to stop accepting/consuming and let in-flight work finish.
pub async fn wait_for_shutdown_signal(token: CancellationToken) {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    #[cfg(unix)]
    {
        let mut terminate = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler, ctrl_c only");
                let _ = &mut ctrl_c.await;
                token.cancel();
                return;
            }
        };

        tokio::select! {
            _ = &mut ctrl_c => tracing::info!("received ctrl_c, shutting down"),
            _ = terminate.recv() => tracing::info!("received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = &mut ctrl_c.await;
        tracing::info!("received ctrl_c, shutting down");
    }

    token.cancel();
}
