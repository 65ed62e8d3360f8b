// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `SessionRouter` (C7) — the daemon's two fan-out tables: `active_conns`
//! (`user_id -> websocket`) and `kernel_listeners` (`kernel_id -> user_id`,
//! last-writer-wins), per spec.md §3/§4.7.
//!
//! A websocket connection is represented here only by the `mpsc` channel
//! its read/write loop drains for outbound text frames — this crate's
//! router never touches a raw socket, keeping it testable without a TCP
//! listener. The actual send (and the "tear down the session after
//! persistent failures" policy from `DESIGN.md`'s Open Question 3) lives
//! in the connection loop that owns the channel's receiving end.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use nbk_core::{KernelError, KernelId, UserId};
use tokio::sync::mpsc;

struct ConnHandle {
    tx: mpsc::UnboundedSender<String>,
}

/// Shared daemon-wide state for all connected sessions. Cheap to clone
/// behind an `Arc` — every field is its own concurrent map, matching the
/// reference codebase's preference for sharded concurrent maps over a
/// single outer mutex (`DESIGN.md`'s `nbk-engine` entry makes the same
/// choice for kernel state).
pub struct SessionRouter {
    active_conns: DashMap<UserId, ConnHandle>,
    kernel_listeners: DashMap<KernelId, UserId>,
}

impl SessionRouter {
    pub fn new() -> Self {
        Self { active_conns: DashMap::new(), kernel_listeners: DashMap::new() }
    }

    /// Claims `user_id`'s connection slot, returning the receiver its
    /// websocket loop should drain for outbound frames. Fails with
    /// `BadRequest` if the user already has an active connection — the
    /// one-connection-per-user invariant from spec.md §3. The caller must
    /// roll back with [`unregister`](Self::unregister) if anything after
    /// this point (kernel start, handshake) fails.
    pub fn register(&self, user_id: UserId) -> Result<mpsc::UnboundedReceiver<String>, KernelError> {
        match self.active_conns.entry(user_id) {
            Entry::Occupied(_) => Err(KernelError::BadRequest(format!("user {user_id} already connected"))),
            Entry::Vacant(slot) => {
                let (tx, rx) = mpsc::unbounded_channel();
                slot.insert(ConnHandle { tx });
                Ok(rx)
            }
        }
    }

    /// Drops `user_id`'s connection slot. Idempotent — safe to call on a
    /// slot that was never claimed or already removed.
    pub fn unregister(&self, user_id: &UserId) {
        self.active_conns.remove(user_id);
    }

    /// Registers `user_id` as `kernel_id`'s listener. Last-writer-wins: a
    /// later registration for the same kernel silently replaces an earlier
    /// one, per spec.md §3's "reconnect replaces" semantics.
    pub fn set_listener(&self, kernel_id: KernelId, user_id: UserId) {
        self.kernel_listeners.insert(kernel_id, user_id);
    }

    /// Removes `kernel_id`'s listener entry, but only if it still points at
    /// `user_id` — a connection tearing down must not clobber a newer
    /// listener that has since reconnected and taken over the kernel.
    pub fn clear_listener_if(&self, kernel_id: &KernelId, user_id: &UserId) {
        self.kernel_listeners.remove_if(kernel_id, |_, v| v == user_id);
    }

    /// C7's `PushToKernel`: looks up the listener for `kernel_id`, then that
    /// user's connection, and enqueues `payload` as a text frame. If either
    /// is absent, logs and drops (spec.md §4.7) — this is never an error
    /// the caller needs to react to.
    pub fn push_to_kernel(&self, kernel_id: &KernelId, payload: String) {
        let Some(user_id) = self.kernel_listeners.get(kernel_id).map(|entry| *entry.value()) else {
            tracing::warn!(%kernel_id, "no listener registered for kernel, dropping message");
            return;
        };
        let Some(conn) = self.active_conns.get(&user_id) else {
            tracing::warn!(%kernel_id, %user_id, "listener has no active connection, dropping message");
            return;
        };
        if conn.tx.send(payload).is_err() {
            tracing::warn!(%kernel_id, %user_id, "failed to enqueue outbound message, connection already gone");
        }
    }

    /// Returns the number of currently active connections. Used by tests
    /// and by the daemon's own shutdown logging.
    pub fn active_connection_count(&self) -> usize {
        self.active_conns.len()
    }
}

impl Default for SessionRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
