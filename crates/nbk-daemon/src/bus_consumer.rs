// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Result Bus Consumer (C8) — reads the result queue and routes each
//! delivery by `kernel_id` to the [`SessionRouter`](crate::SessionRouter).
//!
//! Per-message errors (`DecodeError`) never terminate the loop — this is
//! load-bearing for the fault-isolation property in spec.md §7/§8: a
//! single malformed delivery must not take down the consumer for every
//! other kernel.

use std::sync::Arc;

use nbk_adapters::ResultBus;
use nbk_wire::KernelMessage;
use tokio_util::sync::CancellationToken;

use crate::session::SessionRouter;

/// Drains a [`ResultBus`], decoding each delivery just far enough to learn
/// its `kernel_id`, then forwards the *original* bytes verbatim so the
/// client sees the worker's exact payload (spec.md §4.8).
pub struct BusConsumer {
    bus: Box<dyn ResultBus>,
    router: Arc<SessionRouter>,
}

impl BusConsumer {
    pub fn new(bus: Box<dyn ResultBus>, router: Arc<SessionRouter>) -> Self {
        Self { bus, router }
    }

    /// Runs until the bus yields no further deliveries (its connection
    /// closed) or `shutdown` is cancelled, in which case the consumer
    /// exits without waiting for the next delivery — matching
    /// `SPEC_FULL.md` §5's "drop the AMQP consumer channel" shutdown step.
    pub async fn run(mut self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("result bus consumer stopping on shutdown");
                    return;
                }
                delivery = self.bus.recv() => {
                    match delivery {
                        Some(bytes) => self.handle_delivery(&bytes),
                        None => {
                            tracing::info!("result bus connection closed, consumer exiting");
                            return;
                        }
                    }
                }
            }
        }
    }

    fn handle_delivery(&self, bytes: &[u8]) {
        let message: KernelMessage = match serde_json::from_slice(bytes) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(error = %e, "malformed result bus message, dropping");
                return;
            }
        };

        match std::str::from_utf8(bytes) {
            Ok(text) => self.router.push_to_kernel(&message.kernel_id, text.to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "result bus message is not valid utf-8, dropping");
            }
        }
    }
}

#[cfg(test)]
#[path = "bus_consumer_tests.rs"]
mod tests;
