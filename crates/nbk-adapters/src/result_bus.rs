// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ResultBus` — the named queue a worker publishes `KernelMessage` JSON
//! onto. Modeled as a trait yielding raw message bytes verbatim, so the
//! consumer can JSON-decode and forward the exact payload the worker
//! produced without this crate knowing the wire shape.
//!
//! Declares the queue, registers a non-exclusive auto-ack consumer, and
//! exposes the delivery stream.

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::options::{BasicConsumeOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ConnectionProperties, Consumer};
use nbk_core::KernelError;

/// Yields the next raw delivery body from the result queue, or `None` once
/// the underlying stream has ended (connection closed / consumer cancelled).
#[async_trait]
pub trait ResultBus: Send {
    async fn recv(&mut self) -> Option<Vec<u8>>;
}

/// AMQP-backed result bus. Auto-ack — the daemon never needs to ack/nack
/// individual deliveries, since a malformed delivery is logged and dropped
/// rather than redelivered.
pub struct LapinResultBus {
    _connection: Connection,
    _channel: Channel,
    consumer: Consumer,
}

impl LapinResultBus {
    pub async fn connect(addr: &str, queue_name: &str) -> Result<Self, KernelError> {
        let connection = Connection::connect(addr, ConnectionProperties::default())
            .await
            .map_err(|e| KernelError::Io(format!("failed to connect to result bus: {e}")))?;
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| KernelError::Io(format!("failed to open result bus channel: {e}")))?;

        channel
            .queue_declare(queue_name, QueueDeclareOptions::default(), FieldTable::default())
            .await
            .map_err(|e| KernelError::Io(format!("failed to declare result queue {queue_name}: {e}")))?;

        let consumer = channel
            .basic_consume(
                queue_name,
                "nbk-daemon",
                BasicConsumeOptions { no_ack: true, ..Default::default() },
                FieldTable::default(),
            )
            .await
            .map_err(|e| KernelError::Io(format!("failed to register result consumer: {e}")))?;

        Ok(Self { _connection: connection, _channel: channel, consumer })
    }
}

#[async_trait]
impl ResultBus for LapinResultBus {
    async fn recv(&mut self) -> Option<Vec<u8>> {
        loop {
            match self.consumer.next().await? {
                Ok(delivery) => return Some(delivery.data),
                Err(e) => {
                    tracing::warn!(error = %e, "result bus delivery error, continuing");
                    continue;
                }
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use tokio::sync::mpsc;

    /// In-memory result bus fed by a test via [`FakeResultBus::sender`].
    pub struct FakeResultBus {
        rx: mpsc::UnboundedReceiver<Vec<u8>>,
    }

    impl FakeResultBus {
        pub fn new() -> (mpsc::UnboundedSender<Vec<u8>>, Self) {
            let (tx, rx) = mpsc::unbounded_channel();
            (tx, Self { rx })
        }
    }

    #[async_trait]
    impl ResultBus for FakeResultBus {
        async fn recv(&mut self) -> Option<Vec<u8>> {
            self.rx.recv().await
        }
    }
}

#[cfg(test)]
#[path = "result_bus_tests.rs"]
mod tests;
