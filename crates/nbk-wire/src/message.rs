// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The result-bus wire message.

use nbk_core::{BlockId, KernelId};
use serde::{Deserialize, Serialize};

/// Emitted by a worker onto the result bus; consumed by the bus consumer
/// and routed by the session router to the listener owning `kernel_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelMessage {
    pub kernel_id: KernelId,
    pub block_id: BlockId,
    /// The worker's raw result payload, or a synthesized preprocessing/build
    /// error message when `fail` is true.
    pub result: serde_json::Value,
    pub fail: bool,
}

impl KernelMessage {
    /// Builds the synthesized failure message written back over the
    /// websocket when preprocessing or the compile step fails — `result`
    /// carries the human-readable error text.
    pub fn failure(kernel_id: KernelId, block_id: BlockId, message: impl Into<String>) -> Self {
        Self { kernel_id, block_id, result: serde_json::Value::String(message.into()), fail: true }
    }

    pub fn success(kernel_id: KernelId, block_id: BlockId, result: serde_json::Value) -> Self {
        Self { kernel_id, block_id, result, fail: false }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
