// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `BlockSource` — loads one block's text from the shared filesystem.
//!
//! The on-disk payload is a structured CRDT document; the core only needs
//! a "load and read text field" call, so the document format itself is a
//! collaborator this crate swaps in one concrete implementation for.

use async_trait::async_trait;
use nbk_core::{BlockId, KernelError, KernelId};
use std::path::{Path, PathBuf};

/// Reads a block's current source text given its kernel and block id.
#[async_trait]
pub trait BlockSource: Send + Sync {
    async fn read_text(&self, kernel_id: &KernelId, block_id: &BlockId) -> Result<String, KernelError>;
}

/// Reads `<mount>/<kernel_id>/block_<block_id>` and extracts the `"text"`
/// field from the CRDT document it stores.
pub struct FsBlockSource {
    mount_path: PathBuf,
}

impl FsBlockSource {
    pub fn new(mount_path: impl Into<PathBuf>) -> Self {
        Self { mount_path: mount_path.into() }
    }

    fn block_path(&self, kernel_id: &KernelId, block_id: &BlockId) -> PathBuf {
        self.mount_path.join(kernel_id.as_str()).join(format!("block_{}", block_id.as_str()))
    }
}

#[async_trait]
impl BlockSource for FsBlockSource {
    async fn read_text(&self, kernel_id: &KernelId, block_id: &BlockId) -> Result<String, KernelError> {
        let path = self.block_path(kernel_id, block_id);
        let bytes = tokio::fs::read(&path).await.map_err(KernelError::from)?;
        extract_text_field(&bytes, &path)
    }
}

/// Extracts the `"text"` field from a block's CRDT document payload.
///
/// The document format itself isn't this crate's concern; what's required
/// is compatibility with the worker's own reader of the same payload. A
/// JSON object with a top-level `"text"` string is the narrowest format
/// that satisfies that contract, so that's what's decoded here.
fn extract_text_field(bytes: &[u8], path: &Path) -> Result<String, KernelError> {
    let doc: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| KernelError::Io(format!("malformed block document at {}: {e}", path.display())))?;
    doc.get("text")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| KernelError::Io(format!("block document at {} has no \"text\" field", path.display())))
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    pub struct FakeBlockSource {
        texts: Arc<Mutex<HashMap<(String, String), String>>>,
    }

    impl FakeBlockSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_text(&self, kernel_id: &KernelId, block_id: &BlockId, text: impl Into<String>) {
            self.texts.lock().insert((kernel_id.to_string(), block_id.to_string()), text.into());
        }
    }

    #[async_trait]
    impl BlockSource for FakeBlockSource {
        async fn read_text(&self, kernel_id: &KernelId, block_id: &BlockId) -> Result<String, KernelError> {
            self.texts
                .lock()
                .get(&(kernel_id.to_string(), block_id.to_string()))
                .cloned()
                .ok_or_else(|| KernelError::Io(format!("no fake block text registered for {kernel_id}/{block_id}")))
        }
    }
}

#[cfg(test)]
#[path = "block_source_tests.rs"]
mod tests;
