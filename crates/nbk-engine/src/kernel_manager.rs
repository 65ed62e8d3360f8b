// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `KernelManager` — owns every running kernel's state and drives the
//! start/run/stop lifecycle around it.
//!
//! Each `(kernel_id, user_id)` pair owns exactly one kernel: its own type
//! registry, its own attempt counters, and its own worker container. A
//! kernel's state lives behind an async mutex held across the *entire*
//! `run_block` body — including the compiler subprocess await and the
//! worker HTTP await — so two concurrent calls for the same kernel/user
//! observe strictly serial compiles and the attempt counter never races.
//! Different kernels run fully concurrently: the outer map only needs to
//! hand out a kernel's own lock, never hold one while touching another.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use nbk_adapters::{BlockSource, ContainerId, ContainerOrchestrator, WorkerClient, WorkerEnv};
use nbk_core::{Attempt, Block, BlockId, KernelError, KernelId, KernelTypeRegistry, UserId};
use nbk_parser::ExternalTypeLoader;
use tokio::sync::Mutex;

use crate::compiler::compile_plugin;

/// Everything a kernel's compile/dispatch pipeline needs to hold across
/// the whole of its life, guarded by the per-kernel mutex.
struct KernelState {
    container_id: ContainerId,
    types: KernelTypeRegistry,
    attempts: HashMap<BlockId, Attempt>,
}

impl KernelState {
    fn new(container_id: ContainerId) -> Self {
        Self { container_id, types: KernelTypeRegistry::new(), attempts: HashMap::new() }
    }

    fn next_attempt(&mut self, block_id: &BlockId) -> Attempt {
        let attempt = self.attempts.get(block_id).copied().map(Attempt::next).unwrap_or(Attempt::FIRST);
        self.attempts.insert(block_id.clone(), attempt);
        attempt
    }
}

/// Fixed parameters resolved once at construction: compiler binary path and
/// plugin-mode flag, source/object file extensions, and the timeouts and
/// container/network settings every kernel shares. A manager instance
/// always shells out to the same compiler binary for its lifetime.
pub struct KernelManagerConfig {
    pub mount_path: PathBuf,
    pub compiler_bin: String,
    pub plugin_flag: String,
    pub src_ext: String,
    pub obj_ext: String,
    pub compile_timeout: Duration,
    pub container_name_prefix: String,
    pub worker_app_port: u16,
    pub rmq_addr: String,
    pub export_prefix: String,
    pub block_prefix: String,
    pub chan_name: String,
    pub block_timeout_secs: u64,
}

pub struct KernelManager {
    config: KernelManagerConfig,
    orchestrator: Arc<dyn ContainerOrchestrator>,
    worker_client: Arc<dyn WorkerClient>,
    block_source: Arc<dyn BlockSource>,
    type_loader: Arc<dyn ExternalTypeLoader>,
    kernels: DashMap<(KernelId, UserId), Arc<Mutex<KernelState>>>,
}

impl KernelManager {
    pub fn new(
        config: KernelManagerConfig,
        orchestrator: Arc<dyn ContainerOrchestrator>,
        worker_client: Arc<dyn WorkerClient>,
        block_source: Arc<dyn BlockSource>,
        type_loader: Arc<dyn ExternalTypeLoader>,
    ) -> Self {
        Self { config, orchestrator, worker_client, block_source, type_loader, kernels: DashMap::new() }
    }

    /// Creates and starts a worker container for `(kernel_id, user_id)` and
    /// registers fresh kernel state for it. On any failure no partial state
    /// is left behind — the caller does not transition into websocket state.
    pub async fn start_kernel(&self, kernel_id: &KernelId, user_id: &UserId) -> Result<(), KernelError> {
        let env = WorkerEnv {
            rmq_addr: self.config.rmq_addr.clone(),
            kernel_id: *kernel_id,
            mount_path: self.config.mount_path.display().to_string(),
            export_prefix: self.config.export_prefix.clone(),
            block_prefix: self.config.block_prefix.clone(),
            chan_name: self.config.chan_name.clone(),
            block_timeout_secs: self.config.block_timeout_secs,
        };

        let container_id = self.orchestrator.start(&self.config.container_name_prefix, env).await?;

        self.kernels.insert((*kernel_id, *user_id), Arc::new(Mutex::new(KernelState::new(container_id))));
        Ok(())
    }

    /// Stops and removes the worker container backing `(kernel_id, user_id)`
    /// and drops its in-memory state. Connection-refused errors for an
    /// already-missing container are the orchestrator's concern to swallow.
    pub async fn stop_kernel(&self, kernel_id: &KernelId, user_id: &UserId) -> Result<(), KernelError> {
        if let Some((_, state)) = self.kernels.remove(&(*kernel_id, *user_id)) {
            let container_id = state.lock().await.container_id.clone();
            self.orchestrator.stop(&container_id).await?;
        }
        Ok(())
    }

    /// Runs one block to completion: parse, synthesize, prune, write,
    /// compile, dispatch. Holds the kernel's mutex for the whole sequence so
    /// concurrent calls for the same kernel/user serialize strictly; calls
    /// for different kernels never contend with each other.
    pub async fn run_block(&self, kernel_id: &KernelId, user_id: &UserId, block_id: &BlockId) -> Result<(), KernelError> {
        let state = self
            .kernels
            .get(&(*kernel_id, *user_id))
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| KernelError::BadRequest(format!("no kernel started for {kernel_id}/{user_id}")))?;

        let mut state = state.lock().await;

        let _span = tracing::info_span!(
            "nbk.run_block",
            %kernel_id,
            %user_id,
            %block_id,
        )
        .entered();

        let attempt = state.next_attempt(block_id);

        let text = self.block_source.read_text(kernel_id, block_id).await?;

        let user_dir = self.config.mount_path.join(kernel_id.as_str()).join(user_id.as_str());
        tokio::fs::create_dir_all(&user_dir).await.map_err(KernelError::from)?;
        set_world_writable(&user_dir).await?;

        let mut block = Block::new(*block_id, text, &mut state.types);
        nbk_parser::classify_and_infer(&mut block, Arc::clone(&self.type_loader)).await?;

        let sanitized_id = block_id.sanitized();
        let unit = nbk_synth::synthesize_and_prune(&block, &sanitized_id, attempt);
        if unit.is_empty() {
            return Err(KernelError::Build("synthesized unit failed to parse during import pruning".to_string()));
        }

        let src_path = user_dir.join(format!("block_{}.{}", block_id.as_str(), self.config.src_ext));
        tokio::fs::write(&src_path, unit.as_bytes()).await.map_err(KernelError::from)?;

        let obj_path = user_dir.join(format!("block_{sanitized_id}_at{}.{}", attempt.0, self.config.obj_ext));
        compile_plugin(&self.config.compiler_bin, &self.config.plugin_flag, &src_path, &obj_path, self.config.compile_timeout).await?;
        set_world_writable(&obj_path).await?;

        let container_name = format!("{}{}", self.config.container_name_prefix, kernel_id.as_str());
        self.worker_client.dispatch(&container_name, self.config.worker_app_port, kernel_id, user_id, block_id, attempt).await?;

        Ok(())
    }
}

#[cfg(unix)]
async fn set_world_writable(path: &std::path::Path) -> Result<(), KernelError> {
    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::Permissions::from_mode(0o777);
    tokio::fs::set_permissions(path, perms).await.map_err(KernelError::from)
}

#[cfg(not(unix))]
async fn set_world_writable(_path: &std::path::Path) -> Result<(), KernelError> {
    Ok(())
}

#[cfg(test)]
#[path = "kernel_manager_tests.rs"]
mod tests;
