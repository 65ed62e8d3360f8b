// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ContainerOrchestrator` — the collaborator the compile/dispatch pipeline
//! asks to create, start, stop, and remove worker containers.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Container, ContainerPort, EnvVar, Pod, PodSpec};
use kube::api::{Api, DeleteParams, PostParams};
use kube::Client;
use nbk_core::{KernelError, KernelId};

/// Environment forwarded into every worker container.
#[derive(Debug, Clone)]
pub struct WorkerEnv {
    pub rmq_addr: String,
    pub kernel_id: KernelId,
    pub mount_path: String,
    pub export_prefix: String,
    pub block_prefix: String,
    pub chan_name: String,
    pub block_timeout_secs: u64,
}

/// Identifies a running worker container, opaque to its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerId(pub String);

/// Creates, starts, stops, and removes worker containers.
#[async_trait]
pub trait ContainerOrchestrator: Send + Sync {
    /// Creates and starts a worker container named `<prefix><kernel_id>`,
    /// bound to the shared volume, with `env` injected. Returns its id.
    async fn start(&self, name_prefix: &str, env: WorkerEnv) -> Result<ContainerId, KernelError>;

    /// Stops and removes a container. Connection-refused errors from an
    /// already-missing container are swallowed by the caller's policy, not
    /// here — this returns the underlying error untouched.
    async fn stop(&self, container_id: &ContainerId) -> Result<(), KernelError>;
}

/// Kubernetes-backed orchestrator: each worker is one pod on a named
/// network (namespace), joined to a shared PersistentVolumeClaim mounted
/// at `MOUNT_PATH`.
#[derive(Clone)]
pub struct KubernetesOrchestrator {
    client: Client,
    namespace: String,
    image: String,
    app_port: i32,
    volume_claim: String,
}

impl KubernetesOrchestrator {
    pub async fn connect(namespace: impl Into<String>, image: impl Into<String>, app_port: i32, volume_claim: impl Into<String>) -> Result<Self, KernelError> {
        let client = Client::try_default().await.map_err(|e| KernelError::KernelStartFailure(format!("failed to create kube client: {e}")))?;
        Ok(Self { client, namespace: namespace.into(), image: image.into(), app_port, volume_claim: volume_claim.into() })
    }

    fn pods(&self) -> Api<Pod> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn build_pod(&self, pod_name: &str, env: &WorkerEnv) -> Pod {
        use k8s_openapi::api::core::v1::{PersistentVolumeClaimVolumeSource, Volume, VolumeMount};

        let env_vars = vec![
            env_var("RMQ_ADDR", &env.rmq_addr),
            env_var("KERNEL_ID", env.kernel_id.as_str()),
            env_var("MOUNT_PATH", &env.mount_path),
            env_var("EXPORT_PREFIX", &env.export_prefix),
            env_var("BLOCK_PREFIX", &env.block_prefix),
            env_var("CHAN_NAME", &env.chan_name),
            env_var("BLOCK_TIMEOUT", &env.block_timeout_secs.to_string()),
        ];

        let container = Container {
            name: "worker".to_string(),
            image: Some(self.image.clone()),
            ports: Some(vec![ContainerPort { container_port: self.app_port, ..Default::default() }]),
            env: Some(env_vars),
            volume_mounts: Some(vec![VolumeMount { name: "nbk-mount".to_string(), mount_path: env.mount_path.clone(), ..Default::default() }]),
            ..Default::default()
        };

        Pod {
            metadata: k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
                name: Some(pod_name.to_string()),
                namespace: Some(self.namespace.clone()),
                labels: Some([("app".to_string(), "nbk-worker".to_string())].into_iter().collect()),
                ..Default::default()
            },
            spec: Some(PodSpec {
                containers: vec![container],
                volumes: Some(vec![Volume {
                    name: "nbk-mount".to_string(),
                    persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource { claim_name: self.volume_claim.clone(), ..Default::default() }),
                    ..Default::default()
                }]),
                restart_policy: Some("Never".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

fn env_var(name: &str, value: &str) -> EnvVar {
    EnvVar { name: name.to_string(), value: Some(value.to_string()), ..Default::default() }
}

#[async_trait]
impl ContainerOrchestrator for KubernetesOrchestrator {
    async fn start(&self, name_prefix: &str, env: WorkerEnv) -> Result<ContainerId, KernelError> {
        let pod_name = format!("{name_prefix}{}", env.kernel_id.as_str());
        let pod_spec = self.build_pod(&pod_name, &env);
        let pods = self.pods();
        tracing::info!(%pod_name, namespace = %self.namespace, "starting worker pod");
        pods.create(&PostParams::default(), &pod_spec)
            .await
            .map_err(|e| KernelError::KernelStartFailure(format!("pod creation failed: {e}")))?;
        Ok(ContainerId(pod_name))
    }

    async fn stop(&self, container_id: &ContainerId) -> Result<(), KernelError> {
        let pods = self.pods();
        match pods.delete(&container_id.0, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(resp)) if resp.code == 404 => Ok(()),
            Err(e) => Err(KernelError::KernelStartFailure(format!("pod deletion failed: {e}"))),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::sync::Arc;

    /// In-memory orchestrator for engine/daemon tests — never talks to a
    /// real cluster. Tracks which container ids are "running" so `stop`
    /// can be asserted against.
    #[derive(Clone, Default)]
    pub struct FakeOrchestrator {
        running: Arc<Mutex<HashSet<String>>>,
        fail_start: Arc<Mutex<bool>>,
    }

    impl FakeOrchestrator {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_fail_start(&self, fail: bool) {
            *self.fail_start.lock() = fail;
        }

        pub fn is_running(&self, container_id: &ContainerId) -> bool {
            self.running.lock().contains(&container_id.0)
        }
    }

    #[async_trait]
    impl ContainerOrchestrator for FakeOrchestrator {
        async fn start(&self, name_prefix: &str, env: WorkerEnv) -> Result<ContainerId, KernelError> {
            if *self.fail_start.lock() {
                return Err(KernelError::KernelStartFailure("fake orchestrator configured to fail".to_string()));
            }
            let id = format!("{name_prefix}{}", env.kernel_id.as_str());
            self.running.lock().insert(id.clone());
            Ok(ContainerId(id))
        }

        async fn stop(&self, container_id: &ContainerId) -> Result<(), KernelError> {
            self.running.lock().remove(&container_id.0);
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
