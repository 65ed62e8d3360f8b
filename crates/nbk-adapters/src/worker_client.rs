// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `WorkerClient` — dispatches a block run to a started worker over HTTP,
//! retrying with exponential backoff and jitter up to a configured attempt
//! limit, but only on connection errors or a configured set of status codes.

use async_trait::async_trait;
use nbk_core::{Attempt, BlockId, KernelError, KernelId, UserId};
use nbk_wire::RetryPolicy;
use std::time::Duration;

/// Fires the worker's `/run` endpoint for one block attempt. The call only
/// acknowledges dispatch — the execution result arrives later on the
/// result bus.
#[async_trait]
pub trait WorkerClient: Send + Sync {
    async fn dispatch(
        &self,
        container_name: &str,
        app_port: u16,
        kernel_id: &KernelId,
        user_id: &UserId,
        block_id: &BlockId,
        attempt: Attempt,
    ) -> Result<(), KernelError>;
}

/// `reqwest`-backed dispatcher with exponential backoff and jittered retry.
pub struct HttpWorkerClient {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpWorkerClient {
    pub fn new(request_timeout: Duration, retry: RetryPolicy) -> Result<Self, KernelError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| KernelError::Dispatch(format!("failed to build http client: {e}")))?;
        Ok(Self { client, retry })
    }

    fn should_retry(&self, status: Option<u16>) -> bool {
        match status {
            None => true, // connection error
            Some(code) => self.retry.retry_on_status.contains(&code),
        }
    }

    /// Full jitter backoff: a uniformly random delay in `[0, base * 2^attempt]`,
    /// capped at `max_delay_ms`.
    fn backoff_delay(&self, attempt_index: u32) -> Duration {
        let exp = self.retry.base_delay_ms.saturating_mul(1u64 << attempt_index.min(16));
        let capped = exp.min(self.retry.max_delay_ms);
        let jittered = (capped as f64 * fastrand_like_fraction(attempt_index)) as u64;
        Duration::from_millis(jittered)
    }
}

/// A small deterministic pseudo-random fraction in `[0, 1)`, avoiding a new
/// `rand` dependency for a single jitter computation.
fn fastrand_like_fraction(seed: u32) -> f64 {
    let x = seed.wrapping_mul(2654435761).wrapping_add(0x9e3779b9);
    (x % 1000) as f64 / 1000.0
}

#[async_trait]
impl WorkerClient for HttpWorkerClient {
    async fn dispatch(
        &self,
        container_name: &str,
        app_port: u16,
        kernel_id: &KernelId,
        user_id: &UserId,
        block_id: &BlockId,
        attempt: Attempt,
    ) -> Result<(), KernelError> {
        let url = format!(
            "http://{container_name}:{app_port}/run?block_id={}&user_id={}&attempt={}",
            block_id.as_str(),
            user_id.as_str(),
            attempt
        );

        let mut last_err = String::new();
        for attempt_index in 0..self.retry.max_attempts {
            if attempt_index > 0 {
                tokio::time::sleep(self.backoff_delay(attempt_index)).await;
            }
            match self.client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    last_err = format!("worker returned status {status}");
                    if !self.should_retry(Some(status)) {
                        break;
                    }
                }
                Err(e) => {
                    last_err = e.to_string();
                    if !self.should_retry(None) {
                        break;
                    }
                }
            }
        }
        tracing::warn!(%kernel_id, %last_err, "worker dispatch failed after retries");
        Err(KernelError::Dispatch(last_err))
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    pub struct FakeWorkerClient {
        pub dispatched: Arc<Mutex<Vec<(String, String)>>>,
        fail: Arc<Mutex<bool>>,
    }

    impl FakeWorkerClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_fail(&self, fail: bool) {
            *self.fail.lock() = fail;
        }
    }

    #[async_trait]
    impl WorkerClient for FakeWorkerClient {
        async fn dispatch(
            &self,
            _container_name: &str,
            _app_port: u16,
            kernel_id: &KernelId,
            _user_id: &UserId,
            block_id: &BlockId,
            _attempt: Attempt,
        ) -> Result<(), KernelError> {
            if *self.fail.lock() {
                return Err(KernelError::Dispatch("fake worker client configured to fail".to_string()));
            }
            self.dispatched.lock().push((kernel_id.to_string(), block_id.to_string()));
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "worker_client_tests.rs"]
mod tests;
