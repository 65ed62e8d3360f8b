// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The daemon's configuration surface.
//!
//! Loaded from an optional YAML file, then overlaid with `NBK_`-prefixed
//! environment variables — a config key's dotted path (`http.bind`) maps
//! to its env var name by replacing `.` with `_` and upper-casing
//! (`NBK_HTTP_BIND`). Env always wins over the file, and the file is
//! itself optional: every field has a documented default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: PathBuf, source: serde_yaml::Error },
    #[error("failed to apply environment overrides: {0}")]
    EnvOverride(serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub request_timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0:8080".to_string(), request_timeout_ms: 30_000 }
    }
}

/// Worker HTTP dispatch retry policy. Applied only to the worker call,
/// never the compiler subprocess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub retry_on_status: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay_ms: 100, max_delay_ms: 2_000, retry_on_status: vec![502, 503, 504] }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    pub image: String,
    pub network: String,
    pub name_prefix: String,
    pub app_port: u16,
    pub volume_claim: String,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            image: "nbk-worker:latest".to_string(),
            network: "nbk-net".to_string(),
            name_prefix: "nbk-".to_string(),
            app_port: 9000,
            volume_claim: "nbk-mount-pvc".to_string(),
        }
    }
}

/// The target-language compiler invocation: `<bin> build <plugin_flag> -o
/// <out>.<obj_ext> <in>.<src_ext>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub bin: String,
    pub plugin_flag: String,
    pub src_ext: String,
    pub obj_ext: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            bin: "go".to_string(),
            plugin_flag: "-buildmode=plugin".to_string(),
            src_ext: "go".to_string(),
            obj_ext: "so".to_string(),
        }
    }
}

/// Session-router limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_consecutive_send_failures: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { max_consecutive_send_failures: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub retry: RetryPolicy,
    pub compile_timeout_ms: u64,
    pub worker_request_timeout_ms: u64,
    pub mount_path: PathBuf,
    pub container: ContainerConfig,
    pub compiler: CompilerConfig,
    pub result_queue_name: String,
    pub log_filter: String,
    pub session: SessionConfig,
    /// AMQP broker address the result bus connects to (`RMQ_ADDR`, also
    /// forwarded into every worker container's environment).
    pub amqp_addr: String,
    /// Prefix applied to the exported wrapper symbol name
    /// (`Export_block_<id>_<attempt>`), forwarded to workers as
    /// `EXPORT_PREFIX`.
    pub export_prefix: String,
    /// Prefix applied to on-disk block source/object filenames, forwarded
    /// to workers as `BLOCK_PREFIX`.
    pub block_prefix: String,
    /// Per-block execution timeout enforced by the worker itself,
    /// forwarded as `BLOCK_TIMEOUT` (seconds).
    pub block_timeout_secs: u64,
    /// HTTP path the websocket upgrade endpoint is served at (the `<base>`
    /// in `GET /api/v1/<base>/ws/`).
    pub ws_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            retry: RetryPolicy::default(),
            compile_timeout_ms: 30_000,
            worker_request_timeout_ms: 10_000,
            mount_path: PathBuf::from("/mnt/nbk"),
            container: ContainerConfig::default(),
            compiler: CompilerConfig::default(),
            result_queue_name: "nbk.results".to_string(),
            log_filter: "info".to_string(),
            session: SessionConfig::default(),
            amqp_addr: "amqp://127.0.0.1:5672/%2f".to_string(),
            export_prefix: "Export_block_".to_string(),
            block_prefix: "block_".to_string(),
            block_timeout_secs: 30,
            ws_path: "/api/v1/nbk/ws/".to_string(),
        }
    }
}

impl Config {
    /// Loads the YAML file at `path` if it exists, falling back to
    /// defaults otherwise, then applies `NBK_`-prefixed environment
    /// overrides on top.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(p) if p.exists() => {
                let text = std::fs::read_to_string(p).map_err(|e| ConfigError::Read { path: p.to_path_buf(), source: e })?;
                serde_yaml::from_str(&text).map_err(|e| ConfigError::Parse { path: p.to_path_buf(), source: e })?
            }
            _ => Config::default(),
        };
        apply_env_overrides(base)
    }
}

fn apply_env_overrides(config: Config) -> Result<Config, ConfigError> {
    let mut value = serde_json::to_value(&config).map_err(ConfigError::EnvOverride)?;
    overlay_env(&mut value, "NBK");
    serde_json::from_value(value).map_err(ConfigError::EnvOverride)
}

/// Recursively walks a JSON object, replacing each leaf whose
/// `<PREFIX>_<DOTTED_PATH_WITH_UNDERSCORES>` environment variable is set.
fn overlay_env(value: &mut serde_json::Value, prefix: &str) {
    if let serde_json::Value::Object(map) = value {
        for (key, child) in map.iter_mut() {
            let child_prefix = format!("{prefix}_{}", key.to_uppercase());
            if child.is_object() {
                overlay_env(child, &child_prefix);
            } else if let Ok(raw) = std::env::var(&child_prefix) {
                *child = coerce_env_value(child, &raw);
            }
        }
    }
}

/// Parses a raw env var string into the same JSON shape as the field it's
/// overriding (number, bool, array-of-numbers for `retry_on_status`, or a
/// plain string).
fn coerce_env_value(existing: &serde_json::Value, raw: &str) -> serde_json::Value {
    match existing {
        serde_json::Value::Number(_) => {
            if let Ok(i) = raw.parse::<i64>() {
                serde_json::Value::from(i)
            } else if let Ok(f) = raw.parse::<f64>() {
                serde_json::json!(f)
            } else {
                serde_json::Value::String(raw.to_string())
            }
        }
        serde_json::Value::Bool(_) => raw.parse::<bool>().map(serde_json::Value::Bool).unwrap_or_else(|_| serde_json::Value::String(raw.to_string())),
        serde_json::Value::Array(_) => {
            serde_json::Value::Array(raw.split(',').filter_map(|s| s.trim().parse::<u16>().ok()).map(serde_json::Value::from).collect())
        }
        _ => serde_json::Value::String(raw.to_string()),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
