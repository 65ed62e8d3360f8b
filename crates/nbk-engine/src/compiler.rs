// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compiler subprocess invocation.
//!
//! Shells out to the target-language compiler in plugin-build mode with a
//! bounded timeout; retry is deliberately not applied here — only the
//! worker HTTP dispatch retries, since a failed compile means the
//! synthesized source itself is broken and won't succeed on a second try.

use std::path::Path;
use std::time::Duration;

use nbk_core::KernelError;

/// Runs `<compiler_bin> build <plugin_flag> -o <obj_path> <src_path>`,
/// capturing combined stdout+stderr. Returns `Ok(())` on a zero exit; a
/// nonzero exit or a timeout becomes a
/// [`KernelError::Build`] carrying the captured output / a timeout message.
pub async fn compile_plugin(
    compiler_bin: &str,
    plugin_flag: &str,
    src_path: &Path,
    obj_path: &Path,
    timeout: Duration,
) -> Result<(), KernelError> {
    let mut cmd = tokio::process::Command::new(compiler_bin);
    cmd.arg("build")
        .arg(plugin_flag)
        .arg("-o")
        .arg(obj_path)
        .arg(src_path)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        // Ensures a timed-out compile is killed rather than left running
        // when the `timeout` future below is dropped.
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|e| KernelError::Build(format!("failed to spawn compiler: {e}")))?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(KernelError::Build(format!("compiler process error: {e}"))),
        Err(_) => return Err(KernelError::Build(format!("compile timed out after {timeout:?}"))),
    };

    if !output.status.success() {
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        return Err(KernelError::Build(combined));
    }

    Ok(())
}

#[cfg(test)]
#[path = "compiler_tests.rs"]
mod tests;
