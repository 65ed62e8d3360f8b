// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The error taxonomy every crate converges on at the daemon boundary.
//! Each variant documents the handling policy it carries.

use thiserror::Error;

/// Errors surfaced by the core, carrying the handling policy assigned to
/// each kind.
#[derive(Debug, Error)]
pub enum KernelError {
    /// Missing `kernel-id`, or the user already has an active connection.
    /// Handling: HTTP 400 at upgrade time.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Container create/start failed. Handling: HTTP 400 at upgrade time.
    #[error("kernel start failed: {0}")]
    KernelStartFailure(String),

    /// Block lexing or type inference failure. Handling: reported on the
    /// websocket as `KernelMessage{fail:true}`.
    #[error("parse error: {0}")]
    Parse(String),

    /// LHS/RHS arity disagreement in a `:=` statement. Same handling as
    /// `Parse`.
    #[error("variables decl and val don't match")]
    Mismatch,

    /// Compile subprocess nonzero exit or timeout. Same handling as
    /// `Parse`; combined stdout+stderr is included.
    #[error("build error: {0}")]
    Build(String),

    /// Worker HTTP call failed after retries. Same handling as `Parse`.
    #[error("dispatch error: {0}")]
    Dispatch(String),

    /// Filesystem read/write failure. Same handling as `Parse`.
    #[error("io error: {0}")]
    Io(String),

    /// Bus message JSON invalid. Handling: logged by the result-bus
    /// consumer, message dropped, consumer continues — never surfaced to a
    /// websocket.
    #[error("decode error: {0}")]
    Decode(String),

    /// Read/write on a closed or broken websocket. Handling: best-effort
    /// diagnostic text frame, then close and teardown.
    #[error("websocket error: {0}")]
    Websocket(String),
}

impl KernelError {
    /// The prefix prepended when reporting a preprocessing/build failure
    /// back over the websocket (`"error compiling: "+msg`).
    pub fn compiling_message(&self) -> String {
        format!("error compiling: {self}")
    }

    /// True for the errors that are recoverable at the block level (kernel
    /// state and container survive).
    pub fn is_block_level(&self) -> bool {
        matches!(
            self,
            KernelError::Parse(_)
                | KernelError::Mismatch
                | KernelError::Build(_)
                | KernelError::Dispatch(_)
                | KernelError::Io(_)
        )
    }
}

impl From<std::io::Error> for KernelError {
    fn from(err: std::io::Error) -> Self {
        KernelError::Io(err.to_string())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
