// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `UserIdResolver` — resolves the authenticated user for an upgrade
//! request.
//!
//! Authentication/authorization middleware is explicitly out of scope for
//! this server (spec.md §1); the original implementation's HTTP handler
//! hardcodes a single placeholder user id where a real auth middleware
//! would have already set one (it reads `userId := "1"` directly in the
//! handshake handler, with a `// check access` comment marking the seam).
//! This trait is that seam, generalized from a hardcoded literal to a
//! narrow collaborator: the concrete implementation below trusts a header
//! that upstream middleware is assumed to have already populated, rather
//! than hardcoding an id.

use nbk_core::{KernelError, UserId};

/// Resolves the user id for an incoming upgrade request.
pub trait UserIdResolver: Send + Sync {
    fn resolve(&self, user_header: Option<&str>) -> Result<UserId, KernelError>;
}

/// Reads the user id from a header an upstream auth middleware is assumed
/// to have set on the request before it reaches this handler.
pub struct HeaderUserIdResolver {
    header_name: String,
}

impl HeaderUserIdResolver {
    pub const DEFAULT_HEADER: &'static str = "x-user-id";

    pub fn new() -> Self {
        Self { header_name: Self::DEFAULT_HEADER.to_string() }
    }

    pub fn with_header_name(header_name: impl Into<String>) -> Self {
        Self { header_name: header_name.into() }
    }
}

impl Default for HeaderUserIdResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl UserIdResolver for HeaderUserIdResolver {
    fn resolve(&self, user_header: Option<&str>) -> Result<UserId, KernelError> {
        let raw = user_header.ok_or_else(|| KernelError::BadRequest(format!("missing {} header", self.header_name)))?;
        if raw.is_empty() {
            return Err(KernelError::BadRequest(format!("empty {} header", self.header_name)));
        }
        Ok(UserId::from_string(raw))
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;

    /// Always resolves to the same configured user, matching the original
    /// handler's hardcoded placeholder (`userId := "1"`) before real auth
    /// is wired in.
    pub struct StaticUserIdResolver(pub UserId);

    impl UserIdResolver for StaticUserIdResolver {
        fn resolve(&self, _user_header: Option<&str>) -> Result<UserId, KernelError> {
            Ok(self.0)
        }
    }
}

#[cfg(test)]
#[path = "user_resolver_tests.rs"]
mod tests;
