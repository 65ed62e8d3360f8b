// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test-only helpers shared across crates (gated behind `test-support`).

use crate::id::{BlockId, KernelId, UserId};
use crate::registry::KernelTypeRegistry;

/// A registry pre-seeded with a handful of common bindings, useful for
/// exercising reuse/rehydration paths without repeating the same
/// `put_var`/`put_func` calls in every test.
pub fn seeded_registry() -> KernelTypeRegistry {
    let mut reg = KernelTypeRegistry::new();
    reg.put_var("a", "int");
    reg.put_var("b", "int");
    reg.put_func("abc", "func()(int,string)");
    reg
}

pub fn kernel_id(s: &str) -> KernelId {
    KernelId::from_string(s)
}

pub fn user_id(s: &str) -> UserId {
    UserId::from_string(s)
}

pub fn block_id(s: &str) -> BlockId {
    BlockId::from_string(s)
}
