// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn kernel_id_roundtrips_through_display() {
    let id = KernelId::from_string("nb-7f3a");
    assert_eq!(id.to_string(), "nb-7f3a");
    assert_eq!(id.as_str(), "nb-7f3a");
}

#[test]
fn block_id_sanitizes_hyphens_for_symbol_names() {
    let id = BlockId::from_string("block-abc-123");
    assert_eq!(id.sanitized(), "block_abc_123");
}

#[test]
fn block_id_without_hyphens_is_unchanged() {
    let id = BlockId::from_string("abc123");
    assert_eq!(id.sanitized(), "abc123");
}

#[test]
fn ids_are_usable_as_hashmap_keys_via_borrowed_str() {
    use std::collections::HashMap;
    let mut m: HashMap<KernelId, u32> = HashMap::new();
    m.insert(KernelId::from_string("k1"), 1);
    assert_eq!(m.get("k1"), Some(&1));
}

#[test]
fn attempt_starts_at_one_and_increments() {
    let a = Attempt::FIRST;
    assert_eq!(a.0, 1);
    assert_eq!(a.to_string(), "at1");
    let b = a.next();
    assert_eq!(b.0, 2);
    assert_eq!(b.to_string(), "at2");
}

#[yare::parameterized(
    same_id = { "k1", "k1", true },
    different_id = { "k1", "k2", false },
)]
fn kernel_id_equality(a: &str, b: &str, expected: bool) {
    assert_eq!(KernelId::from_string(a) == KernelId::from_string(b), expected);
}
