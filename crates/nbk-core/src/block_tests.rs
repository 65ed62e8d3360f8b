// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::id::BlockId;
use crate::line_kind::LineKind;

#[test]
fn mark_reused_var_is_append_once() {
    let mut reg = KernelTypeRegistry::new();
    let mut block = Block::new(BlockId::from_string("b1"), "a := 2", &mut reg);
    block.mark_reused_var("a");
    block.mark_reused_var("a");
    block.mark_reused_var("b");
    assert_eq!(block.reused_vars, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn every_nonblank_line_classified_fails_when_a_line_is_missing() {
    let mut reg = KernelTypeRegistry::new();
    let mut block = Block::new(BlockId::from_string("b1"), "a := 2\nfmt.Println(a)", &mut reg);
    block.line_kinds.insert(1, [LineKind::VarDecl].into_iter().collect());
    assert!(!block.every_nonblank_line_classified(2));
    block.line_kinds.insert(2, [LineKind::Other].into_iter().collect());
    assert!(block.every_nonblank_line_classified(2));
}

#[test]
fn blank_lines_need_no_classification() {
    let mut reg = KernelTypeRegistry::new();
    let mut block = Block::new(BlockId::from_string("b1"), "a := 2\n\nfmt.Println(a)", &mut reg);
    block.line_kinds.insert(1, [LineKind::VarDecl].into_iter().collect());
    block.line_kinds.insert(3, [LineKind::Other].into_iter().collect());
    assert!(block.every_nonblank_line_classified(3));
}
