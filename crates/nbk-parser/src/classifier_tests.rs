// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use nbk_core::test_support::{block_id, seeded_registry};
use nbk_core::{KernelTypeRegistry, LineKind};

struct StubLoader;

#[async_trait::async_trait]
impl ExternalTypeLoader for StubLoader {
    async fn first_result_type(&self, import_path: &str, func_name: &str) -> Option<String> {
        match (import_path, func_name) {
            ("math", "Abs") => Some("float".to_string()),
            _ => None,
        }
    }
}

fn loader() -> Arc<dyn ExternalTypeLoader> {
    Arc::new(StubLoader)
}

fn run_async<F: std::future::Future>(f: F) -> F::Output {
    tokio::runtime::Runtime::new().unwrap().block_on(f)
}

#[test]
fn short_var_decl_registers_inferred_type() {
    let mut registry = KernelTypeRegistry::new();
    let mut block = Block::new(block_id("b1"), "x := 2", &mut registry);
    run_async(classify_and_infer(&mut block, loader())).expect("classify");
    assert_eq!(block.vnames, vec!["x".to_string()]);
    assert!(block.line_kinds[&1].contains(LineKind::VarDecl));
    drop(block);
    assert_eq!(registry.get_var("x"), Some("int"));
}

#[test]
fn multi_assign_infers_each_value_and_registers_both() {
    let mut registry = KernelTypeRegistry::new();
    let mut block = Block::new(block_id("b1"), "a, s := 2, \"hi\"", &mut registry);
    run_async(classify_and_infer(&mut block, loader())).expect("classify");
    assert_eq!(block.vnames, vec!["a".to_string(), "s".to_string()]);
    drop(block);
    assert_eq!(registry.get_var("a"), Some("int"));
    assert_eq!(registry.get_var("s"), Some("string"));
}

#[test]
fn function_declaration_marks_name_and_body_lines() {
    let mut registry = KernelTypeRegistry::new();
    let src = "func double(x int) int {\n\treturn x * 2\n}";
    let mut block = Block::new(block_id("b1"), src, &mut registry);
    run_async(classify_and_infer(&mut block, loader())).expect("classify");
    assert_eq!(block.fnames, vec!["double".to_string()]);
    assert!(block.line_kinds[&1].contains(LineKind::FuncName));
    assert!(block.line_kinds[&2].contains(LineKind::FuncBody));
    drop(block);
    assert_eq!(registry.get_func("double"), Some("func(int)(int)"));
}

#[test]
fn reused_var_from_prior_block_is_tracked() {
    let mut registry = seeded_registry();
    let mut block = Block::new(block_id("b2"), "c := a", &mut registry);
    run_async(classify_and_infer(&mut block, loader())).expect("classify");
    assert_eq!(block.reused_vars, vec!["a".to_string()]);
    assert_eq!(block.vnames, vec!["c".to_string()]);
}

#[test]
fn reused_func_from_prior_block_is_tracked() {
    let mut registry = seeded_registry();
    let mut block = Block::new(block_id("b2"), "r, msg := abc()", &mut registry);
    run_async(classify_and_infer(&mut block, loader())).expect("classify");
    assert_eq!(block.reused_funcs, vec!["abc".to_string()]);
}

#[test]
fn bare_call_statement_is_classified_other() {
    let mut registry = seeded_registry();
    let mut block = Block::new(block_id("b2"), "fmt.Println(a)", &mut registry);
    run_async(classify_and_infer(&mut block, loader())).expect("classify");
    assert!(block.line_kinds[&1].contains(LineKind::Other));
    assert_eq!(block.reused_vars, vec!["a".to_string()]);
}

#[test]
fn var_keyword_declaration_marks_var_decl_line() {
    let mut registry = KernelTypeRegistry::new();
    let mut block = Block::new(block_id("b1"), "var count int", &mut registry);
    run_async(classify_and_infer(&mut block, loader())).expect("classify");
    assert!(block.line_kinds[&1].contains(LineKind::VarDecl));
    // Every identifier scanned while `in_var_decl` is recorded, including
    // the declared type name alongside the variable name.
    assert_eq!(block.vnames, vec!["count".to_string(), "int".to_string()]);
}

#[test]
fn every_nonblank_line_ends_up_classified() {
    let mut registry = KernelTypeRegistry::new();
    let src = "x := 1\n\nfmt.Println(x)";
    let mut block = Block::new(block_id("b1"), src, &mut registry);
    run_async(classify_and_infer(&mut block, loader())).expect("classify");
    assert!(block.every_nonblank_line_classified(3));
}

#[test]
fn arity_mismatch_propagates_as_mismatch_error() {
    let mut registry = KernelTypeRegistry::new();
    let mut block = Block::new(block_id("b1"), "x := 1, 2", &mut registry);
    let err = run_async(classify_and_infer(&mut block, loader())).unwrap_err();
    assert!(matches!(err, nbk_core::KernelError::Mismatch));
}

#[test]
fn comment_only_line_carries_no_kind() {
    let mut registry = KernelTypeRegistry::new();
    let src = "x := 1\n// a note\nfmt.Println(x)";
    let mut block = Block::new(block_id("b1"), src, &mut registry);
    run_async(classify_and_infer(&mut block, loader())).expect("classify");
    assert!(!block.line_kinds.contains_key(&2));
}

#[test]
fn qualified_call_infers_via_external_loader() {
    let mut registry = KernelTypeRegistry::new();
    let mut block = Block::new(block_id("b1"), "d := math.Abs(x)", &mut registry);
    run_async(classify_and_infer(&mut block, loader())).expect("classify");
    drop(block);
    assert_eq!(registry.get_var("d"), Some("float"));
}
