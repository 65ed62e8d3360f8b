// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Export Synthesizer.
//!
//! Assembles a single translation unit around the classified/inferred
//! block: the fixed preamble, every function the block declared, and a
//! wrapper function exporting the block's effects to the kernel's shared
//! bindings.

use indexmap::IndexSet;
use nbk_core::{Attempt, Block, LineKind};

use crate::preamble::PREAMBLE;

const INDENT: &str = "\t";

/// The exported wrapper's name: `Export_block_<sanitized_id>_at<attempt>`.
pub fn export_symbol(sanitized_block_id: &str, attempt: Attempt) -> String {
    format!("Export_block_{sanitized_block_id}_at{}", attempt.0)
}

fn dedup_preserve_order<'a, I: IntoIterator<Item = &'a String>>(items: I) -> IndexSet<String> {
    items.into_iter().cloned().collect()
}

/// Lines belonging to a function definition (`FUNC_NAME` ∪ `FUNC_BODY`),
/// emitted verbatim ahead of the wrapper.
fn function_definition_lines<'a>(block: &Block<'a>) -> String {
    let mut out = String::new();
    for (line_no, text) in block.content.lines().enumerate().map(|(i, t)| (i + 1, t)) {
        if let Some(kinds) = block.line_kinds.get(&line_no) {
            if kinds.contains(LineKind::FuncName) || kinds.contains(LineKind::FuncBody) {
                out.push_str(text);
                out.push('\n');
            }
        }
    }
    out
}

/// Lines that belong in the wrapper body: top-level `VAR_DECL`/`OTHER`
/// statements that are not themselves part of a function body.
fn wrapper_body_lines(block: &Block<'_>) -> Vec<String> {
    let mut out = Vec::new();
    for (line_no, text) in block.content.lines().enumerate().map(|(i, t)| (i + 1, t)) {
        if let Some(kinds) = block.line_kinds.get(&line_no) {
            if kinds.contains(LineKind::FuncBody) || kinds.contains(LineKind::FuncName) {
                continue;
            }
            if kinds.contains(LineKind::VarDecl) || kinds.contains(LineKind::Other) {
                out.push(text.to_string());
            }
        }
    }
    out
}

/// Synthesizes the full translation unit for one block.
/// `block` must still carry its borrowed registry (call before the block
/// is dropped at the end of `run_block`).
pub fn synthesize(block: &Block<'_>, sanitized_block_id: &str, attempt: Attempt) -> String {
    let _span = tracing::info_span!("nbk.synthesize", block_id = %block.id, attempt = attempt.0).entered();

    let declared_funcs = dedup_preserve_order(&block.fnames);
    let declared_vars = dedup_preserve_order(&block.vnames);
    let reused_funcs: Vec<String> =
        block.reused_funcs.iter().filter(|g| !declared_funcs.contains(g.as_str())).cloned().collect();
    let reused_vars: Vec<String> =
        block.reused_vars.iter().filter(|v| !declared_vars.contains(v.as_str())).cloned().collect();

    let any_funcs = !declared_funcs.is_empty() || !reused_funcs.is_empty();
    let any_vars = !declared_vars.is_empty() || !reused_vars.is_empty();

    let mut out = String::new();
    out.push_str(PREAMBLE);
    out.push_str(&function_definition_lines(block));
    out.push('\n');

    let func_map_arg = if any_funcs { "funcMap *Map[string, Any]" } else { "_ *Map[string, Any]" };
    let var_map_arg = if any_vars { "varMap *Map[string, Any]" } else { "_ *Map[string, Any]" };
    out.push_str(&format!(
        "func {}({func_map_arg}, {var_map_arg}) {{\n",
        export_symbol(sanitized_block_id, attempt)
    ));

    if any_funcs {
        out.push_str(INDENT);
        out.push_str("funcsMap := *funcMap\n");
    }
    if any_vars {
        out.push_str(INDENT);
        out.push_str("varsMap := *varMap\n");
    }

    for name in &reused_funcs {
        let sig = block.types.get_func(name).unwrap_or("func()");
        out.push_str(&format!("{INDENT}{name} := funcsMap[\"{name}\"].({sig})\n"));
    }
    for name in &reused_vars {
        let ty = block.types.get_var(name).unwrap_or("Any");
        out.push_str(&format!("{INDENT}{name} := varsMap[\"{name}\"].({ty})\n"));
    }

    for line in wrapper_body_lines(block) {
        out.push_str(INDENT);
        out.push_str(line.trim_end());
        out.push('\n');
    }

    for name in &declared_funcs {
        out.push_str(&format!("{INDENT}funcsMap[\"{name}\"] = {name}\n"));
    }
    for name in &declared_vars {
        out.push_str(&format!("{INDENT}varsMap[\"{name}\"] = {name}\n"));
    }

    out.push_str("}\n");
    out
}

#[cfg(test)]
#[path = "synth_tests.rs"]
mod tests;
