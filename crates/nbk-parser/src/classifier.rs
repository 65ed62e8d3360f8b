// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Block Parser/Classifier.
//!
//! Single token-stream pass over a block's source, tracking a small state
//! machine: brace depth, whether we're inside a function signature or
//! body, whether a `var` declaration is open, and a run of pending
//! identifiers that become a short variable declaration's left-hand side
//! if a `:=` arrives before the statement ends. Calls into [`crate::infer`]
//! at each `:=` to resolve the right-hand side's types and bind them into
//! the kernel's registry.

use std::collections::HashSet;
use std::sync::Arc;

use nbk_core::{Block, LineKind};

use crate::infer::{infer_rhs_types, ExternalTypeLoader};
use crate::token::{Token, TokenKind};

fn mark(block: &mut Block<'_>, line: usize, kind: LineKind) {
    block.line_kinds.entry(line).or_default().insert(kind);
}

fn current_kind(inside_func: bool) -> LineKind {
    if inside_func {
        LineKind::FuncBody
    } else {
        LineKind::Other
    }
}

/// Classifies every line of `block.content` and, at each short variable
/// declaration, infers and registers its right-hand side types. Mutates
/// `block` in place; the caller reads `block.fnames`/`vnames`/`reused_*`/
/// `line_kinds` afterward to drive synthesis.
pub async fn classify_and_infer(
    block: &mut Block<'_>,
    loader: Arc<dyn ExternalTypeLoader>,
) -> Result<(), nbk_core::KernelError> {
    let _span = tracing::info_span!("nbk.classify", block_id = %block.id, len = block.content.len()).entered();

    let content = block.content.clone();
    let tokens = crate::lexer::tokenize(&content).map_err(|e| nbk_core::KernelError::Parse(e.to_string()))?;

    let existing_vars: HashSet<String> = block.types.var_names().map(str::to_string).collect();
    let existing_funcs: HashSet<String> = block.types.func_names().map(str::to_string).collect();

    let mut brace_depth: i32 = 0;
    let mut func_signature_open = false;
    let mut inside_func = false;
    let mut func_level: Option<i32> = None;
    let mut in_var_decl = false;
    let mut prev_kind: Option<TokenKind> = None;
    let mut current_fname: Option<String> = None;
    let mut current_sig = String::new();
    let mut sig_group: Option<String> = None;
    let mut pending: Vec<(String, usize)> = Vec::new();
    let mut pending_broken = false;
    let mut tokenized_lines: HashSet<usize> = HashSet::new();

    let mut idx = 0usize;
    while idx < tokens.len() {
        let Token { kind, span } = &tokens[idx];
        let line = span.line;
        tokenized_lines.insert(line);

        match kind {
            TokenKind::KwFunc => {
                func_signature_open = true;
                current_sig.clear();
                sig_group = None;
            }
            TokenKind::Ident(name) => {
                if matches!(prev_kind, Some(TokenKind::KwFunc)) {
                    mark(block, line, LineKind::FuncName);
                    block.fnames.push(name.clone());
                    current_fname = Some(name.clone());
                } else if func_signature_open {
                    mark(block, line, LineKind::FuncName);
                    sig_group = Some(name.clone());
                } else if in_var_decl {
                    mark(block, line, LineKind::VarDecl);
                    block.vnames.push(name.clone());
                    if existing_vars.contains(name) {
                        block.mark_reused_var(name);
                    }
                } else {
                    mark(block, line, current_kind(inside_func));
                    if !pending_broken {
                        pending.push((name.clone(), line));
                    }
                    if existing_vars.contains(name) {
                        block.mark_reused_var(name);
                    }
                    if existing_funcs.contains(name) {
                        block.mark_reused_func(name);
                    }
                }
            }
            TokenKind::Comma => {
                if func_signature_open {
                    if let Some(g) = sig_group.take() {
                        current_sig.push_str(&g);
                    }
                    current_sig.push(',');
                }
            }
            TokenKind::LParen => {
                if func_signature_open {
                    current_sig.push('(');
                } else {
                    mark(block, line, current_kind(inside_func));
                    pending_broken = true;
                }
            }
            TokenKind::RParen => {
                if func_signature_open {
                    if let Some(g) = sig_group.take() {
                        current_sig.push_str(&g);
                    }
                    current_sig.push(')');
                } else {
                    mark(block, line, current_kind(inside_func));
                }
            }
            TokenKind::Dot => {
                mark(block, line, current_kind(inside_func));
                pending_broken = true;
            }
            TokenKind::Amp => {
                mark(block, line, current_kind(inside_func));
            }
            TokenKind::LBrace => {
                brace_depth += 1;
                if func_signature_open {
                    if let Some(g) = sig_group.take() {
                        // A bare trailing result type with no enclosing parens
                        // (`func f() int {`) — wrap it so every signature's
                        // result segment is parenthesized uniformly.
                        current_sig.push('(');
                        current_sig.push_str(&g);
                        current_sig.push(')');
                    }
                    let fname = current_fname.clone().ok_or_else(|| {
                        nbk_core::KernelError::Parse("function body opened without a name".to_string())
                    })?;
                    block.types.put_func(fname, format!("func{current_sig}"));
                    func_signature_open = false;
                    inside_func = true;
                    func_level = Some(brace_depth - 1);
                } else if inside_func {
                    mark(block, line, LineKind::FuncBody);
                }
            }
            TokenKind::RBrace => {
                if inside_func {
                    mark(block, line, LineKind::FuncBody);
                }
                brace_depth -= 1;
                if inside_func {
                    if let Some(level) = func_level {
                        if brace_depth < level {
                            inside_func = false;
                            func_level = None;
                            current_fname = None;
                        }
                    }
                }
            }
            TokenKind::KwVar => {
                in_var_decl = true;
                mark(block, line, LineKind::VarDecl);
                if inside_func {
                    mark(block, line, LineKind::FuncBody);
                }
            }
            TokenKind::ColonEq => {
                let candidates = std::mem::take(&mut pending);
                pending_broken = false;
                mark(block, line, current_kind(inside_func));
                for (name, decl_line) in &candidates {
                    mark(block, *decl_line, LineKind::VarDecl);
                    block.vnames.push(name.clone());
                }

                let rhs_start = idx + 1;
                let mut rhs_end = tokens.len();
                for (k, tok) in tokens.iter().enumerate().skip(rhs_start) {
                    if matches!(tok.kind, TokenKind::Semi) {
                        rhs_end = k;
                        break;
                    }
                }
                let rhs_text = if rhs_start < rhs_end {
                    let first = &tokens[rhs_start];
                    let last = &tokens[rhs_end - 1];
                    content[first.span.start..last.span.end].to_string()
                } else {
                    String::new()
                };

                let types = infer_rhs_types(&rhs_text, candidates.len(), &*block.types, loader.clone()).await?;
                for ((name, _), ty) in candidates.iter().zip(types) {
                    block.types.put_var(name.clone(), ty);
                }
            }
            TokenKind::Semi => {
                in_var_decl = false;
                pending.clear();
                pending_broken = false;
            }
            TokenKind::IntLit(_)
            | TokenKind::FloatLit(_)
            | TokenKind::ImaginaryLit(_)
            | TokenKind::StringLit(_)
            | TokenKind::RuneLit(_)
            | TokenKind::BoolLit(_) => {
                mark(block, line, current_kind(inside_func));
                pending_broken = true;
            }
        }

        prev_kind = Some(kind.clone());
        idx += 1;
    }

    for idx in 0..content.lines().count() {
        let line_no = idx + 1;
        if !tokenized_lines.contains(&line_no) {
            // No token was produced from this line: it's blank, or it
            // consists solely of a comment — either way it carries no kind.
            continue;
        }
        let entry = block.line_kinds.entry(line_no).or_default();
        if entry.is_empty() {
            entry.insert(LineKind::Other);
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
