// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Type inference for the right-hand side of a short variable declaration.
//!
//! Given the source text spanning `lhs, lhs2 := rhs1, rhs2`, this module
//! works out one type string per right-hand value without building a real
//! type-checker: basic literals map to their canonical type name, and
//! everything else falls back to syntactic pattern matching on the
//! expression's trailing shape (composite literal vs. call).

use std::sync::Arc;

use async_trait::async_trait;
use nbk_core::KernelError;

/// Reports the result type(s) of an exported function in some target-language
/// package, for qualified calls like `math.Abs(x)` that this crate cannot
/// resolve from the kernel's own registry. A collaborator: the daemon wires
/// in whatever facility can read real package exports (for example a module
/// cache shelled out to the target compiler), and tests wire in a stub.
#[async_trait]
pub trait ExternalTypeLoader: Send + Sync {
    /// Returns the first declared result type of `func_name` exported by
    /// `import_path`, or `None` if the package or symbol is unknown.
    async fn first_result_type(&self, import_path: &str, func_name: &str) -> Option<String>;
}

/// One inferred value produced by a single RHS expression. Multi-result
/// unqualified calls (`f()` returning two values) produce more than one
/// `InferredValue` from a single expression, which is why inference returns
/// a flat `Vec<String>` rather than one type per expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredValue {
    pub ty: String,
}

/// Canonical type name for a basic literal lexical kind, lowercase per
/// spec: integers are `"int"`, runes are `"char"`, etc.
fn literal_canonical_type(kind: &crate::token::TokenKind) -> Option<&'static str> {
    use crate::token::TokenKind::*;
    match kind {
        IntLit(_) => Some("int"),
        FloatLit(_) => Some("float"),
        ImaginaryLit(_) => Some("imaginary"),
        StringLit(_) => Some("string"),
        RuneLit(_) => Some("char"),
        BoolLit(_) => Some("bool"),
        _ => None,
    }
}

/// Splits `rhs` on commas that are not nested inside parens/braces/brackets,
/// separating multiple assigned values (`a, b := f(), g()`).
fn split_top_level_commas(rhs: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, c) in rhs.char_indices() {
        match c {
            '(' | '{' | '[' => depth += 1,
            ')' | '}' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(rhs[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let tail = rhs[start..].trim();
    if !tail.is_empty() || !parts.is_empty() {
        parts.push(tail);
    }
    parts
}

/// Counts and strips a leading run of `&` tokens (after whitespace); each
/// `&` contributes one `*` to the emitted type.
fn strip_amp_prefix(expr: &str) -> (usize, &str) {
    let trimmed = expr.trim_start();
    let stripped = trimmed.trim_start_matches('&');
    let count = trimmed.len() - stripped.len();
    (count, stripped.trim_start())
}

fn pointer_prefix(count: usize) -> String {
    "*".repeat(count)
}

/// Infers the type of a single non-literal expression using the syntactic
/// fallback rules: composite literal (ends in `}`) or call (ends in `)`).
async fn infer_expr(
    expr: &str,
    registry: &nbk_core::KernelTypeRegistry,
    loader: &dyn ExternalTypeLoader,
) -> Result<Vec<String>, KernelError> {
    let toks = crate::lexer::tokenize(expr).map_err(|e| KernelError::Parse(e.to_string()))?;
    if toks.len() == 1 {
        if let Some(ty) = literal_canonical_type(&toks[0].kind) {
            return Ok(vec![ty.to_string()]);
        }
    }

    let (amp_count, body) = strip_amp_prefix(expr);
    let prefix = pointer_prefix(amp_count);

    if body.ends_with('}') {
        let brace = body
            .find('{')
            .ok_or_else(|| KernelError::Parse(format!("composite literal missing '{{': {body}")))?;
        let ty = body[..brace].trim();
        return Ok(vec![format!("{prefix}{ty}")]);
    }

    if body.ends_with(')') {
        let paren = body
            .find('(')
            .ok_or_else(|| KernelError::Parse(format!("call missing '(': {body}")))?;
        let callee = body[..paren].trim();

        return if let Some(dot) = callee.find('.') {
            let pkg = &callee[..dot];
            let func = &callee[dot + 1..];
            let ty = loader
                .first_result_type(pkg, func)
                .await
                .ok_or_else(|| KernelError::Parse(format!("unresolved qualified call {pkg}.{func}")))?;
            Ok(vec![format!("{prefix}{ty}")])
        } else {
            let sig = registry
                .get_func(callee)
                .ok_or_else(|| KernelError::Parse(format!("unresolved call to {callee}")))?;
            let results_start = sig
                .find(')')
                .map(|i| i + 1)
                .ok_or_else(|| KernelError::Parse(format!("malformed signature for {callee}: {sig}")))?;
            let mut results = sig[results_start..].trim();
            if let Some(stripped) = results.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
                results = stripped;
            }
            if results.is_empty() {
                return Err(KernelError::Parse(format!("{callee} returns no value")));
            }
            Ok(results.split(',').map(|s| format!("{prefix}{}", s.trim())).collect())
        };
    }

    Err(KernelError::Parse(format!("cannot infer type of expression: {expr}")))
}

/// Infers one type per right-hand value in `rhs`, then checks the result
/// count against `lhs_count`.
pub async fn infer_rhs_types(
    rhs: &str,
    lhs_count: usize,
    registry: &nbk_core::KernelTypeRegistry,
    loader: Arc<dyn ExternalTypeLoader>,
) -> Result<Vec<String>, KernelError> {
    let mut types = Vec::new();
    for value_expr in split_top_level_commas(rhs) {
        types.extend(infer_expr(value_expr, registry, loader.as_ref()).await?);
    }
    if types.len() != lhs_count {
        return Err(KernelError::Mismatch);
    }
    Ok(types)
}

#[cfg(test)]
#[path = "infer_tests.rs"]
mod tests;
