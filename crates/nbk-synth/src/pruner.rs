// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Import Pruner.
//!
//! Reparses the synthesized unit and removes import declarations whose
//! bound name is never referenced in the body. Since this crate both
//! emits and parses the unit, a minimal scan suffices — we
//! never need to understand arbitrary target-language syntax, only the
//! shape of an `import (...)` block (or a single bare `import "path"`)
//! followed by a body of identifiers and selector expressions.

use nbk_parser::{Token, TokenKind};

struct ImportDecl {
    /// The name this import binds: an explicit alias, `_`, `.`, or the
    /// last path segment.
    bound_name: String,
    /// Always kept regardless of usage (dotted or blank imports).
    keep_always: bool,
    raw_line: String,
}

fn last_path_segment(path: &str) -> &str {
    path.trim_matches('"').rsplit('/').next().unwrap_or(path)
}

/// Splits `unit` into `(header, body)` where `header` spans from the start
/// through the closing `)` of the import block (or through the single-line
/// `import "..."` statement), and `body` is everything after.
fn split_import_section(unit: &str) -> Option<(&str, &str, Vec<ImportDecl>)> {
    let import_kw = unit.find("import")?;
    let after_kw = &unit[import_kw + "import".len()..];
    let trimmed = after_kw.trim_start();
    let leading_ws = after_kw.len() - trimmed.len();

    if let Some(rest) = trimmed.strip_prefix('(') {
        let close_rel = rest.find(')')?;
        let block_body = &rest[..close_rel];
        let header_end = import_kw + "import".len() + leading_ws + 1 + close_rel + 1;
        let mut decls = Vec::new();
        for line in block_body.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(decl) = parse_import_line(line) {
                decls.push(decl);
            }
        }
        Some((&unit[..header_end], &unit[header_end..], decls))
    } else {
        // Single-line `import "path"` (possibly with an alias).
        let line_end = trimmed.find('\n').unwrap_or(trimmed.len());
        let line = trimmed[..line_end].trim();
        let header_end = import_kw + "import".len() + leading_ws + line_end;
        let decls = parse_import_line(line).into_iter().collect();
        Some((&unit[..header_end], &unit[header_end..], decls))
    }
}

fn parse_import_line(line: &str) -> Option<ImportDecl> {
    let tokens = nbk_parser::tokenize(line).ok()?;
    let (alias, path_tok) = match tokens.as_slice() {
        [Token { kind: TokenKind::StringLit(_), .. }] => (None, tokens.first()?),
        [Token { kind: TokenKind::Ident(name), .. }, path @ Token { kind: TokenKind::StringLit(_), .. }] => {
            (Some(name.clone()), path)
        }
        [Token { kind: TokenKind::Dot, .. }, path @ Token { kind: TokenKind::StringLit(_), .. }] => {
            (Some(".".to_string()), path)
        }
        _ => return None,
    };
    let path = match &path_tok.kind {
        TokenKind::StringLit(s) => s.trim_matches('"').to_string(),
        _ => return None,
    };
    let bound_name = alias.clone().unwrap_or_else(|| last_path_segment(&path).to_string());
    let keep_always = matches!(alias.as_deref(), Some("_") | Some("."));
    Some(ImportDecl { bound_name, keep_always, raw_line: line.to_string() })
}

/// Collects every identifier that appears in `body`, selector base or not.
fn used_identifiers(body: &str) -> std::collections::HashSet<String> {
    let mut used = std::collections::HashSet::new();
    if let Ok(tokens) = nbk_parser::tokenize(body) {
        for tok in tokens {
            if let TokenKind::Ident(name) = tok.kind {
                used.insert(name);
            }
        }
    }
    used
}

/// Reparses `unit` and strips unused import declarations, returning the
/// reformatted source. Returns the empty string if the unit cannot be
/// parsed — the caller treats that as a fatal build failure.
pub fn prune_imports(unit: &str) -> String {
    let Some((header, body, decls)) = split_import_section(unit) else {
        tracing::warn!("import pruner: could not locate an import section");
        return String::new();
    };

    let package_clause = match unit.find("import") {
        Some(import_pos) => &unit[..import_pos],
        None => return String::new(),
    };
    let _ = header;

    if decls.is_empty() {
        return format!("{package_clause}{body}");
    }

    let used = used_identifiers(body);
    let kept: Vec<&ImportDecl> = decls.iter().filter(|d| d.keep_always || used.contains(&d.bound_name)).collect();

    if kept.is_empty() {
        return format!("{package_clause}{body}");
    }

    let mut out = String::new();
    out.push_str(package_clause);
    out.push_str("import (\n");
    for decl in kept {
        out.push('\t');
        out.push_str(&decl.raw_line);
        out.push('\n');
    }
    out.push_str(")\n");
    out.push_str(body);
    out
}

#[cfg(test)]
#[path = "pruner_tests.rs"]
mod tests;
