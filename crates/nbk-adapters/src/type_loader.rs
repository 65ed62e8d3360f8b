// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Default `ExternalTypeLoader` — resolves the result type of a qualified
//! call (`pkg.Fn()`) against a static table of the standard-library
//! signatures the synthesized preamble already imports.

use async_trait::async_trait;
use nbk_parser::ExternalTypeLoader;

/// One `(import_path, func_name) -> result_type` entry.
type Entry = (&'static str, &'static str, &'static str);

const TABLE: &[Entry] = &[
    ("strconv", "Itoa", "string"),
    ("strconv", "Atoi", "int"),
    ("strconv", "FormatFloat", "string"),
    ("strconv", "ParseFloat", "float"),
    ("strconv", "ParseBool", "bool"),
    ("strings", "ToUpper", "string"),
    ("strings", "ToLower", "string"),
    ("strings", "TrimSpace", "string"),
    ("strings", "Join", "string"),
    ("strings", "Contains", "bool"),
    ("strings", "Split", "[]string"),
    ("fmt", "Sprintf", "string"),
    ("fmt", "Sprint", "string"),
    ("math", "Abs", "float"),
    ("math", "Sqrt", "float"),
    ("math", "Max", "float"),
    ("math", "Min", "float"),
    ("time", "Now", "Time"),
    ("os", "Getenv", "string"),
];

/// Looks `(import_path, func_name)` up in [`TABLE`]; returns `None` for
/// anything outside the preamble's fixed import set.
pub struct StaticTypeLoader;

#[async_trait]
impl ExternalTypeLoader for StaticTypeLoader {
    async fn first_result_type(&self, import_path: &str, func_name: &str) -> Option<String> {
        TABLE.iter().find(|(path, name, _)| *path == import_path && *name == func_name).map(|(_, _, ty)| ty.to_string())
    }
}

#[cfg(test)]
#[path = "type_loader_tests.rs"]
mod tests;
