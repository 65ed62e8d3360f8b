// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The transient, per-execution `Block`.
//!
//! A `Block` is created at `run_block` entry and dropped before the call
//! returns — it borrows the kernel's type registry for the duration of
//! classification and inference rather than owning a copy of it, so that
//! every read of "was this name already known" and every write of "this
//! name is now known" act on the one registry the kernel owns.

use std::collections::BTreeMap;

use crate::id::BlockId;
use crate::line_kind::LineKinds;
use crate::registry::KernelTypeRegistry;

/// One user-edited unit of source, mid-execution.
pub struct Block<'r> {
    pub id: BlockId,
    pub content: String,

    /// Line number (1-indexed) → the kinds assigned to that line.
    ///
    /// Invariant: every non-blank line has at least one kind; blank lines
    /// are simply absent from this map (equivalent to
    /// `LineKinds::empty()`).
    pub line_kinds: BTreeMap<usize, LineKinds>,

    /// Identifiers declared in this block, in declaration order.
    pub fnames: Vec<String>,
    pub vnames: Vec<String>,

    /// Identifiers referenced by this block that already existed in the
    /// registry before this block ran, in first-reference order. A name
    /// appears at most once even if referenced multiple times.
    pub reused_funcs: Vec<String>,
    pub reused_vars: Vec<String>,

    /// Borrow of the kernel's type registry, held for the lifetime of
    /// parsing and inference.
    pub types: &'r mut KernelTypeRegistry,
}

impl<'r> Block<'r> {
    pub fn new(id: BlockId, content: impl Into<String>, types: &'r mut KernelTypeRegistry) -> Self {
        Self {
            id,
            content: content.into(),
            line_kinds: BTreeMap::new(),
            fnames: Vec::new(),
            vnames: Vec::new(),
            reused_funcs: Vec::new(),
            reused_vars: Vec::new(),
            types,
        }
    }

    /// Record that `name` was referenced and already existed in the var
    /// registry; appends at most once, preserving first-reference order.
    pub fn mark_reused_var(&mut self, name: &str) {
        if !self.reused_vars.iter().any(|n| n == name) {
            self.reused_vars.push(name.to_string());
        }
    }

    pub fn mark_reused_func(&mut self, name: &str) {
        if !self.reused_funcs.iter().any(|n| n == name) {
            self.reused_funcs.push(name.to_string());
        }
    }

    /// Every non-blank line has at least one kind; checked by tests, not
    /// enforced at construction (the classifier builds this incrementally).
    pub fn every_nonblank_line_classified(&self, total_lines: usize) -> bool {
        let lines: Vec<&str> = self.content.lines().collect();
        for (idx, text) in lines.iter().enumerate().take(total_lines) {
            let line_no = idx + 1;
            if text.trim().is_empty() {
                continue;
            }
            match self.line_kinds.get(&line_no) {
                Some(kinds) if !kinds.is_empty() => {}
                _ => return false,
            }
        }
        true
    }
}

#[cfg(test)]
#[path = "block_tests.rs"]
mod tests;
