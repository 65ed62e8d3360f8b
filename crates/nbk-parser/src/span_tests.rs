// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn slice_extracts_the_spanned_text() {
    let src = "a := 2";
    let span = Span::new(0, 1, 1);
    assert_eq!(span.slice(src), "a");
}

#[test]
fn slice_out_of_bounds_returns_empty() {
    let span = Span::new(100, 200, 1);
    assert_eq!(span.slice("short"), "");
}
