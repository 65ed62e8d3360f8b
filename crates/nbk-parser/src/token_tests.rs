// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn display_renders_readable_messages() {
    assert_eq!(TokenKind::KwFunc.to_string(), "'func'");
    assert_eq!(TokenKind::Ident("x".into()).to_string(), "identifier 'x'");
    assert_eq!(TokenKind::ColonEq.to_string(), "':='");
}

#[test]
fn token_line_reads_through_to_span() {
    let tok = Token::new(TokenKind::KwVar, Span::new(0, 3, 5));
    assert_eq!(tok.line(), 5);
}
