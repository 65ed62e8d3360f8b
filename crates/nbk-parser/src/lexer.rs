// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tokenizer for one block's source text.
//!
//! Single pass over the byte stream, tracking line numbers so every token
//! can be attributed back to the source line the classifier keys
//! `line_kinds` by. Applies a simplified automatic-semicolon-insertion
//! rule at newlines (mirroring the target language's own ASI): a newline
//! terminates a statement only if the token immediately before it is one
//! that could legally end one (an identifier, a literal, `)`, or `}`) —
//! otherwise it's a continuation (e.g. inside an open paren, or right
//! after a comma).

use crate::span::Span;
use crate::token::{Token, TokenKind};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LexError {
    #[error("unterminated string literal at line {0}")]
    UnterminatedString(usize),
    #[error("unterminated rune literal at line {0}")]
    UnterminatedRune(usize),
    #[error("unterminated raw string literal starting at line {0}")]
    UnterminatedRawString(usize),
    #[error("unterminated block comment starting at line {0}")]
    UnterminatedComment(usize),
}

fn ends_statement(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Ident(_)
            | TokenKind::IntLit(_)
            | TokenKind::FloatLit(_)
            | TokenKind::ImaginaryLit(_)
            | TokenKind::StringLit(_)
            | TokenKind::RuneLit(_)
            | TokenKind::BoolLit(_)
            | TokenKind::RParen
            | TokenKind::RBrace
    )
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let bytes = source.as_bytes();
    let mut i = 0usize;
    let mut line = 1usize;
    let mut tokens: Vec<Token> = Vec::new();

    while i < bytes.len() {
        let c = bytes[i] as char;

        match c {
            '\n' => {
                if let Some(last) = tokens.last() {
                    if ends_statement(&last.kind) {
                        tokens.push(Token::new(TokenKind::Semi, Span::new(i, i + 1, line)));
                    }
                }
                line += 1;
                i += 1;
            }
            ' ' | '\t' | '\r' => {
                i += 1;
            }
            '/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            '/' if bytes.get(i + 1) == Some(&b'*') => {
                let start_line = line;
                i += 2;
                let mut closed = false;
                while i + 1 < bytes.len() {
                    if bytes[i] == b'\n' {
                        line += 1;
                    }
                    if bytes[i] == b'*' && bytes[i + 1] == b'/' {
                        i += 2;
                        closed = true;
                        break;
                    }
                    i += 1;
                }
                if !closed {
                    return Err(LexError::UnterminatedComment(start_line));
                }
            }
            ':' if bytes.get(i + 1) == Some(&b'=') => {
                tokens.push(Token::new(TokenKind::ColonEq, Span::new(i, i + 2, line)));
                i += 2;
            }
            ',' => {
                tokens.push(Token::new(TokenKind::Comma, Span::new(i, i + 1, line)));
                i += 1;
            }
            ';' => {
                tokens.push(Token::new(TokenKind::Semi, Span::new(i, i + 1, line)));
                i += 1;
            }
            '.' => {
                tokens.push(Token::new(TokenKind::Dot, Span::new(i, i + 1, line)));
                i += 1;
            }
            '&' => {
                tokens.push(Token::new(TokenKind::Amp, Span::new(i, i + 1, line)));
                i += 1;
            }
            '(' => {
                tokens.push(Token::new(TokenKind::LParen, Span::new(i, i + 1, line)));
                i += 1;
            }
            ')' => {
                tokens.push(Token::new(TokenKind::RParen, Span::new(i, i + 1, line)));
                i += 1;
            }
            '{' => {
                tokens.push(Token::new(TokenKind::LBrace, Span::new(i, i + 1, line)));
                i += 1;
            }
            '}' => {
                tokens.push(Token::new(TokenKind::RBrace, Span::new(i, i + 1, line)));
                i += 1;
            }
            '"' => {
                let start = i;
                let start_line = line;
                i += 1;
                let mut closed = false;
                while i < bytes.len() {
                    match bytes[i] {
                        b'\\' => i += 2,
                        b'"' => {
                            i += 1;
                            closed = true;
                            break;
                        }
                        b'\n' => return Err(LexError::UnterminatedString(start_line)),
                        _ => i += 1,
                    }
                }
                if !closed {
                    return Err(LexError::UnterminatedString(start_line));
                }
                let text = &source[start..i];
                tokens.push(Token::new(
                    TokenKind::StringLit(text.to_string()),
                    Span::new(start, i, start_line),
                ));
            }
            '`' => {
                let start = i;
                let start_line = line;
                i += 1;
                let mut closed = false;
                while i < bytes.len() {
                    if bytes[i] == b'\n' {
                        line += 1;
                    }
                    if bytes[i] == b'`' {
                        i += 1;
                        closed = true;
                        break;
                    }
                    i += 1;
                }
                if !closed {
                    return Err(LexError::UnterminatedRawString(start_line));
                }
                let text = &source[start..i];
                tokens.push(Token::new(
                    TokenKind::StringLit(text.to_string()),
                    Span::new(start, i, start_line),
                ));
            }
            '\'' => {
                let start = i;
                let start_line = line;
                i += 1;
                let mut closed = false;
                while i < bytes.len() {
                    match bytes[i] {
                        b'\\' => i += 2,
                        b'\'' => {
                            i += 1;
                            closed = true;
                            break;
                        }
                        b'\n' => return Err(LexError::UnterminatedRune(start_line)),
                        _ => i += 1,
                    }
                }
                if !closed {
                    return Err(LexError::UnterminatedRune(start_line));
                }
                let text = &source[start..i];
                tokens.push(Token::new(TokenKind::RuneLit(text.to_string()), Span::new(start, i, start_line)));
            }
            c if c.is_ascii_digit() => {
                let start = i;
                let mut is_float = false;
                while i < bytes.len() && (bytes[i] as char).is_ascii_digit() {
                    i += 1;
                }
                if bytes.get(i) == Some(&b'.') {
                    is_float = true;
                    i += 1;
                    while i < bytes.len() && (bytes[i] as char).is_ascii_digit() {
                        i += 1;
                    }
                }
                if matches!(bytes.get(i), Some(b'e') | Some(b'E')) {
                    is_float = true;
                    i += 1;
                    if matches!(bytes.get(i), Some(b'+') | Some(b'-')) {
                        i += 1;
                    }
                    while i < bytes.len() && (bytes[i] as char).is_ascii_digit() {
                        i += 1;
                    }
                }
                let imaginary = bytes.get(i) == Some(&b'i');
                if imaginary {
                    i += 1;
                }
                let text = source[start..i].to_string();
                let kind = if imaginary {
                    TokenKind::ImaginaryLit(text)
                } else if is_float {
                    TokenKind::FloatLit(text)
                } else {
                    TokenKind::IntLit(text)
                };
                tokens.push(Token::new(kind, Span::new(start, i, line)));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < bytes.len() {
                    let ch = bytes[i] as char;
                    if ch.is_alphanumeric() || ch == '_' {
                        i += 1;
                    } else {
                        break;
                    }
                }
                let text = &source[start..i];
                let kind = match text {
                    "func" => TokenKind::KwFunc,
                    "var" => TokenKind::KwVar,
                    "true" | "false" => TokenKind::BoolLit(text.to_string()),
                    _ => TokenKind::Ident(text.to_string()),
                };
                tokens.push(Token::new(kind, Span::new(start, i, line)));
            }
            _ => {
                // Any other punctuation (operators, brackets, etc.) is not
                // meaningful to classification/inference; skip one byte.
                i += 1;
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
#[path = "lexer_tests.rs"]
mod tests;
