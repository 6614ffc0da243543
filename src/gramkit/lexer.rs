//! Tokenizer: first-match scanning over a token catalog.
//!
//! The policy is first-match, never longest-match: literal kinds are scanned
//! in registration order and the first whose value is a prefix at the current
//! position wins; only if no literal matches are pattern kinds scanned, again
//! in registration order. Callers must therefore register unambiguous
//! literals (register `printn` as its own literal rather than relying on
//! `print` plus a suffix).

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::LexError;
use super::tokens::{Token, TokenCatalog, TokenMatcher};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s+").expect("valid regex"));

/// Tokenize `text` against the catalog.
///
/// The input is trimmed first; offsets in the returned tokens are relative
/// to the trimmed text. Fails with [`LexError`] when no kind matches at a
/// non-whitespace position.
pub fn tokenize(catalog: &TokenCatalog, text: &str) -> Result<Vec<Token>, LexError> {
    let text = text.trim();
    let mut tokens = Vec::new();
    let mut position = 0;

    while position < text.len() {
        if let Some(ws) = WHITESPACE.find(&text[position..]) {
            position += ws.end();
        }
        if position >= text.len() {
            break;
        }
        let rest = &text[position..];

        if let Some(token) = match_literal(catalog, rest, position) {
            position += token.text.len();
            tokens.push(token);
            continue;
        }
        if let Some(token) = match_pattern(catalog, rest, position) {
            position += token.text.len();
            tokens.push(token);
            continue;
        }
        return Err(LexError {
            offset: position,
            remainder: rest.to_string(),
        });
    }

    Ok(tokens)
}

fn match_literal(catalog: &TokenCatalog, rest: &str, offset: usize) -> Option<Token> {
    for kind in catalog.kinds() {
        if let TokenMatcher::Literal(value) = kind.matcher() {
            if !value.is_empty() && rest.starts_with(value.as_str()) {
                return Some(Token {
                    kind: kind.name().to_string(),
                    text: value.clone(),
                    offset,
                });
            }
        }
    }
    None
}

fn match_pattern(catalog: &TokenCatalog, rest: &str, offset: usize) -> Option<Token> {
    for kind in catalog.kinds() {
        if let TokenMatcher::Pattern(regex) = kind.matcher() {
            if let Some(m) = regex.find(rest) {
                if !m.as_str().is_empty() {
                    return Some(Token {
                        kind: kind.name().to_string(),
                        text: m.as_str().to_string(),
                        offset,
                    });
                }
            }
        }
    }
    None
}
