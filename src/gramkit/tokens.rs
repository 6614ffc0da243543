//! Token catalog: named lexical kinds scanned in registration order.
//!
//! A kind is either a literal (fixed string) or a pattern (regex matched
//! against a prefix of the remaining input). Registration semantics are
//! deliberately asymmetric: registering a literal under an existing name
//! replaces that kind's matcher in place, while registering a pattern under
//! an existing name is a no-op. Clients rely on the upsert to re-point
//! keywords, and on the no-op to register shared pattern kinds freely.

use std::collections::HashMap;

use regex::Regex;
use serde::Serialize;

use super::error::GrammarDefinitionError;

/// Well-known pattern sources, usable with [`TokenCatalog::register_pattern`].
pub mod patterns {
    pub const NUMBER: &str = r"\d+(\.\d+)?";
    pub const STRING: &str = r#""[^"]*""#;
    pub const IDENTIFIER: &str = r"[A-Za-z_]\w*";
    /// Fallback for names without a dedicated pattern.
    pub const WORD: &str = r"\w+";
}

/// How a token kind recognizes input.
#[derive(Debug, Clone)]
pub enum TokenMatcher {
    Literal(String),
    /// Compiled with a `^(?:...)` anchor so it only ever matches a prefix.
    Pattern(Regex),
}

/// A named lexical category.
#[derive(Debug, Clone)]
pub struct TokenKind {
    name: String,
    matcher: TokenMatcher,
}

impl TokenKind {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matcher(&self) -> &TokenMatcher {
        &self.matcher
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.matcher, TokenMatcher::Literal(_))
    }
}

/// One lexed token. Immutable; offsets are relative to the trimmed input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    /// Name of the kind that matched.
    pub kind: String,
    /// The matched text.
    pub text: String,
    pub offset: usize,
}

/// Ordered registry of token kinds.
///
/// Scan order is registration order; the lexer tries literal kinds first,
/// then pattern kinds, each pass in this order.
#[derive(Debug, Clone, Default)]
pub struct TokenCatalog {
    kinds: Vec<TokenKind>,
    index: HashMap<String, usize>,
}

impl TokenCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a literal kind. Upsert: an existing kind of the same name
    /// keeps its scan position but gets the new literal matcher.
    pub fn register_literal(&mut self, name: &str, value: &str) {
        let matcher = TokenMatcher::Literal(value.to_string());
        match self.index.get(name) {
            Some(&i) => self.kinds[i].matcher = matcher,
            None => self.push_kind(name, matcher),
        }
    }

    /// Register a pattern kind. No-op if the name is already registered.
    pub fn register_pattern(&mut self, name: &str, pattern: &str) -> Result<(), GrammarDefinitionError> {
        if self.index.contains_key(name) {
            return Ok(());
        }
        let anchored = format!("^(?:{})", pattern);
        let regex = Regex::new(&anchored).map_err(|e| GrammarDefinitionError::InvalidPattern {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        self.push_kind(name, TokenMatcher::Pattern(regex));
        Ok(())
    }

    /// Register a pattern kind by well-known name: `NUMBER`, `STRING` and
    /// `IDENTIFIER` get their dedicated patterns, anything else falls back to
    /// a word pattern.
    pub fn register_known(&mut self, name: &str) -> Result<(), GrammarDefinitionError> {
        let pattern = match name {
            "NUMBER" => patterns::NUMBER,
            "STRING" => patterns::STRING,
            "IDENTIFIER" => patterns::IDENTIFIER,
            _ => patterns::WORD,
        };
        self.register_pattern(name, pattern)
    }

    fn push_kind(&mut self, name: &str, matcher: TokenMatcher) {
        self.index.insert(name.to_string(), self.kinds.len());
        self.kinds.push(TokenKind {
            name: name.to_string(),
            matcher,
        });
    }

    /// All kinds in scan order.
    pub fn kinds(&self) -> &[TokenKind] {
        &self.kinds
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
