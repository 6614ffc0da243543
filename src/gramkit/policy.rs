//! Start-rule selection: grammar-specific heuristics kept out of the parser.
//!
//! Which rule a raw line of text should be parsed against is a property of
//! the client grammar, not of the engine, so the heuristic is a pluggable
//! policy. The default policy reproduces the conventional behavior: a rule
//! literally named `program` wins if registered; otherwise the first token's
//! kind name is tried against the rule names (exact, then lowercased); then
//! a configured grouping rule for a leading parenthesis kind; then a
//! configured fallback. Callers that want none of this can install
//! [`FixedStart`] or pass an explicit start rule to `parse`.

use super::grammar::RuleRegistry;
use super::tokens::Token;

/// Selects the start rule for a token stream, or `None` when no rule applies.
pub trait StartPolicy {
    fn select(&self, tokens: &[Token], rules: &RuleRegistry) -> Option<String>;
}

/// The default first-token heuristic.
#[derive(Debug, Clone)]
pub struct FirstTokenPolicy {
    /// Rule name that always wins when registered.
    pub program_rule: String,
    /// Token kind treated as an opening parenthesis.
    pub paren_kind: String,
    /// Grouping rule used when the stream starts with `paren_kind`.
    pub paren_rule: String,
    /// Last resort when nothing else applies.
    pub fallback: Option<String>,
}

impl Default for FirstTokenPolicy {
    fn default() -> Self {
        FirstTokenPolicy {
            program_rule: "program".to_string(),
            paren_kind: "LPAREN".to_string(),
            paren_rule: "paren_math".to_string(),
            fallback: None,
        }
    }
}

impl FirstTokenPolicy {
    pub fn with_fallback(rule: &str) -> Self {
        FirstTokenPolicy {
            fallback: Some(rule.to_string()),
            ..Self::default()
        }
    }
}

impl StartPolicy for FirstTokenPolicy {
    fn select(&self, tokens: &[Token], rules: &RuleRegistry) -> Option<String> {
        if rules.contains(&self.program_rule) {
            return Some(self.program_rule.clone());
        }
        if let Some(first) = tokens.first() {
            if rules.contains(&first.kind) {
                return Some(first.kind.clone());
            }
            let lowered = first.kind.to_lowercase();
            if rules.contains(&lowered) {
                return Some(lowered);
            }
            if first.kind == self.paren_kind && rules.contains(&self.paren_rule) {
                return Some(self.paren_rule.clone());
            }
        }
        self.fallback.clone()
    }
}

/// Always selects the same rule.
#[derive(Debug, Clone)]
pub struct FixedStart(pub String);

impl StartPolicy for FixedStart {
    fn select(&self, _tokens: &[Token], _rules: &RuleRegistry) -> Option<String> {
        Some(self.0.clone())
    }
}
