//! Recursive-descent matcher producing immutable parse trees.
//!
//! Matching is ordered choice all the way down: mandatory slots in declared
//! order, alternatives within a slot in declared order, first success wins.
//! A rule is transactional: if any mandatory slot fails, the whole rule
//! fails and the position resets to the rule's entry point, so no partial
//! slot results ever escape. The optional list is then matched greedily,
//! appending one node per iteration until no alternative matches; each
//! iteration must consume at least one token (grammar validation guarantees
//! this for well-formed grammars, and the matcher refuses zero-width
//! iterations anyway).
//!
//! Parsing is strict: the start rule must consume every token.

use serde::Serialize;

use super::error::{ParseError, ParseErrorKind};
use super::grammar::{Matchable, RuleDefinition, RuleId, RuleRegistry, INLINE_RULE_TYPE};
use super::tokens::Token;

/// One node of a parse tree.
///
/// Rule matches carry their children under named slots (in slot order) and
/// the accumulated optional matches; token matches are leaves carrying the
/// matched text in `value`. Nodes are produced once per successful match and
/// freely shareable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseNode {
    /// Rule name or token kind name.
    pub node_type: String,
    pub slots: Vec<(String, ParseNode)>,
    /// Optional repeat matches; empty when the optional slot contributed
    /// nothing (or was not declared).
    pub optional: Vec<ParseNode>,
    /// Matched text, present only on token leaves.
    pub value: Option<String>,
}

impl ParseNode {
    fn branch(node_type: &str) -> Self {
        ParseNode {
            node_type: node_type.to_string(),
            slots: Vec::new(),
            optional: Vec::new(),
            value: None,
        }
    }

    fn leaf(token: &Token) -> Self {
        ParseNode {
            node_type: token.kind.clone(),
            slots: Vec::new(),
            optional: Vec::new(),
            value: Some(token.text.clone()),
        }
    }

    /// Child under a named slot, if present.
    pub fn slot(&self, name: &str) -> Option<&ParseNode> {
        self.slots
            .iter()
            .find(|(slot, _)| slot == name)
            .map(|(_, child)| child)
    }

    /// Terminal text for token leaves.
    pub fn text(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn is_leaf(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_type(&self, name: &str) -> bool {
        self.node_type == name
    }
}

/// Match `start` against the whole token sequence.
///
/// The grammar is expected to be validated (see
/// [`RuleRegistry::validate`]); the engine does this before calling in.
pub fn parse(
    registry: &RuleRegistry,
    tokens: &[Token],
    start: &str,
) -> Result<ParseNode, ParseError> {
    let id = registry.id_of(start).ok_or_else(|| ParseError {
        position: 0,
        kind: ParseErrorKind::UnknownRule {
            name: start.to_string(),
        },
    })?;
    let mut matcher = Matcher {
        registry,
        tokens,
        furthest: 0,
    };
    match matcher.match_rule(id, 0) {
        Some((node, position)) if position == tokens.len() => Ok(node),
        Some((_, position)) => Err(ParseError {
            position,
            kind: ParseErrorKind::TrailingTokens,
        }),
        None => Err(ParseError {
            position: matcher.furthest,
            kind: ParseErrorKind::NoMatch {
                rule: start.to_string(),
            },
        }),
    }
}

struct Matcher<'a> {
    registry: &'a RuleRegistry,
    tokens: &'a [Token],
    /// Furthest token position any comparison reached; reported on failure.
    furthest: usize,
}

impl<'a> Matcher<'a> {
    fn match_rule(&mut self, id: RuleId, position: usize) -> Option<(ParseNode, usize)> {
        let definition = self.registry.definition(id)?;
        let name = self.registry.name_of(id).to_string();
        self.match_definition(&name, definition, position)
    }

    fn match_definition(
        &mut self,
        name: &str,
        definition: &RuleDefinition,
        entry: usize,
    ) -> Option<(ParseNode, usize)> {
        let mut node = ParseNode::branch(name);
        let mut position = entry;

        for (slot, alternatives) in definition.slots() {
            // First alternative that succeeds is taken; failure of every
            // alternative fails the whole rule, implicitly resetting to the
            // entry position.
            let (child, next) = alternatives
                .iter()
                .find_map(|alt| self.match_element(alt, position))?;
            node.slots.push((slot.clone(), child));
            position = next;
        }

        let optional = definition.optional_alternatives();
        if !optional.is_empty() {
            loop {
                let mut advanced = false;
                for alt in optional {
                    if let Some((child, next)) = self.match_element(alt, position) {
                        if next > position {
                            node.optional.push(child);
                            position = next;
                            advanced = true;
                        }
                        break;
                    }
                }
                if !advanced {
                    break;
                }
            }
        }

        Some((node, position))
    }

    fn match_element(&mut self, element: &Matchable, position: usize) -> Option<(ParseNode, usize)> {
        match element {
            Matchable::Kind(kind) => {
                self.furthest = self.furthest.max(position);
                let token = self.tokens.get(position)?;
                if token.kind == *kind {
                    Some((ParseNode::leaf(token), position + 1))
                } else {
                    None
                }
            }
            Matchable::Rule(id) => self.match_rule(*id, position),
            Matchable::Inline(definition) => {
                self.match_definition(INLINE_RULE_TYPE, definition, position)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gramkit::grammar::RuleDefinition;
    use crate::gramkit::lexer::tokenize;
    use crate::gramkit::tokens::TokenCatalog;

    fn catalog() -> TokenCatalog {
        let mut catalog = TokenCatalog::new();
        catalog.register_literal("PLUS", "+");
        catalog.register_literal("MINUS", "-");
        catalog.register_known("NUMBER").unwrap();
        catalog
    }

    fn chain_grammar() -> RuleRegistry {
        let mut registry = RuleRegistry::new();
        let continuer = registry.define_rule("continuer");
        registry
            .set_definition(
                "math",
                RuleDefinition::new()
                    .slot("a", vec![Matchable::kind("NUMBER")])
                    .slot("b", vec![Matchable::kind("PLUS"), Matchable::kind("MINUS")])
                    .slot("c", vec![Matchable::kind("NUMBER")])
                    .optional(vec![Matchable::rule(continuer)]),
            )
            .unwrap();
        registry
            .set_definition(
                "continuer",
                RuleDefinition::new()
                    .slot("a", vec![Matchable::kind("PLUS"), Matchable::kind("MINUS")])
                    .slot("b", vec![Matchable::kind("NUMBER")])
                    .optional(vec![Matchable::rule(continuer)]),
            )
            .unwrap();
        registry
    }

    fn lex(source: &str) -> Vec<Token> {
        tokenize(&catalog(), source).unwrap()
    }

    #[test]
    fn test_simple_rule_match() {
        let registry = chain_grammar();
        let tree = parse(&registry, &lex("1 + 2"), "math").unwrap();
        assert_eq!(tree.node_type, "math");
        assert_eq!(tree.slot("a").unwrap().text(), Some("1"));
        assert_eq!(tree.slot("b").unwrap().node_type, "PLUS");
        assert_eq!(tree.slot("c").unwrap().text(), Some("2"));
        assert!(tree.optional.is_empty());
    }

    #[test]
    fn test_optional_accumulates_in_order() {
        let registry = chain_grammar();
        let tree = parse(&registry, &lex("1 + 2 - 3"), "math").unwrap();
        assert_eq!(tree.optional.len(), 1);
        let continuer = &tree.optional[0];
        assert_eq!(continuer.node_type, "continuer");
        assert_eq!(continuer.slot("a").unwrap().node_type, "MINUS");
        assert_eq!(continuer.slot("b").unwrap().text(), Some("3"));
    }

    #[test]
    fn test_nested_optional_chain() {
        let registry = chain_grammar();
        let tree = parse(&registry, &lex("1 + 2 - 3 + 4"), "math").unwrap();
        // The continuer's own optional picks up the rest, recursively.
        let first = &tree.optional[0];
        assert_eq!(first.optional.len(), 1);
        assert_eq!(first.optional[0].slot("b").unwrap().text(), Some("4"));
    }

    #[test]
    fn test_trailing_tokens_fail_strict_consumption() {
        let registry = chain_grammar();
        let err = parse(&registry, &lex("1 + 2 3"), "math").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::TrailingTokens);
        assert_eq!(err.position, 3);
    }

    #[test]
    fn test_rule_failure_reports_furthest_position() {
        let registry = chain_grammar();
        // Fails on slot "c": two tokens matched before the failure.
        let err = parse(&registry, &lex("1 + +"), "math").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::NoMatch { .. }));
        assert_eq!(err.position, 2);
    }

    #[test]
    fn test_unknown_start_rule() {
        let registry = chain_grammar();
        let err = parse(&registry, &lex("1 + 2"), "nope").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::UnknownRule { .. }));
    }

    #[test]
    fn test_ordered_choice_takes_first_alternative() {
        let mut registry = RuleRegistry::new();
        registry
            .set_definition(
                "either",
                RuleDefinition::new().slot(
                    "a",
                    vec![
                        Matchable::inline(
                            RuleDefinition::new().slot("x", vec![Matchable::kind("NUMBER")]),
                        ),
                        Matchable::kind("NUMBER"),
                    ],
                ),
            )
            .unwrap();
        let tree = parse(&registry, &lex("7"), "either").unwrap();
        // The inline alternative comes first and wins even though the plain
        // token alternative would match too.
        assert_eq!(tree.slot("a").unwrap().node_type, INLINE_RULE_TYPE);
    }

    #[test]
    fn test_failed_rule_leaves_no_partial_slots() {
        let mut registry = RuleRegistry::new();
        registry
            .set_definition(
                "pair",
                RuleDefinition::new()
                    .slot("a", vec![Matchable::kind("NUMBER")])
                    .slot("b", vec![Matchable::kind("NUMBER")]),
            )
            .unwrap();
        let pair = registry.id_of("pair").unwrap();
        registry
            .set_definition(
                "top",
                RuleDefinition::new().slot(
                    "a",
                    vec![Matchable::rule(pair), Matchable::kind("NUMBER")],
                ),
            )
            .unwrap();
        // "7 +" : pair matches NUMBER then fails on PLUS; backtracking must
        // retry the next alternative from the same entry position.
        let err = parse(&registry, &lex("7 +"), "top").unwrap_err();
        // The single NUMBER alternative succeeds, leaving "+" unconsumed.
        assert_eq!(err.kind, ParseErrorKind::TrailingTokens);
        assert_eq!(err.position, 1);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let registry = chain_grammar();
        let tokens = lex("1 + 2 - 3 + 4");
        let first = parse(&registry, &tokens, "math").unwrap();
        let second = parse(&registry, &tokens, "math").unwrap();
        assert_eq!(first, second);
    }
}
