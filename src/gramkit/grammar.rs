//! Grammar rule registry: named rules over ordered slots of ordered
//! alternatives.
//!
//! The rule graph is cyclic (mutual recursion, including self-reference), so
//! rules are owned centrally and every cross-reference is a non-owning
//! [`RuleId`] handle. A handle can exist before its definition is installed,
//! which is what makes forward references in mutually recursive grammars
//! work: `define_rule` is idempotent and hands back the same id every time,
//! and `set_definition` later installs or replaces the slots behind it.
//!
//! Validation happens at two points. `set_definition` checks the shape of
//! the incoming definition (no empty alternative lists, no duplicate slots)
//! and rejects optional alternatives that could match empty input given the
//! definitions installed so far; rules whose definition is still pending are
//! assumed to consume input so that forward references can be built
//! incrementally. [`RuleRegistry::validate`] then re-checks the whole
//! grammar once all definitions are in: undefined references, full-fixpoint
//! nullability of optional alternatives, and entry-position left recursion.

use std::collections::{HashMap, HashSet};

use super::error::GrammarDefinitionError;

/// Stable, copyable handle to a rule in a [`RuleRegistry`].
pub type RuleId = usize;

/// Reserved slot name routing to the optional repeat list.
pub const OPTIONAL_SLOT: &str = "optional";

/// Node type assigned to inline (anonymous) rule matches.
pub const INLINE_RULE_TYPE: &str = "inline";

/// One alternative inside a slot.
#[derive(Debug, Clone)]
pub enum Matchable {
    /// Match a single token of this kind name.
    Kind(String),
    /// Recursively match a registered rule.
    Rule(RuleId),
    /// Match an anonymous inline rule.
    Inline(RuleDefinition),
}

impl Matchable {
    pub fn kind(name: &str) -> Self {
        Matchable::Kind(name.to_string())
    }

    pub fn rule(id: RuleId) -> Self {
        Matchable::Rule(id)
    }

    pub fn inline(definition: RuleDefinition) -> Self {
        Matchable::Inline(definition)
    }
}

/// Ordered slot map of a rule: mandatory slots in declaration order, plus an
/// optional trailing repeat list.
#[derive(Debug, Clone, Default)]
pub struct RuleDefinition {
    slots: Vec<(String, Vec<Matchable>)>,
    optional: Vec<Matchable>,
}

impl RuleDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mandatory slot. The reserved name `"optional"` routes to the
    /// optional repeat list instead.
    pub fn slot(mut self, name: &str, alternatives: Vec<Matchable>) -> Self {
        if name == OPTIONAL_SLOT {
            self.optional = alternatives;
        } else {
            self.slots.push((name.to_string(), alternatives));
        }
        self
    }

    /// Set the optional repeat list: alternatives matched greedily, zero or
    /// more times, after all mandatory slots.
    pub fn optional(mut self, alternatives: Vec<Matchable>) -> Self {
        self.optional = alternatives;
        self
    }

    pub fn slots(&self) -> &[(String, Vec<Matchable>)] {
        &self.slots
    }

    pub fn optional_alternatives(&self) -> &[Matchable] {
        &self.optional
    }
}

#[derive(Debug, Clone)]
pub struct GrammarRule {
    name: String,
    definition: Option<RuleDefinition>,
}

impl GrammarRule {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> Option<&RuleDefinition> {
        self.definition.as_ref()
    }
}

/// Central owner of all rules, addressed by name or by [`RuleId`].
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: Vec<GrammarRule>,
    index: HashMap<String, RuleId>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a named rule with no definition yet, or return the existing
    /// handle. Idempotent, so references taken early stay valid after the
    /// definition is installed later.
    pub fn define_rule(&mut self, name: &str) -> RuleId {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = self.rules.len();
        self.rules.push(GrammarRule {
            name: name.to_string(),
            definition: None,
        });
        self.index.insert(name.to_string(), id);
        id
    }

    /// Install or replace the definition behind `name`, creating the rule if
    /// needed. Rejects malformed definitions, see the module docs.
    pub fn set_definition(
        &mut self,
        name: &str,
        definition: RuleDefinition,
    ) -> Result<(), GrammarDefinitionError> {
        let id = self.define_rule(name);
        check_shape(name, &definition)?;
        self.check_optionals(name, Some((id, &definition)), &definition)?;
        self.rules[id].definition = Some(definition);
        Ok(())
    }

    pub fn id_of(&self, name: &str) -> Option<RuleId> {
        self.index.get(name).copied()
    }

    pub fn name_of(&self, id: RuleId) -> &str {
        &self.rules[id].name
    }

    pub fn rule(&self, id: RuleId) -> &GrammarRule {
        &self.rules[id]
    }

    pub fn definition(&self, id: RuleId) -> Option<&RuleDefinition> {
        self.rules[id].definition.as_ref()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whole-grammar static validation, run before every parse: every
    /// referenced rule must have a definition, no optional alternative may be
    /// nullable, and no rule may reach itself at its entry position without
    /// consuming input.
    pub fn validate(&self) -> Result<(), GrammarDefinitionError> {
        for rule in &self.rules {
            if let Some(def) = rule.definition() {
                self.check_defined(def)?;
            }
        }
        for rule in &self.rules {
            if let Some(def) = rule.definition() {
                self.check_optionals(&rule.name, None, def)?;
            }
        }
        let mut state = vec![VisitState::Unvisited; self.rules.len()];
        for id in 0..self.rules.len() {
            if let Some(cycle) = self.left_recursion_dfs(id, &mut state) {
                return Err(GrammarDefinitionError::LeftRecursion {
                    rule: self.rules[cycle].name.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_defined(&self, def: &RuleDefinition) -> Result<(), GrammarDefinitionError> {
        let all = def
            .slots()
            .iter()
            .flat_map(|(_, alts)| alts.iter())
            .chain(def.optional_alternatives().iter());
        for alt in all {
            match alt {
                Matchable::Kind(_) => {}
                Matchable::Rule(id) => {
                    if self.rules[*id].definition.is_none() {
                        return Err(GrammarDefinitionError::UndefinedRule {
                            name: self.rules[*id].name.clone(),
                        });
                    }
                }
                Matchable::Inline(inner) => self.check_defined(inner)?,
            }
        }
        Ok(())
    }

    /// Reject optional alternatives that can match empty input, in `def` and
    /// in any inline definition nested inside it. `candidate` substitutes a
    /// not-yet-installed definition for its own rule id.
    fn check_optionals(
        &self,
        rule: &str,
        candidate: Option<(RuleId, &RuleDefinition)>,
        def: &RuleDefinition,
    ) -> Result<(), GrammarDefinitionError> {
        for alt in def.optional_alternatives() {
            let mut visiting = Vec::new();
            if self.alt_nullable(alt, candidate, &mut visiting) {
                return Err(GrammarDefinitionError::NullableOptional {
                    rule: rule.to_string(),
                });
            }
            if let Matchable::Inline(inner) = alt {
                self.check_optionals(rule, candidate, inner)?;
            }
        }
        for (_, alts) in def.slots() {
            for alt in alts {
                if let Matchable::Inline(inner) = alt {
                    self.check_optionals(rule, candidate, inner)?;
                }
            }
        }
        Ok(())
    }

    /// Can this alternative succeed while consuming zero tokens?
    ///
    /// Rules without an installed definition are treated as consuming
    /// (forward-reference optimism); `validate` separately rejects grammars
    /// that still reference undefined rules.
    fn alt_nullable(
        &self,
        alt: &Matchable,
        candidate: Option<(RuleId, &RuleDefinition)>,
        visiting: &mut Vec<RuleId>,
    ) -> bool {
        match alt {
            Matchable::Kind(_) => false,
            Matchable::Inline(def) => self.def_nullable(def, candidate, visiting),
            Matchable::Rule(id) => {
                if visiting.contains(id) {
                    return false;
                }
                visiting.push(*id);
                let nullable = match candidate {
                    Some((cid, cdef)) if cid == *id => self.def_nullable(cdef, candidate, visiting),
                    _ => match self.rules[*id].definition() {
                        Some(def) => self.def_nullable(def, candidate, visiting),
                        None => false,
                    },
                };
                visiting.pop();
                nullable
            }
        }
    }

    fn def_nullable(
        &self,
        def: &RuleDefinition,
        candidate: Option<(RuleId, &RuleDefinition)>,
        visiting: &mut Vec<RuleId>,
    ) -> bool {
        // A definition with no mandatory slots matches empty input; the
        // optional list never has to contribute.
        def.slots()
            .iter()
            .all(|(_, alts)| alts.iter().any(|a| self.alt_nullable(a, candidate, visiting)))
    }

    /// Rule ids reachable from a definition's entry position without any
    /// token being consumed first.
    fn entry_rule_ids(&self, def: &RuleDefinition, out: &mut Vec<RuleId>) {
        for (_, alts) in def.slots() {
            for alt in alts {
                match alt {
                    Matchable::Kind(_) => {}
                    Matchable::Rule(id) => out.push(*id),
                    Matchable::Inline(inner) => self.entry_rule_ids(inner, out),
                }
            }
            let slot_nullable = alts
                .iter()
                .any(|a| self.alt_nullable(a, None, &mut Vec::new()));
            if !slot_nullable {
                return;
            }
        }
        // All mandatory slots nullable (or none): the optional list is also
        // tried at the entry position.
        for alt in def.optional_alternatives() {
            match alt {
                Matchable::Kind(_) => {}
                Matchable::Rule(id) => out.push(*id),
                Matchable::Inline(inner) => self.entry_rule_ids(inner, out),
            }
        }
    }

    fn left_recursion_dfs(&self, id: RuleId, state: &mut [VisitState]) -> Option<RuleId> {
        match state[id] {
            VisitState::Visiting => return Some(id),
            VisitState::Done => return None,
            VisitState::Unvisited => {}
        }
        state[id] = VisitState::Visiting;
        if let Some(def) = self.rules[id].definition() {
            let mut targets = Vec::new();
            self.entry_rule_ids(def, &mut targets);
            for target in targets {
                if let Some(cycle) = self.left_recursion_dfs(target, state) {
                    return Some(cycle);
                }
            }
        }
        state[id] = VisitState::Done;
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum VisitState {
    Unvisited,
    Visiting,
    Done,
}

fn check_shape(rule: &str, def: &RuleDefinition) -> Result<(), GrammarDefinitionError> {
    let mut seen: HashSet<&str> = HashSet::new();
    for (slot, alts) in def.slots() {
        if !seen.insert(slot.as_str()) {
            return Err(GrammarDefinitionError::DuplicateSlot {
                rule: rule.to_string(),
                slot: slot.clone(),
            });
        }
        if alts.is_empty() {
            return Err(GrammarDefinitionError::EmptyAlternatives {
                rule: rule.to_string(),
                slot: slot.clone(),
            });
        }
        for alt in alts {
            if let Matchable::Inline(inner) = alt {
                check_shape(rule, inner)?;
            }
        }
    }
    for alt in def.optional_alternatives() {
        if let Matchable::Inline(inner) = alt {
            check_shape(rule, inner)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_rule_is_idempotent() {
        let mut registry = RuleRegistry::new();
        let a = registry.define_rule("math");
        let b = registry.define_rule("math");
        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_forward_reference_survives_later_definition() {
        let mut registry = RuleRegistry::new();
        let continuer = registry.define_rule("continuer");
        registry
            .set_definition(
                "math",
                RuleDefinition::new()
                    .slot("a", vec![Matchable::kind("NUMBER")])
                    .optional(vec![Matchable::rule(continuer)]),
            )
            .unwrap();
        registry
            .set_definition(
                "continuer",
                RuleDefinition::new()
                    .slot("a", vec![Matchable::kind("PLUS")])
                    .slot("b", vec![Matchable::kind("NUMBER")])
                    .optional(vec![Matchable::rule(continuer)]),
            )
            .unwrap();
        assert!(registry.validate().is_ok());
    }

    #[test]
    fn test_empty_alternative_list_rejected() {
        let mut registry = RuleRegistry::new();
        let err = registry
            .set_definition("broken", RuleDefinition::new().slot("a", vec![]))
            .unwrap_err();
        assert!(matches!(
            err,
            GrammarDefinitionError::EmptyAlternatives { .. }
        ));
    }

    #[test]
    fn test_duplicate_slot_rejected() {
        let mut registry = RuleRegistry::new();
        let err = registry
            .set_definition(
                "broken",
                RuleDefinition::new()
                    .slot("a", vec![Matchable::kind("X")])
                    .slot("a", vec![Matchable::kind("Y")]),
            )
            .unwrap_err();
        assert!(matches!(err, GrammarDefinitionError::DuplicateSlot { .. }));
    }

    #[test]
    fn test_nullable_optional_rejected_at_definition_time() {
        let mut registry = RuleRegistry::new();
        // A rule with no mandatory slots matches empty input.
        registry
            .set_definition("unit", RuleDefinition::new())
            .unwrap();
        let unit = registry.id_of("unit").unwrap();
        let err = registry
            .set_definition(
                "looper",
                RuleDefinition::new()
                    .slot("a", vec![Matchable::kind("X")])
                    .optional(vec![Matchable::rule(unit)]),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            GrammarDefinitionError::NullableOptional { .. }
        ));
    }

    #[test]
    fn test_self_optional_on_empty_rule_rejected() {
        let mut registry = RuleRegistry::new();
        let me = registry.define_rule("me");
        let err = registry
            .set_definition("me", RuleDefinition::new().optional(vec![Matchable::rule(me)]))
            .unwrap_err();
        assert!(matches!(
            err,
            GrammarDefinitionError::NullableOptional { .. }
        ));
    }

    #[test]
    fn test_undefined_reference_caught_by_validate() {
        let mut registry = RuleRegistry::new();
        let ghost = registry.define_rule("ghost");
        registry
            .set_definition(
                "top",
                RuleDefinition::new().slot("a", vec![Matchable::rule(ghost)]),
            )
            .unwrap();
        let err = registry.validate().unwrap_err();
        assert!(matches!(err, GrammarDefinitionError::UndefinedRule { .. }));
    }

    #[test]
    fn test_direct_left_recursion_caught_by_validate() {
        let mut registry = RuleRegistry::new();
        let expr = registry.define_rule("expr");
        registry
            .set_definition(
                "expr",
                RuleDefinition::new().slot(
                    "a",
                    vec![Matchable::rule(expr), Matchable::kind("NUMBER")],
                ),
            )
            .unwrap();
        let err = registry.validate().unwrap_err();
        assert!(matches!(err, GrammarDefinitionError::LeftRecursion { .. }));
    }

    #[test]
    fn test_mutual_left_recursion_caught_by_validate() {
        let mut registry = RuleRegistry::new();
        let a = registry.define_rule("a");
        let b = registry.define_rule("b");
        registry
            .set_definition("a", RuleDefinition::new().slot("x", vec![Matchable::rule(b)]))
            .unwrap();
        registry
            .set_definition("b", RuleDefinition::new().slot("x", vec![Matchable::rule(a)]))
            .unwrap();
        let err = registry.validate().unwrap_err();
        assert!(matches!(err, GrammarDefinitionError::LeftRecursion { .. }));
    }

    #[test]
    fn test_right_recursion_through_optional_is_fine() {
        let mut registry = RuleRegistry::new();
        let statements = registry.define_rule("statements");
        registry
            .set_definition(
                "statement",
                RuleDefinition::new().slot("a", vec![Matchable::kind("WORD")]),
            )
            .unwrap();
        let statement = registry.id_of("statement").unwrap();
        registry
            .set_definition(
                "statements",
                RuleDefinition::new()
                    .slot("a", vec![Matchable::rule(statement)])
                    .optional(vec![Matchable::rule(statements)]),
            )
            .unwrap();
        assert!(registry.validate().is_ok());
    }

    #[test]
    fn test_optional_slot_name_routes_to_optional_list() {
        let def = RuleDefinition::new()
            .slot("a", vec![Matchable::kind("X")])
            .slot(OPTIONAL_SLOT, vec![Matchable::kind("Y")]);
        assert_eq!(def.slots().len(), 1);
        assert_eq!(def.optional_alternatives().len(), 1);
    }
}
