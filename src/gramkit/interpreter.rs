//! Engine and reduction dispatch.
//!
//! The engine wires a token catalog, a rule registry and a table of
//! reduction functions behind the single `interpret` entry point. It owns
//! only the binding and dispatch protocol; reduction bodies are entirely
//! user-supplied closures registered per rule name, statically, ahead of
//! time.
//!
//! Each dispatch hands the reduction a [`ReductionScope`]: the conventional
//! `a`/`b`/`c`/`d` children, the optional-match list, push/pop access to the
//! shared evaluation stack, whitelist-checked access to the caller's
//! external state, and re-entry points (`eval`, `eval_source`) that thread
//! the same stack and externals through recursive interpretation.
//!
//! Evaluation state lives in a caller-owned [`Session`] scoped to one
//! top-level `interpret` call at a time; independent sessions never
//! interfere. Everything is single-threaded and call-stack-recursive.

use std::collections::HashMap;

use log::warn;

use super::error::{EngineError, GrammarDefinitionError, LexError};
use super::grammar::{RuleDefinition, RuleId, RuleRegistry};
use super::lexer;
use super::parser::{self, ParseNode};
use super::policy::{FirstTokenPolicy, StartPolicy};
use super::tokens::{Token, TokenCatalog};
use super::value::Value;

/// Ordered, shared stack of reduction results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationStack {
    values: Vec<Value>,
}

impl EvaluationStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    pub fn pop(&mut self) -> Result<Value, EngineError> {
        self.values.pop().ok_or(EngineError::StackUnderflow)
    }

    pub fn top(&self) -> Option<&Value> {
        self.values.last()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// Caller-owned key/value bindings visible to reductions that declare them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalState {
    entries: HashMap<String, Value>,
}

impl ExternalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.entries.insert(name.to_string(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Mutable evaluation state for one interpreter session: the evaluation
/// stack plus the external bindings. Never share one session across
/// concurrently running `interpret` calls; give each independent session its
/// own instance.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub stack: EvaluationStack,
    pub externals: ExternalState,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Which external bindings a reduction declared.
///
/// `Selected` is the common case. `All` exists for reductions that address
/// caller-chosen keys (variable assignment and lookup) which cannot be
/// enumerated when the reduction is registered.
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalAccess {
    None,
    Selected(Vec<String>),
    All,
}

impl ExternalAccess {
    pub fn selected<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ExternalAccess::Selected(names.into_iter().map(Into::into).collect())
    }

    fn allows(&self, name: &str) -> bool {
        match self {
            ExternalAccess::None => false,
            ExternalAccess::Selected(names) => names.iter().any(|n| n == name),
            ExternalAccess::All => true,
        }
    }
}

/// A user-supplied reduction body.
pub type ReductionFn = Box<dyn Fn(&mut ReductionScope<'_>) -> Result<Value, EngineError>>;

struct Reduction {
    access: ExternalAccess,
    func: ReductionFn,
}

/// Input accepted by [`Engine::interpret`]: raw text, one parse node, or a
/// non-empty node sequence (first element used).
#[derive(Debug, Clone, Copy)]
pub enum Input<'a> {
    Text(&'a str),
    Node(&'a ParseNode),
    Nodes(&'a [ParseNode]),
}

impl<'a> From<&'a str> for Input<'a> {
    fn from(text: &'a str) -> Self {
        Input::Text(text)
    }
}

impl<'a> From<&'a ParseNode> for Input<'a> {
    fn from(node: &'a ParseNode) -> Self {
        Input::Node(node)
    }
}

impl<'a> From<&'a [ParseNode]> for Input<'a> {
    fn from(nodes: &'a [ParseNode]) -> Self {
        Input::Nodes(nodes)
    }
}

impl<'a> From<&'a Vec<ParseNode>> for Input<'a> {
    fn from(nodes: &'a Vec<ParseNode>) -> Self {
        Input::Nodes(nodes)
    }
}

/// The grammar engine: token catalog, rule registry, reduction table and
/// start-rule policy behind one `interpret` entry point.
pub struct Engine {
    catalog: TokenCatalog,
    grammar: RuleRegistry,
    reductions: HashMap<String, Reduction>,
    policy: Box<dyn StartPolicy>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Engine {
            catalog: TokenCatalog::new(),
            grammar: RuleRegistry::new(),
            reductions: HashMap::new(),
            policy: Box::new(FirstTokenPolicy::default()),
        }
    }

    pub fn catalog(&self) -> &TokenCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut TokenCatalog {
        &mut self.catalog
    }

    pub fn grammar(&self) -> &RuleRegistry {
        &self.grammar
    }

    pub fn grammar_mut(&mut self) -> &mut RuleRegistry {
        &mut self.grammar
    }

    pub fn register_literal(&mut self, name: &str, value: &str) {
        self.catalog.register_literal(name, value);
    }

    pub fn register_pattern(&mut self, name: &str, pattern: &str) -> Result<(), GrammarDefinitionError> {
        self.catalog.register_pattern(name, pattern)
    }

    pub fn register_known(&mut self, name: &str) -> Result<(), GrammarDefinitionError> {
        self.catalog.register_known(name)
    }

    pub fn define_rule(&mut self, name: &str) -> RuleId {
        self.grammar.define_rule(name)
    }

    pub fn set_definition(
        &mut self,
        name: &str,
        definition: RuleDefinition,
    ) -> Result<(), GrammarDefinitionError> {
        self.grammar.set_definition(name, definition)
    }

    /// Bind a reduction to a rule name, replacing any earlier binding.
    pub fn register_reduction<F>(&mut self, rule: &str, access: ExternalAccess, func: F)
    where
        F: Fn(&mut ReductionScope<'_>) -> Result<Value, EngineError> + 'static,
    {
        self.reductions.insert(
            rule.to_string(),
            Reduction {
                access,
                func: Box::new(func),
            },
        );
    }

    /// Replace the start-rule selection policy.
    pub fn set_start_policy<P: StartPolicy + 'static>(&mut self, policy: P) {
        self.policy = Box::new(policy);
    }

    pub fn tokenize(&self, text: &str) -> Result<Vec<Token>, LexError> {
        lexer::tokenize(&self.catalog, text)
    }

    /// Ask the installed policy which rule the stream should start at.
    pub fn select_start(&self, tokens: &[Token]) -> Option<String> {
        self.policy.select(tokens, &self.grammar)
    }

    /// Validate the grammar and parse against an explicit start rule.
    pub fn parse(&self, tokens: &[Token], start: &str) -> Result<ParseNode, EngineError> {
        self.grammar.validate()?;
        Ok(parser::parse(&self.grammar, tokens, start)?)
    }

    /// The end-to-end entry point: tokenize, parse and reduce text input, or
    /// dispatch already-parsed nodes directly.
    pub fn interpret(&self, input: Input<'_>, session: &mut Session) -> Result<Value, EngineError> {
        match input {
            Input::Text(text) => {
                self.run_text(text, &mut session.stack, &mut session.externals)
            }
            Input::Node(node) => {
                self.eval_node(node, &mut session.stack, &mut session.externals)
            }
            Input::Nodes(nodes) => match nodes.first() {
                Some(node) => {
                    self.eval_node(node, &mut session.stack, &mut session.externals)
                }
                None => Err(EngineError::EmptyInput),
            },
        }
    }

    fn run_text(
        &self,
        text: &str,
        stack: &mut EvaluationStack,
        externals: &mut ExternalState,
    ) -> Result<Value, EngineError> {
        let tokens = self.tokenize(text)?;
        let start = self
            .policy
            .select(&tokens, &self.grammar)
            .ok_or(EngineError::NoStartRule)?;
        let tree = self.parse(&tokens, &start)?;
        self.eval_node(&tree, stack, externals)
    }

    fn eval_node(
        &self,
        node: &ParseNode,
        stack: &mut EvaluationStack,
        externals: &mut ExternalState,
    ) -> Result<Value, EngineError> {
        let reduction = match self.reductions.get(&node.node_type) {
            Some(reduction) => reduction,
            None => {
                // Non-fatal: the subtree contributes nothing.
                warn!(
                    "{}",
                    EngineError::UndefinedReduction {
                        rule: node.node_type.clone(),
                    }
                );
                return Ok(Value::Unit);
            }
        };
        let mut scope = ReductionScope {
            a: node.slot("a"),
            b: node.slot("b"),
            c: node.slot("c"),
            d: node.slot("d"),
            node,
            optional: &node.optional,
            stack,
            externals,
            engine: self,
            access: &reduction.access,
        };
        (reduction.func)(&mut scope)
    }
}

/// Everything a reduction may touch, bound per dispatch.
pub struct ReductionScope<'a> {
    /// Conventional children; `None` when the slot is absent.
    pub a: Option<&'a ParseNode>,
    pub b: Option<&'a ParseNode>,
    pub c: Option<&'a ParseNode>,
    pub d: Option<&'a ParseNode>,
    /// The node being reduced.
    pub node: &'a ParseNode,
    /// Accumulated optional matches; empty when none matched.
    pub optional: &'a [ParseNode],
    stack: &'a mut EvaluationStack,
    externals: &'a mut ExternalState,
    engine: &'a Engine,
    access: &'a ExternalAccess,
}

impl<'a> ReductionScope<'a> {
    /// Recursively interpret a child node with the same stack and externals.
    pub fn eval(&mut self, node: &ParseNode) -> Result<Value, EngineError> {
        self.engine.eval_node(node, self.stack, self.externals)
    }

    /// Re-enter the full pipeline on raw text, sharing this dispatch's stack
    /// and externals (file inclusion relies on this).
    pub fn eval_source(&mut self, text: &str) -> Result<Value, EngineError> {
        self.engine.run_text(text, self.stack, self.externals)
    }

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Result<Value, EngineError> {
        self.stack.pop()
    }

    /// Read a declared external binding. A declared but missing name reads
    /// as `None`; an undeclared name is an error.
    pub fn external(&self, name: &str) -> Result<Option<&Value>, EngineError> {
        if !self.access.allows(name) {
            return Err(EngineError::UndeclaredExternal {
                name: name.to_string(),
            });
        }
        Ok(self.externals.get(name))
    }

    /// Write a declared external binding.
    pub fn set_external(&mut self, name: &str, value: Value) -> Result<(), EngineError> {
        if !self.access.allows(name) {
            return Err(EngineError::UndeclaredExternal {
                name: name.to_string(),
            });
        }
        self.externals.set(name, value);
        Ok(())
    }

    /// A reduction-runtime error tagged with the rule being reduced.
    pub fn fail(&self, message: impl Into<String>) -> EngineError {
        EngineError::Reduction {
            rule: self.node.node_type.clone(),
            message: message.into(),
        }
    }
}
