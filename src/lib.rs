//! # gramkit
//!
//! A data-driven grammar engine: token catalogs, recursive-descent parsing
//! over declarative rule definitions, and an interpreter that dispatches
//! per-rule reduction functions over the resulting parse trees.
//!
//! Grammars are registered at runtime through the [`gramkit::Engine`] API
//! rather than compiled in; see [`gramkit::demos`] for two complete client
//! configurations.

pub mod gramkit;

pub use gramkit::{
    Engine, EngineError, EvaluationStack, ExternalAccess, ExternalState, FirstTokenPolicy,
    FixedStart, GrammarDefinitionError, Input, LexError, Matchable, ParseError, ParseErrorKind,
    ParseNode, ReductionScope, RuleDefinition, RuleId, RuleRegistry, Session, StartPolicy, Token,
    TokenCatalog, Value,
};
