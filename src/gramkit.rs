//! Main module for the gramkit grammar engine

pub mod demos;
pub mod error;
pub mod grammar;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod policy;
pub mod tokens;
pub mod value;

pub use error::{EngineError, GrammarDefinitionError, LexError, ParseError, ParseErrorKind};
pub use grammar::{Matchable, RuleDefinition, RuleId, RuleRegistry};
pub use interpreter::{
    Engine, EvaluationStack, ExternalAccess, ExternalState, Input, ReductionScope, Session,
};
pub use parser::ParseNode;
pub use policy::{FirstTokenPolicy, FixedStart, StartPolicy};
pub use tokens::{Token, TokenCatalog};
pub use value::Value;
