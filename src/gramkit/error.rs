//! Error taxonomy for the grammar engine.
//!
//! Lex and parse failures abort the current interpretation and surface to the
//! caller. Grammar definition problems are caught when definitions are
//! installed, or by whole-grammar validation before parsing, never in the
//! middle of a parse. Reduction-level failures are caught at the dispatch
//! boundary and terminate the top-level `interpret` call; they leave values
//! already pushed on the evaluation stack untouched.

use std::fmt;

/// No token kind matched at a non-whitespace position.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    /// Byte offset into the trimmed input where scanning stopped.
    pub offset: usize,
    /// The unconsumed remainder of the input.
    pub remainder: String,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no token kind matches at offset {}: {:?}",
            self.offset, self.remainder
        )
    }
}

impl std::error::Error for LexError {}

/// What kind of parse failure occurred.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    /// The start rule could not match from the entry position.
    NoMatch { rule: String },
    /// The start rule matched but tokens remained unconsumed.
    TrailingTokens,
    /// The requested start rule is not registered.
    UnknownRule { name: String },
}

/// A failed parse, carrying the furthest token position reached.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub position: usize,
    pub kind: ParseErrorKind,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ParseErrorKind::NoMatch { rule } => write!(
                f,
                "rule {:?} failed to match (furthest token position {})",
                rule, self.position
            ),
            ParseErrorKind::TrailingTokens => write!(
                f,
                "unconsumed tokens remain after token position {}",
                self.position
            ),
            ParseErrorKind::UnknownRule { name } => {
                write!(f, "unknown start rule {:?}", name)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// A problem with the grammar itself, detected at definition or validation
/// time rather than during parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum GrammarDefinitionError {
    /// A slot was declared with no alternatives at all.
    EmptyAlternatives { rule: String, slot: String },
    /// The same slot name appears twice in one definition.
    DuplicateSlot { rule: String, slot: String },
    /// An optional alternative can match zero tokens, which would loop
    /// forever during the greedy repeat.
    NullableOptional { rule: String },
    /// A rule can reach itself at its own entry position without consuming
    /// input.
    LeftRecursion { rule: String },
    /// A referenced rule never had a definition installed.
    UndefinedRule { name: String },
    /// A pattern token kind was registered with an invalid regex.
    InvalidPattern { name: String, message: String },
}

impl fmt::Display for GrammarDefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarDefinitionError::EmptyAlternatives { rule, slot } => {
                write!(f, "rule {:?}: slot {:?} has no alternatives", rule, slot)
            }
            GrammarDefinitionError::DuplicateSlot { rule, slot } => {
                write!(f, "rule {:?}: duplicate slot {:?}", rule, slot)
            }
            GrammarDefinitionError::NullableOptional { rule } => write!(
                f,
                "rule {:?}: an optional alternative can match empty input",
                rule
            ),
            GrammarDefinitionError::LeftRecursion { rule } => write!(
                f,
                "rule {:?} is left-recursive: it can reach itself without consuming input",
                rule
            ),
            GrammarDefinitionError::UndefinedRule { name } => {
                write!(f, "rule {:?} is referenced but never defined", name)
            }
            GrammarDefinitionError::InvalidPattern { name, message } => {
                write!(f, "token kind {:?}: invalid pattern: {}", name, message)
            }
        }
    }
}

impl std::error::Error for GrammarDefinitionError {}

/// Umbrella error for the end-to-end `interpret` entry point.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    Lex(LexError),
    Parse(ParseError),
    Grammar(GrammarDefinitionError),
    /// `interpret` was handed an empty node sequence.
    EmptyInput,
    /// No start rule could be selected for the token stream.
    NoStartRule,
    /// No reduction is registered for a node's type.
    UndefinedReduction { rule: String },
    /// A reduction function itself failed.
    Reduction { rule: String, message: String },
    /// A reduction touched an external binding it never declared.
    UndeclaredExternal { name: String },
    /// A reduction popped from an empty evaluation stack.
    StackUnderflow,
    /// A value could not be coerced to a number.
    NotANumber { value: String },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Lex(e) => write!(f, "lex error: {}", e),
            EngineError::Parse(e) => write!(f, "parse error: {}", e),
            EngineError::Grammar(e) => write!(f, "grammar error: {}", e),
            EngineError::EmptyInput => write!(f, "empty input passed for interpretation"),
            EngineError::NoStartRule => write!(f, "no start rule could be selected"),
            EngineError::UndefinedReduction { rule } => {
                write!(f, "no reduction registered for rule {:?}", rule)
            }
            EngineError::Reduction { rule, message } => {
                write!(f, "reduction for rule {:?} failed: {}", rule, message)
            }
            EngineError::UndeclaredExternal { name } => {
                write!(f, "external binding {:?} was not declared by this rule", name)
            }
            EngineError::StackUnderflow => write!(f, "evaluation stack is empty"),
            EngineError::NotANumber { value } => {
                write!(f, "value {:?} is not a number", value)
            }
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Lex(e) => Some(e),
            EngineError::Parse(e) => Some(e),
            EngineError::Grammar(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LexError> for EngineError {
    fn from(e: LexError) -> Self {
        EngineError::Lex(e)
    }
}

impl From<ParseError> for EngineError {
    fn from(e: ParseError) -> Self {
        EngineError::Parse(e)
    }
}

impl From<GrammarDefinitionError> for EngineError {
    fn from(e: GrammarDefinitionError) -> Self {
        EngineError::Grammar(e)
    }
}
