//! Runtime values flowing through reductions and the evaluation stack.

use std::fmt;

use serde::Serialize;

use super::error::EngineError;

/// A reduction result: nothing, a number, or a string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    Unit,
    Number(f64),
    Str(String),
}

impl Value {
    /// Coerce to a number. Numeric strings parse; everything else fails.
    pub fn as_number(&self) -> Result<f64, EngineError> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Str(s) => s.trim().parse().map_err(|_| EngineError::NotANumber {
                value: s.clone(),
            }),
            Value::Unit => Err(EngineError::NotANumber {
                value: "()".to_string(),
            }),
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Value::Unit)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => Ok(()),
            // Float Display renders integral values without a ".0".
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}
