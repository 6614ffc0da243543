//! Ready-made engine configurations: a chained-arithmetic calculator and a
//! small statement language with variables and file inclusion.
//!
//! Both are ordinary clients of the engine, built entirely through the
//! public registration API. They double as executable documentation for how
//! a grammar, its reductions and the start policy fit together; the binary
//! exposes them as REPLs.
//!
//! Printed lines go to an [`Output`] sink shared between the constructor's
//! caller and the reduction closures, so embedding code can collect them
//! instead of writing to stdout.

use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use super::error::{EngineError, GrammarDefinitionError};
use super::grammar::{Matchable, RuleDefinition};
use super::interpreter::{Engine, ExternalAccess, ReductionScope};
use super::parser::ParseNode;
use super::policy::FirstTokenPolicy;
use super::value::Value;

/// Line sink shared between reductions and the embedding caller.
#[derive(Debug, Clone, Default)]
pub struct Output {
    lines: Rc<RefCell<Vec<String>>>,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, line: &str) {
        self.lines.borrow_mut().push(line.to_string());
    }

    /// Snapshot of everything emitted so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    /// Take and clear the emitted lines.
    pub fn drain(&self) -> Vec<String> {
        self.lines.borrow_mut().drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.borrow().is_empty()
    }
}

fn strip_quotes(text: &str) -> &str {
    text.trim_start_matches('"').trim_end_matches('"')
}

/// Arithmetic chain calculator.
///
/// Expressions evaluate strictly left to right without precedence, so
/// `3 + 4 * 2` is 14; parentheses group. `print("...")` and `print(expr)`
/// emit to the returned [`Output`].
pub fn math_engine() -> Result<(Engine, Output), GrammarDefinitionError> {
    let mut engine = Engine::new();
    let output = Output::new();

    engine.register_literal("PLUS", "+");
    engine.register_literal("MINUS", "-");
    engine.register_literal("STAR", "*");
    engine.register_literal("SLASH", "/");
    engine.register_literal("LPAREN", "(");
    engine.register_literal("RPAREN", ")");
    engine.register_literal("PRINT", "print");
    engine.register_known("NUMBER")?;
    engine.register_known("STRING")?;

    let math = engine.define_rule("math");
    let continuer = engine.define_rule("math_continuer");
    let paren = engine.define_rule("paren_math");

    let operand = || vec![Matchable::kind("NUMBER"), Matchable::rule(paren)];
    let operator = || {
        vec![
            Matchable::kind("PLUS"),
            Matchable::kind("MINUS"),
            Matchable::kind("STAR"),
            Matchable::kind("SLASH"),
        ]
    };

    engine.set_definition(
        "math",
        RuleDefinition::new()
            .slot("a", operand())
            .slot("b", operator())
            .slot("c", operand())
            .optional(vec![Matchable::rule(continuer)]),
    )?;
    engine.set_definition(
        "math_continuer",
        RuleDefinition::new()
            .slot("a", operator())
            .slot("b", operand())
            .optional(vec![Matchable::rule(continuer)]),
    )?;
    engine.set_definition(
        "paren_math",
        RuleDefinition::new()
            .slot("a", vec![Matchable::kind("LPAREN")])
            .slot(
                "b",
                vec![
                    Matchable::rule(math),
                    Matchable::rule(paren),
                    Matchable::rule(continuer),
                ],
            )
            .slot("c", vec![Matchable::kind("RPAREN")])
            .optional(vec![Matchable::rule(continuer)]),
    )?;
    engine.set_definition(
        "print",
        RuleDefinition::new()
            .slot("a", vec![Matchable::kind("PRINT")])
            .slot("b", vec![Matchable::kind("LPAREN")])
            .slot(
                "c",
                vec![
                    Matchable::kind("STRING"),
                    Matchable::rule(math),
                    Matchable::rule(paren),
                    Matchable::rule(continuer),
                ],
            )
            .slot("d", vec![Matchable::kind("RPAREN")]),
    )?;

    engine.set_start_policy(FirstTokenPolicy::with_fallback("math"));

    engine.register_reduction("math", ExternalAccess::None, |scope| {
        let a = scope.a.ok_or_else(|| scope.fail("missing left operand"))?;
        let b = scope.b.ok_or_else(|| scope.fail("missing operator"))?;
        let c = scope.c.ok_or_else(|| scope.fail("missing right operand"))?;
        let left = operand_value(scope, a)?;
        let right = operand_value(scope, c)?;
        let folded = apply_operator(scope, &b.node_type, left, right)?;
        let result = fold_continuers(scope, folded)?;
        scope.push(Value::Number(result));
        Ok(Value::Number(result))
    });

    engine.register_reduction("math_continuer", ExternalAccess::None, |scope| {
        let a = scope.a.ok_or_else(|| scope.fail("missing operator"))?;
        let b = scope.b.ok_or_else(|| scope.fail("missing operand"))?;
        let left = scope.pop()?.as_number()?;
        let right = operand_value(scope, b)?;
        let result = apply_operator(scope, &a.node_type, left, right)?;
        scope.push(Value::Number(result));
        let rest = scope.optional;
        for node in rest {
            scope.eval(node)?;
        }
        Ok(Value::Unit)
    });

    engine.register_reduction("paren_math", ExternalAccess::None, |scope| {
        let b = scope.b.ok_or_else(|| scope.fail("missing inner expression"))?;
        let value = scope.eval(b)?;
        // A bare continuer works through the stack and returns no value.
        let inner = if value.is_unit() {
            scope.pop()?.as_number()?
        } else {
            value.as_number()?
        };
        let result = fold_continuers(scope, inner)?;
        Ok(Value::Number(result))
    });

    let out = output.clone();
    engine.register_reduction("print", ExternalAccess::None, move |scope| {
        let c = scope.c.ok_or_else(|| scope.fail("missing argument"))?;
        if c.is_type("STRING") {
            out.emit(strip_quotes(c.text().unwrap_or_default()));
        } else {
            let value = scope.eval(c)?;
            let shown = if value.is_unit() { scope.pop()? } else { value };
            out.emit(&shown.to_string());
        }
        Ok(Value::Unit)
    });

    Ok((engine, output))
}

fn operand_value(scope: &mut ReductionScope<'_>, node: &ParseNode) -> Result<f64, EngineError> {
    if node.is_type("NUMBER") {
        let text = node.text().unwrap_or_default();
        text.parse().map_err(|_| EngineError::NotANumber {
            value: text.to_string(),
        })
    } else {
        scope.eval(node)?.as_number()
    }
}

fn apply_operator(
    scope: &ReductionScope<'_>,
    operator: &str,
    left: f64,
    right: f64,
) -> Result<f64, EngineError> {
    match operator {
        "PLUS" => Ok(left + right),
        "MINUS" => Ok(left - right),
        "STAR" => Ok(left * right),
        "SLASH" => Ok(left / right),
        other => Err(scope.fail(format!("unknown operator kind {:?}", other))),
    }
}

/// Feed the accumulated value through this node's continuer chain via the
/// shared stack.
fn fold_continuers(scope: &mut ReductionScope<'_>, start: f64) -> Result<f64, EngineError> {
    let continuers = scope.optional;
    if continuers.is_empty() {
        return Ok(start);
    }
    scope.push(Value::Number(start));
    for node in continuers {
        scope.eval(node)?;
    }
    scope.pop()?.as_number()
}

/// Statement language: `let` bindings, `printn`, and `execute_file`.
///
/// Variables live in the session's external state, so they persist across
/// `interpret` calls on the same session and are inspectable by the caller.
/// `execute_file("path")` re-enters the interpreter on the file's contents
/// with the same session, so included files see and extend the caller's
/// variables.
pub fn simplelang_engine() -> Result<(Engine, Output), GrammarDefinitionError> {
    let mut engine = Engine::new();
    let output = Output::new();

    engine.register_literal("LET", "let");
    engine.register_literal("PRINT", "printn");
    engine.register_literal("EXECUTE", "execute_file");
    engine.register_literal("ASSIGN", "=");
    engine.register_literal("SEMICOLON", ";");
    engine.register_literal("LPAREN", "(");
    engine.register_literal("RPAREN", ")");
    engine.register_known("NUMBER")?;
    engine.register_known("STRING")?;
    engine.register_known("IDENTIFIER")?;

    let statements = engine.define_rule("statements");
    let statement = engine.define_rule("statement");
    let print_statement = engine.define_rule("print_statement");
    let execute_file = engine.define_rule("execute_file");
    let assignment = engine.define_rule("assignment");
    let expression = engine.define_rule("expression");

    engine.set_definition(
        "program",
        RuleDefinition::new().slot("a", vec![Matchable::rule(statements)]),
    )?;
    engine.set_definition(
        "statements",
        RuleDefinition::new()
            .slot("a", vec![Matchable::rule(statement)])
            .optional(vec![Matchable::rule(statements)]),
    )?;
    engine.set_definition(
        "statement",
        RuleDefinition::new()
            .slot(
                "a",
                vec![
                    Matchable::rule(print_statement),
                    Matchable::rule(execute_file),
                    Matchable::rule(assignment),
                ],
            )
            .slot("b", vec![Matchable::kind("SEMICOLON")]),
    )?;
    engine.set_definition(
        "print_statement",
        RuleDefinition::new()
            .slot("a", vec![Matchable::kind("PRINT")])
            .slot("b", vec![Matchable::kind("LPAREN")])
            .slot(
                "c",
                vec![
                    Matchable::kind("STRING"),
                    Matchable::kind("NUMBER"),
                    Matchable::kind("IDENTIFIER"),
                ],
            )
            .slot("d", vec![Matchable::kind("RPAREN")]),
    )?;
    engine.set_definition(
        "execute_file",
        RuleDefinition::new()
            .slot("a", vec![Matchable::kind("EXECUTE")])
            .slot("b", vec![Matchable::kind("LPAREN")])
            .slot(
                "c",
                vec![Matchable::kind("STRING"), Matchable::kind("IDENTIFIER")],
            )
            .slot("d", vec![Matchable::kind("RPAREN")]),
    )?;
    engine.set_definition(
        "assignment",
        RuleDefinition::new()
            .slot("a", vec![Matchable::kind("LET")])
            .slot("b", vec![Matchable::kind("IDENTIFIER")])
            .slot("c", vec![Matchable::kind("ASSIGN")])
            .slot("d", vec![Matchable::rule(expression)]),
    )?;
    engine.set_definition(
        "expression",
        RuleDefinition::new().slot(
            "a",
            vec![
                Matchable::kind("NUMBER"),
                Matchable::kind("STRING"),
                Matchable::kind("IDENTIFIER"),
            ],
        ),
    )?;

    engine.register_reduction("program", ExternalAccess::None, |scope| {
        let a = scope.a.ok_or_else(|| scope.fail("missing statements"))?;
        scope.eval(a)
    });

    engine.register_reduction("statements", ExternalAccess::None, |scope| {
        let a = scope.a.ok_or_else(|| scope.fail("missing statement"))?;
        scope.eval(a)?;
        let rest = scope.optional;
        for node in rest {
            scope.eval(node)?;
        }
        Ok(Value::Unit)
    });

    engine.register_reduction("statement", ExternalAccess::None, |scope| {
        let a = scope.a.ok_or_else(|| scope.fail("missing statement body"))?;
        scope.eval(a)
    });

    engine.register_reduction("assignment", ExternalAccess::All, |scope| {
        let b = scope.b.ok_or_else(|| scope.fail("missing variable name"))?;
        let d = scope.d.ok_or_else(|| scope.fail("missing value"))?;
        let leaf = d.slot("a").ok_or_else(|| scope.fail("malformed expression"))?;
        let name = b.text().unwrap_or_default().to_string();
        let value = leaf_value(scope, leaf)?;
        scope.set_external(&name, value)?;
        Ok(Value::Unit)
    });

    let out = output.clone();
    engine.register_reduction("print_statement", ExternalAccess::All, move |scope| {
        let c = scope.c.ok_or_else(|| scope.fail("missing argument"))?;
        let text = c.text().unwrap_or_default();
        if c.is_type("STRING") {
            out.emit(strip_quotes(text));
        } else if c.is_type("NUMBER") {
            out.emit(text);
        } else {
            // An unbound identifier prints as its own name.
            match scope.external(text)? {
                Some(value) => out.emit(&value.to_string()),
                None => out.emit(text),
            }
        }
        Ok(Value::Unit)
    });

    engine.register_reduction("execute_file", ExternalAccess::All, |scope| {
        let c = scope.c.ok_or_else(|| scope.fail("missing path"))?;
        let text = c.text().unwrap_or_default();
        // The path may be a string literal or a variable holding one.
        let path = if c.is_type("STRING") {
            strip_quotes(text).to_string()
        } else {
            match scope.external(text)? {
                Some(value) => value.to_string(),
                None => return Err(scope.fail(format!("undefined variable {:?}", text))),
            }
        };
        let source = fs::read_to_string(&path)
            .map_err(|e| scope.fail(format!("cannot read {:?}: {}", path, e)))?;
        scope.eval_source(&source)
    });

    Ok((engine, output))
}

/// Value of a literal leaf: numbers parse, strings lose their quotes, and an
/// identifier reads the variable it names.
fn leaf_value(scope: &ReductionScope<'_>, node: &ParseNode) -> Result<Value, EngineError> {
    let text = node.text().unwrap_or_default();
    if node.is_type("NUMBER") {
        let number: f64 = text.parse().map_err(|_| EngineError::NotANumber {
            value: text.to_string(),
        })?;
        Ok(Value::Number(number))
    } else if node.is_type("STRING") {
        Ok(Value::Str(strip_quotes(text).to_string()))
    } else {
        match scope.external(text)? {
            Some(value) => Ok(value.clone()),
            None => Err(scope.fail(format!("undefined variable {:?}", text))),
        }
    }
}
