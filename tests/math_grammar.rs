//! End-to-end tests for the chained arithmetic demo grammar
//!
//! Exercises the whole pipeline through `Engine::interpret`: start-rule
//! selection, left-to-right chain evaluation without precedence,
//! parenthesized grouping, printing, and the error surface.

use gramkit::gramkit::demos::math_engine;
use gramkit::{EngineError, Input, ParseErrorKind, Session, Value};
use rstest::rstest;

#[rstest]
#[case("3 + 4 * 2", 14.0)]
#[case("1 + 2 + 3 + 4", 10.0)]
#[case("10 / 4", 2.5)]
#[case("10 - 2 - 3", 5.0)]
#[case("(2 + 3) - 1", 4.0)]
#[case("(1 + 1) * 3", 6.0)]
#[case("2 * (3 + 1)", 8.0)]
#[case("2.5 + 2.5", 5.0)]
#[case("((1 + 2))", 3.0)]
#[case("(((5 - 2)))", 3.0)]
#[case("((1 + 2)) * 2", 6.0)]
fn test_chain_evaluates_left_to_right(#[case] source: &str, #[case] expected: f64) {
    let (engine, _) = math_engine().unwrap();
    let mut session = Session::new();
    let value = engine.interpret(Input::Text(source), &mut session).unwrap();
    assert_eq!(value, Value::Number(expected));
}

#[test]
fn test_trailing_tokens_are_rejected() {
    let (engine, _) = math_engine().unwrap();
    let mut session = Session::new();
    let err = engine
        .interpret(Input::Text("3 + 4 5"), &mut session)
        .unwrap_err();
    match err {
        EngineError::Parse(e) => {
            assert_eq!(e.kind, ParseErrorKind::TrailingTokens);
            assert_eq!(e.position, 3);
        }
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn test_unlexable_input_reports_offset() {
    let (engine, _) = math_engine().unwrap();
    let mut session = Session::new();
    let err = engine
        .interpret(Input::Text("@ + 1"), &mut session)
        .unwrap_err();
    match err {
        EngineError::Lex(e) => assert_eq!(e.offset, 0),
        other => panic!("expected lex error, got {:?}", other),
    }
}

#[test]
fn test_empty_input_fails_to_parse() {
    let (engine, _) = math_engine().unwrap();
    let mut session = Session::new();
    let err = engine.interpret(Input::Text(""), &mut session).unwrap_err();
    assert!(matches!(err, EngineError::Parse(_)));
}

#[test]
fn test_print_string_literal_strips_quotes() {
    let (engine, output) = math_engine().unwrap();
    let mut session = Session::new();
    let value = engine
        .interpret(Input::Text("print(\"Hello World\")"), &mut session)
        .unwrap();
    assert!(value.is_unit());
    assert_eq!(output.drain(), vec!["Hello World"]);
}

#[test]
fn test_print_parenthesized_expression() {
    let (engine, output) = math_engine().unwrap();
    let mut session = Session::new();
    engine
        .interpret(Input::Text("print((1 + 2))"), &mut session)
        .unwrap();
    assert_eq!(output.drain(), vec!["3"]);
}

#[test]
fn test_print_expression_prints_its_value() {
    let (engine, output) = math_engine().unwrap();
    let mut session = Session::new();
    engine
        .interpret(Input::Text("print(1 + 2)"), &mut session)
        .unwrap();
    assert_eq!(output.drain(), vec!["3"]);
}

#[test]
fn test_result_lands_on_the_evaluation_stack() {
    let (engine, _) = math_engine().unwrap();
    let mut session = Session::new();
    engine
        .interpret(Input::Text("3 + 4"), &mut session)
        .unwrap();
    assert_eq!(session.stack.top(), Some(&Value::Number(7.0)));
}

#[test]
fn test_repeated_interpretation_is_deterministic() {
    let (engine, _) = math_engine().unwrap();
    let mut first = Session::new();
    let mut second = Session::new();
    let a = engine
        .interpret(Input::Text("1 + 2 * 3 - 4"), &mut first)
        .unwrap();
    let b = engine
        .interpret(Input::Text("1 + 2 * 3 - 4"), &mut second)
        .unwrap();
    assert_eq!(a, b);
    assert_eq!(a, Value::Number(5.0));
}
