//! Property-based tests for the engine pipeline
//!
//! Uses generated arithmetic chains to check that evaluation is an exact
//! left fold, that lexer offsets always point at the matched text, and that
//! parsing is deterministic.

use gramkit::gramkit::demos::math_engine;
use gramkit::{Input, Session, Value};
use proptest::prelude::*;

const OPERATORS: [char; 4] = ['+', '-', '*', '/'];

/// Generate a chain like `12 + 3 * 40` together with its operand/operator
/// structure.
fn chain_strategy() -> impl Strategy<Value = (u32, Vec<(usize, u32)>)> {
    (
        1u32..100,
        prop::collection::vec((0usize..4, 1u32..100), 1..7),
    )
}

fn chain_source(first: u32, rest: &[(usize, u32)]) -> String {
    let mut source = first.to_string();
    for (op, operand) in rest {
        source.push(' ');
        source.push(OPERATORS[*op]);
        source.push(' ');
        source.push_str(&operand.to_string());
    }
    source
}

fn left_fold(first: u32, rest: &[(usize, u32)]) -> f64 {
    let mut acc = f64::from(first);
    for (op, operand) in rest {
        let rhs = f64::from(*operand);
        acc = match OPERATORS[*op] {
            '+' => acc + rhs,
            '-' => acc - rhs,
            '*' => acc * rhs,
            _ => acc / rhs,
        };
    }
    acc
}

proptest! {
    #[test]
    fn test_chain_is_an_exact_left_fold((first, rest) in chain_strategy()) {
        let (engine, _) = math_engine().unwrap();
        let source = chain_source(first, &rest);
        let mut session = Session::new();
        let value = engine.interpret(Input::Text(&source), &mut session).unwrap();
        prop_assert_eq!(value, Value::Number(left_fold(first, &rest)));
    }

    #[test]
    fn test_token_offsets_point_at_their_text((first, rest) in chain_strategy()) {
        let (engine, _) = math_engine().unwrap();
        let source = chain_source(first, &rest);
        let tokens = engine.tokenize(&source).unwrap();
        let trimmed = source.trim();
        for token in &tokens {
            prop_assert!(trimmed[token.offset..].starts_with(&token.text));
        }
        // Every operand and operator shows up as exactly one token.
        prop_assert_eq!(tokens.len(), 1 + rest.len() * 2);
    }

    #[test]
    fn test_parsing_is_deterministic((first, rest) in chain_strategy()) {
        let (engine, _) = math_engine().unwrap();
        let source = chain_source(first, &rest);
        let tokens = engine.tokenize(&source).unwrap();
        let start = engine.select_start(&tokens).unwrap();
        let a = engine.parse(&tokens, &start).unwrap();
        let b = engine.parse(&tokens, &start).unwrap();
        prop_assert_eq!(a, b);
    }
}
