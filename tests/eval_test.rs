//! End-to-end evaluation tests through the public `Expression` surface

use labelexpr::{EmptyRow, Expression, Field, FieldValue, ValueKind};
use std::collections::HashMap;

fn city_fields() -> Vec<Field> {
    vec![
        Field::new("NAME", ValueKind::Text),
        Field::new("POP", ValueKind::Number),
        Field::new("CAPITAL", ValueKind::Boolean),
    ]
}

fn city_row(name: &str, pop: f64, capital: bool) -> HashMap<String, FieldValue> {
    let mut row = HashMap::new();
    row.insert("NAME".to_string(), FieldValue::from(name));
    row.insert("POP".to_string(), FieldValue::from(pop));
    row.insert("CAPITAL".to_string(), FieldValue::from(capital));
    row
}

fn eval_literal(text: &str) -> String {
    let mut expr = Expression::new();
    expr.compile(text).unwrap();
    expr.evaluate(&EmptyRow, 0).unwrap()
}

#[test]
fn test_numeric_literal_round_trip() {
    assert_eq!(eval_literal("42"), "42");
    assert_eq!(eval_literal("3.25"), "3.25");
    assert_eq!(eval_literal("1.5e3"), "1500");
}

#[test]
fn test_operator_precedence() {
    // Multiplication binds tighter than addition.
    assert_eq!(eval_literal("2 + 3 * 4"), "14");
    // Exponent binds tightest; same-priority chains reduce left to right.
    assert_eq!(eval_literal("2 ^ 3 ^ 2"), "64");
    assert_eq!(eval_literal("2 * 3 ^ 2"), "18");
    assert_eq!(eval_literal("10 - 4 - 3"), "3");
}

#[test]
fn test_bracket_nesting() {
    assert_eq!(eval_literal("(1 + 2) * (3 + 4)"), "21");
    assert_eq!(eval_literal("((2))"), "2");
    assert_eq!(eval_literal("-(1 + 2)"), "-3");
}

#[test]
fn test_unary_operators() {
    assert_eq!(eval_literal("-5 + 3"), "-2");
    assert_eq!(eval_literal("NOT true"), "false");
    assert_eq!(eval_literal("NOT (NOT false)"), "false");
    // Unary minus binds looser than the exponent it prefixes.
    assert_eq!(eval_literal("-2 ^ 2"), "-4");
}

#[test]
fn test_integer_division_and_modulo() {
    assert_eq!(eval_literal("7 \\ 2"), "3");
    assert_eq!(eval_literal("7.9 \\ 2.9"), "3");
    assert_eq!(eval_literal("7 MOD 3"), "1");
    assert_eq!(eval_literal("17 mod 5"), "2");
}

#[test]
fn test_comparisons_and_logic() {
    assert_eq!(eval_literal("1 < 2"), "true");
    assert_eq!(eval_literal("2 <= 2"), "true");
    assert_eq!(eval_literal("1 <> 2"), "true");
    assert_eq!(eval_literal("1 != 1"), "false");
    assert_eq!(eval_literal("2 == 2"), "true");
    assert_eq!(eval_literal("'Paris' = 'PARIS'"), "true");
    assert_eq!(eval_literal("true AND false"), "false");
    assert_eq!(eval_literal("true OR false"), "true");
    assert_eq!(eval_literal("true XOR true"), "false");
    // Comparisons bind tighter than logic.
    assert_eq!(eval_literal("1 < 2 AND 3 < 4"), "true");
}

#[test]
fn test_string_concatenation() {
    assert_eq!(eval_literal("'a' + \"b\""), "ab");
    assert_eq!(eval_literal("'n = ' + 3"), "n = 3");
    assert_eq!(eval_literal("3 + ' items'"), "3 items");
    assert_eq!(eval_literal("'it''s \"fine\"'"), "it's \"fine\"");
}

#[test]
fn test_newline_operator_concatenates_with_line_break() {
    assert_eq!(eval_literal("'top'\n'bottom'"), "top\nbottom");
    assert_eq!(eval_literal("'row '\n12"), "row \n12");
}

#[test]
fn test_field_substitution() {
    let mut expr = Expression::new();
    expr.set_fields(city_fields());
    expr.compile("'City: ' + [NAME]").unwrap();

    let row = city_row("Paris", 2_148_000.0, true);
    assert_eq!(expr.evaluate(&row, 1).unwrap(), "City: Paris");
}

#[test]
fn test_field_arithmetic_per_row() {
    let mut expr = Expression::new();
    expr.set_fields(city_fields());
    expr.compile("[NAME] + ': ' + ([POP] / 1000) + 'k'").unwrap();

    let paris = city_row("Paris", 2_148_000.0, true);
    let lyon = city_row("Lyon", 513_000.0, false);
    assert_eq!(expr.evaluate(&paris, 1).unwrap(), "Paris: 2148k");
    assert_eq!(expr.evaluate(&lyon, 2).unwrap(), "Lyon: 513k");
}

#[test]
fn test_boolean_field() {
    let mut expr = Expression::new();
    expr.set_fields(city_fields());
    expr.compile("[CAPITAL] AND [POP] > 1000000").unwrap();

    assert_eq!(
        expr.evaluate(&city_row("Paris", 2_148_000.0, true), 1).unwrap(),
        "true"
    );
    assert_eq!(
        expr.evaluate(&city_row("Lyon", 513_000.0, false), 2).unwrap(),
        "false"
    );
}

#[test]
fn test_fid_resolves_to_row_id() {
    let mut expr = Expression::new();
    // Independent of the catalog: no fields registered at all.
    expr.compile("[FID]").unwrap();
    assert_eq!(expr.evaluate(&EmptyRow, 41).unwrap(), "41");
    assert_eq!(expr.evaluate(&EmptyRow, 42).unwrap(), "42");

    expr.compile("'#' + [fid] * 2").unwrap();
    assert_eq!(expr.evaluate(&EmptyRow, 10).unwrap(), "#20");
}

#[test]
fn test_missing_field_values_take_kind_defaults() {
    let mut expr = Expression::new();
    expr.set_fields(city_fields());
    expr.compile("[NAME] + [POP]").unwrap();

    let empty: HashMap<String, FieldValue> = HashMap::new();
    assert_eq!(expr.evaluate(&empty, 1).unwrap(), "0");
}

#[test]
fn test_number_format_applies_to_output() {
    let mut expr = Expression::new();
    expr.set_number_format("f2");
    expr.compile("10 / 4").unwrap();
    assert_eq!(expr.evaluate(&EmptyRow, 0).unwrap(), "2.50");

    // Settable independently of compilation.
    expr.set_number_format("g");
    assert_eq!(expr.evaluate(&EmptyRow, 0).unwrap(), "2.5");
}

#[test]
fn test_json_rows() {
    let serde_json::Value::Object(row) = serde_json::json!({
        "NAME": "Oslo",
        "POP": 709000,
    }) else {
        unreachable!()
    };

    let out = labelexpr::evaluate_one(
        "[NAME] + ' (' + [POP] + ')'",
        [
            Field::new("NAME", ValueKind::Text),
            Field::new("POP", ValueKind::Number),
        ],
        &row,
        1,
    )
    .unwrap();
    assert_eq!(out, "Oslo (709000)");
}
