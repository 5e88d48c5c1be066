//! Criterion benchmarks for the label expression engine
//!
//! The contract under test: compiling is allowed to be expensive,
//! evaluating a row is not — the same compiled expression is evaluated
//! once per feature, potentially hundreds of thousands of times.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use labelexpr::{EmptyRow, Expression, Field, FieldValue, ValueKind};
use std::collections::HashMap;
use std::time::Duration;

fn custom_criterion() -> Criterion {
    Criterion::default()
        .sample_size(20)
        .warm_up_time(Duration::from_millis(100))
        .measurement_time(Duration::from_secs(1))
        .nresamples(1000)
        .noise_threshold(0.05)
}

fn city_expression() -> Expression {
    let mut expr = Expression::new();
    expr.set_fields([
        Field::new("NAME", ValueKind::Text),
        Field::new("POP", ValueKind::Number),
    ]);
    expr
}

fn city_row(pop: f64) -> HashMap<String, FieldValue> {
    let mut row = HashMap::new();
    row.insert("NAME".to_string(), FieldValue::from("Paris"));
    row.insert("POP".to_string(), FieldValue::from(pop));
    row
}

fn bench_compile(c: &mut Criterion) {
    let mut expr = city_expression();

    c.bench_function("compile_label_expression", |b| {
        b.iter(|| {
            // Alternate texts so the unchanged-text no-op never kicks in.
            expr.compile(black_box("[NAME] + ' (' + [POP] + ')'")).unwrap();
            expr.compile(black_box("[POP] + ' - ' + [NAME]")).unwrap();
        })
    });
}

fn bench_evaluate_cached(c: &mut Criterion) {
    let mut expr = city_expression();
    expr.compile("[NAME] + ' (' + ([POP] / 1000) + 'k)'").unwrap();
    let row = city_row(2_148_000.0);
    // First pass records the operation cache; the measured loop replays.
    expr.evaluate(&row, 1).unwrap();

    c.bench_function("evaluate_row_cached", |b| {
        b.iter(|| expr.evaluate(black_box(&row), 1).unwrap())
    });
}

fn bench_evaluate_arithmetic(c: &mut Criterion) {
    let mut expr = Expression::new();
    expr.compile("(1 + 2) * (3 + 4) ^ 2 MOD 10").unwrap();
    expr.evaluate(&EmptyRow, 0).unwrap();

    c.bench_function("evaluate_arithmetic", |b| {
        b.iter(|| expr.evaluate(&EmptyRow, black_box(0)).unwrap())
    });
}

fn bench_fallback(c: &mut Criterion) {
    let mut expr = city_expression();
    expr.compile("[NAME] + ([POP]").unwrap_err();
    let row = city_row(2_148_000.0);

    c.bench_function("fallback_substitution", |b| {
        b.iter(|| expr.evaluate_or_fallback(black_box(&row), 1))
    });
}

criterion_group! {
    name = benches;
    config = custom_criterion();
    targets = bench_compile, bench_evaluate_cached, bench_evaluate_arithmetic, bench_fallback
}
criterion_main!(benches);
