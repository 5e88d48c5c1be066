//! Reduction evaluator
//!
//! Reduces a compiled [`Program`] to a single [`Value`] for one row.
//! Parts are processed strictly in compiled order (innermost first);
//! within a part the evaluator repeatedly applies the still-active
//! operator with the lowest priority value (leftmost on ties), marking
//! its operands consumed, until one active element remains.
//!
//! The program itself is never mutated. All transient state lives in a
//! [`Scratch`] arena indexed in parallel with the element sequences:
//! `consumed` flags, per-element `computed` sub-results (so a reduced
//! operand is never confused with its pre-operation literal), per-part
//! active counts and finished part values. Callers reuse one `Scratch`
//! across rows to stay allocation-light.
//!
//! The first pass after a compile records every reduction decision as a
//! [`CachedOp`]; later passes replay that sequence and skip the
//! priority search entirely. Replay must never change the answer, only
//! the cost of computing it.

use crate::catalog::ValueKind;
use crate::error::EvalError;
use crate::program::{CachedOp, Element, Op, Part, Program};
use crate::row::RowAccessor;
use crate::value::{FieldValue, NumberFormat, Value};

/// Per-evaluation transient state, reusable across rows.
#[derive(Debug, Default)]
pub struct Scratch {
    consumed: Vec<Vec<bool>>,
    computed: Vec<Vec<Option<Value>>>,
    part_values: Vec<Option<Value>>,
    active: Vec<usize>,
}

impl Scratch {
    fn reset(&mut self, program: &Program) {
        let n = program.parts.len();
        self.consumed.resize(n, Vec::new());
        self.computed.resize(n, Vec::new());
        self.part_values.clear();
        self.part_values.resize(n, None);
        self.active.clear();
        for (p, part) in program.parts.iter().enumerate() {
            self.consumed[p].clear();
            self.consumed[p].resize(part.len(), false);
            self.computed[p].clear();
            self.computed[p].resize(part.len(), None);
            self.active.push(part.len());
        }
    }
}

enum Mode<'a> {
    /// First pass: search for each reduction and record it.
    Record(&'a mut Vec<CachedOp>),
    /// Later passes: replay the recorded sequence.
    Replay(std::slice::Iter<'a, CachedOp>),
}

struct EvalCtx<'a> {
    program: &'a Program,
    row: &'a dyn RowAccessor,
    row_id: i64,
    format: &'a NumberFormat,
}

/// Evaluate while recording reduction decisions into `ops`. On failure
/// the recording is meaningless and must be discarded by the caller.
pub fn run_recording(
    program: &Program,
    row: &dyn RowAccessor,
    row_id: i64,
    format: &NumberFormat,
    scratch: &mut Scratch,
    ops: &mut Vec<CachedOp>,
) -> Result<Value, EvalError> {
    let ctx = EvalCtx {
        program,
        row,
        row_id,
        format,
    };
    run(&ctx, scratch, Mode::Record(ops))
}

/// Evaluate by replaying a previously recorded reduction sequence.
pub fn run_replay(
    program: &Program,
    ops: &[CachedOp],
    row: &dyn RowAccessor,
    row_id: i64,
    format: &NumberFormat,
    scratch: &mut Scratch,
) -> Result<Value, EvalError> {
    let ctx = EvalCtx {
        program,
        row,
        row_id,
        format,
    };
    run(&ctx, scratch, Mode::Replay(ops.iter()))
}

fn run(ctx: &EvalCtx<'_>, scratch: &mut Scratch, mut mode: Mode<'_>) -> Result<Value, EvalError> {
    scratch.reset(ctx.program);

    for (p, part) in ctx.program.parts.iter().enumerate() {
        while scratch.active[p] > 1 {
            let step = match &mut mode {
                Mode::Record(ops) => {
                    let step = find_reduction(scratch, p, part)?;
                    ops.push(step);
                    step
                }
                Mode::Replay(iter) => {
                    let step = *iter
                        .next()
                        .ok_or(EvalError::Internal("operation cache exhausted"))?;
                    if step.part != p {
                        return Err(EvalError::Internal("operation cache out of order"));
                    }
                    step
                }
            };
            apply_step(ctx, scratch, p, part, step)?;
        }
        finalize_part(ctx, scratch, p, part)?;
    }

    scratch.part_values[ctx.program.root()]
        .clone()
        .ok_or(EvalError::Internal("root part produced no value"))
}

/// Locate the next reduction in a part: the active operator with the
/// numerically lowest priority (leftmost on ties) and its operands.
fn find_reduction(scratch: &Scratch, p: usize, part: &Part) -> Result<CachedOp, EvalError> {
    let mut best: Option<(usize, Op, u8)> = None;
    for (i, element) in part.elements.iter().enumerate() {
        if scratch.consumed[p][i] || scratch.computed[p][i].is_some() {
            continue;
        }
        if let Some(op) = element.operator() {
            let priority = op.priority();
            if best.map_or(true, |(_, _, b)| priority < b) {
                best = Some((i, op, priority));
            }
        }
    }
    // More than one active element but no reducible operator cannot be
    // produced by the part compiler's alternation.
    let (op_idx, op, _) = best.ok_or(EvalError::Internal("no reducible operator"))?;

    // Right operand: first active element right of the operator. An
    // unreduced operator there means the author chained operators.
    let mut right = None;
    for i in op_idx + 1..part.len() {
        if scratch.consumed[p][i] {
            continue;
        }
        if part.elements[i].operator().is_some() && scratch.computed[p][i].is_none() {
            return Err(EvalError::OperatorInsteadOfValue);
        }
        right = Some(i);
        break;
    }
    let right = right.ok_or(EvalError::RightOperandMissing)?;

    let left = if op.is_unary() {
        None
    } else {
        let left = (0..op_idx)
            .rev()
            .find(|&i| !scratch.consumed[p][i])
            .ok_or(EvalError::LeftOperandMissing)?;
        Some(left)
    };

    Ok(CachedOp {
        part: p,
        op: op_idx,
        left,
        right,
    })
}

/// Apply one reduction: compute the operator's result into its computed
/// slot (it then acts as a value element) and consume the operands.
fn apply_step(
    ctx: &EvalCtx<'_>,
    scratch: &mut Scratch,
    p: usize,
    part: &Part,
    step: CachedOp,
) -> Result<(), EvalError> {
    let op = part.elements[step.op]
        .operator()
        .ok_or(EvalError::Internal("cached index is not an operator"))?;

    let right = value_of(ctx, scratch, p, part, step.right)?;
    let result = match step.left {
        Some(left_idx) => {
            let left = value_of(ctx, scratch, p, part, left_idx)?;
            apply_binary(op, left, right, ctx.format)?
        }
        None => apply_unary(op, right)?,
    };

    scratch.computed[p][step.op] = Some(result);
    scratch.consumed[p][step.right] = true;
    match step.left {
        Some(left_idx) => {
            scratch.consumed[p][left_idx] = true;
            scratch.active[p] -= 2;
        }
        None => scratch.active[p] -= 1,
    }
    Ok(())
}

/// A part is done when one active element remains; its value becomes
/// the part's value.
fn finalize_part(
    ctx: &EvalCtx<'_>,
    scratch: &mut Scratch,
    p: usize,
    part: &Part,
) -> Result<(), EvalError> {
    for i in 0..part.len() {
        if scratch.consumed[p][i] {
            continue;
        }
        // A lone operator that never got applied has no operand.
        if part.elements[i].operator().is_some() && scratch.computed[p][i].is_none() {
            return Err(EvalError::RightOperandMissing);
        }
        let value = value_of(ctx, scratch, p, part, i)?;
        scratch.part_values[p] = Some(value);
        scratch.consumed[p][i] = true;
        scratch.active[p] = 0;
        return Ok(());
    }
    Err(EvalError::Internal("part reduced to no value"))
}

/// Resolve an element to a live value: its computed sub-result if one
/// exists, otherwise its literal, a fresh field binding, the row id, or
/// an earlier part's value.
fn value_of(
    ctx: &EvalCtx<'_>,
    scratch: &Scratch,
    p: usize,
    part: &Part,
    idx: usize,
) -> Result<Value, EvalError> {
    if let Some(value) = &scratch.computed[p][idx] {
        return Ok(value.clone());
    }
    match &part.elements[idx] {
        Element::Literal(value) => Ok(value.clone()),
        Element::FieldRef { name, kind } => {
            bind_field(name, *kind, ctx.row.get(name), ctx.format)
        }
        Element::RowId => Ok(Value::Number(ctx.row_id as f64)),
        Element::PartRef(k) => scratch.part_values[*k]
            .clone()
            .ok_or(EvalError::Internal("referenced part not yet reduced")),
        Element::Operator(_) => Err(EvalError::OperatorInsteadOfValue),
    }
}

/// Convert a raw row value to the field's declared kind. Null and
/// missing values take the kind's default so sparse attribute tables
/// still label.
fn bind_field(
    name: &str,
    kind: ValueKind,
    raw: Option<FieldValue>,
    format: &NumberFormat,
) -> Result<Value, EvalError> {
    let mismatch = || EvalError::FieldKindMismatch {
        field: name.to_string(),
        kind: kind.name(),
    };

    let raw = match raw {
        None | Some(FieldValue::Null) => {
            return Ok(match kind {
                ValueKind::Number => Value::Number(0.0),
                ValueKind::Text => Value::Text(String::new()),
                ValueKind::Boolean => Value::Boolean(false),
                ValueKind::Opaque => Value::Opaque(None),
            })
        }
        Some(raw) => raw,
    };

    match kind {
        ValueKind::Number => match raw {
            FieldValue::Number(n) => Ok(Value::Number(n)),
            // Numeric columns stored as text are common in shapefile
            // attribute tables; accept parseable text.
            FieldValue::Text(t) => t.trim().parse().map(Value::Number).map_err(|_| mismatch()),
            _ => Err(mismatch()),
        },
        ValueKind::Text => Ok(Value::Text(field_text(raw, format))),
        ValueKind::Boolean => match raw {
            FieldValue::Boolean(b) => Ok(Value::Boolean(b)),
            FieldValue::Text(t) if t.eq_ignore_ascii_case("true") => Ok(Value::Boolean(true)),
            FieldValue::Text(t) if t.eq_ignore_ascii_case("false") => Ok(Value::Boolean(false)),
            _ => Err(mismatch()),
        },
        ValueKind::Opaque => Ok(Value::Opaque(Some(field_text(raw, format)))),
    }
}

fn field_text(raw: FieldValue, format: &NumberFormat) -> String {
    match raw {
        FieldValue::Text(t) => t,
        FieldValue::Number(n) => format.format(n),
        FieldValue::Boolean(b) => if b { "true" } else { "false" }.to_string(),
        FieldValue::Null => String::new(),
    }
}

// ============================================================================
// Operator semantics
// ============================================================================

fn unsupported(op: Op, left: &Value, right: &Value) -> EvalError {
    EvalError::UnsupportedOperands {
        op,
        left: left.kind_name(),
        right: right.kind_name(),
    }
}

/// Binary operators require equal operand kinds, with one exception:
/// `+` concatenates when either side is text and the other is text or a
/// number, but never a boolean.
fn apply_binary(op: Op, left: Value, right: Value, format: &NumberFormat) -> Result<Value, EvalError> {
    match op {
        Op::Add => add(left, right, format),
        Op::Subtract | Op::Multiply | Op::Divide | Op::IntDivide | Op::Modulo | Op::Power => {
            arithmetic(op, left, right)
        }
        Op::Equal | Op::NotEqual | Op::Less | Op::LessOrEqual | Op::Greater | Op::GreaterOrEqual => {
            compare(op, left, right)
        }
        Op::And | Op::Or | Op::Xor => logical(op, left, right),
        Op::LineBreak => Ok(Value::Text(format!(
            "{}\n{}",
            left.to_display(format),
            right.to_display(format)
        ))),
        Op::Not | Op::Negate => Err(EvalError::Internal("unary operator applied as binary")),
    }
}

fn apply_unary(op: Op, operand: Value) -> Result<Value, EvalError> {
    match (op, operand) {
        (Op::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
        (Op::Negate, Value::Number(n)) => Ok(Value::Number(-n)),
        (Op::Not | Op::Negate, operand) => Err(EvalError::UnsupportedOperand {
            op,
            operand: operand.kind_name(),
        }),
        _ => Err(EvalError::Internal("binary operator applied as unary")),
    }
}

fn add(left: Value, right: Value, format: &NumberFormat) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (Value::Text(a), Value::Text(b)) => Ok(Value::Text(a + &b)),
        (Value::Text(a), Value::Number(b)) => Ok(Value::Text(a + &format.format(b))),
        (Value::Number(a), Value::Text(b)) => Ok(Value::Text(format.format(a) + &b)),
        (Value::Boolean(_), _) | (_, Value::Boolean(_)) => Err(EvalError::BooleanAddition),
        (left, right) => Err(unsupported(Op::Add, &left, &right)),
    }
}

fn arithmetic(op: Op, left: Value, right: Value) -> Result<Value, EvalError> {
    let (Value::Number(a), Value::Number(b)) = (&left, &right) else {
        return Err(unsupported(op, &left, &right));
    };
    let (a, b) = (*a, *b);

    let result = match op {
        Op::Subtract => a - b,
        Op::Multiply => a * b,
        Op::Power => a.powf(b),
        Op::Divide => {
            // Zero divisors are hard errors, not IEEE infinities.
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            a / b
        }
        // Integer division and modulo truncate both operands first.
        Op::IntDivide => {
            let divisor = b.trunc() as i64;
            if divisor == 0 {
                return Err(EvalError::IntegerDivisionByZero);
            }
            (a.trunc() as i64 / divisor) as f64
        }
        Op::Modulo => {
            let divisor = b.trunc() as i64;
            if divisor == 0 {
                return Err(EvalError::DivisionByZero);
            }
            (a.trunc() as i64 % divisor) as f64
        }
        _ => return Err(EvalError::Internal("non-arithmetic operator")),
    };
    Ok(Value::Number(result))
}

fn compare(op: Op, left: Value, right: Value) -> Result<Value, EvalError> {
    let result = match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => match op {
            Op::Equal => a == b,
            Op::NotEqual => a != b,
            Op::Less => a < b,
            Op::LessOrEqual => a <= b,
            Op::Greater => a > b,
            Op::GreaterOrEqual => a >= b,
            _ => return Err(EvalError::Internal("non-comparison operator")),
        },
        // String comparison is case-insensitive ordinal.
        (Value::Text(a), Value::Text(b)) => {
            let (a, b) = (a.to_lowercase(), b.to_lowercase());
            match op {
                Op::Equal => a == b,
                Op::NotEqual => a != b,
                Op::Less => a < b,
                Op::LessOrEqual => a <= b,
                Op::Greater => a > b,
                Op::GreaterOrEqual => a >= b,
                _ => return Err(EvalError::Internal("non-comparison operator")),
            }
        }
        // Booleans only support (in)equality, no ordering.
        (Value::Boolean(a), Value::Boolean(b)) => match op {
            Op::Equal => a == b,
            Op::NotEqual => a != b,
            _ => return Err(unsupported(op, &left, &right)),
        },
        _ => return Err(unsupported(op, &left, &right)),
    };
    Ok(Value::Boolean(result))
}

fn logical(op: Op, left: Value, right: Value) -> Result<Value, EvalError> {
    let (Value::Boolean(a), Value::Boolean(b)) = (&left, &right) else {
        return Err(unsupported(op, &left, &right));
    };
    let result = match op {
        Op::And => *a && *b,
        Op::Or => *a || *b,
        Op::Xor => *a ^ *b,
        _ => return Err(EvalError::Internal("non-logical operator")),
    };
    Ok(Value::Boolean(result))
}
