//! Label expression engine - compile once, evaluate per feature row
//!
//! This crate compiles a human-authored label expression string (e.g.
//! `"[NAME] + ' (' + [POP] + ')'"`) into an internal, repeatedly
//! evaluable form, and evaluates it against per-row attribute values to
//! produce label text. It is a pure string-in/attribute-lookup-in →
//! string-out engine with no rendering dependency; the same compiled
//! expression is typically evaluated once per feature, hundreds of
//! thousands of times.
//!
//! # Architecture Overview
//!
//! ```text
//! Expression String
//!      |
//! Extractor -> placeholder text + literal table   ([fields], "strings")
//!      |
//! Bracket Resolver -> part sources, innermost first
//!      |
//! Part Compiler -> Program (parts of value/operator/part-ref elements)
//!      |
//! Evaluator -> Value per row   (first pass records an operation cache,
//!      |                        later rows replay it)
//! Formatted label text
//! ```
//!
//! Compile and evaluation failures degrade to a fallback formatter that
//! substitutes raw field values into the original text, so the host
//! always gets some output and one malformed expression never aborts a
//! whole map draw.
//!
//! # Example
//!
//! ```
//! use labelexpr::{Expression, Field, FieldValue, ValueKind};
//! use std::collections::HashMap;
//!
//! let mut expr = Expression::new();
//! expr.set_fields([
//!     Field::new("NAME", ValueKind::Text),
//!     Field::new("POP", ValueKind::Number),
//! ]);
//! expr.compile("[NAME] + ' (' + [POP] + ')'").unwrap();
//!
//! let mut row = HashMap::new();
//! row.insert("NAME".to_string(), FieldValue::from("Paris"));
//! row.insert("POP".to_string(), FieldValue::from(2_148_000.0));
//!
//! assert_eq!(expr.evaluate_or_fallback(&row, 1), "Paris (2148000)");
//! ```

pub mod catalog;
pub mod compile;
pub mod engine;
pub mod error;
pub mod eval;
pub mod extract;
pub mod fallback;
pub mod program;
pub mod row;
pub mod value;

// Re-export main types
pub use catalog::{Field, FieldCatalog, ValueKind, FID_FIELD};
pub use engine::{evaluate_one, Expression};
pub use error::{CompileError, Error, EvalError, Result};
pub use program::{CachedOp, Element, Op, Part, Program};
pub use row::{EmptyRow, RowAccessor};
pub use value::{FieldValue, NumberFormat, Value};
