//! The `Expression` engine object
//!
//! One `Expression` lives per consumer (typically per label category).
//! It owns the field catalog, the compiled program, the operation
//! cache, the numeric display format and the last-error diagnostic,
//! and it drives the compile/evaluate/fallback lifecycle:
//!
//! ```text
//! Uncompiled ──compile──▶ Compiled (no cache) ──first evaluate──▶ Compiled (cached)
//!      ▲                        │
//!      └──── set_fields ────────┘        (compile always resets the cache)
//! ```
//!
//! An `Expression` is not safe for concurrent evaluation: `evaluate`
//! reuses an internal scratch buffer. Callers needing parallel rows
//! give each worker its own instance; recompiling the same text is
//! cheap, idempotent and deterministic.

use crate::catalog::{Field, FieldCatalog};
use crate::compile;
use crate::error::{CompileError, Error, EvalError};
use crate::eval::{self, Scratch};
use crate::fallback;
use crate::program::{CachedOp, Program};
use crate::row::RowAccessor;
use crate::value::NumberFormat;

#[derive(Debug, Default)]
enum State {
    #[default]
    Uncompiled,
    Compiled {
        program: Program,
        /// Populated by the first successful evaluation after a
        /// compile; replayed verbatim afterwards.
        cache: Option<Vec<CachedOp>>,
    },
}

/// A compiled, repeatedly evaluable label expression.
#[derive(Debug, Default)]
pub struct Expression {
    catalog: FieldCatalog,
    state: State,
    /// The text most recently handed to `compile`, whether or not that
    /// compile succeeded; the fallback formatter works from it.
    text: String,
    valid: bool,
    format: NumberFormat,
    last_error: Option<String>,
    scratch: Scratch,
}

impl Expression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the field catalog wholesale. Field kinds participate in
    /// compilation, so any compiled program is dropped and the next
    /// `compile` starts fresh.
    pub fn set_fields(&mut self, fields: impl IntoIterator<Item = Field>) {
        self.catalog.register(fields);
        self.state = State::Uncompiled;
        self.valid = false;
    }

    /// Empty the field catalog (schema went away). Drops any compiled
    /// program like `set_fields` does.
    pub fn clear_fields(&mut self) {
        self.catalog.clear();
        self.state = State::Uncompiled;
        self.valid = false;
    }

    /// Current expression text (last text handed to `compile`).
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Human-readable diagnostic for the most recent compile or
    /// evaluation failure.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Set the numeric display format (e.g. `"g"`, `"f2"`, `"0.00"`),
    /// independently of compilation.
    pub fn set_number_format(&mut self, format: &str) {
        self.format = NumberFormat::parse(format);
    }

    pub fn number_format(&self) -> &NumberFormat {
        &self.format
    }

    /// Compile expression text against the current catalog.
    ///
    /// A no-op success when the text is unchanged and the last compile
    /// succeeded, so per-frame callers can compile unconditionally.
    /// On success any previously recorded operation cache is discarded.
    pub fn compile(&mut self, text: &str) -> Result<(), CompileError> {
        if self.valid && matches!(self.state, State::Compiled { .. }) && self.text == text {
            return Ok(());
        }

        self.text = text.to_string();
        match compile::compile(text, &self.catalog) {
            Ok(program) => {
                tracing::debug!(
                    parts = program.parts.len(),
                    "compiled label expression"
                );
                self.state = State::Compiled {
                    program,
                    cache: None,
                };
                self.valid = true;
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                self.state = State::Uncompiled;
                self.valid = false;
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Evaluate the compiled expression against one row, strict path.
    ///
    /// The first evaluation after a compile records the reduction
    /// sequence; later rows replay it. A failure marks the expression
    /// invalid until recompilation or the next successful evaluation.
    pub fn evaluate(&mut self, row: &dyn RowAccessor, row_id: i64) -> Result<String, EvalError> {
        let State::Compiled { program, cache } = &mut self.state else {
            let e = EvalError::NotCompiled;
            self.last_error = Some(e.to_string());
            return Err(e);
        };

        let result = match cache {
            Some(ops) => eval::run_replay(program, ops, row, row_id, &self.format, &mut self.scratch),
            None => {
                let mut ops = Vec::new();
                let result = eval::run_recording(
                    program,
                    row,
                    row_id,
                    &self.format,
                    &mut self.scratch,
                    &mut ops,
                );
                // A partial recording is meaningless; only a successful
                // pass advances to the cached state.
                if result.is_ok() {
                    *cache = Some(ops);
                }
                result
            }
        };

        match result {
            Ok(value) => {
                self.valid = true;
                Ok(value.to_display(&self.format))
            }
            Err(e) => {
                self.valid = false;
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Evaluate with graceful degradation: the entry point the host
    /// labeling pipeline uses. Always produces output; on any compile
    /// or evaluation failure the raw field values are substituted into
    /// the expression text without operator evaluation.
    pub fn evaluate_or_fallback(&mut self, row: &dyn RowAccessor, row_id: i64) -> String {
        if matches!(self.state, State::Compiled { .. }) {
            match self.evaluate(row, row_id) {
                Ok(out) => return out,
                Err(e) => {
                    tracing::debug!(error = %e, "evaluation failed, using fallback formatter");
                }
            }
        }
        fallback::substitute(&self.text, row, row_id, &self.format)
    }
}

/// One-shot convenience: compile `text` against `fields` and evaluate
/// it for a single row.
pub fn evaluate_one(
    text: &str,
    fields: impl IntoIterator<Item = Field>,
    row: &dyn RowAccessor,
    row_id: i64,
) -> Result<String, Error> {
    let mut expression = Expression::new();
    expression.set_fields(fields);
    expression.compile(text)?;
    Ok(expression.evaluate(row, row_id)?)
}
