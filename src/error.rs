//! Error types for the label expression engine

use crate::program::Op;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Structural errors raised while turning expression text into a
/// compiled program. These are deterministic for a given text and
/// field catalog.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("expression contains reserved character '{0}'")]
    ReservedCharacter(char),

    #[error("unpaired quote in expression")]
    UnpairedQuote,

    #[error("unpaired bracket in expression")]
    UnpairedBracket,

    #[error("empty field reference []")]
    EmptyField,

    #[error("unmatched parenthesis")]
    UnmatchedParenthesis,

    #[error("empty expression part")]
    EmptyPart,

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("malformed numeric literal '{0}'")]
    MalformedNumber(String),

    #[error("operand expected, found {found}")]
    OperandExpected { found: String },

    #[error("operator expected, found {found}")]
    OperatorExpected { found: String },
}

/// Semantic errors raised while reducing a compiled program against one
/// row. Deterministic for a given compiled text and row.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("operator {op} is not supported for {left} and {right}")]
    UnsupportedOperands {
        op: Op,
        left: &'static str,
        right: &'static str,
    },

    #[error("operator {op} is not supported for {operand}")]
    UnsupportedOperand { op: Op, operand: &'static str },

    #[error("'+' is not defined for boolean operands")]
    BooleanAddition,

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer division by zero")]
    IntegerDivisionByZero,

    #[error("field '{field}' value is not convertible to {kind}")]
    FieldKindMismatch { field: String, kind: &'static str },

    #[error("operator found where a value was expected")]
    OperatorInsteadOfValue,

    #[error("right operand missing")]
    RightOperandMissing,

    #[error("left operand missing")]
    LeftOperandMissing,

    #[error("expression is not compiled")]
    NotCompiled,

    #[error("internal evaluation error: {0}")]
    Internal(&'static str),
}

/// Umbrella error for callers that do not care which phase failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}
