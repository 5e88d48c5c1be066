//! Compiled expression form
//!
//! A compiled expression is a [`Program`]: an ordered list of [`Part`]s
//! produced innermost-bracket-first, where each part is an ordered
//! [`Element`] sequence and the last part is the whole expression. A
//! part may reference an earlier part's result ([`Element::PartRef`]),
//! never a later one, so reduction in part order is always possible.
//!
//! Operator precedence (lower priority value binds tighter, equal
//! priorities reduce leftmost-first):
//!
//! | priority | operators |
//! |----------|-----------------------------------|
//! | 1        | `^`                               |
//! | 2        | `*` `/` `\`                       |
//! | 3        | `+` `-` (binary and unary) `MOD`  |
//! | 4        | `=` `==` `<>` `!=` `<=` `>=` `<` `>` |
//! | 5        | `NOT`, newline concatenation      |
//! | 6        | `AND` `XOR` `OR`                  |

use crate::catalog::ValueKind;
use crate::value::Value;
use phf::phf_map;
use smallvec::SmallVec;
use std::fmt;

/// An expression operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Power,
    Multiply,
    Divide,
    IntDivide,
    Modulo,
    Add,
    Subtract,
    /// Unary minus ("change sign").
    Negate,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Not,
    /// Stringifies both operands and joins them with a line break.
    LineBreak,
    And,
    Or,
    Xor,
}

impl Op {
    /// Reduction priority; lower binds tighter.
    pub fn priority(self) -> u8 {
        match self {
            Op::Power => 1,
            Op::Multiply | Op::Divide | Op::IntDivide => 2,
            Op::Add | Op::Subtract | Op::Negate | Op::Modulo => 3,
            Op::Equal
            | Op::NotEqual
            | Op::Less
            | Op::LessOrEqual
            | Op::Greater
            | Op::GreaterOrEqual => 4,
            Op::Not | Op::LineBreak => 5,
            Op::And | Op::Or | Op::Xor => 6,
        }
    }

    /// Unary operators take no left operand and do not flip the
    /// compiler's value/operator state.
    pub fn is_unary(self) -> bool {
        matches!(self, Op::Not | Op::Negate)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Op::Power => "^",
            Op::Multiply => "*",
            Op::Divide => "/",
            Op::IntDivide => "\\",
            Op::Modulo => "MOD",
            Op::Add => "+",
            Op::Subtract | Op::Negate => "-",
            Op::Equal => "=",
            Op::NotEqual => "<>",
            Op::Less => "<",
            Op::LessOrEqual => "<=",
            Op::Greater => ">",
            Op::GreaterOrEqual => ">=",
            Op::Not => "NOT",
            Op::LineBreak => "<newline>",
            Op::And => "AND",
            Op::Or => "OR",
            Op::Xor => "XOR",
        };
        f.write_str(token)
    }
}

/// Word tokens recognized by the part compiler (case-insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    True,
    False,
    Not,
    Mod,
    And,
    Or,
    Xor,
}

/// Static keyword registry; keys are lowercase, lookups lowercase the
/// scanned word first.
static KEYWORDS: phf::Map<&'static str, Keyword> = phf_map! {
    "true" => Keyword::True,
    "false" => Keyword::False,
    "not" => Keyword::Not,
    "mod" => Keyword::Mod,
    "and" => Keyword::And,
    "or" => Keyword::Or,
    "xor" => Keyword::Xor,
};

pub fn lookup_keyword(word: &str) -> Option<Keyword> {
    KEYWORDS.get(word.to_lowercase().as_str()).copied()
}

/// One lexical unit inside a part.
///
/// Elements hold compile-time data only; all evaluation-transient state
/// (consumed flags, computed sub-results) lives in the per-call scratch
/// arena in `eval`, indexed in parallel with this sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// A literal string, number or boolean.
    Literal(Value),
    /// An attribute field reference, re-bound to a live value on every
    /// evaluation pass.
    FieldRef { name: String, kind: ValueKind },
    /// The reserved `fid` field: the caller-supplied row identifier.
    RowId,
    Operator(Op),
    /// The result of an earlier (more deeply bracketed) part.
    PartRef(usize),
}

impl Element {
    pub fn operator(&self) -> Option<Op> {
        match self {
            Element::Operator(op) => Some(*op),
            _ => None,
        }
    }
}

/// One bracket-delimited (or outermost) sub-expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Part {
    pub elements: SmallVec<[Element; 8]>,
}

impl Part {
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// A fully compiled expression. Immutable once built; evaluation never
/// mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Parts in innermost-first order; the last part is the root.
    pub parts: Vec<Part>,
}

impl Program {
    pub fn root(&self) -> usize {
        self.parts.len() - 1
    }
}

/// One recorded reduction decision: which operator element was applied
/// and which elements served as its operands. `left` is `None` for
/// unary operators. A recorded sequence is replayable only against the
/// program it was recorded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedOp {
    pub part: usize,
    pub op: usize,
    pub left: Option<usize>,
    pub right: usize,
}
