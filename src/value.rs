//! Run-time values
//!
//! Expressions are dynamically typed: every operand carries one of four
//! run-time kinds and operators check their operand kinds when applied,
//! not when compiled. `Value` is the working type inside the evaluator;
//! `FieldValue` is the transfer type a row hands back through
//! [`RowAccessor`](crate::row::RowAccessor); `NumberFormat` controls
//! Number → Text conversion.

/// A dynamically typed expression value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Boolean(bool),
    /// A value of a column kind the engine cannot compute with. Carries
    /// an optional display string; `None` renders as the empty string.
    Opaque(Option<String>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Number(0.0)
    }
}

impl Value {
    /// Kind name used in operator error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Boolean(_) => "boolean",
            Value::Opaque(_) => "opaque",
        }
    }

    /// Render the value as label text. Numbers go through the
    /// configured format; booleans render lowercase.
    pub fn to_display(&self, format: &NumberFormat) -> String {
        match self {
            Value::Number(n) => format.format(*n),
            Value::Text(t) => t.clone(),
            Value::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            Value::Opaque(s) => s.clone().unwrap_or_default(),
        }
    }
}

/// A raw attribute value as handed back by a row.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Number(f64),
    Text(String),
    Boolean(bool),
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Number(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Number(v as f64)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Boolean(v)
    }
}

/// Numeric display format applied on every Number → Text conversion.
///
/// Accepts a .NET-flavoured subset of format strings, since that is
/// what label definitions in the wild carry:
///
/// - `g` / `G` (or empty): general format, shortest representation
/// - `f<n>` / `n<n>`: fixed-point with `n` decimals (default 2)
/// - `e<n>` / `E<n>`: scientific with `n` decimals (default 6)
/// - picture strings of `0`/`#`: reduced to the decimal count after `.`
///
/// Anything unrecognized falls back to the general format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberFormat {
    spec: FormatSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormatSpec {
    General,
    Fixed(usize),
    Scientific(usize),
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            spec: FormatSpec::General,
        }
    }
}

impl NumberFormat {
    /// Parse a format string. Never fails: unrecognized input means the
    /// general format.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        let spec = match s.chars().next() {
            None | Some('g') | Some('G') => FormatSpec::General,
            Some('f') | Some('F') | Some('n') | Some('N') => {
                FormatSpec::Fixed(parse_digits(&s[1..]).unwrap_or(2))
            }
            Some('e') | Some('E') => FormatSpec::Scientific(parse_digits(&s[1..]).unwrap_or(6)),
            Some('0') | Some('#') if s.chars().all(|c| matches!(c, '0' | '#' | '.' | ',')) => {
                match s.split_once('.') {
                    Some((_, frac)) => FormatSpec::Fixed(frac.len()),
                    None => FormatSpec::Fixed(0),
                }
            }
            _ => FormatSpec::General,
        };
        Self { spec }
    }

    pub fn format(&self, v: f64) -> String {
        match self.spec {
            FormatSpec::General => format!("{}", v),
            FormatSpec::Fixed(n) => format!("{:.*}", n, v),
            FormatSpec::Scientific(n) => format!("{:.*e}", n, v),
        }
    }
}

fn parse_digits(s: &str) -> Option<usize> {
    if s.is_empty() {
        return None;
    }
    s.parse().ok()
}
