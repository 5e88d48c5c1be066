//! Fallback formatter
//!
//! When an expression failed to compile, or evaluation failed for the
//! current text, the host still needs label output. This path bypasses
//! the compiled structure entirely: a single regex pass over the
//! original text substitutes each `[field]` token with the row's value,
//! stringified. No operators are evaluated.

use crate::catalog::FID_FIELD;
use crate::row::RowAccessor;
use crate::value::{FieldValue, NumberFormat};
use regex::{Captures, Regex};
use std::sync::OnceLock;

fn field_regex() -> &'static Regex {
    static FIELD_RE: OnceLock<Regex> = OnceLock::new();
    FIELD_RE.get_or_init(|| {
        Regex::new(r"\[(?P<name>\w+)\]").expect("field token pattern is valid")
    })
}

/// Substitute `[field]` tokens in `text` with the row's raw values.
/// Unknown and null fields render as the empty string; `[fid]` renders
/// the row id.
pub fn substitute(
    text: &str,
    row: &dyn RowAccessor,
    row_id: i64,
    format: &NumberFormat,
) -> String {
    field_regex()
        .replace_all(text, |caps: &Captures<'_>| {
            let name = &caps["name"];
            if name.eq_ignore_ascii_case(FID_FIELD) {
                return row_id.to_string();
            }
            match row.get(name) {
                Some(FieldValue::Number(n)) => format.format(n),
                Some(FieldValue::Text(t)) => t,
                Some(FieldValue::Boolean(b)) => if b { "true" } else { "false" }.to_string(),
                Some(FieldValue::Null) | None => String::new(),
            }
        })
        .into_owned()
}
