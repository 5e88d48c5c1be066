//! Literal/field extractor
//!
//! Pre-pass over the raw expression text that pulls `[field]`
//! references and quoted string literals out into a literal table,
//! leaving short `{f<k>}` / `{s<k>}` placeholders behind. Later stages
//! then never have to worry about nested quoting or operator-like
//! characters inside field names.
//!
//! Ordering matters: field brackets are extracted before quotes so that
//! field names are never mistaken for string content, and the residue
//! checks run last so that bracket characters inside quoted text never
//! trip them. Both double- and single-quoted literals are accepted in
//! one left-to-right scan (`""` / `''` escape the quote itself, and a
//! quote of the other kind is plain content).

use crate::error::CompileError;

/// One entry of the shared literal table. Field references and string
/// literals land in the same table, in extraction order; the
/// placeholder index is the table index.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedLiteral {
    /// Bracket contents of a field reference, without the brackets.
    Field(String),
    /// String literal contents, quote escapes resolved.
    Text(String),
}

/// Result of the extraction pre-pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// The expression text with placeholders substituted.
    pub text: String,
    pub literals: Vec<ExtractedLiteral>,
}

/// Run the extraction pre-pass over raw expression text.
pub fn extract(raw: &str) -> Result<Extraction, CompileError> {
    // Braces delimit placeholders from here on, so the raw text may not
    // contain them.
    if let Some(c) = raw.chars().find(|&c| c == '{' || c == '}') {
        return Err(CompileError::ReservedCharacter(c));
    }

    let mut literals = Vec::new();
    let text = extract_fields(raw, &mut literals)?;
    let text = extract_strings(&text, &mut literals)?;

    // Anything quote- or bracket-like still in the text at this point
    // was not part of a well-formed literal.
    if text.contains('"') || text.contains('\'') {
        return Err(CompileError::UnpairedQuote);
    }
    if text.contains('[') || text.contains(']') {
        return Err(CompileError::UnpairedBracket);
    }

    Ok(Extraction { text, literals })
}

/// Replace every well-formed `[token]` with a `{f<k>}` placeholder.
/// Tokens are alphanumeric/underscore runs; a malformed reference is
/// left in place for the residue check to report.
fn extract_fields(
    input: &str,
    literals: &mut Vec<ExtractedLiteral>,
) -> Result<String, CompileError> {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '[' {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        match chars[i + 1..].iter().position(|&c| c == ']') {
            Some(0) => return Err(CompileError::EmptyField),
            Some(rel) => {
                let token: String = chars[i + 1..i + 1 + rel].iter().collect();
                if token.chars().all(|c| c.is_alphanumeric() || c == '_') {
                    out.push_str(&format!("{{f{}}}", literals.len()));
                    literals.push(ExtractedLiteral::Field(token));
                    i += rel + 2;
                } else {
                    out.push('[');
                    i += 1;
                }
            }
            None => {
                out.push('[');
                i += 1;
            }
        }
    }

    Ok(out)
}

/// Replace every quote-delimited literal with a `{s<k>}` placeholder.
/// A doubled quote inside the literal escapes itself; the other quote
/// kind is ordinary content.
fn extract_strings(
    input: &str,
    literals: &mut Vec<ExtractedLiteral>,
) -> Result<String, CompileError> {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '"' && chars[i] != '\'' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let quote = chars[i];

        let mut content = String::new();
        let mut j = i + 1;
        let mut closed = false;
        while j < chars.len() {
            if chars[j] == quote {
                if j + 1 < chars.len() && chars[j + 1] == quote {
                    content.push(quote);
                    j += 2;
                } else {
                    closed = true;
                    j += 1;
                    break;
                }
            } else {
                content.push(chars[j]);
                j += 1;
            }
        }
        if !closed {
            return Err(CompileError::UnpairedQuote);
        }

        out.push_str(&format!("{{s{}}}", literals.len()));
        literals.push(ExtractedLiteral::Text(content));
        i = j;
    }

    Ok(out)
}
