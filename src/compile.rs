//! Expression compiler
//!
//! Two stages over the extractor's placeholder text:
//!
//! 1. **Bracket resolver** — repeatedly finds the innermost `( … )`
//!    group, turns it into a numbered part and replaces the span with a
//!    `{p<k>}` placeholder, yielding part sources innermost-first (the
//!    last one is the whole expression).
//! 2. **Part compiler** — scans each part source left to right with a
//!    two-state machine (expect value/unary vs. expect binary
//!    operator), producing the part's element sequence. Unary operators
//!    do not flip the state; they are followed by another value.
//!
//! A part must compile to at least one element. Missing operands are a
//! run-time concern: `"1 +"` compiles and fails at evaluation.

use crate::catalog::{FieldCatalog, FID_FIELD};
use crate::error::CompileError;
use crate::extract::{self, ExtractedLiteral};
use crate::program::{lookup_keyword, Element, Keyword, Op, Part, Program};
use crate::value::Value;

/// Compile expression text against a field catalog.
pub fn compile(text: &str, catalog: &FieldCatalog) -> Result<Program, CompileError> {
    let extraction = extract::extract(text)?;
    let sources = resolve_brackets(extraction.text)?;

    let mut parts = Vec::with_capacity(sources.len());
    for source in &sources {
        parts.push(compile_part(source, &extraction.literals, catalog)?);
    }

    Ok(Program { parts })
}

/// Peel bracket groups innermost-first. Each iteration takes the first
/// `)` and the nearest preceding `(`; that `(` is necessarily unmatched
/// because no earlier `)` exists.
fn resolve_brackets(mut text: String) -> Result<Vec<String>, CompileError> {
    let mut sources = Vec::new();

    loop {
        match text.find(')') {
            Some(close) => {
                let open = text[..close]
                    .rfind('(')
                    .ok_or(CompileError::UnmatchedParenthesis)?;
                let inner = text[open + 1..close].to_string();
                let placeholder = format!("{{p{}}}", sources.len());
                text.replace_range(open..=close, &placeholder);
                sources.push(inner);
            }
            None => {
                if text.contains('(') {
                    return Err(CompileError::UnmatchedParenthesis);
                }
                sources.push(text);
                return Ok(sources);
            }
        }
    }
}

fn compile_part(
    source: &str,
    literals: &[ExtractedLiteral],
    catalog: &FieldCatalog,
) -> Result<Part, CompileError> {
    let chars: Vec<char> = source.chars().collect();
    let mut part = Part::default();
    let mut expect_value = true;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        // The newline is a concatenation operator, so only horizontal
        // whitespace is insignificant.
        if c == ' ' || c == '\t' || c == '\r' {
            i += 1;
            continue;
        }

        if expect_value {
            match c {
                '{' => {
                    let (element, next) = parse_placeholder(&chars, i, literals, catalog)?;
                    part.elements.push(element);
                    i = next;
                    expect_value = false;
                }
                '0'..='9' | '.' => {
                    let (value, next) = parse_number(&chars, i)?;
                    part.elements.push(Element::Literal(Value::Number(value)));
                    i = next;
                    expect_value = false;
                }
                '-' => {
                    part.elements.push(Element::Operator(Op::Negate));
                    i += 1;
                }
                _ if c.is_alphabetic() || c == '_' => {
                    let (word, next) = read_word(&chars, i);
                    match lookup_keyword(&word) {
                        Some(Keyword::True) => {
                            part.elements.push(Element::Literal(Value::Boolean(true)));
                            expect_value = false;
                        }
                        Some(Keyword::False) => {
                            part.elements.push(Element::Literal(Value::Boolean(false)));
                            expect_value = false;
                        }
                        Some(Keyword::Not) => {
                            part.elements.push(Element::Operator(Op::Not));
                        }
                        _ => {
                            return Err(CompileError::OperandExpected {
                                found: token_at(&chars, i, literals),
                            })
                        }
                    }
                    i = next;
                }
                _ => {
                    return Err(CompileError::OperandExpected {
                        found: token_at(&chars, i, literals),
                    })
                }
            }
        } else {
            let op = match c {
                '\n' => {
                    i += 1;
                    Op::LineBreak
                }
                '+' => {
                    i += 1;
                    Op::Add
                }
                '-' => {
                    i += 1;
                    Op::Subtract
                }
                '*' => {
                    i += 1;
                    Op::Multiply
                }
                '/' => {
                    i += 1;
                    Op::Divide
                }
                '\\' => {
                    i += 1;
                    Op::IntDivide
                }
                '^' => {
                    i += 1;
                    Op::Power
                }
                '=' => {
                    // Both `=` and `==` test equality.
                    i += if chars.get(i + 1) == Some(&'=') { 2 } else { 1 };
                    Op::Equal
                }
                '!' => {
                    if chars.get(i + 1) == Some(&'=') {
                        i += 2;
                        Op::NotEqual
                    } else {
                        return Err(CompileError::OperatorExpected {
                            found: token_at(&chars, i, literals),
                        });
                    }
                }
                '<' => match chars.get(i + 1) {
                    Some('=') => {
                        i += 2;
                        Op::LessOrEqual
                    }
                    Some('>') => {
                        i += 2;
                        Op::NotEqual
                    }
                    _ => {
                        i += 1;
                        Op::Less
                    }
                },
                '>' => {
                    if chars.get(i + 1) == Some(&'=') {
                        i += 2;
                        Op::GreaterOrEqual
                    } else {
                        i += 1;
                        Op::Greater
                    }
                }
                _ if c.is_alphabetic() => {
                    let (word, next) = read_word(&chars, i);
                    let op = match lookup_keyword(&word) {
                        Some(Keyword::Mod) => Op::Modulo,
                        Some(Keyword::And) => Op::And,
                        Some(Keyword::Or) => Op::Or,
                        Some(Keyword::Xor) => Op::Xor,
                        _ => {
                            return Err(CompileError::OperatorExpected {
                                found: token_at(&chars, i, literals),
                            })
                        }
                    };
                    i = next;
                    op
                }
                _ => {
                    return Err(CompileError::OperatorExpected {
                        found: token_at(&chars, i, literals),
                    })
                }
            };
            part.elements.push(Element::Operator(op));
            expect_value = true;
        }
    }

    if part.is_empty() {
        return Err(CompileError::EmptyPart);
    }
    Ok(part)
}

/// Render the token at `i` the way the author wrote it, for error
/// messages. Placeholders resolve back through the literal table so
/// diagnostics never leak extractor braces the author never typed.
fn token_at(chars: &[char], i: usize, literals: &[ExtractedLiteral]) -> String {
    let c = chars[i];
    if c == '{' {
        if let Some(close_rel) = chars[i + 1..].iter().position(|&c| c == '}') {
            let body: String = chars[i + 1..i + 1 + close_rel].iter().collect();
            if let Some(Ok(index)) = body.get(1..).map(str::parse::<usize>) {
                match (body.chars().next(), literals.get(index)) {
                    (Some('f'), Some(ExtractedLiteral::Field(name))) => {
                        return format!("[{name}]");
                    }
                    (Some('s'), Some(ExtractedLiteral::Text(text))) => {
                        return format!("\"{text}\"");
                    }
                    (Some('p'), _) => return "(...)".to_string(),
                    _ => {}
                }
            }
        }
    }
    if c.is_alphabetic() || c == '_' {
        let (word, _) = read_word(chars, i);
        return format!("'{word}'");
    }
    format!("'{c}'")
}

/// Parse a `{f<k>}` / `{s<k>}` / `{p<k>}` placeholder starting at `i`
/// and resolve it against the literal table or part list.
fn parse_placeholder(
    chars: &[char],
    i: usize,
    literals: &[ExtractedLiteral],
    catalog: &FieldCatalog,
) -> Result<(Element, usize), CompileError> {
    // Placeholders are generated by the extractor and bracket resolver,
    // so a malformed one is unreachable from user input; report the
    // brace as an unexpected operand if it happens anyway.
    let malformed = CompileError::OperandExpected {
        found: "'{'".to_string(),
    };

    let tag = *chars.get(i + 1).ok_or(malformed.clone())?;
    let close_rel = chars[i + 2..]
        .iter()
        .position(|&c| c == '}')
        .ok_or(malformed.clone())?;
    let index: usize = chars[i + 2..i + 2 + close_rel]
        .iter()
        .collect::<String>()
        .parse()
        .map_err(|_| malformed.clone())?;
    let next = i + close_rel + 3;

    let element = match (tag, literals.get(index)) {
        ('f', Some(ExtractedLiteral::Field(name))) => {
            if name.eq_ignore_ascii_case(FID_FIELD) {
                Element::RowId
            } else {
                let kind = catalog
                    .lookup(name)
                    .ok_or_else(|| CompileError::UnknownField(name.clone()))?;
                Element::FieldRef {
                    name: name.clone(),
                    kind,
                }
            }
        }
        ('s', Some(ExtractedLiteral::Text(text))) => Element::Literal(Value::Text(text.clone())),
        ('p', _) => Element::PartRef(index),
        _ => return Err(malformed),
    };

    Ok((element, next))
}

/// Parse a decimal literal: digits, at most one decimal point, and an
/// optional exponent whose sign must immediately follow `e`/`E`.
fn parse_number(chars: &[char], start: usize) -> Result<(f64, usize), CompileError> {
    let mut i = start;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    if i < chars.len() && chars[i] == '.' {
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
        let mut j = i + 1;
        if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
            j += 1;
        }
        // Only consume the exponent when digits actually follow, so
        // `2e` fails as a malformed operator rather than silently
        // eating the `e`.
        if j < chars.len() && chars[j].is_ascii_digit() {
            i = j;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
        }
    }

    let text: String = chars[start..i].iter().collect();
    let value = text
        .parse::<f64>()
        .map_err(|_| CompileError::MalformedNumber(text))?;
    Ok((value, i))
}

fn read_word(chars: &[char], start: usize) -> (String, usize) {
    let mut i = start;
    while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
        i += 1;
    }
    (chars[start..i].iter().collect(), i)
}
