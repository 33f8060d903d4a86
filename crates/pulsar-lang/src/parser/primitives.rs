//! Lexical primitives shared by the expression and duration parsers.
//! Grounded on `wf-lang::parse_utils` / `wf-lang::ws_parser::primitives`.

use winnow::ascii::multispace0;
use winnow::combinator::{alt, cut_err, opt};
use winnow::error::{ContextError, ErrMode, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{literal, take_while};

pub type PResult<T> = ModalResult<T>;

/// `[A-Za-z_][A-Za-z0-9_:]*` — identifiers may contain a colon to support
/// namespaced keys such as `input:temperature` / `output:alert` (spec §4.C).
pub fn ident<'a>(input: &mut &'a str) -> PResult<&'a str> {
    if !input.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        return Err(ErrMode::Backtrack(ContextError::new()));
    }
    take_while(1.., |c: char| {
        c.is_ascii_alphanumeric() || c == '_' || c == ':'
    })
    .parse_next(input)
}

pub fn quoted_string(input: &mut &str) -> PResult<String> {
    literal("\"").parse_next(input)?;
    let content = take_while(0.., |c: char| c != '"').parse_next(input)?;
    cut_err(literal("\""))
        .context(StrContext::Expected(StrContextValue::Description(
            "closing quote",
        )))
        .parse_next(input)?;
    Ok(content.to_string())
}

/// A duration string `<integer><unit>` with unit in `{ms, s, m, h}`,
/// normalized to milliseconds (spec §6 `<dur>`).
pub fn duration_ms(input: &mut &str) -> PResult<u64> {
    let digits = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    let num: u64 = digits
        .parse()
        .map_err(|_| ErrMode::Cut(ContextError::new()))?;

    let suffix = alt((
        literal("ms").value(1u64),
        literal("s").value(1_000u64),
        literal("m").value(60_000u64),
        literal("h").value(3_600_000u64),
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "duration suffix (ms|s|m|h)",
    )))
    .parse_next(input)?;

    Ok(num.saturating_mul(suffix))
}

/// Parse a number literal: integer or float, with optional leading `-`.
pub fn number_literal(input: &mut &str) -> PResult<f64> {
    let negative = opt(literal("-")).parse_next(input)?.is_some();
    let integer_part = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    let has_dot = opt(literal(".")).parse_next(input)?.is_some();
    let mut value: f64 = if has_dot {
        let frac_part = take_while(1.., |c: char| c.is_ascii_digit())
            .context(StrContext::Expected(StrContextValue::Description(
                "digits after decimal point",
            )))
            .parse_next(input)?;
        format!("{integer_part}.{frac_part}")
            .parse()
            .map_err(|_| ErrMode::Cut(ContextError::new()))?
    } else {
        integer_part
            .parse()
            .map_err(|_| ErrMode::Cut(ContextError::new()))?
    };
    if negative {
        value = -value;
    }
    Ok(value)
}

pub fn ws0(input: &mut &str) -> PResult<()> {
    multispace0.void().parse_next(input)
}
