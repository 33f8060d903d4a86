//! Recursive-descent parser for the expression grammar (spec §3/§4.C):
//! numeric literals, sensor identifiers, `{+,-,*,/}`, the comparison
//! operators, and whitelisted function calls. Built on `winnow`, the way
//! `wf-lang::ws_parser` parses its own small grammars.

use orion_error::prelude::*;
use winnow::combinator::{alt, cut_err, delimited, opt, separated};
use winnow::error::{ContextError, ErrMode, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::literal;

use crate::ast::{ArithOp, CmpOp, Expr};
use crate::error::{LangError, LangReason};

use super::primitives::{PResult, ident, number_literal, ws0};

/// Parse a complete expression string, erroring if trailing input remains.
pub fn parse_expression(input: &str) -> Result<Expr, LangError> {
    let mut s = input;
    let expr = comparison
        .parse_next(&mut s)
        .map_err(|e: ErrMode<ContextError>| {
            StructError::from(LangReason::ExpressionSyntax).with_detail(format!("{e}"))
        })?;
    ws0.parse_next(&mut s).ok();
    if !s.is_empty() {
        return Err(StructError::from(LangReason::ExpressionSyntax).with_detail(format!(
            "unexpected trailing input: {s:?}"
        )));
    }
    Ok(expr)
}

fn comparison(input: &mut &str) -> PResult<Expr> {
    ws0.parse_next(input)?;
    let left = arith.parse_next(input)?;
    ws0.parse_next(input)?;
    let op = opt(alt((
        literal("=="),
        literal("!="),
        literal(">="),
        literal("<="),
        literal(">"),
        literal("<"),
    )))
    .parse_next(input)?;
    match op {
        None => Ok(left),
        Some(tok) => {
            let op = CmpOp::from_token(tok).expect("token matched by literal alt above");
            ws0.parse_next(input)?;
            let right = cut_err(arith)
                .context(StrContext::Expected(StrContextValue::Description(
                    "right-hand side of comparison",
                )))
                .parse_next(input)?;
            Ok(Expr::Cmp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            })
        }
    }
}

fn arith(input: &mut &str) -> PResult<Expr> {
    let mut left = term.parse_next(input)?;
    loop {
        ws0.parse_next(input)?;
        let op = opt(alt((literal("+"), literal("-")))).parse_next(input)?;
        let Some(tok) = op else { break };
        ws0.parse_next(input)?;
        let right = cut_err(term)
            .context(StrContext::Expected(StrContextValue::Description(
                "right-hand side of arithmetic operator",
            )))
            .parse_next(input)?;
        let op = if tok == "+" { ArithOp::Add } else { ArithOp::Sub };
        left = Expr::Arith {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
    }
    Ok(left)
}

fn term(input: &mut &str) -> PResult<Expr> {
    let mut left = unary.parse_next(input)?;
    loop {
        ws0.parse_next(input)?;
        let op = opt(alt((literal("*"), literal("/")))).parse_next(input)?;
        let Some(tok) = op else { break };
        ws0.parse_next(input)?;
        let right = cut_err(unary)
            .context(StrContext::Expected(StrContextValue::Description(
                "right-hand side of arithmetic operator",
            )))
            .parse_next(input)?;
        let op = if tok == "*" { ArithOp::Mul } else { ArithOp::Div };
        left = Expr::Arith {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
    }
    Ok(left)
}

fn unary(input: &mut &str) -> PResult<Expr> {
    ws0.parse_next(input)?;
    let negated = opt(literal("-")).parse_next(input)?.is_some();
    ws0.parse_next(input)?;
    let inner = primary.parse_next(input)?;
    Ok(if negated { Expr::Neg(Box::new(inner)) } else { inner })
}

fn primary(input: &mut &str) -> PResult<Expr> {
    ws0.parse_next(input)?;
    alt((paren_expr, func_or_ident, number)).parse_next(input)
}

fn paren_expr(input: &mut &str) -> PResult<Expr> {
    delimited(
        literal("("),
        comparison,
        cut_err(literal(")")).context(StrContext::Expected(StrContextValue::Description(
            "closing parenthesis",
        ))),
    )
    .parse_next(input)
}

fn number(input: &mut &str) -> PResult<Expr> {
    number_literal.map(Expr::Number).parse_next(input)
}

fn func_or_ident(input: &mut &str) -> PResult<Expr> {
    let name = ident.parse_next(input)?;
    ws0.parse_next(input)?;
    let open = opt(literal("(")).parse_next(input)?;
    match open {
        None => Ok(Expr::Ident(name.to_string())),
        Some(_) => {
            ws0.parse_next(input)?;
            let args: Vec<Expr> = separated(0.., comparison, (ws0, literal(","), ws0))
                .parse_next(input)?;
            ws0.parse_next(input)?;
            cut_err(literal(")"))
                .context(StrContext::Expected(StrContextValue::Description(
                    "closing parenthesis of function call",
                )))
                .parse_next(input)?;
            Ok(Expr::FuncCall {
                name: name.to_string(),
                args,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fahrenheit_conversion() {
        let expr = parse_expression("(input:temperature_f - 32) * 5 / 9").unwrap();
        match expr {
            Expr::Arith { op: ArithOp::Div, .. } => {}
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn parses_comparison() {
        let expr = parse_expression("input:humidity > 80").unwrap();
        assert!(matches!(expr, Expr::Cmp { op: CmpOp::Gt, .. }));
    }

    #[test]
    fn parses_function_call() {
        let expr = parse_expression("sqrt(pow(input:x, 2))").unwrap();
        match expr {
            Expr::FuncCall { name, args } => {
                assert_eq!(name, "sqrt");
                assert_eq!(args.len(), 1);
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse_expression("1 + 2 ) 3").is_err());
    }

    #[test]
    fn rejects_unknown_operator_as_syntax_error() {
        assert!(parse_expression("a ~= b").is_err());
    }
}
