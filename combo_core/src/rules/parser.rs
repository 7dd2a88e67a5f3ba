//! # Rule Parser
//!
//! Parses `NAME = EXPRESSION` rule text with nom. Precedence, loosest first:
//!
//! ```text
//! expr   := zip ('|' zip)*
//! zip    := sum ('&' sum)*
//! sum    := term (('+' | '-') term)*
//! term   := unary (('*' | '/') unary)*
//! unary  := '-' unary | atom
//! atom   := '(' expr ')' | IDENT '$'? | NUMBER
//! ```
//!
//! Purely numeric sub-expressions are folded into a [`FactorExpr`] while
//! parsing, so `1.35*g` becomes `Scale(g, 1.35)` rather than a product of
//! two operands.

use nom::{
    branch::alt,
    bytes::complete::take_while,
    character::complete::{char, digit0, digit1, multispace0, one_of, satisfy},
    combinator::{all_consuming, consumed, cut, map, map_res, opt, recognize},
    error::{context, ErrorKind, VerboseError, VerboseErrorKind},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated, tuple},
    Finish, IResult, Offset,
};

use super::ast::{Expr, FactorExpr, Rule};
use crate::errors::{ComboError, ComboResult};

type ParseResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// Intermediate parse value: numeric operands stay foldable until they meet
/// a symbolic one.
#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Numeric(FactorExpr),
    Symbolic(Expr),
}

impl Operand {
    fn into_expr(self) -> Expr {
        match self {
            Operand::Numeric(factor) => Expr::Const(factor),
            Operand::Symbolic(expr) => expr,
        }
    }

    fn neg(self) -> Operand {
        match self {
            Operand::Numeric(factor) => Operand::Numeric(FactorExpr::Neg(Box::new(factor))),
            Operand::Symbolic(expr) => Operand::Symbolic(Expr::neg(expr)),
        }
    }

    fn add(self, rhs: Operand) -> Operand {
        match (self, rhs) {
            (Operand::Numeric(a), Operand::Numeric(b)) => {
                Operand::Numeric(FactorExpr::Add(Box::new(a), Box::new(b)))
            }
            (lhs, rhs) => Operand::Symbolic(Expr::sum(lhs.into_expr(), rhs.into_expr())),
        }
    }

    fn sub(self, rhs: Operand) -> Operand {
        match (self, rhs) {
            (Operand::Numeric(a), Operand::Numeric(b)) => {
                Operand::Numeric(FactorExpr::Sub(Box::new(a), Box::new(b)))
            }
            (lhs, rhs) => Operand::Symbolic(Expr::sum(lhs.into_expr(), Expr::neg(rhs.into_expr()))),
        }
    }

    fn mul(self, rhs: Operand) -> Operand {
        match (self, rhs) {
            (Operand::Numeric(a), Operand::Numeric(b)) => {
                Operand::Numeric(FactorExpr::Mul(Box::new(a), Box::new(b)))
            }
            (Operand::Numeric(factor), Operand::Symbolic(expr))
            | (Operand::Symbolic(expr), Operand::Numeric(factor)) => {
                Operand::Symbolic(Expr::scale(expr, factor))
            }
            (Operand::Symbolic(a), Operand::Symbolic(b)) => Operand::Symbolic(Expr::product(a, b)),
        }
    }

    /// `None` when the divisor is not numeric.
    fn div(self, rhs: Operand) -> Option<Operand> {
        let Operand::Numeric(divisor) = rhs else {
            return None;
        };
        Some(match self {
            Operand::Numeric(a) => Operand::Numeric(FactorExpr::Div(Box::new(a), Box::new(divisor))),
            Operand::Symbolic(expr) => {
                let reciprocal = FactorExpr::Div(Box::new(FactorExpr::Number(1.0)), Box::new(divisor));
                Operand::Symbolic(Expr::scale(expr, reciprocal))
            }
        })
    }

    fn zip(self, rhs: Operand) -> Operand {
        Operand::Symbolic(Expr::zip(self.into_expr(), rhs.into_expr()))
    }

    fn union(self, rhs: Operand) -> Operand {
        Operand::Symbolic(Expr::union(self.into_expr(), rhs.into_expr()))
    }
}

// ============================================================================
// Lexer
// ============================================================================

fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> ParseResult<'a, O>
where
    F: FnMut(&'a str) -> ParseResult<'a, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn identifier(input: &str) -> ParseResult<'_, &str> {
    recognize(pair(
        satisfy(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '\'')),
    ))(input)
}

fn number(input: &str) -> ParseResult<'_, f64> {
    map_res(
        recognize(pair(
            alt((
                recognize(pair(digit1, opt(pair(char('.'), digit0)))),
                recognize(pair(char('.'), digit1)),
            )),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        )),
        |text: &str| text.parse::<f64>(),
    )(input)
}

fn failure<'a>(input: &'a str, expected: &'static str) -> nom::Err<VerboseError<&'a str>> {
    nom::Err::Failure(VerboseError {
        errors: vec![(input, VerboseErrorKind::Context(expected))],
    })
}

// ============================================================================
// Expressions
// ============================================================================

fn expr(input: &str) -> ParseResult<'_, Operand> {
    let (input, first) = zip(input)?;
    let (input, rest) = many0(preceded(ws(char('|')), zip))(input)?;
    Ok((input, rest.into_iter().fold(first, Operand::union)))
}

fn zip(input: &str) -> ParseResult<'_, Operand> {
    let (input, first) = sum(input)?;
    let (input, rest) = many0(preceded(ws(char('&')), sum))(input)?;
    Ok((input, rest.into_iter().fold(first, Operand::zip)))
}

fn sum(input: &str) -> ParseResult<'_, Operand> {
    let (input, first) = term(input)?;
    let (input, rest) = many0(pair(ws(one_of("+-")), term))(input)?;
    let folded = rest.into_iter().fold(first, |acc, (op, rhs)| match op {
        '+' => acc.add(rhs),
        _ => acc.sub(rhs),
    });
    Ok((input, folded))
}

fn term(input: &str) -> ParseResult<'_, Operand> {
    let (input, first) = unary(input)?;
    let (input, rest) = many0(pair(ws(one_of("*/")), consumed(unary)))(input)?;

    let mut acc = first;
    for (op, (divisor_text, rhs)) in rest {
        acc = match op {
            '*' => acc.mul(rhs),
            _ => acc
                .div(rhs)
                .ok_or_else(|| failure(divisor_text, "a numeric divisor"))?,
        };
    }
    Ok((input, acc))
}

fn unary(input: &str) -> ParseResult<'_, Operand> {
    alt((map(preceded(ws(char('-')), unary), Operand::neg), atom))(input)
}

fn atom(input: &str) -> ParseResult<'_, Operand> {
    context(
        "operand",
        delimited(
            multispace0,
            alt((
                preceded(char('('), cut(terminated(expr, char(')')))),
                map(pair(identifier, opt(char('$'))), |(name, wildcard)| match wildcard {
                    Some(_) => Operand::Symbolic(Expr::wildcard(name)),
                    None => Operand::Symbolic(Expr::leaf(name)),
                }),
                map(number, |value| Operand::Numeric(FactorExpr::Number(value))),
            )),
            multispace0,
        ),
    )(input)
}

// ============================================================================
// Error reporting
// ============================================================================

/// Turn a nom error into a one-line reason; columns count from the start of
/// `source`, of which the error input is a subslice.
fn describe(source: &str, error: &VerboseError<&str>) -> String {
    let Some((remaining, kind)) = error.errors.first() else {
        return "invalid expression".to_string();
    };
    let remaining = remaining.trim_start();
    let column = source.offset(remaining) + 1;
    let next = remaining.chars().next();
    let found = match next {
        Some(c) => format!("'{}'", c),
        None => "end of expression".to_string(),
    };

    // When every branch of an `alt` failed, the innermost entry is just the
    // last branch tried; the enclosing context says more.
    let exhausted = error
        .errors
        .iter()
        .any(|(_, kind)| matches!(kind, VerboseErrorKind::Nom(ErrorKind::Alt)));
    let enclosing_context = || {
        error
            .errors
            .iter()
            .find_map(|(_, kind)| match kind {
                VerboseErrorKind::Context(expected) => Some(*expected),
                _ => None,
            })
            .unwrap_or("an operand")
    };

    match kind {
        VerboseErrorKind::Nom(ErrorKind::Eof) => match next {
            Some(')') => format!("unbalanced ')' at column {}", column),
            Some(op) if "+-*/&|".contains(op) => {
                format!("operator '{}' at column {} is missing its right operand", op, column)
            }
            _ => format!("unexpected {} at column {}", found, column),
        },
        VerboseErrorKind::Char(c) if !exhausted => {
            format!("unexpected {} at column {}, expected '{}'", found, column, c)
        }
        VerboseErrorKind::Context(expected) => {
            format!("unexpected {} at column {}, expected {}", found, column, expected)
        }
        _ => format!("unexpected {} at column {}, expected {}", found, column, enclosing_context()),
    }
}

fn parse_operand(source: &str, input: &str) -> Result<Operand, String> {
    all_consuming(expr)(input)
        .finish()
        .map(|(_, operand)| operand)
        .map_err(|error| describe(source, &error))
}

// ============================================================================
// Public API
// ============================================================================

/// Whether a rule line carries no rule (blank or `#` comment)
pub fn is_ignored_line(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with('#')
}

/// Parse the right-hand side of a rule.
///
/// The error string names the offending column.
pub fn parse_expression(text: &str) -> Result<Expr, String> {
    parse_operand(text, text).map(Operand::into_expr)
}

/// Parse a purely numeric expression such as `1.5*2/0.3+3+4`.
pub fn parse_factor(text: &str) -> ComboResult<FactorExpr> {
    match parse_operand(text, text).map_err(|reason| ComboError::parse(text, reason))? {
        Operand::Numeric(factor) => Ok(factor),
        Operand::Symbolic(_) => Err(ComboError::parse(text, "expected a purely numeric expression")),
    }
}

/// Parse one `NAME = EXPRESSION` rule.
///
/// # Example
/// ```
/// use combo_core::rules::{parse_rule, Expr};
///
/// let rule = parse_rule("ULS = 1.35*g + 1.5*w").unwrap();
/// assert_eq!(rule.name, "ULS");
/// assert!(matches!(rule.expr, Expr::Sum(..)));
///
/// assert!(parse_rule("ULS = (g + w").is_err());
/// ```
pub fn parse_rule(text: &str) -> ComboResult<Rule> {
    let Some((lhs, rhs)) = text.split_once('=') else {
        return Err(ComboError::parse(text, "expected 'NAME = EXPRESSION'"));
    };

    let name = lhs.trim();
    if name.is_empty() {
        return Err(ComboError::parse(text, "rule name is empty"));
    }
    if all_consuming(identifier)(name).finish().is_err() {
        return Err(ComboError::parse(text, format!("invalid rule name '{}'", name)));
    }

    let operand = parse_operand(text, rhs).map_err(|reason| ComboError::parse(text, reason))?;

    Ok(Rule {
        name: name.to_string(),
        source: text.trim().to_string(),
        expr: operand.into_expr(),
    })
}

/// Parse every rule line, skipping blanks and `#` comments.
///
/// Stops at the first malformed rule.
pub fn parse_rules<I>(lines: I) -> ComboResult<Vec<Rule>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    lines
        .into_iter()
        .filter(|line| !is_ignored_line(line.as_ref()))
        .map(|line| parse_rule(line.as_ref()))
        .collect()
}
