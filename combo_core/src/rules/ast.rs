//! # Rule Syntax Tree
//!
//! A parsed rule is a name plus an [`Expr`]. The operator set is closed, so
//! every consumer matches it exhaustively.
//!
//! | Syntax      | Node                 | Meaning                                   |
//! |-------------|----------------------|-------------------------------------------|
//! | `g`         | [`Expr::Leaf`]       | Rule reference, or atomic base load case  |
//! | `w$`        | [`Expr::WildcardRef`]| Union of all other rules named `w...`     |
//! | `1.35*g`    | [`Expr::Scale`]      | Multiply by a folded numeric factor       |
//! | `-g`        | [`Expr::Neg`]        | Multiply by -1                            |
//! | `a + b`     | [`Expr::Sum`]        | Cartesian product, terms merged           |
//! | `(1|0)*g`   | [`Expr::Product`]    | Cartesian product of factor/load pairs    |
//! | `a & b`     | [`Expr::Zip`]        | Positional pairing, terms merged          |
//! | `a | b`     | [`Expr::Union`]      | Concatenation of alternatives             |

use std::fmt;

/// Constant arithmetic used as a multiplier, folded by
/// [`evaluate`](super::factor::evaluate) into a single coefficient.
#[derive(Debug, Clone, PartialEq)]
pub enum FactorExpr {
    Number(f64),
    Neg(Box<FactorExpr>),
    Add(Box<FactorExpr>, Box<FactorExpr>),
    Sub(Box<FactorExpr>, Box<FactorExpr>),
    Mul(Box<FactorExpr>, Box<FactorExpr>),
    Div(Box<FactorExpr>, Box<FactorExpr>),
}

impl FactorExpr {
    fn precedence(&self) -> u8 {
        match self {
            FactorExpr::Add(..) | FactorExpr::Sub(..) => 1,
            FactorExpr::Mul(..) | FactorExpr::Div(..) => 2,
            FactorExpr::Neg(_) => 3,
            FactorExpr::Number(_) => 4,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

impl fmt::Display for FactorExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (lhs, op, rhs) = match self {
            FactorExpr::Number(value) => return write!(f, "{}", value),
            FactorExpr::Neg(inner) => {
                write!(f, "-")?;
                return inner.fmt_operand(f, 3);
            }
            FactorExpr::Add(lhs, rhs) => (lhs, "+", rhs),
            FactorExpr::Sub(lhs, rhs) => (lhs, "-", rhs),
            FactorExpr::Mul(lhs, rhs) => (lhs, "*", rhs),
            FactorExpr::Div(lhs, rhs) => (lhs, "/", rhs),
        };
        let precedence = self.precedence();
        lhs.fmt_operand(f, precedence)?;
        write!(f, "{}", op)?;
        // Right operands of equal precedence need parentheses: a-(b-c)
        rhs.fmt_operand(f, precedence + 1)
    }
}

/// Expression node of a combination rule
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Named reference: another rule, or an atomic base load case
    Leaf(String),
    /// `prefix$`: every other declared rule whose name extends `prefix`
    WildcardRef(String),
    /// A bare number used as an operand of `|`, `&` or a product
    Const(FactorExpr),
    /// Multiply every alternative by a numeric factor
    Scale(Box<Expr>, FactorExpr),
    /// Multiply every alternative by -1
    Neg(Box<Expr>),
    /// Cartesian product with term-wise merge
    Sum(Box<Expr>, Box<Expr>),
    /// Cartesian product with pairwise multiplication (one side numeric)
    Product(Box<Expr>, Box<Expr>),
    /// Positional pairing with term-wise merge
    Zip(Box<Expr>, Box<Expr>),
    /// Concatenation of alternatives
    Union(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn leaf(name: impl Into<String>) -> Self {
        Expr::Leaf(name.into())
    }

    pub fn wildcard(prefix: impl Into<String>) -> Self {
        Expr::WildcardRef(prefix.into())
    }

    pub fn scale(inner: Expr, factor: FactorExpr) -> Self {
        Expr::Scale(Box::new(inner), factor)
    }

    pub fn neg(inner: Expr) -> Self {
        Expr::Neg(Box::new(inner))
    }

    pub fn sum(lhs: Expr, rhs: Expr) -> Self {
        Expr::Sum(Box::new(lhs), Box::new(rhs))
    }

    pub fn product(lhs: Expr, rhs: Expr) -> Self {
        Expr::Product(Box::new(lhs), Box::new(rhs))
    }

    pub fn zip(lhs: Expr, rhs: Expr) -> Self {
        Expr::Zip(Box::new(lhs), Box::new(rhs))
    }

    pub fn union(lhs: Expr, rhs: Expr) -> Self {
        Expr::Union(Box::new(lhs), Box::new(rhs))
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Union(..) => 1,
            Expr::Zip(..) => 2,
            Expr::Sum(..) => 3,
            Expr::Product(..) | Expr::Scale(..) => 4,
            Expr::Neg(_) => 5,
            Expr::Leaf(_) | Expr::WildcardRef(_) | Expr::Const(_) => 6,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Leaf(name) => write!(f, "{}", name),
            Expr::WildcardRef(prefix) => write!(f, "{}$", prefix),
            Expr::Const(factor) => factor.fmt_operand(f, 4),
            Expr::Scale(inner, factor) => {
                factor.fmt_operand(f, 2)?;
                write!(f, "*")?;
                inner.fmt_operand(f, 5)
            }
            Expr::Neg(inner) => {
                write!(f, "-")?;
                inner.fmt_operand(f, 5)
            }
            Expr::Sum(lhs, rhs) => {
                lhs.fmt_operand(f, 3)?;
                write!(f, " + ")?;
                rhs.fmt_operand(f, 4)
            }
            Expr::Product(lhs, rhs) => {
                lhs.fmt_operand(f, 4)?;
                write!(f, "*")?;
                rhs.fmt_operand(f, 5)
            }
            Expr::Zip(lhs, rhs) => {
                lhs.fmt_operand(f, 2)?;
                write!(f, " & ")?;
                rhs.fmt_operand(f, 3)
            }
            Expr::Union(lhs, rhs) => {
                lhs.fmt_operand(f, 1)?;
                write!(f, " | ")?;
                rhs.fmt_operand(f, 2)
            }
        }
    }
}

/// A parsed `NAME = EXPRESSION` rule
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// Trimmed left-hand side
    pub name: String,
    /// Original rule text, kept for error reports
    pub source: String,
    /// Parsed right-hand side
    pub expr: Expr,
}
