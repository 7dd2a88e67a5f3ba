//! Numeric factor evaluation.
//!
//! Folds the constant arithmetic of a rule (`-2*((1.5*2/0.3+3+4)*P)`) into
//! the single coefficient that multiplies the symbolic operand.

use super::ast::FactorExpr;
use crate::errors::{ComboError, ComboResult};

/// Evaluate a factor expression with standard arithmetic precedence.
///
/// Division by zero is an error, never an infinity. So is any literal or
/// intermediate value that overflows to a non-finite number.
///
/// # Example
/// ```
/// use combo_core::rules::{evaluate, parse_factor};
///
/// let factor = parse_factor("1.5*2/0.3+3+4").unwrap();
/// assert_eq!(evaluate(&factor).unwrap(), 17.0);
/// ```
pub fn evaluate(expr: &FactorExpr) -> ComboResult<f64> {
    let value = match expr {
        FactorExpr::Number(value) => *value,
        FactorExpr::Neg(inner) => -evaluate(inner)?,
        FactorExpr::Add(lhs, rhs) => evaluate(lhs)? + evaluate(rhs)?,
        FactorExpr::Sub(lhs, rhs) => evaluate(lhs)? - evaluate(rhs)?,
        FactorExpr::Mul(lhs, rhs) => evaluate(lhs)? * evaluate(rhs)?,
        FactorExpr::Div(lhs, rhs) => {
            let divisor = evaluate(rhs)?;
            if divisor == 0.0 {
                return Err(ComboError::division_by_zero(expr.to_string()));
            }
            evaluate(lhs)? / divisor
        }
    };

    if !value.is_finite() {
        return Err(ComboError::non_finite_factor(expr.to_string()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(value: f64) -> Box<FactorExpr> {
        Box::new(FactorExpr::Number(value))
    }

    #[test]
    fn test_precedence_is_structural() {
        // 2 + 3 * 4
        let expr = FactorExpr::Add(num(2.0), Box::new(FactorExpr::Mul(num(3.0), num(4.0))));
        assert_eq!(evaluate(&expr).unwrap(), 14.0);
    }

    #[test]
    fn test_negation() {
        let expr = FactorExpr::Neg(Box::new(FactorExpr::Sub(num(1.0), num(3.5))));
        assert_eq!(evaluate(&expr).unwrap(), 2.5);
    }

    #[test]
    fn test_division() {
        let expr = FactorExpr::Div(num(3.0), num(0.3));
        assert!((evaluate(&expr).unwrap() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_division_by_zero() {
        let expr = FactorExpr::Div(num(1.0), Box::new(FactorExpr::Sub(num(2.0), num(2.0))));
        let err = evaluate(&expr).unwrap_err();
        assert_eq!(err.error_code(), "DIVISION_BY_ZERO");
        assert_eq!(err, ComboError::division_by_zero("1/(2-2)"));
    }

    #[test]
    fn test_overflowing_literal() {
        let err = evaluate(&FactorExpr::Number(f64::INFINITY)).unwrap_err();
        assert_eq!(err.error_code(), "NON_FINITE_FACTOR");
    }

    #[test]
    fn test_infinity_minus_infinity() {
        let expr = crate::rules::parse_factor("(1e400-1e400)").unwrap();
        assert!(matches!(evaluate(&expr), Err(ComboError::NonFiniteFactor { .. })));
    }

    #[test]
    fn test_overflowing_product() {
        let expr = FactorExpr::Mul(num(1e300), num(1e300));
        assert_eq!(evaluate(&expr).unwrap_err().error_code(), "NON_FINITE_FACTOR");
    }
}
