//! Machine-word rational coefficients.
//!
//! Coefficients are `Rational64` (reduced, positive denominator). The only
//! failure mode is a zero denominator, surfaced as
//! [`EngineError::DividedByZero`]; checked entry points below are the only
//! places a denominator can reach zero.

use deriv_ast::{Context, Expr, ExprId};
use num_integer::Integer as _;
use num_rational::Rational64;
use num_traits::Zero;

use crate::error::{EngineError, EngineResult};

/// Reduced fraction `num/den`; `den == 0` is the division error.
pub fn ratio(num: i64, den: i64) -> EngineResult<Rational64> {
    if den == 0 {
        return Err(EngineError::DividedByZero);
    }
    Ok(Rational64::new(num, den))
}

/// Checked division of two coefficients.
pub fn div(a: Rational64, b: Rational64) -> EngineResult<Rational64> {
    if b.is_zero() {
        return Err(EngineError::DividedByZero);
    }
    Ok(a / b)
}

/// Convert a coefficient back into tree form: `n` or `n/d`.
pub fn to_expr(ctx: &mut Context, value: Rational64) -> ExprId {
    let num = *value.numer();
    let den = *value.denom();
    if den == 1 {
        ctx.num(num)
    } else {
        let n = ctx.num(num);
        let d = ctx.num(den);
        ctx.add(Expr::Div(n, d))
    }
}

/// Greatest common divisor over a coefficient list:
/// `gcd(|numerators|) / lcm(denominators)`.
///
/// Returns zero when every coefficient is zero; callers treat that as the
/// division error.
pub fn gcd_all(coeffs: &[Rational64]) -> Rational64 {
    let Some(first) = coeffs.first() else {
        return Rational64::zero();
    };
    let mut num = *first.numer();
    let mut den = *first.denom();
    for c in coeffs {
        num = num.gcd(c.numer());
        den = den.lcm(c.denom());
    }
    if den == 0 {
        return Rational64::zero();
    }
    Rational64::new(num.abs(), den.abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::One;

    #[test]
    fn test_ratio_reduces() {
        assert_eq!(ratio(2, 4).unwrap(), Rational64::new(1, 2));
        assert_eq!(ratio(-2, -4).unwrap(), Rational64::new(1, 2));
    }

    #[test]
    fn test_ratio_normalizes_sign() {
        let r = ratio(1, -2).unwrap();
        assert_eq!(*r.denom(), 2);
        assert_eq!(*r.numer(), -1);
    }

    #[test]
    fn test_zero_denominator_is_an_error() {
        assert_eq!(ratio(1, 0), Err(EngineError::DividedByZero));
        let one = Rational64::one();
        assert_eq!(div(one, Rational64::zero()), Err(EngineError::DividedByZero));
    }

    #[test]
    fn test_to_expr_integer_and_fraction() {
        let mut ctx = Context::new();
        let five = to_expr(&mut ctx, Rational64::new(5, 1));
        assert_eq!(ctx.get(five), &Expr::Integer(5));
        let half = to_expr(&mut ctx, Rational64::new(1, 2));
        assert!(matches!(ctx.get(half), Expr::Div(..)));
    }

    #[test]
    fn test_gcd_all() {
        let coeffs = [Rational64::new(6, 1), Rational64::new(9, 2)];
        assert_eq!(gcd_all(&coeffs), Rational64::new(3, 2));
        let with_zero = [Rational64::new(4, 1), Rational64::zero()];
        assert_eq!(gcd_all(&with_zero), Rational64::new(4, 1));
        let all_zero = [Rational64::zero(), Rational64::zero()];
        assert!(gcd_all(&all_zero).is_zero());
    }

    #[test]
    fn test_gcd_all_negative_numerators() {
        let coeffs = [Rational64::new(-3, 1)];
        assert_eq!(gcd_all(&coeffs), Rational64::new(3, 1));
    }
}
