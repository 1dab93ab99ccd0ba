//! Constant folding and coefficient extraction.
//!
//! Bottom-up: when both children of an operator node are integer literals,
//! `+ - *` evaluate outright (`*` by rotating the product's rational
//! coefficient to the front), `/` reduces by gcd without collapsing the
//! quotient, and `^` folds by exponent sign. Arithmetic that would overflow
//! an `i64` leaves the node untouched rather than wrapping.
//!
//! Coefficient extraction walks a multiplicative chain, folding every
//! integer factor and every fully-constant power-free subtree into one
//! running fraction and replacing it with `1`; the remainder is the
//! monomial body keyed on by the polynomial pass.

use deriv_ast::traversal::{self, ChainOp};
use deriv_ast::{fingerprint, Context, Expr, ExprId};
use num_rational::Rational64;
use num_traits::One;

use crate::error::{EngineError, EngineResult};
use crate::helpers::is_const_arith;
use crate::rational;
use crate::simplify::SimplifyState;

/// Bottom-up integer evaluation.
pub fn fold_constants(
    ctx: &mut Context,
    state: &mut SimplifyState,
    id: ExprId,
) -> EngineResult<ExprId> {
    match ctx.get(id).clone() {
        Expr::Integer(_) | Expr::Variable(_) => Ok(id),
        Expr::Function(f, args) => {
            let mut new_args = Vec::with_capacity(args.len());
            for &a in &args {
                new_args.push(fold_constants(ctx, state, a)?);
            }
            if new_args == args {
                Ok(id)
            } else {
                Ok(ctx.call(f, new_args))
            }
        }
        Expr::Add(l, r) => {
            let nl = fold_constants(ctx, state, l)?;
            let nr = fold_constants(ctx, state, r)?;
            if let (Expr::Integer(a), Expr::Integer(b)) = (ctx.get(nl), ctx.get(nr)) {
                if let Some(v) = a.checked_add(*b) {
                    return Ok(ctx.num(v));
                }
            }
            Ok(rebuild(ctx, id, Expr::Add(nl, nr), l, r, nl, nr))
        }
        Expr::Sub(l, r) => {
            let nl = fold_constants(ctx, state, l)?;
            let nr = fold_constants(ctx, state, r)?;
            if let (Expr::Integer(a), Expr::Integer(b)) = (ctx.get(nl), ctx.get(nr)) {
                if let Some(v) = a.checked_sub(*b) {
                    return Ok(ctx.num(v));
                }
            }
            Ok(rebuild(ctx, id, Expr::Sub(nl, nr), l, r, nl, nr))
        }
        Expr::Mul(l, r) => {
            let nl = fold_constants(ctx, state, l)?;
            let nr = fold_constants(ctx, state, r)?;
            let rebuilt = rebuild(ctx, id, Expr::Mul(nl, nr), l, r, nl, nr);
            if matches!(
                (ctx.get(nl), ctx.get(nr)),
                (Expr::Integer(_), Expr::Integer(_))
            ) {
                return rotate_coefficient(ctx, state, rebuilt);
            }
            Ok(rebuilt)
        }
        Expr::Div(l, r) => {
            let nl = fold_constants(ctx, state, l)?;
            let nr = fold_constants(ctx, state, r)?;
            if let (Expr::Integer(a), Expr::Integer(b)) = (ctx.get(nl), ctx.get(nr)) {
                let (a, b) = (*a, *b);
                if a != 0 && b != 0 {
                    let g = num_integer::gcd(a, b);
                    if g != 1 {
                        let qn = ctx.num(a / g);
                        let qd = ctx.num(b / g);
                        return Ok(ctx.add(Expr::Div(qn, qd)));
                    }
                }
            }
            Ok(rebuild(ctx, id, Expr::Div(nl, nr), l, r, nl, nr))
        }
        Expr::Pow(l, r) => {
            let nl = fold_constants(ctx, state, l)?;
            let nr = fold_constants(ctx, state, r)?;
            if let (Expr::Integer(b), Expr::Integer(e)) = (ctx.get(nl), ctx.get(nr)) {
                let (b, e) = (*b, *e);
                if e > 0 {
                    if let Some(v) = checked_ipow(b, e) {
                        return Ok(ctx.num(v));
                    }
                } else if e == 0 {
                    return Ok(ctx.num(1));
                } else {
                    if b == 0 {
                        return Err(EngineError::DividedByZero);
                    }
                    if let Some(v) = e.checked_neg().and_then(|p| checked_ipow(b, p)) {
                        let one = ctx.num(1);
                        let den = ctx.num(v);
                        return Ok(ctx.add(Expr::Div(one, den)));
                    }
                }
            }
            Ok(rebuild(ctx, id, Expr::Pow(nl, nr), l, r, nl, nr))
        }
    }
}

fn rebuild(
    ctx: &mut Context,
    id: ExprId,
    node: Expr,
    old_l: ExprId,
    old_r: ExprId,
    nl: ExprId,
    nr: ExprId,
) -> ExprId {
    if nl == old_l && nr == old_r {
        id
    } else {
        ctx.add(node)
    }
}

fn checked_ipow(base: i64, exp: i64) -> Option<i64> {
    u32::try_from(exp).ok().and_then(|e| base.checked_pow(e))
}

/// Move the rational coefficient of a constant product to the front.
///
/// Guarded by the extracted-fingerprint set so an already-rotated product
/// is not wrapped again on the next iteration.
pub fn rotate_coefficient(
    ctx: &mut Context,
    state: &mut SimplifyState,
    id: ExprId,
) -> EngineResult<ExprId> {
    if state.extracted.contains(&fingerprint(ctx, id)) {
        return Ok(id);
    }
    if matches!(ctx.get(id), Expr::Integer(_)) {
        return Ok(id);
    }
    let (body, coeff) = extract_coefficient(ctx, state, id)?;
    let c = rational::to_expr(ctx, coeff);
    let out = ctx.add(Expr::Mul(c, body));
    let hash = fingerprint(ctx, out);
    state.extracted.insert(hash);
    Ok(out)
}

/// Split a monomial into `(body, coefficient)`.
pub fn extract_coefficient(
    ctx: &mut Context,
    state: &mut SimplifyState,
    id: ExprId,
) -> EngineResult<(ExprId, Rational64)> {
    let mut coeff = Rational64::one();
    let body = traversal::map_leaves::<EngineError>(ctx, ChainOp::Mul, id, &mut |ctx, leaf| {
        if let Expr::Integer(v) = ctx.get(leaf) {
            let v = *v;
            if v == 1 {
                return Ok(leaf);
            }
            coeff *= Rational64::from_integer(v);
            return Ok(ctx.num(1));
        }
        if is_const_arith(ctx, leaf) {
            let folded = fold_constants(ctx, state, leaf)?;
            coeff *= extract_const(ctx, folded)?;
            return Ok(ctx.num(1));
        }
        Ok(leaf)
    })?;
    Ok((body, coeff))
}

/// Evaluate a power-free constant subtree to one fraction.
pub fn extract_const(ctx: &Context, id: ExprId) -> EngineResult<Rational64> {
    match ctx.get(id) {
        Expr::Integer(v) => Ok(Rational64::from_integer(*v)),
        Expr::Add(l, r) => Ok(extract_const(ctx, *l)? + extract_const(ctx, *r)?),
        Expr::Sub(l, r) => Ok(extract_const(ctx, *l)? - extract_const(ctx, *r)?),
        Expr::Mul(l, r) => Ok(extract_const(ctx, *l)? * extract_const(ctx, *r)?),
        Expr::Div(l, r) => {
            let a = extract_const(ctx, *l)?;
            let b = extract_const(ctx, *r)?;
            rational::div(a, b)
        }
        _ => Ok(Rational64::from_integer(0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deriv_ast::DisplayExpr;
    use deriv_parser::parse;

    fn fold(input: &str) -> String {
        let mut ctx = Context::new();
        let mut state = SimplifyState::default();
        let id = parse(input, &mut ctx).unwrap();
        let id = fold_constants(&mut ctx, &mut state, id).unwrap();
        format!("{}", DisplayExpr { context: &ctx, id })
    }

    #[test]
    fn test_add_sub_fold() {
        assert_eq!(fold("2+3"), "5");
        assert_eq!(fold("2-5"), "-3");
    }

    #[test]
    fn test_quotient_reduces_without_collapsing() {
        assert_eq!(fold("2/4"), "1/2");
        assert_eq!(fold("6/3"), "2/1");
        assert_eq!(fold("3/7"), "3/7");
    }

    #[test]
    fn test_power_folds_by_sign() {
        assert_eq!(fold("2^3"), "8");
        assert_eq!(fold("x^0"), "x^0"); // exponent unit is the 0/1 pass's job
        assert_eq!(fold("2^0"), "1");
    }

    #[test]
    fn test_negative_power_becomes_quotient() {
        let mut ctx = Context::new();
        let mut state = SimplifyState::default();
        let two = ctx.num(2);
        let m3 = ctx.num(-3);
        let p = ctx.add(Expr::Pow(two, m3));
        let id = fold_constants(&mut ctx, &mut state, p).unwrap();
        let shown = format!("{}", DisplayExpr { context: &ctx, id });
        assert_eq!(shown, "1/8");
    }

    #[test]
    fn test_zero_base_negative_exponent_errors() {
        let mut ctx = Context::new();
        let mut state = SimplifyState::default();
        let zero = ctx.num(0);
        let m1 = ctx.num(-1);
        let p = ctx.add(Expr::Pow(zero, m1));
        assert_eq!(
            fold_constants(&mut ctx, &mut state, p),
            Err(EngineError::DividedByZero)
        );
    }

    #[test]
    fn test_rotate_coefficient_once() {
        let mut ctx = Context::new();
        let mut state = SimplifyState::default();
        let two = ctx.num(2);
        let three = ctx.num(3);
        let prod = ctx.add(Expr::Mul(two, three));
        let id = rotate_coefficient(&mut ctx, &mut state, prod).unwrap();
        let leaves = traversal::leaves(&ctx, ChainOp::Mul, id);
        let values: Vec<i64> = leaves
            .iter()
            .map(|&l| match ctx.get(l) {
                Expr::Integer(v) => *v,
                _ => panic!("non-integer leaf"),
            })
            .collect();
        assert_eq!(values, vec![6, 1, 1]);
        // a second rotation of the rotated tree is a no-op
        let again = rotate_coefficient(&mut ctx, &mut state, id).unwrap();
        assert_eq!(again, id);
    }

    #[test]
    fn test_extract_coefficient() {
        let mut ctx = Context::new();
        let mut state = SimplifyState::default();
        let id = parse("2*x*3", &mut ctx).unwrap();
        let (body, coeff) = extract_coefficient(&mut ctx, &mut state, id).unwrap();
        assert_eq!(coeff, Rational64::from_integer(6));
        let shown = format!("{}", DisplayExpr { context: &ctx, id: body });
        assert_eq!(shown, "1x*1");
    }

    #[test]
    fn test_extract_const_quotient() {
        let mut ctx = Context::new();
        let id = parse("1/2+1/3", &mut ctx).unwrap();
        assert_eq!(extract_const(&ctx, id).unwrap(), Rational64::new(5, 6));
    }

    #[test]
    fn test_extract_const_division_by_zero() {
        let mut ctx = Context::new();
        let id = parse("1/(2-2)", &mut ctx).unwrap();
        assert_eq!(extract_const(&ctx, id), Err(EngineError::DividedByZero));
    }
}
