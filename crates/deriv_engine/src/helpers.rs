//! Shared predicates and multiplicative-chain utilities for the rewrite
//! passes.

use deriv_ast::traversal::{self, ChainOp};
use deriv_ast::{Context, Expr, ExprId};

/// True when the subtree contains no variables and no functions.
pub fn is_const(ctx: &Context, id: ExprId) -> bool {
    match ctx.get(id) {
        Expr::Integer(_) => true,
        Expr::Variable(_) | Expr::Function(..) => false,
        Expr::Add(l, r) | Expr::Sub(l, r) | Expr::Mul(l, r) | Expr::Div(l, r)
        | Expr::Pow(l, r) => is_const(ctx, *l) && is_const(ctx, *r),
    }
}

/// Like [`is_const`] but also rejects powers, so the subtree can be folded
/// into a single fraction with `+ - * /` alone.
pub fn is_const_arith(ctx: &Context, id: ExprId) -> bool {
    match ctx.get(id) {
        Expr::Integer(_) => true,
        Expr::Variable(_) | Expr::Function(..) | Expr::Pow(..) => false,
        Expr::Add(l, r) | Expr::Sub(l, r) | Expr::Mul(l, r) | Expr::Div(l, r) => {
            is_const_arith(ctx, *l) && is_const_arith(ctx, *r)
        }
    }
}

/// Matches an integer literal of the given value.
#[inline]
pub fn is_int(ctx: &Context, id: ExprId, value: i64) -> bool {
    matches!(ctx.get(id), Expr::Integer(v) if *v == value)
}

/// If `id` is a square (`b^2`, operator or `pow` form), return the base.
pub fn as_square(ctx: &Context, id: ExprId) -> Option<ExprId> {
    match ctx.get(id) {
        Expr::Pow(b, e) if is_int(ctx, *e, 2) => Some(*b),
        Expr::Function(f, args)
            if *f == deriv_ast::BuiltinFn::Pow && args.len() == 2 && is_int(ctx, args[1], 2) =>
        {
            Some(args[0])
        }
        _ => None,
    }
}

/// Flip every negative integer leaf of the multiplicative chain to its
/// absolute value; the flag reports whether an odd number of signs flipped.
pub fn flip_negative_ints(ctx: &mut Context, id: ExprId) -> (ExprId, bool) {
    let mut odd = false;
    let out = traversal::map_leaves::<()>(ctx, ChainOp::Mul, id, &mut |ctx, leaf| {
        if let Expr::Integer(v) = ctx.get(leaf) {
            if *v < 0 {
                let v = *v;
                odd = !odd;
                return Ok(ctx.num(v.wrapping_neg()));
            }
        }
        Ok(leaf)
    });
    (out.unwrap_or(id), odd)
}

/// Flip `-1` leaves (exactly) of the multiplicative chain to `1`, with
/// parity.
pub fn flip_negative_ones(ctx: &mut Context, id: ExprId) -> (ExprId, bool) {
    let mut odd = false;
    let out = traversal::map_leaves::<()>(ctx, ChainOp::Mul, id, &mut |ctx, leaf| {
        if is_int(ctx, leaf, -1) {
            odd = !odd;
            return Ok(ctx.num(1));
        }
        Ok(leaf)
    });
    (out.unwrap_or(id), odd)
}

/// Balanced product over a non-empty factor list.
pub fn product_of(ctx: &mut Context, factors: &[ExprId]) -> ExprId {
    debug_assert!(!factors.is_empty());
    if factors.len() == 1 {
        return factors[0];
    }
    let mid = factors.len() / 2;
    let l = product_of(ctx, &factors[..mid]);
    let r = product_of(ctx, &factors[mid..]);
    ctx.add(Expr::Mul(l, r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use deriv_ast::BuiltinFn;

    #[test]
    fn test_is_const() {
        let mut ctx = Context::new();
        let two = ctx.num(2);
        let three = ctx.num(3);
        let x = ctx.var("x");
        let c = ctx.add(Expr::Div(two, three));
        assert!(is_const(&ctx, c));
        let v = ctx.add(Expr::Mul(two, x));
        assert!(!is_const(&ctx, v));
        let sin = ctx.call(BuiltinFn::Sin, vec![two]);
        assert!(!is_const(&ctx, sin));
    }

    #[test]
    fn test_is_const_arith_rejects_pow() {
        let mut ctx = Context::new();
        let two = ctx.num(2);
        let three = ctx.num(3);
        let p = ctx.add(Expr::Pow(two, three));
        assert!(is_const(&ctx, p));
        assert!(!is_const_arith(&ctx, p));
    }

    #[test]
    fn test_as_square() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let two = ctx.num(2);
        let sq = ctx.add(Expr::Pow(x, two));
        assert_eq!(as_square(&ctx, sq), Some(x));
        let three = ctx.num(3);
        let cube = ctx.add(Expr::Pow(x, three));
        assert_eq!(as_square(&ctx, cube), None);
    }

    #[test]
    fn test_flip_negative_ints_parity() {
        let mut ctx = Context::new();
        let m2 = ctx.num(-2);
        let x = ctx.var("x");
        let m3 = ctx.num(-3);
        let inner = ctx.add(Expr::Mul(x, m3));
        let chain = ctx.add(Expr::Mul(m2, inner));
        let (out, odd) = flip_negative_ints(&mut ctx, chain);
        assert!(!odd);
        let leaves = traversal::leaves(&ctx, ChainOp::Mul, out);
        assert!(leaves.iter().all(|&l| !matches!(ctx.get(l), Expr::Integer(v) if *v < 0)));
    }

    #[test]
    fn test_flip_negative_ones_ignores_other_negatives() {
        let mut ctx = Context::new();
        let m2 = ctx.num(-2);
        let m1 = ctx.num(-1);
        let chain = ctx.add(Expr::Mul(m2, m1));
        let (out, odd) = flip_negative_ones(&mut ctx, chain);
        assert!(odd);
        let leaves = traversal::leaves(&ctx, ChainOp::Mul, out);
        assert!(matches!(ctx.get(leaves[0]), Expr::Integer(-2)));
        assert!(matches!(ctx.get(leaves[1]), Expr::Integer(1)));
    }
}
