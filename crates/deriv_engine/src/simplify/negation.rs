//! Negative canonicalization.
//!
//! Subtraction and division are replaced by additive/multiplicative forms
//! that the polynomial pass handles uniformly: `a-b` becomes `a+(-1)*b`
//! (absorbing a sign the right side already carries), divisors become
//! `^(-1)` factors (with `exp` and power divisors absorbing the sign into
//! their argument/exponent), integer coefficients distribute over sums, and
//! odd functions pull an inner `-1` outside while even ones drop it.
//!
//! The leading-negative pass then fixes the sign parity of the root
//! product: paired `-1` factors cancel, an odd one is left in front, and a
//! `-1` already leading the chain is kept positional.

use deriv_ast::traversal::{self, ChainOp};
use deriv_ast::{BuiltinFn, Context, Expr, ExprId};

use crate::helpers::{flip_negative_ints, is_int};

/// Bottom-up sign canonicalization.
pub fn canonicalize_negatives(ctx: &mut Context, id: ExprId) -> ExprId {
    match ctx.get(id).clone() {
        Expr::Integer(_) | Expr::Variable(_) => id,
        Expr::Sub(l, r) => {
            let nl = canonicalize_negatives(ctx, l);
            let nr = canonicalize_negatives(ctx, r);
            // a-b = a+(-1)*b, flipping a negative factor of b instead of
            // introducing a fresh one.
            let (flipped, odd) = flip_negative_ints(ctx, nr);
            if odd {
                ctx.add(Expr::Add(nl, flipped))
            } else {
                let m1 = ctx.num(-1);
                let neg = ctx.add(Expr::Mul(m1, flipped));
                ctx.add(Expr::Add(nl, neg))
            }
        }
        Expr::Mul(l, r) => {
            let nl = canonicalize_negatives(ctx, l);
            let nr = canonicalize_negatives(ctx, r);
            // Integer coefficients distribute over sums at this level.
            if matches!(ctx.get(nl), Expr::Integer(_)) {
                if let Expr::Add(a, b) = ctx.get(nr).clone() {
                    let ca = ctx.add(Expr::Mul(nl, a));
                    let cb = ctx.add(Expr::Mul(nl, b));
                    return ctx.add(Expr::Add(ca, cb));
                }
            }
            if matches!(ctx.get(nr), Expr::Integer(_)) {
                if let Expr::Add(a, b) = ctx.get(nl).clone() {
                    let ca = ctx.add(Expr::Mul(nr, a));
                    let cb = ctx.add(Expr::Mul(nr, b));
                    return ctx.add(Expr::Add(ca, cb));
                }
            }
            if nl == l && nr == r {
                id
            } else {
                ctx.add(Expr::Mul(nl, nr))
            }
        }
        Expr::Div(l, r) => {
            let nl = canonicalize_negatives(ctx, l);
            let nr = canonicalize_negatives(ctx, r);
            // a/b = a * b^(-1), pushing the sign into power exponents and
            // exp arguments where possible.
            let inverted = traversal::map_leaves::<()>(ctx, ChainOp::Mul, nr, &mut |ctx, f| {
                Ok(invert_factor(ctx, f))
            })
            .unwrap_or(nr);
            ctx.add(Expr::Mul(nl, inverted))
        }
        Expr::Add(l, r) => {
            let nl = canonicalize_negatives(ctx, l);
            let nr = canonicalize_negatives(ctx, r);
            if nl == l && nr == r {
                id
            } else {
                ctx.add(Expr::Add(nl, nr))
            }
        }
        Expr::Pow(l, r) => {
            let nl = canonicalize_negatives(ctx, l);
            let nr = canonicalize_negatives(ctx, r);
            if nl == l && nr == r {
                id
            } else {
                ctx.add(Expr::Pow(nl, nr))
            }
        }
        Expr::Function(f, args) => {
            let new_args: Vec<ExprId> =
                args.iter().map(|&a| canonicalize_negatives(ctx, a)).collect();
            match f {
                // sin(-x) = -sin(x), likewise tan and sinh
                BuiltinFn::Sin | BuiltinFn::Tan | BuiltinFn::Sinh => {
                    let (arg, odd) = flip_negative_ints(ctx, new_args[0]);
                    let call = ctx.call(f, vec![arg]);
                    if odd {
                        let m1 = ctx.num(-1);
                        ctx.add(Expr::Mul(m1, call))
                    } else if arg == args[0] {
                        id
                    } else {
                        call
                    }
                }
                // cos(-x) = cos(x), likewise cosh
                BuiltinFn::Cos | BuiltinFn::Cosh => {
                    let (arg, _) = flip_negative_ints(ctx, new_args[0]);
                    if arg == args[0] {
                        id
                    } else {
                        ctx.call(f, vec![arg])
                    }
                }
                _ => {
                    if new_args == args {
                        id
                    } else {
                        ctx.call(f, new_args)
                    }
                }
            }
        }
    }
}

/// Reciprocal of one divisor factor.
fn invert_factor(ctx: &mut Context, f: ExprId) -> ExprId {
    match ctx.get(f).clone() {
        // 1/x^y = x^((-1)*y)
        Expr::Pow(b, e) => {
            let m1 = ctx.num(-1);
            let neg_e = ctx.add(Expr::Mul(m1, e));
            ctx.add(Expr::Pow(b, neg_e))
        }
        // 1/exp(x) = exp((-1)*x)
        Expr::Function(BuiltinFn::Exp, args) => {
            let m1 = ctx.num(-1);
            let neg_a = ctx.add(Expr::Mul(m1, args[0]));
            ctx.call(BuiltinFn::Exp, vec![neg_a])
        }
        // 1/x = x^(-1)
        _ => {
            let m1 = ctx.num(-1);
            ctx.add(Expr::Pow(f, m1))
        }
    }
}

/// Root-level sign parity of a multiplicative chain.
///
/// `-1` factors beyond the first chain position cancel pairwise; an odd
/// remainder either folds into a `-1` already leading the chain or is
/// prepended. Non-root products are handled when the polynomial pass visits
/// each monomial.
pub fn leading_negative(ctx: &mut Context, id: ExprId) -> ExprId {
    if !matches!(ctx.get(id), Expr::Mul(..)) {
        return id;
    }
    let leaves = traversal::leaves(ctx, ChainOp::Mul, id);
    let first_neg = is_int(ctx, leaves[0], -1);
    let trailing: Vec<usize> = leaves
        .iter()
        .enumerate()
        .skip(1)
        .filter(|&(_, &l)| is_int(ctx, l, -1))
        .map(|(i, _)| i)
        .collect();
    if trailing.is_empty() {
        return id;
    }

    let odd = trailing.len() % 2 == 1;
    let mut repl = leaves.clone();
    let one = ctx.num(1);
    for &i in &trailing {
        repl[i] = one;
    }
    if odd && first_neg {
        repl[0] = one;
    }
    let rebuilt = traversal::rebuild_leaves(ctx, ChainOp::Mul, id, &repl);
    if odd && !first_neg {
        let m1 = ctx.num(-1);
        ctx.add(Expr::Mul(m1, rebuilt))
    } else {
        rebuilt
    }
}
