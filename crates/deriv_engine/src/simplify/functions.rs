//! Exponential, logarithmic, trigonometric and hyperbolic identities.
//!
//! Runs after sign canonicalization so the patterns below see `-1` factors
//! and `^(-1)` forms rather than raw subtraction. Argument equality is
//! fingerprint equality.

use deriv_ast::traversal::{self, ChainOp};
use deriv_ast::{fingerprint, BuiltinFn, Context, Expr, ExprId};

use crate::helpers::{as_square, is_int};

/// Bottom-up identity sweep.
pub fn special_functions(ctx: &mut Context, id: ExprId) -> ExprId {
    match ctx.get(id).clone() {
        Expr::Integer(_) | Expr::Variable(_) => id,
        Expr::Function(f, args) => {
            let new_args: Vec<ExprId> =
                args.iter().map(|&a| special_functions(ctx, a)).collect();
            match f {
                BuiltinFn::Exp => rewrite_exp(ctx, id, &args, new_args[0]),
                BuiltinFn::Ln => rewrite_ln(ctx, id, &args, new_args[0]),
                _ => {
                    if new_args == args {
                        id
                    } else {
                        ctx.call(f, new_args)
                    }
                }
            }
        }
        Expr::Div(l, r) => {
            let nl = special_functions(ctx, l);
            let nr = special_functions(ctx, r);
            if let Some(out) = rewrite_quotient(ctx, nl, nr) {
                return out;
            }
            if nl == l && nr == r {
                id
            } else {
                ctx.add(Expr::Div(nl, nr))
            }
        }
        Expr::Add(l, r) => {
            let nl = special_functions(ctx, l);
            let nr = special_functions(ctx, r);
            if let Some(out) = rewrite_sum(ctx, nl, nr) {
                return out;
            }
            if nl == l && nr == r {
                id
            } else {
                ctx.add(Expr::Add(nl, nr))
            }
        }
        Expr::Sub(l, r) => {
            let nl = special_functions(ctx, l);
            let nr = special_functions(ctx, r);
            if let Some(out) = rewrite_difference(ctx, nl, nr) {
                return out;
            }
            if nl == l && nr == r {
                id
            } else {
                ctx.add(Expr::Sub(nl, nr))
            }
        }
        Expr::Mul(l, r) => {
            let nl = special_functions(ctx, l);
            let nr = special_functions(ctx, r);
            if nl == l && nr == r {
                id
            } else {
                ctx.add(Expr::Mul(nl, nr))
            }
        }
        Expr::Pow(l, r) => {
            let nl = special_functions(ctx, l);
            let nr = special_functions(ctx, r);
            if nl == l && nr == r {
                id
            } else {
                ctx.add(Expr::Pow(nl, nr))
            }
        }
    }
}

/// `exp(... * ln(f) * ...)` = `f^(...)`; the first `ln` factor is consumed.
fn rewrite_exp(ctx: &mut Context, id: ExprId, old_args: &[ExprId], arg: ExprId) -> ExprId {
    let leaves = traversal::leaves(ctx, ChainOp::Mul, arg);
    for (i, &leaf) in leaves.iter().enumerate() {
        if let Expr::Function(BuiltinFn::Ln, ln_args) = ctx.get(leaf).clone() {
            let mut repl = leaves.clone();
            repl[i] = ctx.num(1);
            let exponent = traversal::rebuild_leaves(ctx, ChainOp::Mul, arg, &repl);
            return ctx.add(Expr::Pow(ln_args[0], exponent));
        }
    }
    if arg == old_args[0] {
        id
    } else {
        ctx.call(BuiltinFn::Exp, vec![arg])
    }
}

/// `ln(... * exp(f) * ...)` = `ln(...) + f`; otherwise `ln(a^b)` = `b*ln(a)`.
fn rewrite_ln(ctx: &mut Context, id: ExprId, old_args: &[ExprId], arg: ExprId) -> ExprId {
    let leaves = traversal::leaves(ctx, ChainOp::Mul, arg);
    for (i, &leaf) in leaves.iter().enumerate() {
        if let Expr::Function(BuiltinFn::Exp, exp_args) = ctx.get(leaf).clone() {
            let mut repl = leaves.clone();
            repl[i] = ctx.num(1);
            let rest = traversal::rebuild_leaves(ctx, ChainOp::Mul, arg, &repl);
            let ln_rest = ctx.call(BuiltinFn::Ln, vec![rest]);
            return ctx.add(Expr::Add(ln_rest, exp_args[0]));
        }
    }
    if let Expr::Pow(base, exp) = ctx.get(arg).clone() {
        let ln_base = ctx.call(BuiltinFn::Ln, vec![base]);
        return ctx.add(Expr::Mul(exp, ln_base));
    }
    if arg == old_args[0] {
        id
    } else {
        ctx.call(BuiltinFn::Ln, vec![arg])
    }
}

/// `sin/cos` = `tan`, `cos/sin` = `1/tan`.
fn rewrite_quotient(ctx: &mut Context, l: ExprId, r: ExprId) -> Option<ExprId> {
    let (lf, la) = as_unary_call(ctx, l)?;
    let (rf, ra) = as_unary_call(ctx, r)?;
    if fingerprint(ctx, la) != fingerprint(ctx, ra) {
        return None;
    }
    match (lf, rf) {
        (BuiltinFn::Sin, BuiltinFn::Cos) => Some(ctx.call(BuiltinFn::Tan, vec![la])),
        (BuiltinFn::Cos, BuiltinFn::Sin) => {
            let tan = ctx.call(BuiltinFn::Tan, vec![la]);
            let one = ctx.num(1);
            Some(ctx.add(Expr::Div(one, tan)))
        }
        _ => None,
    }
}

/// `sin^2+cos^2` = `1`; `sinh^2+1` and `1+sinh^2` = `cosh^2`.
fn rewrite_sum(ctx: &mut Context, l: ExprId, r: ExprId) -> Option<ExprId> {
    if let (Some(lb), Some(rb)) = (as_square(ctx, l), as_square(ctx, r)) {
        if let (Some((lf, la)), Some((rf, ra))) =
            (as_unary_call(ctx, lb), as_unary_call(ctx, rb))
        {
            let sin_cos = matches!(
                (lf, rf),
                (BuiltinFn::Sin, BuiltinFn::Cos) | (BuiltinFn::Cos, BuiltinFn::Sin)
            );
            if sin_cos && fingerprint(ctx, la) == fingerprint(ctx, ra) {
                return Some(ctx.num(1));
            }
        }
    }
    if is_int(ctx, r, 1) {
        if let Some(base) = as_square(ctx, l) {
            if let Some((BuiltinFn::Sinh, arg)) = as_unary_call(ctx, base) {
                return Some(square_of(ctx, BuiltinFn::Cosh, arg));
            }
        }
    }
    if is_int(ctx, l, 1) {
        if let Some(base) = as_square(ctx, r) {
            if let Some((BuiltinFn::Sinh, arg)) = as_unary_call(ctx, base) {
                return Some(square_of(ctx, BuiltinFn::Cosh, arg));
            }
        }
    }
    None
}

/// `cosh^2-sinh^2` = `1`; `1-sin^2` = `cos^2`, `1-cos^2` = `sin^2`,
/// `cosh^2-1` = `sinh^2`.
fn rewrite_difference(ctx: &mut Context, l: ExprId, r: ExprId) -> Option<ExprId> {
    if let (Some(lb), Some(rb)) = (as_square(ctx, l), as_square(ctx, r)) {
        if let (Some((BuiltinFn::Cosh, la)), Some((BuiltinFn::Sinh, ra))) =
            (as_unary_call(ctx, lb), as_unary_call(ctx, rb))
        {
            if fingerprint(ctx, la) == fingerprint(ctx, ra) {
                return Some(ctx.num(1));
            }
        }
    }
    if is_int(ctx, l, 1) {
        if let Some(base) = as_square(ctx, r) {
            match as_unary_call(ctx, base) {
                Some((BuiltinFn::Sin, arg)) => return Some(square_of(ctx, BuiltinFn::Cos, arg)),
                Some((BuiltinFn::Cos, arg)) => return Some(square_of(ctx, BuiltinFn::Sin, arg)),
                _ => {}
            }
        }
    }
    if is_int(ctx, r, 1) {
        if let Some(base) = as_square(ctx, l) {
            if let Some((BuiltinFn::Cosh, arg)) = as_unary_call(ctx, base) {
                return Some(square_of(ctx, BuiltinFn::Sinh, arg));
            }
        }
    }
    None
}

fn as_unary_call(ctx: &Context, id: ExprId) -> Option<(BuiltinFn, ExprId)> {
    match ctx.get(id) {
        Expr::Function(f, args) if args.len() == 1 => Some((*f, args[0])),
        _ => None,
    }
}

fn square_of(ctx: &mut Context, f: BuiltinFn, arg: ExprId) -> ExprId {
    let call = ctx.call(f, vec![arg]);
    let two = ctx.num(2);
    ctx.add(Expr::Pow(call, two))
}
