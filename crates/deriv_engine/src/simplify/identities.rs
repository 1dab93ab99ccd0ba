//! Structural rotation and 0/1 identities.
//!
//! Rotation keeps additive and multiplicative chains left-leaning so later
//! passes see flat spines: nested `-`/`-`, `*`/`/` and `/`/`/` shapes are
//! regrouped, `(x^a)^b` collapses to `x^(a*b)`, the `pow` function becomes
//! the `^` operator and `log(b,f)` is normalized away to `ln(f)/ln(b)`.
//!
//! The 0/1 sweep removes additive and multiplicative units, annihilates
//! zero products, and evaluates the function table at its fixed points
//! (`ln 1`, `exp 0`, `cos 0`, ...).

use deriv_ast::{BuiltinFn, Context, Expr, ExprId};

use crate::error::{EngineError, EngineResult};
use crate::helpers::is_int;

/// One combined rotate + reduce sweep.
pub fn identities(ctx: &mut Context, id: ExprId) -> EngineResult<ExprId> {
    let id = rotate(ctx, id);
    reduce_zero_one(ctx, id)
}

/// Bottom-up structural rotation.
pub fn rotate(ctx: &mut Context, id: ExprId) -> ExprId {
    match ctx.get(id).clone() {
        Expr::Integer(_) | Expr::Variable(_) => id,
        Expr::Add(l, r) => {
            let (nl, nr) = (rotate(ctx, l), rotate(ctx, r));
            match (ctx.get(nl).clone(), ctx.get(nr).clone()) {
                // (a-b)+(c-d) = (a+c)-(b+d)
                (Expr::Sub(a, b), Expr::Sub(c, d)) => {
                    let ac = ctx.add(Expr::Add(a, c));
                    let bd = ctx.add(Expr::Add(b, d));
                    ctx.add(Expr::Sub(ac, bd))
                }
                // x+(y-z) = (x+y)-z
                (_, Expr::Sub(y, z)) => {
                    let xy = ctx.add(Expr::Add(nl, y));
                    ctx.add(Expr::Sub(xy, z))
                }
                // (x-y)+z = (x+z)-y
                (Expr::Sub(x, y), _) => {
                    let xz = ctx.add(Expr::Add(x, nr));
                    ctx.add(Expr::Sub(xz, y))
                }
                _ => rebuild2(ctx, id, Expr::Add(nl, nr), l, r, nl, nr),
            }
        }
        Expr::Sub(l, r) => {
            let (nl, nr) = (rotate(ctx, l), rotate(ctx, r));
            match (ctx.get(nl).clone(), ctx.get(nr).clone()) {
                // (a-b)-(c-d) = (a+d)-(c+b)
                (Expr::Sub(a, b), Expr::Sub(c, d)) => {
                    let ad = ctx.add(Expr::Add(a, d));
                    let cb = ctx.add(Expr::Add(c, b));
                    ctx.add(Expr::Sub(ad, cb))
                }
                // x-(y-z) = (x+z)-y
                (_, Expr::Sub(y, z)) => {
                    let xz = ctx.add(Expr::Add(nl, z));
                    ctx.add(Expr::Sub(xz, y))
                }
                // (x-y)-z = x-(y+z)
                (Expr::Sub(x, y), _) => {
                    let yz = ctx.add(Expr::Add(y, nr));
                    ctx.add(Expr::Sub(x, yz))
                }
                _ => rebuild2(ctx, id, Expr::Sub(nl, nr), l, r, nl, nr),
            }
        }
        Expr::Mul(l, r) => {
            let (nl, nr) = (rotate(ctx, l), rotate(ctx, r));
            match (ctx.get(nl).clone(), ctx.get(nr).clone()) {
                // (a/b)*(c/d) = (a*c)/(b*d)
                (Expr::Div(a, b), Expr::Div(c, d)) => {
                    let ac = ctx.add(Expr::Mul(a, c));
                    let bd = ctx.add(Expr::Mul(b, d));
                    ctx.add(Expr::Div(ac, bd))
                }
                // x*(y/z) = (x*y)/z
                (_, Expr::Div(y, z)) => {
                    let xy = ctx.add(Expr::Mul(nl, y));
                    ctx.add(Expr::Div(xy, z))
                }
                // (x/y)*z = (x*z)/y
                (Expr::Div(x, y), _) => {
                    let xz = ctx.add(Expr::Mul(x, nr));
                    ctx.add(Expr::Div(xz, y))
                }
                _ => rebuild2(ctx, id, Expr::Mul(nl, nr), l, r, nl, nr),
            }
        }
        Expr::Div(l, r) => {
            let (nl, nr) = (rotate(ctx, l), rotate(ctx, r));
            match (ctx.get(nl).clone(), ctx.get(nr).clone()) {
                // (a/b)/(c/d) = (a*d)/(c*b)
                (Expr::Div(a, b), Expr::Div(c, d)) => {
                    let ad = ctx.add(Expr::Mul(a, d));
                    let cb = ctx.add(Expr::Mul(c, b));
                    ctx.add(Expr::Div(ad, cb))
                }
                // x/(y/z) = (x*z)/y
                (_, Expr::Div(y, z)) => {
                    let xz = ctx.add(Expr::Mul(nl, z));
                    ctx.add(Expr::Div(xz, y))
                }
                // (x/y)/z = x/(y*z)
                (Expr::Div(x, y), _) => {
                    let yz = ctx.add(Expr::Mul(y, nr));
                    ctx.add(Expr::Div(x, yz))
                }
                _ => rebuild2(ctx, id, Expr::Div(nl, nr), l, r, nl, nr),
            }
        }
        Expr::Pow(l, r) => {
            let (nl, nr) = (rotate(ctx, l), rotate(ctx, r));
            rotate_pow(ctx, id, l, r, nl, nr)
        }
        Expr::Function(f, args) => {
            let new_args: Vec<ExprId> = args.iter().map(|&a| rotate(ctx, a)).collect();
            match f {
                // pow(a,b) becomes the ^ operator whenever met here.
                BuiltinFn::Pow => {
                    let (b, e) = (new_args[0], new_args[1]);
                    if let Expr::Pow(x, a) = ctx.get(b).clone() {
                        let ab = ctx.add(Expr::Mul(a, e));
                        ctx.add(Expr::Pow(x, ab))
                    } else {
                        ctx.add(Expr::Pow(b, e))
                    }
                }
                // log(b,f) = ln(f)/ln(b)
                BuiltinFn::Log => {
                    let ln_f = ctx.call(BuiltinFn::Ln, vec![new_args[1]]);
                    let ln_b = ctx.call(BuiltinFn::Ln, vec![new_args[0]]);
                    ctx.add(Expr::Div(ln_f, ln_b))
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

/// `(x^a)^b = x^(a*b)`; otherwise rebuild the power node.
fn rotate_pow(
    ctx: &mut Context,
    id: ExprId,
    old_l: ExprId,
    old_r: ExprId,
    nl: ExprId,
    nr: ExprId,
) -> ExprId {
    if let Expr::Pow(x, a) = ctx.get(nl).clone() {
        let ab = ctx.add(Expr::Mul(a, nr));
        return ctx.add(Expr::Pow(x, ab));
    }
    if nl == old_l && nr == old_r {
        id
    } else {
        ctx.add(Expr::Pow(nl, nr))
    }
}

fn rebuild2(
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

/// Bottom-up 0/1 reductions.
pub fn reduce_zero_one(ctx: &mut Context, id: ExprId) -> EngineResult<ExprId> {
    match ctx.get(id).clone() {
        Expr::Integer(_) | Expr::Variable(_) => Ok(id),
        Expr::Add(l, r) => {
            let nl = reduce_zero_one(ctx, l)?;
            let nr = reduce_zero_one(ctx, r)?;
            if is_int(ctx, nl, 0) {
                Ok(nr)
            } else if is_int(ctx, nr, 0) {
                Ok(nl)
            } else {
                Ok(rebuild2(ctx, id, Expr::Add(nl, nr), l, r, nl, nr))
            }
        }
        Expr::Sub(l, r) => {
            let nl = reduce_zero_one(ctx, l)?;
            let nr = reduce_zero_one(ctx, r)?;
            if is_int(ctx, nr, 0) {
                Ok(nl)
            } else if is_int(ctx, nl, 0) {
                // 0-x = (-1)*x
                let m1 = ctx.num(-1);
                Ok(ctx.add(Expr::Mul(m1, nr)))
            } else {
                Ok(rebuild2(ctx, id, Expr::Sub(nl, nr), l, r, nl, nr))
            }
        }
        Expr::Mul(l, r) => {
            let nl = reduce_zero_one(ctx, l)?;
            let nr = reduce_zero_one(ctx, r)?;
            if is_int(ctx, nl, 0) || is_int(ctx, nr, 0) {
                Ok(ctx.num(0))
            } else if is_int(ctx, nl, 1) {
                Ok(nr)
            } else if is_int(ctx, nr, 1) {
                Ok(nl)
            } else {
                Ok(rebuild2(ctx, id, Expr::Mul(nl, nr), l, r, nl, nr))
            }
        }
        Expr::Div(l, r) => {
            let nl = reduce_zero_one(ctx, l)?;
            let nr = reduce_zero_one(ctx, r)?;
            if is_int(ctx, nl, 0) {
                Ok(ctx.num(0))
            } else if is_int(ctx, nr, 1) {
                Ok(nl)
            } else {
                Ok(rebuild2(ctx, id, Expr::Div(nl, nr), l, r, nl, nr))
            }
        }
        Expr::Pow(l, r) => {
            let nl = reduce_zero_one(ctx, l)?;
            let nr = reduce_zero_one(ctx, r)?;
            let rebuilt = rebuild2(ctx, id, Expr::Pow(nl, nr), l, r, nl, nr);
            reduce_power_units(ctx, rebuilt, nl, nr)
        }
        Expr::Function(f, args) => {
            let new_args: Vec<ExprId> = {
                let mut v = Vec::with_capacity(args.len());
                for &a in &args {
                    v.push(reduce_zero_one(ctx, a)?);
                }
                v
            };
            let rebuilt = if new_args == args {
                id
            } else {
                ctx.call(f, new_args.clone())
            };
            match f {
                BuiltinFn::Ln if is_int(ctx, new_args[0], 1) => Ok(ctx.num(0)),
                BuiltinFn::Exp | BuiltinFn::Cos | BuiltinFn::Cosh
                    if is_int(ctx, new_args[0], 0) =>
                {
                    Ok(ctx.num(1))
                }
                BuiltinFn::Sin | BuiltinFn::Tan | BuiltinFn::Sinh
                    if is_int(ctx, new_args[0], 0) =>
                {
                    Ok(ctx.num(0))
                }
                BuiltinFn::Pow => reduce_power_units(ctx, rebuilt, new_args[0], new_args[1]),
                _ => Ok(rebuilt),
            }
        }
    }
}

/// 0/1 rules shared by the `^` operator and the `pow` function.
///
/// `0` raised to a negative literal is the division error; the symbolic
/// `0^x` case still folds to `0`.
fn reduce_power_units(
    ctx: &mut Context,
    id: ExprId,
    base: ExprId,
    exp: ExprId,
) -> EngineResult<ExprId> {
    if is_int(ctx, exp, 0) {
        Ok(ctx.num(1))
    } else if is_int(ctx, base, 0) {
        if matches!(ctx.get(exp), Expr::Integer(e) if *e < 0) {
            Err(EngineError::DividedByZero)
        } else {
            Ok(ctx.num(0))
        }
    } else if is_int(ctx, base, 1) {
        Ok(ctx.num(1))
    } else if is_int(ctx, exp, 1) {
        Ok(base)
    } else {
        Ok(id)
    }
}
