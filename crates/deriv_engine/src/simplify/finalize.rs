//! Finalization: polynomial GCD extraction and surface-form polish.
//!
//! After the fixed-point loop the tree is in additive canonical form with
//! `-1` factors and negative exponents. This phase factors the rational
//! GCD out of every sum (`gcd(|numerators|)/lcm(denominators)` over the
//! term coefficients), then chooses the nicest negative surface forms
//! (`a+(-1)*b` back to `a-b`, `x^(-n)` to `1/x^n`, sign pulls through the
//! odd/even functions) and closes with a fold/identity loop until stable.

use deriv_ast::traversal::{self, ChainOp};
use deriv_ast::{fingerprint, Context, Expr, ExprId, BuiltinFn};
use num_rational::Rational64;
use num_traits::Zero;

use crate::error::{EngineError, EngineResult};
use crate::helpers::{flip_negative_ints, flip_negative_ones, is_int};
use crate::rational;
use crate::simplify::{const_fold, identities, negation, SimplifyState};

/// Run the full finalization pipeline.
pub fn finalize(ctx: &mut Context, state: &mut SimplifyState, id: ExprId) -> EngineResult<ExprId> {
    let id = gcd_over_sum(ctx, state, id)?;
    let id = final_negatives(ctx, id);
    let mut cur = negation::leading_negative(ctx, id);
    loop {
        let folded = const_fold::fold_constants(ctx, state, cur)?;
        let next = identities::identities(ctx, folded)?;
        if next == cur {
            break;
        }
        cur = next;
    }
    tracing::debug!(target: "simplify", hash = fingerprint(ctx, cur), "finalized");
    Ok(cur)
}

/// Descend to nested sums and factor their coefficient GCD out.
fn gcd_walk(ctx: &mut Context, state: &mut SimplifyState, id: ExprId) -> EngineResult<ExprId> {
    if matches!(ctx.get(id), Expr::Add(..)) {
        return gcd_over_sum(ctx, state, id);
    }
    match ctx.get(id).clone() {
        Expr::Integer(_) | Expr::Variable(_) => Ok(id),
        Expr::Sub(l, r) | Expr::Mul(l, r) | Expr::Div(l, r) | Expr::Pow(l, r) => {
            let nl = gcd_walk(ctx, state, l)?;
            let nr = gcd_walk(ctx, state, r)?;
            if nl == l && nr == r {
                Ok(id)
            } else {
                let node = match ctx.get(id) {
                    Expr::Sub(..) => Expr::Sub(nl, nr),
                    Expr::Mul(..) => Expr::Mul(nl, nr),
                    Expr::Div(..) => Expr::Div(nl, nr),
                    _ => Expr::Pow(nl, nr),
                };
                Ok(ctx.add(node))
            }
        }
        Expr::Add(..) => unreachable!("handled above"),
        Expr::Function(f, args) => {
            let mut new_args = Vec::with_capacity(args.len());
            for &a in &args {
                new_args.push(gcd_walk(ctx, state, a)?);
            }
            if new_args == args {
                Ok(id)
            } else {
                Ok(ctx.call(f, new_args))
            }
        }
    }
}

/// Factor the coefficient GCD out of the additive chain rooted at `id`.
///
/// An all-zero coefficient set has no GCD and raises the division error.
fn gcd_over_sum(ctx: &mut Context, state: &mut SimplifyState, id: ExprId) -> EngineResult<ExprId> {
    if is_int(ctx, id, 0) {
        return Ok(id);
    }
    let mut terms = traversal::leaves(ctx, ChainOp::Add, id);
    for term in terms.iter_mut() {
        *term = gcd_walk(ctx, state, *term)?;
    }

    let mut coeffs: Vec<Rational64> = Vec::with_capacity(terms.len());
    for term in terms.iter_mut() {
        let (body, coeff) = const_fold::extract_coefficient(ctx, state, *term)?;
        *term = merge_equal_exponents(ctx, body);
        coeffs.push(coeff);
    }

    let g = rational::gcd_all(&coeffs);
    if g.is_zero() {
        return Err(EngineError::DividedByZero);
    }
    for (term, coeff) in terms.iter_mut().zip(&coeffs) {
        let scaled = rational::div(*coeff, g)?;
        let c = rational::to_expr(ctx, scaled);
        *term = ctx.add(Expr::Mul(c, *term));
    }
    let chain = traversal::rebuild_leaves(ctx, ChainOp::Add, id, &terms);
    let gc = rational::to_expr(ctx, g);
    Ok(ctx.add(Expr::Mul(gc, chain)))
}

/// `y^x * z^x = (y*z)^x` across one multiplicative chain.
fn merge_equal_exponents(ctx: &mut Context, id: ExprId) -> ExprId {
    let leaves = traversal::leaves(ctx, ChainOp::Mul, id);
    let mut seen: rustc_hash::FxHashMap<u64, usize> = rustc_hash::FxHashMap::default();
    // registered power at this position, or None for plain/merged leaves
    let mut powers: Vec<Option<(ExprId, ExprId)>> = vec![None; leaves.len()];
    let mut merged_away = vec![false; leaves.len()];
    let mut changed = false;

    for (pos, &leaf) in leaves.iter().enumerate() {
        if let Expr::Pow(b, e) = ctx.get(leaf).clone() {
            let key = fingerprint(ctx, e);
            match seen.get(&key) {
                None => {
                    seen.insert(key, pos);
                    powers[pos] = Some((b, e));
                }
                Some(&target) => {
                    let (tb, te) = powers[target].expect("registered power");
                    let merged_base = ctx.add(Expr::Mul(tb, b));
                    powers[target] = Some((merged_base, te));
                    merged_away[pos] = true;
                    changed = true;
                }
            }
        }
    }
    if !changed {
        return id;
    }

    let mut repl = Vec::with_capacity(leaves.len());
    for (pos, &leaf) in leaves.iter().enumerate() {
        if merged_away[pos] {
            let one = ctx.num(1);
            repl.push(one);
        } else if let Some((b, e)) = powers[pos] {
            repl.push(ctx.add(Expr::Pow(b, e)));
        } else {
            repl.push(leaf);
        }
    }
    traversal::rebuild_leaves(ctx, ChainOp::Mul, id, &repl)
}

/// Choose subtraction/quotient surface forms for canonical `-1` factors.
fn final_negatives(ctx: &mut Context, id: ExprId) -> ExprId {
    match ctx.get(id).clone() {
        Expr::Integer(_) | Expr::Variable(_) => id,
        Expr::Pow(l, r) => {
            let nl = final_negatives(ctx, l);
            let nr = final_negatives(ctx, r);
            // x^((-1)*y) = 1/x^y
            let (exp, odd) = flip_negative_ints(ctx, nr);
            if odd {
                let p = ctx.add(Expr::Pow(nl, exp));
                let one = ctx.num(1);
                ctx.add(Expr::Div(one, p))
            } else if nl == l && exp == r {
                id
            } else {
                ctx.add(Expr::Pow(nl, exp))
            }
        }
        Expr::Add(l, r) => {
            let nl = final_negatives(ctx, l);
            let nr = final_negatives(ctx, r);
            let (pl, neg_l) = flip_negative_ints(ctx, nl);
            let (pr, neg_r) = flip_negative_ints(ctx, nr);
            match (neg_l, neg_r) {
                // (-1)*a+(-1)*b = (-1)*(a+b)
                (true, true) => {
                    let sum = ctx.add(Expr::Add(pl, pr));
                    let m1 = ctx.num(-1);
                    ctx.add(Expr::Mul(m1, sum))
                }
                // (-1)*a+b = b-a
                (true, false) => ctx.add(Expr::Sub(pr, pl)),
                // a+(-1)*b = a-b
                (false, true) => ctx.add(Expr::Sub(pl, pr)),
                (false, false) => {
                    if pl == l && pr == r {
                        id
                    } else {
                        ctx.add(Expr::Add(pl, pr))
                    }
                }
            }
        }
        Expr::Sub(l, r) => {
            let nl = final_negatives(ctx, l);
            let nr = final_negatives(ctx, r);
            let (pl, neg_l) = flip_negative_ints(ctx, nl);
            let (pr, neg_r) = flip_negative_ints(ctx, nr);
            match (neg_l, neg_r) {
                // (-1)*a-(-1)*b = b-a
                (true, true) => ctx.add(Expr::Sub(pr, pl)),
                // (-1)*a-b = (-1)*(a+b)
                (true, false) => {
                    let sum = ctx.add(Expr::Add(pl, pr));
                    let m1 = ctx.num(-1);
                    ctx.add(Expr::Mul(m1, sum))
                }
                // a-(-1)*b = a+b
                (false, true) => ctx.add(Expr::Add(pl, pr)),
                (false, false) => {
                    if pl == l && pr == r {
                        id
                    } else {
                        ctx.add(Expr::Sub(pl, pr))
                    }
                }
            }
        }
        Expr::Mul(l, r) => {
            let nl = final_negatives(ctx, l);
            let nr = final_negatives(ctx, r);
            if nl == l && nr == r {
                id
            } else {
                ctx.add(Expr::Mul(nl, nr))
            }
        }
        Expr::Div(l, r) => {
            let nl = final_negatives(ctx, l);
            let nr = final_negatives(ctx, r);
            if nl == l && nr == r {
                id
            } else {
                ctx.add(Expr::Div(nl, nr))
            }
        }
        Expr::Function(f, args) => {
            let new_args: Vec<ExprId> = args.iter().map(|&a| final_negatives(ctx, a)).collect();
            match f {
                // sin((-1)*x) = (-1)*sin(x), likewise tan and sinh
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
                // cos((-1)*x) = cos(x), likewise cosh
                BuiltinFn::Cos | BuiltinFn::Cosh => {
                    let (arg, _) = flip_negative_ints(ctx, new_args[0]);
                    if arg == args[0] {
                        id
                    } else {
                        ctx.call(f, vec![arg])
                    }
                }
                // exp((-1)*x) = 1/exp(x)
                BuiltinFn::Exp => {
                    let (arg, odd) = flip_negative_ones(ctx, new_args[0]);
                    if odd {
                        let call = ctx.call(BuiltinFn::Exp, vec![arg]);
                        let one = ctx.num(1);
                        ctx.add(Expr::Div(one, call))
                    } else if arg == args[0] {
                        id
                    } else {
                        ctx.call(BuiltinFn::Exp, vec![arg])
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
