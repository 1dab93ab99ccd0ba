//! The polynomial pass.
//!
//! Treats an additive chain as a sum of monomial terms and runs five
//! stages:
//!
//! I.   simplify each term as a monomial (merge equal power bases, local
//!      0/1 and sign cleanup), recursing into nested sums;
//! II.  extract each term's rational coefficient, leaving the *body* used
//!      as the like-term key;
//! III. bucket bodies by fingerprint, summing coefficients of colliding
//!      bodies and zeroing the duplicates;
//! IV.  for every surviving pair (i, j) with i > j, intersect their factor
//!      sets; a non-empty intersection is pulled out, the pair is rebuilt
//!      as `F * (ci*residual_i + cj*residual_j)`, re-simplified, and stored
//!      in slot i (slot j becomes zero). The pairing is deliberately
//!      order-dependent: later pairs see the mutated slots.
//! V.   reattach each coefficient as a `coeff * body` prefix and re-run the
//!      monomial cleanup.

use std::collections::BTreeMap;

use deriv_ast::traversal::{self, ChainOp};
use deriv_ast::{fingerprint, Context, Expr, ExprId};
use num_rational::Rational64;
use num_traits::{One, Zero};

use crate::error::EngineResult;
use crate::helpers::{is_const, product_of};
use crate::rational;
use crate::simplify::{const_fold, identities, negation, SimplifyState};

/// Combine like terms and common factors across the additive chain.
pub fn polynomial(ctx: &mut Context, state: &mut SimplifyState, id: ExprId) -> EngineResult<ExprId> {
    let mut terms = traversal::leaves(ctx, ChainOp::Add, id);

    // Stage I: per-term structural cleanup.
    for term in terms.iter_mut() {
        if !is_const(ctx, *term) {
            *term = monomial_structure(ctx, state, *term)?;
        }
    }

    // Stage II: coefficient extraction.
    let mut coeffs: Vec<Rational64> = Vec::with_capacity(terms.len());
    for term in terms.iter_mut() {
        if is_const(ctx, *term) {
            coeffs.push(Rational64::one());
            continue;
        }
        let (body, coeff) = const_fold::extract_coefficient(ctx, state, *term)?;
        *term = monomial_cleanup(ctx, body)?;
        coeffs.push(coeff);
    }

    // Stage III: like-term combination keyed on the body fingerprint.
    {
        let mut buckets: rustc_hash::FxHashMap<u64, usize> = rustc_hash::FxHashMap::default();
        for i in 0..terms.len() {
            if is_const(ctx, terms[i]) {
                continue;
            }
            let hash = fingerprint(ctx, terms[i]);
            match buckets.get(&hash) {
                None => {
                    buckets.insert(hash, i);
                }
                Some(&first) => {
                    let sum = coeffs[first] + coeffs[i];
                    coeffs[first] = sum;
                    coeffs[i] = Rational64::zero();
                    terms[i] = ctx.num(0);
                }
            }
        }
    }

    // Stage IV: pairwise common-factor extraction.
    for i in 0..terms.len() {
        for j in 0..i {
            if is_const(ctx, terms[i]) {
                break;
            }
            if is_const(ctx, terms[j]) {
                continue;
            }
            let factors_i = factor_positions(ctx, terms[i]);
            let factors_j = factor_positions(ctx, terms[j]);
            let mut shared: BTreeMap<u64, (usize, usize)> = BTreeMap::new();
            for (&hash, &pos_i) in &factors_i {
                if let Some(&pos_j) = factors_j.get(&hash) {
                    shared.insert(hash, (pos_i, pos_j));
                }
            }
            if shared.is_empty() {
                continue;
            }

            let leaves_i = traversal::leaves(ctx, ChainOp::Mul, terms[i]);
            let common: Vec<ExprId> = shared.values().map(|&(pi, _)| leaves_i[pi]).collect();
            let residual_i = blank_positions(ctx, terms[i], shared.values().map(|&(pi, _)| pi));
            let residual_j = blank_positions(ctx, terms[j], shared.values().map(|&(_, pj)| pj));
            let factor = product_of(ctx, &common);

            let ci = rational::to_expr(ctx, coeffs[i]);
            let cj = rational::to_expr(ctx, coeffs[j]);
            let ti = ctx.add(Expr::Mul(ci, residual_i));
            let tj = ctx.add(Expr::Mul(cj, residual_j));
            let sum = ctx.add(Expr::Add(ti, tj));
            let grouped = ctx.add(Expr::Mul(factor, sum));
            terms[i] = crate::simplify::simplify_with(ctx, state, grouped)?;
            terms[j] = ctx.num(0);
            coeffs[i] = Rational64::one();
            coeffs[j] = Rational64::one();
        }
    }

    // Stage V: reattach coefficients.
    for i in 0..terms.len() {
        if is_const(ctx, terms[i]) {
            continue;
        }
        let c = rational::to_expr(ctx, coeffs[i]);
        let v = ctx.add(Expr::Mul(c, terms[i]));
        terms[i] = monomial_cleanup(ctx, v)?;
    }

    Ok(traversal::rebuild_leaves(ctx, ChainOp::Add, id, &terms))
}

/// Stage-I recursion: nested sums restart the polynomial pass, everything
/// else gets the monomial cleanup applied to its children.
fn monomial_structure(
    ctx: &mut Context,
    state: &mut SimplifyState,
    id: ExprId,
) -> EngineResult<ExprId> {
    if matches!(ctx.get(id), Expr::Add(..)) {
        return polynomial(ctx, state, id);
    }
    match ctx.get(id).clone() {
        Expr::Integer(_) | Expr::Variable(_) => Ok(id),
        Expr::Sub(l, r) | Expr::Mul(l, r) | Expr::Div(l, r) | Expr::Pow(l, r) => {
            let nl = monomial_cleanup(ctx, l)?;
            let nr = monomial_cleanup(ctx, r)?;
            let nl = monomial_structure(ctx, state, nl)?;
            let nr = monomial_structure(ctx, state, nr)?;
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
                let a2 = monomial_cleanup(ctx, a)?;
                new_args.push(monomial_structure(ctx, state, a2)?);
            }
            if new_args == args {
                Ok(id)
            } else {
                Ok(ctx.call(f, new_args))
            }
        }
    }
}

/// Merge equal bases, then local 0/1, sign and leading-negative cleanup.
pub(super) fn monomial_cleanup(ctx: &mut Context, id: ExprId) -> EngineResult<ExprId> {
    let id = merge_powers(ctx, id);
    let id = identities::identities(ctx, id)?;
    let id = negation::canonicalize_negatives(ctx, id);
    Ok(negation::leading_negative(ctx, id))
}

/// Exponent bookkeeping for one registered factor base.
enum Exponent {
    Plain,
    Explicit(ExprId),
}

/// `f^a * f^b = f^(a+b)`, `f * f = f^2`, opening `(y*z)^x` first.
pub(super) fn merge_powers(ctx: &mut Context, id: ExprId) -> ExprId {
    let opened = open_power_of_product(ctx, id);
    if !matches!(ctx.get(opened), Expr::Mul(..)) {
        return opened;
    }
    let leaves = traversal::leaves(ctx, ChainOp::Mul, opened);
    // base fingerprint -> (leaf position, running exponent)
    let mut seen: rustc_hash::FxHashMap<u64, usize> = rustc_hash::FxHashMap::default();
    let mut merged: Vec<(ExprId, Exponent)> = Vec::with_capacity(leaves.len());
    let mut replaced = vec![None::<ExprId>; leaves.len()];
    let mut changed = false;

    for (pos, &leaf) in leaves.iter().enumerate() {
        if is_const(ctx, leaf) {
            merged.push((leaf, Exponent::Plain));
            continue;
        }
        let (base, exp) = match ctx.get(leaf).clone() {
            Expr::Pow(b, e) => (b, Some(e)),
            _ => (leaf, None),
        };
        let key = fingerprint(ctx, base);
        match seen.get(&key) {
            None => {
                seen.insert(key, pos);
                merged.push((
                    base,
                    match exp {
                        Some(e) => Exponent::Explicit(e),
                        None => Exponent::Plain,
                    },
                ));
            }
            Some(&target) => {
                let (t_base, t_exp) = &merged[target];
                let t_base = *t_base;
                let new_exp = match (t_exp, exp) {
                    (Exponent::Plain, None) => ctx.num(2),
                    (Exponent::Plain, Some(b)) => {
                        let one = ctx.num(1);
                        ctx.add(Expr::Add(one, b))
                    }
                    (Exponent::Explicit(a), None) => {
                        let a = *a;
                        let one = ctx.num(1);
                        ctx.add(Expr::Add(a, one))
                    }
                    (Exponent::Explicit(a), Some(b)) => {
                        let a = *a;
                        ctx.add(Expr::Add(a, b))
                    }
                };
                merged[target] = (t_base, Exponent::Explicit(new_exp));
                merged.push((leaf, Exponent::Plain));
                replaced[pos] = Some(ctx.num(1));
                changed = true;
            }
        }
    }
    if !changed {
        return opened;
    }

    let mut repl: Vec<ExprId> = Vec::with_capacity(leaves.len());
    for (pos, &leaf) in leaves.iter().enumerate() {
        if let Some(one) = replaced[pos] {
            repl.push(one);
            continue;
        }
        let (base, exp) = &merged[pos];
        match exp {
            Exponent::Plain => repl.push(leaf),
            Exponent::Explicit(e) => {
                let node = ctx.add(Expr::Pow(*base, *e));
                repl.push(node);
            }
        }
    }
    traversal::rebuild_leaves(ctx, ChainOp::Mul, opened, &repl)
}

/// `(y*z)^x = y^x * z^x`, recursively, along the multiplicative spine.
fn open_power_of_product(ctx: &mut Context, id: ExprId) -> ExprId {
    match ctx.get(id).clone() {
        Expr::Pow(b, e) => {
            if let Expr::Mul(y, z) = ctx.get(b).clone() {
                let py = ctx.add(Expr::Pow(y, e));
                let pz = ctx.add(Expr::Pow(z, e));
                let l = open_power_of_product(ctx, py);
                let r = open_power_of_product(ctx, pz);
                ctx.add(Expr::Mul(l, r))
            } else {
                id
            }
        }
        Expr::Mul(l, r) => {
            let nl = open_power_of_product(ctx, l);
            let nr = open_power_of_product(ctx, r);
            if nl == l && nr == r {
                id
            } else {
                ctx.add(Expr::Mul(nl, nr))
            }
        }
        _ => id,
    }
}

/// Factor fingerprints of a term, mapped to the last chain position that
/// carries each.
fn factor_positions(ctx: &Context, id: ExprId) -> BTreeMap<u64, usize> {
    let mut map = BTreeMap::new();
    for (pos, leaf) in traversal::leaves(ctx, ChainOp::Mul, id).into_iter().enumerate() {
        map.insert(fingerprint(ctx, leaf), pos);
    }
    map
}

/// Replace the chain leaves at `positions` with `1`.
fn blank_positions(
    ctx: &mut Context,
    id: ExprId,
    positions: impl Iterator<Item = usize>,
) -> ExprId {
    let leaves = traversal::leaves(ctx, ChainOp::Mul, id);
    let mut repl = leaves.clone();
    let one = ctx.num(1);
    for pos in positions {
        repl[pos] = one;
    }
    traversal::rebuild_leaves(ctx, ChainOp::Mul, id, &repl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deriv_ast::DisplayExpr;
    use deriv_parser::parse;

    fn run(input: &str) -> String {
        let mut ctx = Context::new();
        let mut state = SimplifyState::default();
        let id = parse(input, &mut ctx).unwrap();
        let id = polynomial(&mut ctx, &mut state, id).unwrap();
        format!("{}", DisplayExpr { context: &ctx, id })
    }

    #[test]
    fn test_merge_plain_duplicates() {
        assert_eq!(run("x*x"), "x^2");
    }

    #[test]
    fn test_merge_power_pairs() {
        let mut ctx = Context::new();
        let id = parse("x^2*x^3", &mut ctx).unwrap();
        let id = merge_powers(&mut ctx, id);
        let shown = format!("{}", DisplayExpr { context: &ctx, id });
        assert_eq!(shown, "x^(2+3)*1");
    }

    #[test]
    fn test_open_power_of_product() {
        let mut ctx = Context::new();
        let id = parse("(y*z)^x", &mut ctx).unwrap();
        let id = open_power_of_product(&mut ctx, id);
        let shown = format!("{}", DisplayExpr { context: &ctx, id });
        assert_eq!(shown, "y^x*z^x");
    }

    #[test]
    fn test_like_terms_combine() {
        assert_eq!(run("x*y+x*y"), "2x*y+0");
    }

    #[test]
    fn test_coefficients_sum() {
        assert_eq!(run("2*x+3*x"), "5x+0");
    }

    #[test]
    fn test_opposite_terms_cancel_to_zero() {
        let mut ctx = Context::new();
        let mut state = SimplifyState::default();
        let id = parse("x+(0-1)*x", &mut ctx).unwrap();
        let id = negation::canonicalize_negatives(&mut ctx, id);
        let id = identities::identities(&mut ctx, id).unwrap();
        let id = polynomial(&mut ctx, &mut state, id).unwrap();
        let shown = format!("{}", DisplayExpr { context: &ctx, id });
        assert_eq!(shown, "0+0");
    }

    #[test]
    fn test_common_factor_extraction() {
        // the later term's slot receives the grouped pair, the earlier one
        // is zeroed; the pair sum lists the later term's residual first
        assert_eq!(run("x*y+x*z"), "0+x*(z+y)");
    }

    #[test]
    fn test_distinct_terms_untouched() {
        assert_eq!(run("x+y"), "x+y");
    }
}
