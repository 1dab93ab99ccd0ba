//! The algebraic simplifier.
//!
//! A fixed-point driver repeats an ordered pass sequence until the root
//! fingerprint repeats, then hands the tree to [`finalize`] for surface
//! polish:
//!
//! 1. [`identities::identities`] — structural rotation plus 0/1 reductions
//! 2. [`negation::canonicalize_negatives`] — `-`/`/` become `+ (-1)*` and
//!    `* ^(-1)` forms
//! 3. [`negation::leading_negative`] — sign parity of the root product
//! 4. [`functions::special_functions`] — exp/ln folding, trigonometric and
//!    hyperbolic identities
//! 5. [`polynomial::polynomial`] — monomial cleanup, like-term combination,
//!    pairwise common-factor extraction
//! 6. [`const_fold::fold_constants`] — bottom-up integer evaluation
//!
//! Termination is cycle detection: each iteration inserts the root
//! fingerprint into a seen-set and the loop ends on the first repeat, which
//! tolerates locally non-monotone passes (the `-` → `+(-1)*` rewrite grows
//! the tree; constant folding shrinks it back).

pub mod const_fold;
pub mod finalize;
pub mod functions;
pub mod identities;
pub mod negation;
pub mod polynomial;

use deriv_ast::{fingerprint, Context, ExprId};
use rustc_hash::FxHashSet;

use crate::error::EngineResult;

/// Scratch state shared by the passes of one simplification.
#[derive(Debug, Default)]
pub struct SimplifyState {
    /// Fingerprints of products whose coefficient was already rotated to
    /// the front; stops the rotation from stacking a fresh coefficient on
    /// every iteration.
    extracted: FxHashSet<u64>,
}

/// Simplify `expr` to fixed point and finalize the surface form.
pub fn simplify(ctx: &mut Context, expr: ExprId) -> EngineResult<ExprId> {
    let mut state = SimplifyState::default();
    simplify_with(ctx, &mut state, expr)
}

/// Driver entry that shares `state`; the polynomial pass re-enters here
/// when it re-simplifies a factored term pair.
pub(crate) fn simplify_with(
    ctx: &mut Context,
    state: &mut SimplifyState,
    expr: ExprId,
) -> EngineResult<ExprId> {
    let mut seen: FxHashSet<u64> = FxHashSet::default();
    let mut cur = expr;
    loop {
        cur = identities::identities(ctx, cur)?;
        cur = negation::canonicalize_negatives(ctx, cur);
        cur = negation::leading_negative(ctx, cur);
        cur = functions::special_functions(ctx, cur);
        cur = polynomial::polynomial(ctx, state, cur)?;
        cur = const_fold::fold_constants(ctx, state, cur)?;
        let hash = fingerprint(ctx, cur);
        tracing::trace!(target: "simplify", hash, "pass_cycle");
        if !seen.insert(hash) {
            break;
        }
    }
    finalize::finalize(ctx, state, cur)
}
