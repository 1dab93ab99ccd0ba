//! Chain traversal over additive and multiplicative spines.
//!
//! A "chain" is the flattened view of nested `Add` (or `Mul`) nodes: the
//! leaves of `a + (b + c)` under [`ChainOp::Add`] are `[a, b, c]`. Any node
//! of a different kind, including `Sub` inside an additive chain, is a leaf.
//! Rewrites map over leaves while preserving the nesting shape, returning
//! the input id when nothing changed.

use crate::expression::{Context, Expr, ExprId};

/// Which operator forms the chain spine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOp {
    Add,
    Mul,
}

impl ChainOp {
    #[inline]
    fn split(self, expr: &Expr) -> Option<(ExprId, ExprId)> {
        match (self, expr) {
            (ChainOp::Add, Expr::Add(l, r)) => Some((*l, *r)),
            (ChainOp::Mul, Expr::Mul(l, r)) => Some((*l, *r)),
            _ => None,
        }
    }

    #[inline]
    fn join(self, l: ExprId, r: ExprId) -> Expr {
        match self {
            ChainOp::Add => Expr::Add(l, r),
            ChainOp::Mul => Expr::Mul(l, r),
        }
    }
}

/// Collect the chain leaves of `id` in left-to-right order.
pub fn leaves(ctx: &Context, op: ChainOp, id: ExprId) -> Vec<ExprId> {
    let mut out = Vec::new();
    collect(ctx, op, id, &mut out);
    out
}

fn collect(ctx: &Context, op: ChainOp, id: ExprId, out: &mut Vec<ExprId>) {
    if let Some((l, r)) = op.split(ctx.get(id)) {
        collect(ctx, op, l, out);
        collect(ctx, op, r, out);
    } else {
        out.push(id);
    }
}

/// Map `f` over every chain leaf, rebuilding only the changed spine.
pub fn map_leaves<E>(
    ctx: &mut Context,
    op: ChainOp,
    id: ExprId,
    f: &mut dyn FnMut(&mut Context, ExprId) -> Result<ExprId, E>,
) -> Result<ExprId, E> {
    if let Some((l, r)) = op.split(ctx.get(id)) {
        let nl = map_leaves(ctx, op, l, f)?;
        let nr = map_leaves(ctx, op, r, f)?;
        if nl == l && nr == r {
            Ok(id)
        } else {
            Ok(ctx.add(op.join(nl, nr)))
        }
    } else {
        f(ctx, id)
    }
}

/// Replace the chain leaves of `id` with `repl`, preserving the spine shape.
///
/// `repl` must hold exactly as many entries as the chain has leaves.
pub fn rebuild_leaves(ctx: &mut Context, op: ChainOp, id: ExprId, repl: &[ExprId]) -> ExprId {
    let mut next = 0usize;
    let out = rebuild(ctx, op, id, repl, &mut next);
    debug_assert_eq!(next, repl.len());
    out
}

fn rebuild(
    ctx: &mut Context,
    op: ChainOp,
    id: ExprId,
    repl: &[ExprId],
    next: &mut usize,
) -> ExprId {
    if let Some((l, r)) = op.split(ctx.get(id)) {
        let nl = rebuild(ctx, op, l, repl, next);
        let nr = rebuild(ctx, op, r, repl, next);
        if nl == l && nr == r {
            id
        } else {
            ctx.add(op.join(nl, nr))
        }
    } else {
        let out = repl[*next];
        *next += 1;
        out
    }
}
