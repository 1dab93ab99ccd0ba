//! Structural fingerprints.
//!
//! The simplifier decides rewrite equality, like-term buckets and loop
//! termination by comparing these 64-bit hashes, so two properties are
//! load-bearing:
//!
//! * `Add` and `Mul` hash as the *sum* of their mixed chain-leaf hashes,
//!   which makes them commutative and invariant under re-association of the
//!   same operator (`a+(b+c)` ≡ `(a+b)+c` ≡ `c+a+b`).
//! * every other constructor combines child hashes position-sensitively, so
//!   `a-b` and `b-a` do not collide.

use crate::builtin::BuiltinFn;
use crate::expression::{Context, Expr, ExprId};

const MULTIPLIER: u64 = 6364136223846793005;
const INCREMENT: u64 = 7;

/// Linear-congruential mix step.
#[inline]
fn mix(h: u64) -> u64 {
    h.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT)
}

const TAG_INT: u64 = 1;
const TAG_VAR: u64 = 2;
const TAG_FUNC: u64 = 3;
const TAG_OP: u64 = 4;

#[inline]
fn leaf_hash(tag: u64, payload: u64) -> u64 {
    mix(mix(tag).wrapping_add(payload))
}

#[inline]
fn op_hash(op: char) -> u64 {
    leaf_hash(TAG_OP, op as u64)
}

#[inline]
fn func_hash(f: BuiltinFn) -> u64 {
    leaf_hash(TAG_FUNC, f as u64)
}

/// Structural hash of the subtree rooted at `id`.
pub fn fingerprint(ctx: &Context, id: ExprId) -> u64 {
    match ctx.get(id) {
        Expr::Integer(v) => leaf_hash(TAG_INT, *v as u64),
        Expr::Variable(s) => leaf_hash(TAG_VAR, *s as u64),
        Expr::Add(..) => op_hash('+').wrapping_add(chain_sum(ctx, id, true)),
        Expr::Mul(..) => op_hash('*').wrapping_add(chain_sum(ctx, id, false)),
        Expr::Sub(l, r) => ordered(op_hash('-'), ctx, &[*l, *r]),
        Expr::Div(l, r) => ordered(op_hash('/'), ctx, &[*l, *r]),
        Expr::Pow(l, r) => ordered(op_hash('^'), ctx, &[*l, *r]),
        Expr::Function(f, args) => ordered(func_hash(*f), ctx, args),
    }
}

/// Commutative combine: sum of mixed leaf hashes over the same-operator chain.
fn chain_sum(ctx: &Context, id: ExprId, additive: bool) -> u64 {
    match (ctx.get(id), additive) {
        (Expr::Add(l, r), true) | (Expr::Mul(l, r), false) => {
            chain_sum(ctx, *l, additive).wrapping_add(chain_sum(ctx, *r, additive))
        }
        _ => mix(fingerprint(ctx, id)),
    }
}

/// Position-sensitive combine: the nth child is mixed n+1 times.
fn ordered(token: u64, ctx: &Context, children: &[ExprId]) -> u64 {
    let mut h = token;
    let mut depth = 1;
    for &c in children {
        let mut part = fingerprint(ctx, c);
        for _ in 0..depth {
            part = mix(part);
        }
        h = h.wrapping_add(part);
        depth += 1;
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with(f: impl FnOnce(&mut Context) -> (ExprId, ExprId)) -> bool {
        let mut ctx = Context::new();
        let (a, b) = f(&mut ctx);
        fingerprint(&ctx, a) == fingerprint(&ctx, b)
    }

    #[test]
    fn test_add_commutes() {
        assert!(ctx_with(|ctx| {
            let x = ctx.var("x");
            let y = ctx.var("y");
            let ab = ctx.add(Expr::Add(x, y));
            let ba = ctx.add(Expr::Add(y, x));
            (ab, ba)
        }));
    }

    #[test]
    fn test_mul_commutes_and_reassociates() {
        assert!(ctx_with(|ctx| {
            let x = ctx.var("x");
            let y = ctx.var("y");
            let z = ctx.var("z");
            let xy = ctx.add(Expr::Mul(x, y));
            let left = ctx.add(Expr::Mul(xy, z));
            let zy = ctx.add(Expr::Mul(z, y));
            let right = ctx.add(Expr::Mul(x, zy));
            (left, right)
        }));
    }

    #[test]
    fn test_sub_is_position_sensitive() {
        assert!(!ctx_with(|ctx| {
            let x = ctx.var("x");
            let y = ctx.var("y");
            let ab = ctx.add(Expr::Sub(x, y));
            let ba = ctx.add(Expr::Sub(y, x));
            (ab, ba)
        }));
    }

    #[test]
    fn test_div_and_pow_are_position_sensitive() {
        assert!(!ctx_with(|ctx| {
            let x = ctx.var("x");
            let y = ctx.var("y");
            let ab = ctx.add(Expr::Div(x, y));
            let ba = ctx.add(Expr::Div(y, x));
            (ab, ba)
        }));
        assert!(!ctx_with(|ctx| {
            let x = ctx.var("x");
            let y = ctx.var("y");
            let ab = ctx.add(Expr::Pow(x, y));
            let ba = ctx.add(Expr::Pow(y, x));
            (ab, ba)
        }));
    }

    #[test]
    fn test_distinct_kinds_do_not_collide() {
        let mut ctx = Context::new();
        let i = ctx.num(0);
        let x = ctx.var("x");
        assert_ne!(fingerprint(&ctx, i), fingerprint(&ctx, x));
    }

    #[test]
    fn test_equal_structure_same_hash_across_contexts() {
        let mut a = Context::new();
        let mut b = Context::new();
        let xa = a.var("x");
        let one_a = a.num(1);
        let ea = a.add(Expr::Add(xa, one_a));
        let one_b = b.num(1);
        let xb = b.var("x");
        let eb = b.add(Expr::Add(one_b, xb));
        assert_eq!(fingerprint(&a, ea), fingerprint(&b, eb));
    }
}
