//! Symbolic differentiation.
//!
//! Produces an unsimplified derivative tree; the caller runs the simplifier
//! exactly once on the result. Operator rules dispatch on the node kind,
//! function rules on the builtin id. Powers with arbitrary exponents route
//! through `exp(g * ln f)`, which the simplifier later folds back into
//! power form.

use deriv_ast::{BuiltinFn, Context, Expr, ExprId, SymbolId};

/// Partial derivative of `expr` with respect to `var`.
pub fn differentiate(ctx: &mut Context, expr: ExprId, var: SymbolId) -> ExprId {
    match ctx.get(expr).clone() {
        Expr::Integer(_) => ctx.num(0),
        Expr::Variable(s) => {
            if s == var {
                ctx.num(1)
            } else {
                ctx.num(0)
            }
        }
        Expr::Add(l, r) => {
            let dl = differentiate(ctx, l, var);
            let dr = differentiate(ctx, r, var);
            ctx.add(Expr::Add(dl, dr))
        }
        Expr::Sub(l, r) => {
            let dl = differentiate(ctx, l, var);
            let dr = differentiate(ctx, r, var);
            ctx.add(Expr::Sub(dl, dr))
        }
        Expr::Mul(l, r) => diff_product(ctx, l, r, var),
        Expr::Div(l, r) => diff_quotient(ctx, l, r, var),
        Expr::Pow(base, exp) => diff_power(ctx, base, exp, var),
        Expr::Function(f, args) => match f {
            BuiltinFn::Ln => {
                let da = differentiate(ctx, args[0], var);
                ctx.add(Expr::Div(da, args[0]))
            }
            BuiltinFn::Log => {
                // log(b, f) is ln(f)/ln(b); differentiate that quotient.
                let ln_f = ctx.call(BuiltinFn::Ln, vec![args[1]]);
                let ln_b = ctx.call(BuiltinFn::Ln, vec![args[0]]);
                diff_quotient(ctx, ln_f, ln_b, var)
            }
            BuiltinFn::Cos => {
                let da = differentiate(ctx, args[0], var);
                let sin = ctx.call(BuiltinFn::Sin, vec![args[0]]);
                let prod = ctx.add(Expr::Mul(da, sin));
                let zero = ctx.num(0);
                ctx.add(Expr::Sub(zero, prod))
            }
            BuiltinFn::Sin => {
                let da = differentiate(ctx, args[0], var);
                let cos = ctx.call(BuiltinFn::Cos, vec![args[0]]);
                ctx.add(Expr::Mul(da, cos))
            }
            BuiltinFn::Tan => {
                let da = differentiate(ctx, args[0], var);
                let cos = ctx.call(BuiltinFn::Cos, vec![args[0]]);
                let two = ctx.num(2);
                let cos_sq = ctx.add(Expr::Pow(cos, two));
                ctx.add(Expr::Div(da, cos_sq))
            }
            BuiltinFn::Pow => diff_power(ctx, args[0], args[1], var),
            BuiltinFn::Exp => {
                let da = differentiate(ctx, args[0], var);
                let exp = ctx.call(BuiltinFn::Exp, vec![args[0]]);
                ctx.add(Expr::Mul(da, exp))
            }
            BuiltinFn::Sinh => {
                let da = differentiate(ctx, args[0], var);
                let cosh = ctx.call(BuiltinFn::Cosh, vec![args[0]]);
                ctx.add(Expr::Mul(da, cosh))
            }
            BuiltinFn::Cosh => {
                let da = differentiate(ctx, args[0], var);
                let sinh = ctx.call(BuiltinFn::Sinh, vec![args[0]]);
                ctx.add(Expr::Mul(da, sinh))
            }
        },
    }
}

/// Product rule: `(fg)' = f'g + fg'`.
fn diff_product(ctx: &mut Context, l: ExprId, r: ExprId, var: SymbolId) -> ExprId {
    let dl = differentiate(ctx, l, var);
    let dr = differentiate(ctx, r, var);
    let t1 = ctx.add(Expr::Mul(dl, r));
    let t2 = ctx.add(Expr::Mul(l, dr));
    ctx.add(Expr::Add(t1, t2))
}

/// Quotient rule: `(f/g)' = (f'g - fg') / g^2`.
fn diff_quotient(ctx: &mut Context, l: ExprId, r: ExprId, var: SymbolId) -> ExprId {
    let dl = differentiate(ctx, l, var);
    let dr = differentiate(ctx, r, var);
    let t1 = ctx.add(Expr::Mul(dl, r));
    let t2 = ctx.add(Expr::Mul(l, dr));
    let num = ctx.add(Expr::Sub(t1, t2));
    let two = ctx.num(2);
    let den = ctx.add(Expr::Pow(r, two));
    ctx.add(Expr::Div(num, den))
}

/// General power rule via `f^g = exp(g * ln f)`.
fn diff_power(ctx: &mut Context, base: ExprId, exp: ExprId, var: SymbolId) -> ExprId {
    let ln_base = ctx.call(BuiltinFn::Ln, vec![base]);
    let u = ctx.add(Expr::Mul(exp, ln_base));
    let du = differentiate(ctx, u, var);
    let exp_u = ctx.call(BuiltinFn::Exp, vec![u]);
    ctx.add(Expr::Mul(du, exp_u))
}

#[cfg(test)]
mod tests {
    use super::*;
    use deriv_ast::DisplayExpr;
    use deriv_parser::parse;

    fn derive_raw(input: &str, var: &str) -> String {
        let mut ctx = Context::new();
        let root = parse(input, &mut ctx).unwrap();
        let sym = ctx.symbols().get_id(var).unwrap();
        let d = differentiate(&mut ctx, root, sym);
        format!("{}", DisplayExpr { context: &ctx, id: d })
    }

    #[test]
    fn test_constant_rule() {
        let mut ctx = Context::new();
        let five = ctx.num(5);
        let x = ctx.intern("x");
        let d = differentiate(&mut ctx, five, x);
        assert_eq!(ctx.get(d), &Expr::Integer(0));
    }

    #[test]
    fn test_variable_rule() {
        let mut ctx = Context::new();
        let x_node = ctx.var("x");
        let y_node = ctx.var("y");
        let x = ctx.symbols().get_id("x").unwrap();
        let dx = differentiate(&mut ctx, x_node, x);
        let dy = differentiate(&mut ctx, y_node, x);
        assert_eq!(ctx.get(dx), &Expr::Integer(1));
        assert_eq!(ctx.get(dy), &Expr::Integer(0));
    }

    #[test]
    fn test_sum_rule_shape() {
        assert_eq!(derive_raw("x+y", "x"), "1+0");
    }

    #[test]
    fn test_product_rule_shape() {
        assert_eq!(derive_raw("x*y", "x"), "1y+x*0");
    }

    #[test]
    fn test_sin_rule_shape() {
        assert_eq!(derive_raw("sin(x)", "x"), "1cos(x)");
    }

    #[test]
    fn test_ln_rule_shape() {
        assert_eq!(derive_raw("ln(x)", "x"), "1/x");
    }
}
