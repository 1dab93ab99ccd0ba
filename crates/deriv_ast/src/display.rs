//! Infix rendering with precedence-aware parenthesization.
//!
//! Parenthesization rule: a child prints bare iff its precedence is
//! strictly greater than its parent's, except that equal precedence still
//! brackets the right operand of `-` or `/` and the left operand of `^`.
//!
//! Cosmetic rules carried by the renderer:
//! * `-1*x` prints as `-x`; inside a larger expression the sign keeps its
//!   own brackets (`x+(-y)`), at the very start of the output it does not.
//! * an integer literal times a non-integer omits the `*` (`2x`, `2(x+y)`).
//! * negative integer literals print bracketed except at top level.

use std::fmt;

use crate::expression::{Context, Expr, ExprId};

/// Borrowing display adapter: `format!("{}", DisplayExpr { context, id })`.
pub struct DisplayExpr<'a> {
    pub context: &'a Context,
    pub id: ExprId,
}

impl fmt::Display for DisplayExpr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut printed = 0usize;
        write_expr(self.context, self.id, None, &mut printed, f)
    }
}

/// What kind of node encloses the one being printed.
#[derive(Debug, Clone, Copy)]
enum Parent {
    Op { ch: char, is_left: bool },
    Func,
}

#[inline]
fn level(ch: char) -> u8 {
    match ch {
        '+' | '-' => 1,
        '*' | '/' => 2,
        _ => 3,
    }
}

fn write_expr(
    ctx: &Context,
    id: ExprId,
    parent: Option<Parent>,
    printed: &mut usize,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    match ctx.get(id) {
        Expr::Integer(v) => {
            if *v >= 0 || parent.is_none() {
                write!(f, "{v}")?;
            } else {
                write!(f, "({v})")?;
            }
        }
        Expr::Variable(s) => write!(f, "{}", ctx.sym_name(*s))?,
        Expr::Function(func, args) => {
            write!(f, "{}(", func.name())?;
            for (i, &arg) in args.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write_expr(ctx, arg, Some(Parent::Func), printed, f)?;
            }
            write!(f, ")")?;
        }
        Expr::Add(l, r)
        | Expr::Sub(l, r)
        | Expr::Mul(l, r)
        | Expr::Div(l, r)
        | Expr::Pow(l, r) => {
            let (l, r) = (*l, *r);
            let ch = match ctx.get(id) {
                Expr::Add(..) => '+',
                Expr::Sub(..) => '-',
                Expr::Mul(..) => '*',
                Expr::Div(..) => '/',
                _ => '^',
            };
            let neg = ch == '*' && matches!(ctx.get(l), Expr::Integer(-1));
            let by_precedence = match parent {
                Some(Parent::Op { ch: p, is_left }) => {
                    let pl = level(p);
                    let ml = level(ch);
                    pl > ml
                        || (pl == ml
                            && ((p == '-' && !is_left)
                                || (p == '/' && !is_left)
                                || (p == '^' && is_left)))
                }
                _ => false,
            };
            let needs = !(neg && *printed == 0) && (by_precedence || (parent.is_some() && neg));
            if needs {
                write!(f, "(")?;
            }
            if neg {
                write!(f, "-")?;
            } else {
                write_expr(ctx, l, Some(Parent::Op { ch, is_left: true }), printed, f)?;
                let implicit = ch == '*'
                    && matches!(ctx.get(l), Expr::Integer(_))
                    && !matches!(ctx.get(r), Expr::Integer(_));
                if !implicit {
                    write!(f, "{ch}")?;
                }
            }
            write_expr(ctx, r, Some(Parent::Op { ch, is_left: false }), printed, f)?;
            if needs {
                write!(f, ")")?;
            }
        }
    }
    *printed += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::BuiltinFn;

    fn show(ctx: &Context, id: ExprId) -> String {
        format!("{}", DisplayExpr { context: ctx, id })
    }

    #[test]
    fn test_leading_negative_product() {
        let mut ctx = Context::new();
        let m1 = ctx.num(-1);
        let x = ctx.var("x");
        let e = ctx.add(Expr::Mul(m1, x));
        assert_eq!(show(&ctx, e), "-x");
    }

    #[test]
    fn test_inner_negative_product_keeps_brackets() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let m1 = ctx.num(-1);
        let y = ctx.var("y");
        let neg_y = ctx.add(Expr::Mul(m1, y));
        let e = ctx.add(Expr::Add(x, neg_y));
        assert_eq!(show(&ctx, e), "x+(-y)");
    }

    #[test]
    fn test_implicit_multiplication() {
        let mut ctx = Context::new();
        let two = ctx.num(2);
        let x = ctx.var("x");
        let e = ctx.add(Expr::Mul(two, x));
        assert_eq!(show(&ctx, e), "2x");

        let a = ctx.var("a");
        let b = ctx.var("b");
        let sum = ctx.add(Expr::Add(a, b));
        let three = ctx.num(3);
        let e2 = ctx.add(Expr::Mul(three, sum));
        assert_eq!(show(&ctx, e2), "3(a+b)");
    }

    #[test]
    fn test_explicit_star_between_integers() {
        let mut ctx = Context::new();
        let two = ctx.num(2);
        let three = ctx.num(3);
        let e = ctx.add(Expr::Mul(two, three));
        assert_eq!(show(&ctx, e), "2*3");
    }

    #[test]
    fn test_right_operand_of_sub_and_div() {
        let mut ctx = Context::new();
        let a = ctx.var("a");
        let b = ctx.var("b");
        let c = ctx.var("c");
        let bc = ctx.add(Expr::Add(b, c));
        let e = ctx.add(Expr::Sub(a, bc));
        assert_eq!(show(&ctx, e), "a-(b+c)");

        let bc2 = ctx.add(Expr::Div(b, c));
        let e2 = ctx.add(Expr::Div(a, bc2));
        assert_eq!(show(&ctx, e2), "a/(b/c)");

        let ab = ctx.add(Expr::Div(a, b));
        let e3 = ctx.add(Expr::Div(ab, c));
        assert_eq!(show(&ctx, e3), "a/b/c");
    }

    #[test]
    fn test_power_brackets_left_at_equal_level() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let two = ctx.num(2);
        let three = ctx.num(3);
        let x2 = ctx.add(Expr::Pow(x, two));
        let e = ctx.add(Expr::Pow(x2, three));
        assert_eq!(show(&ctx, e), "(x^2)^3");

        let p23 = ctx.add(Expr::Pow(two, three));
        let e2 = ctx.add(Expr::Pow(x, p23));
        assert_eq!(show(&ctx, e2), "x^2^3");
    }

    #[test]
    fn test_negative_integer_literal() {
        let mut ctx = Context::new();
        let m5 = ctx.num(-5);
        assert_eq!(show(&ctx, m5), "-5");
        let x = ctx.var("x");
        let e = ctx.add(Expr::Pow(x, m5));
        assert_eq!(show(&ctx, e), "x^(-5)");
    }

    #[test]
    fn test_function_rendering() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let sin = ctx.call(BuiltinFn::Sin, vec![x]);
        assert_eq!(show(&ctx, sin), "sin(x)");
        let two = ctx.num(2);
        let log = ctx.call(BuiltinFn::Log, vec![two, x]);
        assert_eq!(show(&ctx, log), "log(2,x)");
    }

    #[test]
    fn test_quotient_of_power() {
        let mut ctx = Context::new();
        let one = ctx.num(1);
        let x = ctx.var("x");
        let cos = ctx.call(BuiltinFn::Cos, vec![x]);
        let two = ctx.num(2);
        let sq = ctx.add(Expr::Pow(cos, two));
        let e = ctx.add(Expr::Div(one, sq));
        assert_eq!(show(&ctx, e), "1/cos(x)^2");
    }
}
