//! Property tests for the parsing/printing round trip, fingerprint
//! commutativity and derivative zeroing.

use deriv_ast::{fingerprint, Context, DisplayExpr, Expr};
use deriv_parser::parse;
use proptest::prelude::*;

use crate::differentiate::differentiate;
use crate::simplify::simplify;

fn leaf() -> impl Strategy<Value = String> {
    prop_oneof![
        (0i64..10).prop_map(|v| v.to_string()),
        Just("x".to_string()),
        Just("y".to_string()),
    ]
}

fn arb_expr() -> impl Strategy<Value = String> {
    leaf().prop_recursive(3, 24, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({a})+({b})")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({a})-({b})")),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({a})*({b})")),
            (inner.clone(), 1i64..10).prop_map(|(a, d)| format!("({a})/{d}")),
            (inner.clone(), 0i64..4).prop_map(|(a, e)| format!("({a})^{e}")),
            inner.clone().prop_map(|a| format!("sin({a})")),
            inner.clone().prop_map(|a| format!("cos({a})")),
            inner.prop_map(|a| format!("exp({a})")),
        ]
    })
}

fn const_expr() -> impl Strategy<Value = String> {
    (0i64..10)
        .prop_map(|v| v.to_string())
        .prop_recursive(3, 16, 2, |inner| {
            prop_oneof![
                (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({a})+({b})")),
                (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({a})*({b})")),
                (inner, 1i64..10).prop_map(|(a, d)| format!("({a})/{d}")),
            ]
        })
}

fn printed(input: &str) -> String {
    let mut ctx = Context::new();
    let id = parse(input, &mut ctx).expect("generated input must parse");
    format!("{}", DisplayExpr { context: &ctx, id })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_print_parse_round_trip(input in arb_expr()) {
        let once = printed(&input);
        let twice = printed(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_additive_fingerprint_commutes(a in arb_expr(), b in arb_expr()) {
        let mut ctx = Context::new();
        let ea = parse(&a, &mut ctx).unwrap();
        let eb = parse(&b, &mut ctx).unwrap();
        let ab = ctx.add(Expr::Add(ea, eb));
        let ba = ctx.add(Expr::Add(eb, ea));
        prop_assert_eq!(fingerprint(&ctx, ab), fingerprint(&ctx, ba));
        let m_ab = ctx.add(Expr::Mul(ea, eb));
        let m_ba = ctx.add(Expr::Mul(eb, ea));
        prop_assert_eq!(fingerprint(&ctx, m_ab), fingerprint(&ctx, m_ba));
    }

    #[test]
    fn prop_ordered_fingerprint_distinguishes(a in arb_expr(), b in arb_expr()) {
        let mut ctx = Context::new();
        let ea = parse(&a, &mut ctx).unwrap();
        let eb = parse(&b, &mut ctx).unwrap();
        prop_assume!(fingerprint(&ctx, ea) != fingerprint(&ctx, eb));
        let ab = ctx.add(Expr::Sub(ea, eb));
        let ba = ctx.add(Expr::Sub(eb, ea));
        prop_assert_ne!(fingerprint(&ctx, ab), fingerprint(&ctx, ba));
    }

    #[test]
    fn prop_constant_derivative_is_zero(input in const_expr()) {
        let mut ctx = Context::new();
        let root = parse(&input, &mut ctx).unwrap();
        let x = ctx.intern("x");
        let d = differentiate(&mut ctx, root, x);
        let simplified = simplify(&mut ctx, d).expect("constant derivative simplifies");
        let shown = format!("{}", DisplayExpr { context: &ctx, id: simplified });
        prop_assert_eq!(shown, "0");
    }
}
