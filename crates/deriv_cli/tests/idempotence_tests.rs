//! Idempotence and round-trip properties of the simplifier.
//!
//! Simplified output must re-parse, and re-simplifying the printed form
//! must print identically.

use deriv_ast::{Context, DisplayExpr};
use deriv_engine::simplify;
use deriv_parser::parse;

fn simplified(input: &str) -> String {
    let mut ctx = Context::new();
    let id = parse(input, &mut ctx).expect("input parses");
    let id = simplify(&mut ctx, id).expect("input simplifies");
    format!("{}", DisplayExpr { context: &ctx, id })
}

fn check_idempotent(input: &str) {
    let once = simplified(input);
    let twice = simplified(&once);
    assert_eq!(
        once, twice,
        "not idempotent for {input:?}: first {once:?}, then {twice:?}"
    );
}

#[test]
fn test_idempotence_polynomials() {
    check_idempotent("x*x");
    check_idempotent("2*x+3*x");
    check_idempotent("x*y+x*z");
    check_idempotent("(x+y)^2");
    check_idempotent("x-x");
}

#[test]
fn test_idempotence_quotients() {
    check_idempotent("x/y");
    check_idempotent("1/x");
    check_idempotent("x^2/y^2");
}

#[test]
fn test_idempotence_functions() {
    check_idempotent("sin(x)^2");
    check_idempotent("sin(x)/cos(x)");
    check_idempotent("exp(2*ln(x))");
    check_idempotent("ln(x*y)");
    check_idempotent("cosh(x)^2-sinh(x)^2");
}

#[test]
fn test_idempotence_signs() {
    check_idempotent("-x");
    check_idempotent("3*(-x)");
    check_idempotent("x-y");
    check_idempotent("-x-y");
}

#[test]
fn test_derivatives_reparse() {
    // every printed derivative must itself be valid input
    for input in [
        "x*sin(x)",
        "x/y",
        "pow(x, 3)",
        "ln(x*y)",
        "tan(x)",
        "(x+y)^2",
    ] {
        for line in deriv_cli::process_line(input) {
            let (_, expr) = line.split_once(": ").expect("name: expr shape");
            let mut ctx = Context::new();
            parse(expr, &mut ctx).unwrap_or_else(|e| panic!("{expr:?} re-parses: {e}"));
        }
    }
}
