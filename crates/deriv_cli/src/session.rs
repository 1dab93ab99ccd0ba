//! One round of the derivative session.
//!
//! Each input line gets a fresh [`Context`]: parse, simplify the input
//! once, then differentiate per variable in first-occurrence order and
//! simplify each derivative before printing. Errors are round-scoped: a
//! syntax error or a division error in the input suppresses the whole
//! round, a division error inside one derivation suppresses only that
//! line.

use deriv_ast::{Context, DisplayExpr};
use deriv_engine::{differentiate, simplify};
use deriv_parser::parse;

/// Process one input line into its output lines.
pub fn process_line(line: &str) -> Vec<String> {
    let mut ctx = Context::new();
    let root = match parse(line, &mut ctx) {
        Ok(root) => root,
        Err(e) => return vec![format!("Syntax Error: {e}")],
    };
    let root = match simplify(&mut ctx, root) {
        Ok(root) => root,
        Err(e) => return vec![format!("Runtime Error: {e}")],
    };

    let vars: Vec<(usize, String)> = ctx
        .symbols()
        .iter()
        .map(|(id, name)| (id, name.to_string()))
        .collect();

    let mut out = Vec::with_capacity(vars.len());
    for (var, name) in vars {
        let d = differentiate(&mut ctx, root, var);
        match simplify(&mut ctx, d) {
            Ok(simplified) => out.push(format!(
                "{name}: {}",
                DisplayExpr {
                    context: &ctx,
                    id: simplified
                }
            )),
            Err(e) => out.push(format!("Runtime Error: {e}")),
        }
    }
    out
}
