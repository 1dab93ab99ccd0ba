pub mod builtin;
pub mod display;
pub mod expression;
pub mod fingerprint;
pub mod symbol;
pub mod traversal;

pub use builtin::BuiltinFn;
pub use display::DisplayExpr;
pub use expression::{Context, Expr, ExprId};
pub use fingerprint::fingerprint;
pub use symbol::{SymbolId, SymbolTable};
