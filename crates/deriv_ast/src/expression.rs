//! Expression arena.
//!
//! Expressions are stored as nodes in a per-round [`Context`] and referenced
//! by [`ExprId`] handles. Nodes are never mutated after creation: rewrites
//! allocate new nodes and are free to share unchanged subtrees, so a rewrite
//! pass returns the input id whenever nothing changed. The whole arena is
//! dropped at the end of a round.

use crate::builtin::BuiltinFn;
use crate::symbol::{SymbolId, SymbolTable};

/// Handle into the [`Context`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(pub u32);

/// One expression node.
///
/// There is no unary-minus variant: the parser rewrites a leading `-` into
/// a subtraction from zero and the simplifier canonicalizes signs into
/// `-1 *` factors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Integer(i64),
    Variable(SymbolId),
    Add(ExprId, ExprId),
    Sub(ExprId, ExprId),
    Mul(ExprId, ExprId),
    Div(ExprId, ExprId),
    Pow(ExprId, ExprId),
    Function(BuiltinFn, Vec<ExprId>),
}

/// Per-round expression arena plus the variable table.
#[derive(Debug, Clone, Default)]
pub struct Context {
    nodes: Vec<Expr>,
    symbols: SymbolTable,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a node and return its handle.
    pub fn add(&mut self, expr: Expr) -> ExprId {
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(expr);
        id
    }

    #[inline]
    pub fn get(&self, id: ExprId) -> &Expr {
        &self.nodes[id.0 as usize]
    }

    /// Integer literal node.
    pub fn num(&mut self, value: i64) -> ExprId {
        self.add(Expr::Integer(value))
    }

    /// Variable node, interning the name on first use.
    pub fn var(&mut self, name: &str) -> ExprId {
        let sym = self.symbols.intern(name);
        self.add(Expr::Variable(sym))
    }

    /// Function application node.
    pub fn call(&mut self, f: BuiltinFn, args: Vec<ExprId>) -> ExprId {
        self.add(Expr::Function(f, args))
    }

    /// Intern a variable name without creating a node.
    pub fn intern(&mut self, name: &str) -> SymbolId {
        self.symbols.intern(name)
    }

    #[inline]
    pub fn sym_name(&self, id: SymbolId) -> &str {
        self.symbols.resolve(id)
    }

    #[inline]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Number of live nodes; used by tests and diagnostics.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
