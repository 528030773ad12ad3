// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Expression AST nodes.

use std::sync::{Arc, OnceLock};

use crate::stmt::FnDecl;
use crate::{NodeId, Span};

/// An expression in the AST.
#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

/// Resolved scope distance for a name reference.
///
/// Written once by the resolver, read by the interpreter. An unset binding
/// means the name lives in the global frame.
#[derive(Debug, Clone, Default)]
pub struct Binding(OnceLock<usize>);

impl Binding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the depth. A second write is ignored.
    pub fn set(&self, depth: usize) {
        let _ = self.0.set(depth);
    }

    pub fn depth(&self) -> Option<usize> {
        self.0.get().copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

/// The kind of expression.
#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Literal),
    /// Name reference
    Variable { name: String, binding: Binding },
    /// `name = value`
    Assign {
        name: String,
        value: Box<Expr>,
        binding: Binding,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Short-circuiting `&&`, `||`, `??`
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// `object.name`; numeric names index tuples and arrays
    Get {
        object: Box<Expr>,
        name: String,
    },
    /// `object.name = value`
    Set {
        object: Box<Expr>,
        name: String,
        value: Box<Expr>,
    },
    /// `object[index]`
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    /// `object[index] = value`
    IndexSet {
        object: Box<Expr>,
        index: Box<Expr>,
        value: Box<Expr>,
    },
    Grouping(Box<Expr>),
    /// `[a, ...b]`
    Array(Vec<Expr>),
    /// `{ key: value, ...other }`
    Dict(Vec<DictEntry>),
    /// `(a, b)`
    Tuple(Vec<Expr>),
    /// `fn (params) { body }`
    Lambda(Arc<FnDecl>),
    /// `typeof expr`
    Typeof(Box<Expr>),
    /// `lazy expr`; the body is shared with every thunk created from it
    Lazy(Arc<Expr>),
    /// `...expr` inside an array or dictionary literal
    Spread(Box<Expr>),
    /// `cond ? then : otherwise`
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Await(Box<Expr>),
    /// `super.method`
    Super { method: String, binding: Binding },
    /// `self`
    SelfRef { binding: Binding },
}

#[derive(Debug, Clone)]
pub enum DictEntry {
    Pair { key: String, value: Expr },
    Spread(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Is,
    Range,
}

impl BinOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::Is => "is",
            BinOp::Range => "..",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Coalesce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    Incr,
    Decr,
}

impl Expr {
    pub fn new(id: NodeId, kind: ExprKind, span: Span) -> Self {
        Expr { id, kind, span }
    }

    /// True for expressions that may appear on the left of `=`.
    pub fn is_assignable(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Variable { .. } | ExprKind::Get { .. } | ExprKind::Index { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_is_write_once() {
        let b = Binding::new();
        assert_eq!(b.depth(), None);
        b.set(2);
        b.set(5);
        assert_eq!(b.depth(), Some(2));
    }
}
