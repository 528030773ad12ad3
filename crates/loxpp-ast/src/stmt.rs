// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Statement and declaration AST nodes.

use std::sync::Arc;

use crate::expr::Expr;
use crate::{NodeId, Span};

/// A statement in the AST.
#[derive(Debug, Clone)]
pub struct Stmt {
    pub id: NodeId,
    pub kind: StmtKind,
    pub span: Span,
}

/// The kind of statement.
#[derive(Debug, Clone)]
pub enum StmtKind {
    /// Expression statement
    Expression(Expr),
    /// `let name = init;`
    Var { name: String, init: Option<Expr> },
    /// `let {a, b} = e;` or `let [a, _] = e;`
    Destructure {
        pattern: DestructureKind,
        names: Vec<String>,
        init: Expr,
    },
    Block(Vec<Stmt>),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    /// `while` loop; `increment` runs after every iteration, including
    /// iterations cut short by `continue`
    While {
        cond: Expr,
        body: Box<Stmt>,
        increment: Option<Expr>,
    },
    /// `for key, value in iterable { body }`
    ForIn {
        key: String,
        value: Option<String>,
        iterable: Expr,
        body: Vec<Stmt>,
    },
    Function(Arc<FnDecl>),
    Return(Option<Expr>),
    Break,
    Continue,
    Class(ClassDecl),
    Trait(TraitDecl),
    Enum(EnumDecl),
    Match {
        subject: Expr,
        cases: Vec<MatchCase>,
    },
    Throw(Expr),
    TryCatch {
        body: Vec<Stmt>,
        binding: String,
        handler: Vec<Stmt>,
    },
    Namespace { name: String, body: Vec<Stmt> },
    /// `using {a, b} from source;`
    Using { names: Vec<String>, source: Expr },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestructureKind {
    Object,
    Array,
}

/// Name used for discarded destructuring slots.
pub const DISCARD: &str = "_";

/// A function, method, or lambda.
#[derive(Debug, Clone)]
pub struct FnDecl {
    /// `None` for lambdas
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub is_async: bool,
    /// Declared with `abstract` inside a trait; has no body
    pub is_abstract: bool,
    pub span: Span,
}

impl FnDecl {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("lambda")
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: String,
    pub superclass: Option<Expr>,
    pub traits: Vec<Expr>,
    pub methods: Vec<Arc<FnDecl>>,
    pub static_methods: Vec<Arc<FnDecl>>,
    /// Data-class field list; an `init` assigning them is synthesized by the parser
    pub fields: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TraitDecl {
    pub name: String,
    pub traits: Vec<Expr>,
    pub methods: Vec<Arc<FnDecl>>,
}

#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: String,
    pub variants: Vec<VariantDecl>,
}

#[derive(Debug, Clone)]
pub struct VariantDecl {
    pub name: String,
    pub params: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct MatchCase {
    pub pattern: Pattern,
    pub body: Stmt,
}

#[derive(Debug, Clone)]
pub enum Pattern {
    /// `case _ ->`
    Wildcard,
    /// Compared by value equality against the subject
    Expr(Expr),
}

impl Stmt {
    pub fn new(id: NodeId, kind: StmtKind, span: Span) -> Self {
        Stmt { id, kind, span }
    }
}
