// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The binding-depth resolver.

use std::collections::HashSet;
use std::sync::Arc;

use loxpp_ast::expr::{Binding, DictEntry, Expr, ExprKind};
use loxpp_ast::stmt::{ClassDecl, FnDecl, Pattern, Stmt, StmtKind, TraitDecl, DISCARD};
use loxpp_ast::{NodeId, Span};

use crate::error::{ResolveError, ResolveErrorKind};
use crate::scope::ScopeStack;
use crate::{ResolvedRef, Resolution};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    None,
    Function,
    Lambda,
    Initializer,
    Method,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassKind {
    None,
    Class,
    Subclass,
    Trait,
}

pub struct Resolver {
    scopes: ScopeStack,
    function: FunctionKind,
    class: ClassKind,
    /// Inside a static method of the innermost class
    in_static: bool,
    loop_depth: usize,
    refs: Vec<ResolvedRef>,
    errors: Vec<ResolveError>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        Self {
            scopes: ScopeStack::default(),
            function: FunctionKind::None,
            class: ClassKind::None,
            in_static: false,
            loop_depth: 0,
            refs: Vec::new(),
            errors: Vec::new(),
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(stmts = stmts.len()))]
    pub fn resolve(stmts: &[Stmt]) -> Result<Resolution, Vec<ResolveError>> {
        let mut resolver = Self::new();
        for stmt in stmts {
            resolver.resolve_stmt(stmt);
        }

        if !resolver.errors.is_empty() {
            tracing::debug!(errors = resolver.errors.len(), "resolution failed");
            return Err(resolver.errors);
        }

        let locals = resolver.refs.iter().filter(|r| r.depth.is_some()).count();
        tracing::debug!(refs = resolver.refs.len(), locals, "resolution complete");
        Ok(Resolution {
            refs: resolver.refs,
        })
    }

    fn error(&mut self, kind: ResolveErrorKind, span: Span) {
        self.errors.push(ResolveError::new(kind, span));
    }

    fn declare(&mut self, name: &str, span: Span) {
        if let Err(previous) = self.scopes.declare(name, span) {
            self.errors
                .push(ResolveError::already_declared(name, span, previous));
        }
    }

    fn declare_defined(&mut self, name: &str, span: Span) {
        self.declare(name, span);
        self.scopes.define(name, span);
    }

    /// Open a scope holding a single implicit name (`self`, `super`, `Self`).
    fn push_implicit(&mut self, name: &str, span: Span) {
        self.scopes.push();
        self.scopes.define(name, span);
    }

    fn resolve_local(&mut self, id: NodeId, name: &str, span: Span, binding: &Binding) {
        let depth = self.scopes.depth_of(name);
        if let Some(depth) = depth {
            binding.set(depth);
        }
        self.refs.push(ResolvedRef {
            id,
            name: name.to_string(),
            span,
            depth,
        });
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn resolve_block(&mut self, stmts: &[Stmt]) {
        self.scopes.push();
        for stmt in stmts {
            self.resolve_stmt(stmt);
        }
        self.scopes.pop();
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expression(expr) | StmtKind::Throw(expr) => self.resolve_expr(expr),
            StmtKind::Var { name, init } => {
                self.declare(name, stmt.span);
                if let Some(init) = init {
                    self.resolve_expr(init);
                }
                self.scopes.define(name, stmt.span);
            }
            StmtKind::Destructure { names, init, .. } => {
                let names: Vec<&String> = names.iter().filter(|n| *n != DISCARD).collect();
                for name in &names {
                    self.declare(name, stmt.span);
                }
                self.resolve_expr(init);
                for name in names {
                    self.scopes.define(name, stmt.span);
                }
            }
            StmtKind::Block(stmts) => self.resolve_block(stmts),
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(cond);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            StmtKind::While {
                cond,
                body,
                increment,
            } => {
                self.resolve_expr(cond);
                self.loop_depth += 1;
                self.resolve_stmt(body);
                if let Some(increment) = increment {
                    self.resolve_expr(increment);
                }
                self.loop_depth -= 1;
            }
            StmtKind::ForIn {
                key,
                value,
                iterable,
                body,
            } => {
                self.resolve_expr(iterable);
                self.loop_depth += 1;
                self.scopes.push();
                self.declare_defined(key, stmt.span);
                if let Some(value) = value {
                    self.declare_defined(value, stmt.span);
                }
                for s in body {
                    self.resolve_stmt(s);
                }
                self.scopes.pop();
                self.loop_depth -= 1;
            }
            StmtKind::Function(decl) => {
                let name = decl.display_name().to_string();
                self.declare_defined(&name, stmt.span);
                self.resolve_function(decl, FunctionKind::Function);
            }
            StmtKind::Return(value) => {
                if self.function == FunctionKind::None {
                    self.error(ResolveErrorKind::TopLevelReturn, stmt.span);
                }
                if let Some(value) = value {
                    if self.function == FunctionKind::Initializer {
                        self.error(ResolveErrorKind::ReturnFromInitializer, stmt.span);
                    }
                    self.resolve_expr(value);
                }
            }
            StmtKind::Break => {
                if self.loop_depth == 0 {
                    self.error(ResolveErrorKind::BreakOutsideLoop, stmt.span);
                }
            }
            StmtKind::Continue => {
                if self.loop_depth == 0 {
                    self.error(ResolveErrorKind::ContinueOutsideLoop, stmt.span);
                }
            }
            StmtKind::Class(class) => self.resolve_class(class, stmt.span),
            StmtKind::Trait(decl) => self.resolve_trait(decl, stmt.span),
            StmtKind::Enum(decl) => self.declare_defined(&decl.name, stmt.span),
            StmtKind::Match { subject, cases } => {
                self.resolve_expr(subject);
                for case in cases {
                    if let Pattern::Expr(pattern) = &case.pattern {
                        self.resolve_expr(pattern);
                    }
                    self.resolve_stmt(&case.body);
                }
            }
            StmtKind::TryCatch {
                body,
                binding,
                handler,
            } => {
                self.resolve_block(body);
                self.scopes.push();
                self.declare_defined(binding, stmt.span);
                for s in handler {
                    self.resolve_stmt(s);
                }
                self.scopes.pop();
            }
            StmtKind::Namespace { name, body } => {
                self.declare_defined(name, stmt.span);
                self.resolve_block(body);
            }
            StmtKind::Using { names, source } => {
                self.resolve_expr(source);
                for name in names {
                    self.declare_defined(name, stmt.span);
                }
            }
        }
    }

    fn resolve_function(&mut self, decl: &FnDecl, kind: FunctionKind) {
        let enclosing_function = std::mem::replace(&mut self.function, kind);
        let enclosing_loops = std::mem::take(&mut self.loop_depth);

        self.scopes.push();
        for param in &decl.params {
            self.declare_defined(&param.name, param.span);
        }
        for stmt in &decl.body {
            self.resolve_stmt(stmt);
        }
        self.scopes.pop();

        self.loop_depth = enclosing_loops;
        self.function = enclosing_function;
    }

    fn check_duplicate_methods(&mut self, methods: &[Arc<FnDecl>], owner: &str) {
        let mut seen = HashSet::new();
        for method in methods {
            let name = method.display_name();
            if !seen.insert(name) {
                self.errors
                    .push(ResolveError::duplicate_method(name, owner, method.span));
            }
        }
    }

    fn resolve_class(&mut self, class: &ClassDecl, span: Span) {
        let enclosing_class = self.class;
        let enclosing_static = std::mem::replace(&mut self.in_static, false);
        self.class = ClassKind::Class;

        self.declare_defined(&class.name, span);

        if let Some(superclass) = &class.superclass {
            if let ExprKind::Variable { name, .. } = &superclass.kind {
                if name == &class.name {
                    self.error(
                        ResolveErrorKind::InheritsFromItself { name: name.clone() },
                        superclass.span,
                    );
                }
            }
            self.class = ClassKind::Subclass;
            self.resolve_expr(superclass);
            self.push_implicit("super", span);
        }

        for t in &class.traits {
            self.resolve_expr(t);
        }

        self.check_duplicate_methods(&class.methods, &class.name);
        self.check_duplicate_methods(&class.static_methods, &class.name);

        self.push_implicit("self", span);
        for method in &class.methods {
            let kind = if method.name.as_deref() == Some("init") {
                FunctionKind::Initializer
            } else {
                FunctionKind::Method
            };
            self.resolve_function(method, kind);
        }
        self.scopes.pop();

        for method in &class.static_methods {
            self.push_implicit("Self", span);
            self.in_static = true;
            self.resolve_function(method, FunctionKind::Method);
            self.in_static = false;
            self.scopes.pop();
        }

        if class.superclass.is_some() {
            self.scopes.pop();
        }

        self.in_static = enclosing_static;
        self.class = enclosing_class;
    }

    fn resolve_trait(&mut self, decl: &TraitDecl, span: Span) {
        let enclosing_class = std::mem::replace(&mut self.class, ClassKind::Trait);
        let enclosing_static = std::mem::replace(&mut self.in_static, false);

        self.declare_defined(&decl.name, span);
        for t in &decl.traits {
            self.resolve_expr(t);
        }
        self.check_duplicate_methods(&decl.methods, &decl.name);

        self.push_implicit("self", span);
        for method in &decl.methods {
            self.resolve_function(method, FunctionKind::Method);
        }
        self.scopes.pop();

        self.in_static = enclosing_static;
        self.class = enclosing_class;
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn resolve_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(_) => {}
            ExprKind::Variable { name, binding } => {
                if self.scopes.is_uninitialized(name) {
                    self.errors
                        .push(ResolveError::read_in_initializer(name, expr.span));
                }
                self.resolve_local(expr.id, name, expr.span, binding);
            }
            ExprKind::Assign {
                name,
                value,
                binding,
            } => {
                self.resolve_expr(value);
                self.resolve_local(expr.id, name, expr.span, binding);
            }
            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            ExprKind::Unary { operand: inner, .. }
            | ExprKind::Grouping(inner)
            | ExprKind::Typeof(inner)
            | ExprKind::Spread(inner)
            | ExprKind::Await(inner) => self.resolve_expr(inner),
            ExprKind::Lazy(inner) => self.resolve_expr(inner),
            ExprKind::Call { callee, args } => {
                self.resolve_expr(callee);
                for arg in args {
                    self.resolve_expr(arg);
                }
            }
            ExprKind::Get { object, .. } => self.resolve_expr(object),
            ExprKind::Set { object, value, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(value);
            }
            ExprKind::Index { object, index } => {
                self.resolve_expr(object);
                self.resolve_expr(index);
            }
            ExprKind::IndexSet {
                object,
                index,
                value,
            } => {
                self.resolve_expr(object);
                self.resolve_expr(index);
                self.resolve_expr(value);
            }
            ExprKind::Array(items) | ExprKind::Tuple(items) => {
                for item in items {
                    self.resolve_expr(item);
                }
            }
            ExprKind::Dict(entries) => {
                // Each key becomes visible to the entries after it.
                self.scopes.push();
                for entry in entries {
                    match entry {
                        DictEntry::Pair { key, value } => {
                            self.resolve_expr(value);
                            self.scopes.define(key, value.span);
                        }
                        DictEntry::Spread(inner) => self.resolve_expr(inner),
                    }
                }
                self.scopes.pop();
            }
            ExprKind::Lambda(decl) => self.resolve_function(decl, FunctionKind::Lambda),
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => {
                self.resolve_expr(cond);
                self.resolve_expr(then);
                self.resolve_expr(otherwise);
            }
            ExprKind::Super { binding, .. } => {
                let problem = match self.class {
                    ClassKind::None => Some(ResolveErrorKind::SuperOutsideClass),
                    ClassKind::Trait => Some(ResolveErrorKind::SuperInTrait),
                    ClassKind::Class => Some(ResolveErrorKind::SuperWithoutSuperclass),
                    ClassKind::Subclass if self.in_static => Some(ResolveErrorKind::SuperInStatic),
                    ClassKind::Subclass => None,
                };
                match problem {
                    Some(kind) => self.error(kind, expr.span),
                    None => self.resolve_local(expr.id, "super", expr.span, binding),
                }
            }
            ExprKind::SelfRef { binding } => {
                if self.class == ClassKind::None {
                    self.error(ResolveErrorKind::SelfOutsideClass, expr.span);
                } else if self.in_static {
                    self.error(ResolveErrorKind::SelfInStatic, expr.span);
                } else {
                    self.resolve_local(expr.id, "self", expr.span, binding);
                }
            }
        }
    }
}
