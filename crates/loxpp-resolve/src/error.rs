// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Resolution error types.

use loxpp_ast::Span;
use thiserror::Error;

/// A static error found before the program runs.
#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct ResolveError {
    pub kind: ResolveErrorKind,
    pub span: Span,
}

impl ResolveError {
    pub fn new(kind: ResolveErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn read_in_initializer(name: &str, span: Span) -> Self {
        Self::new(
            ResolveErrorKind::ReadInOwnInitializer {
                name: name.to_string(),
            },
            span,
        )
    }

    pub fn already_declared(name: &str, span: Span, previous: Span) -> Self {
        Self::new(
            ResolveErrorKind::AlreadyDeclared {
                name: name.to_string(),
                previous,
            },
            span,
        )
    }

    pub fn duplicate_method(name: &str, owner: &str, span: Span) -> Self {
        Self::new(
            ResolveErrorKind::DuplicateMethod {
                name: name.to_string(),
                owner: owner.to_string(),
            },
            span,
        )
    }

    /// Short remediation text shown under the error.
    pub fn hint(&self) -> Option<&'static str> {
        use ResolveErrorKind::*;
        match self.kind {
            ReadInOwnInitializer { .. } => Some("declare the variable first, or use a different name for the outer value"),
            AlreadyDeclared { .. } => Some("rename one of the bindings or assign with '=' instead of 'let'"),
            ReturnFromInitializer => Some("'init' always returns the new instance; use a bare 'return;'"),
            SelfInStatic | SuperInStatic => Some("static methods are called on the class; use 'Self' to reach it"),
            SuperWithoutSuperclass => Some("add 'extends Base' to the class declaration"),
            BreakOutsideLoop | ContinueOutsideLoop => Some("loops do not extend into nested functions"),
            _ => None,
        }
    }
}

/// The kind of resolution error.
#[derive(Debug, Clone, Error)]
pub enum ResolveErrorKind {
    #[error("Can't read local variable '{name}' in its own initializer.")]
    ReadInOwnInitializer { name: String },

    #[error("Already a variable named '{name}' in this scope.")]
    AlreadyDeclared { name: String, previous: Span },

    #[error("Can't return from top-level code.")]
    TopLevelReturn,

    #[error("Can't return a value from an initializer.")]
    ReturnFromInitializer,

    #[error("Can't use 'self' outside of a class.")]
    SelfOutsideClass,

    #[error("Can't use 'self' in a static method.")]
    SelfInStatic,

    #[error("Can't use 'super' outside of a class.")]
    SuperOutsideClass,

    #[error("Can't use 'super' in a trait.")]
    SuperInTrait,

    #[error("Can't use 'super' in a class with no superclass.")]
    SuperWithoutSuperclass,

    #[error("Can't use 'super' in a static method.")]
    SuperInStatic,

    #[error("A class can't inherit from itself.")]
    InheritsFromItself { name: String },

    #[error("Method '{name}' is already defined in '{owner}'.")]
    DuplicateMethod { name: String, owner: String },

    #[error("Can't use 'break' outside of a loop.")]
    BreakOutsideLoop,

    #[error("Can't use 'continue' outside of a loop.")]
    ContinueOutsideLoop,
}
