// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The interpreter implementation.
//!
//! Walks the resolved AST against a chain of [`Env`] frames. Resolved
//! references read their frame by depth; unresolved ones are globals.

use std::sync::Arc;

use loxpp_ast::stmt::Stmt;
use loxpp_ast::Span;
use parking_lot::Mutex;

mod access;
mod call;
mod classes;
mod eval_expr;
mod exec_stmt;
mod format;
mod iterate;
mod operators;

pub(crate) use access::normalize_index;

use crate::env::Env;
use crate::pool::WorkerPool;
use crate::value::Value;

/// Nested user calls allowed before "Stack overflow." is raised.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

/// The tree-walk interpreter.
pub struct Interpreter {
    /// The outermost frame: natives, prelude, and top-level declarations.
    pub(crate) globals: Env,
    /// The frame statements currently execute in.
    pub(crate) env: Env,
    /// Optional output buffer for capturing stdout (used in tests).
    output_buffer: Option<Arc<Mutex<String>>>,
    silent: bool,
    /// Created on first async use and shared with every task.
    pool: Option<Arc<WorkerPool>>,
    worker_count: usize,
    call_depth: usize,
    max_call_depth: usize,
}

/// How a statement finished.
#[derive(Debug, Clone)]
pub enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

impl Interpreter {
    /// An interpreter with natives registered and the prelude loaded.
    pub fn new() -> Self {
        let globals = Env::global();
        let mut interp = Self {
            env: globals.clone(),
            globals,
            output_buffer: None,
            silent: false,
            pool: None,
            worker_count: default_worker_count(),
            call_depth: 0,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        };
        crate::natives::register(&interp.globals);
        interp.load_prelude();
        interp
    }

    /// Returns interpreter and output buffer reference.
    pub fn with_captured_output() -> (Self, Arc<Mutex<String>>) {
        let buffer = Arc::new(Mutex::new(String::new()));
        let mut interp = Self::new();
        interp.output_buffer = Some(buffer.clone());
        (interp, buffer)
    }

    /// Suppress `print`, `println`, and `debug`.
    pub fn set_silent(&mut self, silent: bool) {
        self.silent = silent;
    }

    /// Workers started when the pool is first needed. The pool still grows
    /// past this when tasks wait on each other.
    pub fn set_worker_count(&mut self, workers: usize) {
        self.worker_count = workers.max(1);
    }

    pub fn set_max_call_depth(&mut self, depth: usize) {
        self.max_call_depth = depth;
    }

    /// Execute a resolved program in the global frame.
    pub fn run(&mut self, stmts: &[Stmt]) -> Result<(), RuntimeDiagnostic> {
        tracing::debug!(stmts = stmts.len(), "running program");
        self.env = self.globals.clone();
        for stmt in stmts {
            match self.exec_stmt(stmt)? {
                Flow::Normal => {}
                // The resolver rejects these at top level.
                Flow::Return(_) | Flow::Break | Flow::Continue => break,
            }
        }
        Ok(())
    }

    fn load_prelude(&mut self) {
        const PRELUDE: &str = include_str!("../prelude.lox");

        let lexed = loxpp_lexer::Lexer::new(PRELUDE).tokenize();
        let parsed = loxpp_parser::Parser::new(lexed.tokens).parse();
        if !lexed.errors.is_empty() || !parsed.errors.is_empty() {
            tracing::error!(
                lex_errors = lexed.errors.len(),
                parse_errors = parsed.errors.len(),
                "prelude failed to parse"
            );
            return;
        }
        if let Err(errors) = loxpp_resolve::resolve(&parsed.stmts) {
            tracing::error!(errors = errors.len(), "prelude failed to resolve");
            return;
        }
        if let Err(e) = self.run(&parsed.stmts) {
            tracing::error!(error = %e, "prelude failed to run");
        }
    }

    /// Interpreter for a task on the pool: same globals, output, and pool,
    /// starting in `env`.
    pub(crate) fn spawn_child(&mut self, env: Env) -> Interpreter {
        let pool = self.pool();
        Interpreter {
            globals: self.globals.clone(),
            env,
            output_buffer: self.output_buffer.clone(),
            silent: self.silent,
            pool: Some(pool),
            worker_count: self.worker_count,
            call_depth: 0,
            max_call_depth: self.max_call_depth,
        }
    }

    pub(crate) fn pool(&mut self) -> Arc<WorkerPool> {
        let workers = self.worker_count;
        self.pool
            .get_or_insert_with(|| {
                tracing::debug!(workers, "starting worker pool");
                WorkerPool::new(workers)
            })
            .clone()
    }

    pub(crate) fn write_output(&self, s: &str) {
        if self.silent {
            return;
        }
        if let Some(buf) = &self.output_buffer {
            buf.lock().push_str(s);
        } else {
            use std::io::Write;
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(s.as_bytes());
            let _ = stdout.flush();
        }
    }

    pub(crate) fn write_debug(&self, s: &str) {
        if self.silent {
            return;
        }
        let line = format!("[debug] {s}\n");
        if let Some(buf) = &self.output_buffer {
            buf.lock().push_str(&line);
        } else {
            eprint!("{line}");
        }
    }

    /// Run `f` with `env` as the current frame, restoring the previous
    /// frame afterwards whether or not `f` fails.
    pub(crate) fn with_env<T>(&mut self, env: Env, f: impl FnOnce(&mut Self) -> T) -> T {
        let previous = std::mem::replace(&mut self.env, env);
        let result = f(self);
        self.env = previous;
        result
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// A runtime error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),

    #[error("Undefined property '{0}'.")]
    UndefinedProperty(String),

    #[error("Undefined member '{member}' in namespace '{namespace}'.")]
    UndefinedMember { namespace: String, member: String },

    #[error("Variant '{variant}' does not exist in enum '{name}'.")]
    NoSuchVariant { name: String, variant: String },

    #[error("{0}")]
    TypeError(String),

    #[error("Expected {expected} arguments but got {got}.")]
    ArityMismatch { expected: usize, got: usize },

    #[error("No such method '{method}' on type '{ty}'.")]
    NoSuchMethod { ty: String, method: String },

    #[error("Index {index} is out of bounds for length {len}.")]
    IndexOutOfBounds { index: f64, len: usize },

    #[error("Index must be an integer, got {0}.")]
    InvalidIndex(String),

    #[error("Class '{class}' does not implement trait '{protocol}'.")]
    MissingProtocol {
        class: String,
        protocol: &'static str,
    },

    #[error("Class '{class}' does not implement abstract method '{method}' from trait '{tr}'.")]
    MissingAbstractMethod {
        class: String,
        method: String,
        tr: String,
    },

    #[error("A previously implemented trait already declares method '{0}'.")]
    ConflictingTraitMethod(String),

    #[error("{message}")]
    SignatureMismatch { message: String, hint: String },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Stack overflow.")]
    StackOverflow,

    #[error("Lazy value depends on itself.")]
    LazyCycle,

    #[error("{0}")]
    Io(String),

    /// A user `throw` of a Throwable instance
    #[error("{message}")]
    Thrown {
        value: Value,
        class: String,
        message: String,
    },

    #[error("{0}")]
    Generic(String),
}

impl RuntimeError {
    pub(crate) fn type_error(msg: impl Into<String>) -> Self {
        RuntimeError::TypeError(msg.into())
    }

    /// Remediation text shown under the error.
    pub fn hint(&self) -> Option<String> {
        match self {
            RuntimeError::MissingProtocol { protocol, .. } => {
                let methods = match *protocol {
                    "Computable" => "'_add', '_sub', '_mul' and '_div'",
                    "Comparable" => "'_eq', '_neq', '_lt', '_gt', '_lte' and '_gte'",
                    "Indexable" => "'get' and 'set'",
                    "Iterable" => "'has_next' and 'next'",
                    "Throwable" => "'message'",
                    _ => return Some(format!("Consider implementing the '{protocol}' trait.")),
                };
                Some(format!(
                    "Consider implementing the '{protocol}' trait and its methods: {methods}."
                ))
            }
            RuntimeError::MissingAbstractMethod { class, method, tr } => Some(format!(
                "Consider implementing the abstract method '{method}' from trait '{tr}' in class '{class}'."
            )),
            RuntimeError::ConflictingTraitMethod(name) => Some(format!(
                "Consider removing or renaming the method '{name}'."
            )),
            RuntimeError::SignatureMismatch { hint, .. } => Some(hint.clone()),
            RuntimeError::StackOverflow => {
                Some("Check for unbounded recursion.".to_string())
            }
            _ => None,
        }
    }

    /// The thrown instance, for errors raised by `throw`.
    pub fn thrown_value(&self) -> Option<&Value> {
        match self {
            RuntimeError::Thrown { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// Runtime error with source location for diagnostic display.
#[derive(Debug, Clone)]
pub struct RuntimeDiagnostic {
    pub error: RuntimeError,
    pub span: Span,
}

impl RuntimeDiagnostic {
    pub fn new(error: RuntimeError, span: Span) -> Self {
        Self { error, span }
    }

    /// Attach `span` unless a more precise location is already known.
    pub fn or_span(mut self, span: Span) -> Self {
        if self.span.is_empty() {
            self.span = span;
        }
        self
    }
}

impl From<RuntimeError> for RuntimeDiagnostic {
    fn from(error: RuntimeError) -> Self {
        RuntimeDiagnostic::new(error, Span::default())
    }
}

impl std::fmt::Display for RuntimeDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for RuntimeDiagnostic {}
