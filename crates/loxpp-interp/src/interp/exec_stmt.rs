// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Statement execution.

use std::sync::Arc;

use indexmap::IndexMap;
use loxpp_ast::stmt::{DestructureKind, EnumDecl, Pattern, Stmt, StmtKind, DISCARD};

use crate::env::Env;
use crate::value::{Closure, Enum, Namespace, Value, Variant};

use super::{Flow, Interpreter, RuntimeDiagnostic, RuntimeError};

impl Interpreter {
    pub(crate) fn exec_stmts(&mut self, stmts: &[Stmt]) -> Result<Flow, RuntimeDiagnostic> {
        for stmt in stmts {
            match self.exec_stmt(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    /// Run `stmts` with `env` as the current frame.
    pub(crate) fn exec_block(&mut self, stmts: &[Stmt], env: Env) -> Result<Flow, RuntimeDiagnostic> {
        self.with_env(env, |interp| interp.exec_stmts(stmts))
    }

    pub(crate) fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeDiagnostic> {
        self.exec_stmt_kind(stmt).map_err(|d| d.or_span(stmt.span))
    }

    fn exec_stmt_kind(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeDiagnostic> {
        match &stmt.kind {
            StmtKind::Expression(expr) => {
                self.eval_expr(expr)?;
            }
            StmtKind::Var { name, init } => {
                let value = match init {
                    Some(init) => self.eval_expr(init)?,
                    None => Value::Null,
                };
                self.env.define(name.clone(), value);
            }
            StmtKind::Destructure {
                pattern,
                names,
                init,
            } => {
                let value = self.eval_forced(init)?;
                self.destructure(*pattern, names, value)?;
            }
            StmtKind::Block(stmts) => {
                let env = self.env.child();
                return self.exec_block(stmts, env);
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval_forced(cond)?.is_truthy() {
                    return self.exec_stmt(then_branch);
                } else if let Some(else_branch) = else_branch {
                    return self.exec_stmt(else_branch);
                }
            }
            StmtKind::While {
                cond,
                body,
                increment,
            } => {
                while self.eval_forced(cond)?.is_truthy() {
                    match self.exec_stmt(body)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    if let Some(increment) = increment {
                        self.eval_expr(increment)?;
                    }
                }
            }
            StmtKind::ForIn {
                key,
                value,
                iterable,
                body,
            } => {
                return self.exec_for_in(key, value.as_deref(), iterable, body);
            }
            StmtKind::Function(decl) => {
                let closure = Closure::new(decl.clone(), self.env.clone(), false);
                self.env
                    .define(decl.display_name(), Value::Function(closure));
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Null,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
            StmtKind::Class(decl) => self.define_class(decl)?,
            StmtKind::Trait(decl) => self.define_trait(decl)?,
            StmtKind::Enum(decl) => {
                let value = build_enum(decl);
                self.env.define(decl.name.clone(), value);
            }
            StmtKind::Match { subject, cases } => {
                let subject = self.eval_forced(subject)?;
                for case in cases {
                    let matched = match &case.pattern {
                        Pattern::Wildcard => true,
                        Pattern::Expr(pattern) => self.eval_forced(pattern)?.equals(&subject),
                    };
                    if matched {
                        return self.exec_stmt(&case.body);
                    }
                }
            }
            StmtKind::Throw(expr) => {
                let value = self.eval_forced(expr)?;
                return Err(self.throw_value(value)?.into());
            }
            StmtKind::TryCatch {
                body,
                binding,
                handler,
            } => {
                let env = self.env.child();
                match self.exec_block(body, env) {
                    Ok(flow) => return Ok(flow),
                    Err(diag) => {
                        let caught = match diag.error {
                            RuntimeError::Thrown { value, .. } => value,
                            other => Value::string(other.to_string()),
                        };
                        tracing::trace!(binding = %binding, "caught runtime error");
                        let env = self.env.child();
                        env.define(binding.clone(), caught);
                        return self.exec_block(handler, env);
                    }
                }
            }
            StmtKind::Namespace { name, body } => {
                self.env.define(name.clone(), Value::Null);
                let scope = self.env.child();
                self.exec_block(body, scope.clone())?;
                let namespace = Namespace {
                    name: name.clone(),
                    members: scope.bindings().into_iter().collect(),
                };
                self.env
                    .define(name.clone(), Value::Namespace(Arc::new(namespace)));
            }
            StmtKind::Using { names, source } => {
                let Value::Namespace(namespace) = self.eval_forced(source)? else {
                    return Err(RuntimeError::type_error("Source must be a namespace.").into());
                };
                for name in names {
                    let member = namespace.members.get(name).cloned().ok_or_else(|| {
                        RuntimeError::UndefinedMember {
                            namespace: namespace.name.clone(),
                            member: name.clone(),
                        }
                    })?;
                    self.env.define(name.clone(), member);
                }
            }
        }
        Ok(Flow::Normal)
    }

    fn destructure(
        &mut self,
        pattern: DestructureKind,
        names: &[String],
        value: Value,
    ) -> Result<(), RuntimeError> {
        match pattern {
            DestructureKind::Object => {
                let Value::Dict(entries) = value else {
                    return Err(RuntimeError::type_error("Cannot destructure non-object."));
                };
                let entries = entries.lock().clone();
                for name in names.iter().filter(|n| *n != DISCARD) {
                    let value = entries.get(name).cloned().ok_or_else(|| {
                        RuntimeError::Generic(format!(
                            "Key '{name}' is not present in the dictionary."
                        ))
                    })?;
                    self.env.define(name.clone(), value);
                }
            }
            DestructureKind::Array => {
                let items = match value {
                    Value::Array(items) => items.lock().clone(),
                    Value::Tuple(items) => items.as_ref().clone(),
                    _ => return Err(RuntimeError::type_error("Cannot destructure non-array.")),
                };
                for (i, name) in names.iter().enumerate() {
                    if name == DISCARD {
                        continue;
                    }
                    let value = items.get(i).cloned().ok_or(RuntimeError::IndexOutOfBounds {
                        index: i as f64,
                        len: items.len(),
                    })?;
                    self.env.define(name.clone(), value);
                }
            }
        }
        Ok(())
    }

    /// Build the error raised by `throw value`.
    fn throw_value(&mut self, value: Value) -> Result<RuntimeError, RuntimeDiagnostic> {
        let Value::Instance(instance) = &value else {
            return Err(RuntimeError::type_error(
                "Only instances of Throwable classes can be thrown.",
            )
            .into());
        };
        if !instance.class.has_trait("Throwable") {
            return Err(RuntimeError::MissingProtocol {
                class: instance.class.name.clone(),
                protocol: "Throwable",
            }
            .into());
        }
        let class = instance.class.name.clone();
        let method = instance
            .class
            .find_method("message")
            .ok_or_else(|| RuntimeError::UndefinedProperty("message".to_string()))?;
        let bound = method.bind(value.clone());
        let message = self.call_closure(&bound, Vec::new())?;
        let message = self.stringify(&message)?;
        Ok(RuntimeError::Thrown {
            value,
            class,
            message,
        })
    }
}

fn build_enum(decl: &EnumDecl) -> Value {
    let variants: IndexMap<String, Arc<Variant>> = decl
        .variants
        .iter()
        .map(|v| {
            let variant = Variant {
                enum_name: decl.name.clone(),
                name: v.name.clone(),
                params: v.params.clone(),
            };
            (v.name.clone(), Arc::new(variant))
        })
        .collect();
    Value::Enum(Arc::new(Enum {
        name: decl.name.clone(),
        variants,
    }))
}
