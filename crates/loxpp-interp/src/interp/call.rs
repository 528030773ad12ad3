// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Function calling and class construction.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::pool;
use crate::value::{Arity, Class, Closure, Instance, Value, Variant};

use super::{Flow, Interpreter, RuntimeDiagnostic, RuntimeError};

impl Interpreter {
    pub(crate) fn call_value(&mut self, callee: Value, args: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
        match callee {
            Value::Function(closure) => {
                check_arity(closure.arity(), args.len())?;
                if closure.is_async() {
                    self.call_async(closure, args)
                } else {
                    self.call_closure(&closure, args)
                }
            }
            Value::Native(native) => {
                if let Arity::Fixed(expected) = native.arity {
                    check_arity(expected, args.len())?;
                }
                let mut forced = Vec::with_capacity(args.len());
                for arg in args {
                    forced.push(self.force(arg)?);
                }
                (native.func)(self, forced)
            }
            Value::Method(method) => self.call_builtin_method(&method, args),
            Value::Class(class) => self.construct(class, args),
            Value::Variant(variant) => build_variant(&variant, args),
            Value::Trait(_) => Err(RuntimeError::type_error(
                "Traits cannot be constructed nor instantiated.",
            )
            .into()),
            Value::Enum(_) => Err(RuntimeError::type_error(
                "Cannot directly call an enum. Call a variant or a method instead.",
            )
            .into()),
            _ => Err(RuntimeError::type_error("Can only call functions and classes.").into()),
        }
    }

    /// Run a closure's body synchronously in a fresh frame.
    pub(crate) fn call_closure(&mut self, closure: &Closure, args: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
        if closure.is_abstract() {
            return Err(RuntimeError::Generic(format!(
                "Cannot call abstract method '{}'.",
                closure.name()
            ))
            .into());
        }
        if self.call_depth >= self.max_call_depth {
            return Err(RuntimeError::StackOverflow.into());
        }

        let env = closure.env.child();
        for (param, arg) in closure.decl.params.iter().zip(args) {
            env.define(param.name.clone(), arg);
        }

        self.call_depth += 1;
        let body = &closure.decl.body;
        let result = crate::stack::ensure_sufficient_stack(|| {
            self.with_env(env, |interp| interp.exec_stmts(body))
        });
        self.call_depth -= 1;

        let flow = result?;
        if closure.is_initializer {
            return Ok(closure.env.get_at(0, "self")?);
        }
        match flow {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::Null),
        }
    }

    /// Start an async closure on the worker pool and return its handle.
    fn call_async(&mut self, closure: Arc<Closure>, args: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
        let pool = self.pool();
        let mut child = self.spawn_child(closure.env.clone());
        tracing::debug!(function = closure.name(), "spawning async task");
        let handle = pool::spawn_task(&pool, move || {
            let result = child.call_closure(&closure, args);
            tracing::debug!(function = closure.name(), ok = result.is_ok(), "async task complete");
            result
        })?;
        Ok(Value::Task(handle))
    }

    fn construct(&mut self, class: Arc<Class>, args: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
        check_arity(class.arity(), args.len())?;
        let instance = Value::Instance(Instance::new(class.clone()));
        if let Some(init) = class.find_method("init") {
            let bound = init.bind(instance.clone());
            self.call_closure(&bound, args)?;
        }
        Ok(instance)
    }

    /// Call a method of `receiver` by name with already-evaluated arguments.
    pub(crate) fn invoke(&mut self, receiver: Value, name: &str, args: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
        let method = self.get_property(receiver, name)?;
        self.call_value(method, args)
    }
}

fn check_arity(expected: usize, got: usize) -> Result<(), RuntimeError> {
    if expected == got {
        Ok(())
    } else {
        Err(RuntimeError::ArityMismatch { expected, got })
    }
}

/// Nullary variants are their tag name; others build a record of their
/// parameters.
fn build_variant(variant: &Variant, args: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
    check_arity(variant.params.len(), args.len())?;
    if variant.params.is_empty() {
        return Ok(Value::string(variant.name.clone()));
    }
    let record: IndexMap<String, Value> = variant.params.iter().cloned().zip(args).collect();
    Ok(Value::dict(record))
}
