// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Expression evaluation.

use std::thread;

use indexmap::IndexMap;
use loxpp_ast::expr::{Binding, DictEntry, Expr, ExprKind, Literal, LogicalOp, UnaryOp};

use crate::value::{Closure, Thunk, ThunkState, Value};

use super::{Interpreter, RuntimeDiagnostic, RuntimeError};

impl Interpreter {
    pub(crate) fn eval_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeDiagnostic> {
        self.eval_expr_kind(expr).map_err(|d| d.or_span(expr.span))
    }

    /// Evaluate and force any thunk the expression produced.
    pub(crate) fn eval_forced(&mut self, expr: &Expr) -> Result<Value, RuntimeDiagnostic> {
        let value = self.eval_expr(expr)?;
        self.force(value)
    }

    /// Resolve lazy values to what they evaluate to.
    pub(crate) fn force(&mut self, mut value: Value) -> Result<Value, RuntimeDiagnostic> {
        while let Value::Lazy(thunk) = value {
            value = self.force_thunk(&thunk)?;
        }
        Ok(value)
    }

    fn force_thunk(&mut self, thunk: &Thunk) -> Result<Value, RuntimeDiagnostic> {
        let me = thread::current().id();
        {
            let mut state = thunk.state.lock();
            loop {
                let owner = match &*state {
                    ThunkState::Done(value) => return Ok(value.clone()),
                    ThunkState::Forcing(owner) => Some(*owner),
                    ThunkState::Pending => None,
                };
                match owner {
                    Some(owner) if owner == me => return Err(RuntimeError::LazyCycle.into()),
                    Some(_) => thunk.settled.wait(&mut state),
                    None => {
                        *state = ThunkState::Forcing(me);
                        break;
                    }
                }
            }
        }
        tracing::trace!("forcing lazy value");
        let result = self.with_env(thunk.env.clone(), |interp| interp.eval_expr(&thunk.expr));
        let mut state = thunk.state.lock();
        *state = match &result {
            Ok(value) => ThunkState::Done(value.clone()),
            Err(_) => ThunkState::Pending,
        };
        thunk.settled.notify_all();
        result
    }

    fn lookup(&self, name: &str, binding: &Binding) -> Result<Value, RuntimeError> {
        match binding.depth() {
            Some(depth) => self.env.get_at(depth, name),
            None => self.globals.get(name),
        }
    }

    fn store(&self, name: &str, binding: &Binding, value: Value) -> Result<(), RuntimeError> {
        match binding.depth() {
            Some(depth) => self.env.assign_at(depth, name, value),
            None => self.globals.assign(name, value),
        }
    }

    fn eval_expr_kind(&mut self, expr: &Expr) -> Result<Value, RuntimeDiagnostic> {
        match &expr.kind {
            ExprKind::Literal(lit) => Ok(match lit {
                Literal::Null => Value::Null,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Number(n) => Value::Number(*n),
                Literal::String(s) => Value::string(s.clone()),
            }),
            ExprKind::Variable { name, binding } => Ok(self.lookup(name, binding)?),
            ExprKind::Assign {
                name,
                value,
                binding,
            } => {
                let value = self.eval_expr(value)?;
                self.store(name, binding, value.clone())?;
                Ok(value)
            }
            ExprKind::Binary { op, left, right } => {
                let l = self.eval_forced(left)?;
                let r = self.eval_forced(right)?;
                self.binary_op(*op, l, r)
            }
            ExprKind::Logical { op, left, right } => {
                let l = self.eval_forced(left)?;
                match op {
                    LogicalOp::And if !l.is_truthy() => Ok(l),
                    LogicalOp::Or if l.is_truthy() => Ok(l),
                    LogicalOp::Coalesce if !l.is_null() => Ok(l),
                    _ => self.eval_expr(right),
                }
            }
            ExprKind::Unary { op, operand } => self.eval_unary(*op, operand),
            ExprKind::Call { callee, args } => {
                let callee = self.eval_forced(callee)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_expr(arg)?);
                }
                self.call_value(callee, values)
            }
            ExprKind::Get { object, name } => {
                let object = self.eval_forced(object)?;
                self.get_property(object, name)
            }
            ExprKind::Set {
                object,
                name,
                value,
            } => {
                let object = self.eval_forced(object)?;
                let value = self.eval_expr(value)?;
                self.set_property(object, name, value.clone())?;
                Ok(value)
            }
            ExprKind::Index { object, index } => {
                let object = self.eval_forced(object)?;
                let index = self.eval_forced(index)?;
                self.index_get(object, index)
            }
            ExprKind::IndexSet {
                object,
                index,
                value,
            } => {
                let object = self.eval_forced(object)?;
                let index = self.eval_forced(index)?;
                let value = self.eval_expr(value)?;
                self.index_set(object, index, value.clone())?;
                Ok(value)
            }
            ExprKind::Grouping(inner) => self.eval_expr(inner),
            ExprKind::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match &item.kind {
                        ExprKind::Spread(inner) => {
                            let spread = self.eval_forced(inner)?;
                            out.extend(spread_items(spread)?);
                        }
                        _ => out.push(self.eval_expr(item)?),
                    }
                }
                Ok(Value::array(out))
            }
            ExprKind::Dict(entries) => {
                let scope = self.env.child();
                self.with_env(scope, |interp| interp.eval_dict(entries))
            }
            ExprKind::Tuple(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.eval_expr(item)?);
                }
                Ok(Value::tuple(out))
            }
            ExprKind::Lambda(decl) => Ok(Value::Function(Closure::new(
                decl.clone(),
                self.env.clone(),
                false,
            ))),
            ExprKind::Typeof(inner) => {
                let value = self.eval_expr(inner)?;
                if let Value::Lazy(thunk) = &value {
                    if !thunk.is_forced() {
                        return Ok(Value::string("Lazy"));
                    }
                }
                let value = self.force(value)?;
                Ok(Value::string(value.type_name()))
            }
            ExprKind::Lazy(inner) => Ok(Value::Lazy(Thunk::new(inner.clone(), self.env.clone()))),
            ExprKind::Spread(_) => Err(RuntimeError::type_error(
                "Spread is only allowed inside array and dictionary literals.",
            )
            .into()),
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => {
                if self.eval_forced(cond)?.is_truthy() {
                    self.eval_expr(then)
                } else {
                    self.eval_expr(otherwise)
                }
            }
            ExprKind::Await(inner) => match self.eval_forced(inner)? {
                Value::Task(handle) => handle.wait(),
                _ => Err(RuntimeError::type_error("Can only await an async task.").into()),
            },
            ExprKind::Super { method, binding } => {
                let depth = binding
                    .depth()
                    .ok_or_else(|| RuntimeError::UndefinedVariable("super".to_string()))?;
                let Value::Class(superclass) = self.env.get_at(depth, "super")? else {
                    return Err(RuntimeError::type_error("Superclass must be a class.").into());
                };
                let receiver = self.env.get_at(depth.saturating_sub(1), "self")?;
                let found = superclass
                    .find_method(method)
                    .ok_or_else(|| RuntimeError::UndefinedProperty(method.clone()))?;
                Ok(Value::Function(found.bind(receiver)))
            }
            ExprKind::SelfRef { binding } => Ok(self.lookup("self", binding)?),
        }
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr) -> Result<Value, RuntimeDiagnostic> {
        match op {
            UnaryOp::Neg => match self.eval_forced(operand)? {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(RuntimeError::type_error("Operand must be a number.").into()),
            },
            UnaryOp::Not => Ok(Value::Bool(!self.eval_forced(operand)?.is_truthy())),
            UnaryOp::Incr | UnaryOp::Decr => {
                let delta = if op == UnaryOp::Incr { 1.0 } else { -1.0 };
                match &operand.kind {
                    ExprKind::Variable { name, binding } => {
                        let current = self.lookup(name, binding)?;
                        let Value::Number(n) = self.force(current)? else {
                            return Err(RuntimeError::type_error("Operand must be a number.").into());
                        };
                        let next = Value::Number(n + delta);
                        self.store(name, binding, next.clone())?;
                        Ok(next)
                    }
                    ExprKind::Literal(Literal::Number(n)) => Ok(Value::Number(n + delta)),
                    _ => Err(RuntimeError::type_error("Operand must be a variable.").into()),
                }
            }
        }
    }

    fn eval_dict(&mut self, entries: &[DictEntry]) -> Result<Value, RuntimeDiagnostic> {
        let mut map = IndexMap::new();
        for entry in entries {
            match entry {
                DictEntry::Pair { key, value } => {
                    let value = self.eval_expr(value)?;
                    self.env.define(key.clone(), value.clone());
                    map.insert(key.clone(), value);
                }
                DictEntry::Spread(inner) => match self.eval_forced(inner)? {
                    Value::Dict(other) => {
                        let other = other.lock().clone();
                        map.extend(other);
                    }
                    _ => {
                        return Err(RuntimeError::type_error(
                            "Only dictionaries can be spread inside other dictionaries.",
                        )
                        .into())
                    }
                },
            }
        }
        Ok(Value::dict(map))
    }
}

/// Elements spliced into an array literal by `...value`.
fn spread_items(value: Value) -> Result<Vec<Value>, RuntimeError> {
    match value {
        Value::Array(items) => Ok(items.lock().clone()),
        Value::Dict(entries) => Ok(entries.lock().values().cloned().collect()),
        _ => Err(RuntimeError::type_error(
            "Only arrays and objects can be spread.",
        )),
    }
}
