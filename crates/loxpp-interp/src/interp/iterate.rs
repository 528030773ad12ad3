// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `for key, value in iterable` over every iterable kind.

use loxpp_ast::expr::Expr;
use loxpp_ast::stmt::Stmt;

use crate::value::Value;

use super::{Flow, Interpreter, RuntimeDiagnostic, RuntimeError};

impl Interpreter {
    pub(crate) fn exec_for_in(
        &mut self,
        key: &str,
        value: Option<&str>,
        iterable: &Expr,
        body: &[Stmt],
    ) -> Result<Flow, RuntimeDiagnostic> {
        let subject = self.eval_forced(iterable)?;

        let pairs: Vec<(Value, Value)> = match &subject {
            Value::Array(items) => indexed(items.lock().clone()),
            Value::Tuple(items) => indexed(items.as_ref().clone()),
            Value::String(s) => {
                let chars = s.lock().chars().map(|c| Value::string(c.to_string())).collect();
                indexed(chars)
            }
            Value::Dict(entries) => entries
                .lock()
                .iter()
                .map(|(k, v)| (Value::string(k.clone()), v.clone()))
                .collect(),
            Value::Instance(instance) => {
                if !instance.class.has_trait("Iterable") {
                    return Err(RuntimeError::MissingProtocol {
                        class: instance.class.name.clone(),
                        protocol: "Iterable",
                    }
                    .into());
                }
                return self.iterate_protocol(subject.clone(), key, value, body);
            }
            _ => {
                return Err(RuntimeError::type_error(
                    "For-in loops only work with arrays, tuples, dictionaries, strings and objects that implement the 'Iterable' trait.",
                )
                .into())
            }
        };

        for (k, v) in pairs {
            match self.run_iteration(key, k, value, v, body)? {
                Flow::Break => break,
                Flow::Return(v) => return Ok(Flow::Return(v)),
                Flow::Normal | Flow::Continue => {}
            }
        }
        Ok(Flow::Normal)
    }

    /// Drive an `Iterable` instance through `has_next` and `next`. The
    /// optional second name counts iterations.
    fn iterate_protocol(
        &mut self,
        subject: Value,
        key: &str,
        value: Option<&str>,
        body: &[Stmt],
    ) -> Result<Flow, RuntimeDiagnostic> {
        let has_next = self.get_property(subject.clone(), "has_next")?;
        let next = self.get_property(subject, "next")?;
        let mut count = 0.0;
        loop {
            let more = self.call_value(has_next.clone(), Vec::new())?;
            if !self.force(more)?.is_truthy() {
                break;
            }
            let item = self.call_value(next.clone(), Vec::new())?;
            match self.run_iteration(key, item, value, Value::Number(count), body)? {
                Flow::Break => break,
                Flow::Return(v) => return Ok(Flow::Return(v)),
                Flow::Normal | Flow::Continue => {}
            }
            count += 1.0;
        }
        Ok(Flow::Normal)
    }

    fn run_iteration(
        &mut self,
        key: &str,
        k: Value,
        value: Option<&str>,
        v: Value,
        body: &[Stmt],
    ) -> Result<Flow, RuntimeDiagnostic> {
        let env = self.env.child();
        env.define(key, k);
        if let Some(value) = value {
            env.define(value, v);
        }
        self.exec_block(body, env)
    }
}

/// Element first, position second.
fn indexed(items: Vec<Value>) -> Vec<(Value, Value)> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| (item, Value::Number(i as f64)))
        .collect()
}
