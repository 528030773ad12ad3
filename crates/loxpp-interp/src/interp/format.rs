// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Value stringification, as used by `print` and `to_string`.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::stack;
use crate::value::Value;

use super::{Interpreter, RuntimeDiagnostic, RuntimeError};

impl Interpreter {
    pub(crate) fn stringify(&mut self, value: &Value) -> Result<String, RuntimeDiagnostic> {
        self.stringify_nested(value, &mut Vec::new())
    }

    /// `open` holds the arrays and dictionaries being printed further up;
    /// meeting one again prints `[...]` or `{...}` instead of recursing.
    fn stringify_nested(
        &mut self,
        value: &Value,
        open: &mut Vec<usize>,
    ) -> Result<String, RuntimeDiagnostic> {
        Ok(match value {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.lock().clone(),
            Value::Array(items) => {
                let id = Arc::as_ptr(items) as usize;
                if open.contains(&id) {
                    return Ok("[...]".to_string());
                }
                let items = items.lock().clone();
                if items.is_empty() {
                    return Ok("[]".to_string());
                }
                open.push(id);
                let joined = self.join(&items, open);
                open.pop();
                format!("[ {} ]", joined?)
            }
            Value::Tuple(items) => format!("({})", self.join(items, open)?),
            Value::Dict(entries) => {
                let id = Arc::as_ptr(entries) as usize;
                if open.contains(&id) {
                    return Ok("{...}".to_string());
                }
                let entries = entries.lock().clone();
                if entries.is_empty() {
                    return Ok("{}".to_string());
                }
                open.push(id);
                let parts = self.dict_parts(&entries, open);
                open.pop();
                format!("{{ {} }}", parts?.join(", "))
            }
            Value::Instance(instance) => match instance.class.find_method("to_string") {
                Some(method) => {
                    if !instance.class.has_trait("Printable") {
                        return Err(RuntimeError::Generic(
                            "Class must implement trait 'Printable' to declare a 'to_string' method."
                                .to_string(),
                        )
                        .into());
                    }
                    let bound = method.bind(value.clone());
                    let result = self.call_closure(&bound, Vec::new())?;
                    let result = self.force(result)?;
                    self.stringify(&result)?
                }
                None => format!("<instance {}>", instance.class.name),
            },
            Value::Function(closure) => match &closure.decl.name {
                Some(name) => format!("<fn {name}>"),
                None => "<lambda fn>".to_string(),
            },
            Value::Native(_) | Value::Method(_) => "<native fn>".to_string(),
            Value::Class(class) => format!("<class {}>", class.name),
            Value::Trait(tr) => format!("<trait {}>", tr.name),
            Value::Enum(e) => format!("<enum {}>", e.name),
            Value::Variant(v) => format!("<variant {}.{}>", v.enum_name, v.name),
            Value::Namespace(ns) => format!("<namespace {}>", ns.name),
            Value::Lazy(_) => {
                let forced = self.force(value.clone())?;
                self.stringify_nested(&forced, open)?
            }
            Value::Task(_) => "<task>".to_string(),
            Value::Type(tag) => format!("<type {}>", tag.name()),
            Value::Socket(_) => "<socket>".to_string(),
            Value::Listener(_) => "<listener>".to_string(),
        })
    }

    fn join(&mut self, items: &[Value], open: &mut Vec<usize>) -> Result<String, RuntimeDiagnostic> {
        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            let part = stack::ensure_sufficient_stack(|| self.stringify_nested(item, open))?;
            parts.push(part);
        }
        Ok(parts.join(", "))
    }

    fn dict_parts(
        &mut self,
        entries: &IndexMap<String, Value>,
        open: &mut Vec<usize>,
    ) -> Result<Vec<String>, RuntimeDiagnostic> {
        let mut parts = Vec::with_capacity(entries.len());
        for (k, v) in entries {
            let shown = stack::ensure_sufficient_stack(|| self.stringify_nested(v, open))?;
            parts.push(format!("{k}: {shown}"));
        }
        Ok(parts)
    }
}

/// Integral values print without a fractional part.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Interpreter;
    use pretty_assertions::assert_eq;

    #[test]
    fn numbers() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.5), "-0.5");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NAN), "NaN");
    }

    #[test]
    fn collections() {
        let mut interp = Interpreter::new();
        let array = Value::array(vec![Value::Number(1.0), Value::string("a")]);
        assert_eq!(interp.stringify(&array).unwrap(), "[ 1, a ]");
        assert_eq!(interp.stringify(&Value::array(vec![])).unwrap(), "[]");

        let tuple = Value::tuple(vec![Value::Bool(true), Value::Null]);
        assert_eq!(interp.stringify(&tuple).unwrap(), "(true, null)");

        let mut entries = IndexMap::new();
        entries.insert("b".to_string(), Value::Number(2.0));
        entries.insert("a".to_string(), Value::Number(1.5));
        assert_eq!(interp.stringify(&Value::dict(entries)).unwrap(), "{ b: 2, a: 1.5 }");
        assert_eq!(interp.stringify(&Value::dict(IndexMap::new())).unwrap(), "{}");
    }

    #[test]
    fn self_references_print_a_marker() {
        let mut interp = Interpreter::new();
        let array = Value::array(vec![Value::Number(1.0)]);
        if let Value::Array(items) = &array {
            items.lock().push(array.clone());
        }
        assert_eq!(interp.stringify(&array).unwrap(), "[ 1, [...] ]");

        let dict = Value::dict(IndexMap::new());
        if let Value::Dict(entries) = &dict {
            entries.lock().insert("me".to_string(), dict.clone());
        }
        assert_eq!(interp.stringify(&dict).unwrap(), "{ me: {...} }");
    }

    #[test]
    fn shared_children_print_in_full() {
        let mut interp = Interpreter::new();
        let inner = Value::array(vec![Value::Number(1.0)]);
        let outer = Value::array(vec![inner.clone(), inner]);
        assert_eq!(interp.stringify(&outer).unwrap(), "[ [ 1 ], [ 1 ] ]");
    }
}
