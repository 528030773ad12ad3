// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Methods on arrays.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::seq::SliceRandom;

use crate::interp::normalize_index;
use crate::interp::{Interpreter, RuntimeDiagnostic, RuntimeError};
use crate::value::Value;

use super::expect_args;

pub const ARRAY_METHODS: &[&str] = &[
    "get", "insert", "pop", "remove", "len", "is_empty", "clear", "shuffle", "map", "filter",
    "reduce", "contains", "join",
];

impl Interpreter {
    pub(crate) fn call_array_method(
        &mut self,
        items: &Arc<Mutex<Vec<Value>>>,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeDiagnostic> {
        if method != "insert" {
            let expected = match method {
                "get" | "remove" | "map" | "filter" | "contains" | "join" => 1,
                "reduce" => 2,
                _ => 0,
            };
            expect_args(&args, expected)?;
        }

        match method {
            "get" => {
                let index = self.arg(&args, 0)?;
                let items = items.lock();
                let i = normalize_index(&index, items.len())?;
                Ok(items[i].clone())
            }
            "insert" => {
                items.lock().extend(args);
                Ok(Value::Null)
            }
            "pop" => {
                let mut items = items.lock();
                if items.is_empty() {
                    return Err(RuntimeError::Generic("Array is empty.".to_string()).into());
                }
                Ok(items.remove(0))
            }
            "remove" => {
                let index = self.arg(&args, 0)?;
                let mut items = items.lock();
                let i = normalize_index(&index, items.len())?;
                Ok(items.remove(i))
            }
            "len" => Ok(Value::Number(items.lock().len() as f64)),
            "is_empty" => Ok(Value::Bool(items.lock().is_empty())),
            "clear" => {
                items.lock().clear();
                Ok(Value::Null)
            }
            "shuffle" => {
                items.lock().shuffle(&mut rand::thread_rng());
                Ok(Value::Null)
            }
            "map" => {
                let f = self.arg(&args, 0)?;
                let snapshot = items.lock().clone();
                let mut out = Vec::with_capacity(snapshot.len());
                for item in snapshot {
                    out.push(self.call_value(f.clone(), vec![item])?);
                }
                Ok(Value::array(out))
            }
            "filter" => {
                let f = self.arg(&args, 0)?;
                let snapshot = items.lock().clone();
                let mut out = Vec::new();
                for item in snapshot {
                    let keep = self.call_value(f.clone(), vec![item.clone()])?;
                    if self.force(keep)?.is_truthy() {
                        out.push(item);
                    }
                }
                Ok(Value::array(out))
            }
            "reduce" => {
                let f = self.arg(&args, 0)?;
                let mut acc = args[1].clone();
                let snapshot = items.lock().clone();
                for item in snapshot {
                    acc = self.call_value(f.clone(), vec![acc, item])?;
                }
                Ok(acc)
            }
            "contains" => {
                let needle = self.arg(&args, 0)?;
                let snapshot = items.lock().clone();
                for item in snapshot {
                    if self.force(item)?.equals(&needle) {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            "join" => {
                let sep = self.expect_string(&args, 0, "join")?;
                let snapshot = items.lock().clone();
                let mut parts = Vec::with_capacity(snapshot.len());
                for item in &snapshot {
                    parts.push(self.stringify(item)?);
                }
                Ok(Value::string(parts.join(&sep)))
            }
            _ => Err(RuntimeError::NoSuchMethod {
                ty: "Array".to_string(),
                method: method.to_string(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(values: &[f64]) -> Arc<Mutex<Vec<Value>>> {
        Arc::new(Mutex::new(values.iter().map(|n| Value::Number(*n)).collect()))
    }

    #[test]
    fn pop_takes_the_front() {
        let mut interp = Interpreter::new();
        let items = numbers(&[1.0, 2.0]);
        let first = interp.call_array_method(&items, "pop", vec![]).unwrap();
        assert!(matches!(first, Value::Number(n) if n == 1.0));
        assert_eq!(items.lock().len(), 1);

        interp.call_array_method(&items, "pop", vec![]).unwrap();
        let err = interp.call_array_method(&items, "pop", vec![]).unwrap_err();
        assert_eq!(err.to_string(), "Array is empty.");
    }

    #[test]
    fn insert_appends_every_argument() {
        let mut interp = Interpreter::new();
        let items = numbers(&[]);
        interp
            .call_array_method(&items, "insert", vec![Value::Number(1.0), Value::Number(2.0)])
            .unwrap();
        assert_eq!(items.lock().len(), 2);
    }

    #[test]
    fn shuffle_keeps_elements() {
        let mut interp = Interpreter::new();
        let items = numbers(&[1.0, 2.0, 3.0, 4.0]);
        interp.call_array_method(&items, "shuffle", vec![]).unwrap();
        let mut sorted: Vec<f64> = items.lock().iter().filter_map(Value::as_number).collect();
        sorted.sort_by(f64::total_cmp);
        assert_eq!(sorted, vec![1.0, 2.0, 3.0, 4.0]);
    }
}
