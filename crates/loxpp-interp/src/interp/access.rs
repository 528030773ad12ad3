// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Property access and subscripting.

use std::sync::Arc;

use crate::builtins::{ARRAY_METHODS, STRING_METHODS};
use crate::value::{BuiltinMethod, Value};

use super::{Interpreter, RuntimeDiagnostic, RuntimeError};

impl Interpreter {
    pub(crate) fn get_property(&mut self, object: Value, name: &str) -> Result<Value, RuntimeDiagnostic> {
        match &object {
            Value::Instance(instance) => {
                if let Some(value) = instance.field(name) {
                    return Ok(value);
                }
                match instance.class.find_method(name) {
                    Some(method) => Ok(Value::Function(method.bind(object.clone()))),
                    None => Err(RuntimeError::UndefinedProperty(name.to_string()).into()),
                }
            }
            Value::Class(class) => {
                if let Some(value) = class.statics.lock().get(name).cloned() {
                    return Ok(value);
                }
                match class.static_method(name) {
                    Some(method) => Ok(Value::Function(method)),
                    None => Err(RuntimeError::UndefinedProperty(name.to_string()).into()),
                }
            }
            Value::Array(items) => {
                if let Ok(index) = name.parse::<usize>() {
                    let items = items.lock();
                    let i = normalize_index(&Value::Number(index as f64), items.len())?;
                    return Ok(items[i].clone());
                }
                builtin_method(object.clone(), name, ARRAY_METHODS, "Array")
            }
            Value::String(_) => builtin_method(object.clone(), name, STRING_METHODS, "String"),
            Value::Dict(entries) => Ok(entries.lock().get(name).cloned().unwrap_or(Value::Null)),
            Value::Enum(e) => {
                let variant = e.variants.get(name).ok_or_else(|| RuntimeError::NoSuchVariant {
                    name: e.name.clone(),
                    variant: name.to_string(),
                })?;
                if variant.params.is_empty() {
                    Ok(Value::string(variant.name.clone()))
                } else {
                    Ok(Value::Variant(Arc::clone(variant)))
                }
            }
            Value::Tuple(items) => {
                let Ok(index) = name.parse::<usize>() else {
                    return Err(RuntimeError::UndefinedProperty(name.to_string()).into());
                };
                items.get(index).cloned().ok_or_else(|| {
                    RuntimeError::Generic("Index out of bounds for tuple access.".to_string()).into()
                })
            }
            Value::Namespace(namespace) => {
                namespace.members.get(name).cloned().ok_or_else(|| {
                    RuntimeError::UndefinedMember {
                        namespace: namespace.name.clone(),
                        member: name.to_string(),
                    }
                    .into()
                })
            }
            _ => Err(RuntimeError::type_error(
                "Only instances, arrays, dictionaries and tuples have properties.",
            )
            .into()),
        }
    }

    pub(crate) fn set_property(&mut self, object: Value, name: &str, value: Value) -> Result<(), RuntimeDiagnostic> {
        match object {
            Value::Instance(instance) => instance.set_field(name, value),
            Value::Class(class) => {
                class.statics.lock().insert(name.to_string(), value);
            }
            Value::Dict(entries) => {
                entries.lock().insert(name.to_string(), value);
            }
            _ => return Err(RuntimeError::type_error("Only instances have fields.").into()),
        }
        Ok(())
    }

    pub(crate) fn index_get(&mut self, object: Value, index: Value) -> Result<Value, RuntimeDiagnostic> {
        match &object {
            Value::Dict(entries) => {
                let key = dict_key(&index)?;
                Ok(entries.lock().get(&key).cloned().unwrap_or(Value::Null))
            }
            Value::Array(items) => {
                let items = items.lock();
                let i = normalize_index(&index, items.len())?;
                Ok(items[i].clone())
            }
            Value::Tuple(items) => {
                let i = normalize_index(&index, items.len())?;
                Ok(items[i].clone())
            }
            Value::String(s) => {
                let chars: Vec<char> = s.lock().chars().collect();
                let i = normalize_index(&index, chars.len())?;
                Ok(Value::string(chars[i].to_string()))
            }
            Value::Instance(instance) => {
                if !instance.class.has_trait("Indexable") {
                    return Err(RuntimeError::MissingProtocol {
                        class: instance.class.name.clone(),
                        protocol: "Indexable",
                    }
                    .into());
                }
                self.invoke(object.clone(), "get", vec![index])
            }
            other => Err(RuntimeError::type_error(format!(
                "Value of type '{}' cannot be indexed.",
                other.type_name()
            ))
            .into()),
        }
    }

    pub(crate) fn index_set(&mut self, object: Value, index: Value, value: Value) -> Result<(), RuntimeDiagnostic> {
        match &object {
            Value::Dict(entries) => {
                let key = dict_key(&index)?;
                entries.lock().insert(key, value);
            }
            Value::Array(items) => {
                let mut items = items.lock();
                let i = normalize_index(&index, items.len())?;
                items[i] = value;
            }
            Value::Tuple(_) => return Err(RuntimeError::type_error("Tuples are immutable.").into()),
            Value::Instance(instance) => {
                if !instance.class.has_trait("Indexable") {
                    return Err(RuntimeError::MissingProtocol {
                        class: instance.class.name.clone(),
                        protocol: "Indexable",
                    }
                    .into());
                }
                self.invoke(object.clone(), "set", vec![index, value])?;
            }
            other => {
                return Err(RuntimeError::type_error(format!(
                    "Value of type '{}' does not support index assignment.",
                    other.type_name()
                ))
                .into())
            }
        }
        Ok(())
    }
}

fn builtin_method(
    receiver: Value,
    name: &str,
    table: &[&'static str],
    ty: &str,
) -> Result<Value, RuntimeDiagnostic> {
    match table.iter().find(|m| **m == name) {
        Some(&method) => Ok(Value::Method(Arc::new(BuiltinMethod {
            receiver,
            name: method,
        }))),
        None => Err(RuntimeError::NoSuchMethod {
            ty: ty.to_string(),
            method: name.to_string(),
        }
        .into()),
    }
}

fn dict_key(index: &Value) -> Result<String, RuntimeError> {
    index
        .as_string()
        .ok_or_else(|| RuntimeError::type_error("Dictionary keys must be strings."))
}

/// Turn a user index into a slot in `0..len`. Negative indices count from
/// the end.
pub(crate) fn normalize_index(index: &Value, len: usize) -> Result<usize, RuntimeError> {
    let n = match index {
        Value::Number(n) if n.is_finite() && n.fract() == 0.0 => *n,
        Value::Number(n) => return Err(RuntimeError::InvalidIndex(n.to_string())),
        other => return Err(RuntimeError::InvalidIndex(other.type_name().to_string())),
    };
    let out_of_bounds = RuntimeError::IndexOutOfBounds { index: n, len };
    if len == 0 {
        return Err(out_of_bounds);
    }
    let i = if n < 0.0 {
        (n as i64).rem_euclid(len as i64) as usize
    } else {
        n as usize
    };
    if i >= len {
        return Err(out_of_bounds);
    }
    Ok(i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_indices_wrap() {
        assert_eq!(normalize_index(&Value::Number(-1.0), 5).unwrap(), 4);
        assert_eq!(normalize_index(&Value::Number(-6.0), 5).unwrap(), 4);
        assert_eq!(normalize_index(&Value::Number(2.0), 5).unwrap(), 2);
    }

    #[test]
    fn rejects_bad_indices() {
        assert!(matches!(
            normalize_index(&Value::Number(5.0), 5),
            Err(RuntimeError::IndexOutOfBounds { len: 5, .. })
        ));
        assert!(matches!(
            normalize_index(&Value::Number(1.5), 5),
            Err(RuntimeError::InvalidIndex(_))
        ));
        assert!(normalize_index(&Value::Number(-1.0), 0).is_err());
        assert!(normalize_index(&Value::Null, 3).is_err());
    }
}
