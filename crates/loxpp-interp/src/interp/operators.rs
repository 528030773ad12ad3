// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Binary operators and the operator-overload protocols.

use loxpp_ast::expr::BinOp;

use crate::value::Value;

use super::{Interpreter, RuntimeDiagnostic, RuntimeError};

/// Protocol trait and method an instance left operand dispatches to.
fn overload(op: BinOp) -> Option<(&'static str, &'static str)> {
    Some(match op {
        BinOp::Add => ("Computable", "_add"),
        BinOp::Sub => ("Computable", "_sub"),
        BinOp::Mul => ("Computable", "_mul"),
        BinOp::Div => ("Computable", "_div"),
        BinOp::Eq => ("Comparable", "_eq"),
        BinOp::Ne => ("Comparable", "_neq"),
        BinOp::Lt => ("Comparable", "_lt"),
        BinOp::Gt => ("Comparable", "_gt"),
        BinOp::Le => ("Comparable", "_lte"),
        BinOp::Ge => ("Comparable", "_gte"),
        _ => return None,
    })
}

impl Interpreter {
    /// Apply `op` to two forced operands.
    pub(crate) fn binary_op(&mut self, op: BinOp, l: Value, r: Value) -> Result<Value, RuntimeDiagnostic> {
        if let (Value::Instance(instance), Some((protocol, method))) = (&l, overload(op)) {
            if !instance.class.has_trait(protocol) {
                return Err(RuntimeError::MissingProtocol {
                    class: instance.class.name.clone(),
                    protocol,
                }
                .into());
            }
            if let Some(found) = instance.class.find_method(method) {
                let bound = found.bind(l.clone());
                return self.call_closure(&bound, vec![r]);
            }
        }

        match op {
            BinOp::Add => self.add(l, r),
            BinOp::Sub => arith(l, r, |a, b| a - b),
            BinOp::Mul => arith(l, r, |a, b| a * b),
            BinOp::Div => arith(l, r, |a, b| a / b),
            BinOp::Mod => arith(l, r, |a, b| a % b),
            BinOp::Pow => arith(l, r, f64::powf),
            BinOp::Lt => compare(l, r, |a, b| a < b),
            BinOp::Gt => compare(l, r, |a, b| a > b),
            BinOp::Le => compare(l, r, |a, b| a <= b),
            BinOp::Ge => compare(l, r, |a, b| a >= b),
            BinOp::Eq => Ok(Value::Bool(l.equals(&r))),
            BinOp::Ne => Ok(Value::Bool(!l.equals(&r))),
            BinOp::Is => Ok(Value::Bool(is_a(&l, &r))),
            BinOp::Range => self.range(l, r),
        }
    }

    fn add(&mut self, l: Value, r: Value) -> Result<Value, RuntimeDiagnostic> {
        if let (Value::Number(a), Value::Number(b)) = (&l, &r) {
            return Ok(Value::Number(a + b));
        }
        let concatenable = |v: &Value| {
            matches!(
                v,
                Value::Number(_) | Value::String(_) | Value::Dict(_) | Value::Array(_)
            )
        };
        if concatenable(&l) && concatenable(&r) {
            let mut out = self.stringify(&l)?;
            out.push_str(&self.stringify(&r)?);
            return Ok(Value::string(out));
        }
        Err(RuntimeError::type_error("Operands must be two numbers or two strings.").into())
    }

    fn range(&mut self, l: Value, r: Value) -> Result<Value, RuntimeDiagnostic> {
        if !matches!((&l, &r), (Value::Number(_), Value::Number(_))) {
            return Err(RuntimeError::type_error("Range bounds must be numbers.").into());
        }
        let range = self.globals.get("Range")?;
        self.call_value(range, vec![l, r])
    }
}

fn arith(l: Value, r: Value, f: impl Fn(f64, f64) -> f64) -> Result<Value, RuntimeDiagnostic> {
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(f(a, b))),
        _ => Err(RuntimeError::type_error("Operands must be numbers.").into()),
    }
}

fn compare(l: Value, r: Value, f: impl Fn(f64, f64) -> bool) -> Result<Value, RuntimeDiagnostic> {
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(f(a, b))),
        _ => Err(RuntimeError::type_error("Operands must be numbers.").into()),
    }
}

/// `value is target`: nominal for classes, by kind for type tags, false
/// for anything else.
fn is_a(value: &Value, target: &Value) -> bool {
    match (value, target) {
        (Value::Instance(instance), Value::Class(class)) => instance.class.is_subclass_of(class),
        (_, Value::Type(tag)) => tag.matches(value),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::TypeTag;

    #[test]
    fn arithmetic_requires_numbers() {
        assert!(matches!(
            arith(Value::Number(6.0), Value::Number(4.0), |a, b| a - b),
            Ok(Value::Number(n)) if n == 2.0
        ));
        let err = arith(Value::string("a"), Value::Number(1.0), |a, b| a * b).unwrap_err();
        assert_eq!(err.to_string(), "Operands must be numbers.");
    }

    #[test]
    fn is_checks_type_tags() {
        assert!(is_a(&Value::Number(1.0), &Value::Type(TypeTag::Number)));
        assert!(!is_a(&Value::Number(1.0), &Value::Type(TypeTag::String)));
        assert!(!is_a(&Value::Number(1.0), &Value::Number(1.0)));
    }
}
