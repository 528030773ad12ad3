// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Host functions bound in the global frame before any user code runs.

pub mod net;

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::env::Env;
use crate::interp::{Interpreter, RuntimeDiagnostic, RuntimeError};
use crate::value::{Arity, NativeFn, NativeFnPtr, TypeTag, Value};

const NATIVES: &[(&str, Arity, NativeFnPtr)] = &[
    ("clock", Arity::Fixed(0), clock),
    ("random", Arity::Fixed(0), random),
    ("sin", Arity::Fixed(1), sin),
    ("cos", Arity::Fixed(1), cos),
    ("tan", Arity::Fixed(1), tan),
    ("sqrt", Arity::Fixed(1), sqrt),
    ("floor", Arity::Fixed(1), floor),
    ("sleep", Arity::Fixed(1), sleep),
    ("print", Arity::Variadic, print),
    ("println", Arity::Variadic, println),
    ("debug", Arity::Variadic, debug),
    ("to_string", Arity::Fixed(1), to_string),
    ("assert", Arity::Variadic, assert),
    ("len", Arity::Fixed(1), len),
    ("socket_connect", Arity::Fixed(2), net::socket_connect),
    ("socket_send", Arity::Fixed(2), net::socket_send),
    ("socket_receive", Arity::Fixed(2), net::socket_receive),
    ("socket_close", Arity::Fixed(1), net::socket_close),
    ("server_listen", Arity::Fixed(1), net::server_listen),
    ("server_port", Arity::Fixed(1), net::server_port),
    ("server_accept", Arity::Fixed(1), net::server_accept),
    ("server_close", Arity::Fixed(1), net::server_close),
];

/// Define every native and type tag in `globals`.
pub fn register(globals: &Env) {
    for &(name, arity, func) in NATIVES {
        globals.define(name, Value::Native(Arc::new(NativeFn { name, arity, func })));
    }
    for tag in TypeTag::ALL {
        globals.define(tag.name(), Value::Type(tag));
    }
    tracing::trace!(natives = NATIVES.len(), "registered natives");
}

fn number(name: &str, value: &Value) -> Result<f64, RuntimeError> {
    value
        .as_number()
        .ok_or_else(|| RuntimeError::type_error(format!("'{name}' expects a number.")))
}

fn clock(_: &mut Interpreter, _: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0);
    Ok(Value::Number(millis))
}

fn random(_: &mut Interpreter, _: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
    Ok(Value::Number(rand::random::<f64>()))
}

fn sin(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
    Ok(Value::Number(number("sin", &args[0])?.sin()))
}

fn cos(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
    Ok(Value::Number(number("cos", &args[0])?.cos()))
}

fn tan(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
    Ok(Value::Number(number("tan", &args[0])?.tan()))
}

fn sqrt(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
    Ok(Value::Number(number("sqrt", &args[0])?.sqrt()))
}

fn floor(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
    Ok(Value::Number(number("floor", &args[0])?.floor()))
}

fn sleep(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
    let ms = number("sleep", &args[0])?;
    if ms > 0.0 && ms.is_finite() {
        std::thread::sleep(Duration::from_secs_f64(ms / 1000.0));
    }
    Ok(Value::Null)
}

fn joined(interp: &mut Interpreter, args: &[Value]) -> Result<String, RuntimeDiagnostic> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        parts.push(interp.stringify(arg)?);
    }
    Ok(parts.join(" "))
}

fn print(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
    let text = joined(interp, &args)?;
    interp.write_output(&text);
    Ok(Value::Null)
}

fn println(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
    let mut text = joined(interp, &args)?;
    text.push('\n');
    interp.write_output(&text);
    Ok(Value::Null)
}

fn debug(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
    let text = joined(interp, &args)?;
    interp.write_debug(&text);
    Ok(Value::Null)
}

fn to_string(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
    Ok(Value::string(interp.stringify(&args[0])?))
}

fn assert(interp: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
    let Some(cond) = args.first() else {
        return Err(RuntimeError::ArityMismatch {
            expected: 1,
            got: 0,
        }
        .into());
    };
    if cond.is_truthy() {
        return Ok(Value::Null);
    }
    let message = match args.get(1) {
        Some(message) => interp.stringify(message)?,
        None => "condition is false".to_string(),
    };
    Err(RuntimeError::AssertionFailed(message).into())
}

fn len(_: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
    let n = match &args[0] {
        Value::Array(items) => items.lock().len(),
        Value::Tuple(items) => items.len(),
        Value::String(s) => s.lock().chars().count(),
        Value::Dict(entries) => entries.lock().len(),
        _ => {
            return Err(RuntimeError::type_error(
                "'len' expects an array, tuple, string or dictionary.",
            )
            .into())
        }
    };
    Ok(Value::Number(n as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_natives_and_type_tags() {
        let globals = Env::global();
        register(&globals);
        assert!(matches!(globals.get("println"), Ok(Value::Native(_))));
        assert!(matches!(globals.get("Tuple"), Ok(Value::Type(TypeTag::Tuple))));
    }

    #[test]
    fn assert_reports_message() {
        let mut interp = Interpreter::new();
        let err = assert(&mut interp, vec![Value::Bool(false), Value::string("nope")]).unwrap_err();
        assert_eq!(err.to_string(), "Assertion failed: nope");
        let err = assert(&mut interp, vec![Value::Null]).unwrap_err();
        assert_eq!(err.to_string(), "Assertion failed: condition is false");
    }

    #[test]
    fn len_counts_characters() {
        let mut interp = Interpreter::new();
        let n = len(&mut interp, vec![Value::string("añb")]).unwrap();
        assert!(matches!(n, Value::Number(n) if n == 3.0));
    }
}
