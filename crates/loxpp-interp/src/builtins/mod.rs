// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Built-in methods of arrays and boxed strings.
//!
//! Property access on an array or string yields a [`BuiltinMethod`] bound to
//! the receiver; calling it lands here.

mod arrays;
mod strings;

pub use arrays::ARRAY_METHODS;
pub use strings::STRING_METHODS;

use crate::interp::{Interpreter, RuntimeDiagnostic, RuntimeError};
use crate::value::{BuiltinMethod, Value};

impl Interpreter {
    pub(crate) fn call_builtin_method(
        &mut self,
        method: &BuiltinMethod,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeDiagnostic> {
        match &method.receiver {
            Value::Array(items) => self.call_array_method(items, method.name, args),
            Value::String(s) => self.call_string_method(s, method.name, args),
            other => Err(RuntimeError::NoSuchMethod {
                ty: other.type_name().to_string(),
                method: method.name.to_string(),
            }
            .into()),
        }
    }

    /// The `index`th argument, forced.
    pub(crate) fn arg(&mut self, args: &[Value], index: usize) -> Result<Value, RuntimeDiagnostic> {
        match args.get(index) {
            Some(value) => self.force(value.clone()),
            None => Ok(Value::Null),
        }
    }

    pub(crate) fn expect_number(
        &mut self,
        args: &[Value],
        index: usize,
        method: &str,
    ) -> Result<f64, RuntimeDiagnostic> {
        match self.arg(args, index)? {
            Value::Number(n) => Ok(n),
            _ => Err(RuntimeError::type_error(format!("'{method}' expects a number.")).into()),
        }
    }

    pub(crate) fn expect_string(
        &mut self,
        args: &[Value],
        index: usize,
        method: &str,
    ) -> Result<String, RuntimeDiagnostic> {
        match self.arg(args, index)? {
            Value::String(s) => Ok(s.lock().clone()),
            _ => Err(RuntimeError::type_error(format!("'{method}' expects a string.")).into()),
        }
    }
}

fn expect_args(args: &[Value], expected: usize) -> Result<(), RuntimeError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(RuntimeError::ArityMismatch {
            expected,
            got: args.len(),
        })
    }
}

/// Character index `n` as a slot in `0..=len` when `inclusive`, else
/// `0..len`.
fn char_index(n: f64, len: usize, inclusive: bool) -> Result<usize, RuntimeError> {
    let limit = if inclusive { len + 1 } else { len };
    if n.fract() != 0.0 || n < 0.0 || n as usize >= limit {
        return Err(RuntimeError::IndexOutOfBounds { index: n, len });
    }
    Ok(n as usize)
}
