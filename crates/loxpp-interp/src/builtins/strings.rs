// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Methods on boxed strings. Indices count characters, not bytes.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::interp::{Interpreter, RuntimeDiagnostic, RuntimeError};
use crate::value::Value;

use super::{char_index, expect_args};

/// Largest string `repeat` will build.
const MAX_STRING_BYTES: usize = 1 << 30;

pub const STRING_METHODS: &[&str] = &[
    "length",
    "is_empty",
    "char_at",
    "substring",
    "index_of",
    "contains",
    "to_upper",
    "to_lower",
    "trim",
    "split",
    "append",
    "equals",
    "repeat",
    "starts_with",
    "ends_with",
    "to_number",
    "is_number",
];

impl Interpreter {
    pub(crate) fn call_string_method(
        &mut self,
        s: &Arc<Mutex<String>>,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeDiagnostic> {
        let expected = match method {
            "substring" => 2,
            "char_at" | "index_of" | "contains" | "split" | "append" | "equals" | "repeat"
            | "starts_with" | "ends_with" => 1,
            _ => 0,
        };
        expect_args(&args, expected)?;

        match method {
            "length" => Ok(Value::Number(s.lock().chars().count() as f64)),
            "is_empty" => Ok(Value::Bool(s.lock().is_empty())),
            "char_at" => {
                let n = self.expect_number(&args, 0, "char_at")?;
                let chars: Vec<char> = s.lock().chars().collect();
                let i = char_index(n, chars.len(), false)?;
                Ok(Value::string(chars[i].to_string()))
            }
            "substring" => {
                let start = self.expect_number(&args, 0, "substring")?;
                let end = self.expect_number(&args, 1, "substring")?;
                let chars: Vec<char> = s.lock().chars().collect();
                let start = char_index(start, chars.len(), true)?;
                let end = char_index(end, chars.len(), true)?;
                if start > end {
                    return Err(RuntimeError::IndexOutOfBounds {
                        index: start as f64,
                        len: end,
                    }
                    .into());
                }
                Ok(Value::string(chars[start..end].iter().collect::<String>()))
            }
            "index_of" => {
                let needle = self.expect_string(&args, 0, "index_of")?;
                let haystack = s.lock().clone();
                let index = haystack
                    .find(&needle)
                    .map_or(-1.0, |byte| haystack[..byte].chars().count() as f64);
                Ok(Value::Number(index))
            }
            "contains" => {
                let needle = self.expect_string(&args, 0, "contains")?;
                Ok(Value::Bool(s.lock().contains(&needle)))
            }
            "to_upper" => Ok(Value::string(s.lock().to_uppercase())),
            "to_lower" => Ok(Value::string(s.lock().to_lowercase())),
            "trim" => Ok(Value::string(s.lock().trim())),
            "split" => {
                let delim = self.expect_string(&args, 0, "split")?;
                let text = s.lock().clone();
                let parts: Vec<Value> = if delim.is_empty() {
                    text.chars().map(|c| Value::string(c.to_string())).collect()
                } else {
                    text.split(delim.as_str()).map(Value::string).collect()
                };
                Ok(Value::array(parts))
            }
            "append" => {
                let value = self.arg(&args, 0)?;
                let text = self.stringify(&value)?;
                s.lock().push_str(&text);
                Ok(Value::Null)
            }
            "equals" => {
                let other = self.arg(&args, 0)?;
                Ok(Value::Bool(other.as_string().is_some_and(|o| *s.lock() == o)))
            }
            "repeat" => {
                let n = self.expect_number(&args, 0, "repeat")?;
                if n < 0.0 || n.fract() != 0.0 {
                    return Err(RuntimeError::type_error(
                        "'repeat' expects a non-negative integer.",
                    )
                    .into());
                }
                let text = s.lock().clone();
                let fits = (n as usize)
                    .checked_mul(text.len())
                    .is_some_and(|total| total <= MAX_STRING_BYTES);
                if !fits {
                    return Err(RuntimeError::Generic(
                        "Repeated string would be too long.".to_string(),
                    )
                    .into());
                }
                Ok(Value::string(text.repeat(n as usize)))
            }
            "starts_with" => {
                let prefix = self.expect_string(&args, 0, "starts_with")?;
                Ok(Value::Bool(s.lock().starts_with(&prefix)))
            }
            "ends_with" => {
                let suffix = self.expect_string(&args, 0, "ends_with")?;
                Ok(Value::Bool(s.lock().ends_with(&suffix)))
            }
            "to_number" => {
                let text = s.lock().clone();
                text.trim().parse::<f64>().map(Value::Number).map_err(|_| {
                    RuntimeError::type_error(format!("Cannot convert '{text}' to a number.")).into()
                })
            }
            "is_number" => Ok(Value::Bool(s.lock().trim().parse::<f64>().is_ok())),
            _ => Err(RuntimeError::NoSuchMethod {
                ty: "String".to_string(),
                method: method.to_string(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn call(text: &str, method: &str, args: Vec<Value>) -> Result<Value, RuntimeDiagnostic> {
        let mut interp = Interpreter::new();
        let s = Arc::new(Mutex::new(text.to_string()));
        interp.call_string_method(&s, method, args)
    }

    #[test]
    fn indices_count_characters() {
        let v = call("héllo", "char_at", vec![Value::Number(1.0)]).unwrap();
        assert_eq!(v.as_string().unwrap(), "é");
        let v = call("héllo", "index_of", vec![Value::string("l")]).unwrap();
        assert!(matches!(v, Value::Number(n) if n == 2.0));
        let v = call("héllo", "substring", vec![Value::Number(1.0), Value::Number(3.0)]).unwrap();
        assert_eq!(v.as_string().unwrap(), "él");
    }

    #[test]
    fn append_mutates_in_place() {
        let mut interp = Interpreter::new();
        let s = Arc::new(Mutex::new("ab".to_string()));
        interp
            .call_string_method(&s, "append", vec![Value::Number(1.0)])
            .unwrap();
        assert_eq!(*s.lock(), "ab1");
    }

    #[test]
    fn number_conversion() {
        assert!(matches!(call("2.5", "to_number", vec![]), Ok(Value::Number(n)) if n == 2.5));
        let err = call("abc", "to_number", vec![]).unwrap_err();
        assert_eq!(err.to_string(), "Cannot convert 'abc' to a number.");
        assert!(matches!(call("x", "is_number", vec![]), Ok(Value::Bool(false))));
    }

    #[test]
    fn out_of_range_substring_fails() {
        assert!(call("abc", "substring", vec![Value::Number(2.0), Value::Number(9.0)]).is_err());
        assert!(call("abc", "substring", vec![Value::Number(2.0), Value::Number(1.0)]).is_err());
    }

    #[test]
    fn oversized_repeat_is_an_error() {
        let err = call("a", "repeat", vec![Value::Number(1e20)]).unwrap_err();
        assert_eq!(err.to_string(), "Repeated string would be too long.");
        let v = call("", "repeat", vec![Value::Number(1e20)]).unwrap();
        assert_eq!(v.as_string().unwrap(), "");
        let v = call("ab", "repeat", vec![Value::Number(3.0)]).unwrap();
        assert_eq!(v.as_string().unwrap(), "ababab");
    }
}
