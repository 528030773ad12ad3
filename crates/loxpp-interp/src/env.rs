// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Scope chain for variable bindings.
//!
//! Frames are reference counted and linked to a parent fixed at creation,
//! so closures can keep their defining frame alive while the chain itself
//! never forms a cycle.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::interp::RuntimeError;
use crate::value::Value;

struct Frame {
    values: Mutex<HashMap<String, Value>>,
    parent: Option<Env>,
}

/// Handle to one frame of the scope chain.
#[derive(Clone)]
pub struct Env(Arc<Frame>);

impl Env {
    /// A frame with no parent.
    pub fn global() -> Self {
        Env(Arc::new(Frame {
            values: Mutex::new(HashMap::new()),
            parent: None,
        }))
    }

    /// A new frame whose parent is `self`.
    pub fn child(&self) -> Self {
        Env(Arc::new(Frame {
            values: Mutex::new(HashMap::new()),
            parent: Some(self.clone()),
        }))
    }

    pub fn parent(&self) -> Option<&Env> {
        self.0.parent.as_ref()
    }

    /// Insert or overwrite `name` in this frame.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.0.values.lock().insert(name.into(), value);
    }

    /// Look `name` up through the parent links.
    pub fn get(&self, name: &str) -> Result<Value, RuntimeError> {
        let mut frame = Some(self);
        while let Some(env) = frame {
            if let Some(value) = env.0.values.lock().get(name) {
                return Ok(value.clone());
            }
            frame = env.parent();
        }
        Err(RuntimeError::UndefinedVariable(name.to_string()))
    }

    /// Overwrite the nearest existing binding of `name`.
    pub fn assign(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        let mut frame = Some(self);
        while let Some(env) = frame {
            let mut values = env.0.values.lock();
            if let Some(slot) = values.get_mut(name) {
                *slot = value;
                return Ok(());
            }
            drop(values);
            frame = env.parent();
        }
        Err(RuntimeError::UndefinedVariable(name.to_string()))
    }

    /// The frame `depth` parent links away.
    pub fn ancestor(&self, depth: usize) -> Option<&Env> {
        let mut env = self;
        for _ in 0..depth {
            env = env.parent()?;
        }
        Some(env)
    }

    /// Read `name` directly from the frame at `depth`, without searching.
    pub fn get_at(&self, depth: usize, name: &str) -> Result<Value, RuntimeError> {
        self.ancestor(depth)
            .and_then(|env| env.0.values.lock().get(name).cloned())
            .ok_or_else(|| RuntimeError::UndefinedVariable(name.to_string()))
    }

    pub fn assign_at(&self, depth: usize, name: &str, value: Value) -> Result<(), RuntimeError> {
        let env = self
            .ancestor(depth)
            .ok_or_else(|| RuntimeError::UndefinedVariable(name.to_string()))?;
        let mut values = env.0.values.lock();
        match values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RuntimeError::UndefinedVariable(name.to_string())),
        }
    }

    /// Snapshot of the bindings held directly in this frame.
    pub fn bindings(&self) -> Vec<(String, Value)> {
        let mut out: Vec<_> = self
            .0
            .values
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.0.values.lock().keys().cloned().collect();
        f.debug_struct("Env")
            .field("names", &names)
            .field("has_parent", &self.0.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_parents() {
        let global = Env::global();
        global.define("a", Value::Number(1.0));
        let inner = global.child().child();
        assert!(matches!(inner.get("a"), Ok(Value::Number(n)) if n == 1.0));
        assert!(inner.get("missing").is_err());
    }

    #[test]
    fn indexed_access_skips_shadowing() {
        let outer = Env::global();
        outer.define("x", Value::Number(1.0));
        let inner = outer.child();
        inner.define("x", Value::Number(2.0));

        assert!(matches!(inner.get_at(0, "x"), Ok(Value::Number(n)) if n == 2.0));
        assert!(matches!(inner.get_at(1, "x"), Ok(Value::Number(n)) if n == 1.0));

        inner.assign_at(1, "x", Value::Number(5.0)).unwrap();
        assert!(matches!(outer.get("x"), Ok(Value::Number(n)) if n == 5.0));
        assert!(matches!(inner.get("x"), Ok(Value::Number(n)) if n == 2.0));
    }

    #[test]
    fn assign_requires_existing_binding() {
        let env = Env::global();
        assert!(env.assign("nope", Value::Null).is_err());
        env.define("yes", Value::Null);
        assert!(env.assign("yes", Value::Bool(true)).is_ok());
        assert!(env.get_at(3, "yes").is_err());
    }

    #[test]
    fn bindings_are_sorted_and_local() {
        let parent = Env::global();
        parent.define("p", Value::Null);
        let env = parent.child();
        env.define("b", Value::Null);
        env.define("a", Value::Null);
        let names: Vec<String> = env.bindings().into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
