// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Lexical scope stack used while resolving.

use std::collections::HashMap;

use loxpp_ast::Span;

#[derive(Debug, Clone, Copy)]
struct Slot {
    defined: bool,
    span: Span,
}

/// One lexical scope: names declared in it and whether their
/// initializer has finished.
#[derive(Debug, Default)]
pub struct Scope {
    slots: HashMap<String, Slot>,
}

/// Stack of local scopes. Globals are never pushed; a name not found in
/// any scope is global.
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    pub fn push(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    /// Mark `name` present but not yet usable. Returns the previous span
    /// when the name already exists in the innermost scope.
    pub fn declare(&mut self, name: &str, span: Span) -> Result<(), Span> {
        let Some(scope) = self.scopes.last_mut() else {
            return Ok(());
        };
        if let Some(prev) = scope.slots.get(name) {
            return Err(prev.span);
        }
        scope.slots.insert(
            name.to_string(),
            Slot {
                defined: false,
                span,
            },
        );
        Ok(())
    }

    pub fn define(&mut self, name: &str, span: Span) {
        if let Some(scope) = self.scopes.last_mut() {
            scope
                .slots
                .entry(name.to_string())
                .and_modify(|slot| slot.defined = true)
                .or_insert(Slot {
                    defined: true,
                    span,
                });
        }
    }

    /// True when `name` is declared in the innermost scope but its
    /// initializer is still being resolved.
    pub fn is_uninitialized(&self, name: &str) -> bool {
        self.scopes
            .last()
            .and_then(|s| s.slots.get(name))
            .is_some_and(|slot| !slot.defined)
    }

    /// Number of scopes between the innermost one and the one declaring `name`.
    pub fn depth_of(&self, name: &str) -> Option<usize> {
        self.scopes
            .iter()
            .rev()
            .position(|scope| scope.slots.contains_key(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_counts_outward() {
        let mut stack = ScopeStack::default();
        let span = Span::default();
        stack.push();
        stack.define("a", span);
        stack.push();
        stack.push();
        stack.define("b", span);
        assert_eq!(stack.depth_of("b"), Some(0));
        assert_eq!(stack.depth_of("a"), Some(2));
        assert_eq!(stack.depth_of("zzz"), None);
    }

    #[test]
    fn declare_then_define() {
        let mut stack = ScopeStack::default();
        stack.push();
        assert!(stack.declare("x", Span::new(1, 2)).is_ok());
        assert!(stack.is_uninitialized("x"));
        stack.define("x", Span::new(1, 2));
        assert!(!stack.is_uninitialized("x"));
        assert_eq!(stack.declare("x", Span::new(5, 6)), Err(Span::new(1, 2)));
    }

    #[test]
    fn globals_are_not_tracked() {
        let mut stack = ScopeStack::default();
        assert!(stack.declare("x", Span::default()).is_ok());
        assert!(stack.declare("x", Span::default()).is_ok());
        assert_eq!(stack.depth_of("x"), None);
    }
}
