// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Static binding-depth resolution for Lox++.
//!
//! Walks the AST once, records on every local name reference how many
//! scopes the interpreter must cross to reach its frame, and rejects
//! illegal programs (`return` at top level, `super` outside a subclass,
//! reading a local in its own initializer, and so on). All errors are
//! collected before giving up.

mod error;
mod resolver;
mod scope;

pub use error::{ResolveError, ResolveErrorKind};
pub use resolver::Resolver;
pub use scope::ScopeStack;

use loxpp_ast::stmt::Stmt;
use loxpp_ast::{NodeId, Span};

/// One resolved name reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRef {
    pub id: NodeId,
    pub name: String,
    pub span: Span,
    /// `None` for globals
    pub depth: Option<usize>,
}

/// Result of a successful resolution. The depths themselves live on the
/// AST nodes; this is the inspectable record of what was resolved.
#[derive(Debug, Default)]
pub struct Resolution {
    pub refs: Vec<ResolvedRef>,
}

/// Resolve a program, annotating its name references in place.
pub fn resolve(stmts: &[Stmt]) -> Result<Resolution, Vec<ResolveError>> {
    Resolver::resolve(stmts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(src: &str) -> Vec<Stmt> {
        let lexed = loxpp_lexer::Lexer::new(src).tokenize();
        assert!(lexed.is_ok(), "Lex errors: {:?}", lexed.errors);
        let parsed = loxpp_parser::Parser::new(lexed.tokens).parse();
        assert!(parsed.is_ok(), "Parse errors: {:?}", parsed.errors);
        parsed.stmts
    }

    fn depths(src: &str) -> Vec<(String, Option<usize>)> {
        let stmts = parse(src);
        let resolution = resolve(&stmts).expect("resolution should succeed");
        resolution
            .refs
            .into_iter()
            .map(|r| (r.name, r.depth))
            .collect()
    }

    fn messages(src: &str) -> Vec<String> {
        let stmts = parse(src);
        match resolve(&stmts) {
            Ok(_) => Vec::new(),
            Err(errors) => errors.iter().map(|e| e.to_string()).collect(),
        }
    }

    #[test]
    fn globals_have_no_depth() {
        assert_eq!(
            depths("let a = 1; println(a);"),
            vec![("println".to_string(), None), ("a".to_string(), None)]
        );
    }

    #[test]
    fn block_locals_and_shadowing() {
        assert_eq!(
            depths("{ let x = 1; { let y = x; { println(y); } } }"),
            vec![
                ("x".to_string(), Some(1)),
                ("println".to_string(), None),
                ("y".to_string(), Some(1)),
            ]
        );
    }

    #[test]
    fn closure_captures_outer_parameter() {
        assert_eq!(
            depths("fn outer(a) { return fn (b) -> a + b; }"),
            vec![("a".to_string(), Some(1)), ("b".to_string(), Some(0))]
        );
    }

    #[test]
    fn self_and_super_depths_in_methods() {
        let refs = depths(
            "class A { fn f() {} }
             class B extends A { fn g(x) { self.h = x; super.f(); } }",
        );
        assert_eq!(
            refs,
            vec![
                ("A".to_string(), None),
                ("x".to_string(), Some(0)),
                ("self".to_string(), Some(1)),
                ("super".to_string(), Some(2)),
            ]
        );
    }

    #[test]
    fn static_methods_see_self_type() {
        let refs = depths("class A { static fn make() { return Self(); } }");
        assert_eq!(refs, vec![("Self".to_string(), Some(1))]);
    }

    #[test]
    fn for_in_binds_key_and_value_per_iteration() {
        let refs = depths("{ let d = {}; for k, v in d { println(k, v); } }");
        assert_eq!(refs[0], ("d".to_string(), Some(0)));
        assert_eq!(refs[2], ("k".to_string(), Some(0)));
        assert_eq!(refs[3], ("v".to_string(), Some(0)));
    }

    #[test]
    fn dictionary_keys_are_visible_to_later_entries() {
        let refs = depths("let d = { a: 1, b: a + 1 };");
        assert_eq!(refs, vec![("a".to_string(), Some(0))]);
    }

    #[test]
    fn catch_binding_is_scoped() {
        let refs = depths("try { throw 1; } catch e { println(e); }");
        assert_eq!(refs[1], ("e".to_string(), Some(0)));
    }

    #[test]
    fn read_in_own_initializer() {
        assert_eq!(
            messages("{ let a = a; }"),
            vec!["Can't read local variable 'a' in its own initializer."]
        );
        // fine at global scope
        assert!(messages("let a = 1; let a = a;").is_empty());
    }

    #[test]
    fn duplicate_local() {
        assert_eq!(
            messages("fn f() { let a; let a; }"),
            vec!["Already a variable named 'a' in this scope."]
        );
    }

    #[test]
    fn return_rules() {
        assert_eq!(messages("return 1;"), vec!["Can't return from top-level code."]);
        assert_eq!(
            messages("class A { fn init() { return 1; } }"),
            vec!["Can't return a value from an initializer."]
        );
        assert!(messages("class A { fn init() { return; } }").is_empty());
    }

    #[test]
    fn self_and_super_misuse() {
        assert_eq!(messages("self;"), vec!["Can't use 'self' outside of a class."]);
        assert_eq!(
            messages("fn f() { super.g(); }"),
            vec!["Can't use 'super' outside of a class."]
        );
        assert_eq!(
            messages("class A { fn f() { super.f(); } }"),
            vec!["Can't use 'super' in a class with no superclass."]
        );
        assert_eq!(
            messages("trait T { fn f() { super.f(); } }"),
            vec!["Can't use 'super' in a trait."]
        );
        assert_eq!(
            messages("class A { static fn f() { return self; } }"),
            vec!["Can't use 'self' in a static method."]
        );
    }

    #[test]
    fn self_inheritance() {
        assert_eq!(messages("class A extends A {}"), vec!["A class can't inherit from itself."]);
    }

    #[test]
    fn loop_control_outside_loops() {
        assert_eq!(messages("break;"), vec!["Can't use 'break' outside of a loop."]);
        assert_eq!(
            messages("while true { fn f() { continue; } }"),
            vec!["Can't use 'continue' outside of a loop."]
        );
        assert!(messages("for (let i = 0; i < 3; i = i + 1) { if i == 1 continue; break; }").is_empty());
    }

    #[test]
    fn duplicate_methods() {
        assert_eq!(
            messages("class A { fn f() {} fn f() {} }"),
            vec!["Method 'f' is already defined in 'A'."]
        );
    }

    #[test]
    fn errors_are_collected() {
        assert_eq!(messages("return; break; self;").len(), 3);
    }

    #[test]
    fn depths_are_written_onto_nodes() {
        use loxpp_ast::expr::ExprKind;
        use loxpp_ast::stmt::StmtKind;

        let stmts = parse("{ let a = 1; a; }");
        resolve(&stmts).expect("resolution should succeed");
        let StmtKind::Block(ref inner) = stmts[0].kind else {
            panic!("Expected block");
        };
        let StmtKind::Expression(ref e) = inner[1].kind else {
            panic!("Expected expression");
        };
        let ExprKind::Variable { ref binding, .. } = e.kind else {
            panic!("Expected variable");
        };
        assert_eq!(binding.depth(), Some(0));
    }
}
