// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Conversions from phase error types to `Diagnostic`.

use crate::{Diagnostic, ToDiagnostic};
use loxpp_ast::Span;

// ============================================================================
// Lex Errors
// ============================================================================

impl ToDiagnostic for loxpp_lexer::LexError {
    fn to_diagnostic(&self) -> Diagnostic {
        let (code, label) = if self.message.starts_with("Unterminated") {
            ("E0002", "string starts here")
        } else if self.message.starts_with("Invalid number") {
            ("E0003", "not a valid number")
        } else {
            ("E0001", "unexpected character")
        };

        let mut diag = Diagnostic::new(code, self.message.as_str()).with_primary(self.span, label);

        if let Some(ref hint) = self.hint {
            diag = diag.with_help(hint.as_str());
        }

        diag
    }
}

// ============================================================================
// Parse Errors
// ============================================================================

impl ToDiagnostic for loxpp_parser::ParseError {
    fn to_diagnostic(&self) -> Diagnostic {
        let code = if self.message.starts_with("Expected") || self.message.starts_with("Unclosed") {
            "E0101"
        } else {
            "E0100"
        };

        let mut diag = Diagnostic::new(code, self.message.as_str()).with_primary(self.span, "here");

        if let Some(ref hint) = self.hint {
            diag = diag.with_help(hint.as_str());
        }

        diag
    }
}

// ============================================================================
// Resolve Errors
// ============================================================================

impl ToDiagnostic for loxpp_resolve::ResolveError {
    fn to_diagnostic(&self) -> Diagnostic {
        use loxpp_resolve::ResolveErrorKind::*;

        let message = self.kind.to_string();
        let mut diag = match &self.kind {
            ReadInOwnInitializer { name } => Diagnostic::new("E0200", message)
                .with_primary(self.span, format!("'{name}' is still being initialized")),

            AlreadyDeclared { previous, .. } => Diagnostic::new("E0201", message)
                .with_primary(self.span, "redeclared here")
                .with_secondary(*previous, "previously declared here"),

            TopLevelReturn => Diagnostic::new("E0202", message)
                .with_primary(self.span, "not inside a function"),

            ReturnFromInitializer => Diagnostic::new("E0203", message)
                .with_primary(self.span, "inside 'init'"),

            BreakOutsideLoop => Diagnostic::new("E0204", message)
                .with_primary(self.span, "cannot break here"),

            ContinueOutsideLoop => Diagnostic::new("E0205", message)
                .with_primary(self.span, "cannot continue here"),

            SelfOutsideClass | SelfInStatic => Diagnostic::new("E0206", message)
                .with_primary(self.span, "'self' is not bound here"),

            SuperOutsideClass | SuperInTrait | SuperWithoutSuperclass | SuperInStatic => {
                Diagnostic::new("E0207", message)
                    .with_primary(self.span, "'super' is not bound here")
            }

            InheritsFromItself { name } => Diagnostic::new("E0208", message)
                .with_primary(self.span, format!("'{name}' names the class being declared")),

            DuplicateMethod { owner, .. } => Diagnostic::new("E0209", message)
                .with_primary(self.span, format!("second definition in '{owner}'")),
        };

        if let Some(hint) = self.hint() {
            diag = diag.with_help(hint);
        }
        diag
    }
}

// ============================================================================
// Runtime Errors
// ============================================================================

impl ToDiagnostic for loxpp_interp::RuntimeDiagnostic {
    fn to_diagnostic(&self) -> Diagnostic {
        use loxpp_interp::RuntimeError::*;

        let (code, label) = match &self.error {
            UndefinedVariable(_) => ("E0301", "not defined".to_string()),
            UndefinedProperty(_) => ("E0302", "no such property".to_string()),
            UndefinedMember { namespace, .. } => ("E0312", format!("not a member of '{namespace}'")),
            NoSuchVariant { name, .. } => ("E0313", format!("not a variant of '{name}'")),
            TypeError(_) => ("E0303", "type mismatch".to_string()),
            ArityMismatch { expected, .. } => ("E0304", format!("expected {expected} arguments")),
            NoSuchMethod { ty, .. } => ("E0305", format!("not a method of {ty}")),
            IndexOutOfBounds { .. } => ("E0306", "out of bounds".to_string()),
            InvalidIndex(_) => ("E0307", "invalid index".to_string()),
            StackOverflow => ("E0308", "call nested too deeply".to_string()),
            LazyCycle => ("E0309", "forced while being computed".to_string()),
            AssertionFailed(_) => ("E0310", "assertion failed".to_string()),
            Io(_) => ("E0311", "i/o failed".to_string()),
            MissingProtocol { protocol, .. } => ("E0400", format!("requires '{protocol}'")),
            MissingAbstractMethod { tr, .. } => ("E0401", format!("required by '{tr}'")),
            ConflictingTraitMethod(_) => ("E0402", "conflicting definition".to_string()),
            SignatureMismatch { .. } => ("E0403", "signature differs from the trait".to_string()),
            Thrown { class, .. } => ("E0500", class.clone()),
            Generic(_) => ("E0300", "error".to_string()),
        };

        let mut diag = Diagnostic::new(code, self.error.to_string());
        if !self.span.is_empty() {
            diag = diag.with_primary(self.span, label);
        } else if let Thrown { class, .. } = &self.error {
            diag = diag.with_note(format!("thrown value is an instance of '{class}'"));
        }

        if let Some(hint) = self.error.hint() {
            diag = diag.with_help(hint);
        }
        diag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LabelStyle;
    use loxpp_interp::{RuntimeDiagnostic, RuntimeError, Value};
    use loxpp_resolve::{ResolveError, ResolveErrorKind};

    #[test]
    fn lex_errors_pick_codes_by_kind() {
        let result = loxpp_lexer::Lexer::new("\"open").tokenize();
        let diag = result.errors[0].to_diagnostic();
        assert_eq!(diag.code, "E0002");
        assert_eq!(diag.help.as_deref(), Some("Add a closing '\"'"));

        let result = loxpp_lexer::Lexer::new("#").tokenize();
        assert_eq!(result.errors[0].to_diagnostic().code, "E0001");
    }

    #[test]
    fn duplicate_declaration_points_at_both() {
        let err = ResolveError::already_declared("a", Span::new(20, 21), Span::new(4, 5));
        let diag = err.to_diagnostic();
        assert_eq!(diag.code, "E0201");
        assert_eq!(diag.labels.len(), 2);
        assert_eq!(diag.labels[1].style, LabelStyle::Secondary);
        assert_eq!(diag.labels[1].span, Span::new(4, 5));
        assert!(diag.help.is_some());
    }

    #[test]
    fn resolve_message_is_the_error_text() {
        let err = ResolveError::new(ResolveErrorKind::BreakOutsideLoop, Span::new(0, 5));
        let diag = err.to_diagnostic();
        assert_eq!(diag.message, "Can't use 'break' outside of a loop.");
        assert_eq!(diag.code, "E0204");
    }

    #[test]
    fn protocol_errors_carry_hints() {
        let err = RuntimeDiagnostic {
            error: RuntimeError::MissingProtocol {
                class: "Vec".to_string(),
                protocol: "Computable",
            },
            span: Span::new(3, 8),
        };
        let diag = err.to_diagnostic();
        assert_eq!(diag.code, "E0400");
        assert_eq!(diag.message, "Class 'Vec' does not implement trait 'Computable'.");
        let help = diag.help.unwrap_or_default();
        assert!(help.contains("'_add'"), "{help}");
    }

    #[test]
    fn thrown_values_are_labeled_with_their_class() {
        let err = RuntimeDiagnostic {
            error: RuntimeError::Thrown {
                value: Value::Null,
                class: "ParseFailure".to_string(),
                message: "bad input".to_string(),
            },
            span: Span::new(10, 30),
        };
        let diag = err.to_diagnostic();
        assert_eq!(diag.code, "E0500");
        assert_eq!(diag.message, "bad input");
        assert_eq!(diag.labels[0].message, "ParseFailure");
    }
}
