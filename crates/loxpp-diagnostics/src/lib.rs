// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Lox++ diagnostics.
//!
//! Lexing, parsing, resolution and execution each fail with their own
//! error type. [`ToDiagnostic`] turns any of them into a coded
//! [`Diagnostic`], which the CLI renders with [`DiagnosticFormatter`] or as
//! a JSON report. Every diagnostic stops the phase that raised it, so there
//! is no severity level.

pub mod codes;
pub mod convert;
pub mod formatter;
pub mod json;

use loxpp_ast::Span;
use serde::Serialize;

pub use codes::ErrorCategory;
pub use formatter::DiagnosticFormatter;

/// One coded error and the source spans it points at.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// Registered code such as `E0301`
    pub code: &'static str,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Label {
    pub span: Span,
    pub style: LabelStyle,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelStyle {
    /// Where the error happened, underlined with `^`
    Primary,
    /// A related location, underlined with `-`
    Secondary,
}

impl Diagnostic {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_primary(self, span: Span, message: impl Into<String>) -> Self {
        self.labeled(span, LabelStyle::Primary, message.into())
    }

    pub fn with_secondary(self, span: Span, message: impl Into<String>) -> Self {
        self.labeled(span, LabelStyle::Secondary, message.into())
    }

    fn labeled(mut self, span: Span, style: LabelStyle, message: String) -> Self {
        self.labels.push(Label {
            span,
            style,
            message,
        });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Where the error is reported: the span of the primary label.
    pub fn primary_span(&self) -> Option<Span> {
        self.labels
            .iter()
            .find(|label| label.style == LabelStyle::Primary)
            .map(|label| label.span)
    }

    pub fn category(&self) -> Option<ErrorCategory> {
        codes::registry().get(self.code).map(|info| info.category)
    }
}

/// Convert a phase error into a diagnostic.
pub trait ToDiagnostic {
    fn to_diagnostic(&self) -> Diagnostic;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_span_ignores_secondary_labels() {
        let diag = Diagnostic::new("E0201", "boom")
            .with_secondary(Span::new(0, 2), "first")
            .with_primary(Span::new(5, 8), "here");
        assert_eq!(diag.primary_span(), Some(Span::new(5, 8)));

        let unlabeled = Diagnostic::new("E0308", "Stack overflow.");
        assert_eq!(unlabeled.primary_span(), None);
    }

    #[test]
    fn category_comes_from_the_code() {
        assert_eq!(
            Diagnostic::new("E0403", "x").category(),
            Some(ErrorCategory::Protocol)
        );
        assert_eq!(Diagnostic::new("E9999", "x").category(), None);
    }
}
