// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! JSON diagnostic output for machine consumption.
//!
//! Selected with `--format json`. Each diagnostic carries its code,
//! category, 1-based locations and the text of the line it points at.

use serde::Serialize;

use loxpp_ast::LineMap;

use crate::{Diagnostic, LabelStyle};

/// All diagnostics from one phase of one file.
#[derive(Debug, Serialize)]
pub struct DiagnosticReport {
    /// Schema version.
    pub version: u32,
    pub file: String,
    /// True when the phase reported nothing.
    pub success: bool,
    /// `lex`, `parse`, `resolve` or `runtime`.
    pub phase: String,
    pub diagnostics: Vec<JsonDiagnostic>,
    pub error_count: usize,
}

#[derive(Debug, Serialize)]
pub struct JsonDiagnostic {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    pub labels: Vec<JsonLabel>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

/// Primary location, with the source line for context.
#[derive(Debug, Serialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    pub byte_offset: usize,
    pub source_line: String,
}

#[derive(Debug, Serialize)]
pub struct JsonLabel {
    pub role: LabelStyle,
    pub message: String,
    pub start: LineCol,
    pub end: LineCol,
}

/// Line/column pair (1-based).
#[derive(Debug, Serialize)]
pub struct LineCol {
    pub line: usize,
    pub column: usize,
    pub byte_offset: usize,
}

/// Build a report for the diagnostics of a single phase.
pub fn to_json_report(diagnostics: &[Diagnostic], source: &str, file: &str, phase: &str) -> DiagnosticReport {
    let line_map = LineMap::new(source);

    DiagnosticReport {
        version: 1,
        file: file.to_string(),
        success: diagnostics.is_empty(),
        phase: phase.to_string(),
        diagnostics: diagnostics
            .iter()
            .map(|d| to_json_diagnostic(d, source, &line_map))
            .collect(),
        error_count: diagnostics.len(),
    }
}

fn to_json_diagnostic(diag: &Diagnostic, source: &str, line_map: &LineMap) -> JsonDiagnostic {
    let line_col = |offset: usize| {
        let loc = line_map.locate(offset);
        LineCol {
            line: loc.line as usize,
            column: loc.col as usize,
            byte_offset: offset,
        }
    };

    let location = diag.primary_span().map(|span| {
        let at = line_col(span.start);
        SourceLocation {
            source_line: line_map
                .line_text(source, at.line as u32)
                .unwrap_or("")
                .to_string(),
            line: at.line,
            column: at.column,
            byte_offset: at.byte_offset,
        }
    });

    let labels = diag
        .labels
        .iter()
        .map(|l| JsonLabel {
            role: l.style,
            message: l.message.clone(),
            start: line_col(l.span.start),
            end: line_col(l.span.end),
        })
        .collect();

    JsonDiagnostic {
        code: diag.code.to_string(),
        category: diag.category().map(|c| c.to_string()),
        message: diag.message.clone(),
        location,
        labels,
        notes: diag.notes.clone(),
        help: diag.help.clone(),
    }
}

/// Serialize a report to pretty JSON.
pub fn to_json_string(report: &DiagnosticReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use loxpp_ast::Span;

    #[test]
    fn report_counts_and_locates() {
        let source = "print 1;\nprint nope;\n";
        let diags = vec![Diagnostic::new("E0301", "Undefined variable 'nope'.")
            .with_primary(Span::new(15, 19), "not defined")];

        let report = to_json_report(&diags, source, "main.lox", "runtime");
        assert!(!report.success);
        assert_eq!(report.error_count, 1);

        let value: serde_json::Value = serde_json::from_str(&to_json_string(&report)).unwrap();
        let diag = &value["diagnostics"][0];
        assert_eq!(diag["code"], "E0301");
        assert_eq!(diag["category"], "Runtime");
        assert_eq!(diag["location"]["line"], 2);
        assert_eq!(diag["location"]["column"], 7);
        assert_eq!(diag["location"]["source_line"], "print nope;");
        assert_eq!(diag["labels"][0]["role"], "primary");
        assert!(diag.get("help").is_none());
    }

    #[test]
    fn empty_report_succeeds() {
        let report = to_json_report(&[], "", "empty.lox", "parse");
        assert!(report.success);
        assert_eq!(report.error_count, 0);
        assert!(report.diagnostics.is_empty());
    }
}
