// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Shared front end: read, lex, parse and resolve.

use std::process;

use loxpp_ast::stmt::Stmt;
use loxpp_diagnostics::{Diagnostic, ToDiagnostic};

use crate::{exit, output, show_diagnostics, Format};

/// A program ready to run.
pub struct Frontend {
    pub source: String,
    pub stmts: Vec<Stmt>,
}

/// Front-end failure: the phase that failed and what it reported.
pub struct PhaseFailure {
    pub phase: &'static str,
    pub diagnostics: Vec<Diagnostic>,
}

/// Read a source file, exiting with the I/O code on failure.
pub fn read_source(path: &str) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}: reading {}: {}", output::error_label(), output::file_path(path), e);
            process::exit(exit::IO_ERR);
        }
    }
}

/// Lex, parse and resolve `source`. Node ids start at `id_base`; the
/// second value is the next unused id.
pub fn compile(source: &str, id_base: u32) -> Result<(Vec<Stmt>, u32), PhaseFailure> {
    let lex_result = loxpp_lexer::Lexer::new(source).tokenize();
    if !lex_result.is_ok() {
        return Err(PhaseFailure {
            phase: "lex",
            diagnostics: lex_result.errors.iter().map(|e| e.to_diagnostic()).collect(),
        });
    }

    let parse_result = loxpp_parser::Parser::with_id_base(lex_result.tokens, id_base).parse();
    if !parse_result.is_ok() {
        return Err(PhaseFailure {
            phase: "parse",
            diagnostics: parse_result.errors.iter().map(|e| e.to_diagnostic()).collect(),
        });
    }

    match loxpp_resolve::resolve(&parse_result.stmts) {
        Ok(_) => Ok((parse_result.stmts, parse_result.next_node_id)),
        Err(errors) => Err(PhaseFailure {
            phase: "resolve",
            diagnostics: errors.iter().map(|e| e.to_diagnostic()).collect(),
        }),
    }
}

/// Run the front end on a file, exiting with the data-error code when
/// any phase reports errors.
pub fn run_frontend(path: &str, format: Format) -> Frontend {
    let source = read_source(path);
    match compile(&source, 0) {
        Ok((stmts, _)) => Frontend { source, stmts },
        Err(failure) => {
            report_failure(&failure, &source, path, format);
            process::exit(exit::DATA_ERR);
        }
    }
}

pub fn report_failure(failure: &PhaseFailure, source: &str, path: &str, format: Format) {
    show_diagnostics(&failure.diagnostics, source, path, failure.phase, format);
    if format == Format::Human {
        let phase = match failure.phase {
            "lex" => "Lex",
            "parse" => "Parse",
            _ => "Resolve",
        };
        eprintln!("{}", output::banner_fail(phase, failure.diagnostics.len()));
    }
}
