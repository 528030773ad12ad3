// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Phase inspection commands: lex, parse, resolve.

use std::process;

use loxpp_ast::token::TokenKind;
use loxpp_diagnostics::{Diagnostic, ToDiagnostic};

use super::pipeline::{read_source, report_failure, PhaseFailure};
use crate::{exit, output, show_diagnostics, Format};

pub fn cmd_lex(path: &str, format: Format) {
    let source = read_source(path);
    let result = loxpp_lexer::Lexer::new(&source).tokenize();

    if !result.is_ok() {
        let diags: Vec<Diagnostic> = result.errors.iter().map(|e| e.to_diagnostic()).collect();
        report_failure(&PhaseFailure { phase: "lex", diagnostics: diags }, &source, path, format);
        process::exit(exit::DATA_ERR);
    }

    if format == Format::Human {
        println!("{}\n", output::heading(&format!("Tokens ({})", result.tokens.len())));
        for tok in &result.tokens {
            if tok.kind == TokenKind::Eof {
                continue;
            }
            println!("{:4}:{:<4} {:?}", tok.span.start, tok.span.end, tok.kind);
        }
        println!("\n{}", output::banner_ok(&format!("Lex: {} tokens", result.tokens.len())));
    } else {
        show_diagnostics(&[], &source, path, "lex", format);
    }
}

pub fn cmd_parse(path: &str, format: Format) {
    let source = read_source(path);

    let lex_result = loxpp_lexer::Lexer::new(&source).tokenize();
    let mut diags: Vec<Diagnostic> = lex_result.errors.iter().map(|e| e.to_diagnostic()).collect();

    // parse anyway so syntax errors after a bad character still show
    let parse_result = loxpp_parser::Parser::new(lex_result.tokens).parse();
    diags.extend(parse_result.errors.iter().map(|e| e.to_diagnostic()));

    if !diags.is_empty() {
        report_failure(&PhaseFailure { phase: "parse", diagnostics: diags }, &source, path, format);
        process::exit(exit::DATA_ERR);
    }

    if format == Format::Human {
        println!("{}\n", output::heading(&format!("AST ({} statements)", parse_result.stmts.len())));
        for (i, stmt) in parse_result.stmts.iter().enumerate() {
            println!("--- Statement {} ---", i + 1);
            println!("{:#?}", stmt);
            println!();
        }
        println!("{}", output::banner_ok("Parse"));
    } else {
        show_diagnostics(&[], &source, path, "parse", format);
    }
}

pub fn cmd_resolve(path: &str, format: Format) {
    let source = read_source(path);

    let lex_result = loxpp_lexer::Lexer::new(&source).tokenize();
    if !lex_result.is_ok() {
        let diags = lex_result.errors.iter().map(|e| e.to_diagnostic()).collect();
        report_failure(&PhaseFailure { phase: "lex", diagnostics: diags }, &source, path, format);
        process::exit(exit::DATA_ERR);
    }
    let parse_result = loxpp_parser::Parser::new(lex_result.tokens).parse();
    if !parse_result.is_ok() {
        let diags = parse_result.errors.iter().map(|e| e.to_diagnostic()).collect();
        report_failure(&PhaseFailure { phase: "parse", diagnostics: diags }, &source, path, format);
        process::exit(exit::DATA_ERR);
    }

    let resolution = match loxpp_resolve::resolve(&parse_result.stmts) {
        Ok(r) => r,
        Err(errors) => {
            let diags = errors.iter().map(|e| e.to_diagnostic()).collect();
            report_failure(&PhaseFailure { phase: "resolve", diagnostics: diags }, &source, path, format);
            process::exit(exit::DATA_ERR);
        }
    };

    if format == Format::Json {
        show_diagnostics(&[], &source, path, "resolve", format);
        return;
    }

    let line_map = loxpp_ast::LineMap::new(&source);
    println!("{}\n", output::heading(&format!("References ({})", resolution.refs.len())));
    for r in &resolution.refs {
        let loc = line_map.locate(r.span.start);
        let depth = match r.depth {
            Some(d) => format!("depth {}", d),
            None => "global".to_string(),
        };
        println!("  #{:<5} {:>4}:{:<3} {:<20} {}", r.id.0, loc.line, loc.col, r.name, depth);
    }
    println!("\n{}", output::banner_ok("Resolve"));
}
