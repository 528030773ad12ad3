// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `loxpp run`: execute a program with the prelude loaded.

use std::process;
use std::thread;

use loxpp_ast::stmt::Stmt;
use loxpp_diagnostics::{Diagnostic, ToDiagnostic};
use loxpp_interp::Interpreter;

use super::pipeline;
use crate::{exit, output, show_diagnostics, Format, Options};

/// Stack for the thread that runs user code.
const MAIN_STACK_SIZE: usize = 64 * 1024 * 1024;

pub fn cmd_run(path: &str, opts: &Options) {
    let frontend = pipeline::run_frontend(path, opts.format);
    let stmts = frontend.stmts;
    let silent = opts.silent;
    let workers = opts.workers;

    let spawned = thread::Builder::new()
        .name("loxpp-main".to_string())
        .stack_size(MAIN_STACK_SIZE)
        .spawn(move || execute(&stmts, silent, workers));

    let outcome = match spawned {
        Ok(handle) => handle.join(),
        Err(e) => {
            eprintln!("{}: starting interpreter thread: {}", output::error_label(), e);
            process::exit(exit::SOFTWARE);
        }
    };

    match outcome {
        Ok(None) => {}
        Ok(Some(diagnostic)) => {
            show_diagnostics(&[diagnostic], &frontend.source, path, "runtime", opts.format);
            if opts.format == Format::Human {
                eprintln!("{}", output::banner_fail("Runtime", 1));
            }
            process::exit(exit::SOFTWARE);
        }
        Err(_) => {
            eprintln!("{}: interpreter thread panicked", output::error_label());
            process::exit(exit::SOFTWARE);
        }
    }
}

/// Run `stmts` in a fresh interpreter; an uncaught error comes back as a
/// diagnostic.
fn execute(stmts: &[Stmt], silent: bool, workers: Option<usize>) -> Option<Diagnostic> {
    let mut interp = Interpreter::new();
    interp.set_silent(silent);
    if let Some(workers) = workers {
        interp.set_worker_count(workers);
    }
    match interp.run(stmts) {
        Ok(()) => None,
        Err(diag) => {
            tracing::debug!(error = %diag, "uncaught runtime error");
            Some(diag.to_diagnostic())
        }
    }
}
