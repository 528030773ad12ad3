// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Interactive session over one persistent interpreter.

use std::io::{self, BufRead, Write};

use loxpp_diagnostics::ToDiagnostic;
use loxpp_interp::Interpreter;

use super::pipeline;
use crate::{output, show_diagnostics, Options};

const REPL_FILE: &str = "<repl>";

pub fn cmd_repl(opts: &Options) {
    let mut interp = Interpreter::new();
    interp.set_silent(opts.silent);
    if let Some(workers) = opts.workers {
        interp.set_worker_count(workers);
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    // node ids stay unique across lines
    let mut next_id = 0;

    loop {
        print!("{} ", output::prompt());
        if io::stdout().flush().is_err() {
            return;
        }
        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                eprintln!("{}: reading input: {}", output::error_label(), e);
                return;
            }
            None => {
                println!();
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match pipeline::compile(&line, next_id) {
            Ok((stmts, next)) => {
                next_id = next;
                if let Err(diag) = interp.run(&stmts) {
                    show_diagnostics(&[diag.to_diagnostic()], &line, REPL_FILE, "runtime", opts.format);
                }
            }
            Err(failure) => {
                show_diagnostics(&failure.diagnostics, &line, REPL_FILE, failure.phase, opts.format);
            }
        }
    }
}
