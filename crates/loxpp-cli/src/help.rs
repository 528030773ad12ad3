// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Help text for CLI commands.

use crate::output;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn print_usage() {
    println!(
        "{} {} - a class-based scripting language",
        output::title("Lox++"),
        output::version(VERSION)
    );
    println!();
    println!(
        "{}: {} {} {}",
        output::section_header("Usage"),
        output::command("loxpp"),
        output::arg("<command>"),
        output::arg("[options] [args]")
    );
    println!();
    println!("{}", output::section_header("Commands:"));
    println!("  {} {}       Run a program (.lox, .loxlib, .loxtest)", output::command("run"), output::arg("<file>"));
    println!("  {}            Shorthand for run", output::arg("<file.lox>"));
    println!("  {}                  Start an interactive session", output::command("repl"));
    println!("  {} {}       Print tokens", output::command("lex"), output::arg("<file>"));
    println!("  {} {}     Print the statement tree", output::command("parse"), output::arg("<file>"));
    println!("  {} {}   Print resolved variable depths", output::command("resolve"), output::arg("<file>"));
    println!("  {}                  Show this help", output::command("help"));
    println!("  {}               Show version", output::command("version"));
    println!();
    println!("{}", output::section_header("Options:"));
    println!("  {}              Suppress print, println and debug output", output::arg("--silent"));
    println!("  {}   Diagnostic output format", output::arg("--format human|json"));
    println!("  {}           Initial async worker threads (env: LOXPP_WORKERS)", output::arg("--workers N"));
    println!("  {}              Log interpreter events (env: LOXPP_LOG, RUST_LOG)", output::arg("-v, -vv"));
}
