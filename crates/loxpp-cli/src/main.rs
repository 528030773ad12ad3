// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Lox++ CLI - file runner, REPL and phase inspection.

mod commands;
mod help;
mod output;

use std::env;
use std::process;
use std::sync::Once;

use loxpp_diagnostics::{json, Diagnostic, DiagnosticFormatter};

/// Exit codes, sysexits style.
pub mod exit {
    pub const USAGE: i32 = 64;
    pub const DATA_ERR: i32 = 65;
    pub const SOFTWARE: i32 = 70;
    pub const IO_ERR: i32 = 74;
}

/// Source extensions accepted by `run`.
const EXTENSIONS: [&str; 3] = [".lox", ".loxlib", ".loxtest"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Human,
    Json,
}

/// Flags shared by every command.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub format: Format,
    pub silent: bool,
    pub workers: Option<usize>,
    pub verbosity: u8,
    pub positional: Vec<String>,
}

fn main() {
    loxpp_diagnostics::formatter::init_color();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first() else {
        help::print_usage();
        process::exit(exit::USAGE);
    };

    let opts = match parse_options(&args[1..]) {
        Ok(opts) => opts,
        Err(msg) => usage_error(&msg),
    };
    init_tracing(opts.verbosity);

    match command.as_str() {
        "run" => {
            let path = single_path(&opts, "run");
            if !has_source_extension(path) {
                usage_error(&format!(
                    "'{}' is not a Lox++ source file (expected {})",
                    path,
                    EXTENSIONS.join(", ")
                ));
            }
            commands::run::cmd_run(path, &opts);
        }
        "repl" => commands::repl::cmd_repl(&opts),
        "lex" => commands::phase::cmd_lex(single_path(&opts, "lex"), opts.format),
        "parse" => commands::phase::cmd_parse(single_path(&opts, "parse"), opts.format),
        "resolve" => commands::phase::cmd_resolve(single_path(&opts, "resolve"), opts.format),
        "help" | "--help" | "-h" => help::print_usage(),
        "version" | "--version" | "-V" => println!("loxpp {}", help::VERSION),
        other if has_source_extension(other) => {
            if !opts.positional.is_empty() {
                usage_error(&format!("unexpected argument '{}'", opts.positional[0]));
            }
            commands::run::cmd_run(other, &opts);
        }
        other => usage_error(&format!("unknown command '{}'", other)),
    }
}

fn usage_error(msg: &str) -> ! {
    eprintln!("{}: {}", output::error_label(), msg);
    eprintln!("Run 'loxpp help' for usage.");
    process::exit(exit::USAGE);
}

fn single_path<'a>(opts: &'a Options, command: &str) -> &'a str {
    match opts.positional.as_slice() {
        [path] => path.as_str(),
        [] => usage_error(&format!("usage: loxpp {} <file>", command)),
        [_, extra, ..] => usage_error(&format!("unexpected argument '{}'", extra)),
    }
}

fn has_source_extension(path: &str) -> bool {
    EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Split flags from positional arguments. `--workers` falls back to
/// `LOXPP_WORKERS`.
pub fn parse_options(args: &[String]) -> Result<Options, String> {
    let mut opts = Options {
        format: Format::Human,
        silent: false,
        workers: None,
        verbosity: 0,
        positional: Vec::new(),
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--silent" => opts.silent = true,
            "--format" => {
                let value = iter.next().ok_or("--format needs a value (human or json)")?;
                opts.format = parse_format(value)?;
            }
            "--workers" => {
                let value = iter.next().ok_or("--workers needs a number")?;
                opts.workers = Some(parse_workers(value)?);
            }
            "-v" => opts.verbosity = opts.verbosity.max(1),
            "-vv" => opts.verbosity = 2,
            other if other.starts_with("--format=") => {
                opts.format = parse_format(&other["--format=".len()..])?;
            }
            other if other.starts_with('-') && other.len() > 1 => {
                return Err(format!("unknown option '{}'", other));
            }
            other => opts.positional.push(other.to_string()),
        }
    }

    if opts.workers.is_none() {
        if let Ok(value) = env::var("LOXPP_WORKERS") {
            opts.workers = Some(parse_workers(&value).map_err(|e| format!("LOXPP_WORKERS: {}", e))?);
        }
    }
    Ok(opts)
}

fn parse_format(value: &str) -> Result<Format, String> {
    match value {
        "human" => Ok(Format::Human),
        "json" => Ok(Format::Json),
        other => Err(format!("unknown format '{}' (expected human or json)", other)),
    }
}

fn parse_workers(value: &str) -> Result<usize, String> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("invalid worker count '{}'", value)),
    }
}

static TRACING_INIT: Once = Once::new();

/// Install the log subscriber. Nothing is installed unless a filter is
/// requested through `-v`/`-vv`, `LOXPP_LOG` or `RUST_LOG`.
fn init_tracing(verbosity: u8) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let filter = match verbosity {
            0 => match env::var("LOXPP_LOG").or_else(|_| env::var("RUST_LOG")) {
                Ok(directives) => EnvFilter::new(directives),
                Err(_) => return,
            },
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        };
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(filter)
            .init();
    });
}

/// Print diagnostics to stderr, or a JSON report to stdout.
pub fn show_diagnostics(diags: &[Diagnostic], source: &str, path: &str, phase: &str, format: Format) {
    match format {
        Format::Human => {
            let formatter = DiagnosticFormatter::new(source).with_file_name(path);
            eprintln!("{}", formatter.format_all(diags));
        }
        Format::Json => {
            let report = json::to_json_report(diags, source, path, phase);
            println!("{}", json::to_json_string(&report));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn flags_and_positionals() {
        let opts = parse_options(&args(&["main.lox", "--silent", "--format", "json", "--workers", "3", "-vv"]))
            .unwrap();
        assert_eq!(opts.positional, vec!["main.lox".to_string()]);
        assert!(opts.silent);
        assert_eq!(opts.format, Format::Json);
        assert_eq!(opts.workers, Some(3));
        assert_eq!(opts.verbosity, 2);
    }

    #[test]
    fn bad_flags_are_usage_errors() {
        assert!(parse_options(&args(&["--format", "xml"])).is_err());
        assert!(parse_options(&args(&["--workers", "0"])).is_err());
        assert!(parse_options(&args(&["--workers"])).is_err());
        assert!(parse_options(&args(&["--frobnicate"])).is_err());
    }

    #[test]
    fn source_extensions() {
        assert!(has_source_extension("a/b.lox"));
        assert!(has_source_extension("lib.loxlib"));
        assert!(has_source_extension("suite.loxtest"));
        assert!(!has_source_extension("notes.txt"));
    }
}
