// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! Integration tests for the `loxpp` binary. Each test runs a fixture
//! and checks stdout, stderr and the exit code.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use pretty_assertions::assert_eq;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn loxpp(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_loxpp"))
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("LOXPP_WORKERS")
        .env_remove("LOXPP_LOG")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run loxpp")
}

fn run_fixture(name: &str, extra: &[&str]) -> Output {
    let path = fixture(name);
    let path = path.to_str().expect("fixture path is utf-8");
    let mut args = vec!["run", path];
    args.extend_from_slice(extra);
    loxpp(&args)
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).to_string()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).to_string()
}

#[test]
fn runs_a_program() {
    let out = run_fixture("shapes.lox", &[]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "rect with area 6\nsquare with area 16\n6\n");
}

#[test]
fn bare_file_is_run() {
    let path = fixture("shapes.lox");
    let out = loxpp(&[path.to_str().unwrap(), "--workers", "2"]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    assert!(stdout(&out).ends_with("6\n"));
}

#[test]
fn uncaught_throw_exits_70() {
    let out = run_fixture("uncaught.lox", &[]);
    assert_eq!(out.status.code(), Some(70));
    assert_eq!(stdout(&out), "before\n");
    let err = stderr(&out);
    assert!(err.contains("error[E0500]: oops: nothing to see"), "{err}");
    assert!(err.contains("uncaught.lox:6:"), "{err}");
    assert!(err.contains("Oops"), "{err}");
}

#[test]
fn syntax_errors_exit_65() {
    let out = run_fixture("bad_syntax.lox", &[]);
    assert_eq!(out.status.code(), Some(65));
    assert!(stderr(&out).contains("error[E01"), "{}", stderr(&out));
}

#[test]
fn resolve_errors_exit_65() {
    let out = run_fixture("bad_resolve.lox", &[]);
    assert_eq!(out.status.code(), Some(65));
    let err = stderr(&out);
    assert!(err.contains("error[E0202]: Can't return from top-level code."), "{err}");
}

#[test]
fn json_format_reports_on_stdout() {
    let out = run_fixture("bad_resolve.lox", &["--format", "json"]);
    assert_eq!(out.status.code(), Some(65));
    let text = stdout(&out);
    assert!(text.contains("\"phase\": \"resolve\""), "{text}");
    assert!(text.contains("\"code\": \"E0202\""), "{text}");
    assert!(text.contains("\"category\": \"Resolution\""), "{text}");
}

#[test]
fn silent_suppresses_output() {
    let loud = run_fixture("chatty.lox", &[]);
    assert_eq!(stdout(&loud), "quiet? yes\n");

    let quiet = run_fixture("chatty.lox", &["--silent"]);
    assert_eq!(quiet.status.code(), Some(0));
    assert_eq!(stdout(&quiet), "");
}

#[test]
fn missing_file_exits_74() {
    let out = loxpp(&["run", "does/not/exist.lox"]);
    assert_eq!(out.status.code(), Some(74));
}

#[test]
fn usage_errors_exit_64() {
    assert_eq!(loxpp(&["frobnicate"]).status.code(), Some(64));
    assert_eq!(loxpp(&["run"]).status.code(), Some(64));
    assert_eq!(loxpp(&["run", "notes.txt"]).status.code(), Some(64));
    assert_eq!(loxpp(&["run", "x.lox", "--format", "yaml"]).status.code(), Some(64));
}

#[test]
fn resolve_command_prints_depths() {
    let path = fixture("shapes.lox");
    let out = loxpp(&["resolve", path.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("println"), "{text}");
    assert!(text.contains("global"), "{text}");
    assert!(text.contains("depth 0"), "{text}");
}

#[test]
fn lex_command_lists_tokens() {
    let path = fixture("chatty.lox");
    let out = loxpp(&["lex", path.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(0));
    assert!(stdout(&out).contains("Ident(\"println\")"), "{}", stdout(&out));
}

#[test]
fn repl_keeps_state_across_lines() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_loxpp"))
        .arg("repl")
        .env("NO_COLOR", "1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start repl");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"let a = 40;\nprintln(missing);\nprintln(a + 2);\n")
        .unwrap();
    let out = child.wait_with_output().unwrap();

    assert_eq!(out.status.code(), Some(0));
    assert!(stdout(&out).contains("42\n"), "{}", stdout(&out));
    assert!(stderr(&out).contains("Undefined variable 'missing'."), "{}", stderr(&out));
}

#[test]
fn version_and_help() {
    let out = loxpp(&["version"]);
    assert_eq!(stdout(&out), format!("loxpp {}\n", env!("CARGO_PKG_VERSION")));
    assert!(stdout(&loxpp(&["help"])).contains("repl"));
}
