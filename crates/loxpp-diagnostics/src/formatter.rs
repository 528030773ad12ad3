// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Rich terminal formatter for diagnostics.
//!
//! ```text
//! error[E0400]: Class 'Vec' does not implement trait 'Computable'.
//!   --> shapes.lox:12:7
//!     |
//!  12 | print a + b;
//!     |       ^^^^^ requires 'Computable'
//!     |
//!     = help: Consider implementing the 'Computable' trait and its methods: ...
//! ```

use std::collections::BTreeMap;

use colored::Colorize;

use loxpp_ast::LineMap;

use crate::{Diagnostic, LabelStyle};

/// Apply `NO_COLOR` / `FORCE_COLOR` before any output is produced.
pub fn init_color() {
    if std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty()) {
        colored::control::set_override(false);
    } else if std::env::var_os("FORCE_COLOR").is_some_and(|v| !v.is_empty() && v != "0") {
        colored::control::set_override(true);
    }
}

/// Formats diagnostics for terminal output.
pub struct DiagnosticFormatter<'a> {
    source: &'a str,
    file_name: Option<&'a str>,
    line_map: LineMap,
}

/// A source line with its labels.
struct AnnotatedLine {
    line_num: usize,
    text: String,
    annotations: Vec<Annotation>,
}

struct Annotation {
    col_start: usize,
    col_end: usize,
    style: LabelStyle,
    message: String,
}

impl<'a> DiagnosticFormatter<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            file_name: None,
            line_map: LineMap::new(source),
        }
    }

    pub fn with_file_name(mut self, name: &'a str) -> Self {
        self.file_name = Some(name);
        self
    }

    pub fn format(&self, diagnostic: &Diagnostic) -> String {
        let mut out = String::new();
        self.format_header(&mut out, diagnostic);

        let annotated = self.collect_annotated_lines(diagnostic);
        let Some(primary) = diagnostic.primary_span() else {
            self.format_footer(&mut out, diagnostic);
            return out;
        };

        let (line, col) = self.offset_to_line_col(primary.start);
        out.push_str(&format!(
            "  {} {}:{}:{}\n",
            "-->".blue(),
            self.file_name.unwrap_or("<source>"),
            line,
            col
        ));

        let max_line = annotated.last().map(|a| a.line_num).unwrap_or(1);
        let gutter_width = max_line.to_string().len().max(2);

        out.push_str(&format!("{} {}\n", " ".repeat(gutter_width + 1), "|".blue()));

        let mut prev_line_num: Option<usize> = None;
        for annotated_line in &annotated {
            if prev_line_num.is_some_and(|prev| annotated_line.line_num > prev + 1) {
                out.push_str(&format!("{} {}\n", " ".repeat(gutter_width), "...".blue()));
            }

            out.push_str(&format!(
                "{:>width$} {} {}\n",
                annotated_line.line_num.to_string().blue().bold(),
                "|".blue(),
                annotated_line.text,
                width = gutter_width + 1,
            ));
            self.format_annotations(&mut out, annotated_line, gutter_width);
            prev_line_num = Some(annotated_line.line_num);
        }

        if !diagnostic.notes.is_empty() || diagnostic.help.is_some() {
            out.push_str(&format!("{} {}\n", " ".repeat(gutter_width + 1), "|".blue()));
        }
        self.format_footer(&mut out, diagnostic);
        out
    }

    /// Format every diagnostic, separated by blank lines.
    pub fn format_all(&self, diagnostics: &[Diagnostic]) -> String {
        diagnostics
            .iter()
            .map(|d| self.format(d))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn format_header(&self, out: &mut String, diagnostic: &Diagnostic) {
        out.push_str(&format!(
            "{}[{}]: {}\n",
            "error".red().bold(),
            diagnostic.code.red().bold(),
            diagnostic.message.bold()
        ));
    }

    fn format_footer(&self, out: &mut String, diagnostic: &Diagnostic) {
        let indent = " ".repeat(3);
        for note in &diagnostic.notes {
            out.push_str(&format!("{} {} {}: {}\n", indent, "=".cyan(), "note".cyan().bold(), note));
        }
        if let Some(ref help) = diagnostic.help {
            out.push_str(&format!("{} {} {}: {}\n", indent, "=".cyan(), "help".cyan().bold(), help));
        }
    }

    fn collect_annotated_lines(&self, diagnostic: &Diagnostic) -> Vec<AnnotatedLine> {
        let mut lines_map: BTreeMap<usize, AnnotatedLine> = BTreeMap::new();

        for label in &diagnostic.labels {
            let (line_num, col_start) = self.offset_to_line_col(label.span.start);
            let (end_line, col_end) = self.offset_to_line_col(label.span.end);
            let text = self.get_line(line_num).unwrap_or("");

            // multi-line spans underline to the end of their first line
            let col_end = if end_line == line_num {
                col_end
            } else {
                text.len() + 1
            };

            let entry = lines_map.entry(line_num).or_insert_with(|| AnnotatedLine {
                line_num,
                text: text.to_string(),
                annotations: Vec::new(),
            });
            entry.annotations.push(Annotation {
                col_start,
                col_end: col_end.max(col_start + 1),
                style: label.style,
                message: label.message.clone(),
            });
        }

        lines_map.into_values().collect()
    }

    fn format_annotations(&self, out: &mut String, annotated_line: &AnnotatedLine, gutter_width: usize) {
        let mut sorted: Vec<&Annotation> = annotated_line.annotations.iter().collect();
        sorted.sort_by_key(|a| (a.style.priority(), a.col_start));

        let line_len = annotated_line.text.len() + 1;
        let mut underline = vec![' '; line_len];
        let mut messages: Vec<(usize, LabelStyle, &str)> = Vec::new();

        for ann in &sorted {
            let ch = match ann.style {
                LabelStyle::Primary => '^',
                LabelStyle::Secondary => '-',
            };
            for slot in underline
                .iter_mut()
                .take((ann.col_end - 1).min(line_len))
                .skip(ann.col_start - 1)
            {
                if *slot == ' ' {
                    *slot = ch;
                }
            }
            messages.push((ann.col_start, ann.style, ann.message.as_str()));
        }

        let underline_str: String = underline.iter().collect::<String>().trim_end().to_string();
        if underline_str.is_empty() {
            return;
        }
        let pad = " ".repeat(gutter_width + 1);
        let colored_underline = color_underline(&underline_str);

        if messages.len() <= 1 {
            match messages.first() {
                Some((_, style, msg)) => out.push_str(&format!(
                    "{} {} {} {}\n",
                    pad,
                    "|".blue(),
                    colored_underline,
                    style_message(msg, *style)
                )),
                None => out.push_str(&format!("{} {} {}\n", pad, "|".blue(), colored_underline)),
            }
            return;
        }

        out.push_str(&format!("{} {} {}\n", pad, "|".blue(), colored_underline));
        for (col, style, msg) in messages.iter().rev() {
            out.push_str(&format!(
                "{} {} {}{}\n",
                pad,
                "|".blue(),
                " ".repeat(col.saturating_sub(1)),
                style_message(msg, *style),
            ));
        }
    }

    /// Byte offset to 1-based (line, col).
    fn offset_to_line_col(&self, offset: usize) -> (usize, usize) {
        let loc = self.line_map.locate(offset);
        (loc.line as usize, loc.col as usize)
    }

    fn get_line(&self, line_num: usize) -> Option<&str> {
        self.line_map.line_text(self.source, line_num as u32)
    }
}

impl LabelStyle {
    fn priority(&self) -> u8 {
        match self {
            LabelStyle::Primary => 0,
            LabelStyle::Secondary => 1,
        }
    }
}

fn style_message(msg: &str, style: LabelStyle) -> String {
    match style {
        LabelStyle::Primary => msg.red().bold().to_string(),
        LabelStyle::Secondary => msg.blue().to_string(),
    }
}

/// `^` runs in red, `-` runs in blue.
fn color_underline(s: &str) -> String {
    let mut result = String::new();
    let mut run = String::new();
    let mut current = None;

    for ch in s.chars() {
        let kind = matches!(ch, '^' | '-').then_some(ch);
        if kind != current && !run.is_empty() {
            result.push_str(&flush_run(&run, current));
            run.clear();
        }
        run.push(ch);
        current = kind;
    }
    if !run.is_empty() {
        result.push_str(&flush_run(&run, current));
    }
    result
}

fn flush_run(run: &str, kind: Option<char>) -> String {
    match kind {
        Some('^') => run.red().bold().to_string(),
        Some('-') => run.blue().to_string(),
        _ => run.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loxpp_ast::Span;
    use pretty_assertions::assert_eq;

    fn plain(source: &str, diag: &Diagnostic) -> String {
        colored::control::set_override(false);
        DiagnosticFormatter::new(source)
            .with_file_name("main.lox")
            .format(diag)
    }

    #[test]
    fn renders_source_context() {
        let source = "let a = 1;\nprint a + b;\n";
        let diag = Diagnostic::new("E0301", "Undefined variable 'b'.")
            .with_primary(Span::new(21, 22), "not defined")
            .with_help("declare 'b' before using it");

        let expected = "\
error[E0301]: Undefined variable 'b'.
  --> main.lox:2:11
    |
  2 | print a + b;
    |           ^ not defined
    |
    = help: declare 'b' before using it
";
        assert_eq!(plain(source, &diag), expected);
    }

    #[test]
    fn secondary_labels_share_the_gutter() {
        let source = "let x = 1;\nlet x = 2;\n";
        let diag = Diagnostic::new("E0201", "Already a variable named 'x' in this scope.")
            .with_primary(Span::new(15, 16), "redeclared here")
            .with_secondary(Span::new(4, 5), "previously declared here");

        let out = plain(source, &diag);
        assert!(out.contains(" 1 | let x = 1;\n    |     - previously declared here\n"), "{out}");
        assert!(out.contains(" 2 | let x = 2;\n    |     ^ redeclared here\n"), "{out}");
        assert!(out.contains("--> main.lox:2:5"), "{out}");
    }

    #[test]
    fn diagnostics_without_labels_print_header_and_notes() {
        let diag = Diagnostic::new("E0308", "Stack overflow.")
            .with_note("the limit is 1000 frames");
        let expected = "\
error[E0308]: Stack overflow.
    = note: the limit is 1000 frames
";
        assert_eq!(plain("", &diag), expected);
    }
}
