use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::ast::Location;

/// A compile error: type errors, name errors, syntax errors. Carries the
/// offending source span when one is known.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct CompileError {
    pub message: String,
    pub location: Option<Location>,
}

impl CompileError {
    pub fn new(message: impl Into<String>) -> Self {
        CompileError { message: message.into(), location: None }
    }

    pub fn at(message: impl Into<String>, location: Option<Location>) -> Self {
        CompileError { message: message.into(), location }
    }

    pub fn from_pest(err: pest::error::Error<crate::parser::Rule>) -> Self {
        use pest::error::LineColLocation;
        let location = match err.line_col {
            LineColLocation::Pos((line, column)) => Location {
                line,
                column,
                end_line: line,
                end_column: column + 1,
            },
            LineColLocation::Span((line, column), (end_line, end_column)) => {
                Location { line, column, end_line, end_column }
            }
        };
        CompileError {
            message: format!("Syntax error: {}", err.variant.message()),
            location: Some(location),
        }
    }

    /// Prints an error report to stderr: the file position, the offending
    /// lines with one line of context, a caret underline of the faulty
    /// span, and the message.
    pub fn report(&self, file: &Path) {
        eprint!("{}", self.render_report(file));
    }

    fn render_report(&self, file: &Path) -> String {
        let mut out = String::new();
        self.render_context(file, &mut out);
        out.push('\n');
        out.push_str(&format!("Error: {}\n", self.message));
        out
    }

    fn render_context(&self, file: &Path, out: &mut String) {
        let Some(location) = self.location else {
            return;
        };
        out.push_str(&format!(
            "{}:{}:{}:\n",
            file.display(),
            location.line,
            location.column
        ));
        out.push('\n');

        let Ok(source) = fs::read_to_string(file) else {
            return;
        };
        const CONTEXT: usize = 1;
        for (i, line) in source.lines().enumerate() {
            let line_no = i + 1;
            if line_no + CONTEXT < location.line {
                continue;
            }
            if line_no > location.end_line + CONTEXT {
                break;
            }
            out.push_str(&format!("|{}\n", line));
            if line_no >= location.line && line_no <= location.end_line {
                let mut underline = String::from("|");
                for (col_no, c) in line.chars().enumerate() {
                    let mut outside = false;
                    outside |= line_no == location.line && col_no + 1 < location.column;
                    outside |= line_no == location.end_line && col_no + 1 >= location.end_column;
                    // A tab is copied verbatim so the carets line up with
                    // however wide the terminal renders it.
                    underline.push(if c == '\t' {
                        '\t'
                    } else if outside {
                        ' '
                    } else {
                        '^'
                    });
                }
                out.push_str(&underline);
                out.push('\n');
            }
        }
    }
}
