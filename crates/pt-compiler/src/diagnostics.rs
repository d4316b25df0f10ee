//! Structured diagnostics and the console renderer.

use crate::compiler::tokens::Span;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagId {
    SyntaxError,
    UnsupportedControlFlow,
    UnresolvedVarRef,
    UnresolvedFuncCall,
    DuplicateDecl,
    OriginalDecl,
    MissingEntryPoint,
    DuplicateEntryPoint,
    EntryPointSignatureMismatch,
    ReturnTypeMismatch,
}

impl DiagId {
    pub fn default_severity(self) -> Severity {
        match self {
            DiagId::OriginalDecl => Severity::Note,
            _ => Severity::Error,
        }
    }
}

/// A structured diagnostic: source location, stable id, severity, message.
#[derive(Debug, Clone)]
pub struct Diag {
    pub span: Span,
    pub id: DiagId,
    pub severity: Severity,
    pub message: String,
}

impl Diag {
    pub fn new(span: Span, id: DiagId, message: impl Into<String>) -> Self {
        Self {
            span,
            id,
            severity: id.default_severity(),
            message: message.into(),
        }
    }

    pub fn note(span: Span, id: DiagId, message: impl Into<String>) -> Self {
        Self {
            span,
            id,
            severity: Severity::Note,
            message: message.into(),
        }
    }
}

/// Receives diagnostics as a file-scoped stack, so includes (were this core
/// to link them) could be rendered against the right slice of source.
pub trait DiagSink {
    fn begin_file(&mut self, path: &str, data: &str);
    fn observe(&mut self, diag: &Diag);
    fn end_file(&mut self);
}

/// Collects diagnostics into a vector; used by tests and by `pt-cli` before
/// deciding whether to render and what exit code to use.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub diags: Vec<Diag>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        self.diags.iter().any(|d| d.severity == Severity::Error)
    }
}

impl DiagSink for CollectingSink {
    fn begin_file(&mut self, _path: &str, _data: &str) {}

    fn observe(&mut self, diag: &Diag) {
        self.diags.push(diag.clone());
    }

    fn end_file(&mut self) {}
}

/// Returns the `line`-th (1-based) `\n`-delimited line of `data`, excluding
/// the terminator; out-of-range lines return an empty slice.
pub fn line_view(line: usize, data: &str) -> &str {
    if line == 0 {
        return "";
    }
    data.split('\n').nth(line - 1).unwrap_or("")
}

/// For a `Span` and a specific line within it, returns the 1-based column
/// and length of the portion of that line the span covers: the full span
/// on the first line from its column to the end of line, full lines in the
/// middle, and column 1 through the end column on the last line.
pub fn clipped_range_for_line(span: Span, line: usize, line_len: usize) -> (usize, usize) {
    let start_col = if line == span.first_line { span.first_col } else { 1 };
    let end_col = if line == span.last_line {
        span.last_col.max(start_col)
    } else {
        line_len + 1
    };
    (start_col, end_col - start_col)
}

/// Renders diagnostics as `path:location: severity: message` followed by a
/// source excerpt with a caret row, coloring the range and bolding the
/// header only when the caller has determined the target is a terminal.
pub struct ConsoleRenderer<W: Write> {
    out: W,
    color: bool,
    path: String,
    data: String,
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self {
            out,
            color,
            path: String::new(),
            data: String::new(),
        }
    }
}

impl<W: Write> DiagSink for ConsoleRenderer<W> {
    fn begin_file(&mut self, path: &str, data: &str) {
        self.path = path.to_string();
        self.data = data.to_string();
    }

    fn observe(&mut self, diag: &Diag) {
        let header = format!("{}:{}: {}:", self.path, diag.span, diag.severity);
        if self.color {
            let _ = writeln!(self.out, "\x1b[1m{header}\x1b[0m {}", diag.message);
        } else {
            let _ = writeln!(self.out, "{header} {}", diag.message);
        }

        for line in diag.span.first_line..=diag.span.last_line {
            let text = line_view(line, &self.data);
            let _ = writeln!(self.out, "{text}");

            let (start_col, len) = clipped_range_for_line(diag.span, line, text.chars().count());
            let len = len.max(1);
            let mut caret_line = " ".repeat(start_col.saturating_sub(1));
            if self.color {
                caret_line.push_str("\x1b[31m");
            }
            caret_line.push_str(&"^".repeat(len));
            if self.color {
                caret_line.push_str("\x1b[0m");
            }
            let _ = writeln!(self.out, "{caret_line}");
        }
    }

    fn end_file(&mut self) {
        self.path.clear();
        self.data.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_view_excludes_terminator() {
        let data = "first\nsecond\nthird";
        assert_eq!(line_view(1, data), "first");
        assert_eq!(line_view(2, data), "second");
        assert_eq!(line_view(3, data), "third");
        assert_eq!(line_view(4, data), "");
    }

    #[test]
    fn clipped_range_single_line() {
        let span = Span::new(0, 0, 3, 5, 3, 9);
        let (col, len) = clipped_range_for_line(span, 3, 20);
        assert_eq!((col, len), (5, 4));
    }

    #[test]
    fn clipped_range_multi_line_middle_spans_whole_line() {
        let span = Span::new(0, 0, 1, 3, 3, 2);
        let (col, len) = clipped_range_for_line(span, 2, 10);
        assert_eq!((col, len), (1, 10));
    }

    #[test]
    fn console_renderer_prints_header_and_caret_row() {
        let mut buf = Vec::new();
        {
            let mut renderer = ConsoleRenderer::new(&mut buf, false);
            renderer.begin_file("main.pt", "int a = 1;\nint a = 2;\n");
            let span = Span::new(0, 0, 2, 5, 2, 5);
            renderer.observe(&Diag::new(span, DiagId::DuplicateDecl, "duplicate declaration 'a'"));
            renderer.end_file();
        }
        let rendered = String::from_utf8(buf).unwrap();
        assert!(rendered.contains("main.pt:2:5: error: duplicate declaration 'a'"));
        assert!(rendered.contains("int a = 2;"));
        assert!(rendered.contains('^'));
    }
}
