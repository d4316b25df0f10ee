//! PT Compiler
//!
//! Transforms PT shading source into a resolved, analyzed `compiler::ast::Module`
//! and, on success, a generic C++ header suitable for inclusion by a host
//! renderer.

pub mod abort;
pub mod compiler;
pub mod diagnostics;

use compiler::ast::Module;
use compiler::codegen::{self, CodegenOutput};
use compiler::lexer::Lexer;
use compiler::parser::Parser;
use compiler::resolve::resolve;
use compiler::typecheck;
use diagnostics::{CollectingSink, Diag, DiagSink};

/// Which passes `compile` should run past parsing. All default to `true`;
/// `pt-cli`'s `--syntax-only` flag is the only thing that turns `analyze`
/// and `codegen` off.
#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    /// Run the resolver and the semantic-analyzer passes.
    pub analyze: bool,
    /// Generate the C++ header. Implies `analyze`.
    pub codegen: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            analyze: true,
            codegen: true,
        }
    }
}

impl CompileOptions {
    /// Lex and parse only; used by `pt-cli --syntax-only`.
    pub fn syntax_only() -> Self {
        Self {
            analyze: false,
            codegen: false,
        }
    }
}

/// The result of compiling one source file: its module (always produced,
/// even in the face of errors, so a caller can still inspect what parsed),
/// any diagnostics collected along the way, and the generated header when
/// codegen ran and no pass reported an error.
pub struct CompileResult {
    pub module: Module,
    pub diags: Vec<Diag>,
    pub header: Option<CodegenOutput>,
}

impl CompileResult {
    pub fn has_errors(&self) -> bool {
        self.diags
            .iter()
            .any(|d| d.severity == diagnostics::Severity::Error)
    }
}

/// Runs the full pipeline — lex, parse, resolve, analyze, and (optionally)
/// generate — against one source file's text, reporting every diagnostic to
/// `sink` as well as returning it.
pub fn compile(source: &str, options: &CompileOptions) -> CompileResult {
    let mut sink = CollectingSink::new();

    let (tokens, lex_errors) = Lexer::new(source).tokenize();
    for err in &lex_errors {
        sink.observe(&lex_error_to_diag(err));
    }

    let (mut module, parse_errors) = Parser::new(tokens).parse_module();
    for err in &parse_errors {
        sink.observe(&parse_error_to_diag(err));
    }

    if options.analyze || options.codegen {
        resolve(&mut module);
        let _ = typecheck::check_duplicates(&module, &mut sink);
        let _ = typecheck::check_resolution(&module, &mut sink);
        let _ = typecheck::check_entry_points(&module, &mut sink);
        let _ = typecheck::check_return_types(&module, &mut sink);
    }

    let has_errors = sink
        .diags
        .iter()
        .any(|d| d.severity == diagnostics::Severity::Error);

    let header = if options.codegen && !has_errors {
        Some(codegen::generate(&module))
    } else {
        None
    };

    CompileResult {
        module,
        diags: sink.diags,
        header,
    }
}

fn lex_error_to_diag(err: &compiler::lexer::LexError) -> Diag {
    use compiler::lexer::LexError;
    use compiler::tokens::Span;
    use diagnostics::DiagId;

    let (line, col) = match err {
        LexError::UnexpectedChar { line, col, .. } => (*line, *col),
        LexError::UnterminatedComment { line, col } => (*line, *col),
        LexError::InvalidNumber { line, col } => (*line, *col),
    };
    let span = Span::new(0, 0, line, col, line, col + 1);
    Diag::new(span, DiagId::SyntaxError, err.to_string())
}

fn parse_error_to_diag(err: &compiler::parser::ParseError) -> Diag {
    use compiler::parser::ParseError;
    use diagnostics::DiagId;

    let id = match err {
        ParseError::UnsupportedControlFlow { .. } => DiagId::UnsupportedControlFlow,
        _ => DiagId::SyntaxError,
    };
    Diag::new(err.span(), id, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_module_generates_a_header() {
        let result = compile(
            "uniform float exposure;\n\
             void sample_pixel(vec2 a, vec2 b) {}\n\
             vec4 encode_pixel() { return vec4(0.0, 0.0, 0.0, 0.0); }\n",
            &CompileOptions::default(),
        );
        assert!(!result.has_errors(), "{:?}", result.diags);
        assert!(result.header.is_some());
    }

    #[test]
    fn missing_entry_point_blocks_codegen() {
        let result = compile("uniform float exposure;\n", &CompileOptions::default());
        assert!(result.has_errors());
        assert!(result.header.is_none());
    }

    #[test]
    fn syntax_only_skips_analysis_and_codegen() {
        let result = compile("uniform float exposure;\n", &CompileOptions::syntax_only());
        assert!(!result.has_errors());
        assert!(result.header.is_none());
    }
}
