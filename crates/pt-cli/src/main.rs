//! `pt` — compiles a PT shading module to a generic C++ header.

use anyhow::Result;
use clap::Parser as ClapParser;
use pt_cli::{colors, driver};
use pt_compiler::compiler::codegen::{self, CodegenOutput};
use pt_compiler::compiler::lexer::Lexer;
use pt_compiler::compiler::parser::Parser;
use pt_compiler::compiler::resolve::resolve;
use pt_compiler::compiler::typecheck;
use pt_compiler::diagnostics::{CollectingSink, ConsoleRenderer, DiagSink, Severity};
use pt_compiler::{CompileOptions, CompileResult};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info_span;

#[derive(ClapParser)]
#[command(
    name = "pt",
    version,
    about = "Compiles a PT pixel-shading module into a generic C++ header",
    help_template = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}

Examples:
  pt .                      Compile ./main.pt, print the header to stdout
  pt -o shader.h examples/  Compile examples/main.pt, write shader.h
  pt --syntax-only .        Check main.pt without generating code
  pt --list-dependencies .  Print the files the build depends on
"
)]
struct Cli {
    /// Directory containing `main.pt` (default: current directory)
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Output language
    #[arg(short, long, default_value = "cxx")]
    language: String,

    /// Write the generated header here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip the write if the output file's contents would be unchanged
    #[arg(long)]
    only_if_different: bool,

    /// Lex, parse, and analyze only; skip code generation
    #[arg(long)]
    syntax_only: bool,

    /// Print the set of files this build depends on and exit
    #[arg(long)]
    list_dependencies: bool,

    /// Enable verbose (debug-level) logging; also controlled by RUST_LOG
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "warn" })
    });
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.kind() == clap::error::ErrorKind::DisplayHelp => {
            // clap's default `--help` handling prints and exits 0; the
            // original driver prints help and returns `EXIT_FAILURE`, so
            // override that one case rather than letting `try_parse` exit.
            let _ = err.print();
            return ExitCode::FAILURE;
        }
        Err(err) => err.exit(),
    };
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}: {err:#}", colors::red("error"));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let language = driver::resolve_language(&cli.language)?;

    let (entry_path, source) = driver::read_entry(&cli.dir)?;

    if cli.list_dependencies {
        println!("{}", entry_path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let options = if cli.syntax_only {
        CompileOptions::syntax_only()
    } else {
        CompileOptions::default()
    };

    let result = compile_with_tracing(&source, &options);

    render_diagnostics(&entry_path, &source, &result.diags);

    if result.has_errors() {
        return Ok(ExitCode::FAILURE);
    }

    let Some(header) = result.header else {
        return Ok(ExitCode::SUCCESS);
    };

    let _ = language;
    write_output(cli, &header)?;
    Ok(ExitCode::SUCCESS)
}

fn compile_with_tracing(source: &str, options: &CompileOptions) -> CompileResult {
    let mut sink = CollectingSink::new();

    let (tokens, lex_errors) = info_span!("lex").in_scope(|| Lexer::new(source).tokenize());
    for err in &lex_errors {
        tracing::warn!(%err, "lex error");
    }

    let (mut module, parse_errors) =
        info_span!("parse").in_scope(|| Parser::new(tokens).parse_module());
    for err in &parse_errors {
        tracing::warn!(%err, "parse error");
    }

    if options.analyze || options.codegen {
        info_span!("resolve").in_scope(|| resolve(&mut module));
        info_span!("analyze").in_scope(|| {
            let _ = typecheck::check_duplicates(&module, &mut sink);
            let _ = typecheck::check_resolution(&module, &mut sink);
            let _ = typecheck::check_entry_points(&module, &mut sink);
            let _ = typecheck::check_return_types(&module, &mut sink);
        });
    }

    // Lex/parse diagnostics are reported via the renderer, not this sink,
    // since they predate a resolvable module; fold them in for has_errors().
    let mut diags = lex_and_parse_diags(&lex_errors, &parse_errors);
    diags.extend(sink.diags);

    let has_errors = diags.iter().any(|d| d.severity == Severity::Error);

    let header = if options.codegen && !has_errors {
        Some(info_span!("codegen").in_scope(|| codegen::generate(&module)))
    } else {
        None
    };

    CompileResult {
        module,
        diags,
        header,
    }
}

fn lex_and_parse_diags(
    lex_errors: &[pt_compiler::compiler::lexer::LexError],
    parse_errors: &[pt_compiler::compiler::parser::ParseError],
) -> Vec<pt_compiler::diagnostics::Diag> {
    use pt_compiler::compiler::parser::ParseError;
    use pt_compiler::compiler::tokens::Span;
    use pt_compiler::diagnostics::{Diag, DiagId};

    let mut diags = Vec::new();
    for err in lex_errors {
        let (line, col) = match err {
            pt_compiler::compiler::lexer::LexError::UnexpectedChar { line, col, .. } => (*line, *col),
            pt_compiler::compiler::lexer::LexError::UnterminatedComment { line, col } => (*line, *col),
            pt_compiler::compiler::lexer::LexError::InvalidNumber { line, col } => (*line, *col),
        };
        let span = Span::new(0, 0, line, col, line, col + 1);
        diags.push(Diag::new(span, DiagId::SyntaxError, err.to_string()));
    }
    for err in parse_errors {
        let id = match err {
            ParseError::UnsupportedControlFlow { .. } => DiagId::UnsupportedControlFlow,
            _ => DiagId::SyntaxError,
        };
        diags.push(Diag::new(err.span(), id, err.to_string()));
    }
    diags
}

fn render_diagnostics(path: &PathBuf, source: &str, diags: &[pt_compiler::diagnostics::Diag]) {
    if diags.is_empty() {
        return;
    }
    let color = std::io::stderr().is_terminal();
    let mut renderer = ConsoleRenderer::new(std::io::stderr(), color);
    renderer.begin_file(&path.display().to_string(), source);
    for diag in diags {
        renderer.observe(diag);
    }
    renderer.end_file();
}

fn write_output(cli: &Cli, header: &CodegenOutput) -> Result<()> {
    driver::write_output(cli.output.as_deref(), cli.only_if_different, header)?;
    Ok(())
}
