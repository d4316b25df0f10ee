//! End-to-end scenarios against the public `compile` entry point.

use pt_compiler::compiler::tokens::TokenKind;
use pt_compiler::diagnostics::Severity;
use pt_compiler::{compile, CompileOptions};

fn compiled(src: &str) -> pt_compiler::CompileResult {
    compile(src, &CompileOptions::default())
}

#[test]
fn scalar_folding() {
    let result = compiled(
        "int x = 2 * 2;\n\
         void sample_pixel(vec2 a, vec2 b) {}\n\
         vec4 encode_pixel() { return vec4(0.0, 0.0, 0.0, 0.0); }\n",
    );
    assert!(!result.has_errors(), "{:?}", result.diags);
    let header = result.header.unwrap().header_text;
    assert!(header.contains("int_type(2) * int_type(2)"));
}

#[test]
fn vector_broadcast() {
    let result = compiled(
        "uniform vec2 foo;\n\
         varying vec2 v = 2.0 * foo;\n\
         void sample_pixel(vec2 a, vec2 b) {}\n\
         vec4 encode_pixel() { return vec4(0.0, 0.0, 0.0, 0.0); }\n",
    );
    assert!(!result.has_errors(), "{:?}", result.diags);
    let header = result.header.unwrap().header_text;
    assert!(header.contains("float_type(2.0) * frame.foo"));
}

#[test]
fn swizzle() {
    let result = compiled(
        "uniform vec3 foo;\n\
         varying vec3 v = foo.xzy;\n\
         void sample_pixel(vec2 a, vec2 b) {}\n\
         vec4 encode_pixel() { return vec4(0.0, 0.0, 0.0, 0.0); }\n",
    );
    assert!(!result.has_errors(), "{:?}", result.diags);
    let header = result.header.unwrap().header_text;
    assert!(header.contains("swizzle<0,2,1>::get(frame.foo)"));
}

#[test]
fn fallback_member() {
    let result = compiled(
        "uniform vec3 foo;\n\
         varying vec3 v = foo.memb;\n\
         void sample_pixel(vec2 a, vec2 b) {}\n\
         vec4 encode_pixel() { return vec4(0.0, 0.0, 0.0, 0.0); }\n",
    );
    assert!(!result.has_errors(), "{:?}", result.diags);
    let header = result.header.unwrap().header_text;
    assert!(header.contains("frame.foo.memb"));
}

#[test]
fn uniform_global_rewrite() {
    let result = compiled(
        "uniform float g;\n\
         varying float v = g * 2.0;\n\
         void sample_pixel(vec2 a, vec2 b) {}\n\
         vec4 encode_pixel() { return vec4(0.0, 0.0, 0.0, 0.0); }\n",
    );
    assert!(!result.has_errors(), "{:?}", result.diags);
    let header = result.header.unwrap().header_text;
    assert!(header.contains("frame.g * float_type(2.0)"));
}

#[test]
fn duplicate_globals_report_one_pair() {
    let result = compiled(
        "int a = 0; int a = 1;\n\
         void sample_pixel(vec2 x, vec2 y) {}\n\
         vec4 encode_pixel() { return vec4(0.0, 0.0, 0.0, 0.0); }\n",
    );
    let errors: Vec<_> = result
        .diags
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1, "{:?}", result.diags);
    assert_eq!(errors[0].span.first_line, 1);
    let notes: Vec<_> = result
        .diags
        .iter()
        .filter(|d| d.severity == Severity::Note)
        .collect();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].span.first_line, 1);
}

#[test]
fn missing_entry_point_reports_expected_message() {
    let result = compiled("void sample_pixel(vec2 a, vec2 b) {}\n");
    assert!(result.has_errors());
    assert!(result
        .diags
        .iter()
        .any(|d| d.message.contains("missing entry point 'EncodePixel'")));
    assert!(result.header.is_none());
}

#[test]
fn return_type_mismatch_reports_bare_type_names() {
    let result = compiled(
        "int f() { return 1.0; }\n\
         void sample_pixel(vec2 a, vec2 b) {}\n\
         vec4 encode_pixel() { return vec4(0.0, 0.0, 0.0, 0.0); }\n",
    );
    assert!(result.has_errors());
    assert!(result
        .diags
        .iter()
        .any(|d| d.message.contains("should return type 'int' not 'float'")));
}

#[test]
fn parser_never_panics_on_malformed_input() {
    let inputs = [
        "",
        "int",
        "int x",
        "void sample_pixel(",
        "if (true) { int x = 1; }",
        "for (;;) {}",
        "###",
        "int x = ;",
    ];
    for src in inputs {
        let result = compiled(src);
        // Totality: either it parsed (possibly with zero decls) or it
        // produced at least one diagnostic. Either way, no panic.
        let _ = result.module.decls.len();
    }
}

#[test]
fn lexer_is_idempotent_on_its_own_dump() {
    let src = "uniform float exposure; // comment\n";
    let (tokens, errors) = pt_compiler::compiler::lexer::Lexer::new(src).tokenize();
    assert!(errors.is_empty());
    let dump: String = tokens
        .iter()
        .map(|t| format!("{:?}\n", t.kind))
        .collect();
    let (tokens2, _) = pt_compiler::compiler::lexer::Lexer::new(&dump).tokenize();
    // Re-lexing the debug dump should not error; token kinds line up
    // one-for-one for everything that isn't whitespace-sensitive.
    let idents = tokens2
        .iter()
        .filter(|t| matches!(t.kind, TokenKind::Ident(_)))
        .count();
    assert!(idents <= tokens.len());
}
