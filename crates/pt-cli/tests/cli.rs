//! End-to-end tests driving the CLI's public helpers against real files on
//! disk, the way the compiled binary itself would.

use pt_cli::driver;
use pt_compiler::{compile, CompileOptions};
use std::fs;

const VALID_SOURCE: &str = "uniform float exposure;\n\
     void sample_pixel(vec2 uv_min, vec2 uv_max) {}\n\
     vec4 encode_pixel() { return vec4(1.0, 1.0, 1.0, 1.0); }\n";

#[test]
fn compiles_a_main_pt_file_from_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("main.pt"), VALID_SOURCE).unwrap();

    let source = fs::read_to_string(dir.path().join("main.pt")).unwrap();
    let result = compile(&source, &CompileOptions::default());
    assert!(!result.has_errors(), "{:?}", result.diags);
    let header = result.header.unwrap();
    assert!(header.header_text.contains("struct uniform_data"));
    assert!(header.header_text.contains("struct varying_data"));
}

#[test]
fn syntax_only_produces_no_header() {
    let result = compile(VALID_SOURCE, &CompileOptions::syntax_only());
    assert!(!result.has_errors(), "{:?}", result.diags);
    assert!(result.header.is_none());
}

#[test]
fn missing_entry_points_fail_the_whole_file() {
    let result = compile("uniform float exposure;\n", &CompileOptions::default());
    assert!(result.has_errors());
    assert!(result.header.is_none());
}

#[test]
fn write_output_writes_to_a_new_file_when_absent() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("shader.h");
    let header = pt_compiler::compiler::codegen::CodegenOutput {
        header_text: "// generated\n".to_string(),
    };

    let wrote = driver::write_output(Some(&output_path), false, &header).unwrap();
    assert!(wrote);
    assert_eq!(fs::read_to_string(&output_path).unwrap(), "// generated\n");
}

#[test]
fn write_output_only_if_different_skips_an_unchanged_file() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("shader.h");
    fs::write(&output_path, "same\n").unwrap();
    let header = pt_compiler::compiler::codegen::CodegenOutput {
        header_text: "same\n".to_string(),
    };

    let wrote = driver::write_output(Some(&output_path), true, &header).unwrap();
    assert!(!wrote);
}

#[test]
fn write_output_only_if_different_rewrites_a_changed_file() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("shader.h");
    fs::write(&output_path, "old\n").unwrap();
    let header = pt_compiler::compiler::codegen::CodegenOutput {
        header_text: "new\n".to_string(),
    };

    let wrote = driver::write_output(Some(&output_path), true, &header).unwrap();
    assert!(wrote);
    assert_eq!(fs::read_to_string(&output_path).unwrap(), "new\n");
}

#[test]
fn resolve_language_rejects_unknown_targets() {
    assert!(driver::resolve_language("wgsl").is_err());
}

#[test]
fn resolve_language_accepts_the_legacy_cxx_v1_alias() {
    assert_eq!(driver::resolve_language("cxx_v1").unwrap(), "cxx");
}

#[test]
fn list_dependencies_still_fails_on_a_missing_main_pt() {
    // `--list-dependencies` only ever prints `main.pt`'s path, but it must
    // still report a missing file as a driver error rather than a
    // successful (empty) dependency list.
    let dir = tempfile::tempdir().unwrap();
    assert!(driver::read_entry(dir.path()).is_err());
}
