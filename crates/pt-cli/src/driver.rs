//! Compile-driver helpers shared between the `pt` binary and its integration
//! tests: language resolution and the output-writing policy.

use crate::colors;
use anyhow::{bail, Context, Result};
use pt_compiler::compiler::codegen::CodegenOutput;
use std::fs;
use std::path::{Path, PathBuf};

/// `cxx_v1` names the older monomorphic generator shape this core doesn't
/// implement; accept it as a legacy alias and fall back with a warning
/// rather than refusing outright.
pub fn resolve_language(requested: &str) -> Result<&'static str> {
    match requested {
        "cxx" => Ok("cxx"),
        "cxx_v1" => {
            eprintln!(
                "{}: '-l cxx_v1' is a legacy alias; generating the current 'cxx' shape instead",
                colors::yellow("warning")
            );
            Ok("cxx")
        }
        other => bail!("'{other}' is not a supported language"),
    }
}

/// Resolves and opens `<dir>/main.pt`. Every flag that needs the entry
/// file — including `--list-dependencies`, which only prints its path —
/// goes through this first, so a missing source file is always a driver
/// error rather than something a listing flag can paper over.
pub fn read_entry(dir: &Path) -> Result<(PathBuf, String)> {
    let entry_path = dir.join("main.pt");
    let source = fs::read_to_string(&entry_path)
        .with_context(|| format!("failed to open '{}'", entry_path.display()))?;
    Ok((entry_path, source))
}

/// Writes `header` to `output_path`, or to stdout when `output_path` is
/// `None`. Returns whether a write actually happened (`false` when
/// `only_if_different` skipped an identical file).
pub fn write_output(
    output_path: Option<&Path>,
    only_if_different: bool,
    header: &CodegenOutput,
) -> Result<bool> {
    let Some(output_path) = output_path else {
        print!("{}", header.header_text);
        return Ok(true);
    };

    if only_if_different {
        if let Ok(existing) = fs::read_to_string(output_path) {
            if existing == header.header_text {
                return Ok(false);
            }
        }
    }

    fs::write(output_path, &header.header_text)
        .with_context(|| format!("failed to write '{}'", output_path.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_language() {
        assert!(resolve_language("glsl").is_err());
    }

    #[test]
    fn accepts_legacy_language_alias() {
        assert_eq!(resolve_language("cxx_v1").unwrap(), "cxx");
    }

    #[test]
    fn read_entry_fails_on_a_missing_main_pt() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_entry(dir.path()).is_err());
    }

    #[test]
    fn read_entry_returns_the_entry_path_and_its_contents() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("main.pt"), "int x = 1;\n").unwrap();
        let (path, source) = read_entry(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("main.pt"));
        assert_eq!(source, "int x = 1;\n");
    }
}
