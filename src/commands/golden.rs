// src/commands/golden.rs

//! The golden-file harness behind the `test-*` subcommands.
//!
//! A fixture directory holds `<name>` input files next to `<name>.golden`
//! (text) or `<name>.golden.bin` (binary) expectations. Text comparisons
//! normalise CRLF to LF and trim trailing whitespace; binary comparisons
//! are byte-exact. `--update` rewrites the golden files with the actual
//! output instead of failing.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoldenKind {
    Text,
    Binary,
}

impl GoldenKind {
    fn extension(self) -> &'static str {
        match self {
            GoldenKind::Text => ".golden",
            GoldenKind::Binary => ".golden.bin",
        }
    }
}

/// Run `command` over every fixture under `dir`. Returns true when every
/// fixture passed (or was updated).
pub fn run_golden(
    dir: &Path,
    command: Command,
    kind: GoldenKind,
    update: bool,
    out: &mut dyn Write,
) -> io::Result<bool> {
    let mut golden_files: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.to_string_lossy().ends_with(kind.extension()) {
            golden_files.push(path.to_path_buf());
        }
    }

    let mut failed: Vec<PathBuf> = Vec::new();

    for (i, golden_file) in golden_files.iter().enumerate() {
        let golden_name = golden_file.to_string_lossy();
        let input_file = PathBuf::from(
            golden_name
                .strip_suffix(kind.extension())
                .expect("golden file carries the extension"),
        );

        writeln!(
            out,
            "{}/{}) testing {}",
            i + 1,
            golden_files.len(),
            input_file.display()
        )?;

        let mut actual: Vec<u8> = Vec::new();
        command(&input_file, &mut actual)?;

        let expected = fs::read(golden_file)?;
        let matches = match kind {
            GoldenKind::Binary => expected == actual,
            GoldenKind::Text => {
                clean_text(&expected) == clean_text(&actual)
            }
        };

        if matches {
            writeln!(out, "SUCCESS")?;
        } else if update {
            match kind {
                GoldenKind::Binary => fs::write(golden_file, &actual)?,
                GoldenKind::Text => {
                    let mut content = actual;
                    content.push(b'\n');
                    fs::write(golden_file, content)?;
                }
            }
            writeln!(out, "UPDATED")?;
        } else {
            writeln!(out, "FAILURE")?;
            failed.push(input_file);
        }
    }

    Ok(failed.is_empty())
}

/// CRLF→LF plus leading/trailing whitespace trim, mirroring how golden text
/// files are stored and checked out across platforms.
fn clean_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .replace("\r\n", "\n")
        .trim()
        .to_string()
}
