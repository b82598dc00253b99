// src/commands/check.rs

use std::io::{self, Write};
use std::path::Path;

use crate::unit::Unit;

/// Scan, parse, and type check a file, printing any diagnostics.
pub fn check(path: &Path, out: &mut dyn Write) -> io::Result<()> {
    let mut unit = Unit::from_path(path)?;
    if !unit.check() {
        unit.print_errors(out)?;
    }
    Ok(())
}
