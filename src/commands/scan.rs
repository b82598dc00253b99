// src/commands/scan.rs

use std::io::{self, Write};
use std::path::Path;

use crate::unit::Unit;

/// Print the token stream, one line per token:
/// `KIND "lexeme" line:col line:col [begin-end]`.
pub fn scan(path: &Path, out: &mut dyn Write) -> io::Result<()> {
    let mut unit = Unit::from_path(path)?;

    if !unit.scan() {
        unit.print_errors(out)?;
        return Ok(());
    }

    for token in unit.tokens() {
        writeln!(
            out,
            "{:<15} {:<20} {:>4}:{:<4} {:>4}:{:<4} [{}-{}]",
            token.kind.name(),
            format!("{:?}", token.text),
            token.range.begin.line,
            token.range.begin.column,
            token.range.end.line,
            token.range.end.column,
            token.range.begin.offset,
            token.range.end.offset,
        )?;
    }
    Ok(())
}
