// src/commands/spirv.rs

use std::io::{self, Write};
use std::path::Path;

use prism_spirv::{BinaryPrinter, TextPrinter};

use crate::unit::Unit;

/// Compile a file and print the module as SPIR-V assembly.
pub fn spirv_text(path: &Path, out: &mut dyn Write) -> io::Result<()> {
    let mut unit = Unit::from_path(path)?;
    match unit.emit_spirv() {
        Some(module) => out.write_all(TextPrinter::new(&module).print().as_bytes()),
        None => unit.print_errors(out),
    }
}

/// Compile a file and write the module in the SPIR-V binary layout.
pub fn spirv_bin(path: &Path, out: &mut dyn Write) -> io::Result<()> {
    let mut unit = Unit::from_path(path)?;
    match unit.emit_spirv() {
        Some(module) => out.write_all(&BinaryPrinter::new(&module).print()),
        None => unit.print_errors(out),
    }
}
