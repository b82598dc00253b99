// src/commands/mod.rs

mod check;
mod golden;
mod parse;
mod scan;
mod spirv;

pub use check::check;
pub use golden::{run_golden, GoldenKind};
pub use parse::{parse_decl, parse_expr, parse_stmt};
pub use scan::scan;
pub use spirv::{spirv_bin, spirv_text};

use std::io::{self, Write};
use std::path::Path;

/// A per-file command: reads one source file, writes its output. The golden
/// harness runs these against an in-memory buffer.
pub type Command = fn(&Path, &mut dyn Write) -> io::Result<()>;
