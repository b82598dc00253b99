// src/commands/parse.rs

use std::io::{self, Write};
use std::path::Path;

use prism_frontend::{AstPrinter, Parser};

use crate::unit::Unit;

/// Parse a single expression and print its s-expression form.
pub fn parse_expr(path: &Path, out: &mut dyn Write) -> io::Result<()> {
    parse_root(path, out, |parser| {
        parser.parse_expr_root().map(|e| AstPrinter::new().print_expr(&e))
    })
}

/// Parse a single statement and print its s-expression form.
pub fn parse_stmt(path: &Path, out: &mut dyn Write) -> io::Result<()> {
    parse_root(path, out, |parser| {
        parser.parse_stmt_root().map(|s| AstPrinter::new().print_stmt(&s))
    })
}

/// Parse a single declaration and print its s-expression form.
pub fn parse_decl(path: &Path, out: &mut dyn Write) -> io::Result<()> {
    parse_root(path, out, |parser| {
        parser.parse_decl_root().map(|d| AstPrinter::new().print_decl(&d))
    })
}

fn parse_root(
    path: &Path,
    out: &mut dyn Write,
    parse: impl FnOnce(&mut Parser) -> Option<String>,
) -> io::Result<()> {
    let mut unit = Unit::from_path(path)?;

    if !unit.scan() {
        unit.print_errors(out)?;
        return Ok(());
    }

    let tokens = unit.tokens().to_vec();
    let mut parser = Parser::new(&tokens);
    let printed = parse(&mut parser);
    match printed {
        Some(text) if !parser.has_errors() => {
            writeln!(out, "{text}")?;
        }
        _ => {
            for err in parser.take_errors() {
                writeln!(out, "{}", err.into_diagnostic())?;
            }
        }
    }
    Ok(())
}
