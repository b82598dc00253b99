use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use prism::cli::{Cli, Commands};
use prism::commands::{
    check, parse_decl, parse_expr, parse_stmt, run_golden, scan, spirv_bin, spirv_text, Command,
    GoldenKind,
};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut stdout = io::stdout();

    let result = match &cli.command {
        Commands::Scan { file } => run_file(scan, file, &mut stdout),
        Commands::ParseExpr { file } => run_file(parse_expr, file, &mut stdout),
        Commands::ParseStmt { file } => run_file(parse_stmt, file, &mut stdout),
        Commands::ParseDecl { file } => run_file(parse_decl, file, &mut stdout),
        Commands::Check { file } => run_file(check, file, &mut stdout),
        Commands::Spirv { file } => run_file(spirv_text, file, &mut stdout),
        Commands::SpirvBin { file } => run_file(spirv_bin, file, &mut stdout),
        Commands::TestScan { dir, update } => {
            run_tests(scan, dir, GoldenKind::Text, *update, &mut stdout)
        }
        Commands::TestParseExpr { dir, update } => {
            run_tests(parse_expr, dir, GoldenKind::Text, *update, &mut stdout)
        }
        Commands::TestParseStmt { dir, update } => {
            run_tests(parse_stmt, dir, GoldenKind::Text, *update, &mut stdout)
        }
        Commands::TestParseDecl { dir, update } => {
            run_tests(parse_decl, dir, GoldenKind::Text, *update, &mut stdout)
        }
        Commands::TestCheck { dir, update } => {
            run_tests(check, dir, GoldenKind::Text, *update, &mut stdout)
        }
        Commands::TestSpirv { dir, update } => {
            run_tests(spirv_text, dir, GoldenKind::Text, *update, &mut stdout)
        }
        Commands::TestSpirvBin { dir, update } => {
            run_tests(spirv_bin, dir, GoldenKind::Binary, *update, &mut stdout)
        }
    };

    match result {
        Ok(ok) => {
            if ok {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_file(command: Command, file: &Path, out: &mut dyn Write) -> io::Result<bool> {
    command(file, out)?;
    Ok(true)
}

fn run_tests(
    command: Command,
    dir: &Path,
    kind: GoldenKind,
    update: bool,
    out: &mut dyn Write,
) -> io::Result<bool> {
    run_golden(dir, command, kind, update, out)
}
