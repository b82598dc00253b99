// src/cli/args.rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Prism shader language compiler
#[derive(Parser)]
#[command(name = "prism")]
#[command(about = "Prism shader language compiler", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a source file and print its tokens
    Scan {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Parse a single expression and print its AST
    ParseExpr {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Parse a single statement and print its AST
    ParseStmt {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Parse a single declaration and print its AST
    ParseDecl {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Type check a program and print any diagnostics
    Check {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Emit SPIR-V assembly text
    Spirv {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Emit SPIR-V binary
    SpirvBin {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Run the scan golden tests in a directory
    TestScan {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
        /// Rewrite golden files with the actual output
        #[arg(long)]
        update: bool,
    },
    /// Run the expression parsing golden tests in a directory
    TestParseExpr {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
        #[arg(long)]
        update: bool,
    },
    /// Run the statement parsing golden tests in a directory
    TestParseStmt {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
        #[arg(long)]
        update: bool,
    },
    /// Run the declaration parsing golden tests in a directory
    TestParseDecl {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
        #[arg(long)]
        update: bool,
    },
    /// Run the type checking golden tests in a directory
    TestCheck {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
        #[arg(long)]
        update: bool,
    },
    /// Run the SPIR-V assembly golden tests in a directory
    TestSpirv {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
        #[arg(long)]
        update: bool,
    },
    /// Run the SPIR-V binary golden tests in a directory
    TestSpirvBin {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
        #[arg(long)]
        update: bool,
    },
}
