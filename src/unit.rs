//! The compilation unit: one source file moving through the pipeline.
//!
//! Stages run in order — scan, parse, check, lower, rewrite — and each
//! stage gates on the previous one leaving no diagnostics behind. The unit
//! owns the source text, token stream, AST, semantic info, and diagnostics
//! for its whole lifetime.

use std::io::{self, Write};
use std::path::Path;

use prism_codegen::lower;
use prism_frontend::{scan_file, Diagnostic, Parser, SourceFile, Token};
use prism_sema::SemanticInfo;
use prism_spirv::{rewrite, Module};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Start,
    Scanned,
    Parsed,
    Checked,
    Failure,
}

pub struct Unit {
    file: SourceFile,
    stage: Stage,
    tokens: Vec<Token>,
    ast: Option<prism_frontend::File>,
    info: Option<SemanticInfo>,
    diagnostics: Vec<Diagnostic>,
}

impl Unit {
    pub fn from_path(path: &Path) -> io::Result<Unit> {
        Ok(Unit::new(SourceFile::from_path(path)?))
    }

    pub fn from_source(path: &str, source: &str) -> Unit {
        Unit::new(SourceFile::from_source(path.to_string(), source))
    }

    fn new(file: SourceFile) -> Unit {
        Unit {
            file,
            stage: Stage::Start,
            tokens: Vec::new(),
            ast: None,
            info: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn file(&self) -> &SourceFile {
        &self.file
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn ast(&self) -> Option<&prism_frontend::File> {
        self.ast.as_ref()
    }

    pub fn semantic_info(&self) -> Option<&SemanticInfo> {
        self.info.as_ref()
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn print_errors(&self, out: &mut dyn Write) -> io::Result<()> {
        for diagnostic in &self.diagnostics {
            writeln!(out, "{diagnostic}")?;
        }
        Ok(())
    }

    pub fn scan(&mut self) -> bool {
        if self.stage != Stage::Start {
            return !self.has_errors();
        }
        let (tokens, errors) = scan_file(&self.file);
        self.tokens = tokens;
        self.diagnostics
            .extend(errors.into_iter().map(|e| e.into_diagnostic()));
        if self.has_errors() {
            self.stage = Stage::Failure;
            false
        } else {
            self.stage = Stage::Scanned;
            true
        }
    }

    pub fn parse(&mut self) -> bool {
        if !self.scan() {
            return false;
        }
        if self.stage != Stage::Scanned {
            return !self.has_errors();
        }
        let mut parser = Parser::new(&self.tokens);
        let ast = parser.parse_file();
        let errors = parser.take_errors();
        self.diagnostics
            .extend(errors.into_iter().map(|e| e.into_diagnostic()));
        if self.has_errors() {
            self.stage = Stage::Failure;
            false
        } else {
            self.ast = Some(ast);
            self.stage = Stage::Parsed;
            true
        }
    }

    pub fn check(&mut self) -> bool {
        if !self.parse() {
            return false;
        }
        if self.stage != Stage::Parsed {
            return !self.has_errors();
        }
        let ast = self.ast.as_ref().expect("parsed unit without an AST");
        let (info, diagnostics) = prism_sema::check(ast);
        self.info = Some(info);
        self.diagnostics.extend(diagnostics);
        if self.has_errors() {
            self.stage = Stage::Failure;
            false
        } else {
            self.stage = Stage::Checked;
            true
        }
    }

    /// Lower the checked unit and run the structural rewrite passes.
    pub fn emit_spirv(&mut self) -> Option<Module> {
        if !self.check() {
            return None;
        }
        let ast = self.ast.as_ref().expect("checked unit without an AST");
        let info = self.info.as_ref().expect("checked unit without info");
        match lower(ast, info) {
            Ok(mut module) => {
                rewrite(&mut module);
                Some(module)
            }
            Err(err) => {
                self.diagnostics.push(err.into_diagnostic());
                self.stage = Stage::Failure;
                None
            }
        }
    }
}
