//! Parser state, helpers, and error recovery.
//!
//! The grammar lives in `parse_expr`, `parse_type`, `parse_stmt`, and
//! `parse_decl`; this module owns the token cursor, node-id allocation, and
//! the synchronisation points used after a syntax error.

use crate::ast::{Decl, Expr, File, Ident, NodeId, Stmt};
use crate::errors::ParseError;
use crate::source::SourceRange;
use crate::token::{Token, TokenKind};

pub struct Parser<'src> {
    tokens: &'src [Token],
    pos: usize,
    next_id: u32,
    errors: Vec<ParseError>,
    /// When > 0, a `{` after a bare type name belongs to a control-flow body
    /// rather than a composite literal.
    pub(crate) no_complit: u32,
}

impl<'src> Parser<'src> {
    pub fn new(tokens: &'src [Token]) -> Self {
        Parser {
            tokens,
            pos: 0,
            next_id: 0,
            errors: Vec::new(),
            no_complit: 0,
        }
    }

    pub fn take_errors(&mut self) -> Vec<ParseError> {
        std::mem::take(&mut self.errors)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub(crate) fn next_id(&mut self) -> NodeId {
        let id = NodeId::new(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub(crate) fn kind(&self) -> TokenKind {
        self.current().kind
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    pub(crate) fn at_end(&self) -> bool {
        matches!(self.kind(), TokenKind::Eof | TokenKind::Invalid)
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if !self.at_end() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn match_token(&mut self, kind: TokenKind) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::ExpectedToken {
                expected: kind.as_str(),
                found: self.current().text.clone(),
                range: self.current().range,
            })
        }
    }

    pub(crate) fn expect_ident(&mut self) -> Result<Ident, ParseError> {
        let token = self.expect(TokenKind::Identifier)?;
        Ok(Ident {
            id: self.next_id(),
            token,
        })
    }

    /// A statement terminator: a (possibly synthetic) `;`, or the closing
    /// brace / end of file that ends the enclosing list.
    pub(crate) fn expect_terminator(&mut self) -> Result<(), ParseError> {
        if self.match_token(TokenKind::Semicolon).is_some() {
            return Ok(());
        }
        if self.check(TokenKind::RBrace) || self.at_end() {
            return Ok(());
        }
        Err(ParseError::ExpectedTerminator {
            found: self.current().text.clone(),
            range: self.current().range,
        })
    }

    pub(crate) fn prev_range(&self) -> SourceRange {
        if self.pos == 0 {
            return self.current().range;
        }
        self.tokens[self.pos - 1].range
    }

    pub(crate) fn save(&self) -> (usize, u32) {
        (self.pos, self.next_id)
    }

    pub(crate) fn restore(&mut self, state: (usize, u32)) {
        self.pos = state.0;
        self.next_id = state.1;
    }

    pub(crate) fn record(&mut self, err: ParseError) {
        self.errors.push(err);
    }

    /// Skip to the next top-level declaration keyword, balancing braces so a
    /// keyword inside a half-parsed body does not stop the skip early.
    /// Always makes progress, even when the error token is itself a
    /// declaration keyword.
    pub(crate) fn sync_to_decl(&mut self) {
        let mut depth: u32 = 0;
        if !self.at_end() {
            if self.check(TokenKind::LBrace) {
                depth += 1;
            }
            self.advance();
        }
        while !self.at_end() {
            match self.kind() {
                TokenKind::LBrace => {
                    depth += 1;
                    self.advance();
                }
                TokenKind::RBrace => {
                    depth = depth.saturating_sub(1);
                    self.advance();
                }
                TokenKind::KwFunc | TokenKind::KwVar | TokenKind::KwConst | TokenKind::KwType
                    if depth == 0 =>
                {
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Skip to the next statement boundary inside a block: past a terminator
    /// or up to the block's closing brace.
    pub(crate) fn sync_to_stmt(&mut self) {
        let mut depth: u32 = 0;
        while !self.at_end() {
            match self.kind() {
                TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::LBrace => {
                    depth += 1;
                    self.advance();
                }
                TokenKind::RBrace => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    self.advance();
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Parse a single expression; the root for `parse-expr`. Returns `None`
    /// and records a diagnostic on a syntax error.
    pub fn parse_expr_root(&mut self) -> Option<Expr> {
        match self.expression(0) {
            Ok(expr) => Some(expr),
            Err(err) => {
                self.record(err);
                None
            }
        }
    }

    /// Parse a single statement; the root for `parse-stmt`.
    pub fn parse_stmt_root(&mut self) -> Option<Stmt> {
        match self.parse_stmt() {
            Ok(stmt) => Some(stmt),
            Err(err) => {
                self.record(err);
                None
            }
        }
    }

    /// Parse a single declaration; the root for `parse-decl`.
    pub fn parse_decl_root(&mut self) -> Option<Decl> {
        match self.parse_decl() {
            Ok(decl) => Some(decl),
            Err(err) => {
                self.record(err);
                None
            }
        }
    }

    /// Parse a whole file: top-level declarations until end of input,
    /// recovering at declaration boundaries.
    pub fn parse_file(&mut self) -> File {
        let mut decls = Vec::new();
        while !self.at_end() {
            if self.match_token(TokenKind::Semicolon).is_some() {
                continue;
            }
            match self.parse_decl() {
                Ok(decl) => {
                    decls.push(decl);
                    if let Err(err) = self.expect_terminator() {
                        self.record(err);
                        self.sync_to_decl();
                    }
                }
                Err(err) => {
                    self.record(err);
                    self.sync_to_decl();
                }
            }
        }
        File { decls }
    }
}
