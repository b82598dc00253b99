//! Statement parsing: simple statements, blocks, and control flow.

use crate::ast::*;
use crate::errors::ParseError;
use crate::parser::Parser;
use crate::token::TokenKind;

impl<'src> Parser<'src> {
    pub(crate) fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.kind() {
            TokenKind::KwVar | TokenKind::KwConst | TokenKind::KwType => {
                let decl = self.parse_generic_decl()?;
                let range = decl.range;
                Ok(Stmt {
                    id: self.next_id(),
                    kind: StmtKind::Decl(Box::new(decl)),
                    range,
                })
            }
            TokenKind::LBrace => self.parse_block(),
            TokenKind::KwReturn => self.parse_return(),
            TokenKind::KwBreak => {
                let token = self.advance();
                Ok(Stmt {
                    id: self.next_id(),
                    kind: StmtKind::Break,
                    range: token.range,
                })
            }
            TokenKind::KwContinue => {
                let token = self.advance();
                Ok(Stmt {
                    id: self.next_id(),
                    kind: StmtKind::Continue,
                    range: token.range,
                })
            }
            TokenKind::KwFallthrough => {
                let token = self.advance();
                Ok(Stmt {
                    id: self.next_id(),
                    kind: StmtKind::Fallthrough,
                    range: token.range,
                })
            }
            TokenKind::KwIf => self.parse_if(),
            TokenKind::KwFor => self.parse_for(),
            TokenKind::KwSwitch => self.parse_switch(),
            _ => self.parse_simple_stmt(),
        }
    }

    /// Expression statement, assignment, define, or `++`/`--`. Shared with
    /// the init clauses of `if`/`for`/`switch`.
    fn parse_simple_stmt(&mut self) -> Result<Stmt, ParseError> {
        if !self.starts_expr() {
            return Err(ParseError::ExpectedStatement {
                found: self.current().text.clone(),
                range: self.current().range,
            });
        }

        let lhs = self.expr_list()?;
        let start = lhs[0].range;

        if self.kind().is_assign_op() {
            let op = self.advance();
            let rhs = self.expr_list()?;
            let range = start.merge(rhs.last().map(|e| e.range).unwrap_or(op.range));
            return Ok(Stmt {
                id: self.next_id(),
                kind: StmtKind::Assign(Box::new(AssignStmt { lhs, op, rhs })),
                range,
            });
        }

        if matches!(self.kind(), TokenKind::PlusPlus | TokenKind::MinusMinus) {
            let op = self.advance();
            let mut lhs = lhs;
            let expr = lhs.remove(0);
            if !lhs.is_empty() {
                return Err(ParseError::ExpectedTerminator {
                    found: op.text.clone(),
                    range: op.range,
                });
            }
            let range = expr.range.merge(op.range);
            return Ok(Stmt {
                id: self.next_id(),
                kind: StmtKind::IncDec(Box::new(IncDecStmt { expr, op })),
                range,
            });
        }

        let mut lhs = lhs;
        let expr = lhs.remove(0);
        if !lhs.is_empty() {
            return Err(ParseError::ExpectedTerminator {
                found: self.current().text.clone(),
                range: self.current().range,
            });
        }
        let range = expr.range;
        Ok(Stmt {
            id: self.next_id(),
            kind: StmtKind::Expr(Box::new(expr)),
            range,
        })
    }

    fn starts_expr(&self) -> bool {
        matches!(
            self.kind(),
            TokenKind::Identifier
                | TokenKind::LiteralInt
                | TokenKind::LiteralFloat
                | TokenKind::LiteralString
                | TokenKind::LiteralRune
                | TokenKind::KwTrue
                | TokenKind::KwFalse
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::KwFunc
                | TokenKind::KwStruct
                | TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Bang
                | TokenKind::Caret
        )
    }

    pub(crate) fn expr_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut exprs = vec![self.expression(0)?];
        while self.match_token(TokenKind::Comma).is_some() {
            exprs.push(self.expression(0)?);
        }
        Ok(exprs)
    }

    /// `{ stmt* }` with recovery to statement boundaries inside the block.
    pub(crate) fn parse_block(&mut self) -> Result<Stmt, ParseError> {
        let open = self.expect(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        let saved = self.no_complit;
        self.no_complit = 0;
        while !self.check(TokenKind::RBrace) && !self.at_end() {
            if self.match_token(TokenKind::Semicolon).is_some() {
                continue;
            }
            match self.parse_stmt() {
                Ok(stmt) => {
                    stmts.push(stmt);
                    if let Err(err) = self.expect_terminator() {
                        self.record(err);
                        self.sync_to_stmt();
                    }
                }
                Err(err) => {
                    self.record(err);
                    self.sync_to_stmt();
                }
            }
        }
        self.no_complit = saved;
        let close = self.expect(TokenKind::RBrace)?;
        Ok(Stmt {
            id: self.next_id(),
            kind: StmtKind::Block(BlockStmt { stmts }),
            range: open.range.merge(close.range),
        })
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        let kw = self.advance();
        let mut exprs = Vec::new();
        if self.starts_expr() {
            exprs = self.expr_list()?;
        }
        let range = exprs
            .last()
            .map(|e| kw.range.merge(e.range))
            .unwrap_or(kw.range);
        Ok(Stmt {
            id: self.next_id(),
            kind: StmtKind::Return(ReturnStmt { exprs }),
            range,
        })
    }

    /// `if init?; cond { … } else?` — composite literals are suppressed in
    /// the header so the `{` binds to the body.
    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let kw = self.advance();

        self.no_complit += 1;
        let header = (|| -> Result<(Option<Stmt>, Expr), ParseError> {
            let first = self.parse_simple_stmt()?;
            if self.match_token(TokenKind::Semicolon).is_some() {
                let cond = self.expression(0)?;
                Ok((Some(first), cond))
            } else {
                let StmtKind::Expr(expr) = first.kind else {
                    return Err(ParseError::ExpectedExpression {
                        found: self.current().text.clone(),
                        range: first.range,
                    });
                };
                Ok((None, *expr))
            }
        })();
        self.no_complit -= 1;
        let (init, cond) = header?;

        let body = self.parse_block()?;

        let els = if self.match_token(TokenKind::KwElse).is_some() {
            if self.check(TokenKind::KwIf) {
                Some(self.parse_if()?)
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };

        let range = kw
            .range
            .merge(els.as_ref().map(|e| e.range).unwrap_or(body.range));
        Ok(Stmt {
            id: self.next_id(),
            kind: StmtKind::If(Box::new(IfStmt {
                init,
                cond,
                body,
                els,
            })),
            range,
        })
    }

    /// `for { … }`, `for cond { … }`, or `for init?; cond?; post? { … }`.
    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let kw = self.advance();

        self.no_complit += 1;
        let header = (|| -> Result<(Option<Stmt>, Option<Expr>, Option<Stmt>), ParseError> {
            if self.check(TokenKind::LBrace) {
                return Ok((None, None, None));
            }

            let first = if self.check(TokenKind::Semicolon) {
                None
            } else {
                Some(self.parse_simple_stmt()?)
            };

            if self.match_token(TokenKind::Semicolon).is_some() {
                let cond = if self.check(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.expression(0)?)
                };
                self.expect(TokenKind::Semicolon)?;
                let post = if self.check(TokenKind::LBrace) {
                    None
                } else {
                    Some(self.parse_simple_stmt()?)
                };
                Ok((first, cond, post))
            } else {
                // Condition-only form.
                match first {
                    Some(stmt) => {
                        let StmtKind::Expr(expr) = stmt.kind else {
                            return Err(ParseError::ExpectedExpression {
                                found: self.current().text.clone(),
                                range: stmt.range,
                            });
                        };
                        Ok((None, Some(*expr), None))
                    }
                    None => Ok((None, None, None)),
                }
            }
        })();
        self.no_complit -= 1;
        let (init, cond, post) = header?;

        let body = self.parse_block()?;
        let range = kw.range.merge(body.range);
        Ok(Stmt {
            id: self.next_id(),
            kind: StmtKind::For(Box::new(ForStmt {
                init,
                cond,
                post,
                body,
            })),
            range,
        })
    }

    /// `switch init?; tag? { case/default clauses }`.
    fn parse_switch(&mut self) -> Result<Stmt, ParseError> {
        let kw = self.advance();

        self.no_complit += 1;
        let header = (|| -> Result<(Option<Stmt>, Option<Expr>), ParseError> {
            if self.check(TokenKind::LBrace) {
                return Ok((None, None));
            }
            let first = self.parse_simple_stmt()?;
            if self.match_token(TokenKind::Semicolon).is_some() {
                let tag = if self.check(TokenKind::LBrace) {
                    None
                } else {
                    Some(self.expression(0)?)
                };
                Ok((Some(first), tag))
            } else {
                let StmtKind::Expr(expr) = first.kind else {
                    return Err(ParseError::ExpectedExpression {
                        found: self.current().text.clone(),
                        range: first.range,
                    });
                };
                Ok((None, Some(*expr)))
            }
        })();
        self.no_complit -= 1;
        let (init, tag) = header?;

        self.expect(TokenKind::LBrace)?;
        let mut body = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.at_end() {
            if self.match_token(TokenKind::Semicolon).is_some() {
                continue;
            }
            body.push(self.parse_switch_case()?);
        }
        let close = self.expect(TokenKind::RBrace)?;

        let range = kw.range.merge(close.range);
        Ok(Stmt {
            id: self.next_id(),
            kind: StmtKind::Switch(Box::new(SwitchStmt { init, tag, body })),
            range,
        })
    }

    fn parse_switch_case(&mut self) -> Result<Stmt, ParseError> {
        let (kw, values, is_default) = match self.kind() {
            TokenKind::KwCase => {
                let kw = self.advance();
                let values = self.expr_list()?;
                (kw, values, false)
            }
            TokenKind::KwDefault => (self.advance(), Vec::new(), true),
            _ => {
                return Err(ParseError::ExpectedSwitchCase {
                    found: self.current().text.clone(),
                    range: self.current().range,
                });
            }
        };
        self.expect(TokenKind::Colon)?;

        let mut stmts = Vec::new();
        while !matches!(
            self.kind(),
            TokenKind::KwCase | TokenKind::KwDefault | TokenKind::RBrace
        ) && !self.at_end()
        {
            if self.match_token(TokenKind::Semicolon).is_some() {
                continue;
            }
            let stmt = self.parse_stmt()?;
            stmts.push(stmt);
            self.expect_case_terminator()?;
        }

        let range = kw.range.merge(self.prev_range());
        Ok(Stmt {
            id: self.next_id(),
            kind: StmtKind::SwitchCase(SwitchCaseStmt {
                values,
                stmts,
                is_default,
            }),
            range,
        })
    }

    /// Like `expect_terminator`, but a following `case`/`default` also ends
    /// the statement list.
    fn expect_case_terminator(&mut self) -> Result<(), ParseError> {
        if matches!(self.kind(), TokenKind::KwCase | TokenKind::KwDefault) {
            return Ok(());
        }
        self.expect_terminator()
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::lexer::scan_file;
    use crate::parser::Parser;
    use crate::source::SourceFile;

    fn parse(src: &str) -> Stmt {
        let file = SourceFile::from_source("<test>".into(), src);
        let (tokens, errors) = scan_file(&file);
        assert!(errors.is_empty(), "lex errors: {errors:?}");
        let mut parser = Parser::new(&tokens);
        let stmt = parser.parse_stmt_root().expect("parse failed");
        assert!(!parser.has_errors(), "parse errors: {:?}", parser.take_errors());
        stmt
    }

    #[test]
    fn define_statement() {
        let stmt = parse("x := 1");
        let StmtKind::Assign(assign) = &stmt.kind else {
            panic!("expected assign");
        };
        assert_eq!(assign.op.text, ":=");
        assert_eq!(assign.lhs.len(), 1);
        assert_eq!(assign.rhs.len(), 1);
    }

    #[test]
    fn multi_assignment() {
        let stmt = parse("a, b = 1, 2");
        let StmtKind::Assign(assign) = &stmt.kind else {
            panic!("expected assign");
        };
        assert_eq!(assign.lhs.len(), 2);
        assert_eq!(assign.rhs.len(), 2);
    }

    #[test]
    fn compound_assignment_operators() {
        for op in ["+=", "-=", "*=", "/=", "%=", "&=", "&^=", "|=", "^=", "<<=", ">>="] {
            let stmt = parse(&format!("x {op} 1"));
            let StmtKind::Assign(assign) = &stmt.kind else {
                panic!("expected assign for {op}");
            };
            assert_eq!(assign.op.text, op);
        }
    }

    #[test]
    fn inc_dec_statements() {
        assert!(matches!(parse("x++").kind, StmtKind::IncDec(_)));
        assert!(matches!(parse("x--").kind, StmtKind::IncDec(_)));
    }

    #[test]
    fn if_with_init_and_else() {
        let stmt = parse("if x := f(); x { g() } else { h() }");
        let StmtKind::If(ifs) = &stmt.kind else {
            panic!("expected if");
        };
        assert!(ifs.init.is_some());
        assert!(ifs.els.is_some());
    }

    #[test]
    fn if_header_does_not_eat_the_body_as_complit() {
        let stmt = parse("if x { y() }");
        let StmtKind::If(ifs) = &stmt.kind else {
            panic!("expected if");
        };
        assert!(matches!(ifs.cond.kind, ExprKind::Identifier(_)));
    }

    #[test]
    fn for_three_forms() {
        let infinite = parse("for { x() }");
        let StmtKind::For(f) = &infinite.kind else { panic!() };
        assert!(f.init.is_none() && f.cond.is_none() && f.post.is_none());

        let cond_only = parse("for x < 10 { x++ }");
        let StmtKind::For(f) = &cond_only.kind else { panic!() };
        assert!(f.init.is_none() && f.cond.is_some() && f.post.is_none());

        let three = parse("for i := 0; i < 10; i++ { f(i) }");
        let StmtKind::For(f) = &three.kind else { panic!() };
        assert!(f.init.is_some() && f.cond.is_some() && f.post.is_some());
    }

    #[test]
    fn switch_with_cases_and_default() {
        let stmt = parse("switch x {\ncase 1, 2:\n  f()\ncase 3:\n  g()\n  fallthrough\ndefault:\n  h()\n}");
        let StmtKind::Switch(switch) = &stmt.kind else {
            panic!("expected switch");
        };
        assert!(switch.tag.is_some());
        assert_eq!(switch.body.len(), 3);
        let StmtKind::SwitchCase(first) = &switch.body[0].kind else {
            panic!("expected case");
        };
        assert_eq!(first.values.len(), 2);
        let StmtKind::SwitchCase(last) = &switch.body[2].kind else {
            panic!("expected default");
        };
        assert!(last.is_default);
    }

    #[test]
    fn tagless_switch() {
        let stmt = parse("switch {\ncase x > 0:\n  f()\n}");
        let StmtKind::Switch(switch) = &stmt.kind else {
            panic!("expected switch");
        };
        assert!(switch.tag.is_none());
    }

    #[test]
    fn return_with_expression_list() {
        let stmt = parse("return 1, 2");
        let StmtKind::Return(ret) = &stmt.kind else {
            panic!("expected return");
        };
        assert_eq!(ret.exprs.len(), 2);
    }

    #[test]
    fn nested_blocks() {
        let stmt = parse("{\n  x := 1\n  { y := 2 }\n}");
        let StmtKind::Block(block) = &stmt.kind else {
            panic!("expected block");
        };
        assert_eq!(block.stmts.len(), 2);
    }
}
