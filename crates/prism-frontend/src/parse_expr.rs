//! Expression parsing: precedence climbing over the binary operator table,
//! unary prefixes, and postfix selector/index/call chains.

use crate::ast::*;
use crate::errors::ParseError;
use crate::parser::Parser;
use crate::token::TokenKind;

impl<'src> Parser<'src> {
    /// Parse an expression with all binary operators of precedence strictly
    /// greater than `min_prec`.
    pub(crate) fn expression(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;

        while self.kind().precedence() > min_prec {
            let op = self.advance();
            let prec = op.kind.precedence();
            let right = self.expression(prec)?;
            let range = left.range.merge(right.range);
            left = Expr {
                id: self.next_id(),
                kind: ExprKind::Binary(Box::new(BinaryExpr {
                    op,
                    lhs: left,
                    rhs: right,
                })),
                range,
            };
        }

        Ok(left)
    }

    /// Unary prefix operators bind tighter than any binary operator.
    fn unary(&mut self) -> Result<Expr, ParseError> {
        match self.kind() {
            TokenKind::Plus | TokenKind::Minus | TokenKind::Bang | TokenKind::Caret => {
                let op = self.advance();
                let base = self.unary()?;
                let range = op.range.merge(base.range);
                Ok(Expr {
                    id: self.next_id(),
                    kind: ExprKind::Unary(Box::new(UnaryExpr { op, base })),
                    range,
                })
            }
            _ => self.postfix(),
        }
    }

    /// Postfix `.ident`, `[expr]`, and `(args)` applied left-to-right.
    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;

        loop {
            match self.kind() {
                TokenKind::Dot => {
                    self.advance();
                    let selector = self.expect(TokenKind::Identifier)?;
                    let range = expr.range.merge(selector.range);
                    expr = Expr {
                        id: self.next_id(),
                        kind: ExprKind::Selector(Box::new(SelectorExpr {
                            base: expr,
                            selector,
                        })),
                        range,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.in_brackets(|p| p.expression(0))?;
                    let close = self.expect(TokenKind::RBracket)?;
                    let range = expr.range.merge(close.range);
                    expr = Expr {
                        id: self.next_id(),
                        kind: ExprKind::Index(Box::new(IndexExpr { base: expr, index })),
                        range,
                    };
                }
                TokenKind::LParen => {
                    self.advance();
                    let args = self.in_brackets(|p| p.call_args())?;
                    let close = self.expect(TokenKind::RParen)?;
                    let range = expr.range.merge(close.range);
                    expr = Expr {
                        id: self.next_id(),
                        kind: ExprKind::Call(Box::new(CallExpr { base: expr, args })),
                        range,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if self.check(TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expression(0)?);
            if self.match_token(TokenKind::Comma).is_none() {
                return Ok(args);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        match self.kind() {
            TokenKind::LiteralInt
            | TokenKind::LiteralFloat
            | TokenKind::LiteralString
            | TokenKind::LiteralRune
            | TokenKind::KwTrue
            | TokenKind::KwFalse => {
                let token = self.advance();
                Ok(Expr {
                    id: self.next_id(),
                    range: token.range,
                    kind: ExprKind::Literal(token),
                })
            }
            TokenKind::Identifier => {
                let token = self.advance();
                if self.check(TokenKind::LBrace) && self.no_complit == 0 {
                    let ty = Expr {
                        id: self.next_id(),
                        range: token.range,
                        kind: ExprKind::NamedType(NamedTypeExpr {
                            package: None,
                            name: token,
                        }),
                    };
                    return self.complit(ty);
                }
                Ok(Expr {
                    id: self.next_id(),
                    range: token.range,
                    kind: ExprKind::Identifier(token),
                })
            }
            TokenKind::LParen => {
                let open = self.advance();
                let base = self.in_brackets(|p| p.expression(0))?;
                let close = self.expect(TokenKind::RParen)?;
                Ok(Expr {
                    id: self.next_id(),
                    range: open.range.merge(close.range),
                    kind: ExprKind::Paren(Box::new(base)),
                })
            }
            // Type-denoting expressions; a following `{` starts a composite
            // literal.
            TokenKind::LBracket | TokenKind::KwFunc | TokenKind::KwStruct => {
                let ty = self.parse_type()?;
                if self.check(TokenKind::LBrace) && self.no_complit == 0 {
                    return self.complit(ty);
                }
                Ok(ty)
            }
            _ => Err(ParseError::ExpectedExpression {
                found: self.current().text.clone(),
                range: self.current().range,
            }),
        }
    }

    /// `T{elem, …}` with the type expression already parsed.
    fn complit(&mut self, ty: Expr) -> Result<Expr, ParseError> {
        self.expect(TokenKind::LBrace)?;
        let elems = self.in_brackets(|p| {
            let mut elems = Vec::new();
            while !p.check(TokenKind::RBrace) && !p.at_end() {
                elems.push(p.expression(0)?);
                if p.match_token(TokenKind::Comma).is_none() {
                    break;
                }
            }
            Ok(elems)
        })?;
        let close = self.expect(TokenKind::RBrace)?;
        let range = ty.range.merge(close.range);
        Ok(Expr {
            id: self.next_id(),
            kind: ExprKind::Complit(Box::new(ComplitExpr { ty, elems })),
            range,
        })
    }

    /// Run `f` with composite literals re-enabled; any bracketed context
    /// ends the control-flow-header restriction.
    pub(crate) fn in_brackets<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let saved = self.no_complit;
        self.no_complit = 0;
        let result = f(self);
        self.no_complit = saved;
        result
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{ExprKind, BinaryExpr};
    use crate::ast_printer::AstPrinter;
    use crate::lexer::scan_file;
    use crate::parser::Parser;
    use crate::source::SourceFile;

    fn parse(src: &str) -> crate::ast::Expr {
        let file = SourceFile::from_source("<test>".into(), src);
        let (tokens, errors) = scan_file(&file);
        assert!(errors.is_empty(), "lex errors: {errors:?}");
        let mut parser = Parser::new(&tokens);
        let expr = parser.parse_expr_root().expect("parse failed");
        assert!(!parser.has_errors(), "parse errors: {:?}", parser.take_errors());
        expr
    }

    fn print(src: &str) -> String {
        AstPrinter::new().print_expr(&parse(src))
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let expr = parse("1 + 2 * 3");
        let ExprKind::Binary(outer) = &expr.kind else {
            panic!("expected binary expr");
        };
        assert_eq!(outer.op.text, "+");
        let ExprKind::Binary(inner) = &outer.rhs.kind else {
            panic!("expected nested binary expr");
        };
        assert_eq!(inner.op.text, "*");
    }

    #[test]
    fn binary_operators_are_left_associative() {
        let expr = parse("1 - 2 - 3");
        let ExprKind::Binary(binary) = &expr.kind else {
            panic!("expected binary expr");
        };
        let BinaryExpr { op, lhs, .. } = binary.as_ref();
        assert_eq!(op.text, "-");
        assert!(matches!(lhs.kind, ExprKind::Binary(_)));
    }

    #[test]
    fn logical_or_is_lowest_precedence() {
        let expr = parse("a || b && c == d + e * f");
        let ExprKind::Binary(outer) = &expr.kind else {
            panic!("expected binary expr");
        };
        assert_eq!(outer.op.text, "||");
    }

    #[test]
    fn unary_binds_tighter_than_binary() {
        let expr = parse("-a + b");
        let ExprKind::Binary(outer) = &expr.kind else {
            panic!("expected binary expr");
        };
        assert!(matches!(outer.lhs.kind, ExprKind::Unary(_)));
    }

    #[test]
    fn postfix_chain_applies_left_to_right() {
        assert_eq!(
            print("a.b[0](c)"),
            "(CallExpr\n  (IndexExpr\n    (SelectorExpr \"b\"\n      (IdentifierExpr \"a\"))\n    (LiteralExpr \"0\"))\n  (IdentifierExpr \"c\"))"
        );
    }

    #[test]
    fn composite_literal_after_named_type() {
        let expr = parse("Point{1, 2}");
        assert!(matches!(expr.kind, ExprKind::Complit(_)));
    }

    #[test]
    fn parenthesised_expression() {
        let expr = parse("(1 + 2) * 3");
        let ExprKind::Binary(outer) = &expr.kind else {
            panic!("expected binary expr");
        };
        assert!(matches!(outer.lhs.kind, ExprKind::Paren(_)));
    }

    #[test]
    fn print_is_stable() {
        assert_eq!(
            print("1 + 2 * 3"),
            "(BinaryExpr \"+\"\n  (LiteralExpr \"1\")\n  (BinaryExpr \"*\"\n    (LiteralExpr \"2\")\n    (LiteralExpr \"3\")))"
        );
    }
}
