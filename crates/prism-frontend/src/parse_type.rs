//! Type expression parsing: named types, arrays, function types, and
//! struct types. Types are expressions in the AST so the checker can resolve
//! them through the same path as values.

use crate::ast::*;
use crate::errors::ParseError;
use crate::parser::Parser;
use crate::token::TokenKind;

impl<'src> Parser<'src> {
    pub(crate) fn starts_type(&self) -> bool {
        matches!(
            self.kind(),
            TokenKind::Identifier | TokenKind::LBracket | TokenKind::KwFunc | TokenKind::KwStruct
        )
    }

    pub(crate) fn parse_type(&mut self) -> Result<Expr, ParseError> {
        match self.kind() {
            TokenKind::Identifier => {
                let first = self.advance();
                if self.check(TokenKind::Dot) {
                    self.advance();
                    let name = self.expect(TokenKind::Identifier)?;
                    let range = first.range.merge(name.range);
                    return Ok(Expr {
                        id: self.next_id(),
                        kind: ExprKind::NamedType(NamedTypeExpr {
                            package: Some(first),
                            name,
                        }),
                        range,
                    });
                }
                Ok(Expr {
                    id: self.next_id(),
                    range: first.range,
                    kind: ExprKind::NamedType(NamedTypeExpr {
                        package: None,
                        name: first,
                    }),
                })
            }
            TokenKind::LBracket => {
                let open = self.advance();
                let length = if self.check(TokenKind::RBracket) {
                    None
                } else {
                    Some(self.in_brackets(|p| p.expression(0))?)
                };
                self.expect(TokenKind::RBracket)?;
                let elem = self.parse_type()?;
                let range = open.range.merge(elem.range);
                Ok(Expr {
                    id: self.next_id(),
                    kind: ExprKind::ArrayType(Box::new(ArrayTypeExpr { length, elem })),
                    range,
                })
            }
            TokenKind::KwFunc => {
                let kw = self.advance();
                let ty = self.parse_func_type_tail()?;
                let range = kw.range.merge(self.prev_range());
                Ok(Expr {
                    id: self.next_id(),
                    kind: ty,
                    range,
                })
            }
            TokenKind::KwStruct => {
                let kw = self.advance();
                let open = self.expect(TokenKind::LBrace)?;
                let fields = self.struct_fields(open.range)?;
                let close = self.expect(TokenKind::RBrace)?;
                let range = kw.range.merge(close.range);
                Ok(Expr {
                    id: self.next_id(),
                    kind: ExprKind::StructType(StructTypeExpr { fields }),
                    range,
                })
            }
            _ => Err(ParseError::ExpectedType {
                found: self.current().text.clone(),
                range: self.current().range,
            }),
        }
    }

    /// The `(params) (results)?` part shared by func type expressions and
    /// func declarations (which have already consumed `func` and the name).
    pub(crate) fn parse_func_type_tail(&mut self) -> Result<ExprKind, ParseError> {
        let open = self.expect(TokenKind::LParen)?;
        let params = self.field_list_parens(open.range)?;
        let result = self.parse_func_result()?;
        Ok(ExprKind::FuncType(Box::new(FuncTypeExpr { params, result })))
    }

    fn parse_func_result(&mut self) -> Result<Option<FieldList>, ParseError> {
        if let Some(open) = self.match_token(TokenKind::LParen) {
            return Ok(Some(self.field_list_parens(open.range)?));
        }
        if self.starts_type() {
            let ty = self.parse_type()?;
            let range = ty.range;
            return Ok(Some(FieldList {
                fields: vec![Field {
                    names: Vec::new(),
                    range: ty.range,
                    ty,
                }],
                range,
            }));
        }
        Ok(None)
    }

    /// A parenthesised field list; the opening paren is already consumed.
    ///
    /// Fields are either `names+ type` or a bare type. A leading identifier
    /// run is tentatively read as names and rolled back when no type
    /// follows, which makes `(int, float32)` and `(a, b int)` both parse.
    fn field_list_parens(&mut self, open: crate::source::SourceRange) -> Result<FieldList, ParseError> {
        let mut fields = Vec::new();
        self.in_brackets(|p| {
            if p.check(TokenKind::RParen) {
                return Ok(());
            }
            loop {
                fields.push(p.parse_param_field()?);
                if p.match_token(TokenKind::Comma).is_none() {
                    return Ok(());
                }
            }
        })?;
        let close = self.expect(TokenKind::RParen)?;
        Ok(FieldList {
            fields,
            range: open.merge(close.range),
        })
    }

    fn parse_param_field(&mut self) -> Result<Field, ParseError> {
        if self.check(TokenKind::Identifier) {
            let saved = self.save();
            let mut names = vec![self.expect_ident()?];
            while self.check(TokenKind::Comma) {
                let comma_state = self.save();
                self.advance();
                if self.check(TokenKind::Identifier) {
                    names.push(self.expect_ident()?);
                } else {
                    self.restore(comma_state);
                    break;
                }
            }
            if self.starts_type() {
                let ty = self.parse_type()?;
                let range = names[0].range().merge(ty.range);
                return Ok(Field { names, ty, range });
            }
            // No type followed: the identifiers were themselves types of
            // separate unnamed fields. Reparse the first one as a type.
            self.restore(saved);
        }
        let ty = self.parse_type()?;
        let range = ty.range;
        Ok(Field {
            names: Vec::new(),
            ty,
            range,
        })
    }

    /// Struct fields between braces: `names+ type` or an embedded type name,
    /// each followed by a statement terminator.
    fn struct_fields(&mut self, open: crate::source::SourceRange) -> Result<FieldList, ParseError> {
        let mut fields = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.at_end() {
            if self.match_token(TokenKind::Semicolon).is_some() {
                continue;
            }
            let field = if self.check(TokenKind::Identifier) {
                let saved = self.save();
                let mut names = vec![self.expect_ident()?];
                while self.match_token(TokenKind::Comma).is_some() {
                    names.push(self.expect_ident()?);
                }
                if self.starts_type() {
                    let ty = self.parse_type()?;
                    let range = names[0].range().merge(ty.range);
                    Field { names, ty, range }
                } else {
                    // An embedded field: a bare (possibly qualified) type
                    // name with no field names.
                    self.restore(saved);
                    let ty = self.parse_type()?;
                    let range = ty.range;
                    Field {
                        names: Vec::new(),
                        ty,
                        range,
                    }
                }
            } else {
                return Err(ParseError::ExpectedToken {
                    expected: TokenKind::Identifier.as_str(),
                    found: self.current().text.clone(),
                    range: self.current().range,
                });
            };
            fields.push(field);
            self.expect_terminator()?;
        }
        Ok(FieldList {
            fields,
            range: open.merge(self.current().range),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{ExprKind, Expr};
    use crate::lexer::scan_file;
    use crate::parser::Parser;
    use crate::source::SourceFile;

    fn parse_type(src: &str) -> Expr {
        let file = SourceFile::from_source("<test>".into(), src);
        let (tokens, errors) = scan_file(&file);
        assert!(errors.is_empty());
        let mut parser = Parser::new(&tokens);
        let ty = parser.parse_type().expect("type parse failed");
        assert!(!parser.has_errors());
        ty
    }

    #[test]
    fn named_and_qualified_types() {
        assert!(matches!(parse_type("int").kind, ExprKind::NamedType(_)));
        let qualified = parse_type("pkg.Vec");
        let ExprKind::NamedType(named) = qualified.kind else {
            panic!("expected named type");
        };
        assert_eq!(named.package.unwrap().text, "pkg");
        assert_eq!(named.name.text, "Vec");
    }

    #[test]
    fn array_type_with_and_without_length() {
        let sized = parse_type("[4]float32");
        let ExprKind::ArrayType(array) = sized.kind else {
            panic!("expected array type");
        };
        assert!(array.length.is_some());

        let r#unsized = parse_type("[]int");
        let ExprKind::ArrayType(array) = r#unsized.kind else {
            panic!("expected array type");
        };
        assert!(array.length.is_none());
    }

    #[test]
    fn func_type_with_grouped_params() {
        let ty = parse_type("func(a, b int, c float32) int");
        let ExprKind::FuncType(func) = ty.kind else {
            panic!("expected func type");
        };
        assert_eq!(func.params.fields.len(), 2);
        assert_eq!(func.params.fields[0].names.len(), 2);
        assert_eq!(func.result.as_ref().unwrap().fields.len(), 1);
    }

    #[test]
    fn func_type_with_unnamed_params() {
        let ty = parse_type("func(int, float32)");
        let ExprKind::FuncType(func) = ty.kind else {
            panic!("expected func type");
        };
        assert_eq!(func.params.fields.len(), 2);
        assert!(func.params.fields.iter().all(|f| f.names.is_empty()));
        assert!(func.result.is_none());
    }

    #[test]
    fn struct_type_with_named_and_embedded_fields() {
        let ty = parse_type("struct { x, y float32; Base }");
        let ExprKind::StructType(st) = ty.kind else {
            panic!("expected struct type");
        };
        assert_eq!(st.fields.fields.len(), 2);
        assert_eq!(st.fields.fields[0].names.len(), 2);
        assert!(st.fields.fields[1].names.is_empty());
    }
}
