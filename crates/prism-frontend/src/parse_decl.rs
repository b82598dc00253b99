//! Declaration parsing: functions and `var`/`const`/`type` groups.

use crate::ast::*;
use crate::errors::ParseError;
use crate::parser::Parser;
use crate::token::TokenKind;

impl<'src> Parser<'src> {
    pub(crate) fn parse_decl(&mut self) -> Result<Decl, ParseError> {
        match self.kind() {
            TokenKind::KwFunc => self.parse_func_decl(),
            TokenKind::KwVar | TokenKind::KwConst | TokenKind::KwType => {
                self.parse_generic_decl()
            }
            _ => Err(ParseError::ExpectedDeclaration {
                found: self.current().text.clone(),
                range: self.current().range,
            }),
        }
    }

    /// `func name(params) results? body?`.
    fn parse_func_decl(&mut self) -> Result<Decl, ParseError> {
        let kw = self.advance();
        let name = self.expect_ident()?;

        let ty_start = self.current().range;
        let ty_kind = self.parse_func_type_tail()?;
        let ty = Expr {
            id: self.next_id(),
            kind: ty_kind,
            range: ty_start.merge(self.prev_range()),
        };

        let body = if self.check(TokenKind::LBrace) {
            Some(self.parse_block()?)
        } else {
            None
        };

        let range = kw.range.merge(self.prev_range());
        Ok(Decl {
            id: self.next_id(),
            kind: DeclKind::Func(FuncDecl { name, ty, body }),
            range,
        })
    }

    /// `var`/`const`/`type`, single spec or a parenthesised group of specs.
    pub(crate) fn parse_generic_decl(&mut self) -> Result<Decl, ParseError> {
        let decl_token = self.advance();

        let mut specs = Vec::new();
        if self.match_token(TokenKind::LParen).is_some() {
            while !self.check(TokenKind::RParen) && !self.at_end() {
                if self.match_token(TokenKind::Semicolon).is_some() {
                    continue;
                }
                specs.push(self.parse_spec(decl_token.kind)?);
                if !self.check(TokenKind::RParen) {
                    self.expect_terminator()?;
                }
            }
            self.expect(TokenKind::RParen)?;
        } else {
            specs.push(self.parse_spec(decl_token.kind)?);
        }

        let range = decl_token.range.merge(self.prev_range());
        Ok(Decl {
            id: self.next_id(),
            kind: DeclKind::Generic(GenericDecl { decl_token, specs }),
            range,
        })
    }

    fn parse_spec(&mut self, decl_kind: TokenKind) -> Result<Spec, ParseError> {
        if decl_kind == TokenKind::KwType {
            return self.parse_type_spec();
        }
        self.parse_value_spec()
    }

    /// `names+ type? (= exprs)?`.
    fn parse_value_spec(&mut self) -> Result<Spec, ParseError> {
        let mut lhs = vec![self.expect_ident()?];
        while self.match_token(TokenKind::Comma).is_some() {
            lhs.push(self.expect_ident()?);
        }

        let ty = if self.starts_type() {
            Some(self.parse_type()?)
        } else {
            None
        };

        let mut assign = None;
        let mut rhs = Vec::new();
        if self.check(TokenKind::Eq) {
            assign = Some(self.advance());
            rhs = self.expr_list()?;
        }

        let range = lhs[0].range().merge(self.prev_range());
        Ok(Spec {
            id: self.next_id(),
            kind: SpecKind::Value(ValueSpec {
                lhs,
                ty,
                assign,
                rhs,
            }),
            range,
        })
    }

    /// `name type` (strong alias) or `name = type` (weak alias).
    fn parse_type_spec(&mut self) -> Result<Spec, ParseError> {
        let name = self.expect_ident()?;
        let assign = self.match_token(TokenKind::Eq);
        let ty = self.parse_type()?;
        let range = name.range().merge(ty.range);
        Ok(Spec {
            id: self.next_id(),
            kind: SpecKind::Type(TypeSpec { name, assign, ty }),
            range,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::lexer::scan_file;
    use crate::parser::Parser;
    use crate::source::SourceFile;

    fn parse(src: &str) -> Decl {
        let file = SourceFile::from_source("<test>".into(), src);
        let (tokens, errors) = scan_file(&file);
        assert!(errors.is_empty(), "lex errors: {errors:?}");
        let mut parser = Parser::new(&tokens);
        let decl = parser.parse_decl_root().expect("parse failed");
        assert!(!parser.has_errors(), "parse errors: {:?}", parser.take_errors());
        decl
    }

    fn parse_file(src: &str) -> (File, Vec<crate::errors::ParseError>) {
        let file = SourceFile::from_source("<test>".into(), src);
        let (tokens, errors) = scan_file(&file);
        assert!(errors.is_empty());
        let mut parser = Parser::new(&tokens);
        let ast = parser.parse_file();
        (ast, parser.take_errors())
    }

    #[test]
    fn func_decl_with_params_and_result() {
        let decl = parse("func add(a, b int) int { return a + b }");
        let DeclKind::Func(func) = &decl.kind else {
            panic!("expected func decl");
        };
        assert_eq!(func.name.name(), "add");
        assert!(func.body.is_some());
        let ExprKind::FuncType(ty) = &func.ty.kind else {
            panic!("expected func type");
        };
        assert_eq!(ty.params.fields.len(), 1);
        assert_eq!(ty.params.fields[0].names.len(), 2);
    }

    #[test]
    fn func_decl_without_body() {
        let decl = parse("func external(x int)");
        let DeclKind::Func(func) = &decl.kind else {
            panic!("expected func decl");
        };
        assert!(func.body.is_none());
    }

    #[test]
    fn var_decl_with_initialiser() {
        let decl = parse("var x int = 1");
        let DeclKind::Generic(generic) = &decl.kind else {
            panic!("expected generic decl");
        };
        assert_eq!(generic.decl_token.text, "var");
        let SpecKind::Value(spec) = &generic.specs[0].kind else {
            panic!("expected value spec");
        };
        assert!(spec.ty.is_some());
        assert_eq!(spec.rhs.len(), 1);
    }

    #[test]
    fn grouped_const_decl() {
        let decl = parse("const (\n  a = 1\n  b = 2\n)");
        let DeclKind::Generic(generic) = &decl.kind else {
            panic!("expected generic decl");
        };
        assert_eq!(generic.specs.len(), 2);
    }

    #[test]
    fn strong_and_weak_type_specs() {
        let strong = parse("type Celsius float32");
        let DeclKind::Generic(generic) = &strong.kind else { panic!() };
        let SpecKind::Type(spec) = &generic.specs[0].kind else { panic!() };
        assert!(spec.assign.is_none());

        let weak = parse("type Celsius = float32");
        let DeclKind::Generic(generic) = &weak.kind else { panic!() };
        let SpecKind::Type(spec) = &generic.specs[0].kind else { panic!() };
        assert!(spec.assign.is_some());
    }

    #[test]
    fn file_with_multiple_decls() {
        let (file, errors) = parse_file("const x = 1\n\nfunc main() {\n}\n");
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(file.decls.len(), 2);
    }

    #[test]
    fn recovery_skips_to_next_declaration() {
        let (file, errors) = parse_file("func broken( {\n}\n\nfunc ok() {\n}\n");
        assert!(!errors.is_empty());
        assert_eq!(file.decls.len(), 1);
        let DeclKind::Func(func) = &file.decls[0].kind else {
            panic!("expected func decl");
        };
        assert_eq!(func.name.name(), "ok");
    }
}
