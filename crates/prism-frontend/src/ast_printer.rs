//! Deterministic s-expression printer for AST nodes.
//!
//! This is the fixture format for the `parse-*` golden tests: same input,
//! same output, independent of environment. Composite nodes indent their
//! children by two spaces; leaves print inline.

use crate::ast::*;

pub struct AstPrinter {
    out: String,
    indent: usize,
}

impl AstPrinter {
    pub fn new() -> AstPrinter {
        AstPrinter {
            out: String::new(),
            indent: 0,
        }
    }

    pub fn print_expr(mut self, expr: &Expr) -> String {
        self.write_expr(expr);
        self.out
    }

    pub fn print_stmt(mut self, stmt: &Stmt) -> String {
        self.write_stmt(stmt);
        self.out
    }

    pub fn print_decl(mut self, decl: &Decl) -> String {
        self.write_decl(decl);
        self.out
    }

    pub fn print_file(mut self, file: &File) -> String {
        for (i, decl) in file.decls.iter().enumerate() {
            if i > 0 {
                self.out.push('\n');
            }
            self.write_decl(decl);
            self.out.push('\n');
        }
        self.out
    }

    fn open(&mut self, head: &str) {
        self.out.push('(');
        self.out.push_str(head);
        self.indent += 1;
    }

    fn atom(&mut self, text: &str) {
        self.out.push(' ');
        self.out.push_str(text);
    }

    fn quoted(&mut self, text: &str) {
        self.atom(&format!("{text:?}"));
    }

    fn close(&mut self) {
        self.out.push(')');
        self.indent -= 1;
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    fn write_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(token) => {
                self.open("LiteralExpr");
                self.quoted(&token.text);
                self.close();
            }
            ExprKind::Identifier(token) => {
                self.open("IdentifierExpr");
                self.quoted(&token.text);
                self.close();
            }
            ExprKind::Paren(base) => {
                self.open("ParenExpr");
                self.newline();
                self.write_expr(base);
                self.close();
            }
            ExprKind::Selector(sel) => {
                self.open("SelectorExpr");
                self.quoted(&sel.selector.text);
                self.newline();
                self.write_expr(&sel.base);
                self.close();
            }
            ExprKind::Index(index) => {
                self.open("IndexExpr");
                self.newline();
                self.write_expr(&index.base);
                self.newline();
                self.write_expr(&index.index);
                self.close();
            }
            ExprKind::Call(call) => {
                self.open("CallExpr");
                self.newline();
                self.write_expr(&call.base);
                for arg in &call.args {
                    self.newline();
                    self.write_expr(arg);
                }
                self.close();
            }
            ExprKind::Unary(unary) => {
                self.open("UnaryExpr");
                self.quoted(&unary.op.text);
                self.newline();
                self.write_expr(&unary.base);
                self.close();
            }
            ExprKind::Binary(binary) => {
                self.open("BinaryExpr");
                self.quoted(&binary.op.text);
                self.newline();
                self.write_expr(&binary.lhs);
                self.newline();
                self.write_expr(&binary.rhs);
                self.close();
            }
            ExprKind::Complit(complit) => {
                self.open("ComplitExpr");
                self.newline();
                self.write_expr(&complit.ty);
                for elem in &complit.elems {
                    self.newline();
                    self.write_expr(elem);
                }
                self.close();
            }
            ExprKind::NamedType(named) => {
                self.open("NamedTypeExpr");
                if let Some(package) = &named.package {
                    self.quoted(&package.text);
                }
                self.quoted(&named.name.text);
                self.close();
            }
            ExprKind::ArrayType(array) => {
                self.open("ArrayTypeExpr");
                if let Some(length) = &array.length {
                    self.newline();
                    self.write_expr(length);
                }
                self.newline();
                self.write_expr(&array.elem);
                self.close();
            }
            ExprKind::FuncType(func) => {
                self.open("FuncTypeExpr");
                self.newline();
                self.write_field_list("Params", &func.params);
                if let Some(result) = &func.result {
                    self.newline();
                    self.write_field_list("Results", result);
                }
                self.close();
            }
            ExprKind::StructType(st) => {
                self.open("StructTypeExpr");
                self.newline();
                self.write_field_list("Fields", &st.fields);
                self.close();
            }
        }
    }

    fn write_field_list(&mut self, head: &str, list: &FieldList) {
        self.open(head);
        for field in &list.fields {
            self.newline();
            self.open("Field");
            for name in &field.names {
                self.quoted(name.name());
            }
            self.newline();
            self.write_expr(&field.ty);
            self.close();
        }
        self.close();
    }

    fn write_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.open("ExprStmt");
                self.newline();
                self.write_expr(expr);
                self.close();
            }
            StmtKind::Return(ret) => {
                self.open("ReturnStmt");
                for expr in &ret.exprs {
                    self.newline();
                    self.write_expr(expr);
                }
                self.close();
            }
            StmtKind::Break => {
                self.open("BreakStmt");
                self.close();
            }
            StmtKind::Continue => {
                self.open("ContinueStmt");
                self.close();
            }
            StmtKind::Fallthrough => {
                self.open("FallthroughStmt");
                self.close();
            }
            StmtKind::Block(block) => {
                self.open("BlockStmt");
                for stmt in &block.stmts {
                    self.newline();
                    self.write_stmt(stmt);
                }
                self.close();
            }
            StmtKind::Assign(assign) => {
                self.open("AssignStmt");
                self.quoted(&assign.op.text);
                self.newline();
                self.open("Lhs");
                for lhs in &assign.lhs {
                    self.newline();
                    self.write_expr(lhs);
                }
                self.close();
                self.newline();
                self.open("Rhs");
                for rhs in &assign.rhs {
                    self.newline();
                    self.write_expr(rhs);
                }
                self.close();
                self.close();
            }
            StmtKind::IncDec(incdec) => {
                self.open("IncDecStmt");
                self.quoted(&incdec.op.text);
                self.newline();
                self.write_expr(&incdec.expr);
                self.close();
            }
            StmtKind::If(ifs) => {
                self.open("IfStmt");
                if let Some(init) = &ifs.init {
                    self.newline();
                    self.open("Init");
                    self.newline();
                    self.write_stmt(init);
                    self.close();
                }
                self.newline();
                self.write_expr(&ifs.cond);
                self.newline();
                self.write_stmt(&ifs.body);
                if let Some(els) = &ifs.els {
                    self.newline();
                    self.open("Else");
                    self.newline();
                    self.write_stmt(els);
                    self.close();
                }
                self.close();
            }
            StmtKind::For(fors) => {
                self.open("ForStmt");
                if let Some(init) = &fors.init {
                    self.newline();
                    self.open("Init");
                    self.newline();
                    self.write_stmt(init);
                    self.close();
                }
                if let Some(cond) = &fors.cond {
                    self.newline();
                    self.open("Cond");
                    self.newline();
                    self.write_expr(cond);
                    self.close();
                }
                if let Some(post) = &fors.post {
                    self.newline();
                    self.open("Post");
                    self.newline();
                    self.write_stmt(post);
                    self.close();
                }
                self.newline();
                self.write_stmt(&fors.body);
                self.close();
            }
            StmtKind::Switch(switch) => {
                self.open("SwitchStmt");
                if let Some(init) = &switch.init {
                    self.newline();
                    self.open("Init");
                    self.newline();
                    self.write_stmt(init);
                    self.close();
                }
                if let Some(tag) = &switch.tag {
                    self.newline();
                    self.open("Tag");
                    self.newline();
                    self.write_expr(tag);
                    self.close();
                }
                for case in &switch.body {
                    self.newline();
                    self.write_stmt(case);
                }
                self.close();
            }
            StmtKind::SwitchCase(case) => {
                self.open("SwitchCaseStmt");
                if case.is_default {
                    self.atom("default");
                }
                if !case.values.is_empty() {
                    self.newline();
                    self.open("Values");
                    for value in &case.values {
                        self.newline();
                        self.write_expr(value);
                    }
                    self.close();
                }
                for stmt in &case.stmts {
                    self.newline();
                    self.write_stmt(stmt);
                }
                self.close();
            }
            StmtKind::Decl(decl) => {
                self.open("DeclStmt");
                self.newline();
                self.write_decl(decl);
                self.close();
            }
        }
    }

    fn write_decl(&mut self, decl: &Decl) {
        match &decl.kind {
            DeclKind::Generic(generic) => {
                self.open("GenericDecl");
                self.quoted(&generic.decl_token.text);
                for spec in &generic.specs {
                    self.newline();
                    self.write_spec(spec);
                }
                self.close();
            }
            DeclKind::Func(func) => {
                self.open("FuncDecl");
                self.quoted(func.name.name());
                self.newline();
                self.write_expr(&func.ty);
                if let Some(body) = &func.body {
                    self.newline();
                    self.write_stmt(body);
                }
                self.close();
            }
        }
    }

    fn write_spec(&mut self, spec: &Spec) {
        match &spec.kind {
            SpecKind::Value(value) => {
                self.open("ValueSpec");
                self.newline();
                self.open("Names");
                for name in &value.lhs {
                    self.quoted(name.name());
                }
                self.close();
                if let Some(ty) = &value.ty {
                    self.newline();
                    self.open("Type");
                    self.newline();
                    self.write_expr(ty);
                    self.close();
                }
                if !value.rhs.is_empty() {
                    self.newline();
                    self.open("Values");
                    for rhs in &value.rhs {
                        self.newline();
                        self.write_expr(rhs);
                    }
                    self.close();
                }
                self.close();
            }
            SpecKind::Type(ty) => {
                self.open("TypeSpec");
                self.quoted(ty.name.name());
                self.atom(if ty.assign.is_some() { "weak" } else { "strong" });
                self.newline();
                self.write_expr(&ty.ty);
                self.close();
            }
        }
    }
}

impl Default for AstPrinter {
    fn default() -> Self {
        Self::new()
    }
}
