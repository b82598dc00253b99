//! The Prism AST.
//!
//! Every node carries a `NodeId` (allocation-ordered, which equals source
//! order) and its source range. The semantic side tables are keyed by these
//! ids, so node identity never depends on memory addresses.

use crate::source::SourceRange;
use crate::token::Token;

/// Unique identifier for AST nodes (expressions, statements, declarations,
/// specs, and name identifiers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeId(u32);

impl NodeId {
    /// Create a NodeId from a raw index. Only the parser should use this.
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// An identifier in a name position (declaration names, field names,
/// parameter names). Identifier *expressions* are `ExprKind::Identifier`.
#[derive(Debug, Clone)]
pub struct Ident {
    pub id: NodeId,
    pub token: Token,
}

impl Ident {
    pub fn name(&self) -> &str {
        &self.token.text
    }

    pub fn range(&self) -> SourceRange {
        self.token.range
    }
}

/// A parsed source file: a sequence of top-level declarations.
#[derive(Debug, Clone)]
pub struct File {
    pub decls: Vec<Decl>,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub range: SourceRange,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Int, float, string, rune, `true`, or `false` literal.
    Literal(Token),
    Identifier(Token),
    Paren(Box<Expr>),
    Selector(Box<SelectorExpr>),
    Index(Box<IndexExpr>),
    Call(Box<CallExpr>),
    Unary(Box<UnaryExpr>),
    Binary(Box<BinaryExpr>),
    Complit(Box<ComplitExpr>),

    // Type-denoting expressions.
    NamedType(NamedTypeExpr),
    ArrayType(Box<ArrayTypeExpr>),
    FuncType(Box<FuncTypeExpr>),
    StructType(StructTypeExpr),
}

#[derive(Debug, Clone)]
pub struct SelectorExpr {
    pub base: Expr,
    pub selector: Token,
}

#[derive(Debug, Clone)]
pub struct IndexExpr {
    pub base: Expr,
    pub index: Expr,
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub base: Expr,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub struct UnaryExpr {
    pub op: Token,
    pub base: Expr,
}

#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub op: Token,
    pub lhs: Expr,
    pub rhs: Expr,
}

/// Composite literal: `T{a, b}`.
#[derive(Debug, Clone)]
pub struct ComplitExpr {
    pub ty: Expr,
    pub elems: Vec<Expr>,
}

/// `name` or `package.name` in type position.
#[derive(Debug, Clone)]
pub struct NamedTypeExpr {
    pub package: Option<Token>,
    pub name: Token,
}

/// `[len]elem` or `[]elem`.
#[derive(Debug, Clone)]
pub struct ArrayTypeExpr {
    pub length: Option<Expr>,
    pub elem: Expr,
}

/// `func(params) (results)?`.
#[derive(Debug, Clone)]
pub struct FuncTypeExpr {
    pub params: FieldList,
    pub result: Option<FieldList>,
}

/// `struct { fields }`.
#[derive(Debug, Clone)]
pub struct StructTypeExpr {
    pub fields: FieldList,
}

/// A parenthesised or braced list of fields (parameters, results, struct
/// fields).
#[derive(Debug, Clone)]
pub struct FieldList {
    pub fields: Vec<Field>,
    pub range: SourceRange,
}

/// `names+ type`, or an embedded `type` when `names` is empty.
#[derive(Debug, Clone)]
pub struct Field {
    pub names: Vec<Ident>,
    pub ty: Expr,
    pub range: SourceRange,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub id: NodeId,
    pub kind: StmtKind,
    pub range: SourceRange,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Expr(Box<Expr>),
    Return(ReturnStmt),
    Break,
    Continue,
    Fallthrough,
    Block(BlockStmt),
    Assign(Box<AssignStmt>),
    IncDec(Box<IncDecStmt>),
    If(Box<IfStmt>),
    For(Box<ForStmt>),
    Switch(Box<SwitchStmt>),
    SwitchCase(SwitchCaseStmt),
    Decl(Box<Decl>),
}

#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub exprs: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub struct BlockStmt {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct AssignStmt {
    pub lhs: Vec<Expr>,
    pub op: Token,
    pub rhs: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub struct IncDecStmt {
    pub expr: Expr,
    pub op: Token,
}

/// `if init?; cond { body } else?`. `body` is always a block statement and
/// `els` is either a block or another `if`.
#[derive(Debug, Clone)]
pub struct IfStmt {
    pub init: Option<Stmt>,
    pub cond: Expr,
    pub body: Stmt,
    pub els: Option<Stmt>,
}

#[derive(Debug, Clone)]
pub struct ForStmt {
    pub init: Option<Stmt>,
    pub cond: Option<Expr>,
    pub post: Option<Stmt>,
    pub body: Stmt,
}

/// `switch init?; tag? { cases }`. The body statements are all
/// `StmtKind::SwitchCase`.
#[derive(Debug, Clone)]
pub struct SwitchStmt {
    pub init: Option<Stmt>,
    pub tag: Option<Expr>,
    pub body: Vec<Stmt>,
}

/// `case v1, v2: stmts` or `default: stmts` (empty `values`).
#[derive(Debug, Clone)]
pub struct SwitchCaseStmt {
    pub values: Vec<Expr>,
    pub stmts: Vec<Stmt>,
    pub is_default: bool,
}

#[derive(Debug, Clone)]
pub struct Decl {
    pub id: NodeId,
    pub kind: DeclKind,
    pub range: SourceRange,
}

#[derive(Debug, Clone)]
pub enum DeclKind {
    /// `var`, `const`, or `type` declaration with one or more specs.
    Generic(GenericDecl),
    Func(FuncDecl),
}

#[derive(Debug, Clone)]
pub struct GenericDecl {
    pub decl_token: Token,
    pub specs: Vec<Spec>,
}

#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub name: Ident,
    /// Always an `ExprKind::FuncType`.
    pub ty: Expr,
    /// Always a `StmtKind::Block` when present.
    pub body: Option<Stmt>,
}

#[derive(Debug, Clone)]
pub struct Spec {
    pub id: NodeId,
    pub kind: SpecKind,
    pub range: SourceRange,
}

#[derive(Debug, Clone)]
pub enum SpecKind {
    Value(ValueSpec),
    Type(TypeSpec),
}

/// `names+ type? (= exprs)?` under `var`/`const`.
#[derive(Debug, Clone)]
pub struct ValueSpec {
    pub lhs: Vec<Ident>,
    pub ty: Option<Expr>,
    pub assign: Option<Token>,
    pub rhs: Vec<Expr>,
}

/// `name type` (strong) or `name = type` (weak) under `type`.
#[derive(Debug, Clone)]
pub struct TypeSpec {
    pub name: Ident,
    pub assign: Option<Token>,
    pub ty: Expr,
}

/// AST traversal. `visit_*` returning `false` skips the node's children.
///
/// Printers and the lowering walk through this instead of knowing every
/// concrete shape; overriding a single method is enough for most passes.
pub trait Visitor {
    fn visit_expr(&mut self, _expr: &Expr) -> bool {
        true
    }
    fn visit_stmt(&mut self, _stmt: &Stmt) -> bool {
        true
    }
    fn visit_decl(&mut self, _decl: &Decl) -> bool {
        true
    }
    fn visit_spec(&mut self, _spec: &Spec) -> bool {
        true
    }
}

pub fn walk_expr(v: &mut dyn Visitor, expr: &Expr) {
    if !v.visit_expr(expr) {
        return;
    }
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::Identifier(_) | ExprKind::NamedType(_) => {}
        ExprKind::Paren(base) => walk_expr(v, base),
        ExprKind::Selector(sel) => walk_expr(v, &sel.base),
        ExprKind::Index(index) => {
            walk_expr(v, &index.base);
            walk_expr(v, &index.index);
        }
        ExprKind::Call(call) => {
            walk_expr(v, &call.base);
            for arg in &call.args {
                walk_expr(v, arg);
            }
        }
        ExprKind::Unary(unary) => walk_expr(v, &unary.base),
        ExprKind::Binary(binary) => {
            walk_expr(v, &binary.lhs);
            walk_expr(v, &binary.rhs);
        }
        ExprKind::Complit(complit) => {
            walk_expr(v, &complit.ty);
            for elem in &complit.elems {
                walk_expr(v, elem);
            }
        }
        ExprKind::ArrayType(array) => {
            if let Some(length) = &array.length {
                walk_expr(v, length);
            }
            walk_expr(v, &array.elem);
        }
        ExprKind::FuncType(func) => {
            for field in &func.params.fields {
                walk_expr(v, &field.ty);
            }
            if let Some(result) = &func.result {
                for field in &result.fields {
                    walk_expr(v, &field.ty);
                }
            }
        }
        ExprKind::StructType(st) => {
            for field in &st.fields.fields {
                walk_expr(v, &field.ty);
            }
        }
    }
}

pub fn walk_stmt(v: &mut dyn Visitor, stmt: &Stmt) {
    if !v.visit_stmt(stmt) {
        return;
    }
    match &stmt.kind {
        StmtKind::Expr(expr) => walk_expr(v, expr),
        StmtKind::Return(ret) => {
            for expr in &ret.exprs {
                walk_expr(v, expr);
            }
        }
        StmtKind::Break | StmtKind::Continue | StmtKind::Fallthrough => {}
        StmtKind::Block(block) => {
            for stmt in &block.stmts {
                walk_stmt(v, stmt);
            }
        }
        StmtKind::Assign(assign) => {
            for lhs in &assign.lhs {
                walk_expr(v, lhs);
            }
            for rhs in &assign.rhs {
                walk_expr(v, rhs);
            }
        }
        StmtKind::IncDec(incdec) => walk_expr(v, &incdec.expr),
        StmtKind::If(ifs) => {
            if let Some(init) = &ifs.init {
                walk_stmt(v, init);
            }
            walk_expr(v, &ifs.cond);
            walk_stmt(v, &ifs.body);
            if let Some(els) = &ifs.els {
                walk_stmt(v, els);
            }
        }
        StmtKind::For(fors) => {
            if let Some(init) = &fors.init {
                walk_stmt(v, init);
            }
            if let Some(cond) = &fors.cond {
                walk_expr(v, cond);
            }
            if let Some(post) = &fors.post {
                walk_stmt(v, post);
            }
            walk_stmt(v, &fors.body);
        }
        StmtKind::Switch(switch) => {
            if let Some(init) = &switch.init {
                walk_stmt(v, init);
            }
            if let Some(tag) = &switch.tag {
                walk_expr(v, tag);
            }
            for case in &switch.body {
                walk_stmt(v, case);
            }
        }
        StmtKind::SwitchCase(case) => {
            for value in &case.values {
                walk_expr(v, value);
            }
            for stmt in &case.stmts {
                walk_stmt(v, stmt);
            }
        }
        StmtKind::Decl(decl) => walk_decl(v, decl),
    }
}

pub fn walk_decl(v: &mut dyn Visitor, decl: &Decl) {
    if !v.visit_decl(decl) {
        return;
    }
    match &decl.kind {
        DeclKind::Generic(generic) => {
            for spec in &generic.specs {
                walk_spec(v, spec);
            }
        }
        DeclKind::Func(func) => {
            walk_expr(v, &func.ty);
            if let Some(body) = &func.body {
                walk_stmt(v, body);
            }
        }
    }
}

pub fn walk_spec(v: &mut dyn Visitor, spec: &Spec) {
    if !v.visit_spec(spec) {
        return;
    }
    match &spec.kind {
        SpecKind::Value(value) => {
            if let Some(ty) = &value.ty {
                walk_expr(v, ty);
            }
            for rhs in &value.rhs {
                walk_expr(v, rhs);
            }
        }
        SpecKind::Type(ty) => walk_expr(v, &ty.ty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::scan_file;
    use crate::parser::Parser;
    use crate::source::SourceFile;

    #[derive(Default)]
    struct Counter {
        exprs: usize,
        stmts: usize,
        decls: usize,
        skip_if_bodies: bool,
    }

    impl Visitor for Counter {
        fn visit_expr(&mut self, _expr: &Expr) -> bool {
            self.exprs += 1;
            true
        }
        fn visit_stmt(&mut self, stmt: &Stmt) -> bool {
            self.stmts += 1;
            !(self.skip_if_bodies && matches!(stmt.kind, StmtKind::If(_)))
        }
        fn visit_decl(&mut self, _decl: &Decl) -> bool {
            self.decls += 1;
            true
        }
    }

    fn parse(src: &str) -> File {
        let file = SourceFile::from_source("<test>".into(), src);
        let (tokens, errors) = scan_file(&file);
        assert!(errors.is_empty());
        let mut parser = Parser::new(&tokens);
        let ast = parser.parse_file();
        assert!(!parser.has_errors());
        ast
    }

    #[test]
    fn walk_reaches_nested_nodes() {
        let ast = parse("func f(x int) int {\n  if x > 0 {\n    return x + 1\n  }\n  return 0\n}\n");
        let mut counter = Counter::default();
        for decl in &ast.decls {
            walk_decl(&mut counter, decl);
        }
        assert_eq!(counter.decls, 1);
        // if + two returns + two blocks
        assert_eq!(counter.stmts, 5);
        // func type, param type, result type, x > 0, x, 0, x + 1, x, 1, 0
        assert_eq!(counter.exprs, 10);
    }

    #[test]
    fn returning_false_skips_children() {
        let ast = parse("func f(x int) {\n  if x > 0 {\n    return\n  }\n}\n");
        let mut counter = Counter {
            skip_if_bodies: true,
            ..Default::default()
        };
        for decl in &ast.decls {
            walk_decl(&mut counter, decl);
        }
        // The if statement is visited, its condition and body are not.
        assert_eq!(counter.stmts, 2);
        assert_eq!(counter.exprs, 2);
    }
}
