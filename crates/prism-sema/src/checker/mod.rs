//! The checker: two-phase name resolution and type checking.
//!
//! Phase A (`shallow_walk`) enters every top-level name into the global
//! scope without resolving anything. Phase B resolves each global symbol in
//! declaration order; the `Unresolved → Resolving → Resolved` state machine
//! caches results and turns re-entrant resolution into a cycle diagnostic.

mod expr;
mod stmt;

use rustc_hash::FxHashMap;

use prism_frontend::ast::{Decl, DeclKind, File, FuncDecl, SpecKind};
use prism_frontend::{Diagnostic, NodeId, SourceRange, TokenKind};

use crate::errors::SemanticError;
use crate::scope::{ResolveState, ScopeId, Symbol, SymbolId, SymbolKind};
use crate::semantic_info::{AddressMode, SemanticInfo, TypeAndValue};
use crate::type_arena::{TypeId, TypeKind};

/// Context flags threaded through statement resolution.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StmtProperties {
    pub accepts_break: bool,
    pub accepts_continue: bool,
    pub accepts_fallthrough: bool,
    pub is_final_case_stmt: bool,
}

pub(crate) struct FuncContext<'a> {
    pub decl: &'a FuncDecl,
    pub node: NodeId,
}

pub struct Checker<'a> {
    pub(crate) file: &'a File,
    pub(crate) info: SemanticInfo,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) scope_stack: Vec<ScopeId>,
    pub(crate) func_stack: Vec<FuncContext<'a>>,
    decls_by_id: FxHashMap<NodeId, &'a Decl>,
}

/// Check a parsed file. Returns the populated semantic info and any
/// diagnostics; an empty diagnostic list means the unit is well-typed.
pub fn check(file: &File) -> (SemanticInfo, Vec<Diagnostic>) {
    let mut checker = Checker::new(file);
    checker.run();
    (checker.info, checker.diagnostics)
}

/// Collects every declaration node so symbols can refer back to their
/// declaring AST by id.
struct DeclCollector<'a> {
    decls: FxHashMap<NodeId, &'a Decl>,
}

impl<'a> DeclCollector<'a> {
    // The visitor trait hands out plain references with the visitor's own
    // lifetime, so nested declarations are collected by walking manually.
    fn collect_decl(&mut self, decl: &'a Decl) {
        self.decls.insert(decl.id, decl);
        if let DeclKind::Func(func) = &decl.kind {
            if let Some(body) = &func.body {
                self.collect_stmt(body);
            }
        }
    }

    fn collect_stmt(&mut self, stmt: &'a prism_frontend::Stmt) {
        use prism_frontend::ast::StmtKind;
        match &stmt.kind {
            StmtKind::Decl(decl) => self.collect_decl(decl),
            StmtKind::Block(block) => {
                for stmt in &block.stmts {
                    self.collect_stmt(stmt);
                }
            }
            StmtKind::If(ifs) => {
                if let Some(init) = &ifs.init {
                    self.collect_stmt(init);
                }
                self.collect_stmt(&ifs.body);
                if let Some(els) = &ifs.els {
                    self.collect_stmt(els);
                }
            }
            StmtKind::For(fors) => {
                if let Some(init) = &fors.init {
                    self.collect_stmt(init);
                }
                if let Some(post) = &fors.post {
                    self.collect_stmt(post);
                }
                self.collect_stmt(&fors.body);
            }
            StmtKind::Switch(switch) => {
                if let Some(init) = &switch.init {
                    self.collect_stmt(init);
                }
                for case in &switch.body {
                    self.collect_stmt(case);
                }
            }
            StmtKind::SwitchCase(case) => {
                for stmt in &case.stmts {
                    self.collect_stmt(stmt);
                }
            }
            _ => {}
        }
    }
}

impl<'a> Checker<'a> {
    pub fn new(file: &'a File) -> Checker<'a> {
        let mut collector = DeclCollector {
            decls: FxHashMap::default(),
        };
        for decl in &file.decls {
            collector.collect_decl(decl);
        }
        Checker {
            file,
            info: SemanticInfo::new(),
            diagnostics: Vec::new(),
            scope_stack: Vec::new(),
            func_stack: Vec::new(),
            decls_by_id: collector.decls,
        }
    }

    pub fn run(&mut self) -> bool {
        let global = self.info.global_scope;
        self.scope_stack.push(global);

        self.shallow_walk();

        let globals = self.info.scopes.scope(global).symbols.clone();
        for sym in globals {
            self.resolve_symbol(sym);
        }

        self.scope_stack.pop();
        self.diagnostics.is_empty()
    }

    pub(crate) fn current_scope(&self) -> ScopeId {
        *self.scope_stack.last().expect("scope stack is never empty")
    }

    pub(crate) fn error(&mut self, err: SemanticError) {
        self.diagnostics.push(err.into_diagnostic());
    }

    pub(crate) fn decl_by_id(&self, id: NodeId) -> &'a Decl {
        self.decls_by_id[&id]
    }

    // ------------------------------------------------------------------
    // Phase A: shallow walk
    // ------------------------------------------------------------------

    fn shallow_walk(&mut self) {
        for decl in &self.file.decls {
            match &decl.kind {
                DeclKind::Generic(generic) => self.shallow_walk_generic(decl, generic),
                DeclKind::Func(func) => {
                    let sym = Symbol::new(
                        func.name.name(),
                        Some(decl.id),
                        decl.range,
                        SymbolKind::Func,
                    );
                    self.add_symbol(sym);
                }
            }
        }
    }

    fn shallow_walk_generic(
        &mut self,
        decl: &'a Decl,
        generic: &'a prism_frontend::ast::GenericDecl,
    ) {
        match generic.decl_token.kind {
            TokenKind::KwConst => {
                for (si, spec) in generic.specs.iter().enumerate() {
                    let SpecKind::Value(value) = &spec.kind else {
                        continue;
                    };
                    for (ei, name) in value.lhs.iter().enumerate() {
                        let sym = Symbol::new(
                            name.name(),
                            Some(decl.id),
                            decl.range,
                            SymbolKind::Const {
                                spec_index: si,
                                expr_index: ei,
                            },
                        );
                        self.add_symbol(sym);
                    }
                }
            }
            TokenKind::KwVar => {
                for (si, spec) in generic.specs.iter().enumerate() {
                    let SpecKind::Value(value) = &spec.kind else {
                        continue;
                    };
                    for (ei, name) in value.lhs.iter().enumerate() {
                        let sym = Symbol::new(
                            name.name(),
                            Some(decl.id),
                            decl.range,
                            SymbolKind::Var {
                                spec_index: Some(si),
                                expr_index: Some(ei),
                                init: None,
                            },
                        );
                        self.add_symbol(sym);
                    }
                }
            }
            TokenKind::KwType => {
                for (si, spec) in generic.specs.iter().enumerate() {
                    let SpecKind::Type(ty) = &spec.kind else {
                        continue;
                    };
                    let sym = Symbol::new(
                        ty.name.name(),
                        Some(decl.id),
                        ty.name.range(),
                        SymbolKind::Type {
                            spec_index: si,
                            strong: ty.assign.is_none(),
                        },
                    );
                    self.add_symbol(sym);
                }
            }
            _ => unreachable!("generic declaration with a non-declaration token"),
        }
    }

    pub(crate) fn add_symbol(&mut self, sym: Symbol) -> SymbolId {
        let scope = self.current_scope();
        let name = sym.name.clone();
        let range = sym.range;
        match self.info.scopes.add_symbol(scope, sym) {
            Ok(id) => id,
            Err(existing) => {
                let first = self.info.scopes.symbol(existing).range;
                self.error(SemanticError::Redefinition { name, range, first });
                existing
            }
        }
    }

    // ------------------------------------------------------------------
    // Phase B: per-symbol resolution
    // ------------------------------------------------------------------

    pub(crate) fn resolve_symbol(&mut self, sym_id: SymbolId) -> TypeAndValue {
        match self.info.scopes.symbol(sym_id).state {
            ResolveState::Resolved => {
                return self
                    .info
                    .type_of_symbol(sym_id)
                    .unwrap_or_else(TypeAndValue::invalid);
            }
            ResolveState::Resolving => {
                let sym = self.info.scopes.symbol(sym_id);
                let (name, range) = (sym.name.clone(), sym.range);
                self.error(SemanticError::CyclicDependency { name, range });
                return TypeAndValue::invalid();
            }
            ResolveState::Unresolved => {}
        }

        let sym = self.info.scopes.symbol(sym_id);
        tracing::trace!(name = %sym.name, "resolving symbol");
        let kind = sym.kind.clone();

        self.info.scopes.symbol_mut(sym_id).state = ResolveState::Resolving;
        let tv = match &kind {
            SymbolKind::Func => self.resolve_func_symbol(sym_id),
            SymbolKind::Type { spec_index, strong } => {
                self.resolve_type_symbol(sym_id, *spec_index, *strong)
            }
            SymbolKind::Var {
                spec_index,
                expr_index,
                ..
            } => self.resolve_var_symbol(sym_id, *spec_index, *expr_index),
            SymbolKind::Const {
                spec_index,
                expr_index,
            } => self.resolve_const_symbol(sym_id, *spec_index, *expr_index),
        };
        self.info.scopes.symbol_mut(sym_id).state = ResolveState::Resolved;
        self.info.set_type_of_symbol(sym_id, tv);

        if matches!(kind, SymbolKind::Func) {
            self.resolve_func_body(sym_id);
        }

        if self.info.scopes.symbol(sym_id).scope == Some(self.info.global_scope) {
            self.info.reachable_symbols.push(sym_id);
        }

        tv
    }

    fn func_decl_of(&self, sym_id: SymbolId) -> (&'a FuncDecl, NodeId) {
        let decl_id = self.info.scopes.symbol(sym_id).decl.expect("function symbol without decl");
        let decl = self.decl_by_id(decl_id);
        let DeclKind::Func(func) = &decl.kind else {
            unreachable!("function symbol declared by a non-function declaration");
        };
        (func, decl.id)
    }

    fn resolve_func_symbol(&mut self, sym_id: SymbolId) -> TypeAndValue {
        let name = self.info.scopes.symbol(sym_id).name.clone();
        let scope = self
            .info
            .scope_for_symbol(sym_id, self.current_scope(), &name);

        let (func, decl_id) = self.func_decl_of(sym_id);

        self.scope_stack.push(scope);
        self.func_stack.push(FuncContext {
            decl: func,
            node: decl_id,
        });

        let func_tv = self.resolve_expr(&func.ty);
        self.info.set_type_of_node(decl_id, func_tv);

        self.func_stack.pop();
        self.scope_stack.pop();
        func_tv
    }

    fn resolve_func_body(&mut self, sym_id: SymbolId) {
        let Some(scope) = self.info.scope_of_symbol(sym_id) else {
            return;
        };
        let (func, decl_id) = self.func_decl_of(sym_id);
        let Some(body) = &func.body else {
            return;
        };
        let prism_frontend::ast::StmtKind::Block(block) = &body.kind else {
            unreachable!("function body that is not a block");
        };

        self.scope_stack.push(scope);
        self.func_stack.push(FuncContext {
            decl: func,
            node: decl_id,
        });

        for stmt in &block.stmts {
            self.resolve_stmt(stmt, StmtProperties::default());
        }

        self.func_stack.pop();
        self.scope_stack.pop();
    }

    fn resolve_type_symbol(
        &mut self,
        sym_id: SymbolId,
        spec_index: usize,
        strong: bool,
    ) -> TypeAndValue {
        let sym = self.info.scopes.symbol(sym_id);
        let name = sym.name.clone();
        let decl = self.decl_by_id(sym.decl.expect("type symbol without decl"));
        let DeclKind::Generic(generic) = &decl.kind else {
            unreachable!("type symbol declared by a non-generic declaration");
        };
        let SpecKind::Type(spec) = &generic.specs[spec_index].kind else {
            unreachable!("type symbol pointing at a non-type spec");
        };

        let mut tv = self.resolve_expr(&spec.ty);
        tv.ty = if strong {
            self.info.types.alias_strong(name, tv.ty)
        } else {
            self.info.types.alias_weak(name, tv.ty)
        };
        tv
    }

    fn resolve_var_symbol(
        &mut self,
        sym_id: SymbolId,
        spec_index: Option<usize>,
        expr_index: Option<usize>,
    ) -> TypeAndValue {
        let sym = self.info.scopes.symbol(sym_id);
        let sym_range = sym.range;
        let decl = self.decl_by_id(sym.decl.expect("var symbol without decl"));
        let DeclKind::Generic(generic) = &decl.kind else {
            unreachable!("var symbol declared by a non-generic declaration");
        };
        let spec_index = spec_index.expect("declared var symbol without a spec index");
        let expr_index = expr_index.expect("declared var symbol without an expr index");
        let SpecKind::Value(spec) = &generic.specs[spec_index].kind else {
            unreachable!("var symbol pointing at a non-value spec");
        };

        let mut var_type = spec.ty.as_ref().map(|ty| self.resolve_expr(ty).ty);

        let (rhs, ranges) = self.resolve_and_unpack(&spec.rhs);
        match var_type {
            None => {
                if rhs.is_empty() {
                    self.error(SemanticError::VarNeedsTypeOrInit { range: sym_range });
                    return TypeAndValue::invalid();
                }
                if expr_index >= rhs.len() {
                    self.error(SemanticError::AssignCountMismatch {
                        wanted: expr_index + 1,
                        got: rhs.len(),
                        range: sym_range,
                    });
                    return TypeAndValue::invalid();
                }
                var_type = Some(rhs[expr_index].ty);
            }
            Some(declared) => {
                if !rhs.is_empty() {
                    if expr_index >= rhs.len() {
                        self.error(SemanticError::AssignCountMismatch {
                            wanted: expr_index + 1,
                            got: rhs.len(),
                            range: sym_range,
                        });
                        return TypeAndValue::invalid();
                    }
                    if !self.info.types.equal(rhs[expr_index].ty, declared) {
                        self.error(SemanticError::VarTypeMismatch {
                            expected: self.info.types.display(declared),
                            found: self.info.types.display(rhs[expr_index].ty),
                            range: ranges[expr_index],
                        });
                        return TypeAndValue::invalid();
                    }
                }
            }
        }

        TypeAndValue {
            mode: AddressMode::Variable,
            ty: var_type.expect("variable type was just established"),
            value: None,
        }
    }

    fn resolve_const_symbol(
        &mut self,
        sym_id: SymbolId,
        spec_index: usize,
        expr_index: usize,
    ) -> TypeAndValue {
        let sym = self.info.scopes.symbol(sym_id);
        let sym_range = sym.range;
        let decl = self.decl_by_id(sym.decl.expect("const symbol without decl"));
        let DeclKind::Generic(generic) = &decl.kind else {
            unreachable!("const symbol declared by a non-generic declaration");
        };
        let SpecKind::Value(spec) = &generic.specs[spec_index].kind else {
            unreachable!("const symbol pointing at a non-value spec");
        };

        if spec.rhs.is_empty() {
            self.error(SemanticError::ConstNeedsInit { range: sym_range });
            return TypeAndValue::invalid();
        }

        let (rhs, ranges) = self.resolve_and_unpack(&spec.rhs);
        if expr_index >= rhs.len() {
            self.error(SemanticError::AssignCountMismatch {
                wanted: expr_index + 1,
                got: rhs.len(),
                range: sym_range,
            });
            return TypeAndValue::invalid();
        }

        let rhs_tv = rhs[expr_index];
        let range = ranges[expr_index];

        if rhs_tv.mode != AddressMode::Constant {
            self.error(SemanticError::ConstNeedsConstExpr { range });
            return TypeAndValue::invalid();
        }

        if let Some(ty) = &spec.ty {
            let const_type = self.resolve_expr(ty).ty;
            if !self.info.types.equal(rhs_tv.ty, const_type) {
                self.error(SemanticError::ConstTypeMismatch {
                    expected: self.info.types.display(const_type),
                    found: self.info.types.display(rhs_tv.ty),
                    range,
                });
                return TypeAndValue::invalid();
            }
        }

        TypeAndValue {
            mode: AddressMode::Constant,
            ty: rhs_tv.ty,
            value: rhs_tv.value,
        }
    }

    /// Resolve an expression list, fanning a single tuple-typed expression
    /// (a multi-return call) out into its element types.
    pub(crate) fn resolve_and_unpack(
        &mut self,
        exprs: &'a [prism_frontend::Expr],
    ) -> (Vec<TypeAndValue>, Vec<SourceRange>) {
        let mut types = Vec::new();
        let mut ranges = Vec::new();
        if exprs.len() == 1 {
            let expr = &exprs[0];
            let tv = self.resolve_expr(expr);
            match self.info.types.kind(tv.ty) {
                TypeKind::Tuple { elems } => {
                    for &elem in elems.clone().iter() {
                        types.push(TypeAndValue {
                            mode: tv.mode,
                            ty: elem,
                            value: None,
                        });
                        ranges.push(expr.range);
                    }
                }
                _ => {
                    types.push(tv);
                    ranges.push(expr.range);
                }
            }
        } else {
            for expr in exprs {
                types.push(self.resolve_expr(expr));
                ranges.push(expr.range);
            }
        }
        (types, ranges)
    }

    /// Render a list of types as a tuple for count-mismatch notes.
    pub(crate) fn tuple_display(&self, types: &[TypeId]) -> String {
        let mut out = String::from("(");
        for (i, &ty) in types.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&self.info.types.display(ty));
        }
        out.push(')');
        out
    }
}
