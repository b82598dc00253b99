//! Statement typing.

use rustc_hash::FxHashMap;

use prism_frontend::ast::*;
use prism_frontend::{SourceRange, TokenKind};

use crate::constant::ConstValue;
use crate::errors::SemanticError;
use crate::scope::{ResolveState, Symbol, SymbolKind};
use crate::semantic_info::{AddressMode, TypeAndValue};
use crate::type_arena::{TypeId, TypeKind};

use super::{Checker, StmtProperties};

impl<'a> Checker<'a> {
    pub(crate) fn resolve_stmt(&mut self, stmt: &'a Stmt, props: StmtProperties) {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.resolve_expr(expr);
            }
            StmtKind::IncDec(incdec) => self.resolve_inc_dec(stmt, incdec),
            StmtKind::Return(ret) => self.resolve_return(stmt, ret),
            StmtKind::Break => {
                if !props.accepts_break {
                    self.error(SemanticError::MisplacedBreak { range: stmt.range });
                }
            }
            StmtKind::Continue => {
                if !props.accepts_continue {
                    self.error(SemanticError::MisplacedContinue { range: stmt.range });
                }
            }
            StmtKind::Fallthrough => {
                if props.is_final_case_stmt {
                    self.error(SemanticError::FallthroughInFinalCase { range: stmt.range });
                }
                if !props.accepts_fallthrough {
                    self.error(SemanticError::MisplacedFallthrough { range: stmt.range });
                }
            }
            StmtKind::Block(block) => self.resolve_block(stmt, block, props),
            StmtKind::Assign(assign) => self.resolve_assign(stmt, assign),
            StmtKind::If(ifs) => self.resolve_if(stmt, ifs, props),
            StmtKind::For(fors) => self.resolve_for(stmt, fors, props),
            StmtKind::Switch(switch) => self.resolve_switch(stmt, switch, props),
            StmtKind::SwitchCase(_) => {
                unreachable!("switch case outside a switch body")
            }
            StmtKind::Decl(decl) => self.resolve_decl_stmt(stmt, decl),
        }
    }

    fn resolve_inc_dec(&mut self, stmt: &Stmt, incdec: &'a IncDecStmt) {
        let tv = self.resolve_expr(&incdec.expr);
        if tv.mode == AddressMode::Invalid {
            return;
        }

        if !tv.is_assignable() {
            self.error(SemanticError::NotAssignable { range: stmt.range });
            return;
        }

        if !self.info.types.properties(tv.ty).has_arithmetic {
            self.error(SemanticError::MissingCapability {
                ty: self.info.types.display(tv.ty),
                capability: "arithmetic operations",
                range: stmt.range,
            });
        }
    }

    fn resolve_return(&mut self, stmt: &Stmt, ret: &'a ReturnStmt) {
        let Some(func) = self.func_stack.last() else {
            self.error(SemanticError::ReturnOutsideFunction { range: stmt.range });
            return;
        };
        let (func_decl, func_node) = (func.decl, func.node);

        let (returned, ranges) = self.resolve_and_unpack(&ret.exprs);

        let expected = match self
            .info
            .type_of_node(func_node)
            .map(|tv| self.info.types.kind(tv.ty).clone())
        {
            Some(TypeKind::Func { returns, .. }) => returns,
            _ => return,
        };

        if returned.len() == expected.len() {
            for (i, &expected_ty) in expected.iter().enumerate() {
                if returned[i].mode == AddressMode::Invalid {
                    continue;
                }
                if !self.info.types.equal(returned[i].ty, expected_ty) {
                    self.error(SemanticError::ReturnTypeMismatch {
                        found: self.info.types.display(returned[i].ty),
                        expected: self.info.types.display(expected_ty),
                        range: ranges[i],
                    });
                }
            }
            return;
        }

        // A bare return is allowed when the results are named.
        let ExprKind::FuncType(func_ty) = &func_decl.ty.kind else {
            unreachable!("function declaration without a function type");
        };
        let named = func_ty
            .result
            .as_ref()
            .is_some_and(|r| r.fields.first().is_some_and(|f| !f.names.is_empty()));
        if returned.is_empty() && named {
            return;
        }

        let returned_types: Vec<TypeId> = returned.iter().map(|tv| tv.ty).collect();
        self.error(SemanticError::ReturnCountMismatch {
            wanted: expected.len(),
            got: returned.len(),
            have: self.tuple_display(&returned_types),
            want: self.tuple_display(&expected),
            range: stmt.range,
        });
    }

    fn resolve_block(&mut self, stmt: &Stmt, block: &'a BlockStmt, props: StmtProperties) {
        let scope = self
            .info
            .scope_for_node(stmt.id, self.current_scope(), "block");
        self.scope_stack.push(scope);
        for stmt in &block.stmts {
            self.resolve_stmt(stmt, props);
        }
        self.scope_stack.pop();
    }

    fn resolve_assign(&mut self, stmt: &Stmt, assign: &'a AssignStmt) {
        match assign.op.kind {
            TokenKind::ColonEq => self.resolve_define(stmt, assign),
            TokenKind::Eq => self.resolve_plain_assign(stmt, assign),
            TokenKind::PlusEq
            | TokenKind::MinusEq
            | TokenKind::StarEq
            | TokenKind::SlashEq
            | TokenKind::PercentEq => self.resolve_compound_assign(
                stmt,
                assign,
                "arithmetic operations",
                |props| props.has_arithmetic,
            ),
            TokenKind::AmpEq | TokenKind::AmpCaretEq | TokenKind::PipeEq | TokenKind::CaretEq => {
                self.resolve_compound_assign(
                    stmt,
                    assign,
                    "bitwise operations",
                    |props| props.has_bit_ops,
                )
            }
            TokenKind::LessLessEq | TokenKind::GreaterGreaterEq => {
                self.resolve_shift_assign(stmt, assign)
            }
            _ => unreachable!("assignment with operator {:?}", assign.op.kind),
        }
    }

    fn resolve_define(&mut self, stmt: &Stmt, assign: &'a AssignStmt) {
        let (rhs, _) = self.resolve_and_unpack(&assign.rhs);
        if assign.lhs.len() != rhs.len() {
            self.error(SemanticError::AssignCountMismatch {
                wanted: assign.lhs.len(),
                got: rhs.len(),
                range: stmt.range,
            });
            return;
        }

        for lhs in &assign.lhs {
            if !matches!(lhs.kind, ExprKind::Identifier(_)) {
                self.error(SemanticError::DefineNeedsIdentifier { range: lhs.range });
                return;
            }
        }

        for (i, lhs) in assign.lhs.iter().enumerate() {
            let ExprKind::Identifier(name) = &lhs.kind else {
                unreachable!("non-identifier survived the define check");
            };
            let mut sym = Symbol::new(
                name.text.clone(),
                None,
                name.range,
                SymbolKind::Var {
                    spec_index: None,
                    expr_index: None,
                    init: Some(rhs[i]),
                },
            );
            sym.state = ResolveState::Resolved;
            let sym_id = self.add_symbol(sym);
            self.info.set_type_of_symbol(
                sym_id,
                TypeAndValue {
                    mode: AddressMode::Variable,
                    ty: rhs[i].ty,
                    value: None,
                },
            );
            self.info.set_symbol_of_identifier(lhs.id, sym_id);
        }
    }

    fn resolve_plain_assign(&mut self, stmt: &Stmt, assign: &'a AssignStmt) {
        let (rhs, rhs_ranges) = self.resolve_and_unpack(&assign.rhs);
        if assign.lhs.len() != rhs.len() {
            self.error(SemanticError::AssignCountMismatch {
                wanted: assign.lhs.len(),
                got: rhs.len(),
                range: stmt.range,
            });
            return;
        }

        for (i, lhs) in assign.lhs.iter().enumerate() {
            let lhs_tv = self.resolve_expr(lhs);
            if lhs_tv.mode == AddressMode::Invalid || rhs[i].mode == AddressMode::Invalid {
                continue;
            }
            if !lhs_tv.is_assignable() {
                self.error(SemanticError::NotAssignable { range: lhs.range });
            }
            self.check_assign_types(stmt.range, lhs_tv.ty, rhs[i].ty, lhs.range, rhs_ranges[i]);
        }
    }

    fn resolve_compound_assign(
        &mut self,
        stmt: &Stmt,
        assign: &'a AssignStmt,
        capability: &'static str,
        has: fn(crate::type_arena::TypeProperties) -> bool,
    ) {
        let Some((lhs, rhs)) = self.compound_operands(stmt, assign) else {
            return;
        };

        let lhs_tv = self.resolve_expr(lhs);
        if !lhs_tv.is_assignable() {
            self.error(SemanticError::NotAssignable { range: lhs.range });
        }
        let lhs_has = has(self.info.types.properties(lhs_tv.ty));
        self.require_capability(lhs.range, lhs_tv.ty, lhs_has, capability);

        let rhs_tv = self.resolve_expr(rhs);
        let rhs_has = has(self.info.types.properties(rhs_tv.ty));
        self.require_capability(rhs.range, rhs_tv.ty, rhs_has, capability);

        self.check_assign_types(stmt.range, lhs_tv.ty, rhs_tv.ty, lhs.range, rhs.range);
    }

    fn resolve_shift_assign(&mut self, stmt: &Stmt, assign: &'a AssignStmt) {
        let Some((lhs, rhs)) = self.compound_operands(stmt, assign) else {
            return;
        };

        let lhs_tv = self.resolve_expr(lhs);
        if !lhs_tv.is_assignable() {
            self.error(SemanticError::NotAssignable { range: lhs.range });
        }
        let has_bits = self.info.types.properties(lhs_tv.ty).has_bit_ops;
        self.require_capability(lhs.range, lhs_tv.ty, has_bits, "bitwise operations");

        let rhs_tv = self.resolve_expr(rhs);
        if !self.info.types.properties(rhs_tv.ty).integral {
            self.error(SemanticError::ShiftNeedsIntegral {
                ty: self.info.types.display(rhs_tv.ty),
                range: rhs.range,
            });
        } else if rhs_tv.mode == AddressMode::Constant {
            if let Some(v) = rhs_tv.value.and_then(|v| v.as_int()) {
                if v < 0 {
                    self.error(SemanticError::ShiftNegative {
                        value: ConstValue::Int(v).to_string(),
                        range: rhs.range,
                    });
                }
            }
        }
    }

    fn compound_operands(
        &mut self,
        stmt: &Stmt,
        assign: &'a AssignStmt,
    ) -> Option<(&'a Expr, &'a Expr)> {
        if assign.lhs.len() != 1 || assign.rhs.len() != 1 {
            self.error(SemanticError::CompoundAssignNotSingle {
                op: assign.op.text.clone(),
                range: stmt.range,
            });
            return None;
        }
        Some((&assign.lhs[0], &assign.rhs[0]))
    }

    fn check_assign_types(
        &mut self,
        stmt_range: SourceRange,
        lhs: TypeId,
        rhs: TypeId,
        lhs_range: SourceRange,
        rhs_range: SourceRange,
    ) {
        if !self.info.types.equal(lhs, rhs) {
            self.error(SemanticError::AssignTypeMismatch {
                lhs: self.info.types.display(lhs),
                rhs: self.info.types.display(rhs),
                range: stmt_range,
                lhs_range,
                rhs_range,
            });
        }
    }

    fn resolve_if(&mut self, stmt: &Stmt, ifs: &'a IfStmt, props: StmtProperties) {
        let scope = self.info.scope_for_node(stmt.id, self.current_scope(), "if");
        self.scope_stack.push(scope);

        if let Some(init) = &ifs.init {
            self.resolve_stmt(init, props);
        }

        let cond = self.resolve_expr(&ifs.cond);
        if cond.mode != AddressMode::Invalid && !self.info.types.equal(cond.ty, TypeId::BOOL) {
            self.error(SemanticError::IfCondNotBool {
                ty: self.info.types.display(cond.ty),
                range: ifs.cond.range,
            });
            self.scope_stack.pop();
            return;
        }

        self.resolve_stmt(&ifs.body, props);

        if let Some(els) = &ifs.els {
            self.resolve_stmt(els, props);
        }

        self.scope_stack.pop();
    }

    fn resolve_for(&mut self, stmt: &Stmt, fors: &'a ForStmt, mut props: StmtProperties) {
        let scope = self.info.scope_for_node(stmt.id, self.current_scope(), "for");
        self.scope_stack.push(scope);

        if let Some(init) = &fors.init {
            self.resolve_stmt(init, props);
        }

        if let Some(cond) = &fors.cond {
            let cond_tv = self.resolve_expr(cond);
            if cond_tv.mode != AddressMode::Invalid && !self.info.types.equal(cond_tv.ty, TypeId::BOOL) {
                self.error(SemanticError::ForCondNotBool {
                    ty: self.info.types.display(cond_tv.ty),
                    range: cond.range,
                });
                self.scope_stack.pop();
                return;
            }
        }

        if let Some(post) = &fors.post {
            self.resolve_stmt(post, props);
        }

        props.accepts_break = true;
        props.accepts_continue = true;
        self.resolve_stmt(&fors.body, props);

        self.scope_stack.pop();
    }

    fn resolve_switch(&mut self, stmt: &Stmt, switch: &'a SwitchStmt, mut props: StmtProperties) {
        let scope = self
            .info
            .scope_for_node(stmt.id, self.current_scope(), "switch");
        self.scope_stack.push(scope);

        if let Some(init) = &switch.init {
            self.resolve_stmt(init, props);
        }

        let tag = match &switch.tag {
            Some(tag_expr) => {
                let tag_tv = self.resolve_expr(tag_expr);
                let props_of_tag = self.info.types.properties(tag_tv.ty);
                if tag_tv.mode != AddressMode::Invalid
                    && !props_of_tag.integral
                    && !props_of_tag.floating
                    && !self.info.types.equal(tag_tv.ty, TypeId::BOOL)
                {
                    self.error(SemanticError::InvalidSwitchTag {
                        ty: self.info.types.display(tag_tv.ty),
                        range: tag_expr.range,
                    });
                }
                tag_tv
            }
            None => TypeAndValue::constant(TypeId::BOOL, ConstValue::Bool(true)),
        };

        let mut case_values: FxHashMap<String, SourceRange> = FxHashMap::default();
        let case_count = switch.body.len();
        for (i, case_stmt) in switch.body.iter().enumerate() {
            let StmtKind::SwitchCase(case) = &case_stmt.kind else {
                unreachable!("non-case statement in a switch body");
            };
            props.accepts_break = true;
            props.accepts_fallthrough = true;
            props.is_final_case_stmt = i + 1 == case_count;
            self.resolve_switch_case(case_stmt, case, &mut case_values, tag.ty, props);
        }

        self.scope_stack.pop();
    }

    fn resolve_switch_case(
        &mut self,
        stmt: &'a Stmt,
        case: &'a SwitchCaseStmt,
        case_values: &mut FxHashMap<String, SourceRange>,
        tag_type: TypeId,
        props: StmtProperties,
    ) {
        let scope = self.info.scope_for_node(stmt.id, self.current_scope(), "case");
        self.scope_stack.push(scope);

        for value_expr in &case.values {
            let tv = self.resolve_expr(value_expr);
            if tv.mode == AddressMode::Invalid {
                continue;
            }

            if !self.info.types.equal(tv.ty, tag_type) {
                self.error(SemanticError::CaseTypeMismatch {
                    ty: self.info.types.display(tv.ty),
                    tag: self.info.types.display(tag_type),
                    range: value_expr.range,
                });
            }

            if tv.mode == AddressMode::Constant {
                if let Some(value) = tv.value {
                    let key = value.to_string();
                    if let Some(&first) = case_values.get(&key) {
                        self.error(SemanticError::DuplicateCaseValue {
                            value: key,
                            range: value_expr.range,
                            first,
                        });
                    } else {
                        case_values.insert(key, value_expr.range);
                    }
                }
            }
        }

        let stmt_count = case.stmts.len();
        for (i, case_body_stmt) in case.stmts.iter().enumerate() {
            if matches!(case_body_stmt.kind, StmtKind::Fallthrough) && i != stmt_count - 1 {
                self.error(SemanticError::FallthroughNotLast {
                    range: case_body_stmt.range,
                });
            }
            self.resolve_stmt(case_body_stmt, props);
        }

        self.scope_stack.pop();
    }

    fn resolve_decl_stmt(&mut self, stmt: &Stmt, decl: &'a Decl) {
        let DeclKind::Generic(generic) = &decl.kind else {
            unreachable!("function declaration in statement position");
        };

        match generic.decl_token.kind {
            TokenKind::KwVar => {
                self.resolve_value_decl_stmt(stmt, decl, generic, false);
            }
            TokenKind::KwConst => {
                self.resolve_value_decl_stmt(stmt, decl, generic, true);
            }
            TokenKind::KwType => {
                for (si, spec) in generic.specs.iter().enumerate() {
                    let SpecKind::Type(ty_spec) = &spec.kind else {
                        continue;
                    };
                    let sym = Symbol::new(
                        ty_spec.name.name(),
                        Some(decl.id),
                        ty_spec.name.range(),
                        SymbolKind::Type {
                            spec_index: si,
                            strong: ty_spec.assign.is_none(),
                        },
                    );
                    let sym_id = self.add_symbol(sym);
                    self.resolve_symbol(sym_id);
                    self.info.set_symbol_of_identifier(ty_spec.name.id, sym_id);
                }
            }
            _ => unreachable!("declaration statement with a non-declaration token"),
        }
    }

    fn resolve_value_decl_stmt(
        &mut self,
        stmt: &Stmt,
        decl: &'a Decl,
        generic: &'a GenericDecl,
        is_const: bool,
    ) {
        for (si, spec) in generic.specs.iter().enumerate() {
            let SpecKind::Value(value) = &spec.kind else {
                continue;
            };

            let (rhs, _) = self.resolve_and_unpack(&value.rhs);
            if value.assign.is_some() && value.lhs.len() != rhs.len() {
                self.error(SemanticError::AssignCountMismatch {
                    wanted: value.lhs.len(),
                    got: rhs.len(),
                    range: stmt.range,
                });
                return;
            }

            for (ei, name) in value.lhs.iter().enumerate() {
                let kind = if is_const {
                    SymbolKind::Const {
                        spec_index: si,
                        expr_index: ei,
                    }
                } else {
                    SymbolKind::Var {
                        spec_index: Some(si),
                        expr_index: Some(ei),
                        init: rhs.get(ei).copied(),
                    }
                };
                let sym = Symbol::new(name.name(), Some(decl.id), decl.range, kind);
                let sym_id = self.add_symbol(sym);
                self.resolve_symbol(sym_id);
                self.info.set_symbol_of_identifier(name.id, sym_id);
            }
        }
    }
}
