//! Lowering from the checked AST to SPIR-V IR.
//!
//! Walks the reachable global symbols in resolution order and emits typed
//! SSA into basic blocks, consulting only the semantic side tables for
//! types, symbols, and folded constants. Control flow uses structured
//! selection/loop merges; blocks opened after a terminator hold any
//! trailing unreachable code and are pruned by the rewrite passes.

use rustc_hash::FxHashMap;

use prism_frontend::ast::*;
use prism_frontend::{NodeId, SourceRange, TokenKind};
use prism_sema::{
    AddressMode, ConstValue, SemanticInfo, SymbolId, SymbolKind, TypeAndValue, TypeId, TypeKind,
    TypeProperties,
};
use prism_spirv::{
    AddressingModel, Capability, Id, Instruction, MemoryModel, Module, Opcode, StorageClass,
};

use crate::errors::LowerError;

/// How a resolved symbol is reached from instruction operands.
#[derive(Debug, Clone, Copy)]
enum Binding {
    /// A function object, used as a call target.
    Function(Id),
    /// A plain SSA value (function parameters).
    Value(Id),
    /// A pointer-typed local; reads go through `OpLoad`.
    Variable { var: Id, pointee: Id },
}

pub struct Lowerer<'a> {
    file: &'a File,
    info: &'a SemanticInfo,
    module: Module,
    bindings: FxHashMap<SymbolId, Binding>,
    current_func: Id,
    current_block: Id,
    break_targets: Vec<Id>,
    continue_targets: Vec<Id>,
    fallthrough_target: Option<Id>,
}

/// Lower every reachable function into a fresh module. The module still
/// needs the rewrite passes before serialization.
pub fn lower(file: &File, info: &SemanticInfo) -> Result<Module, LowerError> {
    let mut module = Module::new(AddressingModel::Logical, MemoryModel::Glsl450);
    module.add_capability(Capability::Shader);
    module.add_capability(Capability::Linkage);

    // Dummy ids until the first function opens; every block/instruction
    // touch goes through a live function.
    let placeholder = module.type_void();

    let mut lowerer = Lowerer {
        file,
        info,
        module,
        bindings: FxHashMap::default(),
        current_func: placeholder,
        current_block: placeholder,
        break_targets: Vec::new(),
        continue_targets: Vec::new(),
        fallthrough_target: None,
    };

    for &sym in &info.reachable_symbols {
        if matches!(info.scopes.symbol(sym).kind, SymbolKind::Func) {
            lowerer.lower_function(sym)?;
        }
    }

    Ok(lowerer.module)
}

impl<'a> Lowerer<'a> {
    fn func_decl_of(&self, decl_id: NodeId) -> &'a FuncDecl {
        for decl in &self.file.decls {
            if decl.id == decl_id {
                if let DeclKind::Func(func) = &decl.kind {
                    return func;
                }
            }
        }
        unreachable!("reachable function symbol without a declaration")
    }

    fn lower_type(&mut self, ty: TypeId, range: SourceRange) -> Result<Id, LowerError> {
        let resolved = self.info.types.resolve(ty, true);
        match self.info.types.kind(resolved) {
            TypeKind::Void => Ok(self.module.type_void()),
            TypeKind::Bool => Ok(self.module.type_bool()),
            TypeKind::Int => Ok(self.module.type_int(32, true)),
            TypeKind::Uint => Ok(self.module.type_int(32, false)),
            TypeKind::Float32 => Ok(self.module.type_float(32)),
            TypeKind::Float64 => Ok(self.module.type_float(64)),
            _ => Err(LowerError::UnsupportedType {
                ty: self.info.types.display(ty),
                range,
            }),
        }
    }

    fn lower_function(&mut self, sym_id: SymbolId) -> Result<(), LowerError> {
        let sym = self.info.scopes.symbol(sym_id);
        let name = sym.name.clone();
        let sym_range = sym.range;
        tracing::trace!(function = %name, "lowering function");

        let func_decl = self.func_decl_of(sym.decl.expect("function symbol without decl"));

        let tv = self
            .info
            .type_of_symbol(sym_id)
            .expect("reachable function without a type");
        let func_ty = self.info.types.resolve(tv.ty, true);
        let TypeKind::Func { params, returns } = self.info.types.kind(func_ty).clone() else {
            unreachable!("function symbol with a non-function type");
        };

        let ret_ir = match returns.len() {
            0 => self.module.type_void(),
            1 => self.lower_type(returns[0], sym_range)?,
            _ => return Err(LowerError::UnsupportedMultiReturn { range: sym_range }),
        };
        let mut param_irs = Vec::with_capacity(params.len());
        for &param in params.iter() {
            param_irs.push(self.lower_type(param, sym_range)?);
        }

        let fn_ty = self
            .module
            .type_func(ret_ir, param_irs.clone(), &format!("func_{name}"));
        let func = self.module.new_function(&name, fn_ty);
        self.bindings.insert(sym_id, Binding::Function(func));

        let ExprKind::FuncType(func_ty_expr) = &func_decl.ty.kind else {
            unreachable!("function declaration without a function type");
        };

        let mut index = 0;
        for field in &func_ty_expr.params.fields {
            if field.names.is_empty() {
                let param_name = format!("UnnamedParam{index}");
                self.module
                    .new_func_param(func, &param_name, param_irs[index]);
                index += 1;
                continue;
            }
            for ident in &field.names {
                let param = self
                    .module
                    .new_func_param(func, ident.name(), param_irs[index]);
                if let Some(param_sym) = self.info.symbol_of_identifier(ident.id) {
                    self.bindings.insert(param_sym, Binding::Value(param));
                }
                index += 1;
            }
        }

        self.current_func = func;
        self.current_block = self.module.new_block(func, "entry");

        if let Some(body) = &func_decl.body {
            let StmtKind::Block(block) = &body.kind else {
                unreachable!("function body that is not a block");
            };
            for stmt in &block.stmts {
                self.lower_stmt(stmt)?;
            }
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn lower_stmt(&mut self, stmt: &'a Stmt) -> Result<(), LowerError> {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.lower_expr(expr)?;
                Ok(())
            }
            StmtKind::Return(ret) => self.lower_return(stmt, ret),
            StmtKind::Break => {
                let target = *self
                    .break_targets
                    .last()
                    .expect("checked break outside loop or switch");
                self.terminate_with(Instruction::Branch { target });
                Ok(())
            }
            StmtKind::Continue => {
                let target = *self
                    .continue_targets
                    .last()
                    .expect("checked continue outside loop");
                self.terminate_with(Instruction::Branch { target });
                Ok(())
            }
            StmtKind::Fallthrough => {
                let target = self
                    .fallthrough_target
                    .expect("checked fallthrough outside switch");
                self.terminate_with(Instruction::Branch { target });
                Ok(())
            }
            StmtKind::Block(block) => {
                for stmt in &block.stmts {
                    self.lower_stmt(stmt)?;
                }
                Ok(())
            }
            StmtKind::Assign(assign) => self.lower_assign(assign),
            StmtKind::IncDec(incdec) => self.lower_inc_dec(incdec),
            StmtKind::If(ifs) => self.lower_if(ifs),
            StmtKind::For(fors) => self.lower_for(fors),
            StmtKind::Switch(switch) => self.lower_switch(switch),
            StmtKind::SwitchCase(_) => unreachable!("switch case outside a switch body"),
            StmtKind::Decl(decl) => self.lower_decl_stmt(decl),
        }
    }

    /// Emit a terminator and open a fresh block for whatever follows; the
    /// fresh block is unreachable and gets pruned unless branched to.
    fn terminate_with(&mut self, terminator: Instruction) {
        self.module.push_instruction(self.current_block, terminator);
        self.current_block = self.module.new_block(self.current_func, "dead");
    }

    fn lower_return(&mut self, stmt: &'a Stmt, ret: &'a ReturnStmt) -> Result<(), LowerError> {
        match ret.exprs.len() {
            0 => {
                self.terminate_with(Instruction::Return);
                Ok(())
            }
            1 => {
                let value = self.lower_expr(&ret.exprs[0])?;
                self.terminate_with(Instruction::ReturnValue { value });
                Ok(())
            }
            _ => Err(LowerError::UnsupportedMultiReturn { range: stmt.range }),
        }
    }

    fn lower_assign(&mut self, assign: &'a AssignStmt) -> Result<(), LowerError> {
        match assign.op.kind {
            TokenKind::ColonEq => self.lower_define(assign),
            TokenKind::Eq => {
                if assign.lhs.len() != assign.rhs.len() {
                    return Err(LowerError::UnsupportedMultiReturn {
                        range: assign.op.range,
                    });
                }
                // Evaluate every RHS before the first store so swaps work.
                let mut values = Vec::with_capacity(assign.rhs.len());
                for rhs in &assign.rhs {
                    values.push(self.lower_expr(rhs)?);
                }
                for (lhs, value) in assign.lhs.iter().zip(values) {
                    let (pointer, _) = self.lower_target(lhs)?;
                    self.module
                        .push_instruction(self.current_block, Instruction::Store { pointer, value });
                }
                Ok(())
            }
            _ => self.lower_compound_assign(assign),
        }
    }

    fn lower_define(&mut self, assign: &'a AssignStmt) -> Result<(), LowerError> {
        if assign.lhs.len() != assign.rhs.len() {
            // A tuple-typed multi-return fan-out; not mappable yet.
            return Err(LowerError::UnsupportedMultiReturn {
                range: assign.op.range,
            });
        }

        let mut values = Vec::with_capacity(assign.rhs.len());
        for rhs in &assign.rhs {
            values.push(self.lower_expr(rhs)?);
        }

        for (lhs, value) in assign.lhs.iter().zip(values) {
            let sym = self
                .info
                .symbol_of_identifier(lhs.id)
                .expect("checked define target without a symbol");
            let ty = self
                .info
                .type_of_symbol(sym)
                .expect("define target without a type");
            let pointer = self.alloc_local(sym, ty.ty, lhs.range)?;
            self.module
                .push_instruction(self.current_block, Instruction::Store { pointer, value });
        }
        Ok(())
    }

    fn lower_compound_assign(&mut self, assign: &'a AssignStmt) -> Result<(), LowerError> {
        let lhs = &assign.lhs[0];
        let rhs = &assign.rhs[0];

        let (pointer, pointee) = self.lower_target(lhs)?;
        let loaded = self.load(pointer, pointee, "tmp");
        let rhs_value = self.lower_expr(rhs)?;

        let lhs_ty = self.checked_type(lhs.id);
        let props = self.info.types.properties(lhs_ty);
        let compound_op = match assign.op.kind {
            TokenKind::PlusEq => TokenKind::Plus,
            TokenKind::MinusEq => TokenKind::Minus,
            TokenKind::StarEq => TokenKind::Star,
            TokenKind::SlashEq => TokenKind::Slash,
            TokenKind::PercentEq => TokenKind::Percent,
            TokenKind::AmpEq => TokenKind::Amp,
            TokenKind::AmpCaretEq => TokenKind::AmpCaret,
            TokenKind::PipeEq => TokenKind::Pipe,
            TokenKind::CaretEq => TokenKind::Caret,
            TokenKind::LessLessEq => TokenKind::LessLess,
            TokenKind::GreaterGreaterEq => TokenKind::GreaterGreater,
            _ => unreachable!("compound assignment with operator {:?}", assign.op.kind),
        };

        let value =
            self.emit_binary_value(compound_op, props, pointee, loaded, rhs_value, lhs.range)?;
        self.module
            .push_instruction(self.current_block, Instruction::Store { pointer, value });
        Ok(())
    }

    fn lower_inc_dec(&mut self, incdec: &'a IncDecStmt) -> Result<(), LowerError> {
        let (pointer, pointee) = self.lower_target(&incdec.expr)?;
        let loaded = self.load(pointer, pointee, "tmp");

        let ty = self.checked_type(incdec.expr.id);
        let props = self.info.types.properties(ty);
        let one = self.typed_one(ty, incdec.expr.range)?;

        let op = match incdec.op.kind {
            TokenKind::PlusPlus => TokenKind::Plus,
            TokenKind::MinusMinus => TokenKind::Minus,
            _ => unreachable!("inc/dec with operator {:?}", incdec.op.kind),
        };
        let value = self.emit_binary_value(op, props, pointee, loaded, one, incdec.expr.range)?;
        self.module
            .push_instruction(self.current_block, Instruction::Store { pointer, value });
        Ok(())
    }

    fn typed_one(&mut self, ty: TypeId, range: SourceRange) -> Result<Id, LowerError> {
        let resolved = self.info.types.resolve(ty, true);
        match self.info.types.kind(resolved) {
            TypeKind::Int => Ok(self.module.const_int(32, true, 1)),
            TypeKind::Uint => Ok(self.module.const_int(32, false, 1)),
            TypeKind::Float32 => Ok(self.module.const_float(32, 1.0)),
            TypeKind::Float64 => Ok(self.module.const_float(64, 1.0)),
            _ => Err(LowerError::UnsupportedType {
                ty: self.info.types.display(ty),
                range,
            }),
        }
    }

    fn lower_if(&mut self, ifs: &'a IfStmt) -> Result<(), LowerError> {
        if let Some(init) = &ifs.init {
            self.lower_stmt(init)?;
        }

        let condition = self.lower_expr(&ifs.cond)?;

        let true_block = self.module.new_block(self.current_func, "true");
        let false_block = self.module.new_block(self.current_func, "false");
        let merge = self.module.new_block(self.current_func, "merge");

        self.module
            .push_instruction(self.current_block, Instruction::SelectionMerge { merge });
        self.module.push_instruction(
            self.current_block,
            Instruction::BranchConditional {
                condition,
                true_target: true_block,
                false_target: false_block,
            },
        );

        self.current_block = true_block;
        self.lower_stmt(&ifs.body)?;
        if !self.module.is_block_terminated(self.current_block) {
            self.module
                .push_instruction(self.current_block, Instruction::Branch { target: merge });
        }

        self.current_block = false_block;
        if let Some(els) = &ifs.els {
            self.lower_stmt(els)?;
        }
        if !self.module.is_block_terminated(self.current_block) {
            self.module
                .push_instruction(self.current_block, Instruction::Branch { target: merge });
        }

        self.current_block = merge;
        Ok(())
    }

    fn lower_for(&mut self, fors: &'a ForStmt) -> Result<(), LowerError> {
        if let Some(init) = &fors.init {
            self.lower_stmt(init)?;
        }

        let header = self.module.new_block(self.current_func, "loop_header");
        let cond_block = fors
            .cond
            .as_ref()
            .map(|_| self.module.new_block(self.current_func, "loop_cond"));
        let body_block = self.module.new_block(self.current_func, "loop_body");
        let continue_block = self.module.new_block(self.current_func, "loop_continue");
        let merge = self.module.new_block(self.current_func, "loop_merge");

        self.module
            .push_instruction(self.current_block, Instruction::Branch { target: header });

        self.module.push_instruction(
            header,
            Instruction::LoopMerge {
                merge,
                continue_target: continue_block,
            },
        );
        self.module.push_instruction(
            header,
            Instruction::Branch {
                target: cond_block.unwrap_or(body_block),
            },
        );

        if let (Some(cond), Some(cond_block)) = (&fors.cond, cond_block) {
            self.current_block = cond_block;
            let condition = self.lower_expr(cond)?;
            self.module.push_instruction(
                self.current_block,
                Instruction::BranchConditional {
                    condition,
                    true_target: body_block,
                    false_target: merge,
                },
            );
        }

        self.current_block = body_block;
        self.break_targets.push(merge);
        self.continue_targets.push(continue_block);
        self.lower_stmt(&fors.body)?;
        self.continue_targets.pop();
        self.break_targets.pop();
        if !self.module.is_block_terminated(self.current_block) {
            self.module.push_instruction(
                self.current_block,
                Instruction::Branch {
                    target: continue_block,
                },
            );
        }

        self.current_block = continue_block;
        if let Some(post) = &fors.post {
            self.lower_stmt(post)?;
        }
        if !self.module.is_block_terminated(self.current_block) {
            self.module
                .push_instruction(self.current_block, Instruction::Branch { target: header });
        }

        self.current_block = merge;
        Ok(())
    }

    /// Switch lowers to a structured compare/branch chain: each case value
    /// tests in its own block, matches branch to the case body, and
    /// fallthrough branches into the next body in source order.
    fn lower_switch(&mut self, switch: &'a SwitchStmt) -> Result<(), LowerError> {
        if let Some(init) = &switch.init {
            self.lower_stmt(init)?;
        }

        let (tag_value, tag_ty) = match &switch.tag {
            Some(tag) => (self.lower_expr(tag)?, self.checked_type(tag.id)),
            None => (self.module.const_bool(true), TypeId::BOOL),
        };
        let tag_props = self.info.types.properties(tag_ty);
        let bool_ir = self.module.type_bool();

        let mut bodies = Vec::with_capacity(switch.body.len());
        for (i, case_stmt) in switch.body.iter().enumerate() {
            let StmtKind::SwitchCase(case) = &case_stmt.kind else {
                unreachable!("non-case statement in a switch body");
            };
            let name = if case.is_default {
                "default".to_string()
            } else {
                format!("case_{i}")
            };
            bodies.push(self.module.new_block(self.current_func, &name));
        }
        let merge = self.module.new_block(self.current_func, "switch_merge");

        let mut default_body = None;
        for (i, case_stmt) in switch.body.iter().enumerate() {
            let StmtKind::SwitchCase(case) = &case_stmt.kind else {
                unreachable!("non-case statement in a switch body");
            };
            if case.is_default {
                default_body = Some(bodies[i]);
                continue;
            }
            for value_expr in &case.values {
                let value = self.lower_expr(value_expr)?;
                let eq_op = select_compare_opcode(TokenKind::EqEq, tag_props);
                let cmp = self.module.new_runtime_value("cmp", bool_ir);
                self.module.push_instruction(
                    self.current_block,
                    Instruction::Binary {
                        op: eq_op,
                        result_type: bool_ir,
                        result: cmp,
                        lhs: tag_value,
                        rhs: value,
                    },
                );
                let next_test = self.module.new_block(self.current_func, "switch_test");
                self.module.push_instruction(
                    self.current_block,
                    Instruction::SelectionMerge { merge: next_test },
                );
                self.module.push_instruction(
                    self.current_block,
                    Instruction::BranchConditional {
                        condition: cmp,
                        true_target: bodies[i],
                        false_target: next_test,
                    },
                );
                self.current_block = next_test;
            }
        }
        self.module.push_instruction(
            self.current_block,
            Instruction::Branch {
                target: default_body.unwrap_or(merge),
            },
        );

        for (i, case_stmt) in switch.body.iter().enumerate() {
            let StmtKind::SwitchCase(case) = &case_stmt.kind else {
                unreachable!("non-case statement in a switch body");
            };
            self.current_block = bodies[i];
            let saved = self.fallthrough_target;
            self.fallthrough_target = bodies.get(i + 1).copied();
            self.break_targets.push(merge);
            for stmt in &case.stmts {
                self.lower_stmt(stmt)?;
            }
            self.break_targets.pop();
            self.fallthrough_target = saved;
            if !self.module.is_block_terminated(self.current_block) {
                self.module
                    .push_instruction(self.current_block, Instruction::Branch { target: merge });
            }
        }

        self.current_block = merge;
        Ok(())
    }

    fn lower_decl_stmt(&mut self, decl: &'a Decl) -> Result<(), LowerError> {
        let DeclKind::Generic(generic) = &decl.kind else {
            unreachable!("function declaration in statement position");
        };
        match generic.decl_token.kind {
            TokenKind::KwVar => {
                for spec in &generic.specs {
                    let SpecKind::Value(value) = &spec.kind else {
                        continue;
                    };
                    for (ei, ident) in value.lhs.iter().enumerate() {
                        let Some(sym) = self.info.symbol_of_identifier(ident.id) else {
                            continue;
                        };
                        let Some(tv) = self.info.type_of_symbol(sym) else {
                            continue;
                        };
                        let pointer = self.alloc_local(sym, tv.ty, ident.range())?;
                        if let Some(rhs) = value.rhs.get(ei) {
                            let init = self.lower_expr(rhs)?;
                            self.module.push_instruction(
                                self.current_block,
                                Instruction::Store {
                                    pointer,
                                    value: init,
                                },
                            );
                        }
                    }
                }
                Ok(())
            }
            // Constants fold at use sites; local types are checker-only.
            TokenKind::KwConst | TokenKind::KwType => Ok(()),
            _ => unreachable!("declaration statement with a non-declaration token"),
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn checked_type(&self, node: NodeId) -> TypeId {
        self.info
            .type_of_node(node)
            .map(|tv| tv.ty)
            .unwrap_or(TypeId::VOID)
    }

    fn lower_expr(&mut self, expr: &'a Expr) -> Result<Id, LowerError> {
        match &expr.kind {
            ExprKind::Literal(_) => {
                let tv = self
                    .info
                    .type_of_node(expr.id)
                    .unwrap_or_else(TypeAndValue::invalid);
                self.const_from_tv(&tv, expr.range)
            }
            ExprKind::Identifier(_) => self.lower_identifier(expr),
            ExprKind::Paren(base) => self.lower_expr(base),
            ExprKind::Unary(unary) => self.lower_unary(expr, unary),
            ExprKind::Binary(binary) => self.lower_binary(expr, binary),
            ExprKind::Call(call) => self.lower_call(expr, call),
            _ => Err(LowerError::UnsupportedExpr { range: expr.range }),
        }
    }

    fn lower_identifier(&mut self, expr: &'a Expr) -> Result<Id, LowerError> {
        let sym = self
            .info
            .symbol_of_identifier(expr.id)
            .expect("checked identifier without a symbol");
        let tv = self
            .info
            .type_of_symbol(sym)
            .unwrap_or_else(TypeAndValue::invalid);

        // Constants materialise as interned constant objects.
        if tv.mode == AddressMode::Constant {
            return self.const_from_tv(&tv, expr.range);
        }

        match self.bindings.get(&sym).copied() {
            Some(Binding::Value(id)) | Some(Binding::Function(id)) => Ok(id),
            Some(Binding::Variable { var, pointee }) => {
                let name = self.info.scopes.symbol(sym).name.clone();
                Ok(self.load(var, pointee, &name))
            }
            None => Err(LowerError::UnsupportedExpr { range: expr.range }),
        }
    }

    fn const_from_tv(&mut self, tv: &TypeAndValue, range: SourceRange) -> Result<Id, LowerError> {
        let resolved = self.info.types.resolve(tv.ty, true);
        match (self.info.types.kind(resolved).clone(), tv.value) {
            (TypeKind::Int, Some(ConstValue::Int(v))) => Ok(self.module.const_int(32, true, v)),
            (TypeKind::Uint, Some(ConstValue::Int(v))) => Ok(self.module.const_int(32, false, v)),
            (TypeKind::Float32, Some(ConstValue::Float(v))) => Ok(self.module.const_float(32, v)),
            (TypeKind::Float64, Some(ConstValue::Float(v))) => Ok(self.module.const_float(64, v)),
            (TypeKind::Bool, Some(ConstValue::Bool(v))) => Ok(self.module.const_bool(v)),
            _ => Err(LowerError::UnsupportedExpr { range }),
        }
    }

    fn lower_unary(&mut self, expr: &'a Expr, unary: &'a UnaryExpr) -> Result<Id, LowerError> {
        let operand = self.lower_expr(&unary.base)?;
        if unary.op.kind == TokenKind::Plus {
            return Ok(operand);
        }

        let ty = self.checked_type(expr.id);
        let props = self.info.types.properties(ty);
        let result_type = self.lower_type(ty, expr.range)?;

        let op = match unary.op.kind {
            TokenKind::Minus => {
                if props.floating {
                    Opcode::FNegate
                } else {
                    Opcode::SNegate
                }
            }
            TokenKind::Bang => Opcode::LogicalNot,
            TokenKind::Caret => Opcode::Not,
            _ => unreachable!("unary expression with operator {:?}", unary.op.kind),
        };

        let result = self.module.new_runtime_value("tmp", result_type);
        self.module.push_instruction(
            self.current_block,
            Instruction::Unary {
                op,
                result_type,
                result,
                operand,
            },
        );
        Ok(result)
    }

    fn lower_binary(&mut self, expr: &'a Expr, binary: &'a BinaryExpr) -> Result<Id, LowerError> {
        let lhs = self.lower_expr(&binary.lhs)?;
        let rhs = self.lower_expr(&binary.rhs)?;

        let operand_ty = self.checked_type(binary.lhs.id);
        let props = self.info.types.properties(operand_ty);
        let result_ir = {
            let result_ty = self.checked_type(expr.id);
            self.lower_type(result_ty, expr.range)?
        };

        self.emit_binary_value(binary.op.kind, props, result_ir, lhs, rhs, expr.range)
    }

    /// Select the opcode for a binary source operator from the operand
    /// type's properties, emit the instruction, and return its result.
    fn emit_binary_value(
        &mut self,
        op: TokenKind,
        props: TypeProperties,
        result_type: Id,
        lhs: Id,
        rhs: Id,
        range: SourceRange,
    ) -> Result<Id, LowerError> {
        // `&^` is AND with the complement of the RHS.
        if op == TokenKind::AmpCaret {
            let not_rhs = self.module.new_runtime_value("tmp", result_type);
            self.module.push_instruction(
                self.current_block,
                Instruction::Unary {
                    op: Opcode::Not,
                    result_type,
                    result: not_rhs,
                    operand: rhs,
                },
            );
            let result = self.module.new_runtime_value("tmp", result_type);
            self.module.push_instruction(
                self.current_block,
                Instruction::Binary {
                    op: Opcode::BitwiseAnd,
                    result_type,
                    result,
                    lhs,
                    rhs: not_rhs,
                },
            );
            return Ok(result);
        }

        let opcode = match op {
            TokenKind::Plus => arith(props, Opcode::IAdd, Opcode::FAdd),
            TokenKind::Minus => arith(props, Opcode::ISub, Opcode::FSub),
            TokenKind::Star => arith(props, Opcode::IMul, Opcode::FMul),
            TokenKind::Slash => {
                if props.floating {
                    Opcode::FDiv
                } else if props.signed {
                    Opcode::SDiv
                } else {
                    Opcode::UDiv
                }
            }
            TokenKind::Percent => {
                if props.floating {
                    Opcode::FRem
                } else if props.signed {
                    Opcode::SRem
                } else {
                    Opcode::UMod
                }
            }
            TokenKind::Amp => Opcode::BitwiseAnd,
            TokenKind::Pipe => Opcode::BitwiseOr,
            TokenKind::Caret => Opcode::BitwiseXor,
            TokenKind::LessLess => Opcode::ShiftLeftLogical,
            TokenKind::GreaterGreater => {
                if props.signed {
                    Opcode::ShiftRightArithmetic
                } else {
                    Opcode::ShiftRightLogical
                }
            }
            TokenKind::AmpAmp => Opcode::LogicalAnd,
            TokenKind::PipePipe => Opcode::LogicalOr,
            TokenKind::EqEq
            | TokenKind::BangEq
            | TokenKind::Lt
            | TokenKind::Gt
            | TokenKind::LtEq
            | TokenKind::GtEq => select_compare_opcode(op, props),
            _ => return Err(LowerError::UnsupportedExpr { range }),
        };

        let result = self.module.new_runtime_value("tmp", result_type);
        self.module.push_instruction(
            self.current_block,
            Instruction::Binary {
                op: opcode,
                result_type,
                result,
                lhs,
                rhs,
            },
        );
        Ok(result)
    }

    fn lower_call(&mut self, expr: &'a Expr, call: &'a CallExpr) -> Result<Id, LowerError> {
        let function = self.lower_expr(&call.base)?;

        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            args.push(self.lower_expr(arg)?);
        }

        let result_ty = self.checked_type(expr.id);
        let result_type = self.lower_type(result_ty, expr.range)?;
        let result = self.module.new_runtime_value("call", result_type);
        self.module.push_instruction(
            self.current_block,
            Instruction::FunctionCall {
                result_type,
                result,
                function,
                args,
            },
        );
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Locals
    // ------------------------------------------------------------------

    /// Allocate a function-storage variable for a local symbol, emit its
    /// `OpVariable` into the current block (the rewrite pass hoists it to
    /// the entry block), and bind the symbol to the pointer.
    fn alloc_local(
        &mut self,
        sym: SymbolId,
        ty: TypeId,
        range: SourceRange,
    ) -> Result<Id, LowerError> {
        let pointee = self.lower_type(ty, range)?;
        let ptr_ty = self.module.type_ptr(pointee, StorageClass::Function);
        let name = self.info.scopes.symbol(sym).name.clone();
        let var = self
            .module
            .new_variable(&name, ptr_ty, StorageClass::Function, None);
        self.module.push_instruction(
            self.current_block,
            Instruction::Variable {
                result_type: ptr_ty,
                result: var,
                storage: StorageClass::Function,
                init: None,
            },
        );
        self.bindings.insert(sym, Binding::Variable { var, pointee });
        Ok(var)
    }

    fn load(&mut self, pointer: Id, pointee: Id, name: &str) -> Id {
        let result = self.module.new_runtime_value(name, pointee);
        self.module.push_instruction(
            self.current_block,
            Instruction::Load {
                result_type: pointee,
                result,
                pointer,
            },
        );
        result
    }

    /// The assignable target of a store: a named local behind a pointer.
    fn lower_target(&mut self, lhs: &'a Expr) -> Result<(Id, Id), LowerError> {
        match &lhs.kind {
            ExprKind::Paren(base) => self.lower_target(base),
            ExprKind::Identifier(_) => {
                let sym = self
                    .info
                    .symbol_of_identifier(lhs.id)
                    .expect("checked assignment target without a symbol");
                match self.bindings.get(&sym).copied() {
                    Some(Binding::Variable { var, pointee }) => Ok((var, pointee)),
                    _ => Err(LowerError::UnsupportedAssignTarget { range: lhs.range }),
                }
            }
            _ => Err(LowerError::UnsupportedAssignTarget { range: lhs.range }),
        }
    }
}

fn arith(props: TypeProperties, int_op: Opcode, float_op: Opcode) -> Opcode {
    if props.floating {
        float_op
    } else {
        int_op
    }
}

fn select_compare_opcode(op: TokenKind, props: TypeProperties) -> Opcode {
    let is_bool = !props.integral && !props.floating;
    match op {
        TokenKind::EqEq => {
            if is_bool {
                Opcode::LogicalEqual
            } else if props.floating {
                Opcode::FOrdEqual
            } else {
                Opcode::IEqual
            }
        }
        TokenKind::BangEq => {
            if is_bool {
                Opcode::LogicalNotEqual
            } else if props.floating {
                Opcode::FOrdNotEqual
            } else {
                Opcode::INotEqual
            }
        }
        TokenKind::Lt => {
            if props.floating {
                Opcode::FOrdLessThan
            } else if props.signed {
                Opcode::SLessThan
            } else {
                Opcode::ULessThan
            }
        }
        TokenKind::Gt => {
            if props.floating {
                Opcode::FOrdGreaterThan
            } else if props.signed {
                Opcode::SGreaterThan
            } else {
                Opcode::UGreaterThan
            }
        }
        TokenKind::LtEq => {
            if props.floating {
                Opcode::FOrdLessThanEqual
            } else if props.signed {
                Opcode::SLessThanEqual
            } else {
                Opcode::ULessThanEqual
            }
        }
        TokenKind::GtEq => {
            if props.floating {
                Opcode::FOrdGreaterThanEqual
            } else if props.signed {
                Opcode::SGreaterThanEqual
            } else {
                Opcode::UGreaterThanEqual
            }
        }
        _ => unreachable!("comparison opcode requested for {op:?}"),
    }
}
