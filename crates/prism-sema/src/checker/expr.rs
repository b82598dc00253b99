//! Expression typing.

use prism_frontend::ast::*;
use prism_frontend::{SourceRange, Token, TokenKind};

use crate::constant::{ConstError, ConstValue};
use crate::errors::SemanticError;
use crate::scope::{ResolveState, Symbol, SymbolKind};
use crate::semantic_info::{AddressMode, TypeAndValue};
use crate::type_arena::{StructField, TypeId, TypeIdVec, TypeKind};

use super::Checker;

impl<'a> Checker<'a> {
    pub(crate) fn resolve_expr(&mut self, expr: &'a Expr) -> TypeAndValue {
        if let Some(tv) = self.info.type_of_node(expr.id) {
            return tv;
        }

        let tv = match &expr.kind {
            ExprKind::Literal(token) => self.resolve_literal(token),
            ExprKind::Identifier(token) => self.resolve_identifier(expr, token),
            ExprKind::Paren(base) => self.resolve_expr(base),
            ExprKind::Selector(sel) => self.resolve_selector(expr, sel),
            ExprKind::Unary(unary) => self.resolve_unary(unary),
            ExprKind::Binary(binary) => self.resolve_binary(expr, binary),
            ExprKind::Call(call) => self.resolve_call(expr, call),
            ExprKind::Index(_) => {
                self.error(SemanticError::IndexUnsupported { range: expr.range });
                TypeAndValue::invalid()
            }
            ExprKind::Complit(_) => {
                self.error(SemanticError::CompositeLiteralUnsupported { range: expr.range });
                TypeAndValue::invalid()
            }
            ExprKind::NamedType(named) => self.resolve_named_type(expr, named),
            ExprKind::ArrayType(array) => self.resolve_array_type(array),
            ExprKind::FuncType(func) => self.resolve_func_type(func),
            ExprKind::StructType(st) => self.resolve_struct_type(st),
        };

        self.info.set_type_of_node(expr.id, tv);
        tv
    }

    fn resolve_literal(&mut self, token: &Token) -> TypeAndValue {
        match token.kind {
            TokenKind::LiteralInt => match parse_int_literal(&token.text) {
                Some(value) => TypeAndValue::constant(TypeId::INT, ConstValue::Int(value)),
                None => {
                    self.error(SemanticError::InvalidIntLiteral { range: token.range });
                    TypeAndValue::invalid()
                }
            },
            TokenKind::LiteralFloat => match token.text.parse::<f64>() {
                Ok(value) => TypeAndValue::constant(TypeId::FLOAT32, ConstValue::Float(value)),
                Err(_) => {
                    self.error(SemanticError::InvalidFloatLiteral { range: token.range });
                    TypeAndValue::invalid()
                }
            },
            TokenKind::KwTrue => TypeAndValue::constant(TypeId::BOOL, ConstValue::Bool(true)),
            TokenKind::KwFalse => TypeAndValue::constant(TypeId::BOOL, ConstValue::Bool(false)),
            _ => TypeAndValue::invalid(),
        }
    }

    fn resolve_identifier(&mut self, expr: &Expr, token: &Token) -> TypeAndValue {
        let Some(symbol) = self.info.scopes.find(self.current_scope(), &token.text) else {
            self.error(SemanticError::UndeclaredIdentifier { range: expr.range });
            return TypeAndValue::invalid();
        };

        self.info.set_symbol_of_identifier(expr.id, symbol);
        self.resolve_symbol(symbol)
    }

    fn resolve_selector(&mut self, expr: &Expr, sel: &'a SelectorExpr) -> TypeAndValue {
        let base_tv = self.resolve_expr(&sel.base);
        if base_tv.mode == AddressMode::Invalid {
            return TypeAndValue::invalid();
        }
        let base_ty = self.info.types.resolve(base_tv.ty, true);

        match self.info.types.kind(base_ty) {
            TypeKind::Struct { .. } => {
                match self.info.types.find_struct_field(base_ty, &sel.selector.text) {
                    Some(field_ty) => TypeAndValue {
                        mode: base_tv.mode,
                        ty: field_ty,
                        value: None,
                    },
                    None => {
                        self.error(SemanticError::UnknownField {
                            name: sel.selector.text.clone(),
                            ty: self.info.types.display(base_tv.ty),
                            range: sel.selector.range,
                        });
                        TypeAndValue::invalid()
                    }
                }
            }
            TypeKind::Vector { component, width, .. } => {
                let (component, width) = (*component, *width as usize);
                self.resolve_swizzle(sel, base_ty, component, width)
            }
            _ => {
                self.error(SemanticError::InvalidSelectorBase {
                    ty: self.info.types.display(base_tv.ty),
                    range: expr.range,
                });
                TypeAndValue::invalid()
            }
        }
    }

    fn resolve_swizzle(
        &mut self,
        sel: &SelectorExpr,
        vector_ty: TypeId,
        component: TypeId,
        width: usize,
    ) -> TypeAndValue {
        let swizzle = &sel.selector.text;
        if !is_valid_swizzle(swizzle, width) {
            self.error(SemanticError::InvalidSwizzle {
                swizzle: swizzle.clone(),
                width,
                ty: self.info.types.display(vector_ty),
                range: sel.selector.range,
            });
            return TypeAndValue::invalid();
        }

        let ty = if swizzle.len() == 1 {
            component
        } else {
            self.info
                .types
                .vector_of(component, swizzle.len())
                .expect("swizzle length was validated against the style sets")
        };

        TypeAndValue {
            mode: AddressMode::ComputedValue,
            ty,
            value: None,
        }
    }

    fn resolve_unary(&mut self, unary: &'a UnaryExpr) -> TypeAndValue {
        let tv = self.resolve_expr(&unary.base);
        if tv.mode == AddressMode::Invalid {
            return TypeAndValue::invalid();
        }
        let props = self.info.types.properties(tv.ty);

        let ok = match unary.op.kind {
            TokenKind::Plus | TokenKind::Minus => self.require_capability(
                unary.base.range,
                tv.ty,
                props.has_arithmetic,
                "arithmetic operations",
            ),
            TokenKind::Bang => self.require_capability(
                unary.base.range,
                tv.ty,
                props.has_logic_ops,
                "logic operations",
            ),
            TokenKind::Caret => self.require_capability(
                unary.base.range,
                tv.ty,
                props.has_bit_ops,
                "bitwise operations",
            ),
            _ => unreachable!("unary expression with operator {:?}", unary.op.kind),
        };
        if !ok {
            return TypeAndValue::invalid();
        }

        tv.unary_op(unary.op.kind)
    }

    fn resolve_binary(&mut self, expr: &Expr, binary: &'a BinaryExpr) -> TypeAndValue {
        let lhs = self.resolve_expr(&binary.lhs);
        let rhs = self.resolve_expr(&binary.rhs);

        // An operand that already failed has produced its diagnostic.
        if lhs.mode == AddressMode::Invalid || rhs.mode == AddressMode::Invalid {
            return TypeAndValue::invalid();
        }

        let lhs_vec = self.vector_info(lhs.ty);
        let rhs_vec = self.vector_info(rhs.ty);
        let vec_width = lhs_vec.or(rhs_vec).map(|(_, w)| w).unwrap_or(1);

        let lhs_props = self.info.types.properties(lhs.ty);
        let rhs_props = self.info.types.properties(rhs.ty);

        let op = binary.op.kind;
        match op {
            TokenKind::Pipe | TokenKind::Amp | TokenKind::Caret | TokenKind::AmpCaret => {
                if self.check_operand_types(expr, lhs.ty, rhs.ty, lhs_vec, rhs_vec)
                    && self.require_capability(
                        binary.lhs.range,
                        lhs.ty,
                        lhs_props.has_bit_ops,
                        "bitwise operations",
                    )
                    && self.require_capability(
                        binary.rhs.range,
                        rhs.ty,
                        rhs_props.has_bit_ops,
                        "bitwise operations",
                    )
                {
                    self.fold_binary(&lhs, op, &rhs, lhs.ty, binary.rhs.range)
                } else {
                    TypeAndValue::invalid()
                }
            }
            TokenKind::Plus | TokenKind::Minus | TokenKind::Star | TokenKind::Slash => {
                if self.check_operand_types(expr, lhs.ty, rhs.ty, lhs_vec, rhs_vec)
                    && self.require_capability(
                        binary.lhs.range,
                        lhs.ty,
                        lhs_props.has_arithmetic,
                        "arithmetic operations",
                    )
                    && self.require_capability(
                        binary.rhs.range,
                        rhs.ty,
                        rhs_props.has_arithmetic,
                        "arithmetic operations",
                    )
                {
                    self.fold_binary(&lhs, op, &rhs, lhs.ty, binary.rhs.range)
                } else {
                    TypeAndValue::invalid()
                }
            }
            TokenKind::Percent => {
                if self.check_operand_types(expr, lhs.ty, rhs.ty, lhs_vec, rhs_vec)
                    && self.require_capability(
                        binary.lhs.range,
                        lhs.ty,
                        lhs_props.has_modulus,
                        "modulus operations",
                    )
                    && self.require_capability(
                        binary.rhs.range,
                        rhs.ty,
                        rhs_props.has_modulus,
                        "modulus operations",
                    )
                {
                    self.fold_binary(&lhs, op, &rhs, lhs.ty, binary.rhs.range)
                } else {
                    TypeAndValue::invalid()
                }
            }
            TokenKind::PipePipe | TokenKind::AmpAmp => {
                if self.check_operand_types(expr, lhs.ty, rhs.ty, lhs_vec, rhs_vec)
                    && self.require_capability(
                        binary.lhs.range,
                        lhs.ty,
                        lhs_props.has_logic_ops,
                        "logic operations",
                    )
                    && self.require_capability(
                        binary.rhs.range,
                        rhs.ty,
                        rhs_props.has_logic_ops,
                        "logic operations",
                    )
                {
                    self.fold_binary(&lhs, op, &rhs, lhs.ty, binary.rhs.range)
                } else {
                    TypeAndValue::invalid()
                }
            }
            TokenKind::Lt | TokenKind::Gt | TokenKind::LtEq | TokenKind::GtEq => {
                if self.check_operand_types(expr, lhs.ty, rhs.ty, lhs_vec, rhs_vec)
                    && self.require_capability(
                        binary.lhs.range,
                        lhs.ty,
                        lhs_props.has_compare,
                        "compare operations",
                    )
                    && self.require_capability(
                        binary.rhs.range,
                        rhs.ty,
                        rhs_props.has_compare,
                        "compare operations",
                    )
                {
                    let result = self.info.types.bool_by_width(vec_width);
                    lhs.compare_with_type(op, &rhs, result)
                } else {
                    TypeAndValue::invalid()
                }
            }
            TokenKind::EqEq | TokenKind::BangEq => {
                if self.check_operand_types(expr, lhs.ty, rhs.ty, lhs_vec, rhs_vec)
                    && self.require_capability(
                        binary.lhs.range,
                        lhs.ty,
                        lhs_props.has_equality,
                        "equality operations",
                    )
                    && self.require_capability(
                        binary.rhs.range,
                        rhs.ty,
                        rhs_props.has_equality,
                        "equality operations",
                    )
                {
                    let result = self.info.types.bool_by_width(vec_width);
                    lhs.compare_with_type(op, &rhs, result)
                } else {
                    TypeAndValue::invalid()
                }
            }
            TokenKind::LessLess | TokenKind::GreaterGreater => {
                if !rhs_props.integral {
                    self.error(SemanticError::ShiftNeedsIntegral {
                        ty: self.info.types.display(rhs.ty),
                        range: binary.rhs.range,
                    });
                    return TypeAndValue::invalid();
                }

                if rhs.mode == AddressMode::Constant {
                    if let Some(v) = rhs.value.and_then(|v| v.as_int()) {
                        if v < 0 {
                            self.error(SemanticError::ShiftNegative {
                                value: ConstValue::Int(v).to_string(),
                                range: binary.rhs.range,
                            });
                            return TypeAndValue::invalid();
                        }
                    }
                }

                if self.require_capability(
                    binary.lhs.range,
                    lhs.ty,
                    lhs_props.has_bit_ops,
                    "bitwise operations",
                ) {
                    lhs.shift_with_type(op, &rhs, lhs.ty)
                } else {
                    TypeAndValue::invalid()
                }
            }
            _ => unreachable!("binary expression with operator {op:?}"),
        }
    }

    fn fold_binary(
        &mut self,
        lhs: &TypeAndValue,
        op: TokenKind,
        rhs: &TypeAndValue,
        ty: TypeId,
        rhs_range: SourceRange,
    ) -> TypeAndValue {
        match lhs.binary_op_with_type(op, rhs, ty) {
            Ok(tv) => tv,
            Err(ConstError::DivisionByZero) => {
                self.error(SemanticError::ConstDivisionByZero { range: rhs_range });
                TypeAndValue::invalid()
            }
        }
    }

    fn vector_info(&self, ty: TypeId) -> Option<(TypeId, usize)> {
        let resolved = self.info.types.resolve(ty, true);
        match self.info.types.kind(resolved) {
            TypeKind::Vector { component, width, .. } => Some((*component, *width as usize)),
            _ => None,
        }
    }

    /// Operand compatibility for a binary operator: same type, or a
    /// scalar mixed with a vector of that scalar.
    fn check_operand_types(
        &mut self,
        expr: &Expr,
        lhs: TypeId,
        rhs: TypeId,
        lhs_vec: Option<(TypeId, usize)>,
        rhs_vec: Option<(TypeId, usize)>,
    ) -> bool {
        let compatible = match (lhs_vec, rhs_vec) {
            (Some(_), Some(_)) => self.info.types.equal(lhs, rhs),
            (Some((component, _)), None) => self.info.types.equal(component, rhs),
            (None, Some((component, _))) => self.info.types.equal(lhs, component),
            (None, None) => self.info.types.equal(lhs, rhs),
        };
        if !compatible {
            self.error(SemanticError::BinaryTypeMismatch {
                lhs: self.info.types.display(lhs),
                rhs: self.info.types.display(rhs),
                range: expr.range,
            });
            return false;
        }
        true
    }

    pub(crate) fn require_capability(
        &mut self,
        range: SourceRange,
        ty: TypeId,
        has: bool,
        capability: &'static str,
    ) -> bool {
        if !has {
            self.error(SemanticError::MissingCapability {
                ty: self.info.types.display(ty),
                capability,
                range,
            });
            return false;
        }
        true
    }

    fn resolve_call(&mut self, expr: &Expr, call: &'a CallExpr) -> TypeAndValue {
        let base = self.resolve_expr(&call.base);
        if base.mode == AddressMode::Invalid {
            return TypeAndValue::invalid();
        }

        let TypeKind::Func { params, returns } = self.info.types.kind(base.ty) else {
            self.error(SemanticError::CalleeNotFunction {
                ty: self.info.types.display(base.ty),
                range: expr.range,
            });
            return TypeAndValue::invalid();
        };
        let params: TypeIdVec = params.clone();
        let returns: TypeIdVec = returns.clone();

        let (args, ranges) = self.resolve_and_unpack(&call.args);
        if args.len() != params.len() {
            let arg_types: Vec<TypeId> = args.iter().map(|a| a.ty).collect();
            self.error(SemanticError::ArgumentCountMismatch {
                wanted: params.len(),
                got: call.args.len(),
                have: self.tuple_display(&arg_types),
                want: self.tuple_display(&params),
                range: expr.range,
            });
            return TypeAndValue::invalid();
        }

        for (i, arg) in args.iter().enumerate() {
            if arg.mode == AddressMode::Invalid {
                continue;
            }
            if !self.info.types.equal(arg.ty, params[i]) {
                self.error(SemanticError::ArgumentTypeMismatch {
                    found: self.info.types.display(arg.ty),
                    expected: self.info.types.display(params[i]),
                    range: ranges[i],
                });
                return TypeAndValue::invalid();
            }
        }

        let ty = match returns.len() {
            0 => TypeId::VOID,
            1 => returns[0],
            _ => self.info.types.intern_tuple(returns),
        };
        TypeAndValue {
            mode: AddressMode::ComputedValue,
            ty,
            value: None,
        }
    }

    fn resolve_named_type(&mut self, expr: &Expr, named: &NamedTypeExpr) -> TypeAndValue {
        if named.package.is_some() {
            self.error(SemanticError::PackagesUnsupported { range: expr.range });
            return TypeAndValue::invalid();
        }

        if let Some(symbol) = self.info.scopes.find(self.current_scope(), &named.name.text) {
            return self.resolve_symbol(symbol);
        }

        let ty = self
            .info
            .types
            .builtin_by_name(&named.name.text)
            .unwrap_or(TypeId::VOID);
        TypeAndValue::of_type(ty)
    }

    fn resolve_array_type(&mut self, array: &'a ArrayTypeExpr) -> TypeAndValue {
        let elem = self.resolve_expr(&array.elem);

        let mut length: i64 = 0;
        if let Some(length_expr) = &array.length {
            let length_tv = self.resolve_expr(length_expr);
            if length_tv.mode != AddressMode::Constant {
                self.error(SemanticError::ArrayLengthNotConstant {
                    range: length_expr.range,
                });
                return TypeAndValue::of_type(TypeId::VOID);
            }
            match length_tv.value {
                Some(ConstValue::Int(v)) => length = v,
                Some(_) => {
                    self.error(SemanticError::ArrayLengthNotInteger {
                        range: length_expr.range,
                    });
                    return TypeAndValue::of_type(TypeId::VOID);
                }
                None => {}
            }
        }

        let ty = self.info.types.intern_array(length, elem.ty);
        TypeAndValue::of_type(ty)
    }

    /// Resolve a function type expression, introducing named parameters and
    /// named results as variable symbols in the current (function) scope.
    pub(crate) fn resolve_func_type(&mut self, func: &'a FuncTypeExpr) -> TypeAndValue {
        let params = self.resolve_field_types(&func.params);
        let returns = match &func.result {
            Some(result) => self.resolve_field_types(result),
            None => TypeIdVec::new(),
        };

        let ty = self.info.types.intern_func(params, returns);
        TypeAndValue::of_type(ty)
    }

    fn resolve_field_types(&mut self, list: &'a FieldList) -> TypeIdVec {
        let mut types = TypeIdVec::new();
        for field in &list.fields {
            let field_tv = self.resolve_expr(&field.ty);
            if field.names.is_empty() {
                types.push(field_tv.ty);
                continue;
            }
            for name in &field.names {
                let mut sym = Symbol::new(
                    name.name(),
                    None,
                    name.range(),
                    SymbolKind::Var {
                        spec_index: None,
                        expr_index: None,
                        init: None,
                    },
                );
                sym.state = ResolveState::Resolved;
                let sym_id = self.add_symbol(sym);
                self.info.set_type_of_symbol(sym_id, field_tv);
                self.info.set_symbol_of_identifier(name.id, sym_id);
                types.push(field_tv.ty);
            }
        }
        types
    }

    fn resolve_struct_type(&mut self, st: &'a StructTypeExpr) -> TypeAndValue {
        let mut fields: Vec<StructField> = Vec::new();
        let mut seen: Vec<(String, SourceRange)> = Vec::new();

        let mut check_duplicate =
            |checker: &mut Self, name: &str, range: SourceRange, seen: &mut Vec<(String, SourceRange)>| {
                if let Some((_, first)) = seen.iter().find(|(n, _)| n == name) {
                    checker.error(SemanticError::FieldRedefinition {
                        name: name.to_string(),
                        range,
                        first: *first,
                    });
                    return true;
                }
                seen.push((name.to_string(), range));
                false
            };

        for field in &st.fields.fields {
            if !field.names.is_empty() {
                for name in &field.names {
                    if check_duplicate(self, name.name(), name.range(), &mut seen) {
                        return TypeAndValue::of_type(TypeId::VOID);
                    }
                    let ty = self.resolve_expr(&field.ty).ty;
                    fields.push(StructField {
                        name: name.name().to_string(),
                        embedded: false,
                        ty,
                    });
                }
                continue;
            }

            let field_tv = self.resolve_expr(&field.ty);
            let alias_name = match self.info.types.kind(field_tv.ty) {
                TypeKind::StrongAlias { name, .. } | TypeKind::WeakAlias { name, .. } => {
                    Some(name.clone())
                }
                _ => None,
            };
            match alias_name {
                Some(name) => {
                    if check_duplicate(self, &name, field.ty.range, &mut seen) {
                        return TypeAndValue::of_type(TypeId::VOID);
                    }
                    fields.push(StructField {
                        name,
                        embedded: true,
                        ty: field_tv.ty,
                    });
                }
                None => {
                    self.error(SemanticError::InvalidEmbeddedType {
                        ty: self.info.types.display(field_tv.ty),
                        range: field.ty.range,
                    });
                }
            }
        }

        let ty = self.info.types.intern_struct(fields);
        TypeAndValue::of_type(ty)
    }
}

/// Parse an integer literal with the `0x`/`0b`/`0o` radix prefixes.
fn parse_int_literal(text: &str) -> Option<i64> {
    let (digits, radix) = match text.as_bytes() {
        [b'0', b'x' | b'X', rest @ ..] if !rest.is_empty() => (&text[2..], 16),
        [b'0', b'b' | b'B', rest @ ..] if !rest.is_empty() => (&text[2..], 2),
        [b'0', b'o' | b'O', rest @ ..] if !rest.is_empty() => (&text[2..], 8),
        _ => (text, 10),
    };
    i64::from_str_radix(digits, radix).ok()
}

/// A swizzle draws 1..4 characters from a single style set, each naming a
/// component below the vector's width.
fn is_valid_swizzle(swizzle: &str, width: usize) -> bool {
    if swizzle.is_empty() || swizzle.len() > 4 {
        return false;
    }

    let style_of = |c: char| -> Option<&'static str> {
        match c {
            'x' | 'y' | 'z' | 'w' => Some("xyzw"),
            'r' | 'g' | 'b' | 'a' => Some("rgba"),
            's' | 't' | 'q' | 'p' => Some("stqp"),
            _ => None,
        }
    };

    let first = swizzle.chars().next().expect("swizzle is non-empty");
    let Some(style) = style_of(first) else {
        return false;
    };

    swizzle
        .chars()
        .all(|c| style[..width].contains(c))
}

#[cfg(test)]
mod tests {
    use super::{is_valid_swizzle, parse_int_literal};

    #[test]
    fn int_literal_radixes() {
        assert_eq!(parse_int_literal("0"), Some(0));
        assert_eq!(parse_int_literal("123"), Some(123));
        assert_eq!(parse_int_literal("0x1F"), Some(31));
        assert_eq!(parse_int_literal("0b1010"), Some(10));
        assert_eq!(parse_int_literal("0o755"), Some(493));
        assert_eq!(parse_int_literal("99999999999999999999"), None);
    }

    #[test]
    fn swizzle_validation() {
        assert!(is_valid_swizzle("xy", 4));
        assert!(is_valid_swizzle("wzyx", 4));
        assert!(is_valid_swizzle("rgba", 4));
        assert!(is_valid_swizzle("st", 2));
        // Style sets cannot be mixed.
        assert!(!is_valid_swizzle("xg", 4));
        // Components past the width are invalid.
        assert!(!is_valid_swizzle("z", 2));
        assert!(!is_valid_swizzle("", 4));
        assert!(!is_valid_swizzle("xyzxy", 4));
    }
}
