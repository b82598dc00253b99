//! Address modes, typed values, and the per-unit semantic side tables.

use rustc_hash::FxHashMap;

use prism_frontend::{NodeId, TokenKind};

use crate::constant::{ConstError, ConstValue};
use crate::scope::{ScopeArena, ScopeId, SymbolId};
use crate::type_arena::{TypeArena, TypeId};

/// How an expression's value can be addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    Invalid,
    NoValue,
    Type,
    Constant,
    Variable,
    ComputedValue,
}

impl AddressMode {
    /// Combine the modes of two operands of an operator.
    pub fn combine(self, other: AddressMode) -> AddressMode {
        match self {
            AddressMode::Invalid | AddressMode::NoValue | AddressMode::Type => self,
            AddressMode::Constant => match other {
                AddressMode::Constant => AddressMode::Constant,
                AddressMode::Variable | AddressMode::ComputedValue => AddressMode::ComputedValue,
                _ => other,
            },
            AddressMode::Variable | AddressMode::ComputedValue => match other {
                AddressMode::Constant | AddressMode::Variable | AddressMode::ComputedValue => {
                    AddressMode::ComputedValue
                }
                _ => other,
            },
        }
    }
}

/// The checker's result for an expression or symbol: mode, type, and the
/// folded constant value when the mode is `Constant`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeAndValue {
    pub mode: AddressMode,
    pub ty: TypeId,
    pub value: Option<ConstValue>,
}

impl TypeAndValue {
    pub fn invalid() -> TypeAndValue {
        TypeAndValue {
            mode: AddressMode::Invalid,
            ty: TypeId::VOID,
            value: None,
        }
    }

    pub fn of_type(ty: TypeId) -> TypeAndValue {
        TypeAndValue {
            mode: AddressMode::Type,
            ty,
            value: None,
        }
    }

    pub fn constant(ty: TypeId, value: ConstValue) -> TypeAndValue {
        TypeAndValue {
            mode: AddressMode::Constant,
            ty,
            value: Some(value),
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(
            self.mode,
            AddressMode::Constant | AddressMode::Variable | AddressMode::ComputedValue
        )
    }

    pub fn is_assignable(&self) -> bool {
        self.mode == AddressMode::Variable
    }

    pub fn unary_op(&self, op: TokenKind) -> TypeAndValue {
        if self.mode == AddressMode::Constant {
            TypeAndValue {
                mode: AddressMode::Constant,
                ty: self.ty,
                value: self.value.map(|v| v.unary_op(op)),
            }
        } else {
            TypeAndValue {
                mode: AddressMode::ComputedValue,
                ty: self.ty,
                value: None,
            }
        }
    }

    pub fn binary_op_with_type(
        &self,
        op: TokenKind,
        rhs: &TypeAndValue,
        ty: TypeId,
    ) -> Result<TypeAndValue, ConstError> {
        let mode = self.mode.combine(rhs.mode);
        let value = if mode == AddressMode::Constant {
            match (self.value, rhs.value) {
                (Some(a), Some(b)) => Some(a.binary_op(op, b)?),
                _ => None,
            }
        } else {
            None
        };
        Ok(TypeAndValue { mode, ty, value })
    }

    pub fn compare_with_type(&self, op: TokenKind, rhs: &TypeAndValue, ty: TypeId) -> TypeAndValue {
        let mode = self.mode.combine(rhs.mode);
        let value = if mode == AddressMode::Constant {
            match (self.value, rhs.value) {
                (Some(a), Some(b)) => Some(a.compare(op, b)),
                _ => None,
            }
        } else {
            None
        };
        TypeAndValue { mode, ty, value }
    }

    pub fn shift_with_type(&self, op: TokenKind, rhs: &TypeAndValue, ty: TypeId) -> TypeAndValue {
        let mode = self.mode.combine(rhs.mode);
        let value = if mode == AddressMode::Constant {
            match (self.value, rhs.value.and_then(|v| v.as_int())) {
                (Some(a), Some(amount)) if amount >= 0 => Some(a.shift(op, amount as u32)),
                _ => None,
            }
        } else {
            None
        };
        TypeAndValue { mode, ty, value }
    }
}

/// Side tables produced by the checker, keyed by AST node id / symbol id.
pub struct SemanticInfo {
    pub types: TypeArena,
    pub scopes: ScopeArena,
    /// The file-level scope holding all global symbols.
    pub global_scope: ScopeId,
    type_of_node: FxHashMap<NodeId, TypeAndValue>,
    type_of_symbol: FxHashMap<SymbolId, TypeAndValue>,
    scope_of_node: FxHashMap<NodeId, ScopeId>,
    scope_of_symbol: FxHashMap<SymbolId, ScopeId>,
    symbol_of_identifier: FxHashMap<NodeId, SymbolId>,
    /// Globals in resolution-completion order; the lowering walks these.
    pub reachable_symbols: Vec<SymbolId>,
}

impl SemanticInfo {
    pub fn new() -> SemanticInfo {
        let mut scopes = ScopeArena::new();
        let global_scope = scopes.new_scope(None, "global");
        SemanticInfo {
            types: TypeArena::new(),
            scopes,
            global_scope,
            type_of_node: FxHashMap::default(),
            type_of_symbol: FxHashMap::default(),
            scope_of_node: FxHashMap::default(),
            scope_of_symbol: FxHashMap::default(),
            symbol_of_identifier: FxHashMap::default(),
            reachable_symbols: Vec::new(),
        }
    }

    pub fn set_type_of_node(&mut self, node: NodeId, tv: TypeAndValue) {
        self.type_of_node.insert(node, tv);
    }

    pub fn type_of_node(&self, node: NodeId) -> Option<TypeAndValue> {
        self.type_of_node.get(&node).copied()
    }

    pub fn set_type_of_symbol(&mut self, symbol: SymbolId, tv: TypeAndValue) {
        self.type_of_symbol.insert(symbol, tv);
    }

    pub fn type_of_symbol(&self, symbol: SymbolId) -> Option<TypeAndValue> {
        self.type_of_symbol.get(&symbol).copied()
    }

    /// The scope lazily created for an AST node (blocks, control flow,
    /// function bodies).
    pub fn scope_for_node(&mut self, node: NodeId, parent: ScopeId, name: &str) -> ScopeId {
        if let Some(&scope) = self.scope_of_node.get(&node) {
            return scope;
        }
        let scope = self.scopes.new_scope(Some(parent), name);
        self.scope_of_node.insert(node, scope);
        scope
    }

    pub fn scope_of_node(&self, node: NodeId) -> Option<ScopeId> {
        self.scope_of_node.get(&node).copied()
    }

    pub fn scope_for_symbol(&mut self, symbol: SymbolId, parent: ScopeId, name: &str) -> ScopeId {
        if let Some(&scope) = self.scope_of_symbol.get(&symbol) {
            return scope;
        }
        let scope = self.scopes.new_scope(Some(parent), name);
        self.scope_of_symbol.insert(symbol, scope);
        scope
    }

    pub fn scope_of_symbol(&self, symbol: SymbolId) -> Option<ScopeId> {
        self.scope_of_symbol.get(&symbol).copied()
    }

    pub fn set_symbol_of_identifier(&mut self, ident: NodeId, symbol: SymbolId) {
        self.symbol_of_identifier.insert(ident, symbol);
    }

    pub fn symbol_of_identifier(&self, ident: NodeId) -> Option<SymbolId> {
        self.symbol_of_identifier.get(&ident).copied()
    }
}

impl Default for SemanticInfo {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_combine_lattice() {
        use AddressMode::*;
        assert_eq!(Constant.combine(Constant), Constant);
        assert_eq!(Constant.combine(Variable), ComputedValue);
        assert_eq!(Variable.combine(Constant), ComputedValue);
        assert_eq!(Variable.combine(Variable), ComputedValue);
        assert_eq!(Invalid.combine(Constant), Invalid);
        assert_eq!(Constant.combine(Invalid), Invalid);
    }

    #[test]
    fn constant_binary_op_folds() {
        let a = TypeAndValue::constant(TypeId::INT, ConstValue::Int(2));
        let b = TypeAndValue::constant(TypeId::INT, ConstValue::Int(3));
        let r = a
            .binary_op_with_type(TokenKind::Star, &b, TypeId::INT)
            .unwrap();
        assert_eq!(r.mode, AddressMode::Constant);
        assert_eq!(r.value, Some(ConstValue::Int(6)));
    }

    #[test]
    fn non_constant_operand_degrades_to_computed() {
        let a = TypeAndValue::constant(TypeId::INT, ConstValue::Int(2));
        let b = TypeAndValue {
            mode: AddressMode::Variable,
            ty: TypeId::INT,
            value: None,
        };
        let r = a
            .binary_op_with_type(TokenKind::Plus, &b, TypeId::INT)
            .unwrap();
        assert_eq!(r.mode, AddressMode::ComputedValue);
        assert_eq!(r.value, None);
    }
}
