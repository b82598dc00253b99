//! Symbols and lexical scopes.
//!
//! Both live in id-indexed arenas; scopes keep their symbols in insertion
//! order next to a name table, so everything that iterates symbols is
//! deterministic.

use rustc_hash::FxHashMap;

use prism_frontend::{NodeId, SourceRange};

use crate::semantic_info::TypeAndValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(u32);

impl SymbolId {
    pub fn index(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

/// The resolution state machine: `Resolving` marks a symbol whose resolution
/// is in progress, which is how cycles are detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveState {
    Unresolved,
    Resolving,
    Resolved,
}

#[derive(Debug, Clone)]
pub enum SymbolKind {
    Func,
    Var {
        /// Indices into the declaring `GenericDecl`'s specs and the spec's
        /// name list; absent for `:=` and parameter variables.
        spec_index: Option<usize>,
        expr_index: Option<usize>,
        /// The initialiser's checked value for `:=` declarations.
        init: Option<TypeAndValue>,
    },
    Const {
        spec_index: usize,
        expr_index: usize,
    },
    Type {
        /// Index of the `TypeSpec` in the declaring `GenericDecl`.
        spec_index: usize,
        strong: bool,
    },
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub scope: Option<ScopeId>,
    pub name: String,
    /// The declaring AST node, when there is one.
    pub decl: Option<NodeId>,
    pub range: SourceRange,
    pub state: ResolveState,
    pub kind: SymbolKind,
}

impl Symbol {
    pub fn new(
        name: impl Into<String>,
        decl: Option<NodeId>,
        range: SourceRange,
        kind: SymbolKind,
    ) -> Symbol {
        Symbol {
            scope: None,
            name: name.into(),
            decl,
            range,
            state: ResolveState::Unresolved,
            kind,
        }
    }
}

#[derive(Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub name: String,
    pub symbols: Vec<SymbolId>,
    table: FxHashMap<String, usize>,
}

/// Arena holding every scope and symbol of a compilation unit.
#[derive(Debug, Default)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
}

impl ScopeArena {
    pub fn new() -> ScopeArena {
        ScopeArena::default()
    }

    pub fn new_scope(&mut self, parent: Option<ScopeId>, name: &str) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent,
            name: name.to_string(),
            symbols: Vec::new(),
            table: FxHashMap::default(),
        });
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    /// Add a symbol to a scope. Fails with the existing symbol's id when the
    /// name is already bound in this scope.
    pub fn add_symbol(&mut self, scope_id: ScopeId, mut symbol: Symbol) -> Result<SymbolId, SymbolId> {
        if let Some(existing) = self.shallow_find(scope_id, &symbol.name) {
            return Err(existing);
        }
        symbol.scope = Some(scope_id);
        let id = SymbolId(self.symbols.len() as u32);
        let name = symbol.name.clone();
        self.symbols.push(symbol);
        let scope = &mut self.scopes[scope_id.0 as usize];
        scope.table.insert(name, scope.symbols.len());
        scope.symbols.push(id);
        Ok(id)
    }

    /// Look a name up in a single scope.
    pub fn shallow_find(&self, scope_id: ScopeId, name: &str) -> Option<SymbolId> {
        let scope = self.scope(scope_id);
        scope.table.get(name).map(|&index| scope.symbols[index])
    }

    /// Look a name up through the scope's parent chain.
    pub fn find(&self, scope_id: ScopeId, name: &str) -> Option<SymbolId> {
        let mut current = Some(scope_id);
        while let Some(scope) = current {
            if let Some(symbol) = self.shallow_find(scope, name) {
                return Some(symbol);
            }
            current = self.scope(scope).parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(name: &str) -> Symbol {
        Symbol::new(name, None, SourceRange::default(), SymbolKind::Func)
    }

    #[test]
    fn add_and_find() {
        let mut arena = ScopeArena::new();
        let global = arena.new_scope(None, "global");
        let id = arena.add_symbol(global, symbol("f")).unwrap();
        assert_eq!(arena.shallow_find(global, "f"), Some(id));
        assert_eq!(arena.find(global, "f"), Some(id));
        assert_eq!(arena.find(global, "missing"), None);
    }

    #[test]
    fn redefinition_returns_the_existing_symbol() {
        let mut arena = ScopeArena::new();
        let global = arena.new_scope(None, "global");
        let first = arena.add_symbol(global, symbol("f")).unwrap();
        assert_eq!(arena.add_symbol(global, symbol("f")), Err(first));
    }

    #[test]
    fn find_walks_parent_scopes_and_allows_shadowing() {
        let mut arena = ScopeArena::new();
        let global = arena.new_scope(None, "global");
        let inner = arena.new_scope(Some(global), "block");
        let outer_sym = arena.add_symbol(global, symbol("x")).unwrap();
        assert_eq!(arena.find(inner, "x"), Some(outer_sym));

        let inner_sym = arena.add_symbol(inner, symbol("x")).unwrap();
        assert_eq!(arena.find(inner, "x"), Some(inner_sym));
        assert_eq!(arena.find(global, "x"), Some(outer_sym));
    }

    #[test]
    fn symbols_keep_insertion_order() {
        let mut arena = ScopeArena::new();
        let global = arena.new_scope(None, "global");
        for name in ["a", "b", "c"] {
            arena.add_symbol(global, symbol(name)).unwrap();
        }
        let names: Vec<_> = arena
            .scope(global)
            .symbols
            .iter()
            .map(|&id| arena.symbol(id).name.clone())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
