//! Symbol and scope model (§3).
//!
//! Scopes and symbols live in flat, index-addressed tables rather than a
//! pointer graph: per §9's design note, class parent links "resolve
//! naturally as indices into the global scope's name map", and nothing in
//! this crate needs the symbol graph to outlive a single compilation. Both
//! tables are filled in by Naming and then mutated (never structurally,
//! only in place) by Typing, per the single-writer discipline in §5.

use crate::position::Position;
use crate::types::{ClassAncestry, Type};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeKind {
    Global,
    Class,
    Formal,
    Local,
    Lambda,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    /// Static lexical parent, for lookups outside a running pass (§9).
    pub parent: Option<ScopeId>,
    /// Class scope -> its class symbol, formal scope -> its method symbol,
    /// lambda scope -> its lambda symbol. `None` for global/local scopes.
    pub owner: Option<SymbolId>,
    pub names: HashMap<String, SymbolId>,
}

impl Scope {
    fn new(id: ScopeId, kind: ScopeKind, parent: Option<ScopeId>, owner: Option<SymbolId>) -> Self {
        Self { id, kind, parent, owner, names: HashMap::new() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SymbolKind {
    Variable {
        ty: Type,
        is_parameter: bool,
        is_member: bool,
        is_local: bool,
    },
    Method {
        signature: Type,
        formal_scope: ScopeId,
        owner_class: SymbolId,
        is_static: bool,
        is_abstract: bool,
        /// Set once this method is confirmed to override an ancestor method.
        overrides: Option<SymbolId>,
    },
    Class {
        ty: Type,
        scope: ScopeId,
        parent: Option<SymbolId>,
        is_abstract: bool,
        is_main: bool,
    },
    Lambda {
        /// Synthesized `"lambda@<pos>"` per §3.
        synthetic_name: String,
        scope: ScopeId,
        signature: Type,
        return_types: Vec<Type>,
        captured: Vec<SymbolId>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub defining_scope: ScopeId,
    pub position: Position,
    pub kind: SymbolKind,
}

impl Symbol {
    pub fn type_of(&self) -> Type {
        match &self.kind {
            SymbolKind::Variable { ty, .. } => ty.clone(),
            SymbolKind::Method { signature, .. } => signature.clone(),
            SymbolKind::Class { ty, .. } => ty.clone(),
            SymbolKind::Lambda { signature, .. } => signature.clone(),
        }
    }

    pub fn is_method(&self) -> bool {
        matches!(self.kind, SymbolKind::Method { .. })
    }

    pub fn is_class(&self) -> bool {
        matches!(self.kind, SymbolKind::Class { .. })
    }

    pub fn is_lambda(&self) -> bool {
        matches!(self.kind, SymbolKind::Lambda { .. })
    }
}

/// The scope forest: every scope and symbol created during Naming, addressed
/// by index. Typing borrows this mutably to refine lambda signatures and
/// record captures; it never adds or removes scopes/symbols.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
    global: Option<ScopeId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = Self::default();
        let global = table.new_scope(ScopeKind::Global, None, None);
        table.global = Some(global);
        table
    }

    pub fn global_scope(&self) -> ScopeId {
        self.global.expect("global scope always created in SymbolTable::new")
    }

    pub fn new_scope(&mut self, kind: ScopeKind, parent: Option<ScopeId>, owner: Option<SymbolId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(id, kind, parent, owner));
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0 as usize]
    }

    /// Declares `name` in `scope`, failing (returning the prior symbol) if
    /// the scope already has a binding for it — scopes hold a set of names,
    /// never a multimap (§3 invariant).
    pub fn declare(&mut self, scope: ScopeId, name: &str, position: Position, kind: SymbolKind) -> Result<SymbolId, SymbolId> {
        if let Some(&existing) = self.scope(scope).names.get(name) {
            return Err(existing);
        }
        Ok(self.declare_always(scope, name, position, kind))
    }

    /// Always creates a fresh symbol, only making it reachable by name if
    /// the scope doesn't already bind `name`. Naming uses this for
    /// fields/methods, where a name collision is a semantic error handled
    /// explicitly (override checking, `DeclConflict`) rather than a hard
    /// failure — the conflicting symbol still needs an id so its AST node
    /// can be annotated and its body still walked for further diagnostics.
    pub fn declare_always(&mut self, scope: ScopeId, name: &str, position: Position, kind: SymbolKind) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol { id, name: name.to_string(), defining_scope: scope, position, kind });
        self.scope_mut(scope).names.entry(name.to_string()).or_insert(id);
        id
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    pub fn lookup_in(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        self.scope(scope).names.get(name).copied()
    }

    /// Walks the static parent chain, used by [`crate::types::ClassAncestry`]
    /// impls and anywhere a lookup is needed outside a running pass.
    pub fn lexical_lookup(&self, mut scope: ScopeId, name: &str) -> Option<SymbolId> {
        loop {
            if let Some(id) = self.lookup_in(scope, name) {
                return Some(id);
            }
            match self.scope(scope).parent {
                Some(p) => scope = p,
                None => return None,
            }
        }
    }

    /// True if `scope` is `ancestor` or nested (transitively) under it via
    /// the static parent chain. Used by capture analysis to tell whether a
    /// symbol is defined inside a given lambda's own scope subtree.
    pub fn scope_is_within(&self, mut scope: ScopeId, ancestor: ScopeId) -> bool {
        loop {
            if scope == ancestor {
                return true;
            }
            match self.scope(scope).parent {
                Some(p) => scope = p,
                None => return false,
            }
        }
    }

    pub fn classes(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.symbols.iter().filter(|s| s.is_class()).map(|s| s.id)
    }

    /// Looks a class up by name in the global scope, where every class is
    /// declared.
    pub fn class_named(&self, name: &str) -> Option<SymbolId> {
        self.lookup_in(self.global_scope(), name)
    }

    fn class_parent_name(&self, name: &str) -> Option<String> {
        let id = self.class_named(name)?;
        match &self.symbol(id).kind {
            SymbolKind::Class { parent: Some(p), .. } => Some(self.symbol(*p).name.clone()),
            _ => None,
        }
    }
}

impl ClassAncestry for SymbolTable {
    fn is_ancestor(&self, ancestor: &str, class: &str) -> bool {
        let mut cur = class.to_string();
        loop {
            if cur == ancestor {
                return true;
            }
            match self.class_parent_name(&cur) {
                Some(p) => cur = p,
                None => return false,
            }
        }
    }

    fn parent_of(&self, class: &str) -> Option<String> {
        self.class_parent_name(class)
    }
}
