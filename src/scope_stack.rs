//! The scope stack (§4.2): the transient, live evaluation context both
//! passes walk the AST under. Distinct from the static parent pointers
//! stored on [`crate::symbols::Scope`] (used for lookups outside a running
//! pass); the two are meant to agree, never be maintained independently
//! (§9's design note).

use crate::position::Position;
use crate::symbols::{ScopeId, ScopeKind, SymbolId, SymbolKind, SymbolTable};
use std::collections::HashMap;

pub struct ScopeStack {
    /// Currently open scopes, innermost last. The global scope is never
    /// pushed here; it sits conceptually beneath everything (§3 invariant).
    stack: Vec<ScopeId>,
    global: ScopeId,
    /// One entry per open `open_class` call: the class symbol and how many
    /// scope frames that call pushed (itself plus however much of its
    /// ancestor chain wasn't already open), so `close_class` pops exactly
    /// that many.
    class_frames: Vec<(SymbolId, usize)>,
    method_stack: Vec<SymbolId>,
    /// Every lambda currently open, innermost last.
    lambda_stack: Vec<SymbolId>,
    loop_depth: u32,
    /// Guards a `var` initializer against referencing its own name: while a
    /// name is in this map, lookups treat it as undeclared even if an outer
    /// scope would otherwise make it visible.
    defining: HashMap<String, Position>,
}

impl ScopeStack {
    pub fn new(global: ScopeId) -> Self {
        Self {
            stack: Vec::new(),
            global,
            class_frames: Vec::new(),
            method_stack: Vec::new(),
            lambda_stack: Vec::new(),
            loop_depth: 0,
            defining: HashMap::new(),
        }
    }

    // -- open/close ---------------------------------------------------

    /// Opens a class scope, implicitly opening its (not-yet-open) ancestor
    /// chain first, per §4.2.
    pub fn open_class(&mut self, table: &SymbolTable, class: SymbolId) {
        let pushed = self.push_class_chain(table, class);
        self.class_frames.push((class, pushed));
    }

    fn push_class_chain(&mut self, table: &SymbolTable, class: SymbolId) -> usize {
        let (scope, parent) = match &table.symbol(class).kind {
            SymbolKind::Class { scope, parent, .. } => (*scope, *parent),
            _ => panic!("open_class called on a non-class symbol"),
        };
        if self.stack.contains(&scope) {
            return 0;
        }
        let mut pushed = 0;
        if let Some(p) = parent {
            pushed += self.push_class_chain(table, p);
        }
        self.stack.push(scope);
        pushed + 1
    }

    /// Pops every scope frame opened by the matching `open_class`: the
    /// class's own scope plus whatever ancestor chain it opened.
    pub fn close_class(&mut self) {
        let (_, pushed) = self.class_frames.pop().expect("close_class without open_class");
        for _ in 0..pushed {
            self.stack.pop();
        }
    }

    pub fn open_formal(&mut self, scope: ScopeId, method: SymbolId) {
        self.stack.push(scope);
        self.method_stack.push(method);
    }

    pub fn close_formal(&mut self) {
        self.stack.pop();
        self.method_stack.pop();
    }

    pub fn open_local(&mut self, scope: ScopeId) {
        self.stack.push(scope);
    }

    pub fn close_local(&mut self) {
        self.stack.pop();
    }

    pub fn open_lambda(&mut self, scope: ScopeId, lambda: SymbolId) {
        self.stack.push(scope);
        self.lambda_stack.push(lambda);
    }

    /// Closes a lambda scope and, per §4.2/§4.6, hands its filtered captured
    /// set to the now-enclosing lambda (if any): any symbol not defined
    /// within that enclosing lambda's own scope subtree is added to it too,
    /// so a variable captured three lambdas deep is visible in every
    /// intermediate lambda's capture set.
    pub fn close_lambda(&mut self, table: &mut SymbolTable) {
        self.stack.pop();
        let closing = self.lambda_stack.pop().expect("close_lambda without open_lambda");
        if let Some(&parent_lambda) = self.lambda_stack.last() {
            let parent_scope = lambda_scope(table, parent_lambda);
            let captured = lambda_captured(table, closing);
            for sym in captured {
                let defining_scope = table.symbol(sym).defining_scope;
                if !table.scope_is_within(defining_scope, parent_scope) {
                    self.add_capture(table, parent_lambda, sym);
                }
            }
        }
    }

    pub fn enter_loop(&mut self) {
        self.loop_depth += 1;
    }

    pub fn exit_loop(&mut self) {
        self.loop_depth -= 1;
    }

    pub fn in_loop(&self) -> bool {
        self.loop_depth > 0
    }

    // -- lookups --------------------------------------------------------

    /// Innermost-first scan, falling through to the global scope.
    pub fn lookup(&self, table: &SymbolTable, name: &str) -> Option<SymbolId> {
        for &scope in self.stack.iter().rev() {
            if let Some(id) = table.lookup_in(scope, name) {
                return Some(id);
            }
        }
        table.lookup_in(self.global, name)
    }

    /// As [`Self::lookup`], but: (a) a name currently in the `defining`
    /// window is treated as not found at all, even if an outer scope would
    /// otherwise resolve it — this is what makes `var x = x;` report `x` as
    /// undeclared instead of silently finding an outer `x`; (b) within a
    /// local scope, a candidate whose own defining position is not strictly
    /// before `pos` is skipped (not rejected outright — the scan continues
    /// outward, since an enclosing scope may still declare the name validly
    /// beforehand).
    pub fn lookup_before(&self, table: &SymbolTable, name: &str, pos: &Position) -> Option<SymbolId> {
        if self.defining.contains_key(name) {
            return None;
        }
        for &scope in self.stack.iter().rev() {
            if let Some(id) = table.lookup_in(scope, name) {
                if table.scope(scope).kind == ScopeKind::Local && &table.symbol(id).position >= pos {
                    continue;
                }
                return Some(id);
            }
        }
        table.lookup_in(self.global, name)
    }

    /// Conflict check for a new declaration (§4.2): inside a
    /// formal/local/lambda scope, only that contiguous inward run plus the
    /// global scope can conflict (override checks against a parent *class*
    /// scope are handled explicitly in Naming, not here); otherwise this is
    /// the same as [`Self::lookup`].
    pub fn find_conflict(&self, table: &SymbolTable, name: &str) -> Option<SymbolId> {
        match self.stack.last().map(|&s| table.scope(s).kind) {
            Some(ScopeKind::Formal) | Some(ScopeKind::Local) | Some(ScopeKind::Lambda) => {
                for &scope in self.stack.iter().rev() {
                    match table.scope(scope).kind {
                        ScopeKind::Formal | ScopeKind::Local | ScopeKind::Lambda => {
                            if let Some(id) = table.lookup_in(scope, name) {
                                return Some(id);
                            }
                        }
                        _ => break,
                    }
                }
                table.lookup_in(self.global, name)
            }
            _ => self.lookup(table, name),
        }
    }

    pub fn current_class(&self) -> Option<SymbolId> {
        self.class_frames.last().map(|(c, _)| *c)
    }

    pub fn current_method(&self) -> Option<SymbolId> {
        self.method_stack.last().copied()
    }

    pub fn current_lambda(&self) -> Option<SymbolId> {
        self.lambda_stack.last().copied()
    }

    pub fn is_in_lambda(&self) -> bool {
        !self.lambda_stack.is_empty()
    }

    pub fn top_scope(&self) -> Option<ScopeId> {
        self.stack.last().copied()
    }

    // -- the `defining` self-reference guard -----------------------------

    pub fn begin_defining(&mut self, name: String, pos: Position) {
        self.defining.insert(name, pos);
    }

    pub fn end_defining(&mut self, name: &str) {
        self.defining.remove(name);
    }

    // -- capture analysis (§4.6) ------------------------------------------

    /// Records that `symbol` was resolved while at least one lambda is
    /// active: it is added to the innermost open lambda's captured set
    /// unless it is defined within that lambda's own scope subtree. Callers
    /// must never call this for a plain member-variable access — only for
    /// locals/parameters/captured callables and for `this` itself, since
    /// member access is reached via `this`, which is what gets captured
    /// (§9's open question ii).
    pub fn record_use(&mut self, table: &mut SymbolTable, symbol: SymbolId) {
        if let Some(&lambda) = self.lambda_stack.last() {
            let scope = lambda_scope(table, lambda);
            let defining_scope = table.symbol(symbol).defining_scope;
            if !table.scope_is_within(defining_scope, scope) {
                self.add_capture(table, lambda, symbol);
            }
        }
    }

    fn add_capture(&self, table: &mut SymbolTable, lambda: SymbolId, symbol: SymbolId) {
        if let SymbolKind::Lambda { captured, .. } = &mut table.symbol_mut(lambda).kind {
            if !captured.contains(&symbol) {
                captured.push(symbol);
            }
        }
    }
}

fn lambda_scope(table: &SymbolTable, lambda: SymbolId) -> ScopeId {
    match &table.symbol(lambda).kind {
        SymbolKind::Lambda { scope, .. } => *scope,
        _ => panic!("expected a lambda symbol"),
    }
}

fn lambda_captured(table: &SymbolTable, lambda: SymbolId) -> Vec<SymbolId> {
    match &table.symbol(lambda).kind {
        SymbolKind::Lambda { captured, .. } => captured.clone(),
        _ => panic!("expected a lambda symbol"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;

    fn declare_var(table: &mut SymbolTable, scope: ScopeId, name: &str, line: u32) -> SymbolId {
        table
            .declare(
                scope,
                name,
                Position::new(line, 1),
                SymbolKind::Variable { ty: Type::Int, is_parameter: false, is_member: false, is_local: true },
            )
            .unwrap()
    }

    #[test]
    fn lookup_falls_through_to_global() {
        let mut table = SymbolTable::new();
        let global = table.global_scope();
        let sym = declare_var(&mut table, global, "g", 1);
        let stack = ScopeStack::new(global);
        assert_eq!(stack.lookup(&table, "g"), Some(sym));
    }

    #[test]
    fn defining_guard_hides_outer_binding() {
        let mut table = SymbolTable::new();
        let global = table.global_scope();
        declare_var(&mut table, global, "x", 1);
        let local = table.new_scope(ScopeKind::Local, Some(global), None);
        let mut stack = ScopeStack::new(global);
        stack.open_local(local);
        stack.begin_defining("x".to_string(), Position::new(5, 1));
        assert_eq!(stack.lookup_before(&table, "x", &Position::new(5, 5)), None);
        stack.end_defining("x");
        assert!(stack.lookup_before(&table, "x", &Position::new(5, 5)).is_some());
    }

    #[test]
    fn lookup_before_skips_later_local_declaration() {
        let mut table = SymbolTable::new();
        let global = table.global_scope();
        let local = table.new_scope(ScopeKind::Local, Some(global), None);
        let later = declare_var(&mut table, local, "y", 10);
        let mut stack = ScopeStack::new(global);
        stack.open_local(local);
        assert_eq!(stack.lookup_before(&table, "y", &Position::new(5, 1)), None);
        assert_eq!(stack.lookup_before(&table, "y", &Position::new(20, 1)), Some(later));
    }
}
