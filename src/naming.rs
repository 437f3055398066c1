//! Naming pass (§4.4): builds the scope/symbol graph, validates the class
//! hierarchy, checks overrides and abstract completeness, and locates the
//! program entry point. Runs before Typing; if it reports any diagnostic,
//! Typing must not run (§6 "Driver contract").

use crate::ast::*;
use crate::diagnostics::sink::DiagnosticSink;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::position::Position;
use crate::scope_stack::ScopeStack;
use crate::symbols::{ScopeId, ScopeKind, SymbolId, SymbolKind, SymbolTable};
use crate::types::Type;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument};

pub struct NamingOutput {
    pub symbols: SymbolTable,
    pub diagnostics: Vec<Diagnostic>,
    pub main_method: Option<SymbolId>,
}

#[instrument(skip_all)]
pub fn run(program: &mut Program) -> NamingOutput {
    let symbols = SymbolTable::new();
    let stack = ScopeStack::new(symbols.global_scope());
    let mut namer = Namer {
        symbols,
        stack,
        sink: DiagnosticSink::new(),
        class_decl_index: HashMap::new(),
        class_symbols: HashMap::new(),
        effective_parent: HashMap::new(),
    };

    let aborted = namer.build_class_graph(program);
    let main_method = if aborted {
        info!("naming aborted after class-graph errors; skipping member resolution");
        None
    } else {
        namer.create_class_symbols(program);
        namer.resolve_members(program);
        namer.check_abstract_completeness(program);
        namer.find_entry_point(program)
    };

    NamingOutput { symbols: namer.symbols, diagnostics: namer.sink.finalize(), main_method }
}

struct Namer {
    symbols: SymbolTable,
    stack: ScopeStack,
    sink: DiagnosticSink,
    /// First-occurrence-wins index from class name to its declaration's
    /// position in `program.classes`.
    class_decl_index: HashMap<String, usize>,
    class_symbols: HashMap<String, SymbolId>,
    /// Parent name per class, with unresolved/self-conflicting parents
    /// already reported and nulled out, so downstream passes never have to
    /// re-check `ClassNotFound`.
    effective_parent: HashMap<String, Option<String>>,
}

impl Namer {
    /// Step 1: the class name -> declaration index, parent resolution, and
    /// cycle detection. Returns `true` if Naming must abort before member
    /// resolution (a duplicate class, an unknown parent, or a cycle).
    #[instrument(skip_all)]
    fn build_class_graph(&mut self, program: &Program) -> bool {
        let mut aborted = false;

        let mut first_index = HashMap::new();
        for (i, class) in program.classes.iter().enumerate() {
            if first_index.contains_key(&class.name) {
                self.sink.emit(Diagnostic::new(class.position.clone(), DiagnosticKind::DeclConflict { name: class.name.clone() }));
                aborted = true;
                continue;
            }
            first_index.insert(class.name.clone(), i);
        }
        self.class_decl_index = first_index;

        let mut effective_parent = HashMap::new();
        let names: Vec<String> = self.class_decl_index.keys().cloned().collect();
        for name in &names {
            let idx = self.class_decl_index[name];
            let class = &program.classes[idx];
            let parent = match &class.parent {
                Some(p) if !self.class_decl_index.contains_key(p) => {
                    self.sink.emit(Diagnostic::new(class.position.clone(), DiagnosticKind::ClassNotFound { name: p.clone() }));
                    aborted = true;
                    None
                }
                other => other.clone(),
            };
            effective_parent.insert(name.clone(), parent);
        }

        let cyclic = detect_cycles(&self.class_decl_index, &effective_parent);
        for name in &cyclic {
            let idx = self.class_decl_index[name];
            self.sink.emit(Diagnostic::new(
                program.classes[idx].position.clone(),
                DiagnosticKind::BadInheritance { class: name.clone() },
            ));
        }
        if !cyclic.is_empty() {
            aborted = true;
        }

        self.effective_parent = effective_parent;
        aborted
    }

    /// Step 2: parent-first class symbol creation, memoized by
    /// `class_symbols`.
    #[instrument(skip_all)]
    fn create_class_symbols(&mut self, program: &mut Program) {
        let names: Vec<String> = program.classes.iter().map(|c| c.name.clone()).collect();
        for name in &names {
            self.get_or_create_class(program, name);
        }
        for class in program.classes.iter_mut() {
            if let Some(&id) = self.class_symbols.get(&class.name) {
                class.symbol = Some(id);
                if let SymbolKind::Class { scope, .. } = &self.symbols.symbol(id).kind {
                    class.scope = Some(*scope);
                }
            }
        }
    }

    fn get_or_create_class(&mut self, program: &Program, name: &str) -> SymbolId {
        if let Some(&id) = self.class_symbols.get(name) {
            return id;
        }
        let idx = self.class_decl_index[name];
        let decl_position = program.classes[idx].position.clone();
        let is_abstract = program.classes[idx].is_abstract;
        let parent_id = self.effective_parent.get(name).cloned().flatten().map(|p| self.get_or_create_class(program, &p));
        let parent_scope = parent_id.map(|p| match &self.symbols.symbol(p).kind {
            SymbolKind::Class { scope, .. } => *scope,
            _ => unreachable!(),
        });
        let scope = self.symbols.new_scope(ScopeKind::Class, parent_scope, None);
        let id = self.symbols.declare_always(
            self.symbols.global_scope(),
            name,
            decl_position,
            SymbolKind::Class { ty: Type::class(name), scope, parent: parent_id, is_abstract, is_main: false },
        );
        self.symbols.scope_mut(scope).owner = Some(id);
        self.class_symbols.insert(name.to_string(), id);
        id
    }

    /// Step 3: field and method resolution, per class, parent-first (so
    /// override checks can see an already-declared ancestor method).
    #[instrument(skip_all)]
    fn resolve_members(&mut self, program: &mut Program) {
        let order: Vec<String> = program.classes.iter().map(|c| c.name.clone()).collect();
        let mut done = HashSet::new();
        for name in &order {
            self.resolve_members_ordered(program, name, &mut done);
        }
    }

    fn resolve_members_ordered(&mut self, program: &mut Program, name: &str, done: &mut HashSet<String>) {
        if done.contains(name) {
            return;
        }
        if let Some(parent) = self.effective_parent.get(name).cloned().flatten() {
            self.resolve_members_ordered(program, &parent, done);
        }
        done.insert(name.to_string());

        let idx = self.class_decl_index[name];
        let class_sym = self.class_symbols[name];
        let class_scope = match &self.symbols.symbol(class_sym).kind {
            SymbolKind::Class { scope, .. } => *scope,
            _ => unreachable!(),
        };

        self.stack.open_class(&self.symbols, class_sym);

        let field_count = program.classes[idx].fields.len();
        for fi in 0..field_count {
            self.resolve_field(program, idx, fi, class_scope);
        }
        let method_count = program.classes[idx].methods.len();
        for mi in 0..method_count {
            self.resolve_method(program, idx, mi, class_sym, class_scope);
        }

        self.stack.close_class();
    }

    fn resolve_field(&mut self, program: &mut Program, class_idx: usize, field_idx: usize, class_scope: ScopeId) {
        let (name, ann, position) = {
            let f = &program.classes[class_idx].fields[field_idx];
            (f.name.clone(), f.ty.clone(), f.position.clone())
        };
        let ty = self.resolve_type(&ann, &position);
        if ty.is_void() {
            self.sink.emit(Diagnostic::new(position.clone(), DiagnosticKind::BadVarType { name: name.clone() }));
        }

        let conflict = self.stack.find_conflict(&self.symbols, &name);
        let should_declare = match conflict {
            None => true,
            Some(existing) => {
                let same_class = self.symbols.symbol(existing).defining_scope == class_scope;
                if same_class {
                    self.sink.emit(Diagnostic::new(position.clone(), DiagnosticKind::DeclConflict { name: name.clone() }));
                } else if matches!(self.symbols.symbol(existing).kind, SymbolKind::Variable { .. }) {
                    self.sink.emit(Diagnostic::new(position.clone(), DiagnosticKind::OverridingVar { name: name.clone() }));
                } else {
                    self.sink.emit(Diagnostic::new(position.clone(), DiagnosticKind::DeclConflict { name: name.clone() }));
                }
                false
            }
        };

        let kind = SymbolKind::Variable { ty, is_parameter: false, is_member: true, is_local: false };
        let id = if should_declare {
            self.symbols.declare_always(class_scope, &name, position.clone(), kind)
        } else {
            self.symbols.declare_always(class_scope, &format!("{name}#shadowed"), position.clone(), kind)
        };
        program.classes[class_idx].fields[field_idx].symbol = Some(id);
    }

    fn resolve_method(&mut self, program: &mut Program, class_idx: usize, method_idx: usize, class_sym: SymbolId, class_scope: ScopeId) {
        let class_name = program.classes[class_idx].name.clone();
        let is_static = program.classes[class_idx].methods[method_idx].is_static;
        let is_abstract = program.classes[class_idx].methods[method_idx].is_abstract;
        let name = program.classes[class_idx].methods[method_idx].name.clone();
        let position = program.classes[class_idx].methods[method_idx].position.clone();
        let return_ann = program.classes[class_idx].methods[method_idx].return_type.clone();
        let param_count = program.classes[class_idx].methods[method_idx].params.len();

        let conflict = self.stack.find_conflict(&self.symbols, &name);

        let formal_scope = self.symbols.new_scope(ScopeKind::Formal, Some(class_scope), None);
        // `class_sym` is a placeholder `current_method` marker during
        // signature construction; Naming never reads `current_method` on its
        // own walk, so this is only observable to Typing, which opens its
        // own formal scope with the real method symbol.
        self.stack.open_formal(formal_scope, class_sym);

        if !is_static {
            let _ = self.symbols.declare(
                formal_scope,
                "this",
                position.clone(),
                SymbolKind::Variable { ty: Type::class(&class_name), is_parameter: true, is_member: false, is_local: false },
            );
        }

        let mut param_types = Vec::with_capacity(param_count);
        for pi in 0..param_count {
            let (pname, pann, ppos) = {
                let p = &program.classes[class_idx].methods[method_idx].params[pi];
                (p.name.clone(), p.ty.clone(), p.position.clone())
            };
            let pty = self.resolve_param_type(&pann, &ppos);
            param_types.push(pty.clone());
            let sym = match self.symbols.declare(
                formal_scope,
                &pname,
                ppos.clone(),
                SymbolKind::Variable { ty: pty, is_parameter: true, is_member: false, is_local: true },
            ) {
                Ok(id) => id,
                Err(_) => {
                    self.sink.emit(Diagnostic::new(ppos.clone(), DiagnosticKind::DeclConflict { name: pname.clone() }));
                    self.symbols.declare_always(formal_scope, &format!("{pname}#dup{pi}"), ppos, SymbolKind::Variable {
                        ty: Type::Error,
                        is_parameter: true,
                        is_member: false,
                        is_local: true,
                    })
                }
            };
            program.classes[class_idx].methods[method_idx].params[pi].symbol = Some(sym);
        }

        let return_ty = self.resolve_type(&return_ann, &position);
        let signature = Type::fun(return_ty, param_types);

        self.stack.close_formal();

        let (overrides, emit_conflict, emit_bad_override) = match conflict {
            None => (None, None, None),
            Some(existing) => {
                let same_class = self.symbols.symbol(existing).defining_scope == class_scope;
                if same_class {
                    (None, Some(DiagnosticKind::DeclConflict { name: name.clone() }), None)
                } else {
                    match &self.symbols.symbol(existing).kind {
                        SymbolKind::Method { is_static: p_static, is_abstract: p_abstract, .. } if !*p_static && !is_static => {
                            let p_abstract = *p_abstract;
                            if is_abstract && !p_abstract {
                                (None, Some(DiagnosticKind::DeclConflict { name: name.clone() }), None)
                            } else if signature.subtype_of(&existing_signature(&self.symbols, existing), &self.symbols) {
                                (Some(existing), None, None)
                            } else {
                                (None, None, Some(DiagnosticKind::BadOverride { method: name.clone(), class: class_name.clone() }))
                            }
                        }
                        _ => (None, Some(DiagnosticKind::DeclConflict { name: name.clone() }), None),
                    }
                }
            }
        };
        if let Some(d) = emit_conflict {
            self.sink.emit(Diagnostic::new(position.clone(), d));
        }
        if let Some(d) = emit_bad_override {
            self.sink.emit(Diagnostic::new(position.clone(), d));
        }

        let reachable = overrides.is_some() || conflict.is_none();
        let method_kind = SymbolKind::Method {
            signature,
            formal_scope,
            owner_class: class_sym,
            is_static,
            is_abstract,
            overrides,
        };
        let method_sym = if reachable {
            self.symbols.declare_always(class_scope, &name, position.clone(), method_kind)
        } else {
            self.symbols.declare_always(class_scope, &format!("{name}#shadowed"), position.clone(), method_kind)
        };
        self.symbols.scope_mut(formal_scope).owner = Some(method_sym);
        program.classes[class_idx].methods[method_idx].symbol = Some(method_sym);
        program.classes[class_idx].methods[method_idx].formal_scope = Some(formal_scope);

        if !is_abstract {
            self.stack.open_formal(formal_scope, method_sym);
            if let Some(body) = program.classes[class_idx].methods[method_idx].body.as_mut() {
                self.resolve_block(body);
            }
            self.stack.close_formal();
        }
    }

    fn resolve_block(&mut self, block: &mut Block) {
        let parent = self.stack.top_scope().unwrap_or_else(|| self.symbols.global_scope());
        let scope = self.symbols.new_scope(ScopeKind::Local, Some(parent), None);
        block.scope = Some(scope);
        self.stack.open_local(scope);
        for stmt in &mut block.statements {
            self.resolve_stmt(stmt);
        }
        self.stack.close_local();
    }

    fn resolve_stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Block(b) => self.resolve_block(b),
            Stmt::LocalVarDef(def) => self.resolve_local_var_def(def),
            Stmt::If(s) => {
                self.resolve_expr(&mut s.cond);
                self.resolve_stmt(&mut s.then_branch);
                if let Some(e) = s.else_branch.as_mut() {
                    self.resolve_stmt(e);
                }
            }
            Stmt::While(s) => {
                self.resolve_expr(&mut s.cond);
                self.stack.enter_loop();
                self.resolve_stmt(&mut s.body);
                self.stack.exit_loop();
            }
            Stmt::For(s) => {
                let parent = self.stack.top_scope().unwrap_or_else(|| self.symbols.global_scope());
                let scope = self.symbols.new_scope(ScopeKind::Local, Some(parent), None);
                s.scope = Some(scope);
                self.stack.open_local(scope);
                self.resolve_stmt(&mut s.init);
                self.resolve_expr(&mut s.cond);
                self.stack.enter_loop();
                self.resolve_stmt(&mut s.body);
                self.stack.exit_loop();
                self.resolve_stmt(&mut s.update);
                self.stack.close_local();
            }
            Stmt::Return(_) | Stmt::Break(_) | Stmt::ExprStmt(_) | Stmt::Print(_) | Stmt::Assign(_) => {
                self.resolve_expressions_in_stmt(stmt);
            }
        }
    }

    /// Naming's only job inside expressions is to create lambda
    /// scopes/symbols — name *resolution* of identifiers is Typing's job.
    fn resolve_expressions_in_stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Return(s) => {
                if let Some(e) = s.value.as_mut() {
                    self.resolve_expr(e);
                }
            }
            Stmt::ExprStmt(s) => self.resolve_expr(&mut s.expr),
            Stmt::Print(s) => {
                for a in &mut s.args {
                    self.resolve_expr(a);
                }
            }
            Stmt::Assign(s) => {
                self.resolve_expr(&mut s.lhs);
                self.resolve_expr(&mut s.rhs);
            }
            _ => {}
        }
    }

    fn resolve_local_var_def(&mut self, def: &mut LocalVarDef) {
        self.stack.begin_defining(def.name.clone(), def.position.clone());
        if let Some(e) = def.init.as_mut() {
            self.resolve_expr(e);
        }
        self.stack.end_defining(&def.name);
        let ty = match &def.declared_type {
            Some(ann) => {
                let t = self.resolve_type(ann, &def.position);
                if t.is_void() {
                    self.sink.emit(Diagnostic::new(def.position.clone(), DiagnosticKind::BadVarType { name: def.name.clone() }));
                }
                t
            }
            // `var`: the real type is filled in by Typing once the
            // initializer is evaluated (§5).
            None => Type::Error,
        };
        let scope = self.stack.top_scope().unwrap_or_else(|| self.symbols.global_scope());
        match self.symbols.declare(scope, &def.name, def.position.clone(), SymbolKind::Variable {
            ty,
            is_parameter: false,
            is_member: false,
            is_local: true,
        }) {
            Ok(id) => def.symbol = Some(id),
            Err(_existing) => {
                self.sink.emit(Diagnostic::new(def.position.clone(), DiagnosticKind::DeclConflict { name: def.name.clone() }));
                def.symbol = Some(self.symbols.declare_always(scope, &format!("{}#dup", def.name), def.position.clone(), SymbolKind::Variable {
                    ty: Type::Error,
                    is_parameter: false,
                    is_member: false,
                    is_local: true,
                }));
            }
        }
    }

    fn resolve_expr(&mut self, expr: &mut Expr) {
        match &mut expr.kind {
            ExprKind::VarSel { receiver, .. } => {
                if let Some(r) = receiver {
                    self.resolve_expr(r);
                }
            }
            ExprKind::IndexSel { array, index } => {
                self.resolve_expr(array);
                self.resolve_expr(index);
            }
            ExprKind::Unary { operand, .. } => self.resolve_expr(operand),
            ExprKind::Binary { lhs, rhs, .. } => {
                self.resolve_expr(lhs);
                self.resolve_expr(rhs);
            }
            ExprKind::NewArray { length, .. } => self.resolve_expr(length),
            ExprKind::Call(call) => {
                match &mut call.callee {
                    Callee::Length { receiver } => self.resolve_expr(receiver),
                    Callee::Static { .. } | Callee::Name { .. } => {}
                }
                for a in &mut call.args {
                    self.resolve_expr(a);
                }
            }
            ExprKind::ClassTest { expr: e, .. } | ExprKind::ClassCast { expr: e, .. } => self.resolve_expr(e),
            ExprKind::Lambda(lambda) => self.resolve_lambda(lambda),
            ExprKind::IntLit(_)
            | ExprKind::BoolLit(_)
            | ExprKind::StringLit(_)
            | ExprKind::NullLit
            | ExprKind::ReadInt
            | ExprKind::ReadLine
            | ExprKind::This { .. }
            | ExprKind::NewClass { .. } => {}
        }
    }

    fn resolve_lambda(&mut self, lambda: &mut LambdaExpr) {
        let parent_scope = self.stack.top_scope().unwrap_or_else(|| self.symbols.global_scope());
        let scope = self.symbols.new_scope(ScopeKind::Lambda, Some(parent_scope), None);
        let synthetic_name = format!("lambda@{}", lambda.position);
        let lambda_sym = self.symbols.declare_always(
            parent_scope,
            &format!("#{synthetic_name}"),
            lambda.position.clone(),
            SymbolKind::Lambda {
                synthetic_name,
                scope,
                signature: Type::fun(Type::Null, Vec::new()),
                return_types: Vec::new(),
                captured: Vec::new(),
            },
        );
        self.symbols.scope_mut(scope).owner = Some(lambda_sym);
        lambda.symbol = Some(lambda_sym);
        lambda.scope = Some(scope);

        self.stack.open_lambda(scope, lambda_sym);

        let mut param_types = Vec::with_capacity(lambda.params.len());
        for (pi, param) in lambda.params.iter_mut().enumerate() {
            let pty = {
                let ann = param.ty.clone();
                let pos = param.position.clone();
                self.resolve_param_type(&ann, &pos)
            };
            param_types.push(pty.clone());
            match self.symbols.declare(scope, &param.name, param.position.clone(), SymbolKind::Variable {
                ty: pty,
                is_parameter: true,
                is_member: false,
                is_local: true,
            }) {
                Ok(id) => param.symbol = Some(id),
                Err(_) => {
                    self.sink.emit(Diagnostic::new(param.position.clone(), DiagnosticKind::DeclConflict { name: param.name.clone() }));
                    param.symbol = Some(self.symbols.declare_always(scope, &format!("{}#dup{pi}", param.name), param.position.clone(), SymbolKind::Variable {
                        ty: Type::Error,
                        is_parameter: true,
                        is_member: false,
                        is_local: true,
                    }));
                }
            }
        }
        if let SymbolKind::Lambda { signature, .. } = &mut self.symbols.symbol_mut(lambda_sym).kind {
            *signature = Type::fun(Type::Null, param_types);
        }

        // Even an expression-bodied lambda gets an anonymous local scope
        // nested in the lambda scope, so capture analysis is uniform (§4.4).
        match &mut lambda.body {
            LambdaBody::Expr(e) => {
                let local = self.symbols.new_scope(ScopeKind::Local, Some(scope), None);
                self.stack.open_local(local);
                self.resolve_expr(e);
                self.stack.close_local();
            }
            LambdaBody::Block(b) => self.resolve_block(b),
        }

        self.stack.close_lambda(&mut self.symbols);
    }

    /// Step 4: abstract completeness.
    #[instrument(skip_all)]
    fn check_abstract_completeness(&mut self, program: &Program) {
        for class in &program.classes {
            let Some(class_sym) = class.symbol else { continue };
            let is_abstract = matches!(self.symbols.symbol(class_sym).kind, SymbolKind::Class { is_abstract: true, .. });

            // Walk nearest-ancestor-first so a closer concrete override of a
            // name suppresses a farther ancestor's abstract declaration of
            // that same name: `seen` records every member name already
            // encountered at a nearer ancestor, abstract or not.
            let mut inherited_abstract: HashMap<String, Position> = HashMap::new();
            let mut seen: HashSet<String> = HashSet::new();
            let mut ancestor = self.effective_parent.get(&class.name).cloned().flatten();
            while let Some(a) = ancestor {
                if let Some(&asym) = self.class_symbols.get(&a) {
                    let ascope = match &self.symbols.symbol(asym).kind {
                        SymbolKind::Class { scope, .. } => *scope,
                        _ => unreachable!(),
                    };
                    let members: Vec<(String, SymbolId)> =
                        self.symbols.scope(ascope).names.iter().map(|(n, &s)| (n.clone(), s)).collect();
                    for (mname, msym) in members {
                        if !seen.insert(mname.clone()) {
                            continue;
                        }
                        if let SymbolKind::Method { is_abstract: true, .. } = &self.symbols.symbol(msym).kind {
                            inherited_abstract.insert(mname, self.symbols.symbol(msym).position.clone());
                        }
                    }
                }
                ancestor = self.effective_parent.get(&a).cloned().flatten();
            }

            for method in &class.methods {
                if !method.is_abstract {
                    inherited_abstract.remove(&method.name);
                }
            }

            if !is_abstract && !inherited_abstract.is_empty() {
                self.sink.emit(Diagnostic::new(class.position.clone(), DiagnosticKind::BadAbstractMethod { class: class.name.clone() }));
            }
            if !is_abstract {
                for method in &class.methods {
                    if method.is_abstract {
                        self.sink.emit(Diagnostic::new(method.position.clone(), DiagnosticKind::BadAbstractMethod { class: class.name.clone() }));
                    }
                }
            }
        }
    }

    /// Step 5: entry point location.
    #[instrument(skip_all)]
    fn find_entry_point(&mut self, program: &Program) -> Option<SymbolId> {
        let main_class = program.classes.iter().find(|c| c.name == "Main")?;
        if main_class.is_abstract {
            self.sink.emit(Diagnostic::new(main_class.position.clone(), DiagnosticKind::NoMainClass));
            return None;
        }
        let method = main_class.methods.iter().find(|m| {
            m.name == "main" && m.is_static && m.params.is_empty() && matches!(m.return_type, TypeAnnotation::Void)
        });
        match method.and_then(|m| m.symbol) {
            Some(sym) => {
                let class_sym = main_class.symbol.expect("class symbol assigned by create_class_symbols");
                if let SymbolKind::Class { is_main, .. } = &mut self.symbols.symbol_mut(class_sym).kind {
                    *is_main = true;
                }
                debug!("entry point located");
                Some(sym)
            }
            None => {
                self.sink.emit(Diagnostic::new(main_class.position.clone(), DiagnosticKind::NoMainClass));
                None
            }
        }
    }

    fn resolve_type(&mut self, ann: &TypeAnnotation, pos: &Position) -> Type {
        match ann {
            TypeAnnotation::Int => Type::Int,
            TypeAnnotation::Bool => Type::Bool,
            TypeAnnotation::String => Type::String,
            TypeAnnotation::Void => Type::Void,
            TypeAnnotation::Class(name) => {
                if self.class_decl_index.contains_key(name) {
                    Type::class(name)
                } else {
                    self.sink.emit(Diagnostic::new(pos.clone(), DiagnosticKind::ClassNotFound { name: name.clone() }));
                    Type::Error
                }
            }
            TypeAnnotation::Array(elem) => {
                let inner = self.resolve_type(elem, pos);
                if inner.is_void() {
                    self.sink.emit(Diagnostic::new(pos.clone(), DiagnosticKind::BadArrElement));
                    Type::Error
                } else {
                    Type::array(inner)
                }
            }
            TypeAnnotation::Fun(ret, params) => {
                let ret_t = self.resolve_type(ret, pos);
                let param_ts = params.iter().map(|p| self.resolve_param_type(p, pos)).collect();
                Type::fun(ret_t, param_ts)
            }
        }
    }

    fn resolve_param_type(&mut self, ann: &TypeAnnotation, pos: &Position) -> Type {
        let t = self.resolve_type(ann, pos);
        if t.is_void() {
            self.sink.emit(Diagnostic::new(pos.clone(), DiagnosticKind::VoidAsPara));
            Type::Error
        } else {
            t
        }
    }
}

fn existing_signature(table: &SymbolTable, id: SymbolId) -> Type {
    table.symbol(id).type_of()
}

/// Timestamp-coloring cycle detection (§4.4 Step 1): walks each
/// not-yet-resolved class up its parent chain, tracking the current walk's
/// visited set; revisiting a node already on that walk is a cycle.
fn detect_cycles(classes: &HashMap<String, usize>, parent: &HashMap<String, Option<String>>) -> Vec<String> {
    let mut resolved: HashSet<String> = HashSet::new();
    let mut cyclic: HashSet<String> = HashSet::new();
    let mut order = Vec::new();

    for start in classes.keys() {
        if resolved.contains(start) || cyclic.contains(start) {
            continue;
        }
        let mut visiting = Vec::new();
        let mut cur = start.clone();
        loop {
            if resolved.contains(&cur) {
                resolved.extend(visiting);
                break;
            }
            if cyclic.contains(&cur) {
                break;
            }
            if let Some(pos) = visiting.iter().position(|n| n == &cur) {
                for n in &visiting[pos..] {
                    if cyclic.insert(n.clone()) {
                        order.push(n.clone());
                    }
                }
                resolved.extend(visiting[..pos].iter().cloned());
                break;
            }
            visiting.push(cur.clone());
            match parent.get(&cur).cloned().flatten() {
                Some(p) if classes.contains_key(&p) => cur = p,
                _ => {
                    resolved.extend(visiting);
                    break;
                }
            }
        }
    }
    order
}
