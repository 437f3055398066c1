//! Typing pass (§4.5, §4.6): expression and statement type checking,
//! `var` type inference, missing-return detection, lambda return-type
//! finalization via `join`, and capture analysis. Runs only when Naming
//! reported no diagnostics (§6).

use crate::ast::*;
use crate::diagnostics::sink::DiagnosticSink;
use crate::diagnostics::{BadArgTypeContext, Diagnostic, DiagnosticKind};
use crate::position::Position;
use crate::scope_stack::ScopeStack;
use crate::symbols::{SymbolId, SymbolKind, SymbolTable};
use crate::types::{self, Type};
use tracing::instrument;

pub struct TypingOutput {
    pub diagnostics: Vec<Diagnostic>,
}

#[instrument(skip_all)]
pub fn run(program: &mut Program, symbols: &mut SymbolTable) -> TypingOutput {
    let stack = ScopeStack::new(symbols.global_scope());
    let mut typer = Typer { symbols, stack, sink: DiagnosticSink::new() };
    typer.check_program(program);
    TypingOutput { diagnostics: typer.sink.finalize() }
}

struct Typer<'a> {
    symbols: &'a mut SymbolTable,
    stack: ScopeStack,
    sink: DiagnosticSink,
}

impl<'a> Typer<'a> {
    #[instrument(skip_all)]
    fn check_program(&mut self, program: &mut Program) {
        for class in &mut program.classes {
            let Some(class_sym) = class.symbol else { continue };
            self.stack.open_class(self.symbols, class_sym);
            for method in &mut class.methods {
                self.check_method(method, class_sym);
            }
            self.stack.close_class();
        }
    }

    fn check_method(&mut self, method: &mut MethodDecl, class_sym: SymbolId) {
        let Some(method_sym) = method.symbol else { return };
        let Some(formal_scope) = method.formal_scope else { return };
        let Some(body) = method.body.as_mut() else { return };

        self.stack.open_formal(formal_scope, method_sym);
        self.check_block(body);
        self.stack.close_formal();

        let return_ty = match &self.symbols.symbol(method_sym).kind {
            SymbolKind::Method { signature: Type::Fun(ret, _), .. } => (**ret).clone(),
            _ => Type::Error,
        };
        if !return_ty.is_void() && !body.returns {
            self.sink.emit(Diagnostic::new(method.position.clone(), DiagnosticKind::MissingReturn));
        }
        let _ = class_sym;
    }

    fn check_block(&mut self, block: &mut Block) {
        let scope = block.scope.expect("naming assigns a scope to every block");
        self.stack.open_local(scope);
        let mut returns = false;
        for stmt in &mut block.statements {
            self.check_stmt(stmt);
            if stmt.returns() {
                returns = true;
            }
        }
        block.returns = returns;
        self.stack.close_local();
    }

    fn check_stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Block(b) => self.check_block(b),
            Stmt::LocalVarDef(def) => self.check_local_var_def(def),
            Stmt::If(s) => {
                self.check_test_expr(&mut s.cond);
                self.check_stmt(&mut s.then_branch);
                let then_returns = s.then_branch.returns();
                let else_returns = match s.else_branch.as_mut() {
                    Some(e) => {
                        self.check_stmt(e);
                        e.returns()
                    }
                    None => false,
                };
                s.returns = then_returns && else_returns;
            }
            Stmt::While(s) => {
                self.check_test_expr(&mut s.cond);
                self.stack.enter_loop();
                self.check_stmt(&mut s.body);
                self.stack.exit_loop();
            }
            Stmt::For(s) => {
                let scope = s.scope.expect("naming assigns a scope to every for-loop");
                self.stack.open_local(scope);
                self.check_stmt(&mut s.init);
                self.check_test_expr(&mut s.cond);
                self.stack.enter_loop();
                self.check_stmt(&mut s.body);
                self.stack.exit_loop();
                self.check_stmt(&mut s.update);
                self.stack.close_local();
            }
            Stmt::Return(s) => self.check_return(s),
            Stmt::Break(pos) => {
                if !self.stack.in_loop() {
                    self.sink.emit(Diagnostic::new(pos.clone(), DiagnosticKind::BreakOutOfLoop));
                }
            }
            Stmt::ExprStmt(s) => {
                self.type_expr(&mut s.expr);
            }
            Stmt::Print(s) => {
                for a in &mut s.args {
                    self.type_expr(a);
                }
            }
            Stmt::Assign(s) => self.check_assign(s),
        }
    }

    fn check_test_expr(&mut self, cond: &mut Expr) {
        let ty = self.type_expr(cond);
        if ty.no_error() && !ty.subtype_of(&Type::Bool, &*self.symbols) {
            self.sink.emit(Diagnostic::new(cond.position.clone(), DiagnosticKind::BadTestExpr));
        }
    }

    fn check_local_var_def(&mut self, def: &mut LocalVarDef) {
        let Some(sym) = def.symbol else { return };
        self.stack.begin_defining(def.name.clone(), def.position.clone());
        let init_ty = def.init.as_mut().map(|e| self.type_expr(e));
        self.stack.end_defining(&def.name);
        if def.declared_type.is_none() {
            // `var`: Typing mutates the placeholder type exactly once,
            // from the initializer (§5).
            let inferred = init_ty.clone().unwrap_or(Type::Error);
            if inferred.is_void() {
                self.sink.emit(Diagnostic::new(def.position.clone(), DiagnosticKind::AssignVarVoid { name: def.name.clone() }));
            }
            if let SymbolKind::Variable { ty, .. } = &mut self.symbols.symbol_mut(sym).kind {
                *ty = if inferred.is_void() { Type::Error } else { inferred };
            }
        } else if let (Some(init_ty), declared) = (init_ty, self.symbols.symbol(sym).type_of()) {
            if init_ty.no_error() && declared.no_error() && !init_ty.subtype_of(&declared, &*self.symbols) {
                self.sink.emit(Diagnostic::new(
                    def.position.clone(),
                    DiagnosticKind::BadArgType {
                        context: BadArgTypeContext::VarInit { name: def.name.clone() },
                        expected: declared.to_string(),
                        actual: init_ty.to_string(),
                    },
                ));
            }
        }
    }

    fn check_return(&mut self, ret: &mut ReturnStmt) {
        let actual = ret.value.as_mut().map(|e| self.type_expr(e)).unwrap_or(Type::Void);
        if let Some(lambda) = self.stack.current_lambda() {
            if let SymbolKind::Lambda { return_types, .. } = &mut self.symbols.symbol_mut(lambda).kind {
                return_types.push(actual.clone());
            }
            ret.returns = true;
            return;
        }
        let Some(method) = self.stack.current_method() else { return };
        let expected = match &self.symbols.symbol(method).kind {
            SymbolKind::Method { signature: Type::Fun(r, _), .. } => (**r).clone(),
            _ => Type::Error,
        };
        if expected.no_error() && actual.no_error() && !actual.subtype_of(&expected, &*self.symbols) {
            self.sink.emit(Diagnostic::new(
                ret.position.clone(),
                DiagnosticKind::BadReturnType { expected: expected.to_string(), actual: actual.to_string() },
            ));
        }
        ret.returns = true;
    }

    fn check_assign(&mut self, stmt: &mut AssignStmt) {
        let lhs_ty = self.type_expr(&mut stmt.lhs);
        let rhs_ty = self.type_expr(&mut stmt.rhs);

        match &stmt.lhs.kind {
            ExprKind::VarSel { symbol: Some(sym), .. } => {
                let in_lambda = self.stack.is_in_lambda();
                match &self.symbols.symbol(*sym).kind {
                    SymbolKind::Method { .. } => {
                        self.sink.emit(Diagnostic::new(stmt.position.clone(), DiagnosticKind::AssignMethod { name: self.symbols.symbol(*sym).name.clone() }));
                        return;
                    }
                    SymbolKind::Variable { is_local, .. } => {
                        let is_local = *is_local;
                        if in_lambda && is_local {
                            let defining_scope = self.symbols.symbol(*sym).defining_scope;
                            let current_lambda = self.stack.current_lambda().unwrap();
                            let lambda_scope_id = match &self.symbols.symbol(current_lambda).kind {
                                SymbolKind::Lambda { scope, .. } => *scope,
                                _ => unreachable!(),
                            };
                            if !self.symbols.scope_is_within(defining_scope, lambda_scope_id) {
                                self.sink.emit(Diagnostic::new(
                                    stmt.position.clone(),
                                    DiagnosticKind::AssignCapture { name: self.symbols.symbol(*sym).name.clone() },
                                ));
                                return;
                            }
                        }
                    }
                    _ => {}
                }
            }
            ExprKind::IndexSel { .. } => {}
            _ => {}
        }

        if lhs_ty.no_error() && rhs_ty.no_error() && !rhs_ty.subtype_of(&lhs_ty, &*self.symbols) {
            self.sink.emit(Diagnostic::new(
                stmt.position.clone(),
                DiagnosticKind::BadArgType { context: BadArgTypeContext::Assign, expected: lhs_ty.to_string(), actual: rhs_ty.to_string() },
            ));
        }
    }

    // -- expressions ------------------------------------------------------

    fn type_expr(&mut self, expr: &mut Expr) -> Type {
        let ty = self.type_expr_inner(expr);
        expr.ty = Some(ty.clone());
        ty
    }

    fn type_expr_inner(&mut self, expr: &mut Expr) -> Type {
        match &mut expr.kind {
            ExprKind::IntLit(_) => Type::Int,
            ExprKind::BoolLit(_) => Type::Bool,
            ExprKind::StringLit(_) => Type::String,
            ExprKind::NullLit => Type::Null,
            ExprKind::ReadInt => Type::Int,
            ExprKind::ReadLine => Type::String,
            ExprKind::This { symbol } => self.type_this(symbol, &expr.position),
            ExprKind::VarSel { receiver, name, symbol, is_class_name } => {
                self.type_var_sel(receiver, name, symbol, is_class_name, &expr.position)
            }
            ExprKind::IndexSel { array, index } => self.type_index_sel(array, index, &expr.position),
            ExprKind::Unary { op, operand } => self.type_unary(*op, operand, &expr.position),
            ExprKind::Binary { op, lhs, rhs } => self.type_binary(*op, lhs, rhs, &expr.position),
            ExprKind::NewClass { name, symbol } => self.type_new_class(name, symbol, &expr.position),
            ExprKind::NewArray { elem_type, length } => self.type_new_array(elem_type, length, &expr.position),
            ExprKind::Call(call) => self.type_call(call, &expr.position),
            ExprKind::ClassTest { expr: e, class_name } => self.type_class_test(e, class_name, &expr.position),
            ExprKind::ClassCast { expr: e, class_name } => self.type_class_cast(e, class_name, &expr.position),
            ExprKind::Lambda(lambda) => self.type_lambda(lambda),
        }
    }

    fn type_this(&mut self, symbol: &mut Option<SymbolId>, pos: &Position) -> Type {
        let Some(method) = self.stack.current_method() else {
            self.sink.emit(Diagnostic::new(pos.clone(), DiagnosticKind::ThisInStaticFunc));
            return Type::Error;
        };
        let is_static = matches!(&self.symbols.symbol(method).kind, SymbolKind::Method { is_static: true, .. });
        if is_static {
            self.sink.emit(Diagnostic::new(pos.clone(), DiagnosticKind::ThisInStaticFunc));
            return Type::Error;
        }
        let Some(this_sym) = self.stack.lookup(self.symbols, "this") else {
            return Type::Error;
        };
        *symbol = Some(this_sym);
        self.stack.record_use(self.symbols, this_sym);
        self.symbols.symbol(this_sym).type_of()
    }

    fn type_var_sel(
        &mut self,
        receiver: &mut Option<Box<Expr>>,
        name: &str,
        symbol: &mut Option<SymbolId>,
        is_class_name: &mut bool,
        pos: &Position,
    ) -> Type {
        match receiver {
            None => {
                if self.symbols.class_named(name).is_some() {
                    *is_class_name = true;
                    return Type::Error;
                }
                let Some(sym) = self.stack.lookup_before(self.symbols, name, pos) else {
                    self.sink.emit(Diagnostic::new(pos.clone(), DiagnosticKind::UndeclVar { name: name.to_string() }));
                    return Type::Error;
                };
                *symbol = Some(sym);
                match &self.symbols.symbol(sym).kind {
                    SymbolKind::Variable { is_member: true, is_local: false, .. } => {
                        let is_static_ctx =
                            self.stack.current_method().map(|m| matches!(&self.symbols.symbol(m).kind, SymbolKind::Method { is_static: true, .. })).unwrap_or(false);
                        if is_static_ctx {
                            self.sink.emit(Diagnostic::new(pos.clone(), DiagnosticKind::RefNonStatic { name: name.to_string() }));
                            return Type::Error;
                        }
                        // A member read is reached through `this`, so `this`
                        // (not the field symbol) is what gets captured (§9
                        // open question ii).
                        if let Some(this_sym) = self.stack.lookup(self.symbols, "this") {
                            self.stack.record_use(self.symbols, this_sym);
                        }
                    }
                    _ => self.stack.record_use(self.symbols, sym),
                }
                self.symbols.symbol(sym).type_of()
            }
            Some(recv) => {
                let recv_ty = self.type_expr(recv);
                let class_name = match &recv_ty {
                    Type::Class(c) => c.clone(),
                    _ => {
                        if recv_ty.no_error() {
                            self.sink.emit(Diagnostic::new(pos.clone(), DiagnosticKind::NotClassField { name: name.to_string() }));
                        }
                        return Type::Error;
                    }
                };
                let Some(class_sym) = self.symbols.class_named(&class_name) else {
                    return Type::Error;
                };
                let field_scope = match &self.symbols.symbol(class_sym).kind {
                    SymbolKind::Class { scope, .. } => *scope,
                    _ => return Type::Error,
                };
                let Some(field_sym) = self.symbols.lexical_lookup(field_scope, name) else {
                    self.sink.emit(Diagnostic::new(pos.clone(), DiagnosticKind::FieldNotFound { field: name.to_string(), class: class_name.clone() }));
                    return Type::Error;
                };
                match &self.symbols.symbol(field_sym).kind {
                    SymbolKind::Variable { is_member: true, .. } => {
                        let is_own_this = matches!(&recv.kind, ExprKind::This { .. });
                        if !is_own_this {
                            self.sink.emit(Diagnostic::new(
                                pos.clone(),
                                DiagnosticKind::FieldNotAccess { field: name.to_string(), class: class_name.clone() },
                            ));
                            return Type::Error;
                        }
                        *symbol = Some(field_sym);
                        self.symbols.symbol(field_sym).type_of()
                    }
                    _ => {
                        self.sink.emit(Diagnostic::new(pos.clone(), DiagnosticKind::FieldNotFound { field: name.to_string(), class: class_name.clone() }));
                        Type::Error
                    }
                }
            }
        }
    }

    fn type_index_sel(&mut self, array: &mut Expr, index: &mut Expr, pos: &Position) -> Type {
        let array_ty = self.type_expr(array);
        let index_ty = self.type_expr(index);
        if index_ty.no_error() && index_ty != Type::Int {
            self.sink.emit(Diagnostic::new(
                pos.clone(),
                DiagnosticKind::BadArgType { context: BadArgTypeContext::Index, expected: "int".to_string(), actual: index_ty.to_string() },
            ));
        }
        match array_ty {
            Type::Array(elem) => *elem,
            Type::Error => Type::Error,
            _ => {
                self.sink.emit(Diagnostic::new(pos.clone(), DiagnosticKind::NotArray));
                Type::Error
            }
        }
    }

    fn type_unary(&mut self, op: UnaryOp, operand: &mut Expr, pos: &Position) -> Type {
        let ty = self.type_expr(operand);
        if !ty.no_error() {
            return Type::Error;
        }
        let expected = match op {
            UnaryOp::Neg => Type::Int,
            UnaryOp::Not => Type::Bool,
        };
        if ty != expected {
            self.sink.emit(Diagnostic::new(pos.clone(), DiagnosticKind::IncompatUnOp { op: op.to_string(), operand: ty.to_string() }));
            Type::Error
        } else {
            expected
        }
    }

    fn type_binary(&mut self, op: BinaryOp, lhs: &mut Expr, rhs: &mut Expr, pos: &Position) -> Type {
        let lty = self.type_expr(lhs);
        let rty = self.type_expr(rhs);
        if !lty.no_error() || !rty.no_error() {
            return match op {
                BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::And | BinaryOp::Or => Type::Bool,
                _ => Type::Error,
            };
        }
        use BinaryOp::*;
        let result = match op {
            Add | Sub | Mul | Div | Mod => {
                if lty == Type::Int && rty == Type::Int {
                    Some(Type::Int)
                } else {
                    None
                }
            }
            Lt | Le | Gt | Ge => {
                if lty == Type::Int && rty == Type::Int {
                    Some(Type::Bool)
                } else {
                    None
                }
            }
            Eq | Ne => {
                if lty.subtype_of(&rty, &*self.symbols) || rty.subtype_of(&lty, &*self.symbols) {
                    Some(Type::Bool)
                } else {
                    None
                }
            }
            And | Or => {
                if lty == Type::Bool && rty == Type::Bool {
                    Some(Type::Bool)
                } else {
                    None
                }
            }
        };
        match result {
            Some(t) => t,
            None => {
                self.sink.emit(Diagnostic::new(pos.clone(), DiagnosticKind::IncompatBinOp { op: op.to_string(), lhs: lty.to_string(), rhs: rty.to_string() }));
                match op {
                    Eq | Ne | Lt | Le | Gt | Ge | And | Or => Type::Bool,
                    _ => Type::Error,
                }
            }
        }
    }

    fn type_new_class(&mut self, name: &str, symbol: &mut Option<SymbolId>, pos: &Position) -> Type {
        let Some(class_sym) = self.symbols.class_named(name) else {
            self.sink.emit(Diagnostic::new(pos.clone(), DiagnosticKind::ClassNotFound { name: name.to_string() }));
            return Type::Error;
        };
        *symbol = Some(class_sym);
        if let SymbolKind::Class { is_abstract: true, .. } = &self.symbols.symbol(class_sym).kind {
            self.sink.emit(Diagnostic::new(pos.clone(), DiagnosticKind::NewAbstractClass { class: name.to_string() }));
            return Type::Error;
        }
        Type::class(name)
    }

    fn type_new_array(&mut self, elem_type: &TypeAnnotation, length: &mut Expr, pos: &Position) -> Type {
        let length_ty = self.type_expr(length);
        if length_ty.no_error() && length_ty != Type::Int {
            self.sink.emit(Diagnostic::new(pos.clone(), DiagnosticKind::BadNewArrayLength));
        }
        let elem = self.resolve_type_annotation(elem_type, pos);
        if elem.is_void() {
            self.sink.emit(Diagnostic::new(pos.clone(), DiagnosticKind::BadArrElement));
            Type::Error
        } else {
            Type::array(elem)
        }
    }

    fn resolve_type_annotation(&mut self, ann: &TypeAnnotation, pos: &Position) -> Type {
        match ann {
            TypeAnnotation::Int => Type::Int,
            TypeAnnotation::Bool => Type::Bool,
            TypeAnnotation::String => Type::String,
            TypeAnnotation::Void => Type::Void,
            TypeAnnotation::Class(name) => {
                if self.symbols.class_named(name).is_some() {
                    Type::class(name.clone())
                } else {
                    self.sink.emit(Diagnostic::new(pos.clone(), DiagnosticKind::ClassNotFound { name: name.clone() }));
                    Type::Error
                }
            }
            TypeAnnotation::Array(e) => Type::array(self.resolve_type_annotation(e, pos)),
            TypeAnnotation::Fun(ret, params) => {
                let ret_t = self.resolve_type_annotation(ret, pos);
                let param_ts = params.iter().map(|p| self.resolve_type_annotation(p, pos)).collect();
                Type::fun(ret_t, param_ts)
            }
        }
    }

    fn type_class_test(&mut self, e: &mut Expr, class_name: &str, pos: &Position) -> Type {
        let ty = self.type_expr(e);
        if ty.no_error() && !ty.is_class() {
            self.sink.emit(Diagnostic::new(pos.clone(), DiagnosticKind::NotClass { name: class_name.to_string() }));
        }
        if self.symbols.class_named(class_name).is_none() {
            self.sink.emit(Diagnostic::new(pos.clone(), DiagnosticKind::ClassNotFound { name: class_name.to_string() }));
        }
        Type::Bool
    }

    fn type_class_cast(&mut self, e: &mut Expr, class_name: &str, pos: &Position) -> Type {
        let ty = self.type_expr(e);
        if self.symbols.class_named(class_name).is_none() {
            self.sink.emit(Diagnostic::new(pos.clone(), DiagnosticKind::ClassNotFound { name: class_name.to_string() }));
            return Type::Error;
        }
        if ty.no_error() && !ty.is_class() {
            self.sink.emit(Diagnostic::new(pos.clone(), DiagnosticKind::NotClass { name: class_name.to_string() }));
            return Type::Error;
        }
        Type::class(class_name)
    }

    fn type_call(&mut self, call: &mut CallExpr, pos: &Position) -> Type {
        match &mut call.callee {
            Callee::Length { receiver } => {
                let rty = self.type_expr(receiver);
                call.is_array_length = true;
                if !call.args.is_empty() {
                    self.sink.emit(Diagnostic::new(pos.clone(), DiagnosticKind::BadLengthArg));
                }
                if rty.no_error() && !rty.is_array() {
                    self.sink.emit(Diagnostic::new(pos.clone(), DiagnosticKind::NotArray));
                    return Type::Error;
                }
                call.return_type = Some(Type::Int);
                Type::Int
            }
            Callee::Static { class_name, method, position } => {
                let arg_types: Vec<Type> = call.args.iter_mut().map(|a| self.type_expr(a)).collect();
                let Some(class_sym) = self.symbols.class_named(class_name) else {
                    self.sink.emit(Diagnostic::new(position.clone(), DiagnosticKind::ClassNotFound { name: class_name.clone() }));
                    return Type::Error;
                };
                let class_scope = match &self.symbols.symbol(class_sym).kind {
                    SymbolKind::Class { scope, .. } => *scope,
                    _ => return Type::Error,
                };
                let Some(method_sym) = self.symbols.lexical_lookup(class_scope, method) else {
                    self.sink.emit(Diagnostic::new(position.clone(), DiagnosticKind::NotClassField { name: method.clone() }));
                    return Type::Error;
                };
                match &self.symbols.symbol(method_sym).kind {
                    SymbolKind::Method { is_static: true, .. } => {}
                    SymbolKind::Method { .. } => {
                        self.sink.emit(Diagnostic::new(position.clone(), DiagnosticKind::NotClassField { name: method.clone() }));
                        return Type::Error;
                    }
                    _ => {
                        self.sink.emit(Diagnostic::new(position.clone(), DiagnosticKind::NotCallable { name: method.clone() }));
                        return Type::Error;
                    }
                }
                call.is_method = true;
                call.symbol = Some(method_sym);
                self.check_call_args(method_sym, &arg_types, method, position)
            }
            Callee::Name { name, position } => {
                let is_field_call = {
                    let current = self.stack.current_class();
                    current
                        .and_then(|c| match &self.symbols.symbol(c).kind {
                            SymbolKind::Class { scope, .. } => self.symbols.lexical_lookup(*scope, name),
                            _ => None,
                        })
                        .map(|sym| self.symbols.symbol(sym).is_method())
                        .unwrap_or(false)
                };
                if is_field_call {
                    let current = self.stack.current_class().unwrap();
                    let scope = match &self.symbols.symbol(current).kind {
                        SymbolKind::Class { scope, .. } => *scope,
                        _ => unreachable!(),
                    };
                    let method_sym = self.symbols.lexical_lookup(scope, name).unwrap();
                    let is_static_target = matches!(&self.symbols.symbol(method_sym).kind, SymbolKind::Method { is_static: true, .. });
                    let caller_static =
                        self.stack.current_method().map(|m| matches!(&self.symbols.symbol(m).kind, SymbolKind::Method { is_static: true, .. })).unwrap_or(false);
                    if caller_static && !is_static_target {
                        self.sink.emit(Diagnostic::new(position.clone(), DiagnosticKind::RefNonStatic { name: name.clone() }));
                        return Type::Error;
                    }
                    let arg_types: Vec<Type> = call.args.iter_mut().map(|a| self.type_expr(a)).collect();
                    call.is_method = true;
                    call.symbol = Some(method_sym);
                    if !is_static_target {
                        if let Some(this_sym) = self.stack.lookup(self.symbols, "this") {
                            self.stack.record_use(self.symbols, this_sym);
                        }
                    }
                    return self.check_call_args(method_sym, &arg_types, name, position);
                }

                let Some(sym) = self.stack.lookup_before(self.symbols, name, position) else {
                    self.sink.emit(Diagnostic::new(position.clone(), DiagnosticKind::UndeclVar { name: name.clone() }));
                    for a in &mut call.args {
                        self.type_expr(a);
                    }
                    return Type::Error;
                };
                self.stack.record_use(self.symbols, sym);
                call.symbol = Some(sym);
                let arg_types: Vec<Type> = call.args.iter_mut().map(|a| self.type_expr(a)).collect();
                match &self.symbols.symbol(sym).kind {
                    SymbolKind::Lambda { signature: Type::Fun(ret, params), .. } => {
                        let params = params.clone();
                        let ret = (**ret).clone();
                        if arg_types.len() != params.len() {
                            self.sink.emit(Diagnostic::new(
                                position.clone(),
                                DiagnosticKind::BadArgCount { name: name.clone(), expected: params.len(), given: arg_types.len() },
                            ));
                            return Type::Error;
                        }
                        self.check_positional_args(&params, &arg_types, name, position);
                        ret
                    }
                    SymbolKind::Variable { ty: Type::Fun(ret, params), .. } => {
                        let params = params.clone();
                        let ret = (**ret).clone();
                        if arg_types.len() != params.len() {
                            self.sink.emit(Diagnostic::new(
                                position.clone(),
                                DiagnosticKind::BadArgCount { name: name.clone(), expected: params.len(), given: arg_types.len() },
                            ));
                            return Type::Error;
                        }
                        self.check_positional_args(&params, &arg_types, name, position);
                        ret
                    }
                    _ => {
                        self.sink.emit(Diagnostic::new(position.clone(), DiagnosticKind::NotCallable { name: name.clone() }));
                        Type::Error
                    }
                }
            }
        }
    }

    fn check_call_args(&mut self, method_sym: SymbolId, arg_types: &[Type], name: &str, pos: &Position) -> Type {
        let (params, ret) = match &self.symbols.symbol(method_sym).kind {
            SymbolKind::Method { signature: Type::Fun(ret, params), .. } => (params.clone(), (**ret).clone()),
            _ => return Type::Error,
        };
        if arg_types.len() != params.len() {
            self.sink.emit(Diagnostic::new(pos.clone(), DiagnosticKind::BadArgCount { name: name.to_string(), expected: params.len(), given: arg_types.len() }));
            return Type::Error;
        }
        self.check_positional_args(&params, arg_types, name, pos);
        ret
    }

    fn check_positional_args(&mut self, params: &[Type], args: &[Type], name: &str, pos: &Position) {
        for (i, (p, a)) in params.iter().zip(args.iter()).enumerate() {
            if a.no_error() && p.no_error() && !a.subtype_of(p, &*self.symbols) {
                self.sink.emit(Diagnostic::new(
                    pos.clone(),
                    DiagnosticKind::BadArgType {
                        context: BadArgTypeContext::Call { name: name.to_string(), index: i },
                        expected: p.to_string(),
                        actual: a.to_string(),
                    },
                ));
            }
        }
    }

    fn type_lambda(&mut self, lambda: &mut LambdaExpr) -> Type {
        let Some(lambda_sym) = lambda.symbol else { return Type::Error };
        let scope = lambda.scope.expect("naming assigns a scope to every lambda");
        self.stack.open_lambda(scope, lambda_sym);

        let mut body_returns = true;
        let expr_ty = match &mut lambda.body {
            LambdaBody::Expr(e) => {
                let t = self.type_expr(e);
                if let SymbolKind::Lambda { return_types, .. } = &mut self.symbols.symbol_mut(lambda_sym).kind {
                    return_types.push(t.clone());
                }
                Some(t)
            }
            LambdaBody::Block(b) => {
                self.check_block(b);
                body_returns = b.returns;
                None
            }
        };

        let return_types = match &self.symbols.symbol(lambda_sym).kind {
            SymbolKind::Lambda { return_types, .. } => return_types.clone(),
            _ => Vec::new(),
        };
        let inferred_ret = if return_types.is_empty() {
            Type::Void
        } else {
            if return_types.iter().any(|t| !t.is_void()) && !body_returns {
                self.sink.emit(Diagnostic::new(lambda.position.clone(), DiagnosticKind::MissingReturn));
            }
            let joined = types::join(&return_types, &*self.symbols);
            if joined.is_error() && return_types.len() > 1 {
                self.sink.emit(Diagnostic::new(lambda.position.clone(), DiagnosticKind::IncompatibleReturn));
            }
            joined
        };

        let params: Vec<Type> = match &self.symbols.symbol(lambda_sym).kind {
            SymbolKind::Lambda { signature: Type::Fun(_, params), .. } => params.clone(),
            _ => Vec::new(),
        };
        if let SymbolKind::Lambda { signature, .. } = &mut self.symbols.symbol_mut(lambda_sym).kind {
            *signature = Type::fun(inferred_ret.clone(), params.clone());
        }

        self.stack.close_lambda(self.symbols);

        let _ = expr_ty;
        Type::fun(inferred_ret, params)
    }
}
