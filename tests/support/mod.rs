//! Shared fixture builders for the integration tests: small AST literals
//! built by hand, since parsing is out of scope for this crate (§1).

use jagannath_semck::ast::*;
use jagannath_semck::position::Position;
use std::cell::Cell;

pub fn pos(line: u32, col: u32) -> Position {
    Position::new(line, col)
}

thread_local! {
    /// Each builder call below advances this by one "line" instead of
    /// reusing a single `(1, 1)` for every node. Real parser positions are
    /// monotonically increasing in source order; sharing one dummy position
    /// across a whole fixture would make every position-ordering check
    /// (`lookup_before`'s declaration-before-use test, the `defining`-map
    /// self-reference guard) vacuously true regardless of whether the guard
    /// actually does anything.
    static NEXT_LINE: Cell<u32> = Cell::new(1);
}

fn next_pos() -> Position {
    NEXT_LINE.with(|n| {
        let line = n.get();
        n.set(line + 1);
        Position::new(line, 1)
    })
}

pub fn expr(kind: ExprKind) -> Expr {
    Expr::new(kind, next_pos())
}

pub fn int_lit(v: i64) -> Expr {
    expr(ExprKind::IntLit(v))
}

pub fn bool_lit(v: bool) -> Expr {
    expr(ExprKind::BoolLit(v))
}

pub fn var(name: &str) -> Expr {
    expr(ExprKind::VarSel { receiver: None, name: name.to_string(), symbol: None, is_class_name: false })
}

pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    expr(ExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) })
}

pub fn assign(lhs: Expr, rhs: Expr) -> Stmt {
    Stmt::Assign(AssignStmt { lhs, rhs, position: next_pos() })
}

pub fn expr_stmt(e: Expr) -> Stmt {
    Stmt::ExprStmt(ExprStmt { expr: e, position: next_pos() })
}

/// `init` is a thunk rather than a plain `Expr` so its position (and the
/// positions of anything nested inside it) is allocated *after* this
/// definition's own `position` — matching a real parser, where the
/// declaration's tokens precede the initializer's. Building `init` eagerly
/// as a by-value argument would number it first (Rust evaluates call
/// arguments before the callee body runs), which would put `var x = x;`'s
/// declaration after its own self-reference and mask the `defining`-map
/// guard behind the position check alone.
pub fn local_var(name: &str, declared_type: Option<TypeAnnotation>, init: impl FnOnce() -> Option<Expr>) -> Stmt {
    let position = next_pos();
    let init = init();
    Stmt::LocalVarDef(LocalVarDef { name: name.to_string(), declared_type, init, position, symbol: None })
}

pub fn ret(value: Option<Expr>) -> Stmt {
    Stmt::Return(ReturnStmt { value, position: next_pos(), returns: false })
}

pub fn block(statements: Vec<Stmt>) -> Block {
    Block { statements, position: next_pos(), scope: None, returns: false }
}

pub fn method(name: &str, is_static: bool, params: Vec<Param>, return_type: TypeAnnotation, body: Vec<Stmt>) -> MethodDecl {
    MethodDecl {
        name: name.to_string(),
        is_static,
        is_abstract: false,
        params,
        return_type,
        body: Some(block(body)),
        position: next_pos(),
        symbol: None,
        formal_scope: None,
    }
}

pub fn abstract_method(name: &str, return_type: TypeAnnotation) -> MethodDecl {
    MethodDecl {
        name: name.to_string(),
        is_static: false,
        is_abstract: true,
        params: Vec::new(),
        return_type,
        body: None,
        position: next_pos(),
        symbol: None,
        formal_scope: None,
    }
}

pub fn param(name: &str, ty: TypeAnnotation) -> Param {
    Param { name: name.to_string(), ty, position: next_pos(), symbol: None }
}

pub fn field(name: &str, ty: TypeAnnotation) -> FieldDecl {
    FieldDecl { name: name.to_string(), ty, position: next_pos(), symbol: None }
}

pub fn class(name: &str, parent: Option<&str>, is_abstract: bool, fields: Vec<FieldDecl>, methods: Vec<MethodDecl>) -> ClassDecl {
    ClassDecl {
        name: name.to_string(),
        parent: parent.map(str::to_string),
        is_abstract,
        fields,
        methods,
        position: next_pos(),
        symbol: None,
        scope: None,
    }
}

/// A `Main` class with a single `static void main()` method whose body is
/// `statements`, the minimal program every end-to-end scenario needs.
pub fn main_program(statements: Vec<Stmt>) -> Program {
    Program { classes: vec![class("Main", None, false, vec![], vec![method("main", true, vec![], TypeAnnotation::Void, statements)])] }
}

pub fn field_sel(receiver: Expr, name: &str) -> Expr {
    expr(ExprKind::VarSel { receiver: Some(Box::new(receiver)), name: name.to_string(), symbol: None, is_class_name: false })
}

pub fn new_class(name: &str) -> Expr {
    expr(ExprKind::NewClass { name: name.to_string(), symbol: None })
}

pub fn call_name(name: &str, args: Vec<Expr>) -> Expr {
    expr(ExprKind::Call(CallExpr {
        callee: Callee::Name { name: name.to_string(), position: next_pos() },
        args,
        is_method: false,
        is_class_name: false,
        is_array_length: false,
        return_type: None,
        symbol: None,
    }))
}

pub fn lambda_expr_bodied(params: Vec<Param>, body: Expr) -> Expr {
    expr(ExprKind::Lambda(LambdaExpr { params, body: LambdaBody::Expr(Box::new(body)), position: next_pos(), symbol: None, scope: None }))
}

pub fn lambda_block_bodied(params: Vec<Param>, body: Vec<Stmt>) -> Expr {
    expr(ExprKind::Lambda(LambdaExpr { params, body: LambdaBody::Block(block(body)), position: next_pos(), symbol: None, scope: None }))
}

pub fn if_stmt(cond: Expr, then_branch: Stmt, else_branch: Option<Stmt>) -> Stmt {
    Stmt::If(IfStmt { cond, then_branch: Box::new(then_branch), else_branch: else_branch.map(Box::new), position: next_pos(), returns: false })
}
