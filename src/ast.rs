//! Abstract syntax tree for the source language (§6 "Input").
//!
//! Produced by an external parser (out of scope, per §1) and handed to us as
//! a fully-formed tree with positions already attached. Every node that
//! Naming or Typing annotates carries the annotation fields directly as
//! `Option`s, defaulted to `None` on the way in and filled in place as the
//! two passes walk the tree — this is what makes the "driver contract" in
//! §6 (`AST -> AST`, pure modulo the diagnostic side channel) concrete: we
//! take ownership of the tree, mutate it, and hand the same tree back.

use crate::position::Position;
use crate::symbols::{ScopeId, SymbolId};
use crate::types::Type;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub classes: Vec<ClassDecl>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    pub parent: Option<String>,
    pub is_abstract: bool,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
    pub position: Position,
    #[serde(default)]
    pub symbol: Option<SymbolId>,
    #[serde(default)]
    pub scope: Option<ScopeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeAnnotation,
    pub position: Position,
    #[serde(default)]
    pub symbol: Option<SymbolId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    pub is_static: bool,
    pub is_abstract: bool,
    pub params: Vec<Param>,
    pub return_type: TypeAnnotation,
    pub body: Option<Block>,
    pub position: Position,
    #[serde(default)]
    pub symbol: Option<SymbolId>,
    #[serde(default)]
    pub formal_scope: Option<ScopeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeAnnotation,
    pub position: Position,
    #[serde(default)]
    pub symbol: Option<SymbolId>,
}

/// Syntax for a type as written, before names resolve to [`Type`]s. Kept
/// distinct so a `TFun` literal like `int(bool, int)` can be printed and
/// compared textually even before the classes it mentions are known to
/// exist (§4.1, §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TypeAnnotation {
    Int,
    Bool,
    String,
    Void,
    Class(String),
    Array(Box<TypeAnnotation>),
    Fun(Box<TypeAnnotation>, Vec<TypeAnnotation>),
}

impl fmt::Display for TypeAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeAnnotation::Int => write!(f, "int"),
            TypeAnnotation::Bool => write!(f, "bool"),
            TypeAnnotation::String => write!(f, "string"),
            TypeAnnotation::Void => write!(f, "void"),
            TypeAnnotation::Class(name) => write!(f, "class {}", name),
            TypeAnnotation::Array(elem) => write!(f, "{}[]", elem),
            TypeAnnotation::Fun(ret, params) => {
                write!(f, "{}(", ret)?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub position: Position,
    #[serde(default)]
    pub scope: Option<ScopeId>,
    #[serde(default)]
    pub returns: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    Block(Block),
    LocalVarDef(LocalVarDef),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    Return(ReturnStmt),
    Break(Position),
    ExprStmt(ExprStmt),
    Print(PrintStmt),
    Assign(AssignStmt),
}

impl Stmt {
    pub fn position(&self) -> &Position {
        match self {
            Stmt::Block(b) => &b.position,
            Stmt::LocalVarDef(d) => &d.position,
            Stmt::If(s) => &s.position,
            Stmt::While(s) => &s.position,
            Stmt::For(s) => &s.position,
            Stmt::Return(s) => &s.position,
            Stmt::Break(p) => p,
            Stmt::ExprStmt(s) => &s.position,
            Stmt::Print(s) => &s.position,
            Stmt::Assign(s) => &s.position,
        }
    }

    /// Definite-return flag (§4.5). Kinds that can never definitely return
    /// on their own (`break`, bare expressions, assignments, prints, `var`
    /// defs, `while`/`for` loops whose bodies might not execute) report
    /// `false` rather than carrying a settable field.
    pub fn returns(&self) -> bool {
        match self {
            Stmt::Block(b) => b.returns,
            Stmt::If(s) => s.returns,
            Stmt::Return(s) => s.returns,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalVarDef {
    pub name: String,
    /// `None` for a `var` declaration, whose type is inferred from `init`.
    pub declared_type: Option<TypeAnnotation>,
    pub init: Option<Expr>,
    pub position: Position,
    #[serde(default)]
    pub symbol: Option<SymbolId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfStmt {
    pub cond: Expr,
    pub then_branch: Box<Stmt>,
    pub else_branch: Option<Box<Stmt>>,
    pub position: Position,
    #[serde(default)]
    pub returns: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhileStmt {
    pub cond: Expr,
    pub body: Box<Stmt>,
    pub position: Position,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForStmt {
    pub init: Box<Stmt>,
    pub cond: Expr,
    pub update: Box<Stmt>,
    pub body: Box<Stmt>,
    pub position: Position,
    #[serde(default)]
    pub scope: Option<ScopeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub position: Position,
    #[serde(default)]
    pub returns: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExprStmt {
    pub expr: Expr,
    pub position: Position,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintStmt {
    pub args: Vec<Expr>,
    pub position: Position,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignStmt {
    pub lhs: Expr,
    pub rhs: Expr,
    pub position: Position,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub position: Position,
    #[serde(default)]
    pub ty: Option<Type>,
}

impl Expr {
    pub fn new(kind: ExprKind, position: Position) -> Self {
        Self { kind, position, ty: None }
    }

    pub fn ty(&self) -> Type {
        self.ty.clone().unwrap_or(Type::Error)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    IntLit(i64),
    BoolLit(bool),
    StringLit(String),
    NullLit,
    ReadInt,
    ReadLine,
    This {
        #[serde(default)]
        symbol: Option<SymbolId>,
    },
    VarSel {
        receiver: Option<Box<Expr>>,
        name: String,
        #[serde(default)]
        symbol: Option<SymbolId>,
        #[serde(default)]
        is_class_name: bool,
    },
    IndexSel {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    NewClass {
        name: String,
        #[serde(default)]
        symbol: Option<SymbolId>,
    },
    NewArray {
        elem_type: TypeAnnotation,
        length: Box<Expr>,
    },
    Call(CallExpr),
    ClassTest {
        expr: Box<Expr>,
        class_name: String,
    },
    ClassCast {
        expr: Box<Expr>,
        class_name: String,
    },
    Lambda(LambdaExpr),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallExpr {
    pub callee: Callee,
    pub args: Vec<Expr>,
    /// Output annotations distinguishing dispatch shape for the lowering
    /// phase (§6 "Output"): `isMethod`, `isClassName`, `isArrayLength`,
    /// `returnType`.
    #[serde(default)]
    pub is_method: bool,
    #[serde(default)]
    pub is_class_name: bool,
    #[serde(default)]
    pub is_array_length: bool,
    #[serde(default)]
    pub return_type: Option<Type>,
    #[serde(default)]
    pub symbol: Option<SymbolId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Callee {
    /// `expr.length()`: intrinsic, only legal with zero arguments.
    Length { receiver: Box<Expr> },
    /// `ClassName.method(args)`: static dispatch.
    Static { class_name: String, method: String, position: Position },
    /// Unqualified `name(args)`: a method in the enclosing class, or a
    /// local/captured callable — including an immediately invoked lambda.
    Name { name: String, position: Position },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LambdaExpr {
    pub params: Vec<Param>,
    pub body: LambdaBody,
    pub position: Position,
    #[serde(default)]
    pub symbol: Option<SymbolId>,
    #[serde(default)]
    pub scope: Option<ScopeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LambdaBody {
    Expr(Box<Expr>),
    Block(Block),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        })
    }
}
