//! Diagnostic taxonomy (§7) and wire format (§6).
//!
//! A closed, enumerated set of violation kinds, each carrying exactly the
//! fields its message needs. `Display` prints the oracle-checked compact
//! form; [`rich`] offers a friendlier rendering for humans via `ariadne` on
//! top of the same data.

pub mod rich;
pub mod sink;

use crate::position::Position;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub position: Position,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(position: Position, kind: DiagnosticKind) -> Self {
        Self { position, kind }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "*** Error at ({},{}): {}", self.position.line, self.position.column, self.kind)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DiagnosticKind {
    DeclConflict { name: String },
    OverridingVar { name: String },
    ClassNotFound { name: String },
    BadInheritance { class: String },
    BadOverride { method: String, class: String },
    BadAbstractMethod { class: String },
    NewAbstractClass { class: String },
    BadVarType { name: String },
    AssignVarVoid { name: String },
    BadArrElement,
    VoidAsPara,
    IncompatBinOp { op: String, lhs: String, rhs: String },
    IncompatUnOp { op: String, operand: String },
    BadTestExpr,
    BreakOutOfLoop,
    MissingReturn,
    BadReturnType { expected: String, actual: String },
    IncompatibleReturn,
    BadArgCount { name: String, expected: usize, given: usize },
    BadArgType { context: BadArgTypeContext, expected: String, actual: String },
    BadLengthArg,
    NotCallable { name: String },
    NotArray,
    NotClass { name: String },
    UndeclVar { name: String },
    FieldNotFound { field: String, class: String },
    FieldNotAccess { field: String, class: String },
    NotClassField { name: String },
    AssignMethod { name: String },
    AssignCapture { name: String },
    ThisInStaticFunc,
    RefNonStatic { name: String },
    NoMainClass,
    BadCountArgLambda { expected: usize, given: usize },
    BadNewArrayLength,
}

/// Which construct a [`DiagnosticKind::BadArgType`] subtype failure was
/// raised for — `BadArgType` stays the one taxonomy entry for "value of type
/// A given where type B was required" (§7), but a call argument, a `var`
/// initializer, an assignment, and an array index each read differently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BadArgTypeContext {
    Call { name: String, index: usize },
    VarInit { name: String },
    Assign,
    Index,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use DiagnosticKind::*;
        match self {
            DeclConflict { name } => write!(f, "{} is already declared", name),
            OverridingVar { name } => {
                write!(f, "variable '{}' shadows a member of the same name in an ancestor class", name)
            }
            ClassNotFound { name } => write!(f, "class '{}' not found", name),
            BadInheritance { class } => {
                write!(f, "illegal class inheritance (class '{}' is part of a cycle)", class)
            }
            BadOverride { method, class } => {
                write!(f, "overriding method '{}' doesn't match the type signature in class '{}'", method, class)
            }
            BadAbstractMethod { class } => {
                write!(f, "'{}' is not abstract and does not override all abstract methods", class)
            }
            NewAbstractClass { class } => write!(f, "cannot instantiate abstract class '{}'", class),
            BadVarType { name } => write!(f, "variable '{}' cannot be of type void", name),
            AssignVarVoid { name } => write!(f, "inferred type of initializer for '{}' is void", name),
            BadArrElement => write!(f, "array element type must not be void"),
            VoidAsPara => write!(f, "function type parameter cannot be void"),
            IncompatBinOp { op, lhs, rhs } => write!(f, "incompatible operands: {} {} {}", lhs, op, rhs),
            IncompatUnOp { op, operand } => write!(f, "incompatible operand: {} {}", op, operand),
            BadTestExpr => write!(f, "test expression must have bool type"),
            BreakOutOfLoop => write!(f, "'break' is only allowed inside a loop"),
            MissingReturn => write!(f, "missing return statement: control reaches end of non-void block"),
            BadReturnType { expected, actual } => {
                write!(f, "incompatible return type: expected '{}' but got '{}'", expected, actual)
            }
            IncompatibleReturn => write!(f, "incompatible return types in blocked expression"),
            BadArgCount { name, expected, given } => {
                write!(f, "function '{}' expects {} argument(s) but {} given", name, expected, given)
            }
            BadArgType { context, expected, actual } => match context {
                BadArgTypeContext::Call { name, index } => write!(
                    f,
                    "function '{}' expects argument {} of type '{}' but '{}' given",
                    name, index, expected, actual
                ),
                BadArgTypeContext::VarInit { name } => write!(
                    f,
                    "variable '{}' is declared with type '{}' but initialized with '{}'",
                    name, expected, actual
                ),
                BadArgTypeContext::Assign => {
                    write!(f, "incompatible types in assignment: expected '{}' but '{}' given", expected, actual)
                }
                BadArgTypeContext::Index => write!(f, "array index must be of type 'int' but '{}' given", actual),
            },
            BadLengthArg => write!(f, "function 'length' expects 0 argument(s)"),
            NotCallable { name } => write!(f, "'{}' is not a function", name),
            NotArray => write!(f, "'[]' can only be applied to arrays"),
            NotClass { name } => write!(f, "'{}' is not a class type", name),
            UndeclVar { name } => write!(f, "undeclared variable '{}'", name),
            FieldNotFound { field, class } => write!(f, "field '{}' not found in class '{}'", field, class),
            FieldNotAccess { field, class } => {
                write!(f, "field '{}' of 'class {}' not accessible here", field, class)
            }
            NotClassField { name } => write!(f, "'{}' is not accessible in this context", name),
            AssignMethod { name } => write!(f, "cannot assign to method '{}'", name),
            AssignCapture { name } => {
                write!(f, "cannot assign to captured variable '{}' from within a lambda", name)
            }
            ThisInStaticFunc => write!(f, "'this' cannot be used in a static method"),
            RefNonStatic { name } => {
                write!(f, "cannot reference non-static field '{}' from a static method", name)
            }
            NoMainClass => write!(f, "missing 'Main' class with a static, no-argument 'main' method"),
            BadCountArgLambda { expected, given } => {
                write!(f, "lambda expects {} argument(s) but {} given", expected, given)
            }
            BadNewArrayLength => write!(f, "new array length must be of type int"),
        }
    }
}
