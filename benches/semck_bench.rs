//! Benchmarks for the Naming and Typing passes (§2's implementation-budget
//! note, ambient-performance-tooling counterpart per SPEC_FULL).
//!
//! Builds synthetic AST fixtures directly (no parser lives in this crate,
//! §1), at a few class-hierarchy depths, and times `CompilerSession::run`
//! end to end.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use jagannath_semck::ast::*;
use jagannath_semck::position::Position;
use jagannath_semck::{CompilerSession, Target};

fn pos() -> Position {
    Position::new(1, 1)
}

fn int_field(name: &str) -> FieldDecl {
    FieldDecl { name: name.to_string(), ty: TypeAnnotation::Int, position: pos(), symbol: None }
}

/// A method `get<i>() { return this.field<i> + 1; }`, read-modify-ish body
/// shaped to walk the typical VarSel/Binary/Return expression kinds.
fn getter_method(i: usize) -> MethodDecl {
    let field_name = format!("field{i}");
    let body = Block {
        statements: vec![Stmt::Return(ReturnStmt {
            value: Some(Expr::new(
                ExprKind::Binary {
                    op: BinaryOp::Add,
                    lhs: Box::new(Expr::new(
                        ExprKind::VarSel { receiver: None, name: field_name, symbol: None, is_class_name: false },
                        pos(),
                    )),
                    rhs: Box::new(Expr::new(ExprKind::IntLit(1), pos())),
                },
                pos(),
            )),
            position: pos(),
            returns: false,
        })],
        position: pos(),
        scope: None,
        returns: false,
    };
    MethodDecl {
        name: format!("get{i}"),
        is_static: false,
        is_abstract: false,
        params: Vec::new(),
        return_type: TypeAnnotation::Int,
        body: Some(body),
        position: pos(),
        symbol: None,
        formal_scope: None,
    }
}

/// A linear inheritance chain `C0 <- C1 <- ... <- C(depth-1)`, each class
/// with one field and one getter method, exercising class-graph
/// construction, parent-first symbol creation, and override-free member
/// resolution at the requested depth.
fn linear_hierarchy(depth: usize) -> Program {
    let mut classes = Vec::with_capacity(depth + 1);
    for i in 0..depth {
        let parent = if i == 0 { None } else { Some(format!("C{}", i - 1)) };
        classes.push(ClassDecl {
            name: format!("C{i}"),
            parent,
            is_abstract: false,
            fields: vec![int_field(&format!("field{i}"))],
            methods: vec![getter_method(i)],
            position: pos(),
            symbol: None,
            scope: None,
        });
    }
    classes.push(ClassDecl {
        name: "Main".to_string(),
        parent: None,
        is_abstract: false,
        fields: Vec::new(),
        methods: vec![MethodDecl {
            name: "main".to_string(),
            is_static: true,
            is_abstract: false,
            params: Vec::new(),
            return_type: TypeAnnotation::Void,
            body: Some(Block { statements: Vec::new(), position: pos(), scope: None, returns: false }),
            position: pos(),
            symbol: None,
            formal_scope: None,
        }],
        position: pos(),
        symbol: None,
        scope: None,
    });
    Program { classes }
}

/// A single method body with `depth` lambdas nested inside one another,
/// each capturing the same outer local — the shape that stresses
/// §4.6 capture propagation the most.
fn nested_lambda_program(depth: usize) -> Program {
    let mut innermost = Expr::new(
        ExprKind::VarSel { receiver: None, name: "shared".to_string(), symbol: None, is_class_name: false },
        pos(),
    );
    for _ in 0..depth {
        innermost = Expr::new(
            ExprKind::Lambda(LambdaExpr {
                params: Vec::new(),
                body: LambdaBody::Expr(Box::new(innermost)),
                position: pos(),
                symbol: None,
                scope: None,
            }),
            pos(),
        );
    }
    let main_body = Block {
        statements: vec![
            Stmt::LocalVarDef(LocalVarDef {
                name: "shared".to_string(),
                declared_type: Some(TypeAnnotation::Int),
                init: Some(Expr::new(ExprKind::IntLit(0), pos())),
                position: pos(),
                symbol: None,
            }),
            Stmt::LocalVarDef(LocalVarDef {
                name: "f".to_string(),
                declared_type: None,
                init: Some(innermost),
                position: pos(),
                symbol: None,
            }),
        ],
        position: pos(),
        scope: None,
        returns: false,
    };
    Program {
        classes: vec![ClassDecl {
            name: "Main".to_string(),
            parent: None,
            is_abstract: false,
            fields: Vec::new(),
            methods: vec![MethodDecl {
                name: "main".to_string(),
                is_static: true,
                is_abstract: false,
                params: Vec::new(),
                return_type: TypeAnnotation::Void,
                body: Some(main_body),
                position: pos(),
                symbol: None,
                formal_scope: None,
            }],
            position: pos(),
            symbol: None,
            scope: None,
        }],
    }
}

fn bench_linear_hierarchy(c: &mut Criterion) {
    let mut group = c.benchmark_group("LinearHierarchy");
    for depth in [4usize, 16, 64] {
        group.throughput(Throughput::Elements(depth as u64));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter_batched(
                || linear_hierarchy(depth),
                |mut program| {
                    let output = CompilerSession::new(Target::TypeCheck).run(black_box(&mut program));
                    black_box(output);
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_nested_lambdas(c: &mut Criterion) {
    let mut group = c.benchmark_group("NestedLambdaCapture");
    for depth in [2usize, 8, 32] {
        group.throughput(Throughput::Elements(depth as u64));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter_batched(
                || nested_lambda_program(depth),
                |mut program| {
                    let output = CompilerSession::new(Target::TypeCheck).run(black_box(&mut program));
                    black_box(output);
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_linear_hierarchy, bench_nested_lambdas);
criterion_main!(benches);
