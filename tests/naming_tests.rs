//! Integration tests for the Naming pass (§4.4, §8).

mod support;

use jagannath_semck::ast::TypeAnnotation;
use jagannath_semck::diagnostics::DiagnosticKind;
use jagannath_semck::naming;
use support::*;

#[test]
fn empty_main_body_names_cleanly() {
    let mut program = main_program(vec![]);
    let out = naming::run(&mut program);
    assert!(out.diagnostics.is_empty());
    assert!(out.main_method.is_some());
}

#[test]
fn missing_main_class_is_reported() {
    let mut program = jagannath_semck::ast::Program { classes: vec![class("NotMain", None, false, vec![], vec![])] };
    let out = naming::run(&mut program);
    assert!(matches!(out.diagnostics[0].kind, DiagnosticKind::NoMainClass));
    assert!(out.main_method.is_none());
}

#[test]
fn duplicate_class_declaration_conflicts() {
    let mut program = jagannath_semck::ast::Program {
        classes: vec![
            class("A", None, false, vec![], vec![]),
            class("A", None, false, vec![], vec![]),
            class("Main", None, false, vec![], vec![method("main", true, vec![], TypeAnnotation::Void, vec![])]),
        ],
    };
    let out = naming::run(&mut program);
    assert!(out.diagnostics.iter().any(|d| matches!(d.kind, DiagnosticKind::DeclConflict { ref name } if name == "A")));
    // Naming aborts member resolution once the class graph has an error.
    assert!(out.main_method.is_none());
}

#[test]
fn unknown_parent_is_class_not_found() {
    let mut program = jagannath_semck::ast::Program { classes: vec![class("B", Some("Ghost"), false, vec![], vec![])] };
    let out = naming::run(&mut program);
    assert!(out.diagnostics.iter().any(|d| matches!(d.kind, DiagnosticKind::ClassNotFound { ref name } if name == "Ghost")));
}

#[test]
fn self_inheritance_cycle_is_bad_inheritance() {
    let mut program = cyclic_inheritance_program();
    let out = naming::run(&mut program);
    assert!(out.diagnostics.iter().any(|d| matches!(d.kind, DiagnosticKind::BadInheritance { .. })));
}

fn cyclic_inheritance_program() -> jagannath_semck::ast::Program {
    jagannath_semck::ast::Program {
        classes: vec![class("A", Some("B"), false, vec![], vec![]), class("B", Some("A"), false, vec![], vec![])],
    }
}

/// §8 scenario 2: a non-abstract subclass that doesn't override every
/// inherited abstract method.
#[test]
fn non_abstract_subclass_missing_override_is_bad_abstract_method() {
    let mut program = jagannath_semck::ast::Program {
        classes: vec![
            class("A", None, true, vec![], vec![abstract_method("f", TypeAnnotation::Void)]),
            class("B", Some("A"), false, vec![], vec![]),
        ],
    };
    let out = naming::run(&mut program);
    assert!(out.diagnostics.iter().any(|d| matches!(&d.kind, DiagnosticKind::BadAbstractMethod { class } if class == "B")));
}

/// A 3-level hierarchy where the middle class concretely overrides an
/// abstract method: the leaf class inherits the concrete override, not the
/// grandparent's abstract declaration, so it reports nothing.
#[test]
fn concrete_override_on_intermediate_ancestor_satisfies_leaf_class() {
    let mut program = jagannath_semck::ast::Program {
        classes: vec![
            class("A", None, true, vec![], vec![abstract_method("f", TypeAnnotation::Void)]),
            class("B", Some("A"), false, vec![], vec![method("f", false, vec![], TypeAnnotation::Void, vec![])]),
            class("C", Some("B"), false, vec![], vec![]),
        ],
    };
    let out = naming::run(&mut program);
    assert!(out.diagnostics.is_empty());
}

#[test]
fn overriding_method_with_narrower_param_is_bad_override() {
    let mut program = jagannath_semck::ast::Program {
        classes: vec![
            class("A", None, false, vec![], vec![method("f", false, vec![param("x", TypeAnnotation::Class("A".to_string()))], TypeAnnotation::Void, vec![])]),
            class(
                "B",
                Some("A"),
                false,
                vec![],
                vec![method("f", false, vec![param("x", TypeAnnotation::Class("B".to_string()))], TypeAnnotation::Void, vec![])],
            ),
        ],
    };
    let out = naming::run(&mut program);
    assert!(out.diagnostics.iter().any(|d| matches!(&d.kind, DiagnosticKind::BadOverride { class, .. } if class == "B")));
}

#[test]
fn field_shadowing_ancestor_variable_is_overriding_var() {
    let mut program = jagannath_semck::ast::Program {
        classes: vec![
            class("A", None, false, vec![field("x", TypeAnnotation::Int)], vec![]),
            class("B", Some("A"), false, vec![field("x", TypeAnnotation::Int)], vec![]),
        ],
    };
    let out = naming::run(&mut program);
    assert!(out.diagnostics.iter().any(|d| matches!(&d.kind, DiagnosticKind::OverridingVar { name } if name == "x")));
}

#[test]
fn duplicate_local_in_same_block_is_decl_conflict() {
    let mut program = main_program(vec![
        local_var("x", Some(TypeAnnotation::Int), || Some(int_lit(1))),
        local_var("x", Some(TypeAnnotation::Int), || Some(int_lit(2))),
    ]);
    let out = naming::run(&mut program);
    assert!(out.diagnostics.iter().any(|d| matches!(&d.kind, DiagnosticKind::DeclConflict { name } if name == "x")));
}

#[test]
fn void_typed_local_is_bad_var_type() {
    let mut program = main_program(vec![local_var("x", Some(TypeAnnotation::Void), || None)]);
    let out = naming::run(&mut program);
    assert!(out.diagnostics.iter().any(|d| matches!(&d.kind, DiagnosticKind::BadVarType { name } if name == "x")));
}
