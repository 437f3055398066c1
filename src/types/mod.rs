//! Type algebra (Prakāra Parīkṣaka's substrate).
//!
//! Value types, their structural equality, the subtype lattice, and the
//! `join`/`meet` bounds used to infer lambda return types. `error` is the
//! absorbing sentinel: subtype of and supertype of everything, so that one
//! reported mistake never cascades into a pile of follow-on diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A resolved, semantic type. Distinct from [`TypeAnnotation`](crate::ast::TypeAnnotation),
/// which is the as-written syntax before names are resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    Int,
    Bool,
    String,
    Void,
    Null,
    /// Absorbing sentinel produced once a violation has already been
    /// reported for this expression; suppresses downstream cascades.
    Error,
    Array(Box<Type>),
    Fun(Box<Type>, Vec<Type>),
    Class(String),
    /// A function-type *literal*, as it appears in a type annotation (e.g.
    /// `int(bool, int)`). Compared only by its printed textual form, per
    /// §9's open question: the source language used textual equality for
    /// these literals while the rest of the algebra is structural, and nothing
    /// in the spec asks us to unify the two. Kept as a distinct variant so
    /// literal annotations can be compared before class symbols resolve.
    FunLiteral(String),
}

impl Type {
    pub fn array(elem: Type) -> Type {
        Type::Array(Box::new(elem))
    }

    pub fn fun(ret: Type, params: Vec<Type>) -> Type {
        Type::Fun(Box::new(ret), params)
    }

    pub fn class(name: impl Into<String>) -> Type {
        Type::Class(name.into())
    }

    pub fn is_class(&self) -> bool {
        matches!(self, Type::Class(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(_))
    }

    pub fn is_fun(&self) -> bool {
        matches!(self, Type::Fun(_, _))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    /// Int/bool/string/void/null: the types with no further structure.
    pub fn is_base(&self) -> bool {
        matches!(self, Type::Int | Type::Bool | Type::String | Type::Void | Type::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    /// `noError`: true unless this type (or one reachable through it) is the
    /// error sentinel. Array/function types are only error-free if every
    /// component is.
    pub fn no_error(&self) -> bool {
        match self {
            Type::Error => false,
            Type::Array(elem) => elem.no_error(),
            Type::Fun(ret, params) => ret.no_error() && params.iter().all(Type::no_error),
            _ => true,
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            Type::Class(name) => Some(name),
            _ => None,
        }
    }

    /// `subtypeOf`: reflexive; `null <: C`; `C <: D` when `D` is a transitive
    /// ancestor of `C`; function types are covariant in result and
    /// contravariant in parameters; `error` is subtype and supertype of
    /// everything.
    pub fn subtype_of(&self, other: &Type, classes: &dyn ClassAncestry) -> bool {
        if self.is_error() || other.is_error() {
            return true;
        }
        if self == other {
            return true;
        }
        match (self, other) {
            (Type::Null, Type::Class(_)) => true,
            (Type::Class(sub), Type::Class(sup)) => classes.is_ancestor(sup, sub),
            (Type::Fun(r1, a1), Type::Fun(r2, a2)) => {
                a1.len() == a2.len()
                    && r1.subtype_of(r2, classes)
                    && a2.iter().zip(a1.iter()).all(|(a2i, a1i)| a2i.subtype_of(a1i, classes))
            }
            _ => false,
        }
    }
}

/// Class-hierarchy lookups needed by the type algebra, implemented by the
/// naming pass's class table. Keeping this as a trait (rather than importing
/// `symbols::SymbolTable` here) keeps the type algebra a leaf module with no
/// dependency on the scope/symbol graph it is checked against.
pub trait ClassAncestry {
    /// True if `ancestor` is `class` itself or a transitive parent of it.
    fn is_ancestor(&self, ancestor: &str, class: &str) -> bool;

    /// The class's immediate parent, if any.
    fn parent_of(&self, class: &str) -> Option<String>;
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Bool => write!(f, "bool"),
            Type::String => write!(f, "string"),
            Type::Void => write!(f, "void"),
            Type::Null => write!(f, "null"),
            Type::Error => write!(f, "error"),
            Type::Array(elem) => write!(f, "{}[]", elem),
            Type::Class(name) => write!(f, "class {}", name),
            Type::Fun(ret, params) => {
                write!(f, "{}(", ret)?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ")")
            }
            Type::FunLiteral(text) => write!(f, "{}", text),
        }
    }
}

/// Upper bound (least common supertype) of a non-empty set of types.
/// Total: returns `Type::Error` rather than panicking when no bound exists.
pub fn join(types: &[Type], classes: &dyn ClassAncestry) -> Type {
    bound(types, classes, true)
}

/// Lower bound (greatest common subtype) of a non-empty set of types.
pub fn meet(types: &[Type], classes: &dyn ClassAncestry) -> Type {
    bound(types, classes, false)
}

fn bound(types: &[Type], classes: &dyn ClassAncestry, upper: bool) -> Type {
    assert!(!types.is_empty(), "join/meet require at least one type");
    if types.iter().any(Type::is_error) {
        return Type::Error;
    }
    // Reflexive case: a set of pairwise-equal types (of any shape, including
    // array) is trivially its own bound. This subsumes the singleton case and
    // the spec's explicit "all equal and base/void" rule.
    if types.iter().all(|t| t == &types[0]) {
        return types[0].clone();
    }
    if types.iter().all(|t| t.is_class() || *t == Type::Null) {
        return class_bound(types, classes, upper);
    }
    if types.iter().all(Type::is_fun) {
        return fun_bound(types, classes, upper);
    }
    Type::Error
}

fn class_bound(types: &[Type], classes: &dyn ClassAncestry, upper: bool) -> Type {
    let named: Vec<&str> = types.iter().filter_map(Type::class_name).collect();
    if named.is_empty() {
        // All inputs were `null`.
        return Type::Null;
    }
    if upper {
        // Walk the first named class's ancestor chain (inclusive) until
        // every input is a subtype of the candidate.
        let start = named[0].to_string();
        let mut candidate = Some(start);
        while let Some(c) = candidate {
            if types.iter().all(|t| t.subtype_of(&Type::class(c.clone()), classes)) {
                return Type::class(c);
            }
            candidate = classes.parent_of(&c);
        }
        Type::Error
    } else {
        // The greatest lower bound of a set of classes (with null absorbed)
        // is the element that is a subtype of every other named class.
        for candidate in &named {
            if named.iter().all(|other| classes.is_ancestor(other, candidate)) {
                return Type::class(candidate.to_string());
            }
        }
        Type::Error
    }
}

fn fun_bound(types: &[Type], classes: &dyn ClassAncestry, upper: bool) -> Type {
    let arity = match &types[0] {
        Type::Fun(_, params) => params.len(),
        _ => unreachable!(),
    };
    let mut rets = Vec::with_capacity(types.len());
    let mut param_cols: Vec<Vec<Type>> = vec![Vec::with_capacity(types.len()); arity];
    for t in types {
        match t {
            Type::Fun(ret, params) if params.len() == arity => {
                rets.push((**ret).clone());
                for (col, p) in param_cols.iter_mut().zip(params.iter()) {
                    col.push(p.clone());
                }
            }
            _ => return Type::Error,
        }
    }
    let ret_bound = bound(&rets, classes, upper);
    if ret_bound.is_error() {
        return Type::Error;
    }
    // Covariant in the result, contravariant in parameters: joining a set of
    // function types joins their results but *meets* their parameters (and
    // vice versa for meet), matching subtyping's variance.
    let mut params = Vec::with_capacity(arity);
    for col in &param_cols {
        let p = bound(col, classes, !upper);
        if p.is_error() {
            return Type::Error;
        }
        params.push(p);
    }
    Type::fun(ret_bound, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeClasses(HashMap<String, Option<String>>);

    impl ClassAncestry for FakeClasses {
        fn is_ancestor(&self, ancestor: &str, class: &str) -> bool {
            let mut cur = class.to_string();
            loop {
                if cur == ancestor {
                    return true;
                }
                match self.0.get(&cur).cloned().flatten() {
                    Some(parent) => cur = parent,
                    None => return false,
                }
            }
        }

        fn parent_of(&self, class: &str) -> Option<String> {
            self.0.get(class).cloned().flatten()
        }
    }

    fn hierarchy() -> FakeClasses {
        // Object <- Animal <- Dog
        //                   <- Cat
        let mut m = HashMap::new();
        m.insert("Object".to_string(), None);
        m.insert("Animal".to_string(), Some("Object".to_string()));
        m.insert("Dog".to_string(), Some("Animal".to_string()));
        m.insert("Cat".to_string(), Some("Animal".to_string()));
        FakeClasses(m)
    }

    #[test]
    fn subtype_is_reflexive() {
        let c = hierarchy();
        assert!(Type::Int.subtype_of(&Type::Int, &c));
        assert!(Type::class("Dog").subtype_of(&Type::class("Dog"), &c));
    }

    #[test]
    fn null_is_subtype_of_any_class() {
        let c = hierarchy();
        assert!(Type::Null.subtype_of(&Type::class("Dog"), &c));
    }

    #[test]
    fn error_absorbs_both_ways() {
        let c = hierarchy();
        assert!(Type::Error.subtype_of(&Type::Int, &c));
        assert!(Type::Bool.subtype_of(&Type::Error, &c));
    }

    #[test]
    fn class_join_walks_to_common_ancestor() {
        let c = hierarchy();
        let t = join(&[Type::class("Dog"), Type::class("Cat")], &c);
        assert_eq!(t, Type::class("Animal"));
    }

    #[test]
    fn class_join_with_unrelated_classes_is_error() {
        let mut m = HashMap::new();
        m.insert("A".to_string(), None);
        m.insert("B".to_string(), None);
        let c = FakeClasses(m);
        assert_eq!(join(&[Type::class("A"), Type::class("B")], &c), Type::Error);
    }

    #[test]
    fn fun_join_is_covariant_in_result_contravariant_in_params() {
        let c = hierarchy();
        // f : (Dog) -> Dog, g : (Cat) -> Dog
        // join should meet the params (Dog meet Cat -> error, since unrelated siblings)
        let f = Type::fun(Type::class("Dog"), vec![Type::class("Dog")]);
        let g = Type::fun(Type::class("Dog"), vec![Type::class("Animal")]);
        // meet(Dog, Animal) = Dog (Dog <: Animal)
        let joined = join(&[f, g], &c);
        assert_eq!(joined, Type::fun(Type::class("Dog"), vec![Type::class("Dog")]));
    }

    #[test]
    fn function_subtyping_matches_variance_rule() {
        let c = hierarchy();
        // f : (Animal) -> Dog,  g : (Dog) -> Animal
        // f <: g iff Dog <: Animal (param contravariance, A' <: A) and Dog <: Animal (result covariance)
        let f = Type::fun(Type::class("Dog"), vec![Type::class("Animal")]);
        let g = Type::fun(Type::class("Animal"), vec![Type::class("Dog")]);
        assert!(f.subtype_of(&g, &c));
        assert!(!g.subtype_of(&f, &c));
    }

    #[test]
    fn join_result_is_at_least_each_input() {
        let c = hierarchy();
        let inputs = [Type::class("Dog"), Type::class("Cat")];
        let joined = join(&inputs, &c);
        assert!(!joined.is_error());
        for t in &inputs {
            assert!(t.subtype_of(&joined, &c));
        }
    }

    #[test]
    fn meet_result_is_at_most_each_input() {
        let c = hierarchy();
        let inputs = [Type::class("Animal"), Type::class("Animal")];
        let met = meet(&inputs, &c);
        assert!(!met.is_error());
        for t in &inputs {
            assert!(met.subtype_of(t, &c));
        }
    }

    #[test]
    fn meet_of_classes_picks_the_subtype_not_the_ancestor() {
        let c = hierarchy();
        // Object <- Animal <- Dog: the GLB of {Dog, Animal} is Dog, since Dog
        // is a subtype of Animal, not the other way around.
        let met = meet(&[Type::class("Dog"), Type::class("Animal")], &c);
        assert_eq!(met, Type::class("Dog"));
    }

    #[test]
    fn no_error_is_false_through_array_and_fun() {
        assert!(!Type::array(Type::Error).no_error());
        assert!(!Type::fun(Type::Error, vec![]).no_error());
        assert!(Type::array(Type::Int).no_error());
    }

    // §8 "Universal invariants": join/meet results bound every input under
    // `subtype_of`, and `error` comes out iff no such bound exists in the
    // lattice — exercised here over randomly generated subsets of a fixed
    // five-class forest rather than hand-picked pairs.
    mod properties {
        use super::*;
        use proptest::collection::vec;
        use proptest::prelude::*;

        // Object
        //   <- Animal
        //        <- Dog
        //        <- Cat
        //   <- Plant
        fn five_class_hierarchy() -> FakeClasses {
            let mut m = HashMap::new();
            m.insert("Object".to_string(), None);
            m.insert("Animal".to_string(), Some("Object".to_string()));
            m.insert("Dog".to_string(), Some("Animal".to_string()));
            m.insert("Cat".to_string(), Some("Animal".to_string()));
            m.insert("Plant".to_string(), Some("Object".to_string()));
            FakeClasses(m)
        }

        fn class_name() -> impl Strategy<Value = &'static str> {
            prop_oneof![Just("Object"), Just("Animal"), Just("Dog"), Just("Cat"), Just("Plant")]
        }

        proptest! {
            #[test]
            fn join_of_classes_bounds_every_input_or_is_error(names in vec(class_name(), 1..5)) {
                let c = five_class_hierarchy();
                let types: Vec<Type> = names.iter().map(|n| Type::class(*n)).collect();
                let joined = join(&types, &c);
                if joined.is_error() {
                    // `error` is claimed only when no common upper bound
                    // exists; with this forest's single root (`Object`)
                    // every non-empty class subset has one, so this arm
                    // should be unreachable for this generator.
                    prop_assert!(false, "join of {:?} unexpectedly had no bound", names);
                } else {
                    for t in &types {
                        prop_assert!(t.subtype_of(&joined, &c));
                    }
                }
            }

            #[test]
            fn meet_of_classes_is_at_most_every_input_when_it_exists(names in vec(class_name(), 1..5)) {
                let c = five_class_hierarchy();
                let types: Vec<Type> = names.iter().map(|n| Type::class(*n)).collect();
                let met = meet(&types, &c);
                if !met.is_error() {
                    for t in &types {
                        prop_assert!(met.subtype_of(t, &c));
                    }
                }
            }

            #[test]
            fn join_is_idempotent_on_a_singleton(name in class_name()) {
                let c = five_class_hierarchy();
                let t = Type::class(name);
                prop_assert_eq!(join(&[t.clone()], &c), t.clone());
                prop_assert_eq!(meet(&[t.clone()], &c), t);
            }

            #[test]
            fn fun_join_result_is_a_supertype_of_every_input(
                rets in vec(class_name(), 2..4),
                params in vec(class_name(), 2..4),
            ) {
                let c = five_class_hierarchy();
                let len = rets.len().min(params.len());
                let funs: Vec<Type> = (0..len)
                    .map(|i| Type::fun(Type::class(rets[i]), vec![Type::class(params[i])]))
                    .collect();
                let joined = join(&funs, &c);
                if !joined.is_error() {
                    for f in &funs {
                        prop_assert!(f.subtype_of(&joined, &c));
                    }
                }
            }
        }
    }
}
