//! Property-based tests for the signature grammar.
//!
//! Any member the model can express renders to a declaration line that
//! parses back into the same member, and re-rendering that line is stable.

use proptest::prelude::*;
use sigcat::catalog::{
    Block, Callable, Literal, MemberBody, Overload, Parameter, TypeParam, Variance,
};
use sigcat::{Member, MemberKind, TypeExpr, parse_member, parse_type};

const LEAF_NAMES: &[&str] = &[
    "String",
    "Integer",
    "IO::Buffer",
    "::Kernel",
    "nil",
    "bool",
    "self",
    "_ToS",
    "int",
];

const METHOD_NAMES: &[&str] = &["read", "write", "each_line", "close?", "sync=", "[]", "<<", "+"];

const GENERIC_BASES: &[&str] = &["Array", "Hash"];

const CONSTANT_NAMES: &[&str] = &["SEEK_SET", "VERSION", "Buffer"];

fn literal() -> impl Strategy<Value = TypeExpr> {
    prop_oneof![
        "[a-z][a-z_]{0,6}".prop_map(Literal::Symbol),
        "[a-z ]{0,6}".prop_map(Literal::Str),
        (0i64..10_000).prop_map(Literal::Int),
        any::<bool>().prop_map(Literal::Bool),
    ]
    .prop_map(|value| TypeExpr::Literal { value })
}

fn leaf_type() -> impl Strategy<Value = TypeExpr> {
    prop_oneof![
        4 => prop::sample::select(LEAF_NAMES).prop_map(TypeExpr::named),
        1 => Just(TypeExpr::Untyped),
        2 => literal(),
    ]
}

/// Unions are flat and hold distinct alternatives.
fn union_of(alternatives: Vec<TypeExpr>) -> Option<TypeExpr> {
    let mut distinct: Vec<TypeExpr> = Vec::new();
    for alt in alternatives {
        if !distinct.contains(&alt) {
            distinct.push(alt);
        }
    }
    (distinct.len() >= 2).then_some(TypeExpr::Union {
        alternatives: distinct,
    })
}

fn type_expr() -> impl Strategy<Value = TypeExpr> {
    leaf_type().prop_recursive(3, 24, 4, |inner| {
        let non_union = inner
            .clone()
            .prop_filter("union alternatives are never unions", |ty| {
                !matches!(ty, TypeExpr::Union { .. })
            });
        prop_oneof![
            (
                prop::sample::select(GENERIC_BASES),
                prop::collection::vec(inner.clone(), 1..3)
            )
                .prop_map(|(base, args)| TypeExpr::Generic {
                    base: base.to_string(),
                    args,
                }),
            prop::collection::vec(non_union, 2..4).prop_filter_map("needs two distinct", union_of),
            prop::collection::vec(inner, 0..3).prop_map(|items| TypeExpr::Tuple { items }),
        ]
    })
}

fn positional(idx: usize, ty: TypeExpr, optional: bool, variadic: bool) -> Parameter {
    Parameter {
        name: Some(format!("p{idx}")),
        ty,
        optional,
        variadic,
        keyword: false,
    }
}

fn keyword(idx: usize, ty: TypeExpr, optional: bool) -> Parameter {
    Parameter {
        name: Some(format!("k{idx}")),
        ty,
        optional,
        variadic: false,
        keyword: true,
    }
}

/// Parameters in the only order the grammar accepts: required, optional,
/// `*rest`, keywords, `**rest`.
fn parameters() -> impl Strategy<Value = Vec<Parameter>> {
    (
        prop::collection::vec(type_expr(), 0..3),
        prop::collection::vec(type_expr(), 0..2),
        prop::option::of(type_expr()),
        prop::collection::vec((type_expr(), any::<bool>()), 0..3),
        prop::option::of(type_expr()),
    )
        .prop_map(|(required, optional, rest, keywords, kwrest)| {
            let mut params = Vec::new();
            for ty in required {
                params.push(positional(params.len(), ty, false, false));
            }
            for ty in optional {
                params.push(positional(params.len(), ty, true, false));
            }
            if let Some(ty) = rest {
                params.push(positional(params.len(), ty, false, true));
            }
            for (idx, (ty, optional)) in keywords.into_iter().enumerate() {
                params.push(keyword(idx, ty, optional));
            }
            if let Some(ty) = kwrest {
                params.push(Parameter {
                    name: Some("opts".to_string()),
                    ty,
                    optional: false,
                    variadic: true,
                    keyword: true,
                });
            }
            params
        })
}

fn block() -> impl Strategy<Value = Block> {
    (
        any::<bool>(),
        prop::collection::vec(type_expr(), 0..2),
        type_expr(),
    )
        .prop_map(|(required, params, returns)| Block {
            required,
            callable: Callable {
                params: params
                    .into_iter()
                    .enumerate()
                    .map(|(idx, ty)| positional(idx, ty, false, false))
                    .collect(),
                block: None,
                returns,
            },
        })
}

fn overload() -> impl Strategy<Value = Overload> {
    (
        prop::sample::subsequence(vec!["T", "U"], 0..=2),
        parameters(),
        prop::option::of(block()),
        type_expr(),
    )
        .prop_map(|(type_params, params, block, returns)| Overload {
            type_params: type_params
                .into_iter()
                .map(|name| TypeParam {
                    name: name.to_string(),
                    variance: Variance::Invariant,
                })
                .collect(),
            callable: Callable {
                params,
                block: block.map(Box::new),
                returns,
            },
            line: 1,
        })
}

fn method_member() -> impl Strategy<Value = Member> {
    (
        prop::sample::select(METHOD_NAMES),
        any::<bool>(),
        prop::collection::vec(overload(), 1..3),
    )
        .prop_map(|(name, singleton, overloads)| Member {
            name: name.to_string(),
            kind: if singleton {
                MemberKind::Singleton
            } else {
                MemberKind::Instance
            },
            body: MemberBody::Method { overloads },
            line: 1,
        })
}

fn constant_member() -> impl Strategy<Value = Member> {
    (prop::sample::select(CONSTANT_NAMES), type_expr()).prop_map(|(name, ty)| Member {
        name: name.to_string(),
        kind: MemberKind::Constant,
        body: MemberBody::Constant { ty },
        line: 1,
    })
}

proptest! {
    /// Property: a rendered method declaration parses back to the same member.
    #[test]
    fn prop_method_declarations_round_trip(member in method_member()) {
        let line = member.to_string();
        let parsed = parse_member(&line, 1);
        prop_assert!(parsed.is_ok(), "{line}: {parsed:?}");
        let parsed = parsed.unwrap();
        prop_assert_eq!(&parsed, &member, "{}", line);
        prop_assert_eq!(parsed.to_string(), line);
    }

    /// Property: constants round trip, including union-typed ones.
    #[test]
    fn prop_constant_declarations_round_trip(member in constant_member()) {
        let line = member.to_string();
        let parsed = parse_member(&line, 1);
        prop_assert!(parsed.is_ok(), "{line}: {parsed:?}");
        prop_assert_eq!(parsed.unwrap(), member);
    }

    /// Property: standalone type expressions round trip.
    #[test]
    fn prop_type_expressions_round_trip(ty in type_expr()) {
        let text = ty.to_string();
        let parsed = parse_type(&text, 1);
        prop_assert!(parsed.is_ok(), "{text}: {parsed:?}");
        prop_assert_eq!(parsed.unwrap(), ty);
    }

    /// Property: a duplicated union alternative is always rejected.
    #[test]
    fn prop_duplicate_union_alternatives_are_malformed(ty in leaf_type()) {
        let text = format!("{ty} | {ty}");
        let err = parse_type(&text, 4);
        prop_assert!(err.is_err(), "{text} parsed");
        prop_assert_eq!(err.unwrap_err().line, 4);
    }
}
