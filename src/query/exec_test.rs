use super::*;
use crate::query::ast::{Aggregate, AggregateKind, Literal as L, Query as Q, Term as T, TriplePattern as TP};
use crate::sid::Namespaces as Ns;

fn ns_with(iri: &str) -> Ns {
    let mut ns = Ns::new();
    ns.intern(iri);
    ns
}

fn flake(s: &str, p: &str, o: Object, namespaces: &mut Ns) -> Flake {
    let (sns, slocal) = split_iri(s);
    let (pns, plocal) = split_iri(p);
    let s = Sid::new(namespaces.intern(sns), slocal);
    let p = Sid::new(namespaces.intern(pns), plocal);
    Flake::new(s, p, o, Sid::new(0, "xsd:string"), 1, true, None)
}

#[test]
fn triple_pattern_binds_unbound_object_var() {
    let mut namespaces = ns_with("http://ex/");
    let f = flake("http://ex/alice", "http://ex/age", Object::Int(30), &mut namespaces);
    let ctx = Ctx {
        flakes: std::slice::from_ref(&f),
        namespaces: &namespaces,
        max_cartesian_product_size: 1000,
    };
    let pattern = Pattern::Triple(TP {
        s: T::Iri("http://ex/alice".into()),
        p: T::Iri("http://ex/age".into()),
        o: T::Var("age".into()),
    });
    let solution = eval_patterns(std::slice::from_ref(&pattern), &ctx).unwrap();
    assert_eq!(solution.len(), 1);
    assert_eq!(solution[0].0.get("age"), Some(&BindingValue::Int(30)));
}

#[test]
fn filter_drops_rows_failing_the_predicate() {
    let mut namespaces = ns_with("http://ex/");
    let f1 = flake("http://ex/alice", "http://ex/age", Object::Int(30), &mut namespaces);
    let f2 = flake("http://ex/bob", "http://ex/age", Object::Int(12), &mut namespaces);
    let flakes = vec![f1, f2];
    let ctx = Ctx {
        flakes: &flakes,
        namespaces: &namespaces,
        max_cartesian_product_size: 1000,
    };
    let patterns = vec![
        Pattern::Triple(TP {
            s: T::Var("s".into()),
            p: T::Iri("http://ex/age".into()),
            o: T::Var("age".into()),
        }),
        Pattern::Filter(Expr::Ge(Box::new(Expr::Var("age".into())), Box::new(Expr::Lit(L::Int(18))))),
    ];
    let solution = eval_patterns(&patterns, &ctx).unwrap();
    assert_eq!(solution.len(), 1);
    assert_eq!(solution[0].0.get("age"), Some(&BindingValue::Int(30)));
}

#[test]
fn optional_keeps_outer_row_when_inner_has_no_match() {
    let mut namespaces = ns_with("http://ex/");
    let f = flake("http://ex/alice", "http://ex/age", Object::Int(30), &mut namespaces);
    let flakes = vec![f];
    let ctx = Ctx {
        flakes: &flakes,
        namespaces: &namespaces,
        max_cartesian_product_size: 1000,
    };
    let patterns = vec![
        Pattern::Triple(TP {
            s: T::Var("s".into()),
            p: T::Iri("http://ex/age".into()),
            o: T::Var("age".into()),
        }),
        Pattern::Optional(vec![Pattern::Triple(TP {
            s: T::Var("s".into()),
            p: T::Iri("http://ex/nickname".into()),
            o: T::Var("nick".into()),
        })]),
    ];
    let solution = eval_patterns(&patterns, &ctx).unwrap();
    assert_eq!(solution.len(), 1);
    assert!(solution[0].0.get("nick").is_none());
    assert_eq!(solution[0].0.get("age"), Some(&BindingValue::Int(30)));
}

#[test]
fn minus_removes_compatible_rows() {
    let mut namespaces = ns_with("http://ex/");
    let f1 = flake("http://ex/alice", "http://ex/age", Object::Int(30), &mut namespaces);
    let f2 = flake("http://ex/bob", "http://ex/age", Object::Int(12), &mut namespaces);
    let blocked = flake("http://ex/alice", "http://ex/blocked", Object::Bool(true), &mut namespaces);
    let flakes = vec![f1, f2, blocked];
    let ctx = Ctx {
        flakes: &flakes,
        namespaces: &namespaces,
        max_cartesian_product_size: 1000,
    };
    let patterns = vec![
        Pattern::Triple(TP {
            s: T::Var("s".into()),
            p: T::Iri("http://ex/age".into()),
            o: T::Var("age".into()),
        }),
        Pattern::Minus(vec![Pattern::Triple(TP {
            s: T::Var("s".into()),
            p: T::Iri("http://ex/blocked".into()),
            o: T::Var("blocked".into()),
        })]),
    ];
    let solution = eval_patterns(&patterns, &ctx).unwrap();
    assert_eq!(solution.len(), 1);
    assert_eq!(solution[0].0.get("age"), Some(&BindingValue::Int(12)));
}

#[test]
fn modifiers_apply_limit_after_aggregation() {
    let query = Q {
        select: vec!["n".into()],
        aggregates: vec![Aggregate {
            kind: AggregateKind::Count,
            arg: None,
            alias: "n".into(),
        }],
        where_: vec![],
        group_by: vec![],
        having: None,
        order_by: vec![],
        distinct: false,
        limit: None,
        offset: None,
        from: GraphTarget::Native,
    };
    let ctx = Ctx {
        flakes: &[],
        namespaces: &Ns::new(),
        max_cartesian_product_size: 1000,
    };
    let solution = eval_query(&query, &ctx).unwrap();
    assert_eq!(solution.len(), 1);
    assert_eq!(solution[0].0.get("n"), Some(&BindingValue::Int(0)));
}
