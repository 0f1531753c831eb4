use super::*;

#[test]
fn split_then_rejoin_round_trips() {
    let iri = "http://example.org/alice";
    let (ns, local) = split_iri(iri);
    let mut namespaces = Namespaces::new();
    let code = namespaces.intern(ns);
    let sid = Sid::new(code, local);
    assert_eq!(to_iri(&namespaces, &sid).as_deref(), Some(iri));
}

#[test]
fn sid_ordering_is_ns_then_local() {
    let a = Sid::new(0, "zzz");
    let b = Sid::new(1, "aaa");
    assert!(a < b, "lower namespace code sorts first regardless of local name");

    let c = Sid::new(0, "aaa");
    assert!(c < a, "same namespace, local name breaks the tie lexicographically");
}

#[test]
fn namespace_codes_are_stable_and_append_only() {
    let mut ns = Namespaces::new();
    let c1 = ns.intern("http://example.org/");
    let c2 = ns.intern("http://schema.org/");
    let c1_again = ns.intern("http://example.org/");
    assert_eq!(c1, c1_again);
    assert_ne!(c1, c2);
    assert_eq!(ns.resolve(c1), Some("http://example.org/"));
}

#[test]
fn rehydrate_rebuilds_reverse_index() {
    let mut ns = Namespaces::new();
    ns.intern("a");
    ns.intern("b");
    let codes = ns.codes().to_vec();
    let ns2 = Namespaces::rehydrate(codes);
    assert_eq!(ns2.lookup("b"), Some(1));
}
