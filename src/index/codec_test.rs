use super::*;
use crate::flake::Object;

fn sample_flake(t: u64) -> Flake {
    Flake::new(
        Sid::new(0, "alice"),
        Sid::new(0, "age"),
        Object::Int(30),
        Sid::new(0, "xsd:integer"),
        t,
        true,
        None,
    )
}

fn sample_ref_flake(t: u64) -> Flake {
    Flake::new(
        Sid::new(0, "alice"),
        Sid::new(0, "knows"),
        Object::Ref(Sid::new(0, "bob")),
        Sid::new(0, ID_DATATYPE),
        t,
        true,
        None,
    )
}

#[test]
fn leaf_round_trips_through_v2_dictionary_form() {
    let flakes = vec![sample_flake(1), sample_ref_flake(2)];
    let leaf = Leaf {
        order: IndexOrder::Spot,
        bound: Bound {
            first: flakes[0].clone(),
            rhs: None,
        },
        t: 2,
        flakes,
    };
    let bytes = encode_leaf(&leaf).unwrap();
    let back = decode_leaf(&bytes, IndexOrder::Spot).unwrap();
    assert_eq!(back.flakes.len(), 2);
    assert_eq!(back.flakes[0].o, Object::Int(30));
    assert_eq!(back.flakes[1].o, Object::Ref(Sid::new(0, "bob")));
}

#[test]
fn leaf_v1_without_dictionary_still_decodes() {
    let payload = LeafPayloadV1 {
        version: 1,
        flakes: vec![encode_flake_full(&sample_flake(5))],
        rhs: None,
    };
    let bytes = serde_json::to_vec(&payload).unwrap();
    let back = decode_leaf(&bytes, IndexOrder::Spot).unwrap();
    assert_eq!(back.flakes.len(), 1);
    assert_eq!(back.flakes[0].t, 5);
}

#[test]
fn branch_round_trips_with_stringified_boundaries() {
    let branch = Branch {
        order: IndexOrder::Spot,
        t: 3,
        children: vec![ChildDescriptor {
            address: Address("fluree:mem:idx/spot/abc.json".into()),
            is_leaf: true,
            first: sample_flake(1),
            rhs: Some(sample_flake(3)),
            size: 10,
        }],
    };
    let bytes = encode_branch(&branch).unwrap();
    // boundaries are literally JSON strings, not nested objects.
    let raw: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(raw["children"][0]["first"].is_string());

    let back = decode_branch(&bytes, IndexOrder::Spot).unwrap();
    assert_eq!(back.children.len(), 1);
    assert_eq!(back.children[0].first.t, 1);
}

#[test]
fn garbage_payload_round_trips() {
    let g = GarbagePayload {
        alias: "mydb/main".into(),
        t: 42,
        garbage: vec![Address("fluree:mem:idx/spot/x.json".into())],
    };
    let bytes = encode_garbage(&g).unwrap();
    let back = decode_garbage(&bytes).unwrap();
    assert_eq!(back.alias, "mydb/main");
    assert_eq!(back.garbage.len(), 1);
}
