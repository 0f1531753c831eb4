use super::*;

fn sample_map() -> TriplesMap {
    let mut predicates = BTreeMap::new();
    predicates.insert(
        "http://ex/name".to_string(),
        PredicateMapping::Column(ColumnMapping {
            column: "name".to_string(),
            datatype: "xsd:string".to_string(),
            language: None,
        }),
    );
    TriplesMap {
        iri: "http://ex/maps/person".to_string(),
        table: "person".to_string(),
        subject_template: "http://ex/person/{id}".to_string(),
        class: Some("http://ex/Person".to_string()),
        predicates,
    }
}

#[test]
fn subject_template_substitutes_column_values() {
    let map = sample_map();
    let mut row = HashMap::new();
    row.insert("id".to_string(), "42".to_string());
    assert_eq!(map.build_subject(&row).unwrap(), "http://ex/person/42");
}

#[test]
fn missing_column_in_subject_template_is_an_error() {
    let map = sample_map();
    let row = HashMap::new();
    assert!(map.build_subject(&row).is_err());
}

#[test]
fn registry_indexes_by_class_and_predicate() {
    let mut registry = MappingRegistry::new();
    registry.register(sample_map());
    assert_eq!(registry.by_class("http://ex/Person").unwrap().table, "person");
    assert_eq!(registry.by_predicate("http://ex/name").len(), 1);
    assert_eq!(registry.table_for("http://ex/maps/person"), Some("person"));
}
