use crate::test_utils::{parse, Federation, Response};
use rdf_federation_engine::find_single_owner;

fn owner_of(query: &str) -> Option<String> {
    let federation = Federation::with_store(Response::Solutions(0));
    let planned = federation.engine.plan(parse(query)).unwrap();
    find_single_owner(
        planned.query.tree(),
        federation.engine.registry().services(),
        federation.engine.default_member(),
    )
    .unwrap()
}

#[test]
fn test_default_member_owns_plain_patterns() {
    assert_eq!(
        owner_of("SELECT ?a ?b WHERE { ?a rdfs:label ?b OPTIONAL { ?a rdfs:comment ?c } }"),
        Some("store".to_owned())
    );
}

#[test]
fn test_service_only_query_is_owned_by_service_member() {
    assert_eq!(
        owner_of("SELECT ?a ?b WHERE { SERVICE ex:remote { ?a rdfs:label ?b } }"),
        Some("remote".to_owned())
    );
}

#[test]
fn test_two_members_have_no_single_owner() {
    assert_eq!(
        owner_of(
            "SELECT ?a ?b ?c WHERE {
                ?a rdfs:label ?b .
                SERVICE ex:remote { ?a rdfs:comment ?c }
            }"
        ),
        None
    );
}

#[test]
fn test_service_of_default_member_keeps_single_owner() {
    assert_eq!(
        owner_of(
            "SELECT ?a ?b ?c WHERE {
                ?a rdfs:label ?b .
                SERVICE ex:local { ?a rdfs:comment ?c }
            }"
        ),
        Some("store".to_owned())
    );
}

#[test]
fn test_unknown_service_has_no_single_owner() {
    assert_eq!(
        owner_of("SELECT ?a ?b WHERE { ?a rdfs:label ?b SERVICE ex:elsewhere { ?a ?p ?b } }"),
        None
    );
    assert_eq!(
        owner_of("SELECT ?a ?b WHERE { ?a rdfs:label ?b SERVICE ?s { ?a ?p ?b } }"),
        None
    );
}

#[test]
fn test_exists_filter_is_inspected() {
    assert_eq!(
        owner_of(
            "SELECT ?a WHERE {
                ?a rdfs:label ?b
                FILTER EXISTS { SERVICE ex:remote { ?a rdfs:comment ?c } }
            }"
        ),
        None
    );
}

#[test]
fn test_query_without_patterns_has_no_owner() {
    assert_eq!(owner_of("SELECT ?a WHERE { VALUES ?a { ex:x } }"), None);
}
