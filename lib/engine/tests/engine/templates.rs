use crate::test_utils::{iri, parse};
use rdf_federation_engine::{FederationEngine, QueryEvaluationError};
use rdf_federation_logical::ParameterBindings;
use rdf_federation_model::{Literal, QueryModelError, Term};

fn bindings(entries: impl IntoIterator<Item = (&'static str, Term)>) -> ParameterBindings {
    entries
        .into_iter()
        .map(|(name, value)| (name.to_owned(), value))
        .collect()
}

fn render(query: &rdf_federation_model::ParsedQuery) -> String {
    query.to_sparql().unwrap()
}

#[test]
fn test_instantiate_select_template() {
    let template = parse("SELECT ?s ?l WHERE { ?s rdfs:label ?l }");

    let instance =
        FederationEngine::instantiate(&template, &bindings([("s", iri("x").into())])).unwrap();

    assert_eq!(
        render(&instance),
        render(&parse("SELECT ?s ?l WHERE { ex:x rdfs:label ?l BIND(ex:x AS ?s) }"))
    );
    assert_eq!(
        render(&template),
        render(&parse("SELECT ?s ?l WHERE { ?s rdfs:label ?l }"))
    );
}

#[test]
fn test_instantiate_construct_template() {
    let template = parse("CONSTRUCT { ?s ex:name ?l } WHERE { ?s rdfs:label ?l }");

    let instance = FederationEngine::instantiate(
        &template,
        &bindings([("l", Literal::new_simple_literal("Alice").into())]),
    )
    .unwrap();

    assert_eq!(
        render(&instance),
        render(&parse(
            "CONSTRUCT { ?s ex:name \"Alice\" } WHERE { ?s rdfs:label \"Alice\" }"
        ))
    );
}

#[test]
fn test_instantiate_literal_predicate_fails() {
    let template = parse("CONSTRUCT { ?s ?p ?o } WHERE { ?s ?p ?o }");

    let result = FederationEngine::instantiate(
        &template,
        &bindings([("p", Literal::new_simple_literal("x").into())]),
    );

    assert!(matches!(
        result,
        Err(QueryEvaluationError::Model(QueryModelError::InvalidParameter { name, .. })) if name == "p"
    ));
}

#[test]
fn test_rename_construct_template() {
    let query = parse("CONSTRUCT { ?s ex:name ?l } WHERE { ?s rdfs:label ?l }");

    let renamed = FederationEngine::rename(query, "l", "name").unwrap();

    assert_eq!(
        render(&renamed),
        render(&parse(
            "CONSTRUCT { ?s ex:name ?name } WHERE { ?s rdfs:label ?name }"
        ))
    );
}

#[test]
fn test_rename_to_invalid_name_fails() {
    let query = parse("SELECT ?s WHERE { ?s rdfs:label ?l }");

    let result = FederationEngine::rename(query, "l", "?");

    assert!(matches!(
        result,
        Err(QueryEvaluationError::Model(QueryModelError::InvalidVariableName(_)))
    ));
}
