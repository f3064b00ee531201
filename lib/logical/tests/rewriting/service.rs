use crate::test_utils::{iri, nodes_named, parse, render, TestService};
use rdf_federation_logical::{parametrize, resolve_services, ParameterBindings, ServiceReplacements};
use rdf_federation_model::{
    NodeKind, ParsedQuery, QueryModelResult, ServiceDescriptorRef, ServiceMap,
};
use std::collections::BTreeSet;
use std::sync::Arc;

fn services() -> ServiceMap {
    let mut services = ServiceMap::default();
    services.insert(
        iri("svc"),
        Arc::new(TestService {
            member: "member1",
            service_capable: true,
        }) as ServiceDescriptorRef,
    );
    services.insert(
        iri("plain"),
        Arc::new(TestService {
            member: "member2",
            service_capable: false,
        }) as ServiceDescriptorRef,
    );
    services
}

fn resolve(query: &mut ParsedQuery) -> QueryModelResult<ServiceReplacements> {
    let mut replacements = ServiceReplacements::default();
    resolve_services(query.tree_mut(), &services(), &mut replacements)?;
    query.tree().validate()?;
    Ok(replacements)
}

#[test]
fn test_resolve_known_service() -> QueryModelResult<()> {
    let mut query = parse("SELECT ?a ?b WHERE { SERVICE ex:svc { ?a rdfs:label ?b } }");
    let service = nodes_named(query.tree(), "Service")[0];

    let replacements = resolve(&mut query)?;

    let tree = query.tree();
    insta::assert_snapshot!(tree, @r"
    Root
      Projection: ?a ?b
        ServiceCall: <http://example.com/svc> via member1
    ");
    assert_eq!(replacements.len(), 1);
    let call = replacements[&service];
    assert!(!tree.is_attached(service));
    let NodeKind::ServiceCall(payload) = tree.kind(call) else {
        panic!("Expected a service call: {tree}");
    };
    assert!(!payload.silent);
    assert_eq!(
        payload.assured_bindings,
        BTreeSet::from(["a".to_owned(), "b".to_owned()])
    );
    assert_eq!(
        tree.assured_binding_names(call),
        BTreeSet::from(["a".to_owned(), "b".to_owned()])
    );
    Ok(())
}

#[test]
fn test_resolved_service_renders_as_service() -> QueryModelResult<()> {
    let text = "SELECT ?a ?b WHERE { SERVICE SILENT ex:svc { ?a rdfs:label ?b } }";
    let mut query = parse(text);

    resolve(&mut query)?;

    assert_eq!(render(&query), render(&parse(text)));
    Ok(())
}

#[test]
fn test_unresolvable_services_are_kept() -> QueryModelResult<()> {
    for text in [
        "SELECT ?a ?b WHERE { SERVICE ex:unknown { ?a rdfs:label ?b } }",
        "SELECT ?a ?b WHERE { SERVICE ex:plain { ?a rdfs:label ?b } }",
        "SELECT ?a ?b WHERE { SERVICE ?svc { ?a rdfs:label ?b } }",
    ] {
        let mut query = parse(text);

        let replacements = resolve(&mut query)?;

        assert!(replacements.is_empty(), "{text}");
        assert_eq!(nodes_named(query.tree(), "Service").len(), 1, "{text}");
        assert!(nodes_named(query.tree(), "ServiceCall").is_empty(), "{text}");
    }
    Ok(())
}

#[test]
fn test_nested_service_is_not_entered() -> QueryModelResult<()> {
    let mut query = parse(
        "SELECT ?a ?c WHERE {
            SERVICE ex:svc {
                ?a rdfs:label ?b .
                SERVICE ex:svc { ?b rdfs:comment ?c }
            }
        }",
    );

    let replacements = resolve(&mut query)?;

    assert_eq!(replacements.len(), 1);
    assert_eq!(nodes_named(query.tree(), "ServiceCall").len(), 1);
    assert!(nodes_named(query.tree(), "Service").is_empty());
    Ok(())
}

#[test]
fn test_service_below_unresolved_service_is_resolved() -> QueryModelResult<()> {
    let mut query = parse(
        "SELECT ?a ?c WHERE {
            SERVICE ex:unknown {
                ?a rdfs:label ?b .
                SERVICE ex:svc { ?b rdfs:comment ?c }
            }
        }",
    );
    let inner = nodes_named(query.tree(), "Service")[1];

    let replacements = resolve(&mut query)?;

    assert_eq!(replacements.len(), 1);
    assert!(replacements.contains_key(&inner));
    let tree = query.tree();
    assert_eq!(nodes_named(tree, "Service").len(), 1);
    let call = nodes_named(tree, "ServiceCall")[0];
    let NodeKind::ServiceCall(call) = tree.kind(call) else {
        unreachable!()
    };
    assert_eq!(call.service, iri("svc"));
    Ok(())
}

#[test]
fn test_parametrized_service_is_resolved() -> QueryModelResult<()> {
    let mut query = parse("SELECT ?a ?b WHERE { SERVICE ?svc { ?a rdfs:label ?b } }");
    let bindings = ParameterBindings::from([("svc".to_owned(), iri("svc").into())]);

    parametrize(query.tree_mut(), &bindings)?;
    let replacements = resolve(&mut query)?;

    assert_eq!(replacements.len(), 1);
    insta::assert_snapshot!(query.tree(), @r"
    Root
      Projection: ?a ?b
        ServiceCall: <http://example.com/svc> via member1
    ");
    Ok(())
}
