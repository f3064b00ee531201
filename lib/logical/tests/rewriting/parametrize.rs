use crate::test_utils::{free_var_names, iri, nodes_named, parse, render};
use rdf_federation_logical::{parametrize, ParameterBindings};
use rdf_federation_model::{
    BlankNode, Expression, NodeKind, QueryModelError, QueryModelResult, Term, Variable,
};

fn bindings(entries: impl IntoIterator<Item = (&'static str, Term)>) -> ParameterBindings {
    entries
        .into_iter()
        .map(|(name, value)| (name.to_owned(), value))
        .collect()
}

#[test]
fn test_parametrize_keeps_output_names() -> QueryModelResult<()> {
    let mut query = parse("SELECT ?a ?l WHERE { ?a rdfs:label ?l }");
    let before = query.tree().output_names();

    parametrize(query.tree_mut(), &bindings([("a", iri("x").into())]))?;

    let tree = query.tree();
    tree.validate()?;
    assert_eq!(tree.output_names(), before);
    assert_eq!(
        render(&query),
        render(&parse(
            "SELECT ?a ?l WHERE { ex:x rdfs:label ?l BIND(ex:x AS ?a) }"
        ))
    );
    Ok(())
}

#[test]
fn test_parametrize_bound_becomes_true() -> QueryModelResult<()> {
    let mut query = parse("SELECT ?l WHERE { ?a rdfs:label ?l FILTER(BOUND(?a)) }");

    parametrize(query.tree_mut(), &bindings([("a", iri("x").into())]))?;

    assert_eq!(
        render(&query),
        render(&parse("SELECT ?l WHERE { ex:x rdfs:label ?l FILTER(true) }"))
    );
    Ok(())
}

#[test]
fn test_parametrize_group_key() -> QueryModelResult<()> {
    let mut query = parse(
        "SELECT ?a (COUNT(?l) AS ?n) WHERE { ?a rdfs:label ?l } GROUP BY ?a",
    );

    parametrize(query.tree_mut(), &bindings([("a", iri("x").into())]))?;

    let tree = query.tree();
    tree.validate()?;
    let group = nodes_named(tree, "Group")[0];
    let NodeKind::Group(group) = tree.kind(group) else {
        unreachable!()
    };
    assert_eq!(group.group_by, vec!["a".to_owned()]);
    let NodeKind::Extension(extension) = tree.kind(group.arg) else {
        panic!("Expected a BIND below the group: {tree}");
    };
    assert_eq!(extension.elements.len(), 1);
    assert_eq!(extension.elements[0].name, "a");
    assert_eq!(
        extension.elements[0].expression,
        Expression::NamedNode(iri("x"))
    );
    assert_eq!(nodes_named(tree, "Extension").len(), 2);
    Ok(())
}

#[test]
fn test_parametrize_values_column_holds_parameter() -> QueryModelResult<()> {
    let mut query = parse("SELECT ?a ?l WHERE { VALUES ?a { ex:y ex:z } ?a rdfs:label ?l }");
    let before = query.tree().output_names();

    parametrize(query.tree_mut(), &bindings([("a", iri("x").into())]))?;

    let tree = query.tree();
    tree.validate()?;
    assert_eq!(tree.output_names(), before);
    assert!(!free_var_names(tree).contains("a"));

    let values = nodes_named(tree, "Values")[0];
    let NodeKind::Values(values) = tree.kind(values) else {
        unreachable!()
    };
    assert!(values.variables.is_empty());
    assert!(values.rows.is_empty());

    let NodeKind::Projection(projection) = tree.kind(tree.root_argument()) else {
        panic!("Expected a projection: {tree}");
    };
    let NodeKind::Extension(extension) = tree.kind(projection.arg) else {
        panic!("Expected a BIND below the projection: {tree}");
    };
    assert_eq!(extension.elements[0].name, "a");
    assert_eq!(
        extension.elements[0].expression,
        Expression::NamedNode(iri("x"))
    );
    Ok(())
}

#[test]
fn test_parametrize_values_keeps_matching_rows() -> QueryModelResult<()> {
    let mut query = parse(
        "SELECT ?a ?l WHERE { VALUES (?a ?l) { (ex:x \"one\") (ex:y \"two\") (UNDEF \"three\") } }",
    );

    parametrize(query.tree_mut(), &bindings([("a", iri("x").into())]))?;

    let tree = query.tree();
    tree.validate()?;
    let values = nodes_named(tree, "Values")[0];
    let NodeKind::Values(values) = tree.kind(values) else {
        unreachable!()
    };
    assert_eq!(values.variables, vec!["l".to_owned()]);
    let labels = values
        .rows
        .iter()
        .map(|row| row.get("l").map(ToString::to_string))
        .collect::<Vec<_>>();
    assert_eq!(
        labels,
        vec![Some("\"one\"".to_owned()), Some("\"three\"".to_owned())]
    );
    Ok(())
}

#[test]
fn test_parametrize_bind_becomes_filter() -> QueryModelResult<()> {
    let mut query = parse("SELECT ?a ?l WHERE { ?s rdfs:label ?l BIND(?s AS ?a) }");
    let before = query.tree().output_names();

    parametrize(query.tree_mut(), &bindings([("a", iri("x").into())]))?;

    let tree = query.tree();
    tree.validate()?;
    assert_eq!(tree.output_names(), before);
    let filter = nodes_named(tree, "Filter")[0];
    let NodeKind::Filter(filter) = tree.kind(filter) else {
        unreachable!()
    };
    assert_eq!(
        filter.condition,
        Expression::SameTerm(
            Box::new(Expression::Variable(Variable::new_unchecked("s"))),
            Box::new(Expression::NamedNode(iri("x"))),
        )
    );
    let bound_to_a = nodes_named(tree, "Extension")
        .into_iter()
        .filter_map(|node| match tree.kind(node) {
            NodeKind::Extension(extension) => Some(extension.elements.clone()),
            _ => None,
        })
        .flatten()
        .filter(|element| element.name == "a")
        .map(|element| element.expression)
        .collect::<Vec<_>>();
    assert_eq!(bound_to_a, vec![Expression::NamedNode(iri("x"))]);
    Ok(())
}

#[test]
fn test_parametrize_nested_subquery() -> QueryModelResult<()> {
    let mut query = parse("SELECT ?a WHERE { { SELECT ?a WHERE { ?a rdfs:label ?l } } }");

    parametrize(query.tree_mut(), &bindings([("a", iri("x").into())]))?;

    query.tree().validate()?;
    insta::assert_snapshot!(query.tree(), @r"
    Root
      Projection: ?a
        Projection: ?a
          Extension: (<http://example.com/x> AS ?a)
            Pattern: <http://example.com/x> <http://www.w3.org/2000/01/rdf-schema#label> ?l
    ");
    Ok(())
}

#[test]
fn test_parametrize_unknown_name_is_ignored() -> QueryModelResult<()> {
    let mut query = parse("SELECT ?a ?l WHERE { ?a rdfs:label ?l }");
    let expected = render(&query);

    parametrize(query.tree_mut(), &bindings([("other", iri("x").into())]))?;

    assert_eq!(render(&query), expected);
    Ok(())
}

#[test]
fn test_parametrize_blank_node_fails() {
    let mut query = parse("SELECT ?a ?l WHERE { ?a rdfs:label ?l }");

    let result = parametrize(
        query.tree_mut(),
        &bindings([("a", BlankNode::default().into())]),
    );

    assert!(matches!(
        result,
        Err(QueryModelError::InvalidParameter { name, .. }) if name == "a"
    ));
}
