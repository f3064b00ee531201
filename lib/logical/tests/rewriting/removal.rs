use crate::test_utils::{parse, patterns_with_predicate, render, RDFS_COMMENT, RDFS_LABEL};
use rdf_federation_logical::NodeRemover;
use rdf_federation_model::{NodeKind, QueryModelError, QueryModelResult, QueryTree, Var};

#[test]
fn test_remove_from_join_keeps_sibling() -> QueryModelResult<()> {
    let mut query = parse("SELECT ?a ?b ?c WHERE { ?a rdfs:label ?b . ?a rdfs:comment ?c }");
    let label = patterns_with_predicate(query.tree(), RDFS_LABEL)[0];

    NodeRemover::new().remove(query.tree_mut(), label)?;

    query.tree().validate()?;
    assert_eq!(
        render(&query),
        render(&parse("SELECT ?a ?b ?c WHERE { ?a rdfs:comment ?c . }"))
    );
    Ok(())
}

#[test]
fn test_remove_from_union() -> QueryModelResult<()> {
    let mut query = parse(
        "SELECT ?a ?b WHERE { { ?a rdfs:label ?b } UNION { ?a rdfs:comment ?b } }",
    );
    let comment = patterns_with_predicate(query.tree(), RDFS_COMMENT)[0];

    NodeRemover::new().remove(query.tree_mut(), comment)?;

    query.tree().validate()?;
    assert_eq!(
        render(&query),
        render(&parse("SELECT ?a ?b WHERE { ?a rdfs:label ?b . }"))
    );
    Ok(())
}

#[test]
fn test_remove_argument_of_unary_operator() -> QueryModelResult<()> {
    let mut query = parse("SELECT ?a WHERE { { SELECT ?a WHERE { ?a rdfs:label ?b } } }");
    let label = patterns_with_predicate(query.tree(), RDFS_LABEL)[0];

    NodeRemover::new().remove(query.tree_mut(), label)?;

    query.tree().validate()?;
    insta::assert_snapshot!(query.tree(), @r"
    Root
      Projection: ?a
        Projection: ?a
          EmptySet
    ");
    Ok(())
}

#[test]
fn test_remove_respects_scope() -> QueryModelResult<()> {
    let mut query = parse(
        "SELECT ?a WHERE {
            ?a rdfs:label ?b .
            { SELECT ?a ?b WHERE { ?a rdfs:label ?b . ?a rdfs:comment ?c } }
        }",
    );
    let tree = query.tree();
    let outer_scope = tree.root_argument();
    let labels = patterns_with_predicate(tree, RDFS_LABEL);
    let (outer, inner) = (labels[0], labels[1]);
    assert_eq!(tree.scope_of(outer), Some(outer_scope));
    assert_ne!(tree.scope_of(inner), Some(outer_scope));

    let remover = NodeRemover::with_scope(outer_scope);
    let result = remover.remove(query.tree_mut(), inner);
    assert!(matches!(result, Err(QueryModelError::OutOfScope { .. })));
    assert!(query.tree().is_attached(inner));

    remover.remove(query.tree_mut(), outer)?;

    query.tree().validate()?;
    assert!(!query.tree().is_attached(outer));
    assert!(query.tree().is_attached(inner));
    insta::assert_snapshot!(query.tree(), @r"
    Root
      Projection: ?a
        Projection: ?a ?b
          Join
            Pattern: ?a <http://www.w3.org/2000/01/rdf-schema#label> ?b
            Pattern: ?a <http://www.w3.org/2000/01/rdf-schema#comment> ?c
    ");
    Ok(())
}

#[test]
fn test_remove_below_projection_uses_enclosing_scope() -> QueryModelResult<()> {
    let mut query = parse("SELECT ?a WHERE { ?a rdfs:label ?b }");
    let label = patterns_with_predicate(query.tree(), RDFS_LABEL)[0];
    let root = query.tree().root();

    NodeRemover::with_scope(root).remove(query.tree_mut(), label)?;

    query.tree().validate()?;
    insta::assert_snapshot!(query.tree(), @r"
    Root
      Projection: ?a
        EmptySet
    ");
    Ok(())
}

#[test]
fn test_remove_matches_identity() -> QueryModelResult<()> {
    let mut query = parse("SELECT ?a WHERE { { ?a rdfs:label ?b } UNION { ?a rdfs:label ?b } }");
    let labels = patterns_with_predicate(query.tree(), RDFS_LABEL);
    let (left, right) = (labels[0], labels[1]);

    NodeRemover::new().remove(query.tree_mut(), right)?;

    let tree = query.tree();
    tree.validate()?;
    assert!(tree.is_attached(left));
    assert!(!tree.is_attached(right));
    assert_eq!(tree.children(tree.root_argument()), vec![left]);
    Ok(())
}

#[test]
fn test_remove_from_nary_join() -> QueryModelResult<()> {
    let mut tree = QueryTree::new();
    let patterns = ["p", "q", "r"]
        .into_iter()
        .map(|predicate| {
            tree.add(NodeKind::Pattern(rdf_federation_model::StatementPattern {
                subject: Var::new("s"),
                predicate: Var::new(predicate),
                object: Var::new("o"),
            }))
        })
        .collect::<QueryModelResult<Vec<_>>>()?;
    let join = tree.add(NodeKind::NaryJoin(patterns.clone()))?;
    tree.set_root_argument(join)?;

    NodeRemover::new().remove(&mut tree, patterns[1])?;

    tree.validate()?;
    assert_eq!(tree.children(join), vec![patterns[0], patterns[2]]);
    insta::assert_snapshot!(tree, @r"
    Root
      NaryJoin
        Pattern: ?s ?p ?o
        Pattern: ?s ?r ?o
    ");
    Ok(())
}

#[test]
fn test_remove_root_or_detached_fails() -> QueryModelResult<()> {
    let mut query = parse("SELECT ?a ?b ?c WHERE { ?a rdfs:label ?b . ?a rdfs:comment ?c }");
    let label = patterns_with_predicate(query.tree(), RDFS_LABEL)[0];
    let root = query.tree().root();

    let remover = NodeRemover::new();
    assert!(matches!(
        remover.remove(query.tree_mut(), root),
        Err(QueryModelError::CannotRemoveRoot)
    ));

    remover.remove(query.tree_mut(), label)?;
    assert!(matches!(
        remover.remove(query.tree_mut(), label),
        Err(QueryModelError::DetachedNode(node)) if node == label
    ));
    Ok(())
}

#[test]
fn test_remove_foreign_node_fails() -> QueryModelResult<()> {
    let mut query = parse("SELECT ?a WHERE { ?a rdfs:label ?b }");
    let larger = parse(
        "SELECT ?a ?b ?c ?d WHERE { ?a rdfs:label ?b . ?a rdfs:comment ?c . ?c rdfs:label ?d }",
    );
    let foreign = *larger
        .tree()
        .pre_order()
        .iter()
        .max_by_key(|node| node.index())
        .unwrap();
    assert!(!query.tree().contains(foreign));

    let result = NodeRemover::new().remove(query.tree_mut(), foreign);

    assert!(matches!(result, Err(QueryModelError::UnknownNode(node)) if node == foreign));
    query.tree().validate()?;
    Ok(())
}
