use crate::test_utils::{nodes_named, parse, render};
use rdf_federation_logical::{rename_variable, KeywordSearchExtractor};
use rdf_federation_model::{
    KeywordSearchVocabulary, NodeKind, ParsedQuery, QueryModelResult, QueryTree,
};
use std::collections::BTreeSet;
use std::sync::Arc;

fn extract(query: &mut ParsedQuery) -> QueryModelResult<usize> {
    let extractor = KeywordSearchExtractor::new(Arc::new(KeywordSearchVocabulary::default()));
    let nodes = extractor.extract(query.tree_mut())?;
    query.tree().validate()?;
    Ok(nodes.len())
}

fn search_subject(tree: &QueryTree) -> Option<String> {
    let node = nodes_named(tree, "KeywordSearch")[0];
    let NodeKind::KeywordSearch(search) = tree.kind(node) else {
        unreachable!()
    };
    search.pattern.subject.as_ref().map(|s| s.name().to_owned())
}

const FULL_IDIOM: &str = "SELECT ?s ?score WHERE {
    ?s rdfs:label ?m .
    ?m search:contains \"alpha\" .
    ?m search:score ?score .
} LIMIT 10";

#[test]
fn test_extract_full_idiom() -> QueryModelResult<()> {
    let mut query = parse(FULL_IDIOM);

    assert_eq!(extract(&mut query)?, 1);

    let tree = query.tree();
    insta::assert_snapshot!(tree, @r#"
    Root
      Slice: offset=0 limit=10
        Projection: ?s ?score
          KeywordSearch: ?m matches "alpha" subject=?s predicate=<http://www.w3.org/2000/01/rdf-schema#label> score=?score limit=10
    "#);

    let search = nodes_named(tree, "KeywordSearch")[0];
    assert_eq!(
        tree.assured_binding_names(search),
        BTreeSet::from(["s".to_owned(), "score".to_owned()])
    );
    assert_eq!(render(&query), render(&parse(FULL_IDIOM)));
    Ok(())
}

#[test]
fn test_extract_with_snippet_and_type() -> QueryModelResult<()> {
    let mut query = parse(
        "SELECT ?s ?snippet WHERE {
            ?s rdfs:label ?m .
            ?m search:contains \"alpha\" .
            ?m search:snippet ?snippet .
            ?s a ex:Person .
        }",
    );

    assert_eq!(extract(&mut query)?, 1);

    insta::assert_snapshot!(query.tree(), @r#"
    Root
      Projection: ?s ?snippet
        KeywordSearch: ?m matches "alpha" subject=?s predicate=<http://www.w3.org/2000/01/rdf-schema#label> snippet=?snippet type=<http://example.com/Person>
    "#);
    Ok(())
}

#[test]
fn test_extract_two_searches_in_one_join() -> QueryModelResult<()> {
    let mut query = parse(
        "SELECT ?s1 ?s2 WHERE {
            ?s1 rdfs:label ?m1 .
            ?m1 search:contains \"alpha\" .
            ?s1 ex:knows ?s2 .
            ?s2 rdfs:comment ?m2 .
            ?m2 search:contains \"beta\" .
        } LIMIT 5",
    );

    assert_eq!(extract(&mut query)?, 2);

    insta::assert_snapshot!(query.tree(), @r#"
    Root
      Slice: offset=0 limit=5
        Projection: ?s1 ?s2
          Join
            Join
              KeywordSearch: ?m1 matches "alpha" subject=?s1 predicate=<http://www.w3.org/2000/01/rdf-schema#label>
              Pattern: ?s1 <http://example.com/knows> ?s2
            KeywordSearch: ?m2 matches "beta" subject=?s2 predicate=<http://www.w3.org/2000/01/rdf-schema#comment>
    "#);
    Ok(())
}

#[test]
fn test_extract_without_subject() -> QueryModelResult<()> {
    let mut query = parse("SELECT ?m WHERE { ?m search:contains \"alpha\" }");

    assert_eq!(extract(&mut query)?, 1);

    assert_eq!(search_subject(query.tree()), None);
    Ok(())
}

#[test]
fn test_ambiguous_subject_is_not_extracted() -> QueryModelResult<()> {
    let mut query = parse(
        "SELECT ?s1 ?s2 WHERE {
            ?s1 rdfs:label ?m .
            ?s2 rdfs:comment ?m .
            ?m search:contains \"alpha\" .
        }",
    );
    let expected = render(&query);

    assert_eq!(extract(&mut query)?, 0);

    assert!(nodes_named(query.tree(), "KeywordSearch").is_empty());
    assert_eq!(render(&query), expected);
    Ok(())
}

#[test]
fn test_duplicate_score_is_not_extracted() -> QueryModelResult<()> {
    let mut query = parse(
        "SELECT ?s WHERE {
            ?s rdfs:label ?m .
            ?m search:contains \"alpha\" .
            ?m search:score ?x .
            ?m search:score ?y .
        }",
    );

    assert_eq!(extract(&mut query)?, 0);

    assert!(nodes_named(query.tree(), "KeywordSearch").is_empty());
    Ok(())
}

#[test]
fn test_search_in_optional_is_separate_group() -> QueryModelResult<()> {
    let mut query = parse(
        "SELECT ?s ?score WHERE {
            ?s a ex:Person .
            OPTIONAL { ?m search:contains \"alpha\" . ?m search:score ?score }
        } LIMIT 3",
    );

    assert_eq!(extract(&mut query)?, 1);

    insta::assert_snapshot!(query.tree(), @r#"
    Root
      Slice: offset=0 limit=3
        Projection: ?s ?score
          LeftJoin
            Pattern: ?s <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://example.com/Person>
            KeywordSearch: ?m matches "alpha" score=?score
    "#);
    Ok(())
}

#[test]
fn test_cloned_pattern_is_independent() -> QueryModelResult<()> {
    let mut query = parse(FULL_IDIOM);
    extract(&mut query)?;
    let tree = query.tree();
    let node = nodes_named(tree, "KeywordSearch")[0];
    let NodeKind::KeywordSearch(search) = tree.kind(node) else {
        unreachable!()
    };

    let mut copy = search.pattern.clone();
    assert_eq!(copy, search.pattern);

    copy.subject.as_mut().unwrap().set_name("t");

    assert_ne!(copy, search.pattern);
    assert_eq!(copy.subject.as_ref().map(|s| s.name()), Some("t"));
    assert_eq!(search_subject(tree), Some("s".to_owned()));
    Ok(())
}

#[test]
fn test_cloned_tree_is_independent() -> QueryModelResult<()> {
    let mut query = parse(FULL_IDIOM);
    extract(&mut query)?;

    let mut copy = query.tree().clone();
    rename_variable(&mut copy, "s", "t")?;

    assert_eq!(search_subject(&copy), Some("t".to_owned()));
    assert_eq!(search_subject(query.tree()), Some("s".to_owned()));
    Ok(())
}
