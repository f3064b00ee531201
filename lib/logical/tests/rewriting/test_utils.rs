use rdf_federation_model::{
    NamedNode, NodeId, NodeKind, ParsedQuery, QueryTree, ServiceDescriptor, Term,
};
use std::collections::BTreeSet;

pub const PREFIXES: &str = "PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
PREFIX search: <http://rdf-federation.org/search#>
PREFIX ex: <http://example.com/>
";

pub fn parse(query: &str) -> ParsedQuery {
    ParsedQuery::parse(&format!("{PREFIXES}{query}"), None).unwrap()
}

pub fn render(query: &ParsedQuery) -> String {
    query.to_sparql().unwrap()
}

pub fn iri(local: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("http://example.com/{local}"))
}

/// Finds all attached statement patterns with the given predicate IRI.
pub fn patterns_with_predicate(tree: &QueryTree, predicate: &str) -> Vec<NodeId> {
    tree.pre_order()
        .into_iter()
        .filter(|node| match tree.kind(*node) {
            NodeKind::Pattern(pattern) => matches!(
                pattern.predicate.value(),
                Some(Term::NamedNode(p)) if p.as_str() == predicate
            ),
            _ => false,
        })
        .collect()
}

/// Finds all attached nodes of the given kind.
pub fn nodes_named(tree: &QueryTree, name: &str) -> Vec<NodeId> {
    tree.pre_order()
        .into_iter()
        .filter(|node| tree.kind(*node).name() == name)
        .collect()
}

/// Collects the names of all free variables that are held by nodes.
pub fn free_var_names(tree: &QueryTree) -> BTreeSet<String> {
    tree.pre_order()
        .into_iter()
        .flat_map(|node| {
            tree.kind(node)
                .vars()
                .into_iter()
                .filter_map(|var| var.free_name().map(ToOwned::to_owned))
                .collect::<Vec<_>>()
        })
        .collect()
}

pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
pub const RDFS_COMMENT: &str = "http://www.w3.org/2000/01/rdf-schema#comment";

#[derive(Debug)]
pub struct TestService {
    pub member: &'static str,
    pub service_capable: bool,
}

impl ServiceDescriptor for TestService {
    fn member_id(&self) -> &str {
        self.member
    }

    fn is_service_capable(&self) -> bool {
        self.service_capable
    }
}
