use crate::Var;
use oxrdf::vocab::rdf;
use oxrdf::NamedNode;
use spargebra::algebra::OrderExpression;
use std::collections::BTreeSet;
use std::sync::Arc;

/// The namespace of the default free-text search vocabulary.
pub const SEARCH_NAMESPACE: &str = "http://rdf-federation.org/search#";

/// The reserved relations of a backend's free-text search idiom.
///
/// The idiom looks as follows:
///
/// ```sparql
/// ?subject ?predicate ?match .
/// ?match search:contains "search text" .
/// ?match search:score ?score .
/// ?match search:snippet ?snippet .
/// ?subject rdf:type ?type .
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeywordSearchVocabulary {
    /// Relates the matched literal to the search text.
    pub contains: NamedNode,
    /// Relates the matched literal to its relevance score.
    pub score: NamedNode,
    /// Relates the matched literal to a highlighted snippet.
    pub snippet: NamedNode,
    /// Relates the subject to its types.
    pub type_predicate: NamedNode,
}

impl Default for KeywordSearchVocabulary {
    fn default() -> Self {
        Self {
            contains: NamedNode::new_unchecked(format!("{SEARCH_NAMESPACE}contains")),
            score: NamedNode::new_unchecked(format!("{SEARCH_NAMESPACE}score")),
            snippet: NamedNode::new_unchecked(format!("{SEARCH_NAMESPACE}snippet")),
            type_predicate: rdf::TYPE.into_owned(),
        }
    }
}

/// One instance of the free-text search idiom, extracted from a group of statement patterns.
///
/// The pattern owns all of its variables. Cloning it yields an independent copy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeywordSearchPattern {
    /// The resource that owns the matched literal. Only present if `predicates` is not empty.
    pub subject: Option<Var>,
    /// The properties that relate `subject` to the matched literal.
    pub predicates: Vec<Var>,
    /// The matched literal.
    pub match_var: Var,
    /// The search text.
    pub value: Var,
    pub score: Option<Var>,
    pub snippet: Option<Var>,
    /// Types of `subject`.
    pub types: Vec<Var>,
}

impl KeywordSearchPattern {
    /// Returns all variables of this pattern.
    pub fn vars(&self) -> Vec<&Var> {
        let mut vars = Vec::new();
        vars.extend(&self.subject);
        vars.extend(&self.predicates);
        vars.push(&self.match_var);
        vars.push(&self.value);
        vars.extend(&self.score);
        vars.extend(&self.snippet);
        vars.extend(&self.types);
        vars
    }

    /// Returns mutable references to all variables of this pattern.
    pub fn vars_mut(&mut self) -> Vec<&mut Var> {
        let mut vars = Vec::new();
        vars.extend(&mut self.subject);
        vars.extend(&mut self.predicates);
        vars.push(&mut self.match_var);
        vars.push(&mut self.value);
        vars.extend(&mut self.score);
        vars.extend(&mut self.snippet);
        vars.extend(&mut self.types);
        vars
    }

    /// The bindings that every solution of this pattern carries: the free subject and score
    /// variables.
    pub fn assured_binding_names(&self) -> BTreeSet<String> {
        [&self.subject, &self.score]
            .into_iter()
            .flatten()
            .filter_map(Var::free_name)
            .map(ToOwned::to_owned)
            .collect()
    }

    /// All bindings that a solution of this pattern may carry.
    pub fn binding_names(&self) -> BTreeSet<String> {
        self.vars()
            .into_iter()
            .filter_map(Var::free_name)
            .map(ToOwned::to_owned)
            .collect()
    }
}

/// The payload of a [NodeKind::KeywordSearch](crate::NodeKind::KeywordSearch) node.
#[derive(Debug, Clone)]
pub struct KeywordSearchNode {
    pub pattern: KeywordSearchPattern,
    pub vocabulary: Arc<KeywordSearchVocabulary>,
    /// Ordering that was attached to the recognized group.
    pub order: Vec<OrderExpression>,
    /// Maximum number of matches that can be observed. [None] means unbounded.
    pub limit: Option<usize>,
}
