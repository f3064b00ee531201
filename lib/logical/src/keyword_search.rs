use crate::NodeRemover;
use rdf_federation_model::{
    KeywordSearchNode, KeywordSearchPattern, KeywordSearchVocabulary, NamedNode, NodeId,
    NodeKind, OrderExpression, QueryModelError, QueryModelResult, QueryTree, StatementPattern,
    Term, Var,
};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Recognizes the free-text search idiom of a backend and replaces each instance with a single
/// [NodeKind::KeywordSearch] node.
///
/// Patterns are grouped per join group (a maximal tree of joins and the non-join nodes below it).
/// Each `?match search:contains value` pattern with a free `?match` anchors one instance. The
/// instance claims the score, snippet, subject-predicate, and type patterns that relate to its
/// match variable. Instances that cannot be grouped unambiguously are left untouched.
#[derive(Debug, Clone)]
pub struct KeywordSearchExtractor {
    vocabulary: Arc<KeywordSearchVocabulary>,
}

#[derive(Debug)]
struct JoinGroup {
    top: NodeId,
    members: Vec<NodeId>,
}

#[derive(Debug)]
struct Candidate {
    pattern: KeywordSearchPattern,
    leaves: Vec<NodeId>,
}

/// The reason why a search instance is not extracted.
#[derive(Debug)]
struct Ambiguity(&'static str);

impl KeywordSearchExtractor {
    pub fn new(vocabulary: Arc<KeywordSearchVocabulary>) -> Self {
        Self { vocabulary }
    }

    pub fn vocabulary(&self) -> &KeywordSearchVocabulary {
        &self.vocabulary
    }

    /// Extracts all search instances in `tree` and returns the created nodes.
    pub fn extract(&self, tree: &mut QueryTree) -> QueryModelResult<Vec<NodeId>> {
        let mut result = Vec::new();
        for group in join_groups(tree) {
            for candidate in self.candidates(tree, &group) {
                let node = self.apply(tree, &group, candidate)?;
                tracing::debug!(%node, "Extracted keyword search");
                result.push(node);
            }
        }
        Ok(result)
    }

    fn candidates(&self, tree: &QueryTree, group: &JoinGroup) -> Vec<Candidate> {
        let patterns = group
            .members
            .iter()
            .filter_map(|member| match tree.kind(*member) {
                NodeKind::Pattern(pattern) => Some((*member, pattern)),
                _ => None,
            })
            .collect::<Vec<_>>();

        let mut candidates = Vec::new();
        for (anchor, pattern) in &patterns {
            if !is_iri(&pattern.predicate, &self.vocabulary.contains) || !pattern.subject.is_free()
            {
                continue;
            }
            match self.candidate(&patterns, *anchor, pattern) {
                Ok(candidate) => candidates.push(candidate),
                Err(Ambiguity(reason)) => {
                    tracing::debug!(
                        anchor = %anchor,
                        match_var = %pattern.subject,
                        reason,
                        "Skipping ambiguous keyword search"
                    );
                }
            }
        }

        // A pattern can only become part of a single search.
        let mut claims = FxHashMap::<NodeId, usize>::default();
        for leaf in candidates.iter().flat_map(|c| &c.leaves) {
            *claims.entry(*leaf).or_default() += 1;
        }
        candidates.retain(|candidate| {
            let exclusive = candidate.leaves.iter().all(|leaf| claims[leaf] == 1);
            if !exclusive {
                tracing::debug!(
                    match_var = %candidate.pattern.match_var,
                    "Skipping keyword search that shares patterns with another search"
                );
            }
            exclusive
        });

        // Keep the order of the group.
        for candidate in &mut candidates {
            candidate
                .leaves
                .sort_by_key(|leaf| group.members.iter().position(|m| m == leaf));
        }
        candidates
    }

    fn candidate(
        &self,
        patterns: &[(NodeId, &StatementPattern)],
        anchor: NodeId,
        anchor_pattern: &StatementPattern,
    ) -> Result<Candidate, Ambiguity> {
        let vocabulary = &self.vocabulary;
        let match_var = &anchor_pattern.subject;
        let mut leaves = vec![anchor];

        let anchors = patterns
            .iter()
            .filter(|(_, p)| is_iri(&p.predicate, &vocabulary.contains) && p.subject == *match_var)
            .count();
        if anchors > 1 {
            return Err(Ambiguity("Multiple search texts for one match variable"));
        }

        let score = single_object(patterns, match_var, &vocabulary.score)?;
        let snippet = single_object(patterns, match_var, &vocabulary.snippet)?;
        leaves.extend(score.iter().chain(&snippet).map(|(leaf, _)| *leaf));

        let mut subject: Option<&Var> = None;
        let mut predicates = Vec::new();
        for (leaf, pattern) in patterns {
            if pattern.object != *match_var || self.is_search_relation(&pattern.predicate) {
                continue;
            }
            match subject {
                Some(subject) if !same_term(subject, &pattern.subject) => {
                    return Err(Ambiguity("Multiple subjects for one match variable"));
                }
                _ => subject = Some(&pattern.subject),
            }
            predicates.push(pattern.predicate.clone());
            leaves.push(*leaf);
        }

        let mut types = Vec::new();
        if let Some(subject) = subject {
            for (leaf, pattern) in patterns {
                if same_term(&pattern.subject, subject)
                    && is_iri(&pattern.predicate, &vocabulary.type_predicate)
                    && pattern.object != *match_var
                {
                    types.push(pattern.object.clone());
                    leaves.push(*leaf);
                }
            }
        }

        leaves.sort_unstable();
        leaves.dedup();
        Ok(Candidate {
            pattern: KeywordSearchPattern {
                subject: subject.cloned(),
                predicates,
                match_var: match_var.clone(),
                value: anchor_pattern.object.clone(),
                score: score.map(|(_, var)| var),
                snippet: snippet.map(|(_, var)| var),
                types,
            },
            leaves,
        })
    }

    fn apply(
        &self,
        tree: &mut QueryTree,
        group: &JoinGroup,
        candidate: Candidate,
    ) -> QueryModelResult<NodeId> {
        let (order, limit) = if candidate.leaves.len() == group.members.len() {
            decorations(tree, group.top)
        } else {
            (Vec::new(), None)
        };

        let Some((first, rest)) = candidate.leaves.split_first() else {
            return QueryModelError::inconsistent("A keyword search without patterns");
        };
        let scope = tree
            .scope_of(*first)
            .ok_or(QueryModelError::DetachedNode(*first))?;

        let node = tree.add(NodeKind::KeywordSearch(KeywordSearchNode {
            pattern: candidate.pattern,
            vocabulary: Arc::clone(&self.vocabulary),
            order,
            limit,
        }))?;
        tree.replace(*first, node)?;

        let remover = NodeRemover::with_scope(scope);
        for leaf in rest {
            remover.remove(tree, *leaf)?;
        }
        Ok(node)
    }

    fn is_search_relation(&self, predicate: &Var) -> bool {
        is_iri(predicate, &self.vocabulary.contains)
            || is_iri(predicate, &self.vocabulary.score)
            || is_iri(predicate, &self.vocabulary.snippet)
    }
}

/// Finds the maximal join trees of `tree`. A statement pattern outside of a join forms its own
/// group.
fn join_groups(tree: &QueryTree) -> Vec<JoinGroup> {
    let mut groups = Vec::new();
    for node in tree.pre_order() {
        let below_join = tree
            .parent(node)
            .is_some_and(|parent| tree.kind(parent).is_join());
        if below_join {
            continue;
        }

        let kind = tree.kind(node);
        if kind.is_join() {
            let mut members = Vec::new();
            collect_members(tree, node, &mut members);
            groups.push(JoinGroup { top: node, members });
        } else if matches!(kind, NodeKind::Pattern(_)) {
            groups.push(JoinGroup {
                top: node,
                members: vec![node],
            });
        }
    }
    groups
}

fn collect_members(tree: &QueryTree, node: NodeId, members: &mut Vec<NodeId>) {
    for child in tree.children(node) {
        if tree.kind(child).is_join() {
            collect_members(tree, child, members);
        } else {
            members.push(child);
        }
    }
}

/// Collects the `ORDER BY` and `LIMIT` that directly apply to the result of `top`.
fn decorations(tree: &QueryTree, top: NodeId) -> (Vec<OrderExpression>, Option<usize>) {
    let mut order = Vec::new();
    let mut limit = None;
    let mut current = tree.parent(top);
    while let Some(node) = current {
        match tree.kind(node) {
            NodeKind::Order(o) if order.is_empty() => order.clone_from(&o.elements),
            NodeKind::Projection(_) => {}
            NodeKind::Slice(slice) => {
                limit = slice.limit.map(|l| slice.offset.saturating_add(l));
                break;
            }
            _ => break,
        }
        current = tree.parent(node);
    }
    (order, limit)
}

/// Finds the single `?match <predicate> ?object` pattern.
fn single_object(
    patterns: &[(NodeId, &StatementPattern)],
    match_var: &Var,
    predicate: &NamedNode,
) -> Result<Option<(NodeId, Var)>, Ambiguity> {
    let mut matching = patterns
        .iter()
        .filter(|(_, p)| p.subject == *match_var && is_iri(&p.predicate, predicate));
    let Some((leaf, pattern)) = matching.next() else {
        return Ok(None);
    };
    if matching.next().is_some() {
        return Err(Ambiguity("Multiple patterns for a single-valued search relation"));
    }
    if !pattern.object.is_free() {
        return Err(Ambiguity("Search relation with a constant object"));
    }
    Ok(Some((*leaf, pattern.object.clone())))
}

fn is_iri(var: &Var, iri: &NamedNode) -> bool {
    matches!(var.value(), Some(Term::NamedNode(node)) if node == iri)
}

/// Checks whether two variables refer to the same term, ignoring the names of constants.
fn same_term(lhs: &Var, rhs: &Var) -> bool {
    match (lhs.value(), rhs.value()) {
        (Some(lhs), Some(rhs)) => lhs == rhs,
        (None, None) => lhs.name() == rhs.name(),
        _ => false,
    }
}
