use rdf_federation_logical::expression::{exists_patterns, node_expressions};
use rdf_federation_model::{NodeId, NodeKind, QueryModelResult, QueryTree, ServiceMap, Term};
use std::collections::BTreeSet;

/// Finds the single member that can answer the entire query in `tree`.
///
/// Every statement pattern, path, and keyword search outside of a `SERVICE` clause is owned by
/// `default_member`. Resolved service calls and `SERVICE <iri>` clauses with a registered IRI are
/// owned by the member behind the IRI. The bodies of `SERVICE` clauses are not inspected, and the
/// patterns of `EXISTS` filters count like any other pattern.
///
/// Returns [None] if the query spans more than one member, if it has no owned parts at all, or if
/// it contains a `SERVICE` clause that no member answers.
pub fn find_single_owner(
    tree: &QueryTree,
    services: &ServiceMap,
    default_member: &str,
) -> QueryModelResult<Option<String>> {
    let mut collector = OwnerCollector {
        services,
        default_member,
        owners: BTreeSet::new(),
        has_foreign_service: false,
    };
    collector.collect(tree, tree.root())?;

    if collector.has_foreign_service || collector.owners.len() != 1 {
        tracing::trace!(
            owners = ?collector.owners,
            has_foreign_service = collector.has_foreign_service,
            "Query has no single owner"
        );
        return Ok(None);
    }
    Ok(collector.owners.pop_first())
}

struct OwnerCollector<'collector> {
    services: &'collector ServiceMap,
    default_member: &'collector str,
    owners: BTreeSet<String>,
    has_foreign_service: bool,
}

impl OwnerCollector<'_> {
    fn collect(&mut self, tree: &QueryTree, node: NodeId) -> QueryModelResult<()> {
        let kind = tree.kind(node);
        for expression in node_expressions(kind) {
            for pattern in exists_patterns(expression) {
                let nested = QueryTree::from_graph_pattern(pattern)?;
                self.collect(&nested, nested.root())?;
            }
        }

        match kind {
            NodeKind::Pattern(_) | NodeKind::Path(_) | NodeKind::KeywordSearch(_) => {
                self.owners.insert(self.default_member.to_owned());
            }
            NodeKind::ServiceCall(call) => {
                self.owners.insert(call.descriptor.member_id().to_owned());
            }
            NodeKind::Service(service) => {
                let descriptor = match service.name.value() {
                    Some(Term::NamedNode(iri)) => self.services.get(iri),
                    _ => None,
                };
                match descriptor {
                    Some(descriptor) => {
                        self.owners.insert(descriptor.member_id().to_owned());
                    }
                    None => self.has_foreign_service = true,
                }
                return Ok(());
            }
            _ => {}
        }

        for child in tree.children(node) {
            self.collect(tree, child)?;
        }
        Ok(())
    }
}
