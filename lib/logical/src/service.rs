use rdf_federation_model::{
    visit_tree, walk_children, NodeId, NodeKind, QueryModelError, QueryModelResult,
    QueryModelVisitor, QueryTree, ServiceCall, ServiceMap, Term,
};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Maps replaced `SERVICE` nodes to the [NodeKind::ServiceCall] nodes that replaced them.
pub type ServiceReplacements = FxHashMap<NodeId, NodeId>;

/// Replaces `SERVICE <iri>` clauses that refer to a known, service-capable member with a
/// [NodeKind::ServiceCall].
///
/// Clauses that cannot be resolved are left in place and are evaluated by the generic federation
/// evaluator. Their bodies are still searched for resolvable clauses. The body of a resolved clause
/// is shipped as a whole and never entered.
pub struct ServiceResolver<'resolver> {
    services: &'resolver ServiceMap,
    replacements: &'resolver mut ServiceReplacements,
}

impl<'resolver> ServiceResolver<'resolver> {
    pub fn new(
        services: &'resolver ServiceMap,
        replacements: &'resolver mut ServiceReplacements,
    ) -> Self {
        Self {
            services,
            replacements,
        }
    }
}

impl QueryModelVisitor for ServiceResolver<'_> {
    fn meet_service(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        let NodeKind::Service(service) = tree.kind(node) else {
            return QueryModelError::inconsistent(format!("{node} is not a SERVICE node"));
        };
        let Some(Term::NamedNode(iri)) = service.name.value() else {
            tracing::debug!(
                %node,
                service = %service.name,
                "Skipping SERVICE without a constant IRI"
            );
            return walk_children(self, tree, node);
        };
        let Some(descriptor) = self.services.get(iri) else {
            tracing::debug!(%node, %iri, "Skipping unknown SERVICE");
            return walk_children(self, tree, node);
        };
        if !descriptor.is_service_capable() {
            tracing::debug!(
                %node,
                %iri,
                member = descriptor.member_id(),
                "Skipping SERVICE of a member that cannot evaluate service calls"
            );
            return walk_children(self, tree, node);
        }

        let call = ServiceCall {
            service: iri.clone(),
            descriptor: Arc::clone(descriptor),
            body: tree.graph_pattern_of(service.arg)?,
            silent: service.silent,
            assured_bindings: tree.assured_binding_names(service.arg),
            bindings: tree.binding_names(service.arg),
        };
        tracing::debug!(
            %node,
            %iri,
            member = descriptor.member_id(),
            "Resolved SERVICE to member"
        );

        let replacement = tree.add(NodeKind::ServiceCall(call))?;
        tree.replace(node, replacement)?;
        self.replacements.insert(node, replacement);
        Ok(())
    }
}

/// Resolves all `SERVICE` clauses of `tree` against `services`. Replaced nodes are recorded in
/// `replacements`.
pub fn resolve_services(
    tree: &mut QueryTree,
    services: &ServiceMap,
    replacements: &mut ServiceReplacements,
) -> QueryModelResult<()> {
    visit_tree(&mut ServiceResolver::new(services, replacements), tree)
}
