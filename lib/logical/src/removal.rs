use rdf_federation_model::{
    Arity, NodeId, NodeKind, QueryModelError, QueryModelResult, QueryTree,
};

/// Removes nodes from a [QueryTree] while keeping the surrounding operators well-formed.
///
/// What happens with the parent of the removed node depends on its arity:
/// - n-ary: the node is removed from the argument list.
/// - binary: the parent is replaced by the other argument.
/// - unary: the node is replaced by an [NodeKind::EmptySet], so that the semantics of the parent
///   (e.g., a projection) survive.
///
/// If a scope is given, an n-ary or binary parent is only rewritten if its nearest scope root is
/// this scope. A removal that is meant for the outer query thus never collapses an operator of a
/// nested sub-query.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeRemover {
    scope: Option<NodeId>,
}

impl NodeRemover {
    /// Creates a remover that operates on the whole tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a remover that only removes nodes directly within `scope`.
    pub fn with_scope(scope: NodeId) -> Self {
        Self { scope: Some(scope) }
    }

    pub fn scope(&self) -> Option<NodeId> {
        self.scope
    }

    /// Removes `target` from `tree`.
    ///
    /// The target is identified by its handle. Structurally equal nodes in other places of the
    /// tree are never affected.
    pub fn remove(&self, tree: &mut QueryTree, target: NodeId) -> QueryModelResult<()> {
        if !tree.contains(target) {
            return Err(QueryModelError::UnknownNode(target));
        }
        if target == tree.root() {
            return Err(QueryModelError::CannotRemoveRoot);
        }
        if !tree.is_attached(target) {
            return Err(QueryModelError::DetachedNode(target));
        }
        let parent = tree
            .parent(target)
            .ok_or(QueryModelError::DetachedNode(target))?;

        let arity = tree.kind(parent).arity();
        if let Some(scope) = self.scope {
            let actual = tree.scope_of(parent);
            if matches!(arity, Arity::Nary | Arity::Binary) && actual != Some(scope) {
                return Err(QueryModelError::OutOfScope {
                    node: parent,
                    expected: scope,
                    actual,
                });
            }
        }

        match arity {
            Arity::Nary => tree.remove_child(parent, target),
            Arity::Binary => {
                let sibling = tree
                    .children(parent)
                    .into_iter()
                    .find(|child| *child != target)
                    .ok_or(QueryModelError::NotAChild {
                        parent,
                        child: target,
                    })?;
                tracing::trace!(%parent, %target, %sibling, "Collapsing binary operator");
                tree.replace(parent, sibling)
            }
            Arity::Unary => {
                let empty = tree.add(NodeKind::EmptySet)?;
                tree.replace_child(parent, target, empty)
            }
            Arity::Nullary => QueryModelError::inconsistent(format!(
                "The leaf {parent} is the parent of {target}"
            )),
        }
    }
}
