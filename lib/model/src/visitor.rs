use crate::{NodeId, NodeKind, QueryModelResult, QueryTree, Var};

/// A traversal over a [QueryTree].
///
/// [visit] dispatches on the kind of a node and calls the matching `meet_*` method. Every `meet_*`
/// method defaults to [QueryModelVisitor::meet_node], which walks the variables of the node and
/// then its children. Visitors therefore only override the kinds they care about. Node kinds that
/// the core does not know about end up in [QueryModelVisitor::meet_other].
///
/// The traversal is pre-order: a node is met before its children. A visitor may mutate the tree
/// while it is being traversed. The children of a node are snapshotted before descending and a
/// child that is no longer linked to that node when its turn comes is skipped.
pub trait QueryModelVisitor {
    /// The fallback for all node kinds.
    fn meet_node(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        walk_node(self, tree, node)
    }

    fn meet_var(&mut self, _var: &mut Var) -> QueryModelResult<()> {
        Ok(())
    }

    fn meet_root(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        self.meet_node(tree, node)
    }

    fn meet_pattern(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        self.meet_node(tree, node)
    }

    fn meet_path(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        self.meet_node(tree, node)
    }

    fn meet_singleton_set(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        self.meet_node(tree, node)
    }

    fn meet_empty_set(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        self.meet_node(tree, node)
    }

    fn meet_values(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        self.meet_node(tree, node)
    }

    fn meet_service_call(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        self.meet_node(tree, node)
    }

    fn meet_keyword_search(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        self.meet_node(tree, node)
    }

    fn meet_projection(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        self.meet_node(tree, node)
    }

    fn meet_extension(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        self.meet_node(tree, node)
    }

    fn meet_filter(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        self.meet_node(tree, node)
    }

    fn meet_order(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        self.meet_node(tree, node)
    }

    fn meet_slice(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        self.meet_node(tree, node)
    }

    fn meet_distinct(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        self.meet_node(tree, node)
    }

    fn meet_reduced(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        self.meet_node(tree, node)
    }

    fn meet_group(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        self.meet_node(tree, node)
    }

    fn meet_graph(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        self.meet_node(tree, node)
    }

    /// Meets an unresolved `SERVICE` clause.
    fn meet_service(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        self.meet_node(tree, node)
    }

    fn meet_join(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        self.meet_node(tree, node)
    }

    fn meet_left_join(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        self.meet_node(tree, node)
    }

    fn meet_union(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        self.meet_node(tree, node)
    }

    fn meet_minus(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        self.meet_node(tree, node)
    }

    fn meet_nary_join(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        self.meet_node(tree, node)
    }

    /// Meets a node kind that has no dedicated method.
    fn meet_other(&mut self, tree: &mut QueryTree, node: NodeId) -> QueryModelResult<()> {
        self.meet_node(tree, node)
    }
}

/// Dispatches `node` to the matching `meet_*` method of `visitor`.
pub fn visit<V: QueryModelVisitor + ?Sized>(
    visitor: &mut V,
    tree: &mut QueryTree,
    node: NodeId,
) -> QueryModelResult<()> {
    match tree.kind(node) {
        NodeKind::Root(_) => visitor.meet_root(tree, node),
        NodeKind::Pattern(_) => visitor.meet_pattern(tree, node),
        NodeKind::Path(_) => visitor.meet_path(tree, node),
        NodeKind::SingletonSet => visitor.meet_singleton_set(tree, node),
        NodeKind::EmptySet => visitor.meet_empty_set(tree, node),
        NodeKind::Values(_) => visitor.meet_values(tree, node),
        NodeKind::ServiceCall(_) => visitor.meet_service_call(tree, node),
        NodeKind::KeywordSearch(_) => visitor.meet_keyword_search(tree, node),
        NodeKind::Projection(_) => visitor.meet_projection(tree, node),
        NodeKind::Extension(_) => visitor.meet_extension(tree, node),
        NodeKind::Filter(_) => visitor.meet_filter(tree, node),
        NodeKind::Order(_) => visitor.meet_order(tree, node),
        NodeKind::Slice(_) => visitor.meet_slice(tree, node),
        NodeKind::Distinct(_) => visitor.meet_distinct(tree, node),
        NodeKind::Reduced(_) => visitor.meet_reduced(tree, node),
        NodeKind::Group(_) => visitor.meet_group(tree, node),
        NodeKind::Graph(_) => visitor.meet_graph(tree, node),
        NodeKind::Service(_) => visitor.meet_service(tree, node),
        NodeKind::Join(_) => visitor.meet_join(tree, node),
        NodeKind::LeftJoin(_) => visitor.meet_left_join(tree, node),
        NodeKind::Union(_) => visitor.meet_union(tree, node),
        NodeKind::Minus(_) => visitor.meet_minus(tree, node),
        NodeKind::NaryJoin(_) => visitor.meet_nary_join(tree, node),
        NodeKind::Other(_) => visitor.meet_other(tree, node),
    }
}

/// Visits the whole tree, starting at the root.
pub fn visit_tree<V: QueryModelVisitor + ?Sized>(
    visitor: &mut V,
    tree: &mut QueryTree,
) -> QueryModelResult<()> {
    let root = tree.root();
    visit(visitor, tree, root)
}

/// Meets the variables of `node` and then visits its children.
pub fn walk_node<V: QueryModelVisitor + ?Sized>(
    visitor: &mut V,
    tree: &mut QueryTree,
    node: NodeId,
) -> QueryModelResult<()> {
    walk_vars(visitor, tree, node)?;
    walk_children(visitor, tree, node)
}

pub fn walk_vars<V: QueryModelVisitor + ?Sized>(
    visitor: &mut V,
    tree: &mut QueryTree,
    node: NodeId,
) -> QueryModelResult<()> {
    for var in tree.kind_mut(node).vars_mut() {
        visitor.meet_var(var)?;
    }
    Ok(())
}

pub fn walk_children<V: QueryModelVisitor + ?Sized>(
    visitor: &mut V,
    tree: &mut QueryTree,
    node: NodeId,
) -> QueryModelResult<()> {
    for child in tree.children(node) {
        if tree.parent(child) == Some(node) {
            visit(visitor, tree, child)?;
        }
    }
    Ok(())
}
